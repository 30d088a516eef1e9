//! The rehash controller: trigger policy, expand/shrink, and the
//! incremental migration step (§4.1).

use super::hash::KeyHasher;
use super::table::Table;
use super::{resize_allowed, Dict, DictError, EMPTY_VISIT_FACTOR, FORCE_RATIO, INITIAL_SIZE, REHASH_BATCH};

impl<K, V, H> Dict<K, V, H> {
    /// Requests a new `tables[0]` of exactly `size.next_power_of_two()`
    /// buckets (at least `used`), reporting an allocation failure instead of
    /// aborting. Fails with [`DictError::InvalidArgument`] if already
    /// rehashing, if `size < used`, or if the computed size does not change
    /// anything.
    pub fn try_expand(&mut self, size: usize) -> Result<(), DictError> {
        if self.is_rehashing() {
            return Err(DictError::InvalidArgument("cannot expand while rehashing"));
        }
        let used = self.tables[0].used;
        if size < used {
            return Err(DictError::InvalidArgument("requested size is smaller than the live entry count"));
        }
        let new_size = size.max(used).max(1).next_power_of_two();
        if new_size == self.tables[0].size() {
            return Err(DictError::InvalidArgument("requested size equals the current size"));
        }
        let new_table = Table::try_with_size(new_size)?;
        if !self.tables[0].is_allocated() {
            self.tables[0] = new_table;
        } else {
            self.tables[1] = new_table;
            self.rehash_idx = 0;
        }
        Ok(())
    }

    /// Like [`try_expand`](Self::try_expand), but treats allocation failure
    /// as fatal, matching the reference's non-`try` `expand` contract.
    pub fn expand(&mut self, size: usize) -> Result<(), DictError> {
        match self.try_expand(size) {
            Err(DictError::AllocationFailure(err)) => {
                panic!("dict: allocation failure while expanding to {size}: {err}")
            }
            other => other,
        }
    }

    /// Shrinks `tables[0]` to fit the current live entry count (never below
    /// [`INITIAL_SIZE`]). Rejected while rehashing or while resize is
    /// disabled.
    pub fn resize(&mut self) -> Result<(), DictError> {
        if !resize_allowed() {
            return Err(DictError::InvalidArgument("resize is disabled"));
        }
        if self.is_rehashing() {
            return Err(DictError::InvalidArgument("cannot resize while rehashing"));
        }
        let target = self.tables[0].used.max(INITIAL_SIZE);
        self.expand(target)
    }

    fn finish_rehash(&mut self) {
        self.tables[0] = std::mem::replace(&mut self.tables[1], Table::empty());
        self.rehash_idx = -1;
    }
}

impl<K, V, H: KeyHasher<K>> Dict<K, V, H> {
    /// Migrates up to `n` non-empty `tables[0]` buckets into `tables[1]`,
    /// returning the number of buckets actually migrated. A no-op (returns
    /// 0) when not rehashing or while paused. Bounded to visiting at most
    /// `EMPTY_VISIT_FACTOR * n` empty buckets before returning early, so a
    /// sparse table cannot make a single call scan arbitrarily far.
    pub(crate) fn rehash_n(&mut self, n: usize) -> usize {
        if self.pause_rehash > 0 || !self.is_rehashing() {
            return 0;
        }
        let budget = EMPTY_VISIT_FACTOR * n.max(1);
        let mut empty_visits = 0usize;
        let mut steps = 0usize;
        while steps < n {
            if self.tables[0].used == 0 {
                self.finish_rehash();
                break;
            }
            while self.tables[0].buckets[self.rehash_idx as usize].is_none() {
                self.rehash_idx += 1;
                empty_visits += 1;
                if empty_visits >= budget {
                    return steps;
                }
            }
            let idx = self.rehash_idx as usize;
            let mut chain = self.tables[0].buckets[idx].take();
            while let Some(mut entry) = chain {
                chain = entry.next.take();
                let dest = self.tables[1].bucket_index(hash_of(&self.hasher, &entry.key));
                entry.next = self.tables[1].buckets[dest].take();
                self.tables[0].used -= 1;
                self.tables[1].used += 1;
                self.tables[1].buckets[dest] = Some(entry);
            }
            self.rehash_idx += 1;
            steps += 1;
            if self.tables[0].used == 0 {
                self.finish_rehash();
                break;
            }
        }
        steps
    }

    /// Invoked by insert/find/delete before anything else: allocates
    /// `tables[0]` on the very first call, otherwise starts a rehash once
    /// the load factor reaches 1 and either voluntary growth is allowed, the
    /// load factor exceeds [`FORCE_RATIO`], or both the `expand_allowed`
    /// predicate (if any) and one of the above hold.
    pub(crate) fn expand_if_needed(&mut self) {
        if self.is_rehashing() {
            return;
        }
        if !self.tables[0].is_allocated() {
            self.tables[0] = Table::with_size(INITIAL_SIZE);
            return;
        }
        let used = self.tables[0].used;
        let size = self.tables[0].size();
        if used < size {
            return;
        }
        let load_factor = used as f64 / size as f64;
        let forced = load_factor > FORCE_RATIO as f64;
        if !(resize_allowed() || forced) {
            return;
        }
        let next_pow2 = (used + 1).next_power_of_two();
        let bytes = next_pow2 * std::mem::size_of::<super::table::Entry<K, V>>();
        if let Some(predicate) = self.expand_allowed.as_mut() {
            if !predicate(bytes, load_factor) {
                return;
            }
        }
        self.expand(2 * used).expect("dict: expand_if_needed computed an invalid target size");
    }

    /// Cooperatively migrates in bursts of [`REHASH_BATCH`] steps until
    /// either the rehash completes or `ms` milliseconds have elapsed.
    /// Returns the number of buckets migrated.
    pub fn rehash_milliseconds(&mut self, ms: u64) -> usize {
        if self.pause_rehash > 0 {
            return 0;
        }
        let deadline = std::time::Instant::now() + std::time::Duration::from_millis(ms);
        let mut total = 0;
        while self.is_rehashing() {
            total += self.rehash_n(REHASH_BATCH);
            if std::time::Instant::now() >= deadline {
                break;
            }
        }
        total
    }
}

fn hash_of<K, H: KeyHasher<K>>(hasher: &H, key: &K) -> u64 {
    hasher.hash(key)
}
