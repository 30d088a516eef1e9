//! Random sampling (§4.5): a single uniform-ish pick, a fast contiguous
//! batch, and a "fair" single pick drawn from a small batch instead of one
//! chain. All three return owned clones rather than borrowed references —
//! `fair_random_entry` needs to call both `some_keys` and, on an empty
//! sample, `random_entry`, and threading borrowed `&mut self` lifetimes
//! through that fallback is not worth the contortion when `K`/`V` are cheap
//! to clone.

use super::hash::KeyHasher;
use super::Dict;

const SOME_KEYS_PROBE_FACTOR: usize = 10;
const FAIR_SAMPLE_COUNT: usize = 15;

impl<K: Eq + Clone, V: Clone, H: KeyHasher<K>> Dict<K, V, H> {
    /// Picks one entry uniformly over populated buckets, then uniformly
    /// within that bucket's chain. Chains of different lengths are sampled
    /// with different probability; that bias is accepted, matching the
    /// reference's own documented tradeoff.
    pub fn random_entry(&mut self) -> Option<(K, V)> {
        if self.is_empty() {
            return None;
        }
        self.rehash_n(1);
        let mut rng = rand::thread_rng();
        loop {
            use rand::Rng;
            let (table_idx, bucket) = if !self.is_rehashing() {
                (0, rng.gen_range(0..self.tables[0].size()))
            } else {
                let total = self.tables[0].size() + self.tables[1].size();
                let start = self.rehash_idx as usize;
                let slot = rng.gen_range(start..total);
                if slot < self.tables[0].size() {
                    (0, slot)
                } else {
                    (1, slot - self.tables[0].size())
                }
            };
            if self.tables[table_idx].buckets[bucket].is_none() {
                continue;
            }
            let len = self.tables[table_idx].chain_len(bucket);
            let pick = rng.gen_range(0..len);
            let mut cur = self.tables[table_idx].buckets[bucket].as_deref();
            for _ in 0..pick {
                cur = cur.and_then(|e| e.next.as_deref());
            }
            let entry = cur.expect("pick is within [0, len)");
            return Some((entry.key.clone(), entry.value.clone()));
        }
    }

    /// Collects up to `count` entries starting from a random slot, walking
    /// forward across both tables for speed rather than uniformity. Performs
    /// up to `count` incremental rehash steps first.
    ///
    /// A single cursor `i`, masked once against the larger table's mask, is
    /// shared across both tables for the whole sweep — exactly as the
    /// reference's `dictGetSomeKeys` does. Each table tests `i` against its
    /// own `size` and skips the round (rather than re-masking `i` down to
    /// its own, smaller mask) when out of range, so a bucket is visited at
    /// most once per full sweep instead of once per `tables[t].size()`
    /// iterations.
    pub fn some_keys(&mut self, count: usize) -> Vec<(K, V)> {
        if count == 0 || self.is_empty() {
            return Vec::new();
        }
        self.rehash_n(count);
        let rehashing = self.is_rehashing();
        let table_count = if rehashing { 2 } else { 1 };
        let max_mask = self.tables[0].mask().max(self.tables[1].mask());
        let mut i = {
            use rand::Rng;
            rand::thread_rng().gen_range(0..=max_mask)
        };
        let mut out = Vec::new();
        let max_probes = SOME_KEYS_PROBE_FACTOR * count;
        let mut probes = 0;
        while out.len() < count && probes < max_probes {
            for t in 0..table_count {
                if t == 0 && rehashing && i < self.rehash_idx as usize {
                    // Buckets below rehash_idx are already migrated out of
                    // tables[0]; jump ahead into the still-unvisited range
                    // if tables[1] is too small to contain `i`, else just
                    // skip tables[0] this round.
                    if i >= self.tables[1].size() {
                        i = self.rehash_idx as usize;
                    } else {
                        continue;
                    }
                }
                if i >= self.tables[t].size() {
                    continue;
                }
                let mut cur = self.tables[t].buckets[i].as_deref();
                while let Some(entry) = cur {
                    out.push((entry.key.clone(), entry.value.clone()));
                    if out.len() >= count {
                        return out;
                    }
                    cur = entry.next.as_deref();
                }
            }
            i = (i + 1) & max_mask;
            probes += 1;
        }
        out
    }

    /// Takes up to [`FAIR_SAMPLE_COUNT`] contiguous samples and returns one
    /// picked uniformly among them, falling back to [`random_entry`] if the
    /// batch came back empty.
    pub fn fair_random_entry(&mut self) -> Option<(K, V)> {
        let mut batch = self.some_keys(FAIR_SAMPLE_COUNT);
        if batch.is_empty() {
            return self.random_entry();
        }
        use rand::Rng;
        let idx = rand::thread_rng().gen_range(0..batch.len());
        Some(batch.swap_remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::super::Dict;

    #[test]
    fn random_entry_returns_present_key() {
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        for i in 0..10u32 {
            d.add(i.to_be_bytes().to_vec(), i).unwrap();
        }
        for _ in 0..50 {
            let (k, v) = d.random_entry().unwrap();
            assert_eq!(d.find(&k), Some(&v));
        }
    }

    #[test]
    fn random_entry_on_empty_dict_is_none() {
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        assert_eq!(d.random_entry(), None);
    }

    #[test]
    fn some_keys_returns_no_more_than_requested_and_all_present() {
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        for i in 0..30u32 {
            d.add(i.to_be_bytes().to_vec(), i).unwrap();
        }
        let batch = d.some_keys(10);
        assert!(batch.len() <= 10);
        for (k, v) in &batch {
            assert_eq!(d.find(k), Some(v));
        }
    }

    #[test]
    fn some_keys_does_not_repeat_a_bucket_within_one_sweep_while_rehashing() {
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        for i in 0..4u32 {
            d.add(i.to_be_bytes().to_vec(), i).unwrap();
        }
        // Fifth insert starts a rehash: tables[0] has size 4, tables[1] has
        // size 8, so the shared cursor's mask (7) is wider than tables[0]'s
        // own mask (3) for the whole rehash.
        d.add(4u32.to_be_bytes().to_vec(), 4).unwrap();
        assert!(d.is_rehashing());

        let batch = d.some_keys(5);
        let mut seen = std::collections::HashSet::new();
        for (k, _v) in &batch {
            assert!(seen.insert(k.clone()), "key {k:?} collected more than once in one sweep");
        }
    }

    #[test]
    fn fair_random_entry_returns_present_key() {
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        for i in 0..10u32 {
            d.add(i.to_be_bytes().to_vec(), i).unwrap();
        }
        let (k, v) = d.fair_random_entry().unwrap();
        assert_eq!(d.find(&k), Some(&v));
    }
}
