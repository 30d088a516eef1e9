//! Lookup, insert and delete primitives (§4.2). Each one opportunistically
//! performs a single incremental rehash step before doing its own work,
//! exactly as the reference's `dictFind`/`dictAddRaw`/`dictGenericDelete`
//! do.

use super::hash::KeyHasher;
use super::table::Entry;
use super::{Dict, DictError};

/// Result of [`Dict::add_raw`]: either a freshly-inserted, default-valued
/// slot for the caller to fill, or the value already stored for that key.
pub enum AddRaw<'a, V> {
    Inserted(&'a mut V),
    Existing(&'a mut V),
}

/// An entry removed from a [`Dict`] by [`Dict::unlink`], not yet dropped.
/// Dropping it (or passing it to [`Dict::free_unlinked_entry`]) releases the
/// key and value, mirroring the reference's explicit `freeUnlinkedEntry`
/// call.
pub struct UnlinkedEntry<K, V> {
    entry: Box<Entry<K, V>>,
}

impl<K, V> UnlinkedEntry<K, V> {
    pub fn key(&self) -> &K {
        &self.entry.key
    }

    pub fn value(&self) -> &V {
        &self.entry.value
    }

    pub fn into_inner(self) -> (K, V) {
        let Entry { key, value, .. } = *self.entry;
        (key, value)
    }
}

impl<K: Eq, V, H: KeyHasher<K>> Dict<K, V, H> {
    /// Looks up `key`, performing one incremental rehash step first.
    pub fn find<'a>(&'a mut self, key: &K) -> Option<&'a V> {
        self.rehash_n(1);
        let hash = self.hasher.hash(key);
        for t in 0..2 {
            if !self.tables[t].is_allocated() {
                continue;
            }
            let idx = self.tables[t].bucket_index(hash);
            let mut cur = self.tables[t].buckets[idx].as_deref();
            while let Some(entry) = cur {
                if &entry.key == key {
                    return Some(&entry.value);
                }
                cur = entry.next.as_deref();
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    /// Equivalent to [`find`](Self::find); kept as a distinct name to match
    /// the reference's `fetchValue` entry point.
    pub fn fetch_value<'a>(&'a mut self, key: &K) -> Option<&'a V> {
        self.find(key)
    }

    pub fn contains_key(&mut self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Obtains the slot a new key should occupy without requiring the
    /// caller to already have a value in hand. Returns
    /// [`AddRaw::Existing`] if `key` is already present.
    ///
    /// The reference hands back an uninitialized entry for the caller to
    /// fill directly; Rust has no safe analogue; a fresh slot is instead
    /// initialized with `V::default()` and handed back by reference.
    pub fn add_raw<'a>(&'a mut self, key: K) -> AddRaw<'a, V>
    where
        V: Default,
    {
        self.expand_if_needed();
        self.rehash_n(1);
        let hash = self.hasher.hash(&key);
        // Collected as a raw pointer rather than returned directly: an early
        // return here would otherwise force the borrow checker to treat
        // `self` as mutably borrowed for the whole function body, which
        // then conflicts with the insertion path below.
        let mut existing: *mut V = std::ptr::null_mut();
        'search: for t in 0..2 {
            if !self.tables[t].is_allocated() {
                continue;
            }
            let idx = self.tables[t].bucket_index(hash);
            let mut cur = self.tables[t].buckets[idx].as_deref_mut();
            while let Some(entry) = cur {
                if entry.key == key {
                    existing = &mut entry.value;
                    break 'search;
                }
                cur = entry.next.as_deref_mut();
            }
            if !self.is_rehashing() {
                break;
            }
        }
        if !existing.is_null() {
            // SAFETY: `existing` points at a value still owned by
            // `self.tables`, not mutated since, borrowed for exactly `'a`.
            return AddRaw::Existing(unsafe { &mut *existing });
        }
        let target = if self.is_rehashing() { 1 } else { 0 };
        let idx = self.tables[target].bucket_index(hash);
        let next = self.tables[target].buckets[idx].take();
        self.tables[target].buckets[idx] = Some(Entry::new(key, V::default(), next));
        self.tables[target].used += 1;
        AddRaw::Inserted(&mut self.tables[target].buckets[idx].as_mut().unwrap().value)
    }

    /// Inserts `(key, value)`. Fails with [`DictError::KeyExists`] if `key`
    /// is already present.
    pub fn add(&mut self, key: K, value: V) -> Result<(), DictError>
    where
        V: Default,
    {
        match self.add_raw(key) {
            AddRaw::Inserted(slot) => {
                *slot = value;
                Ok(())
            }
            AddRaw::Existing(_) => Err(DictError::KeyExists),
        }
    }

    /// Returns a mutable reference to `key`'s value, inserting
    /// `V::default()` first if absent.
    pub fn add_or_find(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        match self.add_raw(key) {
            AddRaw::Inserted(slot) | AddRaw::Existing(slot) => slot,
        }
    }

    /// Inserts or overwrites `key`'s value. Returns `true` if this added a
    /// new entry, `false` if it overwrote (and dropped) an existing value.
    pub fn replace(&mut self, key: K, value: V) -> bool
    where
        V: Default,
    {
        match self.add_raw(key) {
            AddRaw::Inserted(slot) => {
                *slot = value;
                true
            }
            AddRaw::Existing(slot) => {
                *slot = value;
                false
            }
        }
    }

    /// Removes `key`, dropping its key and value. Fails with
    /// [`DictError::NotFound`] if absent.
    pub fn delete(&mut self, key: &K) -> Result<(), DictError> {
        self.unlink(key).map(|_| ()).ok_or(DictError::NotFound)
    }

    /// Removes `key` without dropping it, handing the owning box back to
    /// the caller.
    pub fn unlink(&mut self, key: &K) -> Option<UnlinkedEntry<K, V>> {
        self.rehash_n(1);
        let hash = self.hasher.hash(key);
        for t in 0..2 {
            if !self.tables[t].is_allocated() {
                continue;
            }
            let idx = self.tables[t].bucket_index(hash);
            if let Some(entry) = remove_from_chain(&mut self.tables[t].buckets[idx], key) {
                self.tables[t].used -= 1;
                return Some(UnlinkedEntry { entry });
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }
}

impl<K, V, H> Dict<K, V, H> {
    /// Releases an entry previously removed by [`unlink`](Self::unlink).
    /// Dropping the entry directly has the same effect; this exists for
    /// parity with the reference's explicit `freeUnlinkedEntry` call.
    pub fn free_unlinked_entry(&self, _entry: UnlinkedEntry<K, V>) {}
}

fn remove_from_chain<K: Eq, V>(
    head: &mut Option<Box<Entry<K, V>>>,
    key: &K,
) -> Option<Box<Entry<K, V>>> {
    let mut cur = head;
    loop {
        match cur {
            None => return None,
            Some(node) if node.key == *key => {
                let mut node = cur.take().unwrap();
                *cur = node.next.take();
                return Some(node);
            }
            Some(node) => {
                cur = &mut node.next;
            }
        }
    }
}
