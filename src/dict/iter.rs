//! Safe (mutation-tolerant) and unsafe (fingerprinted) iterators over a
//! [`Dict`] (§4.3).
//!
//! Both share the same advance algorithm: seize a bucket's chain head,
//! remember its successor before yielding the head, and on the next call
//! move to the remembered successor rather than re-reading the (possibly
//! now-unlinked) current entry. That is what lets a safe iterator tolerate a
//! caller deleting the entry it just returned.

use super::hash::KeyHasher;
use super::ops::UnlinkedEntry;
use super::table::Entry;
use super::Dict;

/// A cursor over a [`Dict`] that holds the dict's rehashing paused for its
/// whole lifetime, so the caller may freely insert into or delete from the
/// dict (via [`Dict::add`]/[`Dict::delete`] reached through
/// [`SafeIter::dict_mut`], or via [`SafeIter::delete_current`] for the
/// entry just yielded) without the iterator missing or repeating entries.
pub struct SafeIter<'a, K, V, H> {
    dict: &'a mut Dict<K, V, H>,
    table_idx: usize,
    bucket_idx: usize,
    current: *mut Entry<K, V>,
    next: *mut Entry<K, V>,
    started: bool,
}

impl<'a, K, V, H> SafeIter<'a, K, V, H> {
    pub(crate) fn new(dict: &'a mut Dict<K, V, H>) -> Self {
        SafeIter {
            dict,
            table_idx: 0,
            bucket_idx: usize::MAX,
            current: std::ptr::null_mut(),
            next: std::ptr::null_mut(),
            started: false,
        }
    }

    /// Grants access to the underlying dict for mutation interleaved with
    /// iteration (insert, or delete of a key other than the one just
    /// yielded). Deleting the just-yielded key should go through
    /// [`delete_current`](Self::delete_current) instead.
    pub fn dict_mut(&mut self) -> &mut Dict<K, V, H> {
        self.dict
    }

    fn seek_next_bucket(&mut self) -> bool {
        loop {
            self.bucket_idx = self.bucket_idx.wrapping_add(1);
            let size = self.dict.tables[self.table_idx].size();
            if self.bucket_idx < size {
                if self.dict.tables[self.table_idx].buckets[self.bucket_idx].is_some() {
                    return true;
                }
                continue;
            }
            if self.table_idx == 0 && self.dict.tables[1].is_allocated() {
                self.table_idx = 1;
                self.bucket_idx = usize::MAX;
                continue;
            }
            return false;
        }
    }

    /// Advances to the next entry.
    ///
    /// Not an `Iterator` impl: the returned references borrow `self`, which
    /// `Iterator::next`'s signature cannot express (a lending iterator).
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(&K, &V)> {
        if !self.started {
            self.started = true;
            self.dict.pause_rehashing();
        }
        if !self.current.is_null() {
            self.current = self.next;
        }
        if self.current.is_null() {
            if !self.seek_next_bucket() {
                return None;
            }
            let head = self.dict.tables[self.table_idx].buckets[self.bucket_idx]
                .as_deref_mut()
                .expect("seek_next_bucket only stops on a non-empty bucket");
            self.current = head as *mut Entry<K, V>;
        }
        unsafe {
            let entry = &mut *self.current;
            self.next = entry
                .next
                .as_deref_mut()
                .map_or(std::ptr::null_mut(), |b| b as *mut Entry<K, V>);
            Some((&entry.key, &entry.value))
        }
    }

    /// Removes the entry most recently returned by [`next`](Self::next).
    /// Safe to call even though this iterator otherwise holds an exclusive
    /// borrow of the dict: the successor needed to resume iteration was
    /// already captured before this call.
    pub fn delete_current(&mut self) -> Option<UnlinkedEntry<K, V>>
    where
        K: Eq,
        H: KeyHasher<K>,
    {
        if self.current.is_null() {
            return None;
        }
        // SAFETY: `current` still points at a live entry owned by `dict`
        // (we have not advanced past it), and `unlink` only reads through
        // this reference for key comparisons before it removes the node;
        // the backing allocation is not freed until the returned
        // `UnlinkedEntry` is dropped by the caller, after this call returns.
        let key: &K = unsafe { &(*self.current).key };
        self.dict.unlink(key)
    }
}

impl<'a, K, V, H> Drop for SafeIter<'a, K, V, H> {
    fn drop(&mut self) {
        if self.started {
            self.dict.resume_rehashing();
        }
    }
}

/// A read-only cursor over a [`Dict`] that detects, via a structural
/// fingerprint checked on drop, whether the dict was mutated while the
/// iterator was live. Calling any method that would trigger an incremental
/// rehash step (`find`, `add`, `delete`, ...) while this iterator is live is
/// a contract violation that this assertion is designed to catch.
///
/// Unlike [`SafeIter`], this cursor does not hold a borrow of the dict — it
/// is built from a raw pointer so that the caller remains free to call
/// mutating methods on the dict at the type level. That freedom is exactly
/// what makes it `unsafe`: nothing but the fingerprint assertion on drop
/// stands between a caller who violates the read-only contract and a
/// dangling reference.
pub struct UnsafeIter<K, V, H> {
    dict: *const Dict<K, V, H>,
    table_idx: usize,
    bucket_idx: usize,
    current: *const Entry<K, V>,
    fingerprint: Option<u64>,
}

impl<K, V, H> UnsafeIter<K, V, H> {
    /// # Safety
    /// The caller must not mutate the dict `dict` points to for as long as
    /// the returned iterator is live.
    pub(crate) unsafe fn new(dict: *const Dict<K, V, H>) -> Self {
        UnsafeIter {
            dict,
            table_idx: 0,
            bucket_idx: usize::MAX,
            current: std::ptr::null(),
            fingerprint: None,
        }
    }

    fn dict(&self) -> &Dict<K, V, H> {
        // SAFETY: constructing this iterator requires the caller to uphold
        // the no-concurrent-mutation contract for its whole lifetime.
        unsafe { &*self.dict }
    }

    fn compute_fingerprint(&self) -> u64 {
        let (p0, s0, u0) = self.dict().tables[0].structural_fingerprint();
        let (p1, s1, u1) = self.dict().tables[1].structural_fingerprint();
        [p0 as u64, s0 as u64, u0 as u64, p1 as u64, s1 as u64, u1 as u64]
            .into_iter()
            .fold(0u64, |acc, v| acc ^ thomas_wang_hash(v))
    }

    fn seek_next_bucket(&mut self) -> bool {
        loop {
            self.bucket_idx = self.bucket_idx.wrapping_add(1);
            let size = self.dict().tables[self.table_idx].size();
            if self.bucket_idx < size {
                if self.dict().tables[self.table_idx].buckets[self.bucket_idx].is_some() {
                    return true;
                }
                continue;
            }
            if self.table_idx == 0 && self.dict().tables[1].is_allocated() {
                self.table_idx = 1;
                self.bucket_idx = usize::MAX;
                continue;
            }
            return false;
        }
    }

    /// Not an `Iterator` impl for the same lending-iterator reason as
    /// [`SafeIter::next`].
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(&K, &V)> {
        if self.fingerprint.is_none() {
            self.fingerprint = Some(self.compute_fingerprint());
        }
        if !self.current.is_null() {
            // SAFETY: `current` was produced from a live chain reference on
            // the previous call and the dict has not been mutated (that is
            // exactly what the fingerprint on drop verifies).
            self.current = unsafe { (*self.current).next.as_deref() }
                .map_or(std::ptr::null(), |e| e as *const Entry<K, V>);
        }
        if self.current.is_null() {
            if !self.seek_next_bucket() {
                return None;
            }
            let head = self.dict().tables[self.table_idx].buckets[self.bucket_idx]
                .as_deref()
                .expect("seek_next_bucket only stops on a non-empty bucket");
            self.current = head as *const Entry<K, V>;
        }
        unsafe {
            let entry = &*self.current;
            Some((&entry.key, &entry.value))
        }
    }
}

impl<K, V, H> Drop for UnsafeIter<K, V, H> {
    fn drop(&mut self) {
        if let Some(fingerprint) = self.fingerprint {
            assert_eq!(
                fingerprint,
                self.compute_fingerprint(),
                "dict: unsafe iterator fingerprint mismatch, the dict was mutated while it was live"
            );
        }
    }
}

/// The classic Thomas Wang 64-bit integer mix, used unmodified by the
/// reference implementation to combine a dict's structural fingerprint.
fn thomas_wang_hash(mut key: u64) -> u64 {
    key = (!key).wrapping_add(key << 21);
    key ^= key >> 24;
    key = key.wrapping_add(key << 3).wrapping_add(key << 8);
    key ^= key >> 14;
    key = key.wrapping_add(key << 2).wrapping_add(key << 4);
    key ^= key >> 28;
    key = key.wrapping_add(key << 31);
    key
}

impl<K: Eq, V, H: KeyHasher<K>> Dict<K, V, H> {
    /// Opens a safe, mutation-tolerant iterator over every current entry.
    pub fn get_safe_iterator(&mut self) -> SafeIter<'_, K, V, H> {
        SafeIter::new(self)
    }

    /// Opens a read-only, fingerprinted iterator over every current entry.
    ///
    /// # Safety
    /// The caller must not call any mutating method, or any lookup that
    /// performs an incremental rehash step, on this dict while the returned
    /// iterator is live. Violating this is detected on a best-effort basis
    /// (a fingerprint mismatch panics when the iterator is dropped) but is
    /// not guaranteed to be caught before undefined behavior occurs.
    pub unsafe fn get_iterator(&self) -> UnsafeIter<K, V, H> {
        UnsafeIter::new(self as *const Dict<K, V, H>)
    }
}

#[cfg(test)]
mod tests {
    use super::super::Dict;

    #[test]
    fn safe_iterator_visits_every_entry_once() {
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        for i in 0..20u32 {
            d.add(i.to_be_bytes().to_vec(), i).unwrap();
        }
        let mut seen = std::collections::HashSet::new();
        let mut iter = d.get_safe_iterator();
        while let Some((k, v)) = iter.next() {
            assert!(seen.insert(k.clone()));
            assert_eq!(u32::from_be_bytes(k.clone().try_into().unwrap()), *v);
        }
        drop(iter);
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn safe_iterator_tolerates_deleting_just_returned_entry() {
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        for i in 0..10u32 {
            d.add(i.to_be_bytes().to_vec(), i).unwrap();
        }
        let mut visits = 0;
        let mut iter = d.get_safe_iterator();
        while iter.next().is_some() {
            visits += 1;
            iter.delete_current();
        }
        drop(iter);
        assert_eq!(visits, 10);
        assert_eq!(d.len(), 0);
    }

    #[test]
    #[should_panic(expected = "fingerprint mismatch")]
    fn unsafe_iterator_detects_mutation_on_drop() {
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        d.add(b"a".to_vec(), 1).unwrap();
        d.add(b"b".to_vec(), 2).unwrap();
        let mut iter = unsafe { d.get_iterator() };
        iter.next();
        drop(iter);
        d.add(b"c".to_vec(), 3).unwrap();
        let mut iter = unsafe { d.get_iterator() };
        iter.next();
        d.add(b"d".to_vec(), 4).unwrap();
        drop(iter);
    }
}
