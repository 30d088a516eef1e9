//! The bucket array backing one half of a [`Dict`](super::Dict).
//!
//! A `Table` is a `Vec` of singly-linked chains. Chain heads live directly in
//! the bucket slot; every other entry is owned by its predecessor through
//! `Entry::next`. `size` is always zero or a power of two so that bucket
//! indexing can use `hash & mask` instead of `hash % size`.

/// One `(key, value)` pair plus the next link in its bucket's chain.
#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    pub key: K,
    pub value: V,
    pub next: Option<Box<Entry<K, V>>>,
}

impl<K, V> Entry<K, V> {
    pub fn new(key: K, value: V, next: Option<Box<Entry<K, V>>>) -> Box<Self> {
        Box::new(Entry { key, value, next })
    }
}

/// A single chained hash table: a power-of-two bucket array plus a live
/// entry count. `size == 0` means the table has not been allocated yet.
#[derive(Debug)]
pub(crate) struct Table<K, V> {
    pub buckets: Vec<Option<Box<Entry<K, V>>>>,
    pub used: usize,
}

impl<K, V> Table<K, V> {
    pub fn empty() -> Self {
        Table {
            buckets: Vec::new(),
            used: 0,
        }
    }

    /// Allocates a table of exactly `size` buckets, all empty. `size` must be
    /// a power of two (or zero).
    pub fn with_size(size: usize) -> Self {
        debug_assert!(size == 0 || size.is_power_of_two());
        let mut buckets = Vec::new();
        buckets.resize_with(size, || None);
        Table { buckets, used: 0 }
    }

    /// Same as [`with_size`](Self::with_size) but reports allocation failure
    /// instead of aborting the process.
    pub fn try_with_size(size: usize) -> Result<Self, std::collections::TryReserveError> {
        debug_assert!(size == 0 || size.is_power_of_two());
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(size)?;
        buckets.resize_with(size, || None);
        Ok(Table { buckets, used: 0 })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn mask(&self) -> usize {
        self.size().wrapping_sub(1)
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        !self.buckets.is_empty()
    }

    #[inline]
    pub fn bucket_index(&self, hash: u64) -> usize {
        (hash as usize) & self.mask()
    }

    /// A compact fingerprint of this table's structural identity: the
    /// backing buffer's address plus its size and live count. Any resize or
    /// reallocation changes the address, so the fingerprint changes too.
    pub fn structural_fingerprint(&self) -> (usize, usize, usize) {
        (self.buckets.as_ptr() as usize, self.size(), self.used)
    }

    pub fn chain_len(&self, bucket: usize) -> usize {
        let mut len = 0;
        let mut cur = self.buckets[bucket].as_deref();
        while let Some(entry) = cur {
            len += 1;
            cur = entry.next.as_deref();
        }
        len
    }
}
