//! An incrementally-rehashing, separately-chained hash table.
//!
//! [`Dict`] is the core data structure: two [`Table`](table::Table)s, a
//! signed rehash cursor, and a pause counter, following the dual-table
//! design of the reference key/value index this crate is modeled on. Growth
//! and shrink work is never done in one shot; it is spread one bucket at a
//! time across subsequent `add`/`find`/`delete` calls (§4.1), so that no
//! single operation pays for migrating the whole table.

mod error;
mod hash;
mod iter;
mod ops;
mod rehash;
mod sample;
mod scan;
mod stats;
mod table;

pub use error::DictError;
pub use hash::{set_hash_function_seed, CaseInsensitiveHasher, CaseSensitiveHasher, KeyHasher};
pub use iter::{SafeIter, UnsafeIter};
pub use ops::{AddRaw, UnlinkedEntry};
pub use stats::DictStats;

use std::sync::atomic::{AtomicBool, Ordering};

use table::Table;

/// Initial bucket count of a freshly-allocated table. Fixed, like the
/// reference implementation's constant of the same role.
pub(crate) const INITIAL_SIZE: usize = 4;

/// Load factor above which growth proceeds even while voluntary resizing is
/// disabled process-wide.
pub(crate) const FORCE_RATIO: usize = 5;

/// Empty-bucket visit budget per requested rehash step, as a multiple of the
/// number of steps requested. Bounds the latency of a single `rehash_n` call
/// on a sparse table.
pub(crate) const EMPTY_VISIT_FACTOR: usize = 10;

/// Step count per burst in [`Dict::rehash_milliseconds`].
pub(crate) const REHASH_BATCH: usize = 100;

static RESIZE_ENABLED: AtomicBool = AtomicBool::new(true);

/// Re-enables voluntary growth, reversing a prior [`disable_resize`]. Process
/// wide: intended for a parent process to call once a copy-on-write
/// snapshotting child has exited.
pub fn enable_resize() {
    RESIZE_ENABLED.store(true, Ordering::Relaxed);
}

/// Suppresses voluntary growth process-wide so that a forked snapshotting
/// child's copy-on-write pages are not needlessly duplicated by a resize in
/// the parent. Growth above [`FORCE_RATIO`] still proceeds regardless.
pub fn disable_resize() {
    RESIZE_ENABLED.store(false, Ordering::Relaxed);
}

pub(crate) fn resize_allowed() -> bool {
    RESIZE_ENABLED.load(Ordering::Relaxed)
}

/// A key/value index backed by two chained hash tables, one of which is
/// populated only while a rehash is in progress.
///
/// `H` supplies the seeded hash function (§4.6); the default,
/// [`CaseSensitiveHasher`], hashes the key's byte representation with
/// SipHash-2-4. Equality is whatever `K: Eq` the caller's key type provides —
/// callers who need case-insensitive lookup pair [`CaseInsensitiveHasher`]
/// with a key newtype whose `Eq` impl folds case.
pub struct Dict<K, V, H = CaseSensitiveHasher> {
    pub(crate) tables: [Table<K, V>; 2],
    /// `-1` when not rehashing, else the next `tables[0]` bucket to migrate.
    pub(crate) rehash_idx: isize,
    pub(crate) pause_rehash: u32,
    pub(crate) hasher: H,
    pub(crate) expand_allowed: Option<Box<dyn FnMut(usize, f64) -> bool>>,
}

impl<K, V> Dict<K, V, CaseSensitiveHasher> {
    /// Creates an empty dict using the default case-sensitive SipHash-2-4
    /// key hasher. No bucket array is allocated until the first insert.
    pub fn new() -> Self {
        Self::with_hasher(CaseSensitiveHasher)
    }
}

impl<K, V> Default for Dict<K, V, CaseSensitiveHasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> Dict<K, V, H> {
    /// Creates an empty dict using a caller-supplied key hasher.
    pub fn with_hasher(hasher: H) -> Self {
        Dict {
            tables: [Table::empty(), Table::empty()],
            rehash_idx: -1,
            pause_rehash: 0,
            hasher,
            expand_allowed: None,
        }
    }

    /// Installs the `expandAllowed(bytes, load_factor) -> bool` predicate
    /// consulted by the rehash controller before any growth, voluntary or
    /// forced (§4.1).
    pub fn set_expand_allowed(&mut self, predicate: impl FnMut(usize, f64) -> bool + 'static) {
        self.expand_allowed = Some(Box::new(predicate));
    }

    /// Total number of live entries across both tables.
    pub fn len(&self) -> usize {
        self.tables[0].used + self.tables[1].used
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` while entries are being migrated from `tables[0]` to
    /// `tables[1]`.
    #[inline]
    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx >= 0
    }

    /// Increments the pause-rehash counter: while it is nonzero, no
    /// incremental or bulk migration step runs, though lookups, inserts and
    /// deletes still succeed. Used internally by [`SafeIter`] and
    /// [`Dict::scan`], and exposed so callers can wrap a copy-on-write
    /// snapshot fork the same way.
    pub fn pause_rehashing(&mut self) {
        self.pause_rehash += 1;
    }

    /// Reverses one [`pause_rehashing`](Self::pause_rehashing) call.
    pub fn resume_rehashing(&mut self) {
        debug_assert!(self.pause_rehash > 0, "resume_rehashing without matching pause");
        self.pause_rehash -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_dict_is_empty_and_unallocated() {
        let d: Dict<Vec<u8>, u32> = Dict::new();
        assert_eq!(d.len(), 0);
        assert!(d.is_empty());
        assert!(!d.is_rehashing());
        assert_eq!(d.tables[0].size(), 0);
    }
}

#[cfg(all(test, feature = "proptest"))]
mod invariant_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::{HashMap, HashSet};

    #[derive(Debug, Clone)]
    enum Op {
        Add(u32),
        Delete(u32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<u32>().prop_map(|k| Op::Add(k % 64)),
            any::<u32>().prop_map(|k| Op::Delete(k % 64)),
        ]
    }

    fn assert_structural_invariants(d: &Dict<Vec<u8>, u32>) {
        // P5
        assert!(d.tables[0].size() == 0 || d.tables[0].size().is_power_of_two());
        assert!(d.tables[1].size() == 0 || d.tables[1].size().is_power_of_two());
        // P2
        assert_eq!(d.tables[1].size() > 0, d.is_rehashing());
        // P3
        if d.is_rehashing() {
            for idx in 0..d.rehash_idx as usize {
                assert!(d.tables[0].buckets[idx].is_none(), "bucket {idx} should already be migrated");
            }
        }
        // P4
        if d.is_rehashing() {
            let mut in_zero = HashSet::new();
            for bucket in &d.tables[0].buckets {
                let mut cur = bucket.as_deref();
                while let Some(entry) = cur {
                    in_zero.insert(entry.key.clone());
                    cur = entry.next.as_deref();
                }
            }
            for bucket in &d.tables[1].buckets {
                let mut cur = bucket.as_deref();
                while let Some(entry) = cur {
                    assert!(!in_zero.contains(&entry.key), "key present in both tables");
                    cur = entry.next.as_deref();
                }
            }
        }
    }

    proptest! {
        // P1-P5, R1, R2 over a random sequence of add/delete operations.
        #[test]
        fn invariants_hold_after_arbitrary_add_delete_sequences(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut d: Dict<Vec<u8>, u32> = Dict::new();
            let mut model: HashMap<u32, u32> = HashMap::new();

            for op in ops {
                match op {
                    Op::Add(k) => {
                        let key = k.to_be_bytes().to_vec();
                        let _ = d.add(key.clone(), k);
                        model.insert(k, k);
                        prop_assert_eq!(d.find(&key), Some(&k));
                    }
                    Op::Delete(k) => {
                        let key = k.to_be_bytes().to_vec();
                        let _ = d.delete(&key);
                        model.remove(&k);
                        prop_assert_eq!(d.find(&key), None);
                    }
                }
                assert_structural_invariants(&d);
            }

            prop_assert_eq!(d.len(), model.len());
            for (k, v) in &model {
                prop_assert_eq!(d.find(&k.to_be_bytes().to_vec()), Some(v));
            }
        }
    }
}
