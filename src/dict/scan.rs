//! Stateless reverse-binary cursor scan (§4.4).
//!
//! `scan` is safe to interleave with growth: resizing the table between
//! calls never causes an entry present for the whole scan to be skipped,
//! though it may be emitted more than once. That guarantee rests entirely on
//! the cursor update advancing through the *high* bits of the size mask
//! first, which is exactly what the reverse-binary increment below does.

use super::hash::KeyHasher;
use super::Dict;

impl<K, V, H: KeyHasher<K>> Dict<K, V, H> {
    /// Visits every entry reachable from cursor `v`, calling `on_entry` for
    /// each and `on_bucket` once per visited bucket (with that bucket's
    /// chain length) before its entries are emitted — the hook a caller
    /// would use to, say, reallocate a bucket's backing storage. Returns the
    /// cursor to pass on the next call; a return of `0` means the scan has
    /// completed a full cycle.
    ///
    /// Rehashing is paused for the duration of the call, so `on_entry` may
    /// freely call [`find`](Dict::find) (or any other lookup) on this same
    /// dict.
    pub fn scan<F, B>(&mut self, v: u64, mut on_entry: F, mut on_bucket: B) -> u64
    where
        F: FnMut(&K, &V),
        B: FnMut(usize),
    {
        if self.is_empty() {
            return 0;
        }
        self.pause_rehashing();
        let next = if !self.is_rehashing() {
            let m0 = self.tables[0].mask() as u64;
            visit_bucket(&self.tables[0], v & m0, &mut on_entry, &mut on_bucket);
            advance(v, m0)
        } else {
            let (small, large) = if self.tables[0].size() > self.tables[1].size() {
                (1, 0)
            } else {
                (0, 1)
            };
            let m0 = self.tables[small].mask() as u64;
            let m1 = self.tables[large].mask() as u64;
            visit_bucket(&self.tables[small], v & m0, &mut on_entry, &mut on_bucket);
            let mut v = v;
            loop {
                visit_bucket(&self.tables[large], v & m1, &mut on_entry, &mut on_bucket);
                v |= !m1;
                v = reverse_binary_next(v);
                if v & (m0 ^ m1) == 0 {
                    break;
                }
            }
            // `v` is already the correct next cursor: the loop above only
            // stops once it lands back on a value sharing `small`'s bucket
            // with the *next* group, so no further advance is needed (doing
            // one would skip every other group of `large`'s buckets).
            v
        };
        self.resume_rehashing();
        next
    }
}

fn visit_bucket<K, V>(
    table: &super::table::Table<K, V>,
    bucket: u64,
    on_entry: &mut impl FnMut(&K, &V),
    on_bucket: &mut impl FnMut(usize),
) {
    let idx = bucket as usize;
    if idx >= table.size() {
        return;
    }
    on_bucket(table.chain_len(idx));
    let mut cur = table.buckets[idx].as_deref();
    while let Some(entry) = cur {
        on_entry(&entry.key, &entry.value);
        cur = entry.next.as_deref();
    }
}

fn advance(v: u64, m0: u64) -> u64 {
    reverse_binary_next(v | !m0)
}

/// `v |= high bits already set by the caller; v++ under bit reversal; v`
/// reversed back. This is the increment that visits mask bits from the top
/// down instead of the bottom up, which is what makes the cursor stable
/// across a resize.
fn reverse_binary_next(v: u64) -> u64 {
    let mut v = v.reverse_bits();
    v = v.wrapping_add(1);
    v.reverse_bits()
}

#[cfg(test)]
mod tests {
    use super::super::Dict;
    use std::collections::HashSet;

    #[test]
    fn scan_visits_every_entry_over_one_cycle() {
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        for i in 0..100u32 {
            d.add(i.to_be_bytes().to_vec(), i).unwrap();
        }
        let mut seen = HashSet::new();
        let mut cursor = 0u64;
        loop {
            cursor = d.scan(cursor, |k, _v| { seen.insert(k.clone()); }, |_| {});
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(seen.len(), 100);
    }

    #[test]
    fn scan_survives_growth_mid_scan() {
        // Only keys present for the *entire* scan are guaranteed to be
        // emitted; keys inserted after the first `scan` call are not.
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        for i in 0..8u32 {
            d.add(i.to_be_bytes().to_vec(), i).unwrap();
        }
        let mut seen = HashSet::new();
        let mut cursor = d.scan(0, |k, _v| { seen.insert(k.clone()); }, |_| {});
        for i in 8..64u32 {
            d.add(i.to_be_bytes().to_vec(), i).unwrap();
        }
        loop {
            cursor = d.scan(cursor, |k, _v| { seen.insert(k.clone()); }, |_| {});
            if cursor == 0 {
                break;
            }
        }
        for i in 0..8u32 {
            assert!(seen.contains(i.to_be_bytes().as_slice()), "missing key {i}");
        }
    }

    #[test]
    fn reverse_binary_next_visits_every_value_under_a_small_mask_once() {
        let mask: u64 = 0b111;
        let mut v = 0u64;
        let mut seen = HashSet::new();
        loop {
            assert!(seen.insert(v), "cursor {v} repeated before completing a cycle");
            v = super::advance(v, mask);
            if v == 0 {
                break;
            }
        }
        assert_eq!(seen.len(), (mask + 1) as usize);
    }
}
