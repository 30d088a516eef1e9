//! Human-readable diagnostics (`getStats` in §6): a chain-length histogram
//! per table, formatted for logging rather than programmatic consumption.

use std::fmt;

use super::Dict;

const HISTOGRAM_BUCKETS: usize = 50;

/// A snapshot of one table's chain-length distribution: `histogram[i]`
/// counts buckets whose chain length is exactly `i`, except the last slot,
/// which accumulates every chain of length `>= HISTOGRAM_BUCKETS - 1`.
pub struct TableStats {
    pub size: usize,
    pub used: usize,
    pub histogram: [usize; HISTOGRAM_BUCKETS],
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "size: {}, used: {}", self.size, self.used)?;
        for (len, count) in self.histogram.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            if len == HISTOGRAM_BUCKETS - 1 {
                writeln!(f, "  chains of length >= {len}: {count}")?;
            } else {
                writeln!(f, "  chains of length {len}: {count}")?;
            }
        }
        Ok(())
    }
}

/// Chain-length histograms for both halves of a [`Dict`]; `table1` is
/// `None` outside of a rehash.
pub struct DictStats {
    pub table0: TableStats,
    pub table1: Option<TableStats>,
}

impl fmt::Display for DictStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "table 0:")?;
        write!(f, "{}", self.table0)?;
        if let Some(table1) = &self.table1 {
            writeln!(f, "table 1 (rehashing):")?;
            write!(f, "{table1}")?;
        }
        Ok(())
    }
}

fn table_stats<K, V>(table: &super::table::Table<K, V>) -> TableStats {
    let mut histogram = [0usize; HISTOGRAM_BUCKETS];
    for bucket in 0..table.size() {
        let len = table.chain_len(bucket).min(HISTOGRAM_BUCKETS - 1);
        histogram[len] += 1;
    }
    TableStats {
        size: table.size(),
        used: table.used,
        histogram,
    }
}

impl<K, V, H> Dict<K, V, H> {
    /// Builds a diagnostics snapshot. Cheap relative to the table size (one
    /// pass over every bucket) but not free; intended for periodic logging,
    /// not a hot path.
    pub fn get_stats(&self) -> DictStats {
        DictStats {
            table0: table_stats(&self.tables[0]),
            table1: self.is_rehashing().then(|| table_stats(&self.tables[1])),
        }
    }
}
