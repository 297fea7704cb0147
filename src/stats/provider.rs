//! Statistics providers
//!
//! The planner asks one `StatisticsProvider` for everything: table
//! cardinality, per-field distributions, index entry counts. Three tiers:
//! fixed heuristics (last resort), collected statistics fed by ANALYZE-style
//! jobs and runtime feedback, and the async live provider in `live.rs`
//! backed by storage range estimation.

use super::{Histogram, McvTable};
use crate::types::{Timestamp, Value};
use ahash::AHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Read interface of every statistics source. All selectivities are in
/// [0, 1]; all calls are synchronous and cheap.
pub trait StatisticsProvider: Send + Sync {
    /// Estimated row count of a record type.
    fn row_count(&self, type_name: &str) -> u64;

    /// Estimated distinct values of a field.
    fn distinct_values(&self, type_name: &str, field: &str) -> u64;

    /// Fraction of rows where the field is null.
    fn null_fraction(&self, type_name: &str, field: &str) -> f64;

    /// Fraction of rows where `field == value`.
    fn equality_selectivity(&self, type_name: &str, field: &str, value: &Value) -> f64;

    /// Fraction of rows where the field falls inside the range.
    fn range_selectivity(
        &self,
        type_name: &str,
        field: &str,
        min: Option<&Value>,
        max: Option<&Value>,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> f64;

    /// Fraction of rows where the field is (or is not) null.
    fn null_selectivity(&self, type_name: &str, field: &str, is_null: bool) -> f64;

    /// Entry count of a secondary index, when known.
    fn index_entries(&self, index_name: &str) -> Option<u64>;
}

// ---------------------------------------------------------------------------
// Heuristic provider
// ---------------------------------------------------------------------------

/// Fixed-ratio fallback used when nothing has been collected. The numbers
/// are placeholders, not estimates: 1000 rows, 10% distinct ratio, 5% nulls,
/// 30% range selectivity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicStatistics;

impl HeuristicStatistics {
    pub const DEFAULT_ROW_COUNT: u64 = 1000;
    pub const DISTINCT_RATIO: f64 = 0.10;
    pub const NULL_FRACTION: f64 = 0.05;
    pub const RANGE_SELECTIVITY: f64 = 0.30;
}

impl StatisticsProvider for HeuristicStatistics {
    fn row_count(&self, _type_name: &str) -> u64 {
        Self::DEFAULT_ROW_COUNT
    }

    fn distinct_values(&self, _type_name: &str, _field: &str) -> u64 {
        ((Self::DEFAULT_ROW_COUNT as f64 * Self::DISTINCT_RATIO) as u64).max(1)
    }

    fn null_fraction(&self, _type_name: &str, _field: &str) -> f64 {
        Self::NULL_FRACTION
    }

    fn equality_selectivity(&self, type_name: &str, field: &str, _value: &Value) -> f64 {
        1.0 / self.distinct_values(type_name, field) as f64
    }

    fn range_selectivity(
        &self,
        _type_name: &str,
        _field: &str,
        _min: Option<&Value>,
        _max: Option<&Value>,
        _min_inclusive: bool,
        _max_inclusive: bool,
    ) -> f64 {
        Self::RANGE_SELECTIVITY
    }

    fn null_selectivity(&self, _type_name: &str, _field: &str, is_null: bool) -> f64 {
        if is_null {
            Self::NULL_FRACTION
        } else {
            1.0 - Self::NULL_FRACTION
        }
    }

    fn index_entries(&self, _index_name: &str) -> Option<u64> {
        None
    }
}

// ---------------------------------------------------------------------------
// Collected provider
// ---------------------------------------------------------------------------

/// Table-level statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStatistics {
    pub row_count: u64,
    pub updated_at: Timestamp,
}

impl TableStatistics {
    pub fn new(row_count: u64) -> Self {
        Self {
            row_count,
            updated_at: Timestamp::now(),
        }
    }
}

/// Per-field statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldStatistics {
    pub distinct_count: u64,
    pub null_fraction: f64,
    pub histogram: Option<Histogram>,
    pub mcv: Option<McvTable>,
}

impl FieldStatistics {
    pub fn new(distinct_count: u64, null_fraction: f64) -> Self {
        Self {
            distinct_count,
            null_fraction,
            histogram: None,
            mcv: None,
        }
    }

    pub fn with_histogram(mut self, histogram: Histogram) -> Self {
        self.histogram = Some(histogram);
        self
    }

    pub fn with_mcv(mut self, mcv: McvTable) -> Self {
        self.mcv = Some(mcv);
        self
    }
}

/// Per-index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub entry_count: u64,
    pub updated_at: Timestamp,
}

impl IndexStatistics {
    pub fn new(entry_count: u64) -> Self {
        Self {
            entry_count,
            updated_at: Timestamp::now(),
        }
    }
}

#[derive(Default)]
struct CollectedInner {
    /// Keyed by type name.
    tables: AHashMap<String, TableStatistics>,
    /// Keyed by `type.field`.
    fields: AHashMap<String, FieldStatistics>,
    /// Keyed by index name.
    indexes: AHashMap<String, IndexStatistics>,
}

/// In-memory collected statistics. A single mutex serializes readers and
/// writers; planner reads hold it only long enough to clone the answer, so
/// each plan call observes a consistent snapshot per lookup.
pub struct CollectedStatistics {
    inner: Mutex<CollectedInner>,
    fallback: HeuristicStatistics,
}

impl Default for CollectedStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectedStatistics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CollectedInner::default()),
            fallback: HeuristicStatistics,
        }
    }

    fn field_key(type_name: &str, field: &str) -> String {
        format!("{type_name}.{field}")
    }

    pub fn update_table_stats(&self, type_name: &str, stats: TableStatistics) {
        self.inner
            .lock()
            .tables
            .insert(type_name.to_string(), stats);
    }

    pub fn update_field_stats(&self, type_name: &str, field: &str, stats: FieldStatistics) {
        self.inner
            .lock()
            .fields
            .insert(Self::field_key(type_name, field), stats);
    }

    pub fn update_index_stats(&self, index_name: &str, stats: IndexStatistics) {
        self.inner
            .lock()
            .indexes
            .insert(index_name.to_string(), stats);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.tables.clear();
        inner.fields.clear();
        inner.indexes.clear();
    }

    fn with_field<R>(
        &self,
        type_name: &str,
        field: &str,
        f: impl FnOnce(&FieldStatistics) -> R,
    ) -> Option<R> {
        let inner = self.inner.lock();
        inner.fields.get(&Self::field_key(type_name, field)).map(f)
    }
}

impl StatisticsProvider for CollectedStatistics {
    fn row_count(&self, type_name: &str) -> u64 {
        match self.inner.lock().tables.get(type_name) {
            Some(stats) => stats.row_count,
            None => self.fallback.row_count(type_name),
        }
    }

    fn distinct_values(&self, type_name: &str, field: &str) -> u64 {
        self.with_field(type_name, field, |s| s.distinct_count.max(1))
            .unwrap_or_else(|| self.fallback.distinct_values(type_name, field))
    }

    fn null_fraction(&self, type_name: &str, field: &str) -> f64 {
        self.with_field(type_name, field, |s| s.null_fraction)
            .unwrap_or_else(|| self.fallback.null_fraction(type_name, field))
    }

    fn equality_selectivity(&self, type_name: &str, field: &str, value: &Value) -> f64 {
        let estimate = self.with_field(type_name, field, |s| {
            match (&s.histogram, &s.mcv) {
                (Some(histogram), Some(mcv)) => Some(mcv.equals_selectivity(histogram, value)),
                (Some(histogram), None) => Some(histogram.equals_selectivity(value)),
                _ if s.distinct_count > 0 => Some(1.0 / s.distinct_count as f64),
                _ => None,
            }
        });
        match estimate {
            Some(Some(sel)) => sel,
            _ => self.fallback.equality_selectivity(type_name, field, value),
        }
    }

    fn range_selectivity(
        &self,
        type_name: &str,
        field: &str,
        min: Option<&Value>,
        max: Option<&Value>,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> f64 {
        let estimate = self.with_field(type_name, field, |s| {
            match (&s.histogram, &s.mcv) {
                (Some(histogram), Some(mcv)) => Some(mcv.range_selectivity(
                    histogram,
                    min,
                    max,
                    min_inclusive,
                    max_inclusive,
                )),
                (Some(histogram), None) => {
                    Some(histogram.range_selectivity(min, max, min_inclusive, max_inclusive))
                }
                _ => None,
            }
        });
        match estimate {
            Some(Some(sel)) => sel,
            _ => self.fallback.range_selectivity(
                type_name,
                field,
                min,
                max,
                min_inclusive,
                max_inclusive,
            ),
        }
    }

    fn null_selectivity(&self, type_name: &str, field: &str, is_null: bool) -> f64 {
        let fraction = self.with_field(type_name, field, |s| s.null_fraction);
        match fraction {
            Some(f) => {
                if is_null {
                    f
                } else {
                    1.0 - f
                }
            }
            None => self.fallback.null_selectivity(type_name, field, is_null),
        }
    }

    fn index_entries(&self, index_name: &str) -> Option<u64> {
        self.inner
            .lock()
            .indexes
            .get(index_name)
            .map(|s| s.entry_count)
    }
}
