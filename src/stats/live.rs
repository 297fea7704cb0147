//! Live statistics provider
//!
//! Wraps the storage engine's server-side range-size estimation to refine
//! row counts at planning time. The async surface here is the only
//! suspending code on the planning path; callers may cancel by dropping the
//! future, which aborts the underlying read-only storage operation.
//!
//! Every failure degrades: the error is logged, recorded as a planner
//! warning upstream, and the synchronous collected/heuristic answer is used
//! instead. `StatisticsUnavailable` never escapes `plan()`.

use super::{CollectedStatistics, StatisticsProvider};
use crate::config::ParallelScanConfig;
use crate::error::{PlannerError, Result};
use crate::storage::{KeyRange, RangeStorage};
use crate::types::Value;
use log::warn;
use std::sync::Arc;

/// One chunk of a divided scan range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeChunk {
    pub range: KeyRange,
    /// Estimated chunk payload in bytes.
    pub estimated_bytes: u64,
}

/// Statistics provider with async storage-backed range estimation. The
/// synchronous `StatisticsProvider` surface delegates to the wrapped
/// collected statistics.
pub struct LiveStatistics<S: RangeStorage> {
    storage: Arc<S>,
    collected: Arc<CollectedStatistics>,
    config: ParallelScanConfig,
}

impl<S: RangeStorage> LiveStatistics<S> {
    pub fn new(storage: Arc<S>, collected: Arc<CollectedStatistics>) -> Self {
        Self {
            storage,
            collected,
            config: ParallelScanConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ParallelScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn collected(&self) -> &Arc<CollectedStatistics> {
        &self.collected
    }

    /// Estimated rows in `[begin, end)`, converting the storage byte
    /// estimate through the configured average row size.
    pub async fn estimated_range_rows(&self, begin: &[u8], end: &[u8]) -> Result<u64> {
        let bytes = self
            .storage
            .estimated_range_size_bytes(begin, end)
            .await
            .map_err(|e| {
                warn!("live range-size estimation failed: {e}");
                PlannerError::StatisticsUnavailable(e.to_string())
            })?;
        Ok(bytes / self.config.average_row_size_bytes.max(1))
    }

    /// Divide `[begin, end)` into roughly equal-sized chunks, bounded by
    /// `max_concurrency`. Chunk boundaries come from storage split points,
    /// so each chunk covers a comparable byte volume rather than a
    /// comparable key span.
    pub async fn divide_range_for_parallel_scan(
        &self,
        begin: &[u8],
        end: &[u8],
        config: &ParallelScanConfig,
    ) -> Result<Vec<RangeChunk>> {
        let total_bytes = self
            .storage
            .estimated_range_size_bytes(begin, end)
            .await
            .map_err(|e| PlannerError::StatisticsUnavailable(e.to_string()))?;

        if total_bytes == 0 || config.max_concurrency <= 1 {
            return Ok(vec![RangeChunk {
                range: KeyRange::new(begin.to_vec(), end.to_vec()),
                estimated_bytes: total_bytes,
            }]);
        }

        // Chunks large enough that their count never exceeds the
        // concurrency bound.
        let chunk_size = config
            .chunk_size_bytes
            .max(total_bytes.div_ceil(config.max_concurrency as u64));

        let mut points = self
            .storage
            .range_split_points(begin, end, chunk_size)
            .await
            .map_err(|e| PlannerError::StatisticsUnavailable(e.to_string()))?;
        points.retain(|p| p.as_slice() > begin && p.as_slice() < end);
        points.truncate(config.max_concurrency.saturating_sub(1));

        let mut chunks = Vec::with_capacity(points.len() + 1);
        let mut chunk_begin = begin.to_vec();
        for point in points {
            chunks.push(RangeChunk {
                range: KeyRange::new(chunk_begin.clone(), point.clone()),
                estimated_bytes: total_bytes / (1 + chunks.len() as u64).max(1),
            });
            chunk_begin = point;
        }
        chunks.push(RangeChunk {
            range: KeyRange::new(chunk_begin, end.to_vec()),
            estimated_bytes: total_bytes / (chunks.len() as u64 + 1),
        });

        // Even out the per-chunk estimate now that the count is final.
        let per_chunk = total_bytes / chunks.len() as u64;
        for chunk in &mut chunks {
            chunk.estimated_bytes = per_chunk;
        }
        Ok(chunks)
    }
}

impl<S: RangeStorage> StatisticsProvider for LiveStatistics<S> {
    fn row_count(&self, type_name: &str) -> u64 {
        self.collected.row_count(type_name)
    }

    fn distinct_values(&self, type_name: &str, field: &str) -> u64 {
        self.collected.distinct_values(type_name, field)
    }

    fn null_fraction(&self, type_name: &str, field: &str) -> f64 {
        self.collected.null_fraction(type_name, field)
    }

    fn equality_selectivity(&self, type_name: &str, field: &str, value: &Value) -> f64 {
        self.collected.equality_selectivity(type_name, field, value)
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
        self.collected
            .range_selectivity(type_name, field, min, max, min_inclusive, max_inclusive)
    }

    fn null_selectivity(&self, type_name: &str, field: &str, is_null: bool) -> f64 {
        self.collected.null_selectivity(type_name, field, is_null)
    }

    fn index_entries(&self, index_name: &str) -> Option<u64> {
        self.collected.index_entries(index_name)
    }
}
