//! Planner configuration
//!
//! Groups the tunables of every planning stage: cost weights, enumeration
//! thresholds, plan-cache sizing, adaptive re-planning, and parallel-scan
//! chunking. All defaults are conservative and safe for embedded use.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relative weights of the cost model terms.
///
/// The defaults favor fewer record fetches over many index reads: a record
/// fetch touches the primary subspace and decodes a full payload, while an
/// index read touches a narrow key range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostWeights {
    /// Cost per index entry read.
    pub index_read: f64,
    /// Cost per record fetched from the primary subspace.
    pub record_fetch: f64,
    /// Cost per row evaluated by a residual filter.
    pub post_filter: f64,
    /// Flat penalty when the plan needs an explicit sort.
    pub sort_penalty: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            index_read: 1.0,
            record_fetch: 4.0,
            post_filter: 0.2,
            sort_penalty: 100.0,
        }
    }
}

/// Plan-cache sizing and expiry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlanCacheConfig {
    /// Maximum number of cached prepared plans.
    pub capacity: usize,
    /// Optional time-to-live; expiry is checked on read.
    #[serde(skip)]
    pub ttl: Option<Duration>,
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl: None,
        }
    }
}

impl PlanCacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Adaptive optimizer tunables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Average relative estimation error above which a re-plan is triggered.
    pub drift_threshold: f64,
    /// Minimum recorded executions before drift is acted on.
    pub min_samples: usize,
    /// Minimum wall-clock spacing between re-plans of the same plan.
    #[serde(skip)]
    pub replan_cooldown: Duration,
    /// Executions kept in the tracker history.
    pub history_limit: usize,
    /// Aggregate and push statistics into the collected provider every this
    /// many recorded executions.
    pub update_threshold: usize,
    /// Ring-buffer length of per-plan error ratios.
    pub error_window: usize,
    /// Adaptation events kept in the log.
    pub event_log_limit: usize,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            drift_threshold: 0.5,
            min_samples: 10,
            replan_cooldown: Duration::from_secs(60),
            history_limit: 1000,
            update_threshold: 100,
            error_window: 100,
            event_log_limit: 256,
        }
    }
}

/// Parallel-scan range division parameters used by the live statistics
/// provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParallelScanConfig {
    /// Target chunk size in bytes when splitting a key range.
    pub chunk_size_bytes: u64,
    /// Upper bound on produced chunks.
    pub max_concurrency: usize,
    /// Average encoded row size, for converting byte estimates to rows.
    pub average_row_size_bytes: u64,
}

impl Default for ParallelScanConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: 4 * 1024 * 1024,
            max_concurrency: 8,
            average_row_size_bytes: 256,
        }
    }
}

/// Top-level planner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Cost model weights.
    pub weights: CostWeights,
    /// IN lists up to this length expand into a seek-per-value union;
    /// longer lists degrade to a single covering range scan.
    pub in_union_threshold: usize,
    /// Distinct leading-prefix values a skip scan will enumerate.
    pub skip_scan_prefix_limit: usize,
    /// Maximum indexes combined in one intersection plan.
    pub max_intersection_indexes: usize,
    /// Histogram bucket target when building from samples.
    pub histogram_buckets: usize,
    /// Reservoir size for streaming sample collection.
    pub sample_reservoir_size: usize,
    /// Push simple limits down into scan operators.
    pub push_down_limits: bool,
    /// Plan cache settings.
    pub cache: PlanCacheConfig,
    /// Adaptive optimizer settings.
    pub adaptive: AdaptiveConfig,
    /// Parallel-scan division settings.
    pub parallel_scan: ParallelScanConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            weights: CostWeights::default(),
            in_union_threshold: 10,
            skip_scan_prefix_limit: 50,
            max_intersection_indexes: 3,
            histogram_buckets: 64,
            sample_reservoir_size: 4096,
            push_down_limits: true,
            cache: PlanCacheConfig::default(),
            adaptive: AdaptiveConfig::default(),
            parallel_scan: ParallelScanConfig::default(),
        }
    }
}

impl PlannerConfig {
    pub fn with_weights(mut self, weights: CostWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_cache(mut self, cache: PlanCacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_adaptive(mut self, adaptive: AdaptiveConfig) -> Self {
        self.adaptive = adaptive;
        self
    }
}
