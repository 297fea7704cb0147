//! recordplan
//!
//! Cost-based query planner for persistable-record databases built on an
//! ordered key-value store. Given a declarative query (predicate tree,
//! sort, limit) over a record type and its secondary indexes, the planner
//! produces an executable operator tree that minimizes estimated I/O while
//! preserving query semantics.
//!
//! ## Architecture
//! - Value model: totally ordered tagged values shared by predicates,
//!   histograms, and scan bounds
//! - Rewriter: flatten, deduplicate, merge ranges, fold constants,
//!   eliminate contradictions
//! - Statistics: equi-height histograms, reservoir sampling, HyperLogLog,
//!   heuristic/collected/live providers
//! - Strategies: scalar B-tree, full-text, vector, spatial index planning
//! - Enumerator + cost model: table scan, index scans, covering scans,
//!   intersections, unions, skip scans; weighted cost selection
//! - Prepared plans: fingerprint-keyed LRU/TTL cache with invalidation
//! - Adaptive optimizer: drift detection and automatic re-planning

pub mod adaptive;
pub mod catalog;
pub mod condition;
pub mod config;
pub mod distance;
pub mod plan;
pub mod planner;
pub mod predicate;
pub mod prepared;
pub mod query;
pub mod stats;
pub mod storage;
pub mod strategy;
pub mod types;

mod error;

pub use config::{
    AdaptiveConfig, CostWeights, ParallelScanConfig, PlanCacheConfig, PlannerConfig,
};
pub use error::{PlannerError, Result};

// Primary planning API
pub use catalog::{FieldDef, FieldType, IndexDescriptor, IndexKind, RecordCatalog, RecordSchema};
pub use plan::{Operator, Plan, PlanCost, ScanBounds};
pub use planner::{PlannerMetrics, QueryPlanner};
pub use predicate::{ComparisonOp, FieldComparison, Operand, Predicate};
pub use query::{PlanFamily, PlanningHints, Query};
pub use types::{Record, RecordId, SortDescriptor, SortDirection, Timestamp, Value, ValueKind};

// Conditions and constraint families
pub use condition::{
    FieldCondition, PatternType, ScalarBounds, SpatialConstraint, TextMatchMode,
};
pub use distance::DistanceMetric;

// Statistics surface
pub use stats::{
    CollectedStatistics, FieldStatistics, HeuristicStatistics, Histogram, HistogramBuilder,
    HyperLogLog, IndexStatistics, LiveStatistics, McvTable, ReservoirSampler,
    StatisticsProvider, TableStatistics,
};

// Prepared plans and adaptation
pub use adaptive::{AdaptiveOptimizer, AdaptivePlan, RuntimeStatisticsTracker};
pub use prepared::{PlanCache, PreparedPlan, PreparedQueries, QueryFingerprint};
