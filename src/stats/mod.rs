//! Statistics: histograms, sampling, distinct estimation, providers
//!
//! Everything the cost model knows about data distributions lives here.
//! Histograms and most-common-value tables answer selectivity questions;
//! the reservoir sampler and HyperLogLog feed histogram construction from
//! streams; the provider hierarchy (heuristic, collected, live) supplies
//! table-level cardinalities with graceful degradation.

mod distinct;
mod histogram;
mod live;
mod provider;
mod sampler;

pub use distinct::HyperLogLog;
pub use histogram::{Histogram, HistogramBucket, HistogramBuilder, McvTable};
pub use live::{LiveStatistics, RangeChunk};
pub use provider::{
    CollectedStatistics, FieldStatistics, HeuristicStatistics, IndexStatistics,
    StatisticsProvider, TableStatistics,
};
pub use sampler::ReservoirSampler;
