//! Index planning strategies
//!
//! One strategy per index kind. A strategy inspects the analyzed conditions,
//! reports what an index can satisfy (`MatchResult`), builds the matching
//! scan operator, and prices it. The enumerator composes strategy output
//! into whole candidate plans; strategies never see each other.

mod scalar;
mod spatial;
mod text;
mod vector;

pub use scalar::ScalarStrategy;
pub use spatial::SpatialStrategy;
pub use text::TextStrategy;
pub use vector::VectorStrategy;

use crate::catalog::{IndexDescriptor, IndexKind};
use crate::condition::FieldCondition;
use crate::config::PlannerConfig;
use crate::plan::{Operator, PlanCost, ScanBounds};
use crate::planner::analyzer::QueryAnalysis;
use crate::stats::StatisticsProvider;
use crate::types::{SortDescriptor, Value};
use ahash::AHashMap;

/// A planned IN expansion: the key position the membership list lands on,
/// after the equality prefix.
#[derive(Debug, Clone)]
pub struct InExpansion {
    pub field: String,
    pub values: Vec<Value>,
}

/// What one index can do for one query.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Conditions fully enforced by the index access itself.
    pub satisfied: Vec<FieldCondition>,
    /// Conditions the index narrows but does not fully enforce (an IN
    /// served as a conservative range, for example); they stay in the
    /// residual filter.
    pub partial: Vec<FieldCondition>,
    /// Whether index order satisfies the query's sort requirements.
    pub satisfies_ordering: bool,
    /// Reverse traversal needed to satisfy a descending sort.
    pub reverse: bool,
    pub scan_bounds: ScanBounds,
    /// Combined selectivity of the satisfied conditions.
    pub selectivity: f64,
    pub estimated_entries: u64,
    /// Every key column is bound by an equality.
    pub full_key_equality: bool,
    /// Values of the leading equality-bound key columns, in key order.
    pub equality_prefix: Vec<Value>,
    /// Membership list terminating the prefix, when expansion applies.
    pub in_expansion: Option<InExpansion>,
}

impl MatchResult {
    pub fn satisfied_identifiers(&self) -> Vec<String> {
        self.satisfied.iter().map(FieldCondition::identifier).collect()
    }

    pub fn satisfied_count(&self) -> usize {
        self.satisfied.len()
    }
}

/// Per-index-kind planning behavior.
pub trait IndexPlanningStrategy: Send + Sync {
    /// The index kind this strategy understands.
    fn kind(&self) -> IndexKind;

    /// Match the analyzed conditions against an index. None when the index
    /// contributes nothing to this query.
    fn match_conditions(
        &self,
        index: &IndexDescriptor,
        analysis: &QueryAnalysis,
        stats: &dyn StatisticsProvider,
        config: &PlannerConfig,
    ) -> Option<MatchResult>;

    /// Build the scan operator for a successful match.
    fn create_operator(
        &self,
        index: &IndexDescriptor,
        result: &MatchResult,
        analysis: &QueryAnalysis,
        config: &PlannerConfig,
    ) -> Operator;

    /// Price the operator produced by `create_operator`.
    fn estimate_cost(
        &self,
        index: &IndexDescriptor,
        result: &MatchResult,
        stats: &dyn StatisticsProvider,
        analysis: &QueryAnalysis,
    ) -> PlanCost;
}

/// Strategy lookup by index kind. Constructor-injected into the planner so
/// tests can stub kinds out; defaults to all four built-ins.
pub struct StrategyRegistry {
    strategies: AHashMap<IndexKind, Box<dyn IndexPlanningStrategy>>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self {
            strategies: AHashMap::new(),
        };
        registry.register(Box::new(ScalarStrategy));
        registry.register(Box::new(TextStrategy));
        registry.register(Box::new(VectorStrategy));
        registry.register(Box::new(SpatialStrategy));
        registry
    }
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: AHashMap::new(),
        }
    }

    pub fn register(&mut self, strategy: Box<dyn IndexPlanningStrategy>) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    pub fn for_kind(&self, kind: IndexKind) -> Option<&dyn IndexPlanningStrategy> {
        self.strategies.get(&kind).map(|s| &**s)
    }
}

/// Whether an index whose first `equality_prefix` key columns are pinned by
/// equalities provides the requested ordering, and whether it must be
/// traversed in reverse.
///
/// Sort fields must continue the key paths in order; columns pinned by an
/// equality are constant and may be skipped. Mixed sort directions cannot be
/// served by one traversal direction and fail the check.
pub fn ordering_satisfaction(
    key_paths: &[String],
    equality_prefix: usize,
    sort: &[SortDescriptor],
) -> Option<bool> {
    if sort.is_empty() {
        return Some(false);
    }

    let mut reverse: Option<bool> = None;
    let mut key_idx = 0usize;

    for descriptor in sort {
        // Skip equality-pinned columns that are not the requested field.
        while key_idx < equality_prefix.min(key_paths.len())
            && key_paths[key_idx] != descriptor.field
        {
            key_idx += 1;
        }
        if key_idx >= key_paths.len() || key_paths[key_idx] != descriptor.field {
            return None;
        }
        let descending = descriptor.direction.is_descending();
        match reverse {
            None => reverse = Some(descending),
            Some(r) if r != descending => return None,
            _ => {}
        }
        key_idx += 1;
    }
    Some(reverse.unwrap_or(false))
}
