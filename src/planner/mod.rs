//! Query planner façade
//!
//! Orchestrates the planning pipeline: rewrite, analyze, enumerate, cost,
//! select. The planner itself is a single-call pure transformation over an
//! immutable statistics snapshot; it performs no I/O and never suspends.

pub mod analyzer;
pub mod cost;
pub mod enumerator;

use crate::catalog::RecordCatalog;
use crate::condition::FieldCondition;
use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};
use crate::plan::{explain, next_plan_id, Operator, Plan, PlanCost};
use crate::predicate::Predicate;
use crate::query::{PlanningHints, Query};
use crate::stats::StatisticsProvider;
use crate::strategy::StrategyRegistry;
use analyzer::{analyze, QueryAnalysis};
use cost::{better_candidate, CostEstimator};
use enumerator::{Candidate, Enumerator};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Counters the planner accumulates over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlannerMetrics {
    pub plans_built: u64,
    pub table_scan_fallbacks: u64,
    pub contradictions: u64,
    pub failed_plans: u64,
}

#[derive(Default)]
struct MetricCells {
    plans_built: AtomicU64,
    table_scan_fallbacks: AtomicU64,
    contradictions: AtomicU64,
    failed_plans: AtomicU64,
}

/// Cost-based query planner over a record catalog and statistics source.
pub struct QueryPlanner {
    catalog: Arc<RecordCatalog>,
    stats: Arc<dyn StatisticsProvider>,
    registry: StrategyRegistry,
    config: PlannerConfig,
    metrics: MetricCells,
}

impl QueryPlanner {
    pub fn new(catalog: Arc<RecordCatalog>, stats: Arc<dyn StatisticsProvider>) -> Self {
        Self {
            catalog,
            stats,
            registry: StrategyRegistry::default(),
            config: PlannerConfig::default(),
            metrics: MetricCells::default(),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn catalog(&self) -> &Arc<RecordCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn metrics(&self) -> PlannerMetrics {
        PlannerMetrics {
            plans_built: self.metrics.plans_built.load(AtomicOrdering::Relaxed),
            table_scan_fallbacks: self
                .metrics
                .table_scan_fallbacks
                .load(AtomicOrdering::Relaxed),
            contradictions: self.metrics.contradictions.load(AtomicOrdering::Relaxed),
            failed_plans: self.metrics.failed_plans.load(AtomicOrdering::Relaxed),
        }
    }

    /// Plan a query with default hints.
    pub fn plan(&self, query: &Query) -> Result<Plan> {
        self.plan_with_hints(query, &PlanningHints::default())
    }

    /// Plan a query: rewrite, analyze, enumerate, cost, select.
    pub fn plan_with_hints(&self, query: &Query, hints: &PlanningHints) -> Result<Plan> {
        let outcome = self.plan_inner(query, hints);
        match &outcome {
            Ok(_) => {
                self.metrics
                    .plans_built
                    .fetch_add(1, AtomicOrdering::Relaxed);
            }
            Err(_) => {
                self.metrics
                    .failed_plans
                    .fetch_add(1, AtomicOrdering::Relaxed);
            }
        }
        outcome
    }

    fn plan_inner(&self, query: &Query, hints: &PlanningHints) -> Result<Plan> {
        let schema = self.catalog.schema(&query.type_name)?;
        let analysis = analyze(query, &schema)?;

        if analysis.is_contradiction() {
            self.metrics
                .contradictions
                .fetch_add(1, AtomicOrdering::Relaxed);
            return Ok(self.empty_plan(&analysis));
        }

        let enumerator = Enumerator::new(
            &schema,
            &analysis,
            self.stats.as_ref(),
            &self.registry,
            &self.config,
            hints,
        );

        let mut candidates = if hints.force_table_scan {
            vec![enumerator.table_scan_candidate()]
        } else {
            enumerator.enumerate()
        };
        if candidates.is_empty() {
            self.metrics
                .table_scan_fallbacks
                .fetch_add(1, AtomicOrdering::Relaxed);
            candidates.push(enumerator.table_scan_candidate());
        }

        // Vector and spatial constraints cannot be post-filtered; a plan
        // must enforce them through an index or the query is unplannable.
        self.enforce_index_only_constraints(&analysis, &mut candidates)?;
        if candidates.is_empty() {
            return Err(PlannerError::invalid_query(
                "no single plan satisfies every vector/spatial constraint",
            ));
        }

        let mut warnings = Vec::new();
        if let Some(preferred) = &hints.preferred_index {
            let preferred_candidates: Vec<Candidate> = candidates
                .iter()
                .filter(|c| c.operator.used_indexes().iter().any(|i| i == preferred))
                .cloned()
                .collect();
            if preferred_candidates.is_empty() {
                warn!("preferred index '{preferred}' produced no candidate plan");
                warnings.push(format!(
                    "preferred index '{preferred}' not applicable; ignored"
                ));
            } else {
                candidates = preferred_candidates;
            }
        }

        let estimator = CostEstimator::new(self.stats.as_ref(), &analysis.type_name);
        let mut best: Option<(Candidate, PlanCost, f64, f64)> = None;
        for candidate in candidates {
            let (cost, rows) = estimator.estimate(&candidate.operator);
            let total = cost.total(&self.config.weights);
            let replace = match &best {
                None => true,
                Some((current, current_cost, current_total, _)) => {
                    better_candidate(
                        (total, cost.record_fetches, candidate.ordering_satisfied),
                        (
                            *current_total,
                            current_cost.record_fetches,
                            current.ordering_satisfied,
                        ),
                    ) == std::cmp::Ordering::Less
                }
            };
            if replace {
                best = Some((candidate, cost, total, rows));
            }
        }
        let Some((candidate, plan_cost, total_cost, estimated_rows)) = best else {
            return Err(PlannerError::invalid_query("candidate selection was empty"));
        };

        if candidate.family.is_none() {
            self.metrics
                .table_scan_fallbacks
                .fetch_add(1, AtomicOrdering::Relaxed);
        }

        let post_filter = compute_post_filter(&analysis, &candidate.operator);
        debug!(
            "selected {} plan for '{}' (cost {:.1})",
            candidate.operator.name(),
            analysis.type_name,
            total_cost
        );

        Ok(Plan {
            id: next_plan_id(),
            type_name: analysis.type_name.clone(),
            used_indexes: candidate.operator.used_indexes(),
            used_fields: analysis.referenced_fields.clone(),
            ordering_satisfied: candidate.ordering_satisfied,
            root: candidate.operator,
            cost: plan_cost,
            total_cost,
            estimated_rows,
            post_filter,
            warnings,
        })
    }

    /// Keep only candidates that enforce every vector/spatial constraint.
    fn enforce_index_only_constraints(
        &self,
        analysis: &QueryAnalysis,
        candidates: &mut Vec<Candidate>,
    ) -> Result<()> {
        let required: Vec<&FieldCondition> = analysis
            .field_conditions
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    FieldCondition::Vector(_) | FieldCondition::Spatial(_)
                )
            })
            .collect();
        if required.is_empty() {
            return Ok(());
        }
        for condition in &required {
            let id = condition.identifier();
            let satisfied_somewhere = candidates
                .iter()
                .any(|c| c.operator.satisfied_anywhere().contains(&id));
            if !satisfied_somewhere {
                let kind = match condition {
                    FieldCondition::Vector(_) => "vector",
                    _ => "spatial",
                };
                return Err(PlannerError::unsupported(
                    condition.field(),
                    format!("no {kind} index covers this constraint"),
                ));
            }
        }
        candidates.retain(|c| {
            let satisfied = c.operator.satisfied_anywhere();
            required.iter().all(|r| satisfied.contains(&r.identifier()))
        });
        Ok(())
    }

    /// Trivial plan for a contradictory predicate: a scan that emits no
    /// rows and costs nothing.
    fn empty_plan(&self, analysis: &QueryAnalysis) -> Plan {
        Plan {
            id: next_plan_id(),
            type_name: analysis.type_name.clone(),
            root: Operator::TableScan {
                type_name: analysis.type_name.clone(),
                filter: Some(Predicate::False),
                limit: Some(0),
            },
            cost: PlanCost::default(),
            total_cost: 0.0,
            estimated_rows: 0.0,
            used_fields: analysis.referenced_fields.clone(),
            used_indexes: Vec::new(),
            ordering_satisfied: true,
            post_filter: None,
            warnings: Vec::new(),
        }
    }

    /// Human-readable explanation of the chosen plan.
    pub fn explain(&self, query: &Query) -> Result<String> {
        let plan = self.plan(query)?;
        Ok(explain::explain_text(&plan))
    }

    /// Structured JSON explanation of the chosen plan.
    pub fn explain_json(&self, query: &Query) -> Result<serde_json::Value> {
        let plan = self.plan(query)?;
        Ok(explain::explain_json(&plan))
    }
}

/// Residual predicate for the executor: every condition whose identifier is
/// not satisfied by an index access and not already applied by an in-tree
/// filter, plus uncovered residual conjuncts.
fn compute_post_filter(analysis: &QueryAnalysis, root: &Operator) -> Option<Predicate> {
    let satisfied = root.satisfied_anywhere();
    let (covered_ids, covered_keys) = filter_coverage(root);

    let mut parts: Vec<Predicate> = Vec::new();
    for condition in &analysis.field_conditions {
        let id = condition.identifier();
        if satisfied.contains(&id) || covered_ids.contains(&id) {
            continue;
        }
        if let Some(source) = condition.source_predicate() {
            parts.push(source);
        }
    }
    for residual in &analysis.residual_predicates {
        if covered_keys.contains(&residual.structural_key()) {
            continue;
        }
        parts.push(residual.clone());
    }

    // A union plan covers the whole disjunction through its branches.
    if analysis.is_disjunction() {
        let handled = matches!(root_scan(root), Some(Operator::Union { .. }))
            || covered_keys.contains(&analysis.normalized_predicate.structural_key());
        if !handled {
            parts.push(analysis.normalized_predicate.clone());
        }
    }

    match parts.len() {
        0 => None,
        1 => Some(parts.remove(0)),
        _ => Some(Predicate::And(parts)),
    }
}

/// Identifiers and structural keys already applied by in-tree filters
/// (explicit `Filter` operators and table-scan internal filters).
fn filter_coverage(root: &Operator) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut ids = BTreeSet::new();
    let mut keys = BTreeSet::new();
    collect_filter_coverage(root, &mut ids, &mut keys);
    (ids, keys)
}

fn collect_filter_coverage(
    op: &Operator,
    ids: &mut BTreeSet<String>,
    keys: &mut BTreeSet<String>,
) {
    let predicate = match op {
        Operator::Filter { predicate, .. } => Some(predicate),
        Operator::TableScan {
            filter: Some(filter),
            ..
        } => Some(filter),
        _ => None,
    };
    if let Some(predicate) = predicate {
        keys.insert(predicate.structural_key());
        for conjunct in predicate.conjuncts() {
            keys.insert(conjunct.structural_key());
            if let Predicate::Compare(cmp) = conjunct {
                ids.insert(cmp.render());
            }
        }
    }
    for child in op.children() {
        collect_filter_coverage(child, ids, keys);
    }
}

/// Innermost access operator under transform wrappers.
fn root_scan(op: &Operator) -> Option<&Operator> {
    match op {
        Operator::Filter { input, .. }
        | Operator::Sort { input, .. }
        | Operator::Limit { input, .. }
        | Operator::Project { input, .. } => root_scan(input),
        other => Some(other),
    }
}
