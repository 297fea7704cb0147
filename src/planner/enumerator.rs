//! Candidate plan enumeration
//!
//! Generates every plan shape the optimizer may choose from: the table-scan
//! baseline, per-index strategy plans, covering scans, greedy multi-index
//! intersections, OR-branch unions, skip scans, and specialized IN forms.
//! Candidates come back fully wrapped (residual filter, sort, limit); the
//! optimizer only prices and picks.

use crate::catalog::{IndexDescriptor, IndexKind, RecordSchema};
use crate::condition::FieldCondition;
use crate::config::PlannerConfig;
use crate::plan::{Operator, ScanBounds};
use crate::planner::analyzer::QueryAnalysis;
use crate::planner::cost::CostEstimator;
use crate::predicate::rewrite::to_dnf;
use crate::predicate::Predicate;
use crate::query::{PlanFamily, PlanningHints};
use crate::stats::StatisticsProvider;
use crate::strategy::StrategyRegistry;
use log::debug;
use std::collections::BTreeSet;

/// Guard against division by vanishing selectivities in scoring.
const MIN_SELECTIVITY: f64 = 1e-9;

/// One enumerated plan shape, fully wrapped and ready for costing.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub operator: Operator,
    /// None marks the table-scan baseline, which hints cannot disable.
    pub family: Option<PlanFamily>,
    /// Index order satisfies the requested sort without an explicit sort.
    pub ordering_satisfied: bool,
}

pub struct Enumerator<'a> {
    schema: &'a RecordSchema,
    analysis: &'a QueryAnalysis,
    stats: &'a dyn StatisticsProvider,
    registry: &'a StrategyRegistry,
    config: &'a PlannerConfig,
    hints: &'a PlanningHints,
}

impl<'a> Enumerator<'a> {
    pub fn new(
        schema: &'a RecordSchema,
        analysis: &'a QueryAnalysis,
        stats: &'a dyn StatisticsProvider,
        registry: &'a StrategyRegistry,
        config: &'a PlannerConfig,
        hints: &'a PlanningHints,
    ) -> Self {
        Self {
            schema,
            analysis,
            stats,
            registry,
            config,
            hints,
        }
    }

    /// Produce all candidate plans for the analyzed query.
    pub fn enumerate(&self) -> Vec<Candidate> {
        let mut candidates = vec![self.table_scan_candidate()];

        if self.analysis.is_disjunction() {
            if let Some(candidate) = self.union_candidate(&self.analysis.normalized_predicate) {
                candidates.push(candidate);
            }
            return candidates;
        }

        candidates.extend(self.index_candidates());
        candidates.extend(self.covering_candidates());
        candidates.extend(self.intersection_candidate());
        candidates.extend(self.skip_scan_candidates());
        candidates.extend(self.specialized_in_candidates());

        // A conjunction hiding a disjunction can still union: distribute
        // and plan the disjuncts.
        if !self.hints.is_disabled(PlanFamily::Union) {
            let dnf = to_dnf(&self.analysis.normalized_predicate);
            if dnf.is_disjunction() && dnf != self.analysis.normalized_predicate {
                if let Some(candidate) = self.union_candidate(&dnf) {
                    candidates.push(candidate);
                }
            }
        }

        debug!(
            "enumerated {} candidates for '{}'",
            candidates.len(),
            self.analysis.type_name
        );
        candidates
    }

    // -----------------------------------------------------------------------
    // Baseline
    // -----------------------------------------------------------------------

    /// The table scan evaluates the whole conjunction inside the scan; no
    /// outer filter wrap, so rows are never filtered twice.
    pub fn table_scan_candidate(&self) -> Candidate {
        let filter = match &self.analysis.normalized_predicate {
            Predicate::True => None,
            other => Some(other.clone()),
        };
        let operator = Operator::TableScan {
            type_name: self.analysis.type_name.clone(),
            filter,
            limit: None,
        };
        let ordering_satisfied = self.analysis.sort_requirements.is_empty();
        Candidate {
            operator: self.wrap_sort_and_limit(operator, ordering_satisfied),
            family: None,
            ordering_satisfied,
        }
    }

    // -----------------------------------------------------------------------
    // Per-index strategy plans
    // -----------------------------------------------------------------------

    fn index_candidates(&self) -> Vec<Candidate> {
        if self.hints.is_disabled(PlanFamily::SingleIndex) {
            return Vec::new();
        }
        let mut out = Vec::new();
        for index in &self.schema.indexes {
            let Some(strategy) = self.registry.for_kind(index.kind) else {
                continue;
            };
            let Some(result) =
                strategy.match_conditions(index, self.analysis, self.stats, self.config)
            else {
                continue;
            };
            let operator =
                strategy.create_operator(index, &result, self.analysis, self.config);
            let satisfied = operator.satisfied_anywhere();
            let wrapped = self.wrap_residual(operator, &satisfied);
            let ordering = result.satisfies_ordering;
            out.push(Candidate {
                operator: self.wrap_sort_and_limit(wrapped, ordering),
                family: Some(PlanFamily::SingleIndex),
                ordering_satisfied: ordering,
            });
        }
        out
    }

    // -----------------------------------------------------------------------
    // Covering (index-only) plans
    // -----------------------------------------------------------------------

    fn covering_candidates(&self) -> Vec<Candidate> {
        if self.hints.is_disabled(PlanFamily::Covering) {
            return Vec::new();
        }
        let mut out = Vec::new();
        for index in &self.schema.indexes {
            if index.kind != IndexKind::Scalar || !self.schema.index_covers(index) {
                continue;
            }
            let projected: Vec<String> =
                self.schema.fields.iter().map(|f| f.name.clone()).collect();

            let Some(strategy) = self.registry.for_kind(index.kind) else {
                continue;
            };
            let matched =
                strategy.match_conditions(index, self.analysis, self.stats, self.config);

            let (bounds, reverse, satisfied_ids, estimated_entries, ordering) = match &matched
            {
                Some(result) if result.in_expansion.is_none() => (
                    result.scan_bounds.clone(),
                    result.reverse,
                    result.satisfied_identifiers(),
                    result.estimated_entries,
                    result.satisfies_ordering,
                ),
                Some(_) => continue,
                None => {
                    // No conditions land on this index; a bare covering scan
                    // still beats a table scan when it provides the sort or
                    // the query has no filter at all.
                    let ordering = crate::strategy::ordering_satisfaction(
                        &index.key_paths,
                        0,
                        &self.analysis.sort_requirements,
                    );
                    let usable = self.analysis.field_conditions.is_empty()
                        || ordering.is_some();
                    if !usable {
                        continue;
                    }
                    (
                        ScanBounds::default(),
                        ordering.unwrap_or(false),
                        Vec::new(),
                        self.stats.row_count(&self.analysis.type_name),
                        ordering.is_some(),
                    )
                }
            };

            let operator = Operator::IndexOnlyScan {
                index: index.name.clone(),
                bounds,
                reverse,
                satisfied: satisfied_ids.clone(),
                projected_fields: projected,
                estimated_entries,
                limit: None,
            };
            let satisfied: BTreeSet<String> = satisfied_ids.into_iter().collect();
            let wrapped = self.wrap_residual(operator, &satisfied);
            out.push(Candidate {
                operator: self.wrap_sort_and_limit(wrapped, ordering),
                family: Some(PlanFamily::Covering),
                ordering_satisfied: ordering,
            });
        }
        out
    }

    // -----------------------------------------------------------------------
    // Multi-index intersection
    // -----------------------------------------------------------------------

    fn intersection_candidate(&self) -> Option<Candidate> {
        if self.hints.is_disabled(PlanFamily::Intersection) {
            return None;
        }
        let equalities: Vec<&FieldCondition> = self
            .analysis
            .field_conditions
            .iter()
            .filter(|c| c.is_equality())
            .collect();
        if equalities.len() < 2 {
            return None;
        }

        // Score every (condition, leading index) pairing.
        struct Scored<'b> {
            condition: &'b FieldCondition,
            index: &'b IndexDescriptor,
            score: f64,
            selectivity: f64,
        }
        let mut scored: Vec<Scored> = Vec::new();
        for condition in &equalities {
            for index in &self.schema.indexes {
                if index.kind != IndexKind::Scalar
                    || index.leading_key() != Some(condition.field())
                {
                    continue;
                }
                let value = match condition {
                    FieldCondition::Scalar(s) => s.value(),
                    _ => None,
                };
                let Some(value) = value else { continue };
                let selectivity = self
                    .stats
                    .equality_selectivity(&self.analysis.type_name, condition.field(), value)
                    .max(MIN_SELECTIVITY);
                let mut score = 1.0 / selectivity;
                if index.is_unique {
                    score *= 100.0;
                }
                // Leading-column match bonus; non-leading pairings are not
                // seekable and never reach this point.
                score *= 10.0;
                scored.push(Scored {
                    condition,
                    index,
                    score,
                    selectivity,
                });
            }
        }
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let cap = self
            .hints
            .max_intersection_indexes
            .unwrap_or(self.config.max_intersection_indexes);
        let row_count = self.stats.row_count(&self.analysis.type_name) as f64;
        let mut covered_fields: BTreeSet<&str> = BTreeSet::new();
        let mut used_indexes: BTreeSet<&str> = BTreeSet::new();
        let mut children = Vec::new();
        let mut satisfied: BTreeSet<String> = BTreeSet::new();

        for pick in &scored {
            if children.len() >= cap {
                break;
            }
            if covered_fields.contains(pick.condition.field())
                || used_indexes.contains(pick.index.name.as_str())
            {
                continue;
            }
            let value = match pick.condition {
                FieldCondition::Scalar(s) => s.value().cloned(),
                _ => None,
            };
            let Some(value) = value else { continue };
            covered_fields.insert(pick.condition.field());
            used_indexes.insert(pick.index.name.as_str());
            satisfied.insert(pick.condition.identifier());
            children.push(Operator::IndexSeek {
                index: pick.index.name.clone(),
                key: vec![value],
                satisfied: vec![pick.condition.identifier()],
                estimated_entries: ((row_count * pick.selectivity).ceil() as u64).max(1),
            });
        }

        if children.len() < 2 {
            return None;
        }

        let operator = Operator::Intersection { children };
        let wrapped = self.wrap_residual(operator, &satisfied);
        let ordering = self.analysis.sort_requirements.is_empty();
        Some(Candidate {
            operator: self.wrap_sort_and_limit(wrapped, ordering),
            family: Some(PlanFamily::Intersection),
            ordering_satisfied: ordering,
        })
    }

    // -----------------------------------------------------------------------
    // Skip scan
    // -----------------------------------------------------------------------

    fn skip_scan_candidates(&self) -> Vec<Candidate> {
        if self.hints.is_disabled(PlanFamily::SkipScan) {
            return Vec::new();
        }
        let mut out = Vec::new();
        for index in &self.schema.indexes {
            if index.kind != IndexKind::Scalar || index.key_paths.len() < 2 {
                continue;
            }
            let Some(candidate) = self.skip_scan_for(index) else {
                continue;
            };
            out.push(candidate);
        }
        out
    }

    fn skip_scan_for(&self, index: &IndexDescriptor) -> Option<Candidate> {
        // First key column carrying a usable condition.
        let position = index.key_paths.iter().position(|field| {
            self.analysis
                .conditions_on_field(field)
                .iter()
                .any(|c| c.is_equality() || c.is_range())
        })?;
        if position == 0 {
            return None;
        }
        // All leading columns must be genuinely unconstrained.
        for field in &index.key_paths[..position] {
            if !self.analysis.conditions_on_field(field).is_empty() {
                return None;
            }
        }

        // Bounded enumeration of the leading prefix.
        let mut distinct_prefix: u64 = 1;
        for field in &index.key_paths[..position] {
            distinct_prefix = distinct_prefix
                .saturating_mul(self.stats.distinct_values(&self.analysis.type_name, field));
        }
        if distinct_prefix > self.config.skip_scan_prefix_limit as u64 {
            return None;
        }

        let target_field = &index.key_paths[position];
        let conditions = self.analysis.conditions_on_field(target_field);
        let mut suffix_bounds = ScanBounds {
            start: Vec::new(),
            end: Vec::new(),
            start_inclusive: true,
            end_inclusive: true,
        };
        let mut satisfied: BTreeSet<String> = BTreeSet::new();
        let mut selectivity = 1.0f64;
        for condition in &conditions {
            let Some(bounds) = condition.to_bounds() else { continue };
            if let Some(lower) = &bounds.lower {
                if suffix_bounds.start.is_empty() {
                    suffix_bounds.start.push(lower.clone());
                    suffix_bounds.start_inclusive = bounds.lower_inclusive;
                }
            }
            if let Some(upper) = &bounds.upper {
                if suffix_bounds.end.is_empty() {
                    suffix_bounds.end.push(upper.clone());
                    suffix_bounds.end_inclusive = bounds.upper_inclusive;
                }
            }
            satisfied.insert(condition.identifier());
            selectivity *= condition_selectivity(
                condition,
                self.stats,
                &self.analysis.type_name,
            );
        }
        if satisfied.is_empty() {
            return None;
        }

        let row_count = self.stats.row_count(&self.analysis.type_name);
        let estimated_entries = ((row_count as f64 * selectivity).ceil() as u64).max(1);
        let operator = Operator::SkipScan {
            index: index.name.clone(),
            prefix_columns: position,
            prefix_limit: distinct_prefix as usize,
            suffix_bounds,
            satisfied: satisfied.iter().cloned().collect(),
            estimated_entries,
        };

        // Retained only when it actually beats the baseline scan.
        let estimator = CostEstimator::new(self.stats, &self.analysis.type_name);
        let (skip_cost, _) = estimator.estimate(&operator);
        let (table_cost, _) = estimator.estimate(&Operator::TableScan {
            type_name: self.analysis.type_name.clone(),
            filter: None,
            limit: None,
        });
        if skip_cost.total(&self.config.weights) >= table_cost.total(&self.config.weights) {
            debug!("skip scan over '{}' loses to table scan", index.name);
            return None;
        }

        let wrapped = self.wrap_residual(operator, &satisfied);
        let ordering = self.analysis.sort_requirements.is_empty();
        Some(Candidate {
            operator: self.wrap_sort_and_limit(wrapped, ordering),
            family: Some(PlanFamily::SkipScan),
            ordering_satisfied: ordering,
        })
    }

    // -----------------------------------------------------------------------
    // Specialized IN forms
    // -----------------------------------------------------------------------

    fn specialized_in_candidates(&self) -> Vec<Candidate> {
        if self.hints.is_disabled(PlanFamily::SingleIndex) {
            return Vec::new();
        }
        let mut out = Vec::new();
        for condition in &self.analysis.field_conditions {
            let FieldCondition::Scalar(scalar) = condition else { continue };
            if !scalar.is_membership() {
                continue;
            }
            let Some(index) = self
                .schema
                .indexes
                .iter()
                .find(|i| i.kind == IndexKind::Scalar && i.leading_key() == Some(scalar.field.as_str()))
            else {
                continue;
            };
            let values = scalar.values.clone();
            let eq = values
                .first()
                .map(|v| {
                    self.stats
                        .equality_selectivity(&self.analysis.type_name, &scalar.field, v)
                })
                .unwrap_or(0.0);
            let selectivity = (eq * values.len() as f64).min(1.0);
            let row_count = self.stats.row_count(&self.analysis.type_name);
            let estimated_entries = ((row_count as f64 * selectivity).ceil() as u64).max(1);
            let satisfied: BTreeSet<String> = [condition.identifier()].into();

            if values.len() <= self.config.in_union_threshold {
                let operator = Operator::InUnion {
                    index: index.name.clone(),
                    field: scalar.field.clone(),
                    values: values.clone(),
                    satisfied: vec![condition.identifier()],
                    estimated_entries,
                };
                let wrapped = self.wrap_residual(operator, &satisfied);
                let ordering = self.analysis.sort_requirements.is_empty();
                out.push(Candidate {
                    operator: self.wrap_sort_and_limit(wrapped, ordering),
                    family: Some(PlanFamily::SingleIndex),
                    ordering_satisfied: ordering,
                });
            }

            let operator = Operator::InJoin {
                index: index.name.clone(),
                field: scalar.field.clone(),
                values,
                satisfied: vec![condition.identifier()],
                estimated_entries,
            };
            let wrapped = self.wrap_residual(operator, &satisfied);
            let ordering = self.analysis.sort_requirements.is_empty();
            out.push(Candidate {
                operator: self.wrap_sort_and_limit(wrapped, ordering),
                family: Some(PlanFamily::SingleIndex),
                ordering_satisfied: ordering,
            });
        }
        out
    }

    // -----------------------------------------------------------------------
    // OR-branch union
    // -----------------------------------------------------------------------

    fn union_candidate(&self, disjunction: &Predicate) -> Option<Candidate> {
        if self.hints.is_disabled(PlanFamily::Union) {
            return None;
        }
        let Predicate::Or(branches) = disjunction else {
            return None;
        };

        let mut children = Vec::with_capacity(branches.len());
        for branch in branches {
            children.push(self.plan_branch(branch)?);
        }

        let operator = Operator::Union {
            children,
            deduplicate: true,
        };
        // Union output is explicitly unordered; a requested sort is always
        // restored by a wrapping sort.
        let ordering = self.analysis.sort_requirements.is_empty();
        Some(Candidate {
            operator: self.wrap_sort_and_limit(operator, ordering),
            family: Some(PlanFamily::Union),
            ordering_satisfied: ordering,
        })
    }

    /// Plan one disjunct: best single-index access for its conjunction,
    /// with a branch-level residual filter. None when no index serves the
    /// branch (the union then cannot beat a table scan).
    fn plan_branch(&self, branch: &Predicate) -> Option<Operator> {
        let mut conditions = Vec::new();
        let mut residuals = Vec::new();
        for conjunct in branch.conjuncts() {
            match conjunct {
                Predicate::Compare(cmp) => match FieldCondition::from_comparison(cmp) {
                    Ok(condition) => conditions.push(condition),
                    Err(_) => residuals.push(conjunct.clone()),
                },
                Predicate::True => {}
                other => residuals.push(other.clone()),
            }
        }

        let branch_analysis = QueryAnalysis {
            type_name: self.analysis.type_name.clone(),
            original_predicate: branch.clone(),
            normalized_predicate: branch.clone(),
            field_conditions: conditions,
            residual_predicates: residuals,
            sort_requirements: Vec::new(),
            limit: None,
            offset: None,
            referenced_fields: branch.referenced_fields(),
        };

        let estimator = CostEstimator::new(self.stats, &self.analysis.type_name);
        let mut best: Option<(f64, Operator)> = None;
        for index in &self.schema.indexes {
            let Some(strategy) = self.registry.for_kind(index.kind) else {
                continue;
            };
            let Some(result) =
                strategy.match_conditions(index, &branch_analysis, self.stats, self.config)
            else {
                continue;
            };
            if result.satisfied.is_empty() {
                continue;
            }
            let operator =
                strategy.create_operator(index, &result, &branch_analysis, self.config);
            let satisfied = operator.satisfied_anywhere();
            let wrapped =
                wrap_residual_for(&branch_analysis, operator, &satisfied, self.stats);
            let (cost, _) = estimator.estimate(&wrapped);
            let total = cost.total(&self.config.weights);
            if best.as_ref().map_or(true, |(t, _)| total < *t) {
                best = Some((total, wrapped));
            }
        }
        best.map(|(_, op)| op)
    }

    // -----------------------------------------------------------------------
    // Wrapping
    // -----------------------------------------------------------------------

    /// Wrap the residual filter: all conditions the access path does not
    /// enforce, plus conjuncts with no condition form.
    fn wrap_residual(&self, operator: Operator, satisfied: &BTreeSet<String>) -> Operator {
        wrap_residual_for(self.analysis, operator, satisfied, self.stats)
    }

    /// Add sort (when index order falls short) and limit wrapping, with
    /// optional pushdown into bare scans.
    fn wrap_sort_and_limit(&self, operator: Operator, ordering_satisfied: bool) -> Operator {
        let mut current = operator;

        let needs_sort =
            !self.analysis.sort_requirements.is_empty() && !ordering_satisfied;
        if needs_sort {
            current = Operator::Sort {
                input: Box::new(current),
                descriptors: self.analysis.sort_requirements.clone(),
            };
        }

        if self.analysis.limit.is_some() || self.analysis.offset.is_some() {
            if !needs_sort && self.config.push_down_limits {
                if let Some(limit) = self.analysis.limit {
                    let scan_budget = limit + self.analysis.offset.unwrap_or(0);
                    if current.supports_limit_pushdown() {
                        current.push_limit(scan_budget);
                    }
                }
            }
            current = Operator::Limit {
                input: Box::new(current),
                limit: self.analysis.limit,
                offset: self.analysis.offset,
            };
        }
        current
    }
}

/// Residual wrap shared by whole-query and branch planning.
fn wrap_residual_for(
    analysis: &QueryAnalysis,
    operator: Operator,
    satisfied: &BTreeSet<String>,
    stats: &dyn StatisticsProvider,
) -> Operator {
    let mut residual_parts: Vec<Predicate> = Vec::new();
    let mut selectivity = 1.0f64;

    for condition in &analysis.field_conditions {
        if satisfied.contains(&condition.identifier()) {
            continue;
        }
        // Vector and spatial constraints have no predicate form; planner
        // surfaces them as unsupported when no index enforces them.
        let Some(source) = condition.source_predicate() else {
            continue;
        };
        selectivity *= condition_selectivity(condition, stats, &analysis.type_name);
        residual_parts.push(source);
    }
    for residual in &analysis.residual_predicates {
        let estimator = CostEstimator::new(stats, &analysis.type_name);
        selectivity *= estimator.predicate_selectivity(residual);
        residual_parts.push(residual.clone());
    }

    if residual_parts.is_empty() {
        return operator;
    }
    let predicate = if residual_parts.len() == 1 {
        residual_parts.remove(0)
    } else {
        Predicate::And(residual_parts)
    };
    Operator::Filter {
        input: Box::new(operator),
        predicate,
        selectivity: selectivity.clamp(0.0, 1.0),
    }
}

/// Stand-alone selectivity estimate for one condition.
pub fn condition_selectivity(
    condition: &FieldCondition,
    stats: &dyn StatisticsProvider,
    type_name: &str,
) -> f64 {
    use crate::condition::ScalarConditionType;
    match condition {
        FieldCondition::Scalar(scalar) => match scalar.condition_type {
            ScalarConditionType::Eq => scalar.value().map_or(0.0, |v| {
                stats.equality_selectivity(type_name, &scalar.field, v)
            }),
            ScalarConditionType::Ne => scalar.value().map_or(1.0, |v| {
                1.0 - stats.equality_selectivity(type_name, &scalar.field, v)
            }),
            ScalarConditionType::Lt
            | ScalarConditionType::Le
            | ScalarConditionType::Gt
            | ScalarConditionType::Ge
            | ScalarConditionType::Between => {
                let bounds = scalar.bounds.as_ref();
                stats.range_selectivity(
                    type_name,
                    &scalar.field,
                    bounds.and_then(|b| b.lower.as_ref()),
                    bounds.and_then(|b| b.upper.as_ref()),
                    bounds.map_or(false, |b| b.lower_inclusive),
                    bounds.map_or(false, |b| b.upper_inclusive),
                )
            }
            ScalarConditionType::In => {
                let eq = scalar.values.first().map_or(0.0, |v| {
                    stats.equality_selectivity(type_name, &scalar.field, v)
                });
                (eq * scalar.values.len() as f64).min(1.0)
            }
            ScalarConditionType::NotIn => {
                let eq = scalar.values.first().map_or(0.0, |v| {
                    stats.equality_selectivity(type_name, &scalar.field, v)
                });
                1.0 - (eq * scalar.values.len() as f64).min(1.0)
            }
            ScalarConditionType::IsNull => {
                stats.null_selectivity(type_name, &scalar.field, true)
            }
            ScalarConditionType::IsNotNull => {
                stats.null_selectivity(type_name, &scalar.field, false)
            }
        },
        FieldCondition::TextSearch(_) => 0.05,
        FieldCondition::StringPattern(_) => 0.1,
        FieldCondition::Spatial(_) => 0.1,
        FieldCondition::Vector(vector) => {
            let rows = stats.row_count(type_name).max(1);
            (vector.k as f64 / rows as f64).min(1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldType};
    use crate::planner::analyzer::analyze;
    use crate::predicate::FieldComparison;
    use crate::query::Query;
    use crate::stats::{CollectedStatistics, FieldStatistics, TableStatistics};
    use crate::types::{SortDirection, Value};

    fn schema() -> RecordSchema {
        RecordSchema::new(
            "user",
            vec![
                FieldDef::new("id", FieldType::Integer),
                FieldDef::new("status", FieldType::Text),
                FieldDef::new("country", FieldType::Text),
                FieldDef::new("age", FieldType::Integer),
                FieldDef::new("category", FieldType::Text),
            ],
        )
        .with_primary_key("id")
        .with_index(IndexDescriptor::scalar("user_status", vec!["status".into()]))
        .with_index(IndexDescriptor::scalar("user_country", vec!["country".into()]))
        .with_index(IndexDescriptor::scalar(
            "user_status_age",
            vec!["status".into(), "age".into()],
        ))
        .with_index(IndexDescriptor::scalar("user_category", vec!["category".into()]))
    }

    fn stats() -> CollectedStatistics {
        let stats = CollectedStatistics::new();
        stats.update_table_stats("user", TableStatistics::new(100_000));
        stats.update_field_stats("user", "status", FieldStatistics::new(4, 0.0));
        stats.update_field_stats("user", "country", FieldStatistics::new(200, 0.0));
        stats.update_field_stats("user", "category", FieldStatistics::new(50, 0.0));
        stats
    }

    fn enumerate(query: Query) -> Vec<Candidate> {
        enumerate_with_hints(query, PlanningHints::default())
    }

    fn enumerate_with_hints(query: Query, hints: PlanningHints) -> Vec<Candidate> {
        let schema = schema();
        let stats = stats();
        let analysis = analyze(&query, &schema).unwrap();
        let registry = StrategyRegistry::default();
        let config = PlannerConfig::default();
        let enumerator =
            Enumerator::new(&schema, &analysis, &stats, &registry, &config, &hints);
        enumerator.enumerate()
    }

    fn has_operator(candidates: &[Candidate], pred: impl Fn(&Operator) -> bool) -> bool {
        fn walk(op: &Operator, pred: &impl Fn(&Operator) -> bool) -> bool {
            if pred(op) {
                return true;
            }
            op.children().iter().any(|c| walk(c, pred))
        }
        candidates.iter().any(|c| walk(&c.operator, &pred))
    }

    #[test]
    fn test_baseline_always_present() {
        let candidates = enumerate(Query::for_type("user"));
        assert!(candidates
            .iter()
            .any(|c| matches!(c.operator, Operator::TableScan { .. }) && c.family.is_none()));
    }

    #[test]
    fn test_table_scan_has_no_outer_filter() {
        let candidates = enumerate(
            Query::for_type("user")
                .filter(Predicate::cmp(FieldComparison::eq("status", "active"))),
        );
        for candidate in &candidates {
            if candidate.family.is_none() {
                // The baseline's root must be the scan itself, filter folded in.
                match &candidate.operator {
                    Operator::TableScan { filter, .. } => assert!(filter.is_some()),
                    other => panic!("baseline root should be TableScan, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_single_index_with_residual_filter() {
        let candidates = enumerate(Query::for_type("user").filter(Predicate::and(vec![
            Predicate::cmp(FieldComparison::eq("status", "active")),
            Predicate::cmp(FieldComparison::gt("age", 21i64)),
        ])));
        // user_status seek with a Filter wrap for the age condition.
        let found = candidates.iter().any(|c| {
            matches!(
                &c.operator,
                Operator::Filter { input, .. }
                    if matches!(&**input, Operator::IndexSeek { index, .. } if index == "user_status")
            )
        });
        assert!(found, "expected filtered user_status seek");
    }

    #[test]
    fn test_composite_prefix_candidate() {
        let candidates = enumerate(Query::for_type("user").filter(Predicate::and(vec![
            Predicate::cmp(FieldComparison::eq("status", "active")),
            Predicate::cmp(FieldComparison::gt("age", 21i64)),
        ])));
        let found = has_operator(&candidates, |op| {
            matches!(op, Operator::IndexScan { index, .. } if index == "user_status_age")
        });
        assert!(found, "expected composite index scan");
    }

    #[test]
    fn test_intersection_candidate() {
        let candidates = enumerate(Query::for_type("user").filter(Predicate::and(vec![
            Predicate::cmp(FieldComparison::eq("status", "active")),
            Predicate::cmp(FieldComparison::eq("country", "US")),
        ])));
        let intersection = candidates
            .iter()
            .find(|c| c.family == Some(PlanFamily::Intersection))
            .expect("intersection candidate");
        let has_intersection = {
            fn find(op: &Operator) -> Option<usize> {
                if let Operator::Intersection { children } = op {
                    return Some(children.len());
                }
                op.children().iter().find_map(|c| find(c))
            }
            find(&intersection.operator)
        };
        assert_eq!(has_intersection, Some(2));
    }

    #[test]
    fn test_intersection_respects_cap() {
        let candidates = enumerate_with_hints(
            Query::for_type("user").filter(Predicate::and(vec![
                Predicate::cmp(FieldComparison::eq("status", "active")),
                Predicate::cmp(FieldComparison::eq("country", "US")),
            ])),
            PlanningHints {
                max_intersection_indexes: Some(1),
                ..PlanningHints::default()
            },
        );
        assert!(
            !candidates.iter().any(|c| c.family == Some(PlanFamily::Intersection)),
            "cap of 1 cannot produce an intersection"
        );
    }

    #[test]
    fn test_union_candidate_for_disjunction() {
        let candidates = enumerate(Query::for_type("user").filter(Predicate::or(vec![
            Predicate::cmp(FieldComparison::eq("status", "active")),
            Predicate::cmp(FieldComparison::eq("country", "US")),
        ])));
        let union = candidates
            .iter()
            .find(|c| c.family == Some(PlanFamily::Union))
            .expect("union candidate");
        match &union.operator {
            Operator::Union { children, deduplicate } => {
                assert_eq!(children.len(), 2);
                assert!(*deduplicate);
            }
            other => panic!("expected Union, got {other:?}"),
        }
    }

    #[test]
    fn test_union_requires_index_per_branch() {
        // Second branch has no index (age is only a non-leading column).
        let candidates = enumerate(Query::for_type("user").filter(Predicate::or(vec![
            Predicate::cmp(FieldComparison::eq("status", "active")),
            Predicate::cmp(FieldComparison::gt("age", 50i64)),
        ])));
        assert!(!candidates.iter().any(|c| c.family == Some(PlanFamily::Union)));
    }

    #[test]
    fn test_skip_scan_candidate() {
        // Constraint on age only; user_status_age has status leading with
        // 4 distinct values, well under the prefix cap.
        let candidates = enumerate(
            Query::for_type("user").filter(Predicate::cmp(FieldComparison::gt("age", 21i64))),
        );
        let found = has_operator(&candidates, |op| {
            matches!(
                op,
                Operator::SkipScan { index, prefix_columns: 1, .. } if index == "user_status_age"
            )
        });
        assert!(found, "expected skip scan candidate");
    }

    #[test]
    fn test_skip_scan_rejected_on_high_cardinality_prefix() {
        let schema = RecordSchema::new(
            "user",
            vec![
                FieldDef::new("country", FieldType::Text),
                FieldDef::new("age", FieldType::Integer),
            ],
        )
        .with_index(IndexDescriptor::scalar(
            "user_country_age",
            vec!["country".into(), "age".into()],
        ));
        let stats = CollectedStatistics::new();
        stats.update_table_stats("user", TableStatistics::new(100_000));
        stats.update_field_stats("user", "country", FieldStatistics::new(10_000, 0.0));

        let query =
            Query::for_type("user").filter(Predicate::cmp(FieldComparison::gt("age", 21i64)));
        let analysis = analyze(&query, &schema).unwrap();
        let registry = StrategyRegistry::default();
        let config = PlannerConfig::default();
        let hints = PlanningHints::default();
        let enumerator =
            Enumerator::new(&schema, &analysis, &stats, &registry, &config, &hints);
        let candidates = enumerator.enumerate();
        assert!(!candidates.iter().any(|c| c.family == Some(PlanFamily::SkipScan)));
    }

    #[test]
    fn test_in_union_candidate_within_threshold() {
        let candidates = enumerate(Query::for_type("user").filter(Predicate::cmp(
            FieldComparison::in_list("category", vec!["a".into(), "b".into(), "c".into()]),
        )));
        assert!(has_operator(&candidates, |op| matches!(
            op,
            Operator::InUnion { values, .. } if values.len() == 3
        )));
        assert!(has_operator(&candidates, |op| matches!(
            op,
            Operator::InJoin { .. }
        )));
    }

    #[test]
    fn test_sort_wrap_only_when_needed() {
        let candidates = enumerate(
            Query::for_type("user")
                .filter(Predicate::cmp(FieldComparison::eq("status", "active")))
                .sort_by("age", SortDirection::Ascending),
        );
        // Composite index provides the order; its candidate has no sort.
        let composite_unsorted = candidates.iter().any(|c| {
            c.ordering_satisfied
                && !matches!(c.operator, Operator::Sort { .. })
                && c.operator.used_indexes().contains(&"user_status_age".to_string())
        });
        assert!(composite_unsorted, "composite candidate should avoid Sort");

        // The single-column seek cannot provide it and gets wrapped.
        let seek_sorted = candidates.iter().any(|c| {
            !c.ordering_satisfied
                && matches!(c.operator, Operator::Sort { .. })
                && c.operator.used_indexes().contains(&"user_status".to_string())
        });
        assert!(seek_sorted, "single-column candidate needs Sort");
    }

    #[test]
    fn test_limit_wrap_and_pushdown() {
        let candidates = enumerate(
            Query::for_type("user")
                .filter(Predicate::cmp(FieldComparison::gt("age", 21i64)))
                .limit(10)
                .offset(5),
        );
        let baseline = candidates.iter().find(|c| c.family.is_none()).unwrap();
        match &baseline.operator {
            Operator::Limit { input, limit, offset } => {
                assert_eq!(*limit, Some(10));
                assert_eq!(*offset, Some(5));
                match &**input {
                    Operator::TableScan { limit, .. } => assert_eq!(*limit, Some(15)),
                    other => panic!("expected TableScan under Limit, got {other:?}"),
                }
            }
            other => panic!("expected Limit wrap, got {other:?}"),
        }
    }

    #[test]
    fn test_disabled_families_skipped() {
        let query = Query::for_type("user").filter(Predicate::and(vec![
            Predicate::cmp(FieldComparison::eq("status", "active")),
            Predicate::cmp(FieldComparison::eq("country", "US")),
        ]));
        let hints = PlanningHints::default()
            .disable(PlanFamily::Intersection)
            .disable(PlanFamily::SingleIndex);
        let candidates = enumerate_with_hints(query, hints);
        assert!(candidates.iter().all(|c| c.family.is_none()
            || matches!(c.family, Some(PlanFamily::Covering | PlanFamily::SkipScan))));
    }

    #[test]
    fn test_condition_selectivity_bounds() {
        let stats = stats();
        let condition = FieldCondition::from_comparison(&FieldComparison::in_list(
            "category",
            (0..500).map(|i| Value::Text(format!("v{i}"))).collect(),
        ))
        .unwrap();
        let sel = condition_selectivity(&condition, &stats, "user");
        assert!((0.0..=1.0).contains(&sel));
    }
}
