//! Scalar (B-tree) index strategy
//!
//! Walks the index key columns in order, extending tuple scan bounds while
//! conditions keep the prefix contiguous: equalities extend both bounds and
//! continue, a range or membership or prefix-pattern extends the bounds and
//! terminates the walk, anything else stops matching. There is no prefix
//! skipping here; the skip-scan plan family handles unconstrained leading
//! columns separately.

use super::{InExpansion, IndexPlanningStrategy, MatchResult};
use crate::catalog::{IndexDescriptor, IndexKind};
use crate::condition::{FieldCondition, PatternType};
use crate::config::PlannerConfig;
use crate::plan::{Operator, PlanCost, ScanBounds};
use crate::planner::analyzer::QueryAnalysis;
use crate::stats::StatisticsProvider;
use crate::types::Value;

/// Selectivity attributed to a prefix pattern on an indexed column.
const PREFIX_PATTERN_SELECTIVITY: f64 = 0.1;

pub struct ScalarStrategy;

impl ScalarStrategy {
    /// Find the equality condition on a field, if any.
    fn equality_on<'a>(
        analysis: &'a QueryAnalysis,
        field: &str,
    ) -> Option<&'a FieldCondition> {
        analysis
            .conditions_on_field(field)
            .into_iter()
            .find(|c| c.is_equality())
    }

    /// Lower/upper range conditions on a field. The rewriter has already
    /// merged duplicate bounds, so at most one of each survives.
    fn range_on<'a>(
        analysis: &'a QueryAnalysis,
        field: &str,
    ) -> (Option<&'a FieldCondition>, Option<&'a FieldCondition>) {
        let mut lower = None;
        let mut upper = None;
        for condition in analysis.conditions_on_field(field) {
            if let FieldCondition::Scalar(scalar) = condition {
                if !scalar.is_range() {
                    continue;
                }
                if let Some(bounds) = &scalar.bounds {
                    if bounds.lower.is_some() && lower.is_none() {
                        lower = Some(condition);
                    }
                    if bounds.upper.is_some() && upper.is_none() {
                        upper = Some(condition);
                    }
                }
            }
        }
        (lower, upper)
    }

    fn membership_on<'a>(
        analysis: &'a QueryAnalysis,
        field: &str,
    ) -> Option<&'a FieldCondition> {
        analysis
            .conditions_on_field(field)
            .into_iter()
            .find(|c| c.is_membership())
    }

    fn prefix_pattern_on<'a>(
        analysis: &'a QueryAnalysis,
        field: &str,
    ) -> Option<&'a FieldCondition> {
        analysis.conditions_on_field(field).into_iter().find(|c| {
            matches!(
                c,
                FieldCondition::StringPattern(p) if p.pattern_type == PatternType::Prefix
            )
        })
    }
}

impl IndexPlanningStrategy for ScalarStrategy {
    fn kind(&self) -> IndexKind {
        IndexKind::Scalar
    }

    fn match_conditions(
        &self,
        index: &IndexDescriptor,
        analysis: &QueryAnalysis,
        stats: &dyn StatisticsProvider,
        config: &PlannerConfig,
    ) -> Option<MatchResult> {
        let type_name = &analysis.type_name;
        let mut satisfied: Vec<FieldCondition> = Vec::new();
        let mut partial: Vec<FieldCondition> = Vec::new();
        let mut bounds = ScanBounds {
            start: Vec::new(),
            end: Vec::new(),
            start_inclusive: true,
            end_inclusive: true,
        };
        let mut selectivity = 1.0f64;
        let mut equality_prefix: Vec<Value> = Vec::new();
        let mut in_expansion: Option<InExpansion> = None;

        for field in &index.key_paths {
            // Equality extends both bounds and keeps the walk going.
            if let Some(condition) = Self::equality_on(analysis, field) {
                if let FieldCondition::Scalar(scalar) = condition {
                    if let Some(value) = scalar.value() {
                        bounds.start.push(value.clone());
                        bounds.end.push(value.clone());
                        selectivity *= stats.equality_selectivity(type_name, field, value);
                        equality_prefix.push(value.clone());
                        satisfied.push(condition.clone());
                        continue;
                    }
                }
            }

            // A range terminates the prefix.
            let (lower, upper) = Self::range_on(analysis, field);
            if lower.is_some() || upper.is_some() {
                let lower_bound = lower.and_then(|c| c.to_bounds());
                let upper_bound = upper.and_then(|c| c.to_bounds());
                let min = lower_bound.as_ref().and_then(|b| b.lower.clone());
                let max = upper_bound.as_ref().and_then(|b| b.upper.clone());
                let min_inclusive =
                    lower_bound.as_ref().map_or(false, |b| b.lower_inclusive);
                let max_inclusive =
                    upper_bound.as_ref().map_or(false, |b| b.upper_inclusive);

                if let Some(min) = &min {
                    bounds.start.push(min.clone());
                    bounds.start_inclusive = min_inclusive;
                }
                if let Some(max) = &max {
                    bounds.end.push(max.clone());
                    bounds.end_inclusive = max_inclusive;
                }
                selectivity *= stats.range_selectivity(
                    type_name,
                    field,
                    min.as_ref(),
                    max.as_ref(),
                    min_inclusive,
                    max_inclusive,
                );
                if let Some(c) = lower {
                    satisfied.push(c.clone());
                }
                if let Some(c) = upper {
                    if lower.map(|l| l.identifier()) != Some(c.identifier()) {
                        satisfied.push(c.clone());
                    }
                }
                break;
            }

            // Membership: conservative [min, max] range; expand into seeks
            // only while the list is small enough.
            if let Some(condition) = Self::membership_on(analysis, field) {
                if let FieldCondition::Scalar(scalar) = condition {
                    let values = scalar.values.clone();
                    if let Some(value_bounds) = &scalar.bounds {
                        if let Some(min) = &value_bounds.lower {
                            bounds.start.push(min.clone());
                        }
                        if let Some(max) = &value_bounds.upper {
                            bounds.end.push(max.clone());
                        }
                    }
                    let eq = values
                        .first()
                        .map(|v| stats.equality_selectivity(type_name, field, v))
                        .unwrap_or(0.0);
                    selectivity *= (eq * values.len() as f64).min(1.0);

                    if values.len() <= config.in_union_threshold {
                        satisfied.push(condition.clone());
                        in_expansion = Some(InExpansion {
                            field: field.clone(),
                            values,
                        });
                    } else {
                        // Range covers the span; membership stays residual.
                        partial.push(condition.clone());
                    }
                    break;
                }
            }

            // Prefix pattern: bounded range over the pattern's span.
            if let Some(condition) = Self::prefix_pattern_on(analysis, field) {
                if let Some(pattern_bounds) = condition.to_bounds() {
                    if let Some(min) = &pattern_bounds.lower {
                        bounds.start.push(min.clone());
                        bounds.start_inclusive = pattern_bounds.lower_inclusive;
                    }
                    if let Some(max) = &pattern_bounds.upper {
                        bounds.end.push(max.clone());
                        bounds.end_inclusive = pattern_bounds.upper_inclusive;
                    }
                    selectivity *= PREFIX_PATTERN_SELECTIVITY;
                    satisfied.push(condition.clone());
                }
                break;
            }

            // Nothing usable on this key column; the prefix ends here.
            break;
        }

        if satisfied.is_empty() && partial.is_empty() {
            return None;
        }

        let full_key_equality = equality_prefix.len() == index.key_paths.len();
        let reverse = super::ordering_satisfaction(
            &index.key_paths,
            equality_prefix.len(),
            &analysis.sort_requirements,
        );
        // A seek union has no single traversal order.
        let order_capable = in_expansion.is_none() || analysis.sort_requirements.is_empty();
        let satisfies_ordering = reverse.is_some() && order_capable;

        let row_count = stats.row_count(type_name);
        let estimated_entries = if index.is_unique && full_key_equality {
            1
        } else {
            ((row_count as f64 * selectivity).ceil() as u64).max(1)
        };

        Some(MatchResult {
            satisfied,
            partial,
            satisfies_ordering,
            reverse: reverse.unwrap_or(false) && satisfies_ordering,
            scan_bounds: bounds,
            selectivity,
            estimated_entries,
            full_key_equality,
            equality_prefix,
            in_expansion,
        })
    }

    fn create_operator(
        &self,
        index: &IndexDescriptor,
        result: &MatchResult,
        _analysis: &QueryAnalysis,
        _config: &PlannerConfig,
    ) -> Operator {
        let satisfied = result.satisfied_identifiers();

        // Membership expansion: cross product of the equality prefix with
        // the IN values, one seek per value, concatenated without
        // deduplication (one IN list produces disjoint seeks).
        if let Some(expansion) = &result.in_expansion {
            let per_seek =
                (result.estimated_entries / expansion.values.len().max(1) as u64).max(1);
            let seeks: Vec<Operator> = expansion
                .values
                .iter()
                .map(|value| {
                    let mut key = result.equality_prefix.clone();
                    key.push(value.clone());
                    Operator::IndexSeek {
                        index: index.name.clone(),
                        key,
                        satisfied: satisfied.clone(),
                        estimated_entries: per_seek,
                    }
                })
                .collect();
            return Operator::Union {
                children: seeks,
                deduplicate: false,
            };
        }

        if result.full_key_equality {
            return Operator::IndexSeek {
                index: index.name.clone(),
                key: result.equality_prefix.clone(),
                satisfied,
                estimated_entries: result.estimated_entries,
            };
        }

        Operator::IndexScan {
            index: index.name.clone(),
            bounds: result.scan_bounds.clone(),
            reverse: result.reverse,
            satisfied,
            estimated_entries: result.estimated_entries,
            limit: None,
        }
    }

    fn estimate_cost(
        &self,
        _index: &IndexDescriptor,
        result: &MatchResult,
        _stats: &dyn StatisticsProvider,
        _analysis: &QueryAnalysis,
    ) -> PlanCost {
        let entries = result.estimated_entries as f64;
        PlanCost {
            index_reads: entries,
            record_fetches: entries,
            post_filter_rows: 0.0,
            requires_sort: false,
            additional: 0.0,
        }
    }
}
