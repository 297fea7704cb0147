//! Cost estimation
//!
//! Walks an operator tree bottom-up, carrying (cost, estimated output rows)
//! per node. Index reads, record fetches, and filter evaluations accumulate
//! into a `PlanCost`; the weighted total is what the optimizer compares.
//! Estimates assume independent predicates (selectivities multiply).

use crate::plan::{Operator, PlanCost};
use crate::predicate::{ComparisonOp, Predicate};
use crate::stats::StatisticsProvider;

/// Assumed selectivity of substring-style comparisons.
const PATTERN_SELECTIVITY: f64 = 0.1;

/// Cost of probing one seek key against an index.
const SEEK_PROBE_COST: f64 = 1.0;

pub struct CostEstimator<'a> {
    stats: &'a dyn StatisticsProvider,
    type_name: &'a str,
}

impl<'a> CostEstimator<'a> {
    pub fn new(stats: &'a dyn StatisticsProvider, type_name: &'a str) -> Self {
        Self { stats, type_name }
    }

    /// Cost and estimated output rows of an operator subtree.
    pub fn estimate(&self, op: &Operator) -> (PlanCost, f64) {
        match op {
            Operator::TableScan { filter, limit, .. } => {
                let total = self.stats.row_count(self.type_name) as f64;
                let selectivity = filter
                    .as_ref()
                    .map_or(1.0, |p| self.predicate_selectivity(p));
                let mut rows = total * selectivity;
                if let Some(n) = limit {
                    rows = rows.min(*n as f64);
                }
                let cost = PlanCost {
                    index_reads: 0.0,
                    record_fetches: total,
                    post_filter_rows: if filter.is_some() { total } else { 0.0 },
                    requires_sort: false,
                    additional: 0.0,
                };
                (cost, rows)
            }

            Operator::IndexScan {
                estimated_entries,
                limit,
                ..
            } => {
                let mut rows = *estimated_entries as f64;
                if let Some(n) = limit {
                    rows = rows.min(*n as f64);
                }
                let cost = PlanCost {
                    index_reads: rows,
                    record_fetches: rows,
                    ..PlanCost::default()
                };
                (cost, rows)
            }

            Operator::IndexSeek {
                estimated_entries, ..
            } => {
                let rows = *estimated_entries as f64;
                let cost = PlanCost {
                    index_reads: SEEK_PROBE_COST + rows,
                    record_fetches: rows,
                    ..PlanCost::default()
                };
                (cost, rows)
            }

            Operator::IndexOnlyScan {
                estimated_entries,
                limit,
                ..
            } => {
                let mut rows = *estimated_entries as f64;
                if let Some(n) = limit {
                    rows = rows.min(*n as f64);
                }
                // Covering: records decode from index entries, no fetch.
                let cost = PlanCost {
                    index_reads: rows,
                    record_fetches: 0.0,
                    ..PlanCost::default()
                };
                (cost, rows)
            }

            Operator::SkipScan {
                prefix_limit,
                estimated_entries,
                ..
            } => {
                let rows = *estimated_entries as f64;
                // One probe per distinct leading prefix plus the entries.
                let cost = PlanCost {
                    index_reads: *prefix_limit as f64 + rows,
                    record_fetches: rows,
                    ..PlanCost::default()
                };
                (cost, rows)
            }

            Operator::FullTextScan {
                estimated_results, ..
            } => {
                let rows = *estimated_results as f64;
                let cost = PlanCost {
                    index_reads: rows,
                    record_fetches: rows,
                    ..PlanCost::default()
                };
                (cost, rows)
            }

            Operator::VectorSearch { k, ef_search, .. } => {
                let n = self.stats.row_count(self.type_name).max(2) as f64;
                let ef = ef_search.unwrap_or(64) as f64;
                let rows = *k as f64;
                let cost = PlanCost {
                    index_reads: n.log2() * ef,
                    record_fetches: rows,
                    ..PlanCost::default()
                };
                (cost, rows)
            }

            Operator::SpatialScan {
                estimated_entries, ..
            } => {
                let rows = *estimated_entries as f64;
                let cost = PlanCost {
                    index_reads: 2.0 * rows,
                    record_fetches: rows,
                    ..PlanCost::default()
                };
                (cost, rows)
            }

            Operator::Union {
                children,
                deduplicate,
            } => {
                let mut cost = PlanCost::default();
                let mut rows = 0.0;
                for child in children {
                    let (child_cost, child_rows) = self.estimate(child);
                    cost.combine(&child_cost);
                    rows += child_rows;
                }
                if *deduplicate {
                    // Hashing every produced id.
                    cost.additional += rows * 0.1;
                }
                (cost, rows)
            }

            Operator::Intersection { children } => {
                let total = self.stats.row_count(self.type_name).max(1) as f64;
                let mut cost = PlanCost::default();
                let mut rows = total;
                for child in children {
                    let (child_cost, child_rows) = self.estimate(child);
                    // Children stream ids only; fetches happen once for the
                    // intersected result.
                    cost.index_reads += child_cost.index_reads;
                    cost.additional += child_cost.additional + child_rows * 0.05;
                    rows *= child_rows / total;
                }
                cost.record_fetches += rows.max(0.0);
                (cost, rows.max(0.0))
            }

            Operator::Filter {
                input,
                selectivity,
                ..
            } => {
                let (mut cost, input_rows) = self.estimate(input);
                cost.post_filter_rows += input_rows;
                (cost, input_rows * selectivity.clamp(0.0, 1.0))
            }

            Operator::Sort { input, .. } => {
                let (mut cost, rows) = self.estimate(input);
                cost.requires_sort = true;
                (cost, rows)
            }

            Operator::Limit {
                input,
                limit,
                offset,
            } => {
                let (cost, rows) = self.estimate(input);
                let skipped = offset.unwrap_or(0) as f64;
                let capped = match limit {
                    Some(n) => (rows - skipped).clamp(0.0, *n as f64),
                    None => (rows - skipped).max(0.0),
                };
                (cost, capped)
            }

            Operator::Project { input, .. } => self.estimate(input),

            Operator::InUnion {
                values,
                estimated_entries,
                ..
            } => {
                let rows = *estimated_entries as f64;
                let cost = PlanCost {
                    index_reads: values.len() as f64 * SEEK_PROBE_COST + rows,
                    record_fetches: rows,
                    ..PlanCost::default()
                };
                (cost, rows)
            }

            Operator::InJoin {
                values,
                estimated_entries,
                ..
            } => {
                let n = self.stats.row_count(self.type_name).max(2) as f64;
                let rows = *estimated_entries as f64;
                // Probe per driven value, then read the matched entries.
                let cost = PlanCost {
                    index_reads: values.len() as f64 * n.log2() + rows,
                    record_fetches: rows,
                    ..PlanCost::default()
                };
                (cost, rows)
            }
        }
    }

    /// Estimated fraction of records satisfying a predicate.
    pub fn predicate_selectivity(&self, predicate: &Predicate) -> f64 {
        match predicate {
            Predicate::True => 1.0,
            Predicate::False => 0.0,
            Predicate::Not(child) => 1.0 - self.predicate_selectivity(child),
            Predicate::And(children) => children
                .iter()
                .map(|c| self.predicate_selectivity(c))
                .product(),
            Predicate::Or(children) => children
                .iter()
                .map(|c| self.predicate_selectivity(c))
                .sum::<f64>()
                .min(1.0),
            Predicate::Compare(cmp) => self.comparison_selectivity(cmp),
        }
    }

    fn comparison_selectivity(&self, cmp: &crate::predicate::FieldComparison) -> f64 {
        let field = cmp.field.as_str();
        match cmp.op {
            ComparisonOp::Eq => cmp.operand.single().map_or(0.0, |v| {
                self.stats.equality_selectivity(self.type_name, field, v)
            }),
            ComparisonOp::Ne => cmp.operand.single().map_or(1.0, |v| {
                1.0 - self.stats.equality_selectivity(self.type_name, field, v)
            }),
            ComparisonOp::Lt | ComparisonOp::Le => cmp.operand.single().map_or(0.5, |v| {
                self.stats.range_selectivity(
                    self.type_name,
                    field,
                    None,
                    Some(v),
                    false,
                    cmp.op == ComparisonOp::Le,
                )
            }),
            ComparisonOp::Gt | ComparisonOp::Ge => cmp.operand.single().map_or(0.5, |v| {
                self.stats.range_selectivity(
                    self.type_name,
                    field,
                    Some(v),
                    None,
                    cmp.op == ComparisonOp::Ge,
                    false,
                )
            }),
            ComparisonOp::In => cmp.operand.list().map_or(0.0, |values| {
                let eq = values.first().map_or(0.0, |v| {
                    self.stats.equality_selectivity(self.type_name, field, v)
                });
                (eq * values.len() as f64).min(1.0)
            }),
            ComparisonOp::Contains | ComparisonOp::HasPrefix | ComparisonOp::HasSuffix => {
                PATTERN_SELECTIVITY
            }
            ComparisonOp::IsNull => self.stats.null_selectivity(self.type_name, field, true),
            ComparisonOp::IsNotNull => {
                self.stats.null_selectivity(self.type_name, field, false)
            }
        }
    }
}

/// Candidate ordering: lower weighted total, then fewer record fetches,
/// then ordering satisfied.
pub fn better_candidate(
    a: (f64, f64, bool),
    b: (f64, f64, bool),
) -> std::cmp::Ordering {
    let (a_total, a_fetches, a_ordered) = a;
    let (b_total, b_fetches, b_ordered) = b;
    a_total
        .partial_cmp(&b_total)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then(
            a_fetches
                .partial_cmp(&b_fetches)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
        .then_with(|| b_ordered.cmp(&a_ordered))
}
