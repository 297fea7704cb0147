//! Executable plan trees
//!
//! The planner's output: a tree of physical operators annotated with cost,
//! used indexes, ordering information, and an optional residual post-filter.
//! Operators are data, not behavior; the executor dispatches on the variant.

pub mod explain;

use crate::condition::SpatialConstraint;
use crate::config::CostWeights;
use crate::distance::DistanceMetric;
use crate::predicate::Predicate;
use crate::storage::tuple::{encode_tuple, increment_key};
use crate::storage::KeyRange;
use crate::types::{SortDescriptor, Value};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

static NEXT_PLAN_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique plan id.
pub fn next_plan_id() -> u64 {
    NEXT_PLAN_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Tuple-valued scan bounds over an index key prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanBounds {
    pub start: Vec<Value>,
    pub end: Vec<Value>,
    pub start_inclusive: bool,
    pub end_inclusive: bool,
}

impl ScanBounds {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }

    /// Materialize byte-level bounds, relative to the index subspace.
    /// Inclusive ends and exclusive starts are handled with `increment_key`;
    /// an absent end bound scans to the subspace sentinel.
    pub fn to_key_range(&self) -> KeyRange {
        let mut begin = encode_tuple(&self.start);
        if !self.start.is_empty() && !self.start_inclusive {
            begin = increment_key(&begin);
        }

        let end = if self.end.is_empty() {
            vec![0xFF]
        } else {
            let encoded = encode_tuple(&self.end);
            if self.end_inclusive {
                increment_key(&encoded)
            } else {
                encoded
            }
        };

        KeyRange::new(begin, end)
    }

    pub fn render(&self) -> String {
        let fmt = |values: &[Value]| {
            let parts: Vec<String> = values.iter().map(Value::render).collect();
            format!("({})", parts.join(","))
        };
        let start = if self.start.is_empty() {
            "-inf".to_string()
        } else {
            format!(
                "{}{}",
                fmt(&self.start),
                if self.start_inclusive { " incl" } else { " excl" }
            )
        };
        let end = if self.end.is_empty() {
            "+inf".to_string()
        } else {
            format!(
                "{}{}",
                fmt(&self.end),
                if self.end_inclusive { " incl" } else { " excl" }
            )
        };
        format!("{start} .. {end}")
    }
}

/// Physical operator tree
#[derive(Debug, Clone)]
pub enum Operator {
    /// Full scan over the primary subspace. The filter is evaluated inside
    /// the scan; a table-scan plan never wraps an extra `Filter` on top.
    TableScan {
        type_name: String,
        filter: Option<Predicate>,
        limit: Option<usize>,
    },

    /// Contiguous range scan over an index.
    IndexScan {
        index: String,
        bounds: ScanBounds,
        reverse: bool,
        satisfied: Vec<String>,
        estimated_entries: u64,
        limit: Option<usize>,
    },

    /// Point lookup(s) for one exact key.
    IndexSeek {
        index: String,
        key: Vec<Value>,
        satisfied: Vec<String>,
        estimated_entries: u64,
    },

    /// Covering scan: records are reconstructed from index entries, no
    /// record fetch.
    IndexOnlyScan {
        index: String,
        bounds: ScanBounds,
        reverse: bool,
        satisfied: Vec<String>,
        projected_fields: Vec<String>,
        estimated_entries: u64,
        limit: Option<usize>,
    },

    /// Composite-index scan that enumerates distinct values of an
    /// unconstrained leading prefix and scans the suffix bounds per value.
    SkipScan {
        index: String,
        prefix_columns: usize,
        prefix_limit: usize,
        suffix_bounds: ScanBounds,
        satisfied: Vec<String>,
        estimated_entries: u64,
    },

    /// Inverted-index search.
    FullTextScan {
        index: String,
        terms: Vec<String>,
        match_mode: String,
        satisfied: Vec<String>,
        estimated_results: u64,
    },

    /// Approximate nearest-neighbor search; yields exactly k candidates in
    /// similarity order.
    VectorSearch {
        index: String,
        k: usize,
        metric: DistanceMetric,
        ef_search: Option<usize>,
        satisfied: Vec<String>,
    },

    /// Spatial index traversal.
    SpatialScan {
        index: String,
        constraint: SpatialConstraint,
        satisfied: Vec<String>,
        estimated_entries: u64,
    },

    /// Concatenation of child outputs; output order is unspecified.
    Union {
        children: Vec<Operator>,
        deduplicate: bool,
    },

    /// Records present in every child output; output order is unspecified.
    Intersection { children: Vec<Operator> },

    /// Residual predicate over child output.
    Filter {
        input: Box<Operator>,
        predicate: Predicate,
        selectivity: f64,
    },

    /// Explicit sort of child output.
    Sort {
        input: Box<Operator>,
        descriptors: Vec<SortDescriptor>,
    },

    /// Limit/offset over child output.
    Limit {
        input: Box<Operator>,
        limit: Option<usize>,
        offset: Option<usize>,
    },

    /// Column projection.
    Project {
        input: Box<Operator>,
        fields: Vec<String>,
    },

    /// IN evaluated as parallel point seeks, outputs concatenated.
    InUnion {
        index: String,
        field: String,
        values: Vec<Value>,
        satisfied: Vec<String>,
        estimated_entries: u64,
    },

    /// IN evaluated by joining the value list against the index.
    InJoin {
        index: String,
        field: String,
        values: Vec<Value>,
        satisfied: Vec<String>,
        estimated_entries: u64,
    },
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::TableScan { .. } => "TableScan",
            Operator::IndexScan { .. } => "IndexScan",
            Operator::IndexSeek { .. } => "IndexSeek",
            Operator::IndexOnlyScan { .. } => "IndexOnlyScan",
            Operator::SkipScan { .. } => "SkipScan",
            Operator::FullTextScan { .. } => "FullTextScan",
            Operator::VectorSearch { .. } => "VectorSearch",
            Operator::SpatialScan { .. } => "SpatialScan",
            Operator::Union { .. } => "Union",
            Operator::Intersection { .. } => "Intersection",
            Operator::Filter { .. } => "Filter",
            Operator::Sort { .. } => "Sort",
            Operator::Limit { .. } => "Limit",
            Operator::Project { .. } => "Project",
            Operator::InUnion { .. } => "InUnion",
            Operator::InJoin { .. } => "InJoin",
        }
    }

    /// Index read by this operator alone (not children).
    pub fn index_name(&self) -> Option<&str> {
        match self {
            Operator::IndexScan { index, .. }
            | Operator::IndexSeek { index, .. }
            | Operator::IndexOnlyScan { index, .. }
            | Operator::SkipScan { index, .. }
            | Operator::FullTextScan { index, .. }
            | Operator::VectorSearch { index, .. }
            | Operator::SpatialScan { index, .. }
            | Operator::InUnion { index, .. }
            | Operator::InJoin { index, .. } => Some(index),
            _ => None,
        }
    }

    pub fn children(&self) -> Vec<&Operator> {
        match self {
            Operator::Union { children, .. } | Operator::Intersection { children } => {
                children.iter().collect()
            }
            Operator::Filter { input, .. }
            | Operator::Sort { input, .. }
            | Operator::Limit { input, .. }
            | Operator::Project { input, .. } => vec![input],
            _ => Vec::new(),
        }
    }

    /// Condition identifiers satisfied by this operator alone.
    pub fn satisfied(&self) -> &[String] {
        match self {
            Operator::IndexScan { satisfied, .. }
            | Operator::IndexSeek { satisfied, .. }
            | Operator::IndexOnlyScan { satisfied, .. }
            | Operator::SkipScan { satisfied, .. }
            | Operator::FullTextScan { satisfied, .. }
            | Operator::VectorSearch { satisfied, .. }
            | Operator::SpatialScan { satisfied, .. }
            | Operator::InUnion { satisfied, .. }
            | Operator::InJoin { satisfied, .. } => satisfied,
            _ => &[],
        }
    }

    /// All indexes referenced in the subtree, deduplicated, in first-use
    /// order.
    pub fn used_indexes(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_indexes(&mut out);
        out
    }

    fn collect_indexes(&self, out: &mut Vec<String>) {
        if let Some(index) = self.index_name() {
            if !out.iter().any(|existing| existing == index) {
                out.push(index.to_string());
            }
        }
        for child in self.children() {
            child.collect_indexes(out);
        }
    }

    /// Identifiers satisfied anywhere in the subtree.
    ///
    /// A union satisfies only what every child satisfies: an IN expansion
    /// (all seeks carry the membership identifier) counts, while OR-branch
    /// unions (each branch covers its own disjunct) contribute nothing.
    pub fn satisfied_anywhere(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_satisfied(&mut out);
        out
    }

    fn collect_satisfied(&self, out: &mut BTreeSet<String>) {
        out.extend(self.satisfied().iter().cloned());
        match self {
            Operator::Union { children, .. } => {
                let mut common: Option<BTreeSet<String>> = None;
                for child in children {
                    let child_set = child.satisfied_anywhere();
                    common = Some(match common {
                        None => child_set,
                        Some(existing) => {
                            existing.intersection(&child_set).cloned().collect()
                        }
                    });
                }
                if let Some(common) = common {
                    out.extend(common);
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_satisfied(out);
                }
            }
        }
    }

    /// Whether a simple limit can be pushed into this operator.
    pub fn supports_limit_pushdown(&self) -> bool {
        matches!(
            self,
            Operator::TableScan { .. }
                | Operator::IndexScan { .. }
                | Operator::IndexOnlyScan { .. }
        )
    }

    /// Push a limit into the scan, when supported.
    pub fn push_limit(&mut self, n: usize) {
        match self {
            Operator::TableScan { limit, .. }
            | Operator::IndexScan { limit, .. }
            | Operator::IndexOnlyScan { limit, .. } => *limit = Some(n),
            _ => {}
        }
    }
}

/// Cost breakdown of a plan or subtree. The scalar `total` applies the
/// configured weights; comparisons between plans always go through it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanCost {
    pub index_reads: f64,
    pub record_fetches: f64,
    pub post_filter_rows: f64,
    pub requires_sort: bool,
    pub additional: f64,
}

impl PlanCost {
    pub fn total(&self, weights: &CostWeights) -> f64 {
        self.index_reads * weights.index_read
            + self.record_fetches * weights.record_fetch
            + self.post_filter_rows * weights.post_filter
            + if self.requires_sort { weights.sort_penalty } else { 0.0 }
            + self.additional
    }

    pub fn combine(&mut self, other: &PlanCost) {
        self.index_reads += other.index_reads;
        self.record_fetches += other.record_fetches;
        self.post_filter_rows += other.post_filter_rows;
        self.requires_sort |= other.requires_sort;
        self.additional += other.additional;
    }
}

/// A complete plan: operator tree plus summary metadata.
#[derive(Debug, Clone)]
pub struct Plan {
    pub id: u64,
    pub type_name: String,
    pub root: Operator,
    pub cost: PlanCost,
    /// Total cost under the weights active when the plan was built.
    pub total_cost: f64,
    /// Estimated output rows of the root operator.
    pub estimated_rows: f64,
    pub used_fields: BTreeSet<String>,
    pub used_indexes: Vec<String>,
    pub ordering_satisfied: bool,
    /// Residual predicate the executor must apply to root output.
    pub post_filter: Option<Predicate>,
    /// Non-fatal planning notes (statistics fallback etc.).
    pub warnings: Vec<String>,
}

impl Plan {
    /// Whether the plan ever touches an index.
    pub fn uses_index(&self) -> bool {
        !self.used_indexes.is_empty()
    }
}
