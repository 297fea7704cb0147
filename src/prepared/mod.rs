//! Prepared plans
//!
//! A prepared plan pairs a plan template with the positional parameter
//! bindings extracted from the query's literals. Plans are cached under a
//! `QueryFingerprint`, a value-independent structural key: two queries that
//! differ only in literal values share a fingerprint and therefore a plan.

pub mod cache;

pub use cache::{CacheStats, PlanCache};

use crate::condition::FieldCondition;
use crate::error::{PlannerError, Result};
use crate::plan::Plan;
use crate::planner::QueryPlanner;
use crate::predicate::{Operand, Predicate};
use crate::query::Query;
use crate::types::{Timestamp, Value, ValueKind};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

static NEXT_PREPARED_ID: AtomicU64 = AtomicU64::new(1);

/// Value-independent structural identity of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryFingerprint {
    pub type_name: String,
    /// Predicate shape with literals stripped: (field, operator) in tree
    /// shape.
    pub condition_structure: String,
    /// Sort fields and directions.
    pub sort_structure: String,
    pub has_limit: bool,
    pub has_offset: bool,
}

/// Build the fingerprint of a query.
pub fn fingerprint(query: &Query) -> QueryFingerprint {
    let mut condition_structure = predicate_shape(&query.predicate);
    for special in &query.special_conditions {
        condition_structure.push(';');
        condition_structure.push_str(&special_shape(special));
    }
    let sort_structure = query
        .sort
        .iter()
        .map(|d| {
            format!(
                "{}:{}",
                d.field,
                if d.direction.is_descending() { "desc" } else { "asc" }
            )
        })
        .collect::<Vec<_>>()
        .join(",");

    QueryFingerprint {
        type_name: query.type_name.clone(),
        condition_structure,
        sort_structure,
        has_limit: query.limit.is_some(),
        has_offset: query.offset.is_some(),
    }
}

/// Canonical shape string: operators and field names only, no literals.
fn predicate_shape(predicate: &Predicate) -> String {
    match predicate {
        Predicate::True => "true".to_string(),
        Predicate::False => "false".to_string(),
        Predicate::Not(child) => format!("not({})", predicate_shape(child)),
        Predicate::And(children) => {
            let mut shapes: Vec<String> = children.iter().map(predicate_shape).collect();
            shapes.sort();
            format!("and({})", shapes.join(";"))
        }
        Predicate::Or(children) => {
            let mut shapes: Vec<String> = children.iter().map(predicate_shape).collect();
            shapes.sort();
            format!("or({})", shapes.join(";"))
        }
        Predicate::Compare(cmp) => format!("({} {})", cmp.field, cmp.op.symbol()),
    }
}

fn special_shape(condition: &FieldCondition) -> String {
    match condition {
        FieldCondition::TextSearch(c) => format!("({} text:{})", c.field, c.match_mode.name()),
        FieldCondition::Spatial(c) => format!("({} spatial)", c.field),
        FieldCondition::Vector(c) => format!("({} knn:{})", c.field, c.metric.name()),
        FieldCondition::Scalar(c) => format!("({} scalar)", c.field),
        FieldCondition::StringPattern(c) => {
            format!("({} pattern:{})", c.field, c.pattern_type.name())
        }
    }
}

/// One positional parameter slot in a prepared query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBinding {
    pub name: String,
    pub field_name: String,
    pub expected_type: ValueKind,
    pub position: usize,
}

/// A cached plan template plus its parameter slots.
#[derive(Debug)]
pub struct PreparedPlan {
    pub id: u64,
    pub fingerprint: QueryFingerprint,
    pub plan: Arc<Plan>,
    pub bindings: Vec<ParameterBinding>,
    pub created_at: Timestamp,
}

/// Extract positional bindings from every single-literal comparison, in
/// tree order. Membership lists and null checks carry no parameters.
pub fn extract_bindings(query: &Query) -> Vec<ParameterBinding> {
    let mut bindings = Vec::new();
    collect_bindings(&query.predicate, &mut bindings);
    bindings
}

fn collect_bindings(predicate: &Predicate, out: &mut Vec<ParameterBinding>) {
    match predicate {
        Predicate::True | Predicate::False => {}
        Predicate::Not(child) => collect_bindings(child, out),
        Predicate::And(children) | Predicate::Or(children) => {
            for child in children {
                collect_bindings(child, out);
            }
        }
        Predicate::Compare(cmp) => {
            if let Operand::Single(value) = &cmp.operand {
                let position = out.len();
                out.push(ParameterBinding {
                    name: format!("p{position}"),
                    field_name: cmp.field.clone(),
                    expected_type: value.kind(),
                    position,
                });
            }
        }
    }
}

/// Rebind a prepared query's literals with new values, positionally.
pub fn bind(template: &Query, prepared: &PreparedPlan, values: &[Value]) -> Result<Query> {
    if values.len() != prepared.bindings.len() {
        return Err(PlannerError::ParameterBinding(format!(
            "expected {} parameters, got {}",
            prepared.bindings.len(),
            values.len()
        )));
    }
    for (binding, value) in prepared.bindings.iter().zip(values) {
        if !value.is_null() && value.kind() != binding.expected_type {
            return Err(PlannerError::ParameterBinding(format!(
                "parameter {} ('{}') expects {:?}, got {:?}",
                binding.position,
                binding.name,
                binding.expected_type,
                value.kind()
            )));
        }
    }

    let mut query = template.clone();
    let mut cursor = 0usize;
    query.predicate = substitute(&template.predicate, values, &mut cursor);
    Ok(query)
}

fn substitute(predicate: &Predicate, values: &[Value], cursor: &mut usize) -> Predicate {
    match predicate {
        Predicate::True => Predicate::True,
        Predicate::False => Predicate::False,
        Predicate::Not(child) => Predicate::not(substitute(child, values, cursor)),
        Predicate::And(children) => Predicate::And(
            children
                .iter()
                .map(|c| substitute(c, values, cursor))
                .collect(),
        ),
        Predicate::Or(children) => Predicate::Or(
            children
                .iter()
                .map(|c| substitute(c, values, cursor))
                .collect(),
        ),
        Predicate::Compare(cmp) => {
            let mut cmp = cmp.clone();
            if matches!(cmp.operand, Operand::Single(_)) {
                let value = values[*cursor].clone();
                *cursor += 1;
                cmp.operand = Operand::Single(value);
            }
            Predicate::Compare(cmp)
        }
    }
}

/// Prepared-query front end: fingerprint, cache, validate, re-plan.
pub struct PreparedQueries {
    planner: Arc<QueryPlanner>,
    cache: Arc<PlanCache>,
}

impl PreparedQueries {
    pub fn new(planner: Arc<QueryPlanner>) -> Self {
        let cache = Arc::new(PlanCache::new(planner.config().cache));
        Self { planner, cache }
    }

    pub fn cache(&self) -> &Arc<PlanCache> {
        &self.cache
    }

    /// Prepare a query: reuse a cached plan when the fingerprint matches
    /// and every referenced index still exists, otherwise plan and cache.
    pub fn prepare(&self, query: &Query) -> Result<Arc<PreparedPlan>> {
        let fp = fingerprint(query);

        if let Some(prepared) = self.cache.get(&fp) {
            match self.validate(&prepared) {
                Ok(()) => return Ok(prepared),
                Err(PlannerError::IndexInvalidation(index)) => {
                    debug!("cached plan {} references dropped index '{index}'", prepared.id);
                    self.cache.remove(&fp);
                }
                Err(other) => return Err(other),
            }
        }

        let plan = self.planner.plan(query)?;
        let prepared = Arc::new(PreparedPlan {
            id: NEXT_PREPARED_ID.fetch_add(1, AtomicOrdering::Relaxed),
            fingerprint: fp.clone(),
            plan: Arc::new(plan),
            bindings: extract_bindings(query),
            created_at: Timestamp::now(),
        });
        self.cache.put(fp, Arc::clone(&prepared));
        Ok(prepared)
    }

    /// Reject plans whose indexes were dropped since caching.
    fn validate(&self, prepared: &PreparedPlan) -> Result<()> {
        for index in &prepared.plan.used_indexes {
            if !self.planner.catalog().index_exists(index) {
                return Err(PlannerError::IndexInvalidation(index.clone()));
            }
        }
        Ok(())
    }

    /// Drop all cached plans for a record type.
    pub fn invalidate_type(&self, type_name: &str) -> usize {
        self.cache.invalidate_type(type_name)
    }

    /// Drop one cached plan.
    pub fn remove(&self, fingerprint: &QueryFingerprint) -> bool {
        self.cache.remove(fingerprint)
    }
}
