//! Query analysis
//!
//! Normalizes the query predicate and lowers the top-level conjunction into
//! a flat field-condition list. Disjunctions are not flattened; they remain
//! inside the normalized predicate for union-plan enumeration. Conjuncts
//! with no condition form (negations, nested disjunctions) are kept as
//! residual predicates so no constraint is ever silently dropped.

use crate::catalog::RecordSchema;
use crate::condition::FieldCondition;
use crate::error::{PlannerError, Result};
use crate::predicate::rewrite::rewrite;
use crate::predicate::Predicate;
use crate::query::Query;
use crate::types::SortDescriptor;
use std::collections::BTreeSet;

/// Predicate trees deeper than this are rejected as malformed.
const MAX_PREDICATE_DEPTH: usize = 128;

/// Result of analyzing a query against its schema.
#[derive(Debug, Clone)]
pub struct QueryAnalysis {
    pub type_name: String,
    /// Predicate exactly as the query stated it.
    pub original_predicate: Predicate,
    /// Rewritten predicate; `False` for contradictory queries.
    pub normalized_predicate: Predicate,
    /// Conditions lowered from top-level conjuncts plus specialized query
    /// constraints, keyed by their identifiers.
    pub field_conditions: Vec<FieldCondition>,
    /// Top-level conjuncts with no condition form (kept for post-filter).
    pub residual_predicates: Vec<Predicate>,
    pub sort_requirements: Vec<SortDescriptor>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub referenced_fields: BTreeSet<String>,
}

impl QueryAnalysis {
    /// Whether the rewritten predicate can never match.
    pub fn is_contradiction(&self) -> bool {
        matches!(self.normalized_predicate, Predicate::False)
    }

    /// Whether the normalized predicate is a top-level disjunction.
    pub fn is_disjunction(&self) -> bool {
        self.normalized_predicate.is_disjunction()
    }

    pub fn condition_by_identifier(&self, identifier: &str) -> Option<&FieldCondition> {
        self.field_conditions
            .iter()
            .find(|c| c.identifier() == identifier)
    }

    pub fn condition_on_field(&self, field: &str) -> Option<&FieldCondition> {
        self.field_conditions.iter().find(|c| c.field() == field)
    }

    /// All conditions on one field (a merged range keeps its two bounds as
    /// two conditions).
    pub fn conditions_on_field(&self, field: &str) -> Vec<&FieldCondition> {
        self.field_conditions
            .iter()
            .filter(|c| c.field() == field)
            .collect()
    }
}

/// Analyze a query: rewrite, validate fields, lower conditions.
pub fn analyze(query: &Query, schema: &RecordSchema) -> Result<QueryAnalysis> {
    if query.predicate.depth() > MAX_PREDICATE_DEPTH {
        return Err(PlannerError::invalid_query(format!(
            "predicate tree deeper than {MAX_PREDICATE_DEPTH}"
        )));
    }

    // Field validation runs against the original tree so errors reference
    // what the caller wrote, not the rewritten form.
    for field in query.predicate.referenced_fields() {
        if !schema.has_field(&field) {
            return Err(PlannerError::invalid_query(format!(
                "unknown field '{}' on record type '{}'",
                field, schema.type_name
            )));
        }
    }
    for condition in &query.special_conditions {
        if !schema.has_field(condition.field()) {
            return Err(PlannerError::invalid_query(format!(
                "unknown field '{}' on record type '{}'",
                condition.field(),
                schema.type_name
            )));
        }
    }
    for sort in &query.sort {
        if !schema.has_field(&sort.field) {
            return Err(PlannerError::invalid_query(format!(
                "unknown sort field '{}' on record type '{}'",
                sort.field, schema.type_name
            )));
        }
    }

    let normalized = rewrite(&query.predicate);

    let mut field_conditions = Vec::new();
    let mut residual_predicates = Vec::new();

    if !normalized.is_disjunction() {
        for conjunct in normalized.conjuncts() {
            match conjunct {
                Predicate::Compare(cmp) => {
                    field_conditions.push(FieldCondition::from_comparison(cmp)?);
                }
                Predicate::True => {}
                other => residual_predicates.push(other.clone()),
            }
        }
    }
    field_conditions.extend(query.special_conditions.iter().cloned());

    let mut referenced_fields = query.predicate.referenced_fields();
    for condition in &query.special_conditions {
        referenced_fields.insert(condition.field().to_string());
    }
    for sort in &query.sort {
        referenced_fields.insert(sort.field.clone());
    }

    Ok(QueryAnalysis {
        type_name: query.type_name.clone(),
        original_predicate: query.predicate.clone(),
        normalized_predicate: normalized,
        field_conditions,
        residual_predicates,
        sort_requirements: query.sort.clone(),
        limit: query.limit,
        offset: query.offset,
        referenced_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldType};
    use crate::predicate::FieldComparison;
    use crate::types::SortDirection;

    fn schema() -> RecordSchema {
        RecordSchema::new(
            "user",
            vec![
                FieldDef::new("id", FieldType::Integer),
                FieldDef::new("age", FieldType::Integer),
                FieldDef::new("region", FieldType::Text),
                FieldDef::new("bio", FieldType::Text),
            ],
        )
    }

    #[test]
    fn test_conjunction_lowered_to_conditions() {
        let q = Query::for_type("user").filter(Predicate::and(vec![
            Predicate::cmp(FieldComparison::eq("region", "US")),
            Predicate::cmp(FieldComparison::gt("age", 21i64)),
        ]));
        let analysis = analyze(&q, &schema()).unwrap();
        assert_eq!(analysis.field_conditions.len(), 2);
        assert!(analysis.residual_predicates.is_empty());
        assert!(analysis.condition_on_field("region").is_some());
    }

    #[test]
    fn test_merged_range_keeps_two_identifiers() {
        let q = Query::for_type("user").filter(Predicate::and(vec![
            Predicate::cmp(FieldComparison::gt("age", 20i64)),
            Predicate::cmp(FieldComparison::lt("age", 50i64)),
        ]));
        let analysis = analyze(&q, &schema()).unwrap();
        let on_age = analysis.conditions_on_field("age");
        assert_eq!(on_age.len(), 2);
        assert_ne!(on_age[0].identifier(), on_age[1].identifier());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let q = Query::for_type("user")
            .filter(Predicate::cmp(FieldComparison::eq("nope", 1i64)));
        assert!(matches!(
            analyze(&q, &schema()),
            Err(PlannerError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_unknown_sort_field_rejected() {
        let q = Query::for_type("user").sort_by("nope", SortDirection::Ascending);
        assert!(analyze(&q, &schema()).is_err());
    }

    #[test]
    fn test_contradiction_detected() {
        let q = Query::for_type("user").filter(Predicate::and(vec![
            Predicate::cmp(FieldComparison::ge("age", 5i64)),
            Predicate::cmp(FieldComparison::lt("age", 5i64)),
        ]));
        let analysis = analyze(&q, &schema()).unwrap();
        assert!(analysis.is_contradiction());
        assert!(analysis.field_conditions.is_empty());
    }

    #[test]
    fn test_disjunction_stays_in_normalized() {
        let q = Query::for_type("user").filter(Predicate::or(vec![
            Predicate::cmp(FieldComparison::eq("region", "US")),
            Predicate::cmp(FieldComparison::eq("region", "EU")),
        ]));
        let analysis = analyze(&q, &schema()).unwrap();
        assert!(analysis.is_disjunction());
        assert!(analysis.field_conditions.is_empty());
    }

    #[test]
    fn test_negation_kept_as_residual() {
        let q = Query::for_type("user").filter(Predicate::and(vec![
            Predicate::cmp(FieldComparison::eq("region", "US")),
            Predicate::not(Predicate::cmp(FieldComparison::contains("bio", "spam"))),
        ]));
        let analysis = analyze(&q, &schema()).unwrap();
        assert_eq!(analysis.field_conditions.len(), 1);
        assert_eq!(analysis.residual_predicates.len(), 1);
    }

    #[test]
    fn test_referenced_fields_include_sort_and_special() {
        let q = Query::for_type("user")
            .filter(Predicate::cmp(FieldComparison::eq("region", "US")))
            .sort_by("age", SortDirection::Ascending);
        let analysis = analyze(&q, &schema()).unwrap();
        assert!(analysis.referenced_fields.contains("region"));
        assert!(analysis.referenced_fields.contains("age"));
    }

    #[test]
    fn test_depth_guard() {
        let mut p = Predicate::cmp(FieldComparison::eq("age", 1i64));
        for _ in 0..200 {
            p = Predicate::not(p);
        }
        let q = Query::for_type("user").filter(p);
        assert!(analyze(&q, &schema()).is_err());
    }
}
