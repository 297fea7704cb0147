//! Predicate normalization
//!
//! `rewrite` applies a fixed pass order: flatten, deduplicate, merge range
//! bounds per field, fold constants, eliminate contradictions. The pipeline
//! is repeated until the tree stops changing, which makes the whole rewrite
//! idempotent. Semantics are preserved: for every record, the rewritten
//! predicate evaluates exactly like the original.
//!
//! Range-bound merging lives here and only here; downstream consumers
//! (analyzer, strategies) operate on already-merged bounds.

use super::{ComparisonOp, FieldComparison, Operand, Predicate};
use crate::types::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Maximum pipeline repetitions before giving up on reaching a fixpoint.
/// In practice one repetition suffices; two covers folds exposed by
/// contradiction elimination.
const MAX_PASSES: usize = 4;

/// Disjunct cap for DNF expansion; larger products are left undistributed.
const DNF_LIMIT: usize = 64;

/// Normalize a predicate. Pure; returns a new tree.
pub fn rewrite(predicate: &Predicate) -> Predicate {
    let mut current = predicate.clone();
    for _ in 0..MAX_PASSES {
        let next = rewrite_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn rewrite_once(predicate: &Predicate) -> Predicate {
    let p = flatten(predicate.clone());
    let p = deduplicate(p);
    let p = merge_field_ranges(p);
    let p = fold_constants(p);
    eliminate_contradictions(p)
}

// ---------------------------------------------------------------------------
// Flatten
// ---------------------------------------------------------------------------

fn flatten(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::And(children) => {
            let mut flat = Vec::with_capacity(children.len());
            for child in children {
                match flatten(child) {
                    Predicate::And(inner) => flat.extend(inner),
                    other => flat.push(other),
                }
            }
            collapse_single(Predicate::And(flat))
        }
        Predicate::Or(children) => {
            let mut flat = Vec::with_capacity(children.len());
            for child in children {
                match flatten(child) {
                    Predicate::Or(inner) => flat.extend(inner),
                    other => flat.push(other),
                }
            }
            collapse_single(Predicate::Or(flat))
        }
        Predicate::Not(child) => Predicate::not(flatten(*child)),
        leaf => leaf,
    }
}

fn collapse_single(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::And(mut children) if children.len() == 1 => children.remove(0),
        Predicate::Or(mut children) if children.len() == 1 => children.remove(0),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Deduplicate
// ---------------------------------------------------------------------------

fn deduplicate(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::And(children) => {
            collapse_single(Predicate::And(dedup_children(children)))
        }
        Predicate::Or(children) => collapse_single(Predicate::Or(dedup_children(children))),
        Predicate::Not(child) => Predicate::not(deduplicate(*child)),
        leaf => leaf,
    }
}

fn dedup_children(children: Vec<Predicate>) -> Vec<Predicate> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        let child = deduplicate(child);
        if seen.insert(child.structural_key()) {
            out.push(child);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Range merging
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Bound {
    value: Value,
    inclusive: bool,
}

impl Bound {
    /// True when `self` is the stricter lower bound: higher value wins,
    /// exclusive beats inclusive at equal value.
    fn stricter_lower_than(&self, other: &Bound) -> bool {
        match self.value.compare(&other.value) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => !self.inclusive && other.inclusive,
        }
    }

    /// True when `self` is the stricter upper bound: lower value wins,
    /// exclusive beats inclusive at equal value.
    fn stricter_upper_than(&self, other: &Bound) -> bool {
        match self.value.compare(&other.value) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => !self.inclusive && other.inclusive,
        }
    }

    fn to_lower_comparison(&self, field: &str) -> Predicate {
        let op = if self.inclusive {
            ComparisonOp::Ge
        } else {
            ComparisonOp::Gt
        };
        Predicate::Compare(FieldComparison::new(
            field,
            op,
            Operand::Single(self.value.clone()),
        ))
    }

    fn to_upper_comparison(&self, field: &str) -> Predicate {
        let op = if self.inclusive {
            ComparisonOp::Le
        } else {
            ComparisonOp::Lt
        };
        Predicate::Compare(FieldComparison::new(
            field,
            op,
            Operand::Single(self.value.clone()),
        ))
    }
}

/// Merged lower/upper bound pair for one field within one conjunction.
#[derive(Default, Clone)]
struct FieldRange {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl FieldRange {
    fn absorb(&mut self, cmp: &FieldComparison) {
        let Some(value) = cmp.operand.single() else {
            return;
        };
        let bound = Bound {
            value: value.clone(),
            inclusive: matches!(cmp.op, ComparisonOp::Ge | ComparisonOp::Le),
        };
        if cmp.op.is_lower_bound() {
            match &self.lower {
                Some(existing) if !bound.stricter_lower_than(existing) => {}
                _ => self.lower = Some(bound),
            }
        } else {
            match &self.upper {
                Some(existing) if !bound.stricter_upper_than(existing) => {}
                _ => self.upper = Some(bound),
            }
        }
    }
}

/// Merge range comparisons on the same field within every conjunction.
fn merge_field_ranges(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::And(children) => {
            let children: Vec<Predicate> =
                children.into_iter().map(merge_field_ranges).collect();

            // Collect per-field merged ranges in first-occurrence order.
            let mut order: Vec<String> = Vec::new();
            let mut ranges: ahash::AHashMap<String, FieldRange> = ahash::AHashMap::new();
            for child in &children {
                if let Predicate::Compare(cmp) = child {
                    if is_mergeable_range(cmp) {
                        if !ranges.contains_key(&cmp.field) {
                            order.push(cmp.field.clone());
                        }
                        ranges.entry(cmp.field.clone()).or_default().absorb(cmp);
                    }
                }
            }

            let mut out = Vec::with_capacity(children.len());
            let mut emitted: HashSet<String> = HashSet::new();
            for child in children {
                match &child {
                    Predicate::Compare(cmp) if is_mergeable_range(cmp) => {
                        if emitted.insert(cmp.field.clone()) {
                            let range = &ranges[&cmp.field];
                            if let Some(lower) = &range.lower {
                                out.push(lower.to_lower_comparison(&cmp.field));
                            }
                            if let Some(upper) = &range.upper {
                                out.push(upper.to_upper_comparison(&cmp.field));
                            }
                        }
                        // Later comparisons on the field were merged already.
                    }
                    _ => out.push(child),
                }
            }
            collapse_single(Predicate::And(out))
        }
        Predicate::Or(children) => Predicate::Or(
            children.into_iter().map(merge_field_ranges).collect(),
        ),
        Predicate::Not(child) => Predicate::not(merge_field_ranges(*child)),
        leaf => leaf,
    }
}

fn is_mergeable_range(cmp: &FieldComparison) -> bool {
    (cmp.op.is_lower_bound() || cmp.op.is_upper_bound()) && cmp.operand.single().is_some()
}

// ---------------------------------------------------------------------------
// Constant folding
// ---------------------------------------------------------------------------

fn fold_constants(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::And(children) => {
            let mut out = Vec::with_capacity(children.len());
            for child in children {
                match fold_constants(child) {
                    Predicate::True => {}
                    Predicate::False => return Predicate::False,
                    other => out.push(other),
                }
            }
            if out.is_empty() {
                Predicate::True
            } else {
                collapse_single(Predicate::And(out))
            }
        }
        Predicate::Or(children) => {
            let mut out = Vec::with_capacity(children.len());
            for child in children {
                match fold_constants(child) {
                    Predicate::False => {}
                    Predicate::True => return Predicate::True,
                    other => out.push(other),
                }
            }
            if out.is_empty() {
                Predicate::False
            } else {
                collapse_single(Predicate::Or(out))
            }
        }
        Predicate::Not(child) => match fold_constants(*child) {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(inner) => *inner,
            other => Predicate::not(other),
        },
        leaf => leaf,
    }
}

// ---------------------------------------------------------------------------
// Contradiction elimination
// ---------------------------------------------------------------------------

/// Detect impossible conjunctions and replace them with `False`. Applied
/// only to values with a usable total order (numeric, string, timestamp).
fn eliminate_contradictions(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::And(children) => {
            let children: Vec<Predicate> = children
                .into_iter()
                .map(eliminate_contradictions)
                .collect();
            if conjunction_is_contradictory(&children) {
                Predicate::False
            } else {
                Predicate::And(children)
            }
        }
        Predicate::Or(children) => Predicate::Or(
            children
                .into_iter()
                .map(eliminate_contradictions)
                .collect(),
        ),
        Predicate::Not(child) => Predicate::not(eliminate_contradictions(*child)),
        leaf => leaf,
    }
}

fn conjunction_is_contradictory(children: &[Predicate]) -> bool {
    let mut equalities: ahash::AHashMap<&str, &Value> = ahash::AHashMap::new();
    let mut ranges: ahash::AHashMap<&str, FieldRange> = ahash::AHashMap::new();

    for child in children {
        let Predicate::Compare(cmp) = child else {
            continue;
        };
        match cmp.op {
            ComparisonOp::Eq => {
                let Some(value) = cmp.operand.single() else {
                    continue;
                };
                if !value.is_orderable_scalar() {
                    continue;
                }
                if let Some(existing) = equalities.get(cmp.field.as_str()) {
                    if existing.compare(value) != Ordering::Equal {
                        return true;
                    }
                } else {
                    equalities.insert(cmp.field.as_str(), value);
                }
            }
            ComparisonOp::Lt | ComparisonOp::Le | ComparisonOp::Gt | ComparisonOp::Ge => {
                let Some(value) = cmp.operand.single() else {
                    continue;
                };
                if !value.is_orderable_scalar() {
                    continue;
                }
                ranges.entry(cmp.field.as_str()).or_default().absorb(cmp);
            }
            _ => {}
        }
    }

    for (field, range) in &ranges {
        if let (Some(lower), Some(upper)) = (&range.lower, &range.upper) {
            match lower.value.compare(&upper.value) {
                Ordering::Greater => return true,
                Ordering::Equal if !(lower.inclusive && upper.inclusive) => return true,
                _ => {}
            }
        }
        if let Some(eq) = equalities.get(field) {
            if let Some(lower) = &range.lower {
                let cmp = eq.compare(&lower.value);
                if cmp == Ordering::Less || (cmp == Ordering::Equal && !lower.inclusive) {
                    return true;
                }
            }
            if let Some(upper) = &range.upper {
                let cmp = eq.compare(&upper.value);
                if cmp == Ordering::Greater || (cmp == Ordering::Equal && !upper.inclusive) {
                    return true;
                }
            }
        }
    }

    false
}

// ---------------------------------------------------------------------------
// Disjunctive normal form
// ---------------------------------------------------------------------------

/// Convert to disjunctive normal form, used by union-plan enumeration when a
/// conjunction hides a nested disjunction. Negations are pushed to the
/// leaves first. Expansion is abandoned (the input returned unchanged) when
/// the distributed form would exceed an internal disjunct cap.
pub fn to_dnf(predicate: &Predicate) -> Predicate {
    let nnf = push_negations(predicate.clone());
    match distribute(&nnf) {
        Some(disjuncts) if !disjuncts.is_empty() => {
            let branches: Vec<Predicate> = disjuncts
                .into_iter()
                .map(|conj| collapse_single(Predicate::And(conj)))
                .collect();
            fold_constants(collapse_single(Predicate::Or(branches)))
        }
        _ => nnf,
    }
}

fn push_negations(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::Not(child) => match *child {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(inner) => push_negations(*inner),
            Predicate::And(children) => Predicate::Or(
                children
                    .into_iter()
                    .map(|c| push_negations(Predicate::not(c)))
                    .collect(),
            ),
            Predicate::Or(children) => Predicate::And(
                children
                    .into_iter()
                    .map(|c| push_negations(Predicate::not(c)))
                    .collect(),
            ),
            Predicate::Compare(cmp) => negate_comparison(cmp),
        },
        Predicate::And(children) => {
            Predicate::And(children.into_iter().map(push_negations).collect())
        }
        Predicate::Or(children) => {
            Predicate::Or(children.into_iter().map(push_negations).collect())
        }
        leaf => leaf,
    }
}

fn negate_comparison(cmp: FieldComparison) -> Predicate {
    let negated_op = match cmp.op {
        ComparisonOp::Eq => Some(ComparisonOp::Ne),
        ComparisonOp::Ne => Some(ComparisonOp::Eq),
        ComparisonOp::Lt => Some(ComparisonOp::Ge),
        ComparisonOp::Le => Some(ComparisonOp::Gt),
        ComparisonOp::Gt => Some(ComparisonOp::Le),
        ComparisonOp::Ge => Some(ComparisonOp::Lt),
        ComparisonOp::IsNull => Some(ComparisonOp::IsNotNull),
        ComparisonOp::IsNotNull => Some(ComparisonOp::IsNull),
        _ => None,
    };
    match negated_op {
        Some(op) => Predicate::Compare(FieldComparison::new(cmp.field, op, cmp.operand)),
        None => Predicate::not(Predicate::Compare(cmp)),
    }
}

/// Distribute conjunctions over disjunctions. Returns the disjunct list,
/// or None when the product would exceed `DNF_LIMIT`.
fn distribute(predicate: &Predicate) -> Option<Vec<Vec<Predicate>>> {
    match predicate {
        Predicate::Or(children) => {
            let mut disjuncts = Vec::new();
            for child in children {
                disjuncts.extend(distribute(child)?);
                if disjuncts.len() > DNF_LIMIT {
                    return None;
                }
            }
            Some(disjuncts)
        }
        Predicate::And(children) => {
            let mut product: Vec<Vec<Predicate>> = vec![Vec::new()];
            for child in children {
                let branches = distribute(child)?;
                let mut next = Vec::with_capacity(product.len() * branches.len());
                for existing in &product {
                    for branch in &branches {
                        let mut combined = existing.clone();
                        combined.extend(branch.iter().cloned());
                        next.push(combined);
                    }
                }
                if next.len() > DNF_LIMIT {
                    return None;
                }
                product = next;
            }
            Some(product)
        }
        leaf => Some(vec![vec![leaf.clone()]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;

    fn gt(field: &str, v: i64) -> Predicate {
        Predicate::cmp(FieldComparison::gt(field, v))
    }

    fn lt(field: &str, v: i64) -> Predicate {
        Predicate::cmp(FieldComparison::lt(field, v))
    }

    fn ge(field: &str, v: i64) -> Predicate {
        Predicate::cmp(FieldComparison::ge(field, v))
    }

    fn eq(field: &str, v: i64) -> Predicate {
        Predicate::cmp(FieldComparison::eq(field, v))
    }

    #[test]
    fn test_flatten_nested_and() {
        let p = Predicate::and(vec![
            Predicate::and(vec![eq("a", 1), eq("b", 2)]),
            eq("c", 3),
        ]);
        let r = rewrite(&p);
        match r {
            Predicate::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_single_child_collapses() {
        let p = Predicate::and(vec![eq("a", 1)]);
        assert_eq!(rewrite(&p), eq("a", 1));
    }

    #[test]
    fn test_deduplicate() {
        let p = Predicate::and(vec![eq("a", 1), eq("a", 1), eq("b", 2)]);
        match rewrite(&p) {
            Predicate::And(children) => assert_eq!(children.len(), 2),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_range_merge_scenario() {
        // age > 18 AND age > 21 AND age < 30  =>  age > 21 AND age < 30
        let p = Predicate::and(vec![gt("age", 18), gt("age", 21), lt("age", 30)]);
        let r = rewrite(&p);
        let expected = Predicate::and(vec![gt("age", 21), lt("age", 30)]);
        assert_eq!(r, expected);
    }

    #[test]
    fn test_exclusive_beats_inclusive_at_equal_value() {
        let p = Predicate::and(vec![ge("age", 21), gt("age", 21), lt("age", 30)]);
        let r = rewrite(&p);
        let expected = Predicate::and(vec![gt("age", 21), lt("age", 30)]);
        assert_eq!(r, expected);
    }

    #[test]
    fn test_contradiction_scenario() {
        // age >= 5 AND age < 5  =>  false
        let p = Predicate::and(vec![ge("age", 5), lt("age", 5)]);
        assert_eq!(rewrite(&p), Predicate::False);
    }

    #[test]
    fn test_contradictory_equalities() {
        let p = Predicate::and(vec![eq("status", 1), eq("status", 2)]);
        assert_eq!(rewrite(&p), Predicate::False);
    }

    #[test]
    fn test_equality_outside_range() {
        let p = Predicate::and(vec![eq("age", 10), gt("age", 20)]);
        assert_eq!(rewrite(&p), Predicate::False);
    }

    #[test]
    fn test_equality_inside_range_survives() {
        let p = Predicate::and(vec![eq("age", 25), gt("age", 20), lt("age", 30)]);
        let r = rewrite(&p);
        assert_ne!(r, Predicate::False);
    }

    #[test]
    fn test_fold_constants() {
        let p = Predicate::and(vec![Predicate::True, eq("a", 1)]);
        assert_eq!(rewrite(&p), eq("a", 1));

        let p = Predicate::and(vec![Predicate::False, eq("a", 1)]);
        assert_eq!(rewrite(&p), Predicate::False);

        let p = Predicate::or(vec![Predicate::True, eq("a", 1)]);
        assert_eq!(rewrite(&p), Predicate::True);

        let p = Predicate::not(Predicate::not(eq("a", 1)));
        assert_eq!(rewrite(&p), eq("a", 1));
    }

    #[test]
    fn test_contradiction_inside_or_folds_away() {
        let p = Predicate::or(vec![
            Predicate::and(vec![ge("age", 5), lt("age", 5)]),
            eq("age", 7),
        ]);
        assert_eq!(rewrite(&p), eq("age", 7));
    }

    #[test]
    fn test_bool_values_skip_contradiction_check() {
        // Equality contradiction detection requires a totally ordered scalar;
        // conflicting booleans pass through untouched.
        let p = Predicate::and(vec![
            Predicate::cmp(FieldComparison::eq("flag", true)),
            Predicate::cmp(FieldComparison::eq("flag", false)),
        ]);
        assert_ne!(rewrite(&p), Predicate::False);
    }

    #[test]
    fn test_rewrite_idempotent() {
        let cases = vec![
            Predicate::and(vec![gt("age", 18), gt("age", 21), lt("age", 30)]),
            Predicate::or(vec![
                Predicate::and(vec![eq("a", 1), eq("a", 1)]),
                Predicate::and(vec![ge("b", 5), lt("b", 5)]),
            ]),
            Predicate::not(Predicate::not(eq("x", 3))),
            Predicate::True,
            Predicate::False,
        ];
        for p in cases {
            let once = rewrite(&p);
            let twice = rewrite(&once);
            assert_eq!(once, twice, "rewrite not idempotent for {p:?}");
        }
    }

    #[test]
    fn test_semantics_preserved() {
        let predicates = vec![
            Predicate::and(vec![gt("age", 18), gt("age", 21), lt("age", 30)]),
            Predicate::and(vec![ge("age", 5), lt("age", 5)]),
            Predicate::or(vec![eq("age", 10), Predicate::and(vec![gt("age", 20), eq("age", 25)])]),
            Predicate::not(Predicate::and(vec![gt("age", 5), lt("age", 10)])),
        ];
        for p in &predicates {
            let r = rewrite(p);
            for age in [-1i64, 0, 5, 10, 18, 21, 22, 25, 29, 30, 100] {
                let mut record = Record::new();
                record.insert("age".to_string(), Value::Integer(age));
                assert_eq!(
                    p.evaluate(&record),
                    r.evaluate(&record),
                    "semantics diverged at age={age} for {p:?}"
                );
            }
        }
    }

    #[test]
    fn test_dnf_distributes() {
        // a AND (b OR c)  =>  (a AND b) OR (a AND c)
        let p = Predicate::and(vec![
            eq("a", 1),
            Predicate::or(vec![eq("b", 2), eq("c", 3)]),
        ]);
        match to_dnf(&p) {
            Predicate::Or(branches) => {
                assert_eq!(branches.len(), 2);
                for branch in &branches {
                    match branch {
                        Predicate::And(children) => assert_eq!(children.len(), 2),
                        other => panic!("expected And branch, got {other:?}"),
                    }
                }
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn test_dnf_pushes_negations() {
        let p = Predicate::not(Predicate::and(vec![eq("a", 1), gt("b", 2)]));
        match to_dnf(&p) {
            Predicate::Or(branches) => {
                assert_eq!(branches.len(), 2);
                assert_eq!(
                    branches[0],
                    Predicate::cmp(FieldComparison::ne("a", 1i64))
                );
                assert_eq!(branches[1], Predicate::cmp(FieldComparison::le("b", 2i64)));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn test_dnf_preserves_semantics() {
        let p = Predicate::and(vec![
            Predicate::or(vec![eq("a", 1), eq("a", 2)]),
            Predicate::or(vec![eq("b", 3), eq("b", 4)]),
        ]);
        let d = to_dnf(&p);
        for a in 0i64..4 {
            for b in 2i64..6 {
                let mut record = Record::new();
                record.insert("a".to_string(), Value::Integer(a));
                record.insert("b".to_string(), Value::Integer(b));
                assert_eq!(p.evaluate(&record), d.evaluate(&record));
            }
        }
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::types::Record;
    use proptest::prelude::*;

    fn arb_comparison() -> impl Strategy<Value = Predicate> {
        (
            prop::sample::select(vec!["a", "b", "c"]),
            prop::sample::select(vec![
                ComparisonOp::Eq,
                ComparisonOp::Ne,
                ComparisonOp::Lt,
                ComparisonOp::Le,
                ComparisonOp::Gt,
                ComparisonOp::Ge,
            ]),
            -20i64..20,
        )
            .prop_map(|(field, op, value)| {
                Predicate::Compare(FieldComparison::new(
                    field,
                    op,
                    Operand::Single(crate::types::Value::Integer(value)),
                ))
            })
    }

    fn arb_predicate() -> impl Strategy<Value = Predicate> {
        let leaf = prop_oneof![
            arb_comparison(),
            Just(Predicate::True),
            Just(Predicate::False),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..4).prop_map(Predicate::And),
                prop::collection::vec(inner.clone(), 1..4).prop_map(Predicate::Or),
                inner.prop_map(Predicate::not),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_rewrite_idempotent(p in arb_predicate()) {
            let once = rewrite(&p);
            let twice = rewrite(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_rewrite_preserves_semantics(
            p in arb_predicate(),
            a in -25i64..25,
            b in -25i64..25,
            c in -25i64..25,
        ) {
            let rewritten = rewrite(&p);
            let mut record = Record::new();
            record.insert("a".to_string(), crate::types::Value::Integer(a));
            record.insert("b".to_string(), crate::types::Value::Integer(b));
            record.insert("c".to_string(), crate::types::Value::Integer(c));
            prop_assert_eq!(p.evaluate(&record), rewritten.evaluate(&record));
        }

        #[test]
        fn prop_dnf_preserves_semantics(
            p in arb_predicate(),
            a in -25i64..25,
            b in -25i64..25,
        ) {
            let dnf = to_dnf(&p);
            let mut record = Record::new();
            record.insert("a".to_string(), crate::types::Value::Integer(a));
            record.insert("b".to_string(), crate::types::Value::Integer(b));
            prop_assert_eq!(p.evaluate(&record), dnf.evaluate(&record));
        }
    }
}
