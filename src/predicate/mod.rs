//! Boolean predicate tree over field comparisons
//!
//! A `Predicate` is the declarative filter of a query: a recursive boolean
//! expression whose leaves compare a named field against literal values.
//! Ordered comparisons follow the total order of `Value` (null sorts first),
//! so evaluation, rewriting, and selectivity estimation all agree on the same
//! ordering semantics.

pub mod rewrite;

use crate::types::{Record, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Comparison operator of a predicate leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Contains,
    HasPrefix,
    HasSuffix,
    IsNull,
    IsNotNull,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::In => "in",
            ComparisonOp::Contains => "contains",
            ComparisonOp::HasPrefix => "has_prefix",
            ComparisonOp::HasSuffix => "has_suffix",
            ComparisonOp::IsNull => "is_null",
            ComparisonOp::IsNotNull => "is_not_null",
        }
    }

    /// Lower-bound operators (`>`, `>=`).
    pub fn is_lower_bound(self) -> bool {
        matches!(self, ComparisonOp::Gt | ComparisonOp::Ge)
    }

    /// Upper-bound operators (`<`, `<=`).
    pub fn is_upper_bound(self) -> bool {
        matches!(self, ComparisonOp::Lt | ComparisonOp::Le)
    }
}

/// Operand of a comparison: absent for null checks, a list for `In`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    None,
    Single(Value),
    List(Vec<Value>),
}

impl Operand {
    pub fn single(&self) -> Option<&Value> {
        match self {
            Operand::Single(v) => Some(v),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&[Value]> {
        match self {
            Operand::List(vs) => Some(vs),
            _ => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Operand::None => String::new(),
            Operand::Single(v) => v.render(),
            Operand::List(vs) => {
                let parts: Vec<String> = vs.iter().map(Value::render).collect();
                format!("[{}]", parts.join(","))
            }
        }
    }
}

/// A single field-vs-literal comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldComparison {
    pub field: String,
    pub op: ComparisonOp,
    pub operand: Operand,
}

impl FieldComparison {
    pub fn new(field: impl Into<String>, op: ComparisonOp, operand: Operand) -> Self {
        Self {
            field: field.into(),
            op,
            operand,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ComparisonOp::Eq, Operand::Single(value.into()))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ComparisonOp::Ne, Operand::Single(value.into()))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ComparisonOp::Lt, Operand::Single(value.into()))
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ComparisonOp::Le, Operand::Single(value.into()))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ComparisonOp::Gt, Operand::Single(value.into()))
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ComparisonOp::Ge, Operand::Single(value.into()))
    }

    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, ComparisonOp::In, Operand::List(values))
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::new(
            field,
            ComparisonOp::Contains,
            Operand::Single(Value::Text(needle.into())),
        )
    }

    pub fn has_prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(
            field,
            ComparisonOp::HasPrefix,
            Operand::Single(Value::Text(prefix.into())),
        )
    }

    pub fn has_suffix(field: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::new(
            field,
            ComparisonOp::HasSuffix,
            Operand::Single(Value::Text(suffix.into())),
        )
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, ComparisonOp::IsNull, Operand::None)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, ComparisonOp::IsNotNull, Operand::None)
    }

    /// Stable textual identity: two comparisons render identically iff they
    /// are structurally identical. Also the condition identifier.
    pub fn render(&self) -> String {
        match self.op {
            ComparisonOp::IsNull | ComparisonOp::IsNotNull => {
                format!("{} {}", self.field, self.op.symbol())
            }
            _ => format!("{} {} {}", self.field, self.op.symbol(), self.operand.render()),
        }
    }

    /// Evaluate against a single field value (missing fields are null).
    pub fn matches_value(&self, actual: &Value) -> bool {
        match self.op {
            ComparisonOp::Eq => self
                .operand
                .single()
                .is_some_and(|v| actual.compare(v) == Ordering::Equal),
            ComparisonOp::Ne => self
                .operand
                .single()
                .is_some_and(|v| actual.compare(v) != Ordering::Equal),
            ComparisonOp::Lt => self
                .operand
                .single()
                .is_some_and(|v| actual.compare(v) == Ordering::Less),
            ComparisonOp::Le => self
                .operand
                .single()
                .is_some_and(|v| actual.compare(v) != Ordering::Greater),
            ComparisonOp::Gt => self
                .operand
                .single()
                .is_some_and(|v| actual.compare(v) == Ordering::Greater),
            ComparisonOp::Ge => self
                .operand
                .single()
                .is_some_and(|v| actual.compare(v) != Ordering::Less),
            ComparisonOp::In => self
                .operand
                .list()
                .is_some_and(|vs| vs.iter().any(|v| actual.compare(v) == Ordering::Equal)),
            ComparisonOp::Contains => match (actual.as_text(), self.operand.single()) {
                (Some(haystack), Some(Value::Text(needle))) => haystack.contains(needle.as_str()),
                _ => false,
            },
            ComparisonOp::HasPrefix => match (actual.as_text(), self.operand.single()) {
                (Some(s), Some(Value::Text(prefix))) => s.starts_with(prefix.as_str()),
                _ => false,
            },
            ComparisonOp::HasSuffix => match (actual.as_text(), self.operand.single()) {
                (Some(s), Some(Value::Text(suffix))) => s.ends_with(suffix.as_str()),
                _ => false,
            },
            ComparisonOp::IsNull => actual.is_null(),
            ComparisonOp::IsNotNull => !actual.is_null(),
        }
    }
}

/// Recursive boolean predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    /// Always true (matches every record)
    True,
    /// Always false (matches nothing)
    False,
    /// Logical negation
    Not(Box<Predicate>),
    /// Conjunction of children
    And(Vec<Predicate>),
    /// Disjunction of children
    Or(Vec<Predicate>),
    /// Leaf comparison
    Compare(FieldComparison),
}

impl Predicate {
    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::And(children)
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Or(children)
    }

    pub fn not(child: Predicate) -> Self {
        Predicate::Not(Box::new(child))
    }

    pub fn cmp(comparison: FieldComparison) -> Self {
        Predicate::Compare(comparison)
    }

    /// Evaluate against a record. Missing fields read as null.
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Predicate::True => true,
            Predicate::False => false,
            Predicate::Not(child) => !child.evaluate(record),
            Predicate::And(children) => children.iter().all(|c| c.evaluate(record)),
            Predicate::Or(children) => children.iter().any(|c| c.evaluate(record)),
            Predicate::Compare(cmp) => {
                let actual = record.get(&cmp.field).cloned().unwrap_or(Value::Null);
                cmp.matches_value(&actual)
            }
        }
    }

    /// Canonical structural key. Children of `and`/`or` are sorted so that
    /// operand order does not affect identity.
    pub fn structural_key(&self) -> String {
        match self {
            Predicate::True => "true".to_string(),
            Predicate::False => "false".to_string(),
            Predicate::Not(child) => format!("not({})", child.structural_key()),
            Predicate::And(children) => {
                let mut keys: Vec<String> =
                    children.iter().map(Predicate::structural_key).collect();
                keys.sort();
                format!("and({})", keys.join(";"))
            }
            Predicate::Or(children) => {
                let mut keys: Vec<String> =
                    children.iter().map(Predicate::structural_key).collect();
                keys.sort();
                format!("or({})", keys.join(";"))
            }
            Predicate::Compare(cmp) => format!("cmp({})", cmp.render()),
        }
    }

    /// Every field name referenced anywhere in the tree, sorted.
    pub fn referenced_fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, out: &mut BTreeSet<String>) {
        match self {
            Predicate::True | Predicate::False => {}
            Predicate::Not(child) => child.collect_fields(out),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Predicate::Compare(cmp) => {
                out.insert(cmp.field.clone());
            }
        }
    }

    /// Leaf comparisons in tree order.
    pub fn comparisons(&self) -> Vec<&FieldComparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a FieldComparison>) {
        match self {
            Predicate::True | Predicate::False => {}
            Predicate::Not(child) => child.collect_comparisons(out),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_comparisons(out);
                }
            }
            Predicate::Compare(cmp) => out.push(cmp),
        }
    }

    /// Top-level conjunct list. A non-`And` predicate is its own single
    /// conjunct; `True` contributes none.
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        match self {
            Predicate::And(children) => children.iter().collect(),
            Predicate::True => Vec::new(),
            other => vec![other],
        }
    }

    pub fn is_disjunction(&self) -> bool {
        matches!(self, Predicate::Or(_))
    }

    /// Depth of the tree, for malformed-input guards.
    pub fn depth(&self) -> usize {
        match self {
            Predicate::True | Predicate::False | Predicate::Compare(_) => 1,
            Predicate::Not(child) => 1 + child.depth(),
            Predicate::And(children) | Predicate::Or(children) => {
                1 + children.iter().map(Predicate::depth).max().unwrap_or(0)
            }
        }
    }
}

impl From<FieldComparison> for Predicate {
    fn from(cmp: FieldComparison) -> Self {
        Predicate::Compare(cmp)
    }
}
