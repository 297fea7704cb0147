//! Canonical per-field constraints
//!
//! The analyzer lowers every predicate leaf (and every specialized query
//! constraint) into a `FieldCondition`: a per-field constraint typed by
//! family — scalar, text search, spatial, vector, string pattern. Index
//! strategies match against conditions, never against the raw predicate
//! tree.
//!
//! Every condition carries a stable identifier derived from its source
//! constraint. Conditions derived from the same comparison always produce
//! the same identifier, and two different comparisons on the same field
//! (for example `age > 20` and `age < 50`) produce distinct identifiers;
//! the planner uses the identifier set to decide which conditions remain
//! unsatisfied after a plan is built.

use crate::distance::DistanceMetric;
use crate::error::{PlannerError, Result};
use crate::predicate::{ComparisonOp, FieldComparison, Predicate};
use crate::types::{polygon_bounds, polygon_contains, BoundingBox, GeoPoint, Value};
use regex::Regex;
use std::cmp::Ordering;

/// Inclusive/exclusive scan bounds on a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarBounds {
    pub lower: Option<Value>,
    pub upper: Option<Value>,
    pub lower_inclusive: bool,
    pub upper_inclusive: bool,
}

impl ScalarBounds {
    pub fn exact(value: Value) -> Self {
        Self {
            lower: Some(value.clone()),
            upper: Some(value),
            lower_inclusive: true,
            upper_inclusive: true,
        }
    }

    pub fn lower(value: Value, inclusive: bool) -> Self {
        Self {
            lower: Some(value),
            upper: None,
            lower_inclusive: inclusive,
            upper_inclusive: false,
        }
    }

    pub fn upper(value: Value, inclusive: bool) -> Self {
        Self {
            lower: None,
            upper: Some(value),
            lower_inclusive: false,
            upper_inclusive: inclusive,
        }
    }

    pub fn between(lower: Value, lower_inclusive: bool, upper: Value, upper_inclusive: bool) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
            lower_inclusive,
            upper_inclusive,
        }
    }

    /// Whether a value falls inside the bounds.
    pub fn contains(&self, value: &Value) -> bool {
        if let Some(lower) = &self.lower {
            match value.compare(lower) {
                Ordering::Less => return false,
                Ordering::Equal if !self.lower_inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match value.compare(upper) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.upper_inclusive => return false,
                _ => {}
            }
        }
        true
    }

    pub fn render(&self) -> String {
        let lo = match &self.lower {
            Some(v) => format!("{}{}", if self.lower_inclusive { "[" } else { "(" }, v.render()),
            None => "(-inf".to_string(),
        };
        let hi = match &self.upper {
            Some(v) => format!("{}{}", v.render(), if self.upper_inclusive { "]" } else { ")" }),
            None => "+inf)".to_string(),
        };
        format!("{lo}..{hi}")
    }
}

/// Scalar constraint family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarConditionType {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Between,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

/// Scalar (B-tree addressable) condition
#[derive(Debug, Clone)]
pub struct ScalarCondition {
    pub field: String,
    pub condition_type: ScalarConditionType,
    pub values: Vec<Value>,
    pub bounds: Option<ScalarBounds>,
    source: FieldComparison,
}

impl ScalarCondition {
    pub fn value(&self) -> Option<&Value> {
        self.values.first()
    }

    pub fn is_equality(&self) -> bool {
        self.condition_type == ScalarConditionType::Eq
    }

    pub fn is_range(&self) -> bool {
        matches!(
            self.condition_type,
            ScalarConditionType::Lt
                | ScalarConditionType::Le
                | ScalarConditionType::Gt
                | ScalarConditionType::Ge
                | ScalarConditionType::Between
        )
    }

    pub fn is_membership(&self) -> bool {
        self.condition_type == ScalarConditionType::In
    }

    fn satisfied_by(&self, value: &Value) -> bool {
        match self.condition_type {
            ScalarConditionType::Eq => self
                .value()
                .is_some_and(|v| value.compare(v) == Ordering::Equal),
            ScalarConditionType::Ne => self
                .value()
                .is_some_and(|v| value.compare(v) != Ordering::Equal),
            ScalarConditionType::Lt
            | ScalarConditionType::Le
            | ScalarConditionType::Gt
            | ScalarConditionType::Ge
            | ScalarConditionType::Between => self
                .bounds
                .as_ref()
                .is_some_and(|bounds| bounds.contains(value)),
            ScalarConditionType::In => self
                .values
                .iter()
                .any(|v| value.compare(v) == Ordering::Equal),
            ScalarConditionType::NotIn => self
                .values
                .iter()
                .all(|v| value.compare(v) != Ordering::Equal),
            ScalarConditionType::IsNull => value.is_null(),
            ScalarConditionType::IsNotNull => !value.is_null(),
        }
    }
}

/// Text search match mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextMatchMode {
    /// Any term matches
    Any,
    /// All terms must match
    All,
    /// Terms must appear adjacent, in order
    Phrase,
}

impl TextMatchMode {
    pub fn name(self) -> &'static str {
        match self {
            TextMatchMode::Any => "any",
            TextMatchMode::All => "all",
            TextMatchMode::Phrase => "phrase",
        }
    }
}

/// Full-text search condition
#[derive(Debug, Clone)]
pub struct TextSearchCondition {
    pub field: String,
    pub terms: Vec<String>,
    pub match_mode: TextMatchMode,
    pub min_score: Option<f64>,
    source: Option<FieldComparison>,
}

impl TextSearchCondition {
    fn satisfied_by(&self, value: &Value) -> bool {
        let Some(text) = value.as_text() else {
            return false;
        };
        let haystack = text.to_lowercase();
        match self.match_mode {
            TextMatchMode::Any => self
                .terms
                .iter()
                .any(|t| haystack.contains(&t.to_lowercase())),
            TextMatchMode::All => self
                .terms
                .iter()
                .all(|t| haystack.contains(&t.to_lowercase())),
            TextMatchMode::Phrase => haystack.contains(&self.terms.join(" ").to_lowercase()),
        }
    }
}

/// Spatial constraint shape
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialConstraint {
    WithinDistance { center: GeoPoint, radius_meters: f64 },
    WithinBounds(BoundingBox),
    WithinPolygon { points: Vec<GeoPoint> },
}

impl SpatialConstraint {
    /// Conservative bounding box of the constraint region.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            SpatialConstraint::WithinDistance { center, radius_meters } => {
                // One degree of latitude is ~111km; widen by the radius.
                let degrees = radius_meters / 111_000.0;
                Some(BoundingBox::new(
                    center.latitude - degrees,
                    center.longitude - degrees,
                    center.latitude + degrees,
                    center.longitude + degrees,
                ))
            }
            SpatialConstraint::WithinBounds(b) => Some(*b),
            SpatialConstraint::WithinPolygon { points } => polygon_bounds(points),
        }
    }

    pub fn contains_point(&self, point: &GeoPoint) -> bool {
        match self {
            SpatialConstraint::WithinDistance { center, radius_meters } => {
                center.distance_meters(point) <= *radius_meters
            }
            SpatialConstraint::WithinBounds(bounds) => bounds.contains(point),
            SpatialConstraint::WithinPolygon { points } => polygon_contains(points, point),
        }
    }

    fn render(&self) -> String {
        match self {
            SpatialConstraint::WithinDistance { center, radius_meters } => format!(
                "within_distance(({},{}),{})",
                center.latitude, center.longitude, radius_meters
            ),
            SpatialConstraint::WithinBounds(b) => format!(
                "within_bounds({},{},{},{})",
                b.min_latitude, b.min_longitude, b.max_latitude, b.max_longitude
            ),
            SpatialConstraint::WithinPolygon { points } => {
                format!("within_polygon({} vertices)", points.len())
            }
        }
    }
}

/// Spatial condition on a geo field
#[derive(Debug, Clone)]
pub struct SpatialCondition {
    pub field: String,
    pub constraint: SpatialConstraint,
}

/// Vector similarity condition (k nearest neighbors)
#[derive(Debug, Clone)]
pub struct VectorCondition {
    pub field: String,
    pub query_vector: Vec<f32>,
    pub k: usize,
    pub metric: DistanceMetric,
    pub ef_search: Option<usize>,
}

/// String pattern family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternType {
    Contains,
    Prefix,
    Suffix,
    Like,
    Regex,
}

impl PatternType {
    pub fn name(self) -> &'static str {
        match self {
            PatternType::Contains => "contains",
            PatternType::Prefix => "prefix",
            PatternType::Suffix => "suffix",
            PatternType::Like => "like",
            PatternType::Regex => "regex",
        }
    }
}

/// String pattern condition
#[derive(Debug, Clone)]
pub struct StringPatternCondition {
    pub field: String,
    pub pattern_type: PatternType,
    pub pattern: String,
    pub case_sensitive: bool,
    compiled: Option<Regex>,
    source: Option<FieldComparison>,
}

impl StringPatternCondition {
    pub fn new(
        field: impl Into<String>,
        pattern_type: PatternType,
        pattern: impl Into<String>,
        case_sensitive: bool,
    ) -> Result<Self> {
        let field = field.into();
        let pattern = pattern.into();
        let compiled = match pattern_type {
            PatternType::Like => Some(compile_like(&pattern, case_sensitive)?),
            PatternType::Regex => {
                let raw = if case_sensitive {
                    pattern.clone()
                } else {
                    format!("(?i){pattern}")
                };
                Some(Regex::new(&raw).map_err(|e| {
                    PlannerError::invalid_query(format!("invalid regex pattern: {e}"))
                })?)
            }
            _ => None,
        };
        Ok(Self {
            field,
            pattern_type,
            pattern,
            case_sensitive,
            compiled,
            source: None,
        })
    }

    fn with_source(mut self, source: FieldComparison) -> Self {
        self.source = Some(source);
        self
    }

    fn satisfied_by(&self, value: &Value) -> bool {
        let Some(text) = value.as_text() else {
            return false;
        };
        match self.pattern_type {
            PatternType::Contains => {
                if self.case_sensitive {
                    text.contains(&self.pattern)
                } else {
                    text.to_lowercase().contains(&self.pattern.to_lowercase())
                }
            }
            PatternType::Prefix => {
                if self.case_sensitive {
                    text.starts_with(&self.pattern)
                } else {
                    text.to_lowercase().starts_with(&self.pattern.to_lowercase())
                }
            }
            PatternType::Suffix => {
                if self.case_sensitive {
                    text.ends_with(&self.pattern)
                } else {
                    text.to_lowercase().ends_with(&self.pattern.to_lowercase())
                }
            }
            PatternType::Like | PatternType::Regex => self
                .compiled
                .as_ref()
                .is_some_and(|re| re.is_match(text)),
        }
    }
}

/// Translate a SQL-style LIKE pattern into an anchored regex.
fn compile_like(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    let mut regex = String::with_capacity(pattern.len() + 8);
    if !case_sensitive {
        regex.push_str("(?i)");
    }
    regex.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            c if "\\.+*?()|[]{}^$".contains(c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
    }
    regex.push('$');
    Regex::new(&regex)
        .map_err(|e| PlannerError::invalid_query(format!("invalid like pattern: {e}")))
}

/// Canonical per-field constraint, polymorphic over constraint family.
#[derive(Debug, Clone)]
pub enum FieldCondition {
    Scalar(ScalarCondition),
    TextSearch(TextSearchCondition),
    Spatial(SpatialCondition),
    Vector(VectorCondition),
    StringPattern(StringPatternCondition),
}

impl FieldCondition {
    /// Lower a predicate comparison into the narrowest matching condition
    /// variant.
    pub fn from_comparison(cmp: &FieldComparison) -> Result<FieldCondition> {
        let scalar = |condition_type, values, bounds| {
            FieldCondition::Scalar(ScalarCondition {
                field: cmp.field.clone(),
                condition_type,
                values,
                bounds,
                source: cmp.clone(),
            })
        };

        let single = || -> Result<Value> {
            cmp.operand.single().cloned().ok_or_else(|| {
                PlannerError::invalid_query(format!(
                    "operator {} on field '{}' requires a single operand",
                    cmp.op.symbol(),
                    cmp.field
                ))
            })
        };

        Ok(match cmp.op {
            ComparisonOp::Eq => {
                let v = single()?;
                scalar(
                    ScalarConditionType::Eq,
                    vec![v.clone()],
                    Some(ScalarBounds::exact(v)),
                )
            }
            ComparisonOp::Ne => scalar(ScalarConditionType::Ne, vec![single()?], None),
            ComparisonOp::Lt => {
                let v = single()?;
                scalar(
                    ScalarConditionType::Lt,
                    vec![v.clone()],
                    Some(ScalarBounds::upper(v, false)),
                )
            }
            ComparisonOp::Le => {
                let v = single()?;
                scalar(
                    ScalarConditionType::Le,
                    vec![v.clone()],
                    Some(ScalarBounds::upper(v, true)),
                )
            }
            ComparisonOp::Gt => {
                let v = single()?;
                scalar(
                    ScalarConditionType::Gt,
                    vec![v.clone()],
                    Some(ScalarBounds::lower(v, false)),
                )
            }
            ComparisonOp::Ge => {
                let v = single()?;
                scalar(
                    ScalarConditionType::Ge,
                    vec![v.clone()],
                    Some(ScalarBounds::lower(v, true)),
                )
            }
            ComparisonOp::In => {
                let values = cmp
                    .operand
                    .list()
                    .ok_or_else(|| {
                        PlannerError::invalid_query(format!(
                            "in operator on field '{}' requires a value list",
                            cmp.field
                        ))
                    })?
                    .to_vec();
                if values.is_empty() {
                    return Err(PlannerError::invalid_query(format!(
                        "empty in-list on field '{}'",
                        cmp.field
                    )));
                }
                let mut sorted = values.clone();
                sorted.sort();
                let bounds = ScalarBounds::between(
                    sorted[0].clone(),
                    true,
                    sorted[sorted.len() - 1].clone(),
                    true,
                );
                scalar(ScalarConditionType::In, values, Some(bounds))
            }
            ComparisonOp::IsNull => scalar(ScalarConditionType::IsNull, Vec::new(), None),
            ComparisonOp::IsNotNull => scalar(ScalarConditionType::IsNotNull, Vec::new(), None),
            ComparisonOp::Contains => {
                let v = single()?;
                let Value::Text(pattern) = v else {
                    return Err(PlannerError::invalid_query(format!(
                        "contains on field '{}' requires a string operand",
                        cmp.field
                    )));
                };
                FieldCondition::StringPattern(
                    StringPatternCondition::new(&cmp.field, PatternType::Contains, pattern, true)?
                        .with_source(cmp.clone()),
                )
            }
            ComparisonOp::HasPrefix => {
                let v = single()?;
                let Value::Text(pattern) = v else {
                    return Err(PlannerError::invalid_query(format!(
                        "has_prefix on field '{}' requires a string operand",
                        cmp.field
                    )));
                };
                FieldCondition::StringPattern(
                    StringPatternCondition::new(&cmp.field, PatternType::Prefix, pattern, true)?
                        .with_source(cmp.clone()),
                )
            }
            ComparisonOp::HasSuffix => {
                let v = single()?;
                let Value::Text(pattern) = v else {
                    return Err(PlannerError::invalid_query(format!(
                        "has_suffix on field '{}' requires a string operand",
                        cmp.field
                    )));
                };
                FieldCondition::StringPattern(
                    StringPatternCondition::new(&cmp.field, PatternType::Suffix, pattern, true)?
                        .with_source(cmp.clone()),
                )
            }
        })
    }

    pub fn text_search(
        field: impl Into<String>,
        terms: Vec<String>,
        match_mode: TextMatchMode,
        min_score: Option<f64>,
    ) -> FieldCondition {
        FieldCondition::TextSearch(TextSearchCondition {
            field: field.into(),
            terms,
            match_mode,
            min_score,
            source: None,
        })
    }

    pub fn spatial(field: impl Into<String>, constraint: SpatialConstraint) -> FieldCondition {
        FieldCondition::Spatial(SpatialCondition {
            field: field.into(),
            constraint,
        })
    }

    pub fn vector(
        field: impl Into<String>,
        query_vector: Vec<f32>,
        k: usize,
        metric: DistanceMetric,
        ef_search: Option<usize>,
    ) -> FieldCondition {
        FieldCondition::Vector(VectorCondition {
            field: field.into(),
            query_vector,
            k,
            metric,
            ef_search,
        })
    }

    pub fn field(&self) -> &str {
        match self {
            FieldCondition::Scalar(c) => &c.field,
            FieldCondition::TextSearch(c) => &c.field,
            FieldCondition::Spatial(c) => &c.field,
            FieldCondition::Vector(c) => &c.field,
            FieldCondition::StringPattern(c) => &c.field,
        }
    }

    /// Stable identity of the source constraint. Two conditions derived from
    /// the same comparison are guaranteed to share an identifier.
    pub fn identifier(&self) -> String {
        match self {
            FieldCondition::Scalar(c) => c.source.render(),
            FieldCondition::StringPattern(c) => match &c.source {
                Some(source) => source.render(),
                None => format!(
                    "{} {}({})",
                    c.field,
                    c.pattern_type.name(),
                    c.pattern
                ),
            },
            FieldCondition::TextSearch(c) => match &c.source {
                Some(source) => source.render(),
                None => format!(
                    "{} text_{}([{}])",
                    c.field,
                    c.match_mode.name(),
                    c.terms.join(",")
                ),
            },
            FieldCondition::Spatial(c) => format!("{} {}", c.field, c.constraint.render()),
            FieldCondition::Vector(c) => format!(
                "{} knn(k={},metric={})",
                c.field,
                c.k,
                c.metric.name()
            ),
        }
    }

    /// Whether a single field value satisfies this condition.
    ///
    /// Vector and spatial conditions report true: membership is enforced by
    /// the index searcher that produced the candidate, not by a scalar
    /// comparison.
    pub fn satisfied_by(&self, value: &Value) -> bool {
        match self {
            FieldCondition::Scalar(c) => c.satisfied_by(value),
            FieldCondition::TextSearch(c) => c.satisfied_by(value),
            FieldCondition::StringPattern(c) => c.satisfied_by(value),
            FieldCondition::Spatial(_) | FieldCondition::Vector(_) => true,
        }
    }

    /// Scan bounds, where the condition family supports them. Prefix
    /// patterns map to `[pattern, pattern + 0xFF)`.
    pub fn to_bounds(&self) -> Option<ScalarBounds> {
        match self {
            FieldCondition::Scalar(c) => c.bounds.clone(),
            FieldCondition::StringPattern(c) if c.pattern_type == PatternType::Prefix => {
                let mut sentinel = c.pattern.clone();
                sentinel.push('\u{10FFFF}');
                Some(ScalarBounds::between(
                    Value::Text(c.pattern.clone()),
                    true,
                    Value::Text(sentinel),
                    false,
                ))
            }
            _ => None,
        }
    }

    /// Source predicate for post-filtering, when one exists. Vector and
    /// spatial conditions have no predicate form; they must be satisfied by
    /// an index or the query is unplannable.
    pub fn source_predicate(&self) -> Option<Predicate> {
        match self {
            FieldCondition::Scalar(c) => Some(Predicate::Compare(c.source.clone())),
            FieldCondition::StringPattern(c) => {
                c.source.clone().map(Predicate::Compare)
            }
            FieldCondition::TextSearch(c) => c.source.clone().map(Predicate::Compare),
            FieldCondition::Spatial(_) | FieldCondition::Vector(_) => None,
        }
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, FieldCondition::Scalar(c) if c.is_equality())
    }

    pub fn is_range(&self) -> bool {
        matches!(self, FieldCondition::Scalar(c) if c.is_range())
    }

    pub fn is_membership(&self) -> bool {
        matches!(self, FieldCondition::Scalar(c) if c.is_membership())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_stability() {
        let cmp = FieldComparison::gt("age", 20i64);
        let a = FieldCondition::from_comparison(&cmp).unwrap();
        let b = FieldCondition::from_comparison(&cmp).unwrap();
        assert_eq!(a.identifier(), b.identifier());
    }

    #[test]
    fn test_identifier_distinguishes_same_field() {
        let a = FieldCondition::from_comparison(&FieldComparison::gt("age", 20i64)).unwrap();
        let b = FieldCondition::from_comparison(&FieldComparison::lt("age", 50i64)).unwrap();
        assert_ne!(a.identifier(), b.identifier());
    }

    #[test]
    fn test_equality_bounds() {
        let c = FieldCondition::from_comparison(&FieldComparison::eq("age", 30i64)).unwrap();
        let bounds = c.to_bounds().unwrap();
        assert_eq!(bounds.lower, Some(Value::Integer(30)));
        assert_eq!(bounds.upper, Some(Value::Integer(30)));
        assert!(bounds.lower_inclusive && bounds.upper_inclusive);
    }

    #[test]
    fn test_range_satisfaction() {
        let c = FieldCondition::from_comparison(&FieldComparison::gt("age", 20i64)).unwrap();
        assert!(c.satisfied_by(&Value::Integer(25)));
        assert!(!c.satisfied_by(&Value::Integer(20)));
        assert!(!c.satisfied_by(&Value::Integer(15)));
    }

    #[test]
    fn test_in_bounds_span_min_max() {
        let c = FieldCondition::from_comparison(&FieldComparison::in_list(
            "category",
            vec!["c".into(), "a".into(), "b".into()],
        ))
        .unwrap();
        let bounds = c.to_bounds().unwrap();
        assert_eq!(bounds.lower, Some(Value::Text("a".into())));
        assert_eq!(bounds.upper, Some(Value::Text("c".into())));
        assert!(c.satisfied_by(&Value::Text("b".into())));
        assert!(!c.satisfied_by(&Value::Text("d".into())));
    }

    #[test]
    fn test_empty_in_list_rejected() {
        let cmp = FieldComparison::in_list("category", vec![]);
        assert!(FieldCondition::from_comparison(&cmp).is_err());
    }

    #[test]
    fn test_prefix_pattern_bounds() {
        let c =
            FieldCondition::from_comparison(&FieldComparison::has_prefix("name", "al")).unwrap();
        let bounds = c.to_bounds().unwrap();
        assert_eq!(bounds.lower, Some(Value::Text("al".into())));
        assert!(bounds.lower_inclusive);
        assert!(!bounds.upper_inclusive);
        assert!(bounds.contains(&Value::Text("alice".into())));
        assert!(!bounds.contains(&Value::Text("amber".into())));
    }

    #[test]
    fn test_like_pattern() {
        let c = StringPatternCondition::new("name", PatternType::Like, "a%e", true).unwrap();
        assert!(c.satisfied_by(&Value::Text("alice".into())));
        assert!(c.satisfied_by(&Value::Text("ae".into())));
        assert!(!c.satisfied_by(&Value::Text("bob".into())));
    }

    #[test]
    fn test_like_underscore_and_case() {
        let c = StringPatternCondition::new("name", PatternType::Like, "A_c", false).unwrap();
        assert!(c.satisfied_by(&Value::Text("abc".into())));
        assert!(!c.satisfied_by(&Value::Text("abcd".into())));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        assert!(StringPatternCondition::new("f", PatternType::Regex, "(", true).is_err());
    }

    #[test]
    fn test_text_search_modes() {
        let any = FieldCondition::text_search(
            "body",
            vec!["rust".into(), "planner".into()],
            TextMatchMode::Any,
            None,
        );
        let all = FieldCondition::text_search(
            "body",
            vec!["rust".into(), "planner".into()],
            TextMatchMode::All,
            None,
        );
        let phrase = FieldCondition::text_search(
            "body",
            vec!["query".into(), "planner".into()],
            TextMatchMode::Phrase,
            None,
        );

        let text = Value::Text("a cost-based query planner in Rust".into());
        assert!(any.satisfied_by(&text));
        assert!(all.satisfied_by(&text));
        assert!(phrase.satisfied_by(&text));

        let other = Value::Text("storage engine".into());
        assert!(!any.satisfied_by(&other));
    }

    #[test]
    fn test_spatial_constraint_membership() {
        let constraint = SpatialConstraint::WithinBounds(BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        assert!(constraint.contains_point(&GeoPoint::new(5.0, 5.0)));
        assert!(!constraint.contains_point(&GeoPoint::new(20.0, 5.0)));

        let circle = SpatialConstraint::WithinDistance {
            center: GeoPoint::new(0.0, 0.0),
            radius_meters: 200_000.0,
        };
        assert!(circle.contains_point(&GeoPoint::new(1.0, 0.0)));
        assert!(!circle.contains_point(&GeoPoint::new(5.0, 0.0)));
    }

    #[test]
    fn test_null_checks() {
        let is_null =
            FieldCondition::from_comparison(&FieldComparison::is_null("email")).unwrap();
        assert!(is_null.satisfied_by(&Value::Null));
        assert!(!is_null.satisfied_by(&Value::Text("x".into())));
    }
}
