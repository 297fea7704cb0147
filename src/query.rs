//! Declarative queries and planning hints
//!
//! A `Query` names a record type and carries a predicate tree, optional
//! specialized constraints (text, spatial, vector) that have no predicate
//! form, sort descriptors, and limit/offset. Queries are built fluently and
//! are inert until handed to the planner.

use crate::condition::{FieldCondition, SpatialConstraint, TextMatchMode};
use crate::distance::DistanceMetric;
use crate::predicate::Predicate;
use crate::types::{BoundingBox, GeoPoint, SortDescriptor, SortDirection};
use std::collections::HashSet;

/// Plan families the optimizer may be told to skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanFamily {
    SingleIndex,
    Covering,
    Intersection,
    Union,
    SkipScan,
}

/// Optimizer hints
#[derive(Debug, Clone, Default)]
pub struct PlanningHints {
    /// Skip enumeration entirely and emit a table scan.
    pub force_table_scan: bool,
    /// Prefer this index when it produces any valid plan.
    pub preferred_index: Option<String>,
    /// Plan families to skip during enumeration.
    pub disabled_plans: HashSet<PlanFamily>,
    /// Override the intersection index cap.
    pub max_intersection_indexes: Option<usize>,
}

impl PlanningHints {
    pub fn force_table_scan() -> Self {
        Self {
            force_table_scan: true,
            ..Self::default()
        }
    }

    pub fn prefer_index(index: impl Into<String>) -> Self {
        Self {
            preferred_index: Some(index.into()),
            ..Self::default()
        }
    }

    pub fn disable(mut self, family: PlanFamily) -> Self {
        self.disabled_plans.insert(family);
        self
    }

    pub fn is_disabled(&self, family: PlanFamily) -> bool {
        self.disabled_plans.contains(&family)
    }
}

/// A declarative query over one record type.
#[derive(Debug, Clone)]
pub struct Query {
    pub type_name: String,
    pub predicate: Predicate,
    /// Text/spatial/vector constraints, which have no predicate leaf form.
    pub special_conditions: Vec<FieldCondition>,
    pub sort: Vec<SortDescriptor>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            predicate: Predicate::True,
            special_conditions: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Set the predicate. Calling twice conjoins.
    pub fn filter(mut self, predicate: impl Into<Predicate>) -> Self {
        let predicate = predicate.into();
        self.predicate = match self.predicate {
            Predicate::True => predicate,
            existing => Predicate::and(vec![existing, predicate]),
        };
        self
    }

    /// Full-text constraint on a text field.
    pub fn text_search(
        mut self,
        field: impl Into<String>,
        terms: Vec<String>,
        match_mode: TextMatchMode,
    ) -> Self {
        self.special_conditions
            .push(FieldCondition::text_search(field, terms, match_mode, None));
        self
    }

    /// Spatial constraint: within `radius_meters` of a center point.
    pub fn within_distance(
        mut self,
        field: impl Into<String>,
        center: GeoPoint,
        radius_meters: f64,
    ) -> Self {
        self.special_conditions.push(FieldCondition::spatial(
            field,
            SpatialConstraint::WithinDistance {
                center,
                radius_meters,
            },
        ));
        self
    }

    /// Spatial constraint: within a bounding box.
    pub fn within_bounds(mut self, field: impl Into<String>, bounds: BoundingBox) -> Self {
        self.special_conditions.push(FieldCondition::spatial(
            field,
            SpatialConstraint::WithinBounds(bounds),
        ));
        self
    }

    /// Spatial constraint: within a closed polygon.
    pub fn within_polygon(mut self, field: impl Into<String>, points: Vec<GeoPoint>) -> Self {
        self.special_conditions.push(FieldCondition::spatial(
            field,
            SpatialConstraint::WithinPolygon { points },
        ));
        self
    }

    /// Vector constraint: k nearest neighbors of a query vector.
    pub fn nearest_neighbors(
        mut self,
        field: impl Into<String>,
        query_vector: Vec<f32>,
        k: usize,
        metric: DistanceMetric,
    ) -> Self {
        self.special_conditions
            .push(FieldCondition::vector(field, query_vector, k, metric, None));
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortDescriptor {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}
