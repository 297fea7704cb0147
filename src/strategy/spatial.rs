//! Spatial index strategy
//!
//! Matches any spatial-constraint variant on the indexed field. Cost
//! approximates an R-tree traversal: interior and boundary nodes roughly
//! double the entry touches, then every candidate is fetched. Spatial
//! output carries no usable key order.

use super::{IndexPlanningStrategy, MatchResult};
use crate::catalog::{IndexDescriptor, IndexKind};
use crate::condition::FieldCondition;
use crate::config::PlannerConfig;
use crate::plan::{Operator, PlanCost, ScanBounds};
use crate::planner::analyzer::QueryAnalysis;
use crate::stats::StatisticsProvider;

/// Default fraction of rows inside a spatial constraint region.
const SPATIAL_SELECTIVITY: f64 = 0.1;

pub struct SpatialStrategy;

impl SpatialStrategy {
    fn find_match<'a>(
        index: &IndexDescriptor,
        analysis: &'a QueryAnalysis,
    ) -> Option<&'a FieldCondition> {
        let field = index.leading_key()?;
        analysis
            .conditions_on_field(field)
            .into_iter()
            .find(|c| matches!(c, FieldCondition::Spatial(_)))
    }
}

impl IndexPlanningStrategy for SpatialStrategy {
    fn kind(&self) -> IndexKind {
        IndexKind::Spatial
    }

    fn match_conditions(
        &self,
        index: &IndexDescriptor,
        analysis: &QueryAnalysis,
        stats: &dyn StatisticsProvider,
        _config: &PlannerConfig,
    ) -> Option<MatchResult> {
        let condition = Self::find_match(index, analysis)?;
        let row_count = stats.row_count(&analysis.type_name);
        let estimated_entries =
            ((row_count as f64 * SPATIAL_SELECTIVITY).ceil() as u64).max(1);

        Some(MatchResult {
            satisfied: vec![condition.clone()],
            partial: Vec::new(),
            satisfies_ordering: analysis.sort_requirements.is_empty(),
            reverse: false,
            scan_bounds: ScanBounds::default(),
            selectivity: SPATIAL_SELECTIVITY,
            estimated_entries,
            full_key_equality: false,
            equality_prefix: Vec::new(),
            in_expansion: None,
        })
    }

    fn create_operator(
        &self,
        index: &IndexDescriptor,
        result: &MatchResult,
        analysis: &QueryAnalysis,
        _config: &PlannerConfig,
    ) -> Operator {
        let condition =
            Self::find_match(index, analysis).expect("create_operator follows a match");
        let FieldCondition::Spatial(spatial) = condition else {
            unreachable!("spatial strategy matched a non-spatial condition");
        };
        Operator::SpatialScan {
            index: index.name.clone(),
            constraint: spatial.constraint.clone(),
            satisfied: result.satisfied_identifiers(),
            estimated_entries: result.estimated_entries,
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
            index_reads: 2.0 * entries,
            record_fetches: entries,
            post_filter_rows: 0.0,
            requires_sort: false,
            additional: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldType, RecordSchema};
    use crate::condition::SpatialConstraint;
    use crate::planner::analyzer::analyze;
    use crate::query::Query;
    use crate::stats::HeuristicStatistics;
    use crate::types::{BoundingBox, GeoPoint};

    fn schema() -> RecordSchema {
        RecordSchema::new(
            "place",
            vec![
                FieldDef::new("id", FieldType::Integer),
                FieldDef::new("location", FieldType::Geo),
            ],
        )
    }

    fn index() -> IndexDescriptor {
        IndexDescriptor::spatial("place_location", "location")
    }

    #[test]
    fn test_matches_all_constraint_variants() {
        let queries = vec![
            Query::for_type("place").within_distance(
                "location",
                GeoPoint::new(37.0, -122.0),
                500.0,
            ),
            Query::for_type("place")
                .within_bounds("location", BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
            Query::for_type("place").within_polygon(
                "location",
                vec![
                    GeoPoint::new(0.0, 0.0),
                    GeoPoint::new(1.0, 0.0),
                    GeoPoint::new(0.5, 1.0),
                ],
            ),
        ];
        for query in queries {
            let analysis = analyze(&query, &schema()).unwrap();
            let result = SpatialStrategy
                .match_conditions(
                    &index(),
                    &analysis,
                    &HeuristicStatistics,
                    &PlannerConfig::default(),
                )
                .unwrap();
            let op = SpatialStrategy.create_operator(
                &index(),
                &result,
                &analysis,
                &PlannerConfig::default(),
            );
            assert!(matches!(op, Operator::SpatialScan { .. }));
        }
    }

    #[test]
    fn test_rtree_cost_shape() {
        let query = Query::for_type("place").within_bounds(
            "location",
            BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        );
        let analysis = analyze(&query, &schema()).unwrap();
        let result = SpatialStrategy
            .match_conditions(
                &index(),
                &analysis,
                &HeuristicStatistics,
                &PlannerConfig::default(),
            )
            .unwrap();
        let cost = SpatialStrategy.estimate_cost(
            &index(),
            &result,
            &HeuristicStatistics,
            &analysis,
        );
        assert!((cost.index_reads - 2.0 * cost.record_fetches).abs() < 1e-9);
    }

    #[test]
    fn test_constraint_stored_on_operator() {
        let query = Query::for_type("place").within_distance(
            "location",
            GeoPoint::new(10.0, 20.0),
            1000.0,
        );
        let analysis = analyze(&query, &schema()).unwrap();
        let result = SpatialStrategy
            .match_conditions(
                &index(),
                &analysis,
                &HeuristicStatistics,
                &PlannerConfig::default(),
            )
            .unwrap();
        let op = SpatialStrategy.create_operator(
            &index(),
            &result,
            &analysis,
            &PlannerConfig::default(),
        );
        match op {
            Operator::SpatialScan { constraint, .. } => match constraint {
                SpatialConstraint::WithinDistance { radius_meters, .. } => {
                    assert_eq!(radius_meters, 1000.0);
                }
                other => panic!("unexpected constraint {other:?}"),
            },
            other => panic!("expected SpatialScan, got {other:?}"),
        }
    }
}
