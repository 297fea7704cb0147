//! Vector index strategy
//!
//! Matches vector-similarity conditions on the indexed field. A vector
//! search always yields exactly k candidates, already ranked by similarity,
//! so the result is treated as ordered and the cost follows the HNSW-style
//! traversal shape `log2(N) * ef_search` plus the k record fetches.

use super::{IndexPlanningStrategy, MatchResult};
use crate::catalog::{IndexDescriptor, IndexKind};
use crate::condition::FieldCondition;
use crate::config::PlannerConfig;
use crate::plan::{Operator, PlanCost, ScanBounds};
use crate::planner::analyzer::QueryAnalysis;
use crate::stats::StatisticsProvider;

/// Traversal width assumed when the query does not set one.
const DEFAULT_EF_SEARCH: usize = 64;

pub struct VectorStrategy;

impl VectorStrategy {
    fn find_match<'a>(
        index: &IndexDescriptor,
        analysis: &'a QueryAnalysis,
    ) -> Option<&'a FieldCondition> {
        let field = index.leading_key()?;
        analysis
            .conditions_on_field(field)
            .into_iter()
            .find(|c| matches!(c, FieldCondition::Vector(_)))
    }
}

impl IndexPlanningStrategy for VectorStrategy {
    fn kind(&self) -> IndexKind {
        IndexKind::Vector
    }

    fn match_conditions(
        &self,
        index: &IndexDescriptor,
        analysis: &QueryAnalysis,
        stats: &dyn StatisticsProvider,
        _config: &PlannerConfig,
    ) -> Option<MatchResult> {
        let condition = Self::find_match(index, analysis)?;
        let FieldCondition::Vector(vector) = condition else {
            return None;
        };
        let row_count = stats.row_count(&analysis.type_name).max(1);
        let selectivity = (vector.k as f64 / row_count as f64).min(1.0);

        Some(MatchResult {
            satisfied: vec![condition.clone()],
            partial: Vec::new(),
            // Output is ranked by similarity; an explicit field sort on top
            // still needs its own sort operator.
            satisfies_ordering: analysis.sort_requirements.is_empty(),
            reverse: false,
            scan_bounds: ScanBounds::default(),
            selectivity,
            estimated_entries: vector.k as u64,
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
        let FieldCondition::Vector(vector) = condition else {
            unreachable!("vector strategy matched a non-vector condition");
        };
        Operator::VectorSearch {
            index: index.name.clone(),
            k: vector.k,
            metric: vector.metric,
            ef_search: vector.ef_search,
            satisfied: result.satisfied_identifiers(),
        }
    }

    fn estimate_cost(
        &self,
        _index: &IndexDescriptor,
        result: &MatchResult,
        stats: &dyn StatisticsProvider,
        analysis: &QueryAnalysis,
    ) -> PlanCost {
        let row_count = stats.row_count(&analysis.type_name).max(2);
        let ef = result
            .satisfied
            .first()
            .and_then(|c| match c {
                FieldCondition::Vector(v) => v.ef_search,
                _ => None,
            })
            .unwrap_or(DEFAULT_EF_SEARCH);
        let traversal = (row_count as f64).log2() * ef as f64;
        PlanCost {
            index_reads: traversal,
            record_fetches: result.estimated_entries as f64,
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
    use crate::distance::DistanceMetric;
    use crate::planner::analyzer::analyze;
    use crate::query::Query;
    use crate::stats::{CollectedStatistics, HeuristicStatistics, TableStatistics};

    fn schema() -> RecordSchema {
        RecordSchema::new(
            "doc",
            vec![
                FieldDef::new("id", FieldType::Integer),
                FieldDef::new("embedding", FieldType::Vector(4)),
            ],
        )
    }

    fn index() -> IndexDescriptor {
        IndexDescriptor::vector("doc_embedding", "embedding")
    }

    fn knn_query(k: usize) -> Query {
        Query::for_type("doc").nearest_neighbors(
            "embedding",
            vec![0.1, 0.2, 0.3, 0.4],
            k,
            DistanceMetric::Cosine,
        )
    }

    #[test]
    fn test_matches_vector_condition() {
        let analysis = analyze(&knn_query(10), &schema()).unwrap();
        let result = VectorStrategy
            .match_conditions(
                &index(),
                &analysis,
                &HeuristicStatistics,
                &PlannerConfig::default(),
            )
            .unwrap();
        assert_eq!(result.estimated_entries, 10);
        assert!(result.satisfies_ordering);

        let op = VectorStrategy.create_operator(
            &index(),
            &result,
            &analysis,
            &PlannerConfig::default(),
        );
        match op {
            Operator::VectorSearch { k, metric, .. } => {
                assert_eq!(k, 10);
                assert_eq!(metric, DistanceMetric::Cosine);
            }
            other => panic!("expected VectorSearch, got {other:?}"),
        }
    }

    #[test]
    fn test_cost_scales_with_table_size() {
        let analysis = analyze(&knn_query(10), &schema()).unwrap();
        let small = CollectedStatistics::new();
        small.update_table_stats("doc", TableStatistics::new(1_000));
        let large = CollectedStatistics::new();
        large.update_table_stats("doc", TableStatistics::new(1_000_000));

        let result = VectorStrategy
            .match_conditions(&index(), &analysis, &small, &PlannerConfig::default())
            .unwrap();
        let cost_small =
            VectorStrategy.estimate_cost(&index(), &result, &small, &analysis);
        let cost_large =
            VectorStrategy.estimate_cost(&index(), &result, &large, &analysis);
        assert!(cost_large.index_reads > cost_small.index_reads);
        assert_eq!(cost_small.record_fetches, 10.0);
    }

    #[test]
    fn test_no_vector_condition_no_match() {
        let query = Query::for_type("doc");
        let analysis = analyze(&query, &schema()).unwrap();
        assert!(VectorStrategy
            .match_conditions(
                &index(),
                &analysis,
                &HeuristicStatistics,
                &PlannerConfig::default(),
            )
            .is_none());
    }
}
