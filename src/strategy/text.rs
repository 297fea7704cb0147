//! Full-text index strategy
//!
//! Matches text-search conditions, and `contains` string patterns, on the
//! indexed field. Inverted-index output carries no key order, so ordering is
//! never satisfied and result counts lean on a flat default selectivity.

use super::{IndexPlanningStrategy, MatchResult};
use crate::catalog::{IndexDescriptor, IndexKind};
use crate::condition::{FieldCondition, PatternType, TextMatchMode};
use crate::config::PlannerConfig;
use crate::plan::{Operator, PlanCost, ScanBounds};
use crate::planner::analyzer::QueryAnalysis;
use crate::stats::StatisticsProvider;

/// Default fraction of rows matching a text search.
const TEXT_SELECTIVITY: f64 = 0.05;

pub struct TextStrategy;

struct TextMatch {
    condition: FieldCondition,
    terms: Vec<String>,
    mode: TextMatchMode,
}

impl TextStrategy {
    fn find_match(index: &IndexDescriptor, analysis: &QueryAnalysis) -> Option<TextMatch> {
        let field = index.leading_key()?;
        for condition in analysis.conditions_on_field(field) {
            match condition {
                FieldCondition::TextSearch(text) => {
                    return Some(TextMatch {
                        condition: condition.clone(),
                        terms: text.terms.clone(),
                        mode: text.match_mode,
                    });
                }
                FieldCondition::StringPattern(pattern)
                    if pattern.pattern_type == PatternType::Contains =>
                {
                    return Some(TextMatch {
                        condition: condition.clone(),
                        terms: vec![pattern.pattern.clone()],
                        mode: TextMatchMode::All,
                    });
                }
                _ => {}
            }
        }
        None
    }
}

impl IndexPlanningStrategy for TextStrategy {
    fn kind(&self) -> IndexKind {
        IndexKind::FullText
    }

    fn match_conditions(
        &self,
        index: &IndexDescriptor,
        analysis: &QueryAnalysis,
        stats: &dyn StatisticsProvider,
        _config: &PlannerConfig,
    ) -> Option<MatchResult> {
        let matched = Self::find_match(index, analysis)?;
        let row_count = stats.row_count(&analysis.type_name);
        let estimated_entries =
            ((row_count as f64 * TEXT_SELECTIVITY).ceil() as u64).max(1);

        Some(MatchResult {
            satisfied: vec![matched.condition],
            partial: Vec::new(),
            satisfies_ordering: analysis.sort_requirements.is_empty(),
            reverse: false,
            scan_bounds: ScanBounds::default(),
            selectivity: TEXT_SELECTIVITY,
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
        let matched =
            Self::find_match(index, analysis).expect("create_operator follows a match");
        Operator::FullTextScan {
            index: index.name.clone(),
            terms: matched.terms,
            match_mode: matched.mode.name().to_string(),
            satisfied: result.satisfied_identifiers(),
            estimated_results: result.estimated_entries,
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
            index_reads: entries,
            record_fetches: entries,
            post_filter_rows: 0.0,
            requires_sort: false,
            additional: 0.0,
        }
    }
}
