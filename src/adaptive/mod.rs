//! Runtime statistics and adaptive re-planning
//!
//! The tracker records actual execution results against their estimates and
//! periodically feeds aggregate feedback into the collected statistics. The
//! adaptive optimizer watches per-plan estimation error and re-plans when
//! drift crosses the configured threshold, versioning plans and logging
//! every adaptation. A failed re-plan never affects in-flight executions;
//! the prior plan stays in service.

use crate::config::AdaptiveConfig;
use crate::error::Result;
use crate::plan::Plan;
use crate::planner::QueryPlanner;
use crate::prepared::{fingerprint, PlanCache, QueryFingerprint};
use crate::query::Query;
use crate::stats::{CollectedStatistics, StatisticsProvider, TableStatistics};
use crate::types::Timestamp;
use dashmap::DashMap;
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

static NEXT_ADAPTIVE_ID: AtomicU64 = AtomicU64::new(1);

/// One recorded plan execution.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub plan_id: u64,
    pub type_name: String,
    pub estimated_rows: f64,
    pub actual_rows: u64,
    pub execution_time: Duration,
    pub recorded_at: Timestamp,
}

impl ExecutionRecord {
    /// Relative estimation error, `|est - act| / max(1, act)`.
    pub fn relative_error(&self) -> f64 {
        let actual = self.actual_rows as f64;
        (self.estimated_rows - actual).abs() / actual.max(1.0)
    }
}

/// Estimation accuracy over the recorded history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyReport {
    pub average_error: f64,
    pub median_error: f64,
    pub samples: usize,
}

struct TrackerInner {
    history: VecDeque<ExecutionRecord>,
    since_push: usize,
}

/// Bounded execution history with periodic statistics feedback.
pub struct RuntimeStatisticsTracker {
    inner: Mutex<TrackerInner>,
    collected: Arc<CollectedStatistics>,
    config: AdaptiveConfig,
}

impl RuntimeStatisticsTracker {
    pub fn new(collected: Arc<CollectedStatistics>, config: AdaptiveConfig) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                history: VecDeque::with_capacity(config.history_limit.min(1024)),
                since_push: 0,
            }),
            collected,
            config,
        }
    }

    /// Record one execution. Every `update_threshold` records, per-type
    /// aggregates are pushed into the collected statistics provider.
    pub fn record(&self, plan: &Plan, actual_rows: u64, execution_time: Duration) {
        let record = ExecutionRecord {
            plan_id: plan.id,
            type_name: plan.type_name.clone(),
            estimated_rows: plan.estimated_rows,
            actual_rows,
            execution_time,
            recorded_at: Timestamp::now(),
        };

        let mut inner = self.inner.lock();
        inner.history.push_back(record);
        while inner.history.len() > self.config.history_limit {
            inner.history.pop_front();
        }
        inner.since_push += 1;
        if inner.since_push >= self.config.update_threshold {
            inner.since_push = 0;
            self.push_aggregates(&inner.history);
        }
    }

    /// Observed row counts are a lower bound on table cardinality; push the
    /// per-type maximum so heuristic defaults stop underestimating.
    fn push_aggregates(&self, history: &VecDeque<ExecutionRecord>) {
        let mut per_type: ahash::AHashMap<&str, u64> = ahash::AHashMap::new();
        for record in history {
            let entry = per_type.entry(record.type_name.as_str()).or_insert(0);
            *entry = (*entry).max(record.actual_rows);
        }
        for (type_name, observed_max) in per_type {
            if observed_max > self.collected.row_count(type_name) {
                info!("runtime feedback raised row count of '{type_name}' to {observed_max}");
                self.collected
                    .update_table_stats(type_name, TableStatistics::new(observed_max));
            }
        }
    }

    /// Average and median relative error over the history.
    pub fn analyze_estimation_accuracy(&self) -> AccuracyReport {
        let inner = self.inner.lock();
        let mut errors: Vec<f64> = inner
            .history
            .iter()
            .map(ExecutionRecord::relative_error)
            .collect();
        if errors.is_empty() {
            return AccuracyReport {
                average_error: 0.0,
                median_error: 0.0,
                samples: 0,
            };
        }
        errors.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let average = errors.iter().sum::<f64>() / errors.len() as f64;
        let median = if errors.len() % 2 == 1 {
            errors[errors.len() / 2]
        } else {
            (errors[errors.len() / 2 - 1] + errors[errors.len() / 2]) / 2.0
        };
        AccuracyReport {
            average_error: average,
            median_error: median,
            samples: errors.len(),
        }
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }
}

/// Why an adaptation event was logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptationTrigger {
    /// Estimation drift crossed the threshold and a re-plan succeeded.
    Drift,
    /// A re-plan was attempted and failed; the prior plan stays active.
    ReplanFailed,
}

/// One entry in the adaptation log.
#[derive(Debug, Clone)]
pub struct AdaptationEvent {
    pub plan_id: u64,
    pub old_version: u32,
    pub new_version: u32,
    pub old_cost: f64,
    pub new_cost: Option<f64>,
    pub trigger: AdaptationTrigger,
    pub average_error: f64,
    pub recorded_at: Timestamp,
}

/// A versioned plan handle returned by the adaptive optimizer.
#[derive(Debug, Clone)]
pub struct AdaptivePlan {
    pub id: u64,
    pub version: u32,
    pub plan: Arc<Plan>,
}

struct PlanState {
    query: Query,
    fingerprint: QueryFingerprint,
    plan: Arc<Plan>,
    version: u32,
    /// Ring buffer of recent relative errors.
    errors: VecDeque<f64>,
    last_replan: Option<Instant>,
}

/// Planner wrapper that re-plans when observed drift exceeds the threshold.
pub struct AdaptiveOptimizer {
    planner: Arc<QueryPlanner>,
    tracker: Arc<RuntimeStatisticsTracker>,
    cache: Option<Arc<PlanCache>>,
    config: AdaptiveConfig,
    plans: DashMap<u64, PlanState>,
    events: Mutex<VecDeque<AdaptationEvent>>,
}

impl AdaptiveOptimizer {
    pub fn new(planner: Arc<QueryPlanner>, tracker: Arc<RuntimeStatisticsTracker>) -> Self {
        let config = planner.config().adaptive;
        Self {
            planner,
            tracker,
            cache: None,
            config,
            plans: DashMap::new(),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Evict a plan-cache entry whenever a re-plan supersedes a plan.
    pub fn with_plan_cache(mut self, cache: Arc<PlanCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Plan a query under adaptive management.
    pub fn plan(&self, query: &Query) -> Result<AdaptivePlan> {
        let plan = Arc::new(self.planner.plan(query)?);
        let id = NEXT_ADAPTIVE_ID.fetch_add(1, AtomicOrdering::Relaxed);
        self.plans.insert(
            id,
            PlanState {
                query: query.clone(),
                fingerprint: fingerprint(query),
                plan: Arc::clone(&plan),
                version: 1,
                errors: VecDeque::with_capacity(self.config.error_window),
                last_replan: None,
            },
        );
        Ok(AdaptivePlan {
            id,
            version: 1,
            plan,
        })
    }

    /// Record one execution of an adaptive plan. Returns the superseding
    /// plan when drift triggered a successful re-plan.
    pub fn record_execution(
        &self,
        id: u64,
        actual_rows: u64,
        execution_time: Duration,
    ) -> Result<Option<AdaptivePlan>> {
        let Some(mut state) = self.plans.get_mut(&id) else {
            return Ok(None);
        };

        let actual = actual_rows as f64;
        let error = (state.plan.estimated_rows - actual).abs() / actual.max(1.0);
        state.errors.push_back(error);
        while state.errors.len() > self.config.error_window {
            state.errors.pop_front();
        }
        self.tracker.record(&state.plan, actual_rows, execution_time);

        if state.errors.len() < self.config.min_samples {
            return Ok(None);
        }
        let average_error =
            state.errors.iter().sum::<f64>() / state.errors.len() as f64;
        if average_error <= self.config.drift_threshold {
            return Ok(None);
        }
        if let Some(last) = state.last_replan {
            if last.elapsed() < self.config.replan_cooldown {
                return Ok(None);
            }
        }

        match self.planner.plan(&state.query) {
            Ok(new_plan) => {
                let new_plan = Arc::new(new_plan);
                let old_version = state.version;
                let old_cost = state.plan.total_cost;
                state.version += 1;
                state.plan = Arc::clone(&new_plan);
                // Fresh baseline for the new version.
                state.errors.clear();
                state.last_replan = Some(Instant::now());

                if let Some(cache) = &self.cache {
                    cache.remove(&state.fingerprint);
                }
                self.log_event(AdaptationEvent {
                    plan_id: id,
                    old_version,
                    new_version: state.version,
                    old_cost,
                    new_cost: Some(new_plan.total_cost),
                    trigger: AdaptationTrigger::Drift,
                    average_error,
                    recorded_at: Timestamp::now(),
                });
                info!(
                    "adaptive re-plan of #{id}: v{old_version} -> v{} (avg error {average_error:.2})",
                    state.version
                );
                Ok(Some(AdaptivePlan {
                    id,
                    version: state.version,
                    plan: new_plan,
                }))
            }
            Err(e) => {
                // The prior plan continues in use.
                warn!("adaptive re-plan of #{id} failed: {e}");
                state.last_replan = Some(Instant::now());
                self.log_event(AdaptationEvent {
                    plan_id: id,
                    old_version: state.version,
                    new_version: state.version,
                    old_cost: state.plan.total_cost,
                    new_cost: None,
                    trigger: AdaptationTrigger::ReplanFailed,
                    average_error,
                    recorded_at: Timestamp::now(),
                });
                Ok(None)
            }
        }
    }

    /// Current plan handle, if still managed.
    pub fn current_plan(&self, id: u64) -> Option<AdaptivePlan> {
        self.plans.get(&id).map(|state| AdaptivePlan {
            id,
            version: state.version,
            plan: Arc::clone(&state.plan),
        })
    }

    /// Stop managing a plan.
    pub fn release(&self, id: u64) {
        self.plans.remove(&id);
    }

    /// Snapshot of the adaptation log, oldest first.
    pub fn adaptation_log(&self) -> Vec<AdaptationEvent> {
        self.events.lock().iter().cloned().collect()
    }

    fn log_event(&self, event: AdaptationEvent) {
        let mut events = self.events.lock();
        events.push_back(event);
        while events.len() > self.config.event_log_limit {
            events.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldType, IndexDescriptor, RecordCatalog, RecordSchema};
    use crate::predicate::{FieldComparison, Predicate};

    fn setup() -> (Arc<CollectedStatistics>, Arc<QueryPlanner>) {
        let catalog = Arc::new(RecordCatalog::new());
        catalog
            .register_type(
                RecordSchema::new(
                    "user",
                    vec![
                        FieldDef::new("id", FieldType::Integer),
                        FieldDef::new("region", FieldType::Text),
                    ],
                )
                .with_index(IndexDescriptor::scalar("user_region", vec!["region".into()])),
            )
            .unwrap();
        let collected = Arc::new(CollectedStatistics::new());
        let planner = Arc::new(QueryPlanner::new(
            catalog,
            Arc::clone(&collected) as Arc<dyn crate::stats::StatisticsProvider>,
        ));
        (collected, planner)
    }

    fn fast_config() -> AdaptiveConfig {
        AdaptiveConfig {
            drift_threshold: 0.5,
            min_samples: 3,
            replan_cooldown: Duration::from_millis(0),
            history_limit: 100,
            update_threshold: 10,
            error_window: 10,
            event_log_limit: 16,
        }
    }

    fn query() -> Query {
        Query::for_type("user")
            .filter(Predicate::cmp(FieldComparison::eq("region", "US")))
    }

    #[test]
    fn test_tracker_history_bounded() {
        let (collected, planner) = setup();
        let mut config = fast_config();
        config.history_limit = 5;
        let tracker = RuntimeStatisticsTracker::new(collected, config);
        let plan = planner.plan(&query()).unwrap();
        for i in 0..20 {
            tracker.record(&plan, i, Duration::from_millis(1));
        }
        assert_eq!(tracker.history_len(), 5);
    }

    #[test]
    fn test_accuracy_report() {
        let (collected, planner) = setup();
        let tracker = RuntimeStatisticsTracker::new(collected, fast_config());
        let plan = planner.plan(&query()).unwrap();

        // Perfect estimates give zero error.
        tracker.record(&plan, plan.estimated_rows as u64, Duration::from_millis(1));
        let report = tracker.analyze_estimation_accuracy();
        assert_eq!(report.samples, 1);
        assert!(report.average_error < 0.01);
    }

    #[test]
    fn test_feedback_raises_row_count() {
        let (collected, planner) = setup();
        let mut config = fast_config();
        config.update_threshold = 3;
        let tracker = RuntimeStatisticsTracker::new(Arc::clone(&collected), config);
        let plan = planner.plan(&query()).unwrap();

        for _ in 0..3 {
            tracker.record(&plan, 50_000, Duration::from_millis(1));
        }
        assert_eq!(collected.row_count("user"), 50_000);
    }

    #[test]
    fn test_drift_triggers_replan() {
        let (_, planner) = setup();
        let collected = Arc::new(CollectedStatistics::new());
        let tracker = Arc::new(RuntimeStatisticsTracker::new(collected, fast_config()));
        let optimizer = AdaptiveOptimizer::new(Arc::clone(&planner), tracker);
        // Narrow config for the test.
        let optimizer = AdaptiveOptimizer {
            config: fast_config(),
            ..optimizer
        };

        let adaptive = optimizer.plan(&query()).unwrap();
        assert_eq!(adaptive.version, 1);

        // Wildly wrong estimates: actual rows dwarf the estimate.
        let mut superseded = None;
        for _ in 0..5 {
            if let Some(new_plan) = optimizer
                .record_execution(adaptive.id, 1_000_000, Duration::from_millis(5))
                .unwrap()
            {
                superseded = Some(new_plan);
                break;
            }
        }
        let new_plan = superseded.expect("drift should trigger a re-plan");
        assert_eq!(new_plan.version, 2);
        assert_eq!(optimizer.current_plan(adaptive.id).unwrap().version, 2);

        let log = optimizer.adaptation_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].trigger, AdaptationTrigger::Drift);
        assert!(log[0].new_cost.is_some());
    }

    #[test]
    fn test_accurate_plans_not_replanned() {
        let (_, planner) = setup();
        let collected = Arc::new(CollectedStatistics::new());
        let tracker = Arc::new(RuntimeStatisticsTracker::new(collected, fast_config()));
        let optimizer = AdaptiveOptimizer {
            config: fast_config(),
            ..AdaptiveOptimizer::new(Arc::clone(&planner), tracker)
        };

        let adaptive = optimizer.plan(&query()).unwrap();
        let estimate = adaptive.plan.estimated_rows as u64;
        for _ in 0..10 {
            let outcome = optimizer
                .record_execution(adaptive.id, estimate, Duration::from_millis(1))
                .unwrap();
            assert!(outcome.is_none());
        }
        assert!(optimizer.adaptation_log().is_empty());
    }

    #[test]
    fn test_cooldown_spaces_replans() {
        let (_, planner) = setup();
        let collected = Arc::new(CollectedStatistics::new());
        let tracker = Arc::new(RuntimeStatisticsTracker::new(collected, fast_config()));
        let mut config = fast_config();
        config.replan_cooldown = Duration::from_secs(3600);
        let optimizer = AdaptiveOptimizer {
            config,
            ..AdaptiveOptimizer::new(Arc::clone(&planner), tracker)
        };

        let adaptive = optimizer.plan(&query()).unwrap();
        let mut replans = 0;
        for _ in 0..50 {
            if optimizer
                .record_execution(adaptive.id, 1_000_000, Duration::from_millis(1))
                .unwrap()
                .is_some()
            {
                replans += 1;
            }
        }
        assert_eq!(replans, 1, "cooldown must prevent repeated re-plans");
    }

    #[test]
    fn test_replan_evicts_cache_entry() {
        let (_, planner) = setup();
        let prepared = crate::prepared::PreparedQueries::new(Arc::clone(&planner));
        let _ = prepared.prepare(&query()).unwrap();
        assert_eq!(prepared.cache().len(), 1);

        let collected = Arc::new(CollectedStatistics::new());
        let tracker = Arc::new(RuntimeStatisticsTracker::new(collected, fast_config()));
        let optimizer = AdaptiveOptimizer {
            config: fast_config(),
            ..AdaptiveOptimizer::new(Arc::clone(&planner), tracker)
                .with_plan_cache(Arc::clone(prepared.cache()))
        };

        let adaptive = optimizer.plan(&query()).unwrap();
        for _ in 0..5 {
            let _ = optimizer.record_execution(adaptive.id, 1_000_000, Duration::from_millis(1));
        }
        assert_eq!(prepared.cache().len(), 0, "re-plan must evict the entry");
    }

    #[test]
    fn test_release() {
        let (_, planner) = setup();
        let collected = Arc::new(CollectedStatistics::new());
        let tracker = Arc::new(RuntimeStatisticsTracker::new(collected, fast_config()));
        let optimizer = AdaptiveOptimizer::new(planner, tracker);
        let adaptive = optimizer.plan(&query()).unwrap();
        optimizer.release(adaptive.id);
        assert!(optimizer.current_plan(adaptive.id).is_none());
        assert!(optimizer
            .record_execution(adaptive.id, 10, Duration::from_millis(1))
            .unwrap()
            .is_none());
    }
}
