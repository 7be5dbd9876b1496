use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sentinel_common::Labels;
use sentinel_ruler::engine::{EngineContext, GroupStatsStore};
use sentinel_ruler::metrics::EngineMetrics;
use sentinel_ruler::notifier;
use sentinel_ruler::query::{Evaluator, QueryBackend, QueryError, Sample};
use sentinel_ruler::recording::{Materializer, Series, SeriesWriter, UnconfiguredWriter, WriteError};
use sentinel_ruler::rules::{GroupDef, Rule, RuleSet};
use sentinel_ruler::scheduler::Scheduler;
use sentinel_ruler::storage::MemoryStore;

struct SlowBackend {
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl SlowBackend {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl QueryBackend for SlowBackend {
    async fn query(&self, _expr: &str, _at_ms: i64) -> Result<Vec<Sample>, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

fn scheduler(backend: Arc<SlowBackend>, metrics: &Arc<EngineMetrics>, max_concurrent: usize) -> Scheduler {
    let mut ctx = EngineContext::new(
        Evaluator::new(backend),
        Arc::new(Materializer::new(Arc::new(UnconfiguredWriter))),
        Arc::clone(metrics),
    );
    ctx.eval_timeout = Some(Duration::from_secs(5));
    let (sink, _dispatcher) = notifier::channel(16, Vec::new(), Arc::clone(metrics));
    Scheduler::new(ctx, GroupStatsStore::new(), sink, max_concurrent)
}

fn group(name: &str, interval: Duration) -> GroupDef {
    GroupDef::new(name, interval).with_rule(Rule::alerting("Heartbeat", "heartbeat > 0"))
}

#[tokio::test]
async fn groups_tick_on_their_interval() {
    let backend = SlowBackend::new(Duration::ZERO);
    let metrics = EngineMetrics::new();
    let sched = scheduler(Arc::clone(&backend), &metrics, 4);

    sched
        .reload(RuleSet::new(vec![group("fast", Duration::from_millis(50))]))
        .await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    sched.shutdown().await;

    let calls = backend.calls.load(Ordering::SeqCst);
    assert!(calls >= 3, "only {calls} evaluations");
    let stats = sched.stats().get("fast").unwrap();
    assert!(stats.last_evaluation_ms.is_some());
    assert_eq!(stats.last_evaluation_ms.unwrap() % 50, 0);
}

#[tokio::test]
async fn overrun_skips_ticks_without_overlap() {
    let backend = SlowBackend::new(Duration::from_millis(180));
    let metrics = EngineMetrics::new();
    let sched = scheduler(Arc::clone(&backend), &metrics, 4);

    sched
        .reload(RuleSet::new(vec![group("slow", Duration::from_millis(50))]))
        .await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    sched.shutdown().await;

    assert_eq!(backend.max_active.load(Ordering::SeqCst), 1);
    assert!(metrics.missed_evaluations_val() >= 2);
    assert!(sched.stats().get("slow").unwrap().missed >= 2);
}

#[tokio::test]
async fn shutdown_cancels_in_flight_ticks() {
    let backend = SlowBackend::new(Duration::from_secs(30));
    let metrics = EngineMetrics::new();
    let sched = scheduler(Arc::clone(&backend), &metrics, 4);

    sched
        .reload(RuleSet::new(vec![group("stuck", Duration::from_millis(50))]))
        .await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(backend.active.load(Ordering::SeqCst), 1);

    let started = Instant::now();
    sched.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn concurrency_is_bounded() {
    let backend = SlowBackend::new(Duration::from_millis(120));
    let metrics = EngineMetrics::new();
    let sched = scheduler(Arc::clone(&backend), &metrics, 1);

    let groups = (0..3)
        .map(|i| group(&format!("g{i}"), Duration::from_millis(100)))
        .collect();
    sched.reload(RuleSet::new(groups)).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    sched.shutdown().await;

    assert!(backend.calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(backend.max_active.load(Ordering::SeqCst), 1);
}

struct StuckWriter;

#[async_trait]
impl SeriesWriter for StuckWriter {
    async fn write(&self, _series: &[Series]) -> Result<(), WriteError> {
        std::future::pending().await
    }
}

// Every tick blocks in the recording write for an hour.
fn stuck_scheduler(metrics: &Arc<EngineMetrics>) -> Scheduler {
    let store = MemoryStore::new();
    store.set_result("sum(up)", vec![Sample::new(Labels::new(), 1.0)]);
    let mut ctx = EngineContext::new(
        Evaluator::new(Arc::new(store)),
        Arc::new(Materializer::new(Arc::new(StuckWriter))),
        Arc::clone(metrics),
    );
    ctx.eval_timeout = Some(Duration::from_secs(3600));
    let (sink, _dispatcher) = notifier::channel(16, Vec::new(), Arc::clone(metrics));
    Scheduler::new(ctx, GroupStatsStore::new(), sink, 4)
}

fn recording_group(interval: Duration) -> GroupDef {
    GroupDef::new("writer", interval).with_rule(Rule::recording("job:up:sum", "sum(up)"))
}

#[tokio::test]
async fn reload_of_changed_group_cancels_stuck_tick() {
    let metrics = EngineMetrics::new();
    let sched = stuck_scheduler(&metrics);

    sched
        .reload(RuleSet::new(vec![recording_group(Duration::from_millis(50))]))
        .await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(metrics.missed_evaluations_val() >= 1);

    let changed = recording_group(Duration::from_millis(100)).with_rule(Rule::alerting("Up", "sum(up)"));
    let summary = tokio::time::timeout(Duration::from_secs(3), sched.reload(RuleSet::new(vec![changed])))
        .await
        .expect("reload waited on the stuck tick");
    assert_eq!(summary.changed, 1);

    tokio::time::timeout(Duration::from_secs(3), sched.shutdown())
        .await
        .expect("shutdown waited on the stuck tick");
}

#[tokio::test]
async fn removing_group_cancels_stuck_tick() {
    let metrics = EngineMetrics::new();
    let sched = stuck_scheduler(&metrics);

    sched
        .reload(RuleSet::new(vec![recording_group(Duration::from_millis(50))]))
        .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let summary = tokio::time::timeout(Duration::from_secs(3), sched.reload(RuleSet::default()))
        .await
        .expect("reload waited on the stuck tick");
    assert_eq!(summary.removed, 1);
    assert!(sched.groups().is_empty());
    sched.shutdown().await;
}

#[tokio::test]
async fn status_is_readable_while_tick_is_stuck() {
    let metrics = EngineMetrics::new();
    let sched = stuck_scheduler(&metrics);

    sched
        .reload(RuleSet::new(vec![recording_group(Duration::from_millis(50))]))
        .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let groups = sched.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "writer");
    assert_eq!(groups[0].rules.len(), 1);
    assert!(groups[0].last_evaluation_ms.is_none());
    assert!(sched.active_alerts().is_empty());
    sched.shutdown().await;
}
