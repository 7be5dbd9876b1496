use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sentinel_common::Labels;

use super::EngineContext;
use crate::alert::{bind_samples, AlertContext, AlertEvent, AlertTable};
use crate::error::EvalError;
use crate::rules::{GroupDef, Rule, RuleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleHealth {
    Unknown,
    Ok,
    Err,
}

#[derive(Debug)]
pub struct RuleRuntime {
    pub rule: Arc<Rule>,
    pub alerts: AlertTable,
    pub health: RuleHealth,
    pub last_error: Option<String>,
    pub last_evaluation_ms: Option<i64>,
    pub last_duration: Duration,
}

impl RuleRuntime {
    pub fn new(rule: Arc<Rule>) -> Self {
        Self {
            rule,
            alerts: AlertTable::new(),
            health: RuleHealth::Unknown,
            last_error: None,
            last_evaluation_ms: None,
            last_duration: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub evaluated_at_ms: i64,
    pub events: Vec<AlertEvent>,
    pub failures: usize,
    pub samples_written: usize,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct GroupRuntime {
    def: GroupDef,
    rules: Vec<RuleRuntime>,
    last_evaluation_ms: Option<i64>,
    last_duration: Duration,
}

impl GroupRuntime {
    pub fn new(def: GroupDef) -> Self {
        let rules = def.rules.iter().cloned().map(RuleRuntime::new).collect();
        Self {
            def,
            rules,
            last_evaluation_ms: None,
            last_duration: Duration::ZERO,
        }
    }

    pub fn with_previous(def: GroupDef, previous: Vec<RuleRuntime>) -> (Self, Vec<RuleRuntime>) {
        let mut previous: Vec<Option<RuleRuntime>> = previous.into_iter().map(Some).collect();

        let rules = def
            .rules
            .iter()
            .map(|rule| {
                let carried = previous
                    .iter_mut()
                    .find(|p| p.as_ref().is_some_and(|p| *p.rule == **rule))
                    .and_then(Option::take);
                match carried {
                    Some(mut rr) => {
                        rr.rule = Arc::clone(rule);
                        rr
                    }
                    None => RuleRuntime::new(Arc::clone(rule)),
                }
            })
            .collect();

        let leftovers = previous.into_iter().flatten().collect();
        (
            Self {
                def,
                rules,
                last_evaluation_ms: None,
                last_duration: Duration::ZERO,
            },
            leftovers,
        )
    }

    pub fn def(&self) -> &GroupDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn rules(&self) -> &[RuleRuntime] {
        &self.rules
    }

    pub fn last_evaluation_ms(&self) -> Option<i64> {
        self.last_evaluation_ms
    }

    pub fn last_duration(&self) -> Duration {
        self.last_duration
    }

    pub fn take_rules(&mut self) -> Vec<RuleRuntime> {
        std::mem::take(&mut self.rules)
    }

    /// Evaluates every rule in declaration order at `ts_ms`. Recording
    /// output is written before the next rule runs. A failing rule is
    /// recorded and skipped; it never stops the rest of the group.
    pub async fn evaluate(&mut self, ts_ms: i64, ctx: &EngineContext) -> TickReport {
        let started = Instant::now();
        let budget = ctx.budget(self.def.interval);
        let group = self.def.name.as_str();
        let mut report = TickReport {
            evaluated_at_ms: ts_ms,
            ..TickReport::default()
        };

        for rr in &mut self.rules {
            let rule_started = Instant::now();
            ctx.metrics.inc_evaluations();

            match evaluate_rule(group, rr, ts_ms, budget, ctx).await {
                Ok((events, written)) => {
                    rr.health = RuleHealth::Ok;
                    rr.last_error = None;
                    report.events.extend(events);
                    report.samples_written += written;
                }
                Err(e) => {
                    ctx.metrics.inc_evaluation_failures();
                    if e.is_timeout() {
                        ctx.metrics.inc_query_timeouts();
                    }
                    if e.is_write() {
                        ctx.metrics.inc_write_failures();
                    }
                    tracing::warn!(group, rule = rr.rule.name(), error = %e, "rule evaluation failed");
                    rr.health = RuleHealth::Err;
                    rr.last_error = Some(e.to_string());
                    report.failures += 1;
                }
            }

            rr.last_evaluation_ms = Some(ts_ms);
            rr.last_duration = rule_started.elapsed();
        }

        report.duration = started.elapsed();
        self.last_evaluation_ms = Some(ts_ms);
        self.last_duration = report.duration;

        ctx.metrics.record_evaluation_latency(started);
        ctx.metrics.add_alert_transitions(report.events.len() as u64);
        tracing::debug!(
            group,
            rules = self.rules.len(),
            failures = report.failures,
            transitions = report.events.len(),
            duration_ms = report.duration.as_millis() as u64,
            "group evaluated"
        );

        report
    }

    pub fn resolve_all(&mut self, now_ms: i64, external_labels: &Labels) -> Vec<AlertEvent> {
        let rules = self.take_rules();
        resolve_rules(&self.def.name, rules, now_ms, external_labels)
    }
}

pub fn resolve_rules(
    group: &str,
    rules: Vec<RuleRuntime>,
    now_ms: i64,
    external_labels: &Labels,
) -> Vec<AlertEvent> {
    let mut events = Vec::new();
    for mut rr in rules {
        let ctx = AlertContext {
            group,
            rule: &rr.rule,
            external_labels,
        };
        events.extend(rr.alerts.resolve_all(&ctx, now_ms));
    }
    events
}

async fn evaluate_rule(
    group: &str,
    rr: &mut RuleRuntime,
    ts_ms: i64,
    budget: Duration,
    ctx: &EngineContext,
) -> Result<(Vec<AlertEvent>, usize), EvalError> {
    let samples = ctx.evaluator.evaluate(&rr.rule.expr, ts_ms, budget).await?;

    match &rr.rule.kind {
        RuleKind::Recording { metric } => {
            let written = ctx
                .materializer
                .materialize(metric, &samples, &rr.rule.labels, ts_ms, budget)
                .await?;
            ctx.metrics.add_samples_written(written as u64);
            Ok((Vec::new(), written))
        }
        RuleKind::Alerting { .. } => {
            let bound = bind_samples(&rr.rule, &samples)?;
            let actx = AlertContext {
                group,
                rule: &rr.rule,
                external_labels: &ctx.external_labels,
            };
            let events = rr.alerts.apply(&actx, ts_ms, bound);

            let mut written = 0;
            if ctx.write_alert_series {
                let series = rr.alerts.alert_series(ts_ms);
                match ctx.materializer.write(&series, budget).await {
                    Ok(n) => {
                        written = n;
                        ctx.metrics.add_samples_written(n as u64);
                    }
                    Err(e) => {
                        ctx.metrics.inc_write_failures();
                        tracing::warn!(group, rule = rr.rule.name(), error = %e, "writing ALERTS series failed");
                    }
                }
            }
            Ok((events, written))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertStatus;
    use crate::metrics::EngineMetrics;
    use crate::query::{Evaluator, Sample};
    use crate::recording::Materializer;
    use crate::storage::MemoryStore;

    const MIN: i64 = 60_000;

    fn ctx(store: &MemoryStore) -> EngineContext {
        EngineContext::new(
            Evaluator::new(Arc::new(store.clone())),
            Arc::new(Materializer::new(Arc::new(store.clone()))),
            EngineMetrics::new(),
        )
    }

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        Labels::from_pairs(pairs.iter().copied())
    }

    #[tokio::test]
    async fn recording_output_is_visible_to_later_rule_in_same_tick() {
        let store = MemoryStore::new();
        store.ingest(labels(&[("__name__", "latency"), ("service", "x")]), MIN, 0.6);

        let def = GroupDef::new("g", Duration::from_secs(60))
            .with_rule(Rule::recording("service:latency:last", "latency"))
            .with_rule(Rule::alerting("Recorded", "service:latency:last"));
        let mut rt = GroupRuntime::new(def);

        let report = rt.evaluate(MIN, &ctx(&store)).await;
        assert_eq!(report.failures, 0);
        assert_eq!(report.samples_written, 1);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].status, AlertStatus::Firing);
        assert_eq!(report.events[0].labels.get("service"), Some("x"));
    }

    #[tokio::test]
    async fn failing_rule_does_not_stop_the_group() {
        let store = MemoryStore::new();
        store.set_result("first", vec![Sample::new(labels(&[("n", "1")]), 1.0)]);
        store.set_result("third", vec![Sample::new(labels(&[("n", "3")]), 3.0)]);

        let def = GroupDef::new("g", Duration::from_secs(60))
            .with_rule(Rule::alerting("First", "first"))
            .with_rule(Rule::alerting("Broken", "rate(x[5m]"))
            .with_rule(Rule::alerting("Third", "third"));
        let mut rt = GroupRuntime::new(def);
        let ctx = ctx(&store);

        let report = rt.evaluate(MIN, &ctx).await;
        assert_eq!(report.failures, 1);
        assert_eq!(report.events.len(), 2);

        let rules = rt.rules();
        assert_eq!(rules[0].health, RuleHealth::Ok);
        assert_eq!(rules[1].health, RuleHealth::Err);
        assert!(rules[1].last_error.as_deref().unwrap().contains("rejected"));
        assert_eq!(rules[2].health, RuleHealth::Ok);
        assert_eq!(rules[2].alerts.len(), 1);
        assert_eq!(ctx.metrics.evaluation_failures_val(), 1);
        assert_eq!(rt.last_evaluation_ms(), Some(MIN));
    }

    #[tokio::test]
    async fn failed_tick_leaves_alert_state_untouched() {
        let store = MemoryStore::new();
        store.set_result("up == 0", vec![Sample::new(labels(&[("job", "a")]), 0.0)]);

        let def = GroupDef::new("g", Duration::from_secs(60)).with_rule(Rule::alerting("Down", "up == 0"));
        let mut rt = GroupRuntime::new(def);
        let ctx = ctx(&store);
        rt.evaluate(MIN, &ctx).await;

        store.clear_result("up == 0");
        let report = rt.evaluate(2 * MIN, &ctx).await;
        assert_eq!(report.failures, 1);
        assert!(report.events.is_empty());
        let inst = rt.rules()[0].alerts.instances().next().unwrap();
        assert!(inst.state.is_firing());
    }

    #[tokio::test]
    async fn write_failure_is_counted() {
        let store = MemoryStore::new();
        store.set_result("sum(up)", vec![Sample::new(Labels::new(), 1.0)]);
        let mut ctx = ctx(&store);
        ctx.materializer = Arc::new(Materializer::new(Arc::new(crate::recording::UnconfiguredWriter)));

        let def = GroupDef::new("g", Duration::from_secs(60)).with_rule(Rule::recording("job:up:sum", "sum(up)"));
        let mut rt = GroupRuntime::new(def);
        let report = rt.evaluate(MIN, &ctx).await;

        assert_eq!(report.failures, 1);
        assert_eq!(ctx.metrics.write_failures_val(), 1);
    }

    struct SilentWriter;

    #[async_trait::async_trait]
    impl crate::recording::SeriesWriter for SilentWriter {
        async fn write(&self, _series: &[crate::recording::Series]) -> Result<(), crate::recording::WriteError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unacknowledged_write_does_not_stall_the_group() {
        let store = MemoryStore::new();
        store.set_result("sum(up)", vec![Sample::new(Labels::new(), 1.0)]);
        store.set_result("a > 0", vec![Sample::new(labels(&[("job", "a")]), 1.0)]);
        let mut ctx = ctx(&store);
        ctx.materializer = Arc::new(Materializer::new(Arc::new(SilentWriter)));

        let def = GroupDef::new("g", Duration::from_secs(60))
            .with_rule(Rule::recording("job:up:sum", "sum(up)"))
            .with_rule(Rule::alerting("A", "a > 0"));
        let mut rt = GroupRuntime::new(def);

        let report = tokio::time::timeout(Duration::from_secs(3600), rt.evaluate(MIN, &ctx))
            .await
            .expect("tick must finish within its budget");

        assert_eq!(report.failures, 1);
        assert_eq!(ctx.metrics.write_failures_val(), 1);
        let rules = rt.rules();
        assert_eq!(rules[0].health, RuleHealth::Err);
        assert!(rules[0].last_error.as_deref().unwrap().contains("acknowledge"));
        assert_eq!(rules[1].health, RuleHealth::Ok);
        assert_eq!(rules[1].alerts.len(), 1);
    }

    #[tokio::test]
    async fn alert_series_are_written_when_enabled() {
        let store = MemoryStore::new();
        store.set_result("x > 1", vec![Sample::new(labels(&[("job", "a")]), 2.0)]);
        let mut ctx = ctx(&store);
        ctx.write_alert_series = true;

        let def = GroupDef::new("g", Duration::from_secs(60))
            .with_rule(Rule::alerting("X", "x > 1").with_for(Duration::from_secs(300)));
        let mut rt = GroupRuntime::new(def);
        rt.evaluate(MIN, &ctx).await;

        let key = labels(&[("__name__", "ALERTS"), ("alertname", "X"), ("alertstate", "pending"), ("job", "a")]);
        assert_eq!(store.latest(&key), Some((MIN, 1.0)));
    }

    #[test]
    fn with_previous_carries_unchanged_rules() {
        let keep = Rule::alerting("Keep", "a > 1");
        let drop = Rule::alerting("Drop", "b > 1");
        let old = GroupDef::new("g", Duration::from_secs(60))
            .with_rule(keep.clone())
            .with_rule(drop);
        let mut old_rt = GroupRuntime::new(old);
        old_rt.rules[0].health = RuleHealth::Ok;

        let new = GroupDef::new("g", Duration::from_secs(30))
            .with_rule(keep)
            .with_rule(Rule::alerting("New", "c > 1"));
        let (rt, leftovers) = GroupRuntime::with_previous(new, old_rt.take_rules());

        assert_eq!(rt.rules()[0].health, RuleHealth::Ok);
        assert_eq!(rt.rules()[1].health, RuleHealth::Unknown);
        assert_eq!(leftovers.len(), 1);
        assert_eq!(leftovers[0].rule.name(), "Drop");
    }
}
