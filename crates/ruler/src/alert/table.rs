use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use sentinel_common::fingerprint::fingerprint_string;
use sentinel_common::labels::{ALERT_STATE, METRIC_NAME};
use sentinel_common::Labels;

use super::event::{AlertEvent, AlertStatus};
use super::state::AlertState;
use crate::error::EvalError;
use crate::query::Sample;
use crate::recording::Series;
use crate::rules::template::{render_all, TemplateData};
use crate::rules::Rule;

pub const ALERTS_METRIC: &str = "ALERTS";

#[derive(Debug, Clone, Serialize)]
pub struct AlertInstance {
    pub labels: Labels,
    #[serde(flatten)]
    pub state: AlertState,
    pub value: f64,
    pub annotations: BTreeMap<String, String>,
    /// Table tick at which the expression last produced this label set.
    pub last_seen_tick: u64,
}

pub struct AlertContext<'a> {
    pub group: &'a str,
    pub rule: &'a Rule,
    pub external_labels: &'a Labels,
}

#[derive(Debug, Default)]
pub struct AlertTable {
    tick: u64,
    instances: HashMap<Labels, AlertInstance>,
}

pub fn bind_samples(rule: &Rule, samples: &[Sample]) -> Result<Vec<(Labels, f64)>, EvalError> {
    let mut seen = HashSet::with_capacity(samples.len());
    let mut out = Vec::with_capacity(samples.len());
    for sample in samples {
        let labels = rule.alert_labels(&sample.labels);
        if !seen.insert(labels.clone()) {
            return Err(EvalError::DuplicateSeries(labels));
        }
        out.push((labels, sample.value));
    }
    Ok(out)
}

impl AlertTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, labels: &Labels) -> Option<&AlertInstance> {
        self.instances.get(labels)
    }

    pub fn instances(&self) -> impl Iterator<Item = &AlertInstance> {
        self.instances.values()
    }

    /// Applies one tick's bound results and returns the transitions.
    pub fn apply(
        &mut self,
        ctx: &AlertContext<'_>,
        now_ms: i64,
        results: Vec<(Labels, f64)>,
    ) -> Vec<AlertEvent> {
        self.tick += 1;
        let tick = self.tick;
        let for_ms = ctx.rule.for_duration().as_millis() as i64;
        let empty = BTreeMap::new();
        let templates = ctx.rule.annotations().unwrap_or(&empty);
        let mut events = Vec::new();

        for (labels, value) in results {
            let annotations = render_all(
                templates,
                &TemplateData {
                    labels: &labels,
                    external_labels: ctx.external_labels,
                    value,
                },
            );

            match self.instances.get_mut(&labels) {
                Some(inst) => {
                    let prev = inst.state;
                    inst.state = prev.observe(now_ms, for_ms);
                    inst.value = value;
                    inst.annotations = annotations;
                    inst.last_seen_tick = tick;
                    if !inst.state.same_phase(&prev) {
                        events.push(build_event(ctx, inst, now_ms));
                    }
                }
                None => {
                    let inst = AlertInstance {
                        labels: labels.clone(),
                        state: AlertState::start(now_ms, for_ms),
                        value,
                        annotations,
                        last_seen_tick: tick,
                    };
                    events.push(build_event(ctx, &inst, now_ms));
                    self.instances.insert(labels, inst);
                }
            }
        }

        self.instances.retain(|_, inst| {
            if inst.last_seen_tick == tick {
                return true;
            }
            match inst.state.vanish(now_ms) {
                Some(next) => {
                    inst.state = next;
                    events.push(build_event(ctx, inst, now_ms));
                    true
                }
                None => false,
            }
        });

        events
    }

    pub fn resolve_all(&mut self, ctx: &AlertContext<'_>, now_ms: i64) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        for (_, mut inst) in self.instances.drain() {
            if let Some(next @ AlertState::Inactive { .. }) = inst.state.vanish(now_ms) {
                inst.state = next;
                events.push(build_event(ctx, &inst, now_ms));
            }
        }
        events
    }

    pub fn alert_series(&self, timestamp_ms: i64) -> Vec<Series> {
        let mut out: Vec<Series> = self
            .instances
            .values()
            .filter(|i| !i.state.is_inactive())
            .map(|i| {
                let mut labels = i.labels.clone();
                labels.insert(METRIC_NAME, ALERTS_METRIC);
                labels.insert(ALERT_STATE, i.state.name());
                Series {
                    labels,
                    value: 1.0,
                    timestamp_ms,
                }
            })
            .collect();
        out.sort_by(|a, b| a.labels.cmp(&b.labels));
        out
    }
}

fn build_event(ctx: &AlertContext<'_>, inst: &AlertInstance, now_ms: i64) -> AlertEvent {
    let status = match inst.state {
        AlertState::Pending { .. } => AlertStatus::Pending,
        AlertState::Firing { .. } => AlertStatus::Firing,
        AlertState::Inactive { .. } => AlertStatus::Resolved,
    };
    AlertEvent {
        id: uuid::Uuid::new_v4().to_string(),
        fingerprint: fingerprint_string(ctx.group, ctx.rule.name(), &inst.labels),
        group: ctx.group.to_string(),
        rule_name: ctx.rule.name().to_string(),
        status,
        labels: inst.labels.clone(),
        annotations: inst.annotations.clone(),
        value: inst.value,
        active_since_ms: inst.state.active_since_ms(),
        fired_at_ms: inst.state.fired_at_ms(),
        resolved_at_ms: inst.state.resolved_at_ms(),
        evaluated_at_ms: now_ms,
    }
}
