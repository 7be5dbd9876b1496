use serde::Serialize;
use std::collections::BTreeMap;

use sentinel_common::Labels;

use crate::alert::AlertInstance;
use crate::engine::{GroupRuntime, RuleHealth, RuleRuntime};

#[derive(Debug, Clone, Serialize)]
pub struct GroupStatus {
    pub name: String,
    pub file: String,
    pub interval_seconds: f64,
    pub last_evaluation_ms: Option<i64>,
    pub evaluation_seconds: f64,
    pub rules: Vec<RuleStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleStatus {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub labels: Labels,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    pub health: RuleHealth,
    pub last_error: Option<String>,
    pub last_evaluation_ms: Option<i64>,
    pub evaluation_seconds: f64,
    pub active_alerts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveAlert {
    pub group: String,
    pub rule: String,
    #[serde(flatten)]
    pub instance: AlertInstance,
}

#[derive(Debug, Clone)]
pub(super) struct GroupSnapshot {
    pub status: GroupStatus,
    pub alerts: Vec<ActiveAlert>,
}

impl GroupSnapshot {
    pub fn of(rt: &GroupRuntime) -> Self {
        let mut alerts = Vec::new();
        active_alerts(rt, &mut alerts);
        Self {
            status: group_status(rt),
            alerts,
        }
    }
}

fn group_status(rt: &GroupRuntime) -> GroupStatus {
    let def = rt.def();
    GroupStatus {
        name: def.name.clone(),
        file: def.file.clone(),
        interval_seconds: def.interval.as_secs_f64(),
        last_evaluation_ms: rt.last_evaluation_ms(),
        evaluation_seconds: rt.last_duration().as_secs_f64(),
        rules: rt.rules().iter().map(rule_status).collect(),
    }
}

fn rule_status(rr: &RuleRuntime) -> RuleStatus {
    let rule = &rr.rule;
    RuleStatus {
        name: rule.name().to_string(),
        kind: rule.kind_str(),
        query: rule.expr.clone(),
        duration_seconds: rule
            .is_alerting()
            .then(|| rule.for_duration().as_secs_f64()),
        labels: rule.labels.clone(),
        annotations: rule.annotations().cloned(),
        health: rr.health,
        last_error: rr.last_error.clone(),
        last_evaluation_ms: rr.last_evaluation_ms,
        evaluation_seconds: rr.last_duration.as_secs_f64(),
        active_alerts: rr
            .alerts
            .instances()
            .filter(|i| !i.state.is_inactive())
            .count(),
    }
}

fn active_alerts(rt: &GroupRuntime, out: &mut Vec<ActiveAlert>) {
    for rr in rt.rules() {
        let mut alerts: Vec<ActiveAlert> = rr
            .alerts
            .instances()
            .filter(|i| !i.state.is_inactive())
            .map(|i| ActiveAlert {
                group: rt.name().to_string(),
                rule: rr.rule.name().to_string(),
                instance: i.clone(),
            })
            .collect();
        alerts.sort_by(|a, b| a.instance.labels.cmp(&b.instance.labels));
        out.extend(alerts);
    }
}
