use std::collections::BTreeMap;
use std::time::Duration;

use sentinel_common::labels::{ALERT_NAME, METRIC_NAME};
use sentinel_common::Labels;

#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    Alerting {
        name: String,
        for_duration: Duration,
        annotations: BTreeMap<String, String>,
    },
    Recording {
        metric: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub kind: RuleKind,
    pub expr: String,
    pub labels: Labels,
}

impl Rule {
    pub fn alerting(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Alerting {
                name: name.into(),
                for_duration: Duration::ZERO,
                annotations: BTreeMap::new(),
            },
            expr: expr.into(),
            labels: Labels::new(),
        }
    }

    pub fn recording(metric: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Recording {
                metric: metric.into(),
            },
            expr: expr.into(),
            labels: Labels::new(),
        }
    }

    pub fn with_for(mut self, d: Duration) -> Self {
        if let RuleKind::Alerting { for_duration, .. } = &mut self.kind {
            *for_duration = d;
        }
        self
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name, value);
        self
    }

    pub fn with_annotation(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        if let RuleKind::Alerting { annotations, .. } = &mut self.kind {
            annotations.insert(name.into(), template.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            RuleKind::Alerting { name, .. } => name,
            RuleKind::Recording { metric } => metric,
        }
    }

    pub fn is_alerting(&self) -> bool {
        matches!(self.kind, RuleKind::Alerting { .. })
    }

    pub fn kind_str(&self) -> &'static str {
        match self.kind {
            RuleKind::Alerting { .. } => "alerting",
            RuleKind::Recording { .. } => "recording",
        }
    }

    pub fn for_duration(&self) -> Duration {
        match &self.kind {
            RuleKind::Alerting { for_duration, .. } => *for_duration,
            RuleKind::Recording { .. } => Duration::ZERO,
        }
    }

    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        match &self.kind {
            RuleKind::Alerting { annotations, .. } => Some(annotations),
            RuleKind::Recording { .. } => None,
        }
    }

    pub fn alert_labels(&self, sample_labels: &Labels) -> Labels {
        let mut labels = self.labels.clone();
        labels.overlay(&sample_labels.without_metric_name());
        labels.remove(METRIC_NAME);
        labels.insert(ALERT_NAME, self.name());
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_only_touch_alerting_fields_on_alerts() {
        let r = Rule::recording("job:up:sum", "sum(up)")
            .with_for(Duration::from_secs(60))
            .with_annotation("summary", "x");
        assert_eq!(r.for_duration(), Duration::ZERO);
        assert!(r.annotations().is_none());
        assert_eq!(r.name(), "job:up:sum");
        assert_eq!(r.kind_str(), "recording");
    }

    #[test]
    fn alert_labels_prefer_query_labels() {
        let rule = Rule::alerting("HighLatency", "latency > 0.5")
            .with_label("severity", "warning")
            .with_label("service", "static");
        let sample = Labels::from_pairs([("__name__", "latency"), ("service", "x")]);
        let labels = rule.alert_labels(&sample);

        assert_eq!(labels.get("service"), Some("x"));
        assert_eq!(labels.get("severity"), Some("warning"));
        assert_eq!(labels.get("alertname"), Some("HighLatency"));
        assert!(labels.metric_name().is_none());
    }

    #[test]
    fn alertname_cannot_be_overridden() {
        let rule = Rule::alerting("A", "x");
        let labels = rule.alert_labels(&Labels::from_pairs([("alertname", "B")]));
        assert_eq!(labels.get("alertname"), Some("A"));
    }
}
