mod group;
mod stats;

pub use group::{resolve_rules, GroupRuntime, RuleHealth, RuleRuntime, TickReport};
pub use stats::{GroupStats, GroupStatsStore};

use std::sync::Arc;
use std::time::Duration;

use sentinel_common::Labels;

use crate::metrics::EngineMetrics;
use crate::query::Evaluator;
use crate::recording::Materializer;

#[derive(Clone)]
pub struct EngineContext {
    pub evaluator: Evaluator,
    pub materializer: Arc<Materializer>,
    pub metrics: Arc<EngineMetrics>,
    pub external_labels: Labels,
    pub eval_timeout: Option<Duration>,
    pub write_alert_series: bool,
}

impl EngineContext {
    pub fn new(
        evaluator: Evaluator,
        materializer: Arc<Materializer>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            evaluator,
            materializer,
            metrics,
            external_labels: Labels::new(),
            eval_timeout: None,
            write_alert_series: false,
        }
    }

    pub fn budget(&self, interval: Duration) -> Duration {
        self.eval_timeout.unwrap_or(interval)
    }
}
