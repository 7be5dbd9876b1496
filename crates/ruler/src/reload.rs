use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::EngineMetrics;
use crate::rules::{load_files, ConfigError, RuleSet};
use crate::scheduler::{ReloadSummary, Scheduler};

#[derive(Debug, Clone)]
pub struct RuleSource {
    paths: Vec<PathBuf>,
    default_interval: Duration,
}

impl RuleSource {
    pub fn new(paths: Vec<PathBuf>, default_interval: Duration) -> Self {
        Self {
            paths,
            default_interval,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn load(&self) -> Result<RuleSet, ConfigError> {
        load_files(&self.paths, self.default_interval)
    }
}

pub struct Reloader {
    source: RuleSource,
    scheduler: Arc<Scheduler>,
    metrics: Arc<EngineMetrics>,
}

impl Reloader {
    pub fn new(source: RuleSource, scheduler: Arc<Scheduler>, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            source,
            scheduler,
            metrics,
        }
    }

    pub async fn reload(&self) -> Result<ReloadSummary, ConfigError> {
        let source = self.source.clone();
        let loaded = tokio::task::spawn_blocking(move || source.load())
            .await
            .unwrap_or_else(|e| Err(ConfigError::Io {
                path: "rule files".into(),
                source: std::io::Error::other(e.to_string()),
            }));

        match loaded {
            Ok(set) => {
                let groups = set.groups.len();
                let rules = set.rule_count();
                let summary = self.scheduler.reload(set).await;
                self.metrics.inc_reloads();
                tracing::info!(groups, rules, "rule files reloaded");
                Ok(summary)
            }
            Err(e) => {
                self.metrics.inc_reload_failures();
                tracing::error!(error = %e, "reload failed, keeping previous rule set");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineContext, GroupStatsStore};
    use crate::notifier;
    use crate::query::Evaluator;
    use crate::recording::Materializer;
    use crate::storage::MemoryStore;

    fn scheduler(metrics: &Arc<EngineMetrics>) -> Arc<Scheduler> {
        let store = MemoryStore::new();
        let ctx = EngineContext::new(
            Evaluator::new(Arc::new(store.clone())),
            Arc::new(Materializer::new(Arc::new(store))),
            Arc::clone(metrics),
        );
        let (sink, _dispatcher) = notifier::channel(16, Vec::new(), Arc::clone(metrics));
        Arc::new(Scheduler::new(ctx, GroupStatsStore::new(), sink, 2).manual())
    }

    const RULES: &str = r#"
groups:
  - name: aiops_alerts
    rules:
      - alert: HighLatency
        expr: latency > 0.5
        for: 5m
"#;

    #[tokio::test]
    async fn reload_applies_valid_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yml");
        std::fs::write(&path, RULES).unwrap();

        let metrics = EngineMetrics::new();
        let sched = scheduler(&metrics);
        let reloader = Reloader::new(
            RuleSource::new(vec![path], Duration::from_secs(60)),
            Arc::clone(&sched),
            Arc::clone(&metrics),
        );

        let summary = reloader.reload().await.unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(sched.group_names().await, vec!["aiops_alerts".to_string()]);
        assert_eq!(metrics.reloads_val(), 1);

        let summary = reloader.reload().await.unwrap();
        assert_eq!(summary.unchanged, 1);
    }

    #[tokio::test]
    async fn broken_file_keeps_previous_rule_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yml");
        std::fs::write(&path, RULES).unwrap();

        let metrics = EngineMetrics::new();
        let sched = scheduler(&metrics);
        let reloader = Reloader::new(
            RuleSource::new(vec![path.clone()], Duration::from_secs(60)),
            Arc::clone(&sched),
            Arc::clone(&metrics),
        );
        reloader.reload().await.unwrap();

        std::fs::write(&path, "groups: [").unwrap();
        assert!(matches!(reloader.reload().await, Err(ConfigError::Parse { .. })));
        assert_eq!(metrics.reload_failures_val(), 1);
        assert_eq!(sched.rule_set().await.groups.len(), 1);
    }
}
