use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use sentinel_common::Labels;

use crate::query::selector::parse_selector;
use crate::query::{QueryBackend, QueryError, Sample};
use crate::recording::{Series, SeriesWriter, WriteError};

const DEFAULT_LOOKBACK: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
struct Point {
    timestamp_ms: i64,
    value: f64,
}

/// In-process store keeping the latest point of every series.
///
/// Expressions registered with [`MemoryStore::set_result`] return canned
/// samples; any other expression must be a plain series selector.
#[derive(Clone)]
pub struct MemoryStore {
    series: Arc<DashMap<Labels, Point>>,
    canned: Arc<DashMap<String, Vec<Sample>>>,
    lookback_ms: i64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lookback(DEFAULT_LOOKBACK)
    }

    pub fn with_lookback(lookback: Duration) -> Self {
        Self {
            series: Arc::new(DashMap::new()),
            canned: Arc::new(DashMap::new()),
            lookback_ms: lookback.as_millis() as i64,
        }
    }

    pub fn ingest(&self, labels: Labels, timestamp_ms: i64, value: f64) {
        let mut entry = self.series.entry(labels).or_insert(Point {
            timestamp_ms,
            value,
        });
        if timestamp_ms >= entry.timestamp_ms {
            *entry = Point {
                timestamp_ms,
                value,
            };
        }
    }

    pub fn set_result(&self, expr: impl Into<String>, samples: Vec<Sample>) {
        self.canned.insert(expr.into(), samples);
    }

    pub fn clear_result(&self, expr: &str) {
        self.canned.remove(expr);
    }

    pub fn latest(&self, labels: &Labels) -> Option<(i64, f64)> {
        self.series
            .get(labels)
            .map(|p| (p.timestamp_ms, p.value))
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }
}

#[async_trait]
impl QueryBackend for MemoryStore {
    async fn query(&self, expr: &str, at_ms: i64) -> Result<Vec<Sample>, QueryError> {
        if let Some(samples) = self.canned.get(expr) {
            return Ok(samples.clone());
        }

        let selector = parse_selector(expr).map_err(QueryError::Rejected)?;
        let oldest = at_ms - self.lookback_ms;

        Ok(self
            .series
            .iter()
            .filter(|e| {
                let p = e.value();
                p.timestamp_ms <= at_ms && p.timestamp_ms > oldest && selector.matches(e.key())
            })
            .map(|e| Sample::new(e.key().clone(), e.value().value))
            .collect())
    }
}

#[async_trait]
impl SeriesWriter for MemoryStore {
    async fn write(&self, series: &[Series]) -> Result<(), WriteError> {
        for s in series {
            if s.labels.metric_name().is_none() {
                return Err(WriteError::Rejected(format!(
                    "series {} has no metric name",
                    s.labels
                )));
            }
        }
        for s in series {
            self.ingest(s.labels.clone(), s.timestamp_ms, s.value);
        }
        Ok(())
    }
}
