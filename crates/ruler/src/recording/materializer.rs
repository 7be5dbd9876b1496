use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use sentinel_common::labels::METRIC_NAME;
use sentinel_common::Labels;

use super::{Series, SeriesWriter, WriteError};
use crate::error::EvalError;
use crate::query::Sample;

pub struct Materializer {
    writer: Arc<dyn SeriesWriter>,
}

impl Materializer {
    pub fn new(writer: Arc<dyn SeriesWriter>) -> Self {
        Self { writer }
    }

    pub fn build(
        metric: &str,
        samples: &[Sample],
        static_labels: &Labels,
        timestamp_ms: i64,
    ) -> Result<Vec<Series>, EvalError> {
        let mut seen = HashSet::with_capacity(samples.len());
        let mut out = Vec::with_capacity(samples.len());

        for sample in samples {
            let mut labels = sample.labels.without_metric_name();
            labels.fill_missing(static_labels);
            labels.insert(METRIC_NAME, metric);

            if !seen.insert(labels.clone()) {
                return Err(EvalError::DuplicateSeries(labels));
            }
            out.push(Series {
                labels,
                value: sample.value,
                timestamp_ms,
            });
        }

        Ok(out)
    }

    pub async fn materialize(
        &self,
        metric: &str,
        samples: &[Sample],
        static_labels: &Labels,
        timestamp_ms: i64,
        budget: Duration,
    ) -> Result<usize, EvalError> {
        let series = Self::build(metric, samples, static_labels, timestamp_ms)?;
        self.write(&series, budget).await
    }

    pub async fn write(&self, series: &[Series], budget: Duration) -> Result<usize, EvalError> {
        if series.is_empty() {
            return Ok(0);
        }
        match timeout(budget, self.writer.write(series)).await {
            Ok(result) => result?,
            Err(_) => return Err(WriteError::Timeout(budget).into()),
        }
        Ok(series.len())
    }
}
