mod evaluator;
mod prom;
pub mod selector;

pub use evaluator::Evaluator;
pub use prom::{decode_response, PromQueryClient};

use async_trait::async_trait;
use serde::Serialize;
use sentinel_common::Labels;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub labels: Labels,
    pub value: f64,
}

impl Sample {
    pub fn new(labels: Labels, value: f64) -> Self {
        Self { labels, value }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("query rejected: {0}")]
    Rejected(String),
    #[error("query transport: {0}")]
    Transport(String),
    #[error("query decode: {0}")]
    Decode(String),
}

#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn query(&self, expr: &str, at_ms: i64) -> Result<Vec<Sample>, QueryError>;
}

pub fn sort_samples(samples: &mut [Sample]) {
    samples.sort_by(|a, b| a.labels.cmp(&b.labels));
}
