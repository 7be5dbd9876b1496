mod import;
mod materializer;

pub use import::{encode_series, ImportWriter};
pub use materializer::Materializer;

use async_trait::async_trait;
use serde::Serialize;
use sentinel_common::Labels;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub labels: Labels,
    pub value: f64,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WriteError {
    #[error("storage rejected write: {0}")]
    Rejected(String),
    #[error("storage transport: {0}")]
    Transport(String),
    #[error("no storage configured for recorded series")]
    Unconfigured,
    #[error("storage did not acknowledge write within {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait SeriesWriter: Send + Sync {
    async fn write(&self, series: &[Series]) -> Result<(), WriteError>;
}

pub struct UnconfiguredWriter;

#[async_trait]
impl SeriesWriter for UnconfiguredWriter {
    async fn write(&self, series: &[Series]) -> Result<(), WriteError> {
        if series.is_empty() {
            Ok(())
        } else {
            Err(WriteError::Unconfigured)
        }
    }
}
