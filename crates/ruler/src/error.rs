use std::time::Duration;

use sentinel_common::Labels;

use crate::query::QueryError;
use crate::recording::WriteError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("vector contains metrics with the same labelset after applying rule labels: {0}")]
    DuplicateSeries(Labels),
}

impl EvalError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}
