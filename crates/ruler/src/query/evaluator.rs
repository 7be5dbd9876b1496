use std::sync::Arc;
use std::time::Duration;

use super::{QueryBackend, Sample};
use crate::error::EvalError;

#[derive(Clone)]
pub struct Evaluator {
    backend: Arc<dyn QueryBackend>,
}

impl Evaluator {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }

    pub async fn evaluate(
        &self,
        expr: &str,
        at_ms: i64,
        budget: Duration,
    ) -> Result<Vec<Sample>, EvalError> {
        match tokio::time::timeout(budget, self.backend.query(expr, at_ms)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(EvalError::Timeout(budget)),
        }
    }
}
