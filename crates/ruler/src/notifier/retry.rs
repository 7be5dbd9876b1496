use async_trait::async_trait;
use std::time::Duration;

use sentinel_common::retry::{retry_async, RetryConfig};

use super::channel::{Notifier, NotifyError};
use crate::alert::AlertEvent;

pub struct RetryNotifier<N: Notifier> {
    inner: N,
    config: RetryConfig,
}

impl<N: Notifier> RetryNotifier<N> {
    pub fn new(inner: N, max_retries: u32, base_delay_ms: u64) -> Self {
        let config = RetryConfig::default()
            .with_max_attempts(max_retries + 1)
            .with_initial_delay(Duration::from_millis(base_delay_ms));
        Self { inner, config }
    }
}

#[async_trait]
impl<N: Notifier> Notifier for RetryNotifier<N> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn accepts(&self, event: &AlertEvent) -> bool {
        self.inner.accepts(event)
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        retry_async(&self.config, || self.inner.send(event)).await
    }
}
