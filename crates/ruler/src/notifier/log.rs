use async_trait::async_trait;

use super::channel::{Notifier, NotifyError};
use crate::alert::AlertEvent;

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        tracing::info!(
            group = %event.group,
            rule = %event.rule_name,
            status = event.status_str(),
            fingerprint = %event.fingerprint,
            labels = %event.labels,
            value = event.value,
            "alert transition"
        );
        Ok(())
    }
}
