use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::alert::AlertEvent;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, _event: &AlertEvent) -> bool {
        true
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
#[error("notify: {0}")]
pub struct NotifyError(pub String);

pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<AlertEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AlertEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    fn name(&self) -> &str {
        "channel"
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        self.tx
            .send(event.clone())
            .map_err(|_| NotifyError("receiver dropped".into()))
    }
}
