use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::channel::Notifier;
use crate::alert::AlertEvent;
use crate::metrics::EngineMetrics;

#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<AlertEvent>,
    metrics: Arc<EngineMetrics>,
}

impl EventSink {
    pub fn publish(&self, events: Vec<AlertEvent>) {
        for event in events {
            match self.tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(event)) => {
                    self.metrics.add_notifications_dropped(1);
                    tracing::warn!(
                        group = %event.group,
                        rule = %event.rule_name,
                        "notification queue full, dropping event"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    self.metrics.add_notifications_dropped(1);
                    tracing::debug!("notification dispatcher stopped, dropping event");
                }
            }
        }
    }
}

pub struct Dispatcher {
    rx: mpsc::Receiver<AlertEvent>,
    notifiers: Vec<Arc<dyn Notifier>>,
    metrics: Arc<EngineMetrics>,
}

pub fn channel(
    capacity: usize,
    notifiers: Vec<Arc<dyn Notifier>>,
    metrics: Arc<EngineMetrics>,
) -> (EventSink, Dispatcher) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventSink {
            tx,
            metrics: Arc::clone(&metrics),
        },
        Dispatcher {
            rx,
            notifiers,
            metrics,
        },
    )
}

impl Dispatcher {
    /// Runs until `cancel` fires or every sink is dropped. Events already
    /// queued at cancellation are still delivered.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(notifiers = self.notifiers.len(), "notification dispatcher started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = self.rx.recv() => match event {
                    Some(event) => self.deliver(&event).await,
                    None => break,
                },
            }
        }

        self.rx.close();
        while let Ok(event) = self.rx.try_recv() {
            self.deliver(&event).await;
        }
        tracing::info!("notification dispatcher stopped");
    }

    async fn deliver(&self, event: &AlertEvent) {
        for notifier in &self.notifiers {
            if !notifier.accepts(event) {
                continue;
            }
            match notifier.send(event).await {
                Ok(()) => self.metrics.inc_notifications_sent(),
                Err(e) => {
                    self.metrics.inc_notifications_failed();
                    tracing::error!(
                        notifier = notifier.name(),
                        fingerprint = %event.fingerprint,
                        error = %e,
                        "notification failed"
                    );
                }
            }
        }
    }
}
