use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use sentinel_common::time::{next_due, now_ms};

use super::Shared;
use crate::engine::{GroupRuntime, TickReport};

pub(super) struct GroupLoop {
    pub name: String,
    pub interval: Duration,
    pub runtime: Arc<Mutex<GroupRuntime>>,
    pub token: CancellationToken,
    pub shared: Arc<Shared>,
}

struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl GroupLoop {
    pub fn spawn(self) {
        let tracker = self.shared.tracker.clone();
        tracker.spawn(self.run());
    }

    async fn run(self) {
        let interval_ms = (self.interval.as_millis() as i64).max(1);
        let in_flight = Arc::new(AtomicBool::new(false));
        tracing::info!(group = %self.name, interval_ms, "group loop started");

        let mut last_due = None;

        loop {
            let now = now_ms();
            let due = next_due(now, interval_ms, last_due);
            let wait = Duration::from_millis((due - now).max(0) as u64);

            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            last_due = Some(due);

            if in_flight.swap(true, Ordering::AcqRel) {
                self.shared.ctx.metrics.inc_missed_evaluations();
                self.shared.stats.record_missed(&self.name);
                tracing::warn!(group = %self.name, due_ms = due, "previous evaluation still running, skipping tick");
                continue;
            }

            let guard = InFlight(Arc::clone(&in_flight));
            let name = self.name.clone();
            let runtime = Arc::clone(&self.runtime);
            let token = self.token.clone();
            let shared = Arc::clone(&self.shared);
            self.shared.tracker.spawn(async move {
                let _guard = guard;
                run_tick(&name, runtime, &token, &shared, due).await;
            });
        }

        tracing::info!(group = %self.name, "group loop stopped");
    }
}

async fn run_tick(
    name: &str,
    runtime: Arc<Mutex<GroupRuntime>>,
    group_token: &CancellationToken,
    shared: &Shared,
    ts_ms: i64,
) {
    // Child of the root token: fires on shutdown and when a reload replaces the group.
    let _permit = tokio::select! {
        _ = group_token.cancelled() => return,
        permit = Arc::clone(&shared.permits).acquire_owned() => match permit {
            Ok(p) => p,
            Err(_) => return,
        },
    };

    let mut runtime = tokio::select! {
        biased;
        _ = group_token.cancelled() => return,
        guard = runtime.lock() => guard,
    };

    let report = tokio::select! {
        biased;
        _ = group_token.cancelled() => {
            tracing::debug!(group = name, "evaluation cancelled");
            return;
        }
        report = runtime.evaluate(ts_ms, &shared.ctx) => report,
    };

    finish_tick(name, report, &runtime, shared);
}

pub(super) fn finish_tick(name: &str, report: TickReport, runtime: &GroupRuntime, shared: &Shared) {
    shared.publish_status(runtime);
    shared
        .stats
        .record_tick(name, report.evaluated_at_ms, report.duration);
    if !report.events.is_empty() {
        shared.sink.publish(report.events);
    }
}
