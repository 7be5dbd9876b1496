use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Default)]
pub struct EngineMetrics {
    evaluations: AtomicU64,
    evaluation_failures: AtomicU64,
    query_timeouts: AtomicU64,
    write_failures: AtomicU64,
    samples_written: AtomicU64,
    missed_evaluations: AtomicU64,
    alert_transitions: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
    notifications_dropped: AtomicU64,
    reloads: AtomicU64,
    reload_failures: AtomicU64,
    evaluation_latency_sum_us: AtomicU64,
    evaluation_latency_count: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_evaluations(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_evaluation_failures(&self) {
        self.evaluation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_query_timeouts(&self) {
        self.query_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_samples_written(&self, count: u64) {
        self.samples_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_missed_evaluations(&self) {
        self.missed_evaluations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_alert_transitions(&self, count: u64) {
        self.alert_transitions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_notifications_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_notifications_failed(&self) {
        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_notifications_dropped(&self, count: u64) {
        self.notifications_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_reloads(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reload_failures(&self) {
        self.reload_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evaluation_latency(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.evaluation_latency_sum_us
            .fetch_add(us, Ordering::Relaxed);
        self.evaluation_latency_count
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn evaluations_val(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn evaluation_failures_val(&self) -> u64 {
        self.evaluation_failures.load(Ordering::Relaxed)
    }

    pub fn query_timeouts_val(&self) -> u64 {
        self.query_timeouts.load(Ordering::Relaxed)
    }

    pub fn write_failures_val(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    pub fn samples_written_val(&self) -> u64 {
        self.samples_written.load(Ordering::Relaxed)
    }

    pub fn missed_evaluations_val(&self) -> u64 {
        self.missed_evaluations.load(Ordering::Relaxed)
    }

    pub fn alert_transitions_val(&self) -> u64 {
        self.alert_transitions.load(Ordering::Relaxed)
    }

    pub fn notifications_sent_val(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    pub fn notifications_failed_val(&self) -> u64 {
        self.notifications_failed.load(Ordering::Relaxed)
    }

    pub fn notifications_dropped_val(&self) -> u64 {
        self.notifications_dropped.load(Ordering::Relaxed)
    }

    pub fn reloads_val(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    pub fn reload_failures_val(&self) -> u64 {
        self.reload_failures.load(Ordering::Relaxed)
    }

    pub fn evaluation_latency_vals(&self) -> (u64, u64) {
        (
            self.evaluation_latency_sum_us.load(Ordering::Relaxed),
            self.evaluation_latency_count.load(Ordering::Relaxed),
        )
    }
}
