use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::metrics::EngineMetrics;
use crate::reload::Reloader;
use crate::scheduler::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub metrics: Arc<EngineMetrics>,
    pub reloader: Option<Arc<Reloader>>,
    ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            scheduler,
            metrics,
            reloader: None,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_reloader(mut self, reloader: Arc<Reloader>) -> Self {
        self.reloader = Some(reloader);
        self
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
