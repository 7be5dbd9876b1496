use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupStats {
    pub interval_seconds: f64,
    pub last_evaluation_ms: Option<i64>,
    pub last_duration_seconds: f64,
    pub evaluations: u64,
    pub missed: u64,
}

#[derive(Clone, Default)]
pub struct GroupStatsStore {
    groups: Arc<DashMap<String, GroupStats>>,
}

impl GroupStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, group: &str, interval: Duration) {
        self.groups.entry(group.to_string()).or_default().interval_seconds =
            interval.as_secs_f64();
    }

    pub fn record_tick(&self, group: &str, evaluated_at_ms: i64, duration: Duration) {
        let mut stats = self.groups.entry(group.to_string()).or_default();
        stats.last_evaluation_ms = Some(evaluated_at_ms);
        stats.last_duration_seconds = duration.as_secs_f64();
        stats.evaluations += 1;
    }

    pub fn record_missed(&self, group: &str) {
        self.groups.entry(group.to_string()).or_default().missed += 1;
    }

    pub fn remove(&self, group: &str) {
        self.groups.remove(group);
    }

    pub fn get(&self, group: &str) -> Option<GroupStats> {
        self.groups.get(group).map(|s| s.clone())
    }

    pub fn snapshot(&self) -> Vec<(String, GroupStats)> {
        let mut out: Vec<(String, GroupStats)> = self
            .groups
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_ticks_and_misses() {
        let store = GroupStatsStore::new();
        store.register("g", Duration::from_secs(60));
        store.record_tick("g", 120_000, Duration::from_millis(250));
        store.record_missed("g");

        let s = store.get("g").unwrap();
        assert_eq!(s.interval_seconds, 60.0);
        assert_eq!(s.last_evaluation_ms, Some(120_000));
        assert_eq!(s.last_duration_seconds, 0.25);
        assert_eq!(s.evaluations, 1);
        assert_eq!(s.missed, 1);
    }

    #[test]
    fn snapshot_is_sorted_and_remove_works() {
        let store = GroupStatsStore::new();
        store.register("b", Duration::from_secs(1));
        store.register("a", Duration::from_secs(1));
        let names: Vec<String> = store.snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);

        store.remove("a");
        assert!(store.get("a").is_none());
    }
}
