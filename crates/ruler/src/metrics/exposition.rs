use std::fmt::Write;

use sentinel_common::labels::escape_value;

use super::engine_metrics::EngineMetrics;
use crate::engine::GroupStatsStore;

pub fn render_prometheus(m: &EngineMetrics, groups: &GroupStatsStore) -> String {
    let mut out = String::with_capacity(2048);

    write_counter(&mut out, "ruler_evaluations_total", m.evaluations_val());
    write_counter(&mut out, "ruler_evaluation_failures_total", m.evaluation_failures_val());
    write_counter(&mut out, "ruler_query_timeouts_total", m.query_timeouts_val());
    write_counter(&mut out, "ruler_write_failures_total", m.write_failures_val());
    write_counter(&mut out, "ruler_samples_written_total", m.samples_written_val());
    write_counter(&mut out, "ruler_missed_evaluations_total", m.missed_evaluations_val());
    write_counter(&mut out, "ruler_alert_transitions_total", m.alert_transitions_val());
    write_counter(&mut out, "ruler_notifications_sent_total", m.notifications_sent_val());
    write_counter(&mut out, "ruler_notifications_failed_total", m.notifications_failed_val());
    write_counter(&mut out, "ruler_notifications_dropped_total", m.notifications_dropped_val());
    write_counter(&mut out, "ruler_reloads_total", m.reloads_val());
    write_counter(&mut out, "ruler_reload_failures_total", m.reload_failures_val());

    let (sum, count) = m.evaluation_latency_vals();
    write_summary(&mut out, "ruler_evaluation_latency_us", sum, count);

    let snapshot = groups.snapshot();
    if snapshot.is_empty() {
        return out;
    }

    let _ = writeln!(out, "# TYPE ruler_group_last_evaluation_timestamp_seconds gauge");
    for (name, s) in &snapshot {
        let ts = s.last_evaluation_ms.map_or(0.0, |ms| ms as f64 / 1000.0);
        write_group_sample(&mut out, "ruler_group_last_evaluation_timestamp_seconds", name, ts);
    }
    let _ = writeln!(out, "# TYPE ruler_group_last_duration_seconds gauge");
    for (name, s) in &snapshot {
        write_group_sample(&mut out, "ruler_group_last_duration_seconds", name, s.last_duration_seconds);
    }
    let _ = writeln!(out, "# TYPE ruler_group_interval_seconds gauge");
    for (name, s) in &snapshot {
        write_group_sample(&mut out, "ruler_group_interval_seconds", name, s.interval_seconds);
    }
    let _ = writeln!(out, "# TYPE ruler_group_missed_evaluations_total counter");
    for (name, s) in &snapshot {
        write_group_sample(&mut out, "ruler_group_missed_evaluations_total", name, s.missed as f64);
    }

    out
}

fn write_counter(out: &mut String, name: &str, val: u64) {
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {val}");
}

fn write_summary(out: &mut String, name: &str, sum: u64, count: u64) {
    let _ = writeln!(out, "# TYPE {name} summary");
    let _ = writeln!(out, "{name}_sum {sum}");
    let _ = writeln!(out, "{name}_count {count}");
}

fn write_group_sample(out: &mut String, name: &str, group: &str, val: f64) {
    let _ = writeln!(out, "{name}{{rule_group=\"{}\"}} {val}", escape_value(group));
}
