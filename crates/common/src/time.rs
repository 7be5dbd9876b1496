use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub fn next_aligned(now_ms: i64, interval_ms: i64) -> i64 {
    if interval_ms <= 0 {
        return now_ms;
    }
    now_ms.div_euclid(interval_ms) * interval_ms + interval_ms
}

/// Next tick after `now_ms`, never earlier than one interval past `last_due`
/// even if the wall clock stepped backwards.
pub fn next_due(now_ms: i64, interval_ms: i64, last_due: Option<i64>) -> i64 {
    let aligned = next_aligned(now_ms, interval_ms);
    match last_due {
        Some(last) => aligned.max(last + interval_ms.max(1)),
        None => aligned,
    }
}
