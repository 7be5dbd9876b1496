use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Write;
use std::time::Duration;

use super::{Series, SeriesWriter, WriteError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ImportWriter {
    url: String,
    client: Client,
}

impl ImportWriter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SeriesWriter for ImportWriter {
    async fn write(&self, series: &[Series]) -> Result<(), WriteError> {
        let body = encode_series(series);

        let resp = self
            .client
            .post(&self.url)
            .header("Content-Type", "text/plain; version=0.0.4")
            .body(body)
            .send()
            .await
            .map_err(|e| WriteError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(WriteError::Rejected(format!("http {status}: {text}")));
        }
        Ok(())
    }
}

pub fn encode_series(series: &[Series]) -> String {
    let mut out = String::with_capacity(series.len() * 64);
    for s in series {
        let _ = writeln!(
            out,
            "{} {} {}",
            s.labels,
            format_value(s.value),
            s.timestamp_ms
        );
    }
    out
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_common::Labels;

    #[test]
    fn encodes_lines_with_timestamps() {
        let series = vec![
            Series {
                labels: Labels::from_pairs([("__name__", "job:up:sum"), ("job", "api")]),
                value: 3.0,
                timestamp_ms: 1_700_000_000_000,
            },
            Series {
                labels: Labels::from_pairs([("__name__", "ratio")]),
                value: f64::NAN,
                timestamp_ms: 1_700_000_000_000,
            },
        ];
        let text = encode_series(&series);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], r#"job:up:sum{job="api"} 3 1700000000000"#);
        assert_eq!(lines[1], "ratio{} NaN 1700000000000");
    }
}
