use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{QueryBackend, QueryError, Sample};
use sentinel_common::Labels;

pub struct PromQueryClient {
    base_url: String,
    client: Client,
}

impl PromQueryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/v1/query", self.base_url)
    }
}

#[async_trait]
impl QueryBackend for PromQueryClient {
    async fn query(&self, expr: &str, at_ms: i64) -> Result<Vec<Sample>, QueryError> {
        let time = format!("{:.3}", at_ms as f64 / 1000.0);
        let resp = self
            .client
            .get(self.endpoint())
            .query(&[("query", expr), ("time", time.as_str())])
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        match decode_response(&body) {
            Err(QueryError::Decode(_)) if !status.is_success() => {
                Err(QueryError::Transport(format!("http {status}")))
            }
            other => other,
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<ApiData>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
}

#[derive(Deserialize)]
struct ApiData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

#[derive(Deserialize)]
struct VectorItem {
    metric: BTreeMap<String, String>,
    value: (f64, String),
}

pub fn decode_response(body: &str) -> Result<Vec<Sample>, QueryError> {
    let resp: ApiResponse =
        serde_json::from_str(body).map_err(|e| QueryError::Decode(e.to_string()))?;

    if resp.status != "success" {
        let kind = resp.error_type.unwrap_or_else(|| "error".into());
        let msg = resp.error.unwrap_or_else(|| "unknown error".into());
        return Err(QueryError::Rejected(format!("{kind}: {msg}")));
    }

    let data = resp
        .data
        .ok_or_else(|| QueryError::Decode("missing data".into()))?;

    match data.result_type.as_str() {
        "vector" => {
            let items: Vec<VectorItem> = serde_json::from_value(data.result)
                .map_err(|e| QueryError::Decode(e.to_string()))?;
            items
                .into_iter()
                .map(|item| {
                    Ok(Sample::new(
                        Labels::from(item.metric),
                        parse_value(&item.value.1)?,
                    ))
                })
                .collect()
        }
        "scalar" => {
            let (_, raw): (f64, String) = serde_json::from_value(data.result)
                .map_err(|e| QueryError::Decode(e.to_string()))?;
            Ok(vec![Sample::new(Labels::new(), parse_value(&raw)?)])
        }
        other => Err(QueryError::Rejected(format!(
            "expression must return a vector or scalar, got {other}"
        ))),
    }
}

fn parse_value(raw: &str) -> Result<f64, QueryError> {
    raw.parse::<f64>()
        .map_err(|_| QueryError::Decode(format!("invalid sample value {raw:?}")))
}
