use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use sentinel_common::duration::serde_duration;
use sentinel_common::Labels;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RulerConfig {
    pub rule_files: Vec<PathBuf>,
    #[serde(default = "default_evaluation_interval", with = "serde_duration")]
    pub evaluation_interval: Duration,
    #[serde(default, with = "serde_duration::option")]
    pub eval_timeout: Option<Duration>,
    #[serde(default = "default_max_concurrent_groups")]
    pub max_concurrent_groups: usize,
    #[serde(default)]
    pub write_alert_series: bool,
    #[serde(default)]
    pub external_labels: Labels,
    #[serde(default = "default_api_addr")]
    pub api_addr: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub query: Option<QueryConfig>,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    pub import_url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NotifierConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_evaluation_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_max_concurrent_groups() -> usize {
    4
}

fn default_api_addr() -> String {
    "0.0.0.0:9093".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_queue_capacity() -> usize {
    1024
}
