pub mod alert;
pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod notifier;
pub mod query;
pub mod recording;
pub mod reload;
pub mod rules;
pub mod scheduler;
pub mod shutdown;
pub mod storage;
