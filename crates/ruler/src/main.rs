use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sentinel_ruler::cli::Opts;
use sentinel_ruler::config::{self, LogFormat};
use sentinel_ruler::reload::RuleSource;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let mut cfg = config::load_from_file(&opts.config)
        .with_context(|| format!("loading config {}", opts.config.display()))?;
    if let Some(addr) = opts.api_addr {
        cfg.api_addr = addr;
    }

    if opts.check {
        let set = RuleSource::new(cfg.rule_files.clone(), cfg.evaluation_interval).load()?;
        println!(
            "SUCCESS: {} groups, {} rules found",
            set.groups.len(),
            set.rule_count()
        );
        return Ok(());
    }

    init_tracing(cfg.log_format);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sentinel-ruler starting");
    sentinel_ruler::app::run(cfg).await
}
