use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sentinel-ruler", version, about = "Rule evaluation engine for alerting and recording rules")]
pub struct Opts {
    #[arg(short, long, env = "RULER_CONFIG", default_value = "ruler.yml", help = "Path to the ruler config file")]
    pub config: PathBuf,

    #[arg(long, help = "Validate the config and rule files, then exit")]
    pub check: bool,

    #[arg(long, help = "API listen address (overrides config)")]
    pub api_addr: Option<String>,
}
