use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Daemon that scales mesh objects to match the distance between two of
/// their vertices.
#[derive(Debug, Parser)]
#[command(name = "vertscale", version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "VERTSCALE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "VERTSCALE_PORT", default_value_t = 8088)]
    pub port: u16,

    /// Log filter, used when RUST_LOG is not set
    #[arg(long, env = "VERTSCALE_LOG", default_value = "info")]
    pub log: String,

    /// OBJ files to load as mesh objects at startup (repeatable)
    #[arg(long = "load", value_name = "OBJ")]
    pub load: Vec<PathBuf>,
}

impl Config {
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log))
    }
}
