use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Race timing sign driven over a TCP command channel
#[derive(Debug, Parser, Clone)]
#[command(about = "MX timing sign", author, version)]
pub(crate) struct Args {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Listen address for the command channel, overriding the config file
    #[arg(long)]
    pub(crate) bind: Option<SocketAddr>,

    /// Run the render loop without a preview window
    #[arg(long)]
    pub(crate) headless: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub(crate) log_level: String,
}
