pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "hush")]
#[command(about = "Private transaction relay node")]
#[command(version)]
pub struct Args {
    /// Client API of a running node (defaults to the configured client port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the hush directory (defaults to ~/.hush)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
