pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "burrow")]
#[command(about = "Room sync server and client")]
pub struct Args {
    /// Daemon URL to talk to (defaults to the configured port on localhost)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the burrow config directory (defaults to ~/.burrow)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
