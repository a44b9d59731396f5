use std::path::PathBuf;

/// Runtime settings for one daemon process.
#[derive(Debug)]
pub struct Config {
    /// Port the HTTP server (room redemption, sync sessions, identity) binds.
    pub port: u16,

    /// Sqlite database backing the peer. `None` runs fully in memory.
    pub sqlite_path: Option<PathBuf>,

    /// Default log level; `RUST_LOG` still overrides it per target.
    pub log_level: tracing::Level,
    /// Directory for rolling log files. Unset logs to stdout only.
    pub log_dir: Option<PathBuf>,
}
