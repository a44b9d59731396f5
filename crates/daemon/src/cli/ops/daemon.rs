use clap::Args;

use burrow_daemon::state::AppState;
use burrow_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override HTTP server port (default from PORT env or config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] burrow_daemon::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        // Load state from config path (or default ~/.burrow)
        let state = AppState::load(ctx.config_path.clone())?;

        // Port priority: explicit flag > PORT env > config.toml
        let port = self
            .port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(state.config.port);

        let config = ServiceConfig {
            port,
            sqlite_path: Some(state.db_path),
            log_level: tracing::Level::DEBUG,
            log_dir: self.log_dir.clone(),
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
