use clap::Args;

use burrow_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Port the daemon will listen on
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig::default();
        if let Some(port) = self.port {
            config.port = port;
        }

        let state = AppState::init(ctx.config_path.clone(), config)?;

        Ok(format!(
            "initialized {}\n  port:     {}\n  database: {}",
            state.burrow_dir.display(),
            state.config.port,
            state.db_path.display()
        ))
    }
}
