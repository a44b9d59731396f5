use std::error::Error;
use std::path::PathBuf;

use url::Url;

use burrow_daemon::http_server::api::client::{ApiClient, ApiError};
use burrow_daemon::state::{AppState, DEFAULT_PORT};

/// Resolve the remote URL for the API client.
///
/// Priority: explicit `--remote` flag > config file `port` > hardcoded 8000.
pub fn resolve_remote(explicit: Option<Url>, config_path: Option<PathBuf>) -> Url {
    let configured = explicit.or_else(|| {
        let state = AppState::load(config_path).ok()?;
        Url::parse(&format!("http://localhost:{}", state.config.port)).ok()
    });
    match configured {
        Some(url) => url,
        None => Url::parse(&format!("http://localhost:{}", DEFAULT_PORT))
            .expect("hardcoded URL must parse"),
    }
}

/// Everything a command needs at execution time.
#[derive(Clone)]
pub struct OpContext {
    /// Client for talking to a running daemon.
    pub client: ApiClient,
    /// Optional custom config path (defaults to ~/.burrow)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(remote: Url, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(&remote)?,
            config_path,
        })
    }
}

/// A CLI command: executes against the context, with its own output and
/// error types. The `commands!` macro stitches all of them into one
/// dispatchable enum.
#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! commands {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum CommandOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum CommandError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = CommandOutput;
            type Error = CommandError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(CommandOutput::$variant)
                                .map_err(CommandError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for CommandOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        CommandOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
