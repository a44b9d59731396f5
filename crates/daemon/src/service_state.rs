use std::sync::Arc;

use common::peer::Peer;

use crate::database::{Database, DatabaseSetupError, SqliteDriver};
use crate::service_config::Config;
use crate::sessions::SessionManager;

/// Everything a running service shares between its HTTP handlers and
/// background tasks: the local peer and the live session registry.
#[derive(Debug, Clone)]
pub struct State {
    peer: Peer,
    sessions: Arc<SessionManager>,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        let database = match &config.sqlite_path {
            Some(path) => {
                let url = url::Url::parse(&format!("sqlite://{}", path.display()))?;
                Database::connect(&url).await?
            }
            None => Database::memory().await?,
        };

        let peer = Peer::new(Arc::new(SqliteDriver::new(database)));
        let sessions = Arc::new(SessionManager::new());

        Ok(Self { peer, sessions })
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("invalid sqlite path: {0}")]
    InvalidSqlitePath(#[from] url::ParseError),
    #[error("failed to setup database: {0}")]
    Database(#[from] DatabaseSetupError),
}
