mod driver;

use std::ops::Deref;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub use driver::SqliteDriver;

#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    pub async fn connect(database_url: &url::Url) -> Result<Self, DatabaseSetupError> {
        if database_url.scheme() == "sqlite" {
            let db = connect_sqlite(database_url.as_str()).await?;
            migrate_sqlite(&db).await?;
            return Ok(Database::new(db));
        }

        Err(DatabaseSetupError::UnknownDbType(
            database_url.scheme().to_string(),
        ))
    }

    /// In-process database with no file behind it; state lives as long as
    /// the handle. Used by ephemeral daemons and tests.
    pub async fn memory() -> Result<Self, DatabaseSetupError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(DatabaseSetupError::Unavailable)?;
        // a second connection would see a different empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(DatabaseSetupError::Unavailable)?;
        migrate_sqlite(&pool).await?;
        Ok(Database::new(pool))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

async fn connect_sqlite(url: &str) -> Result<SqlitePool, DatabaseSetupError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(DatabaseSetupError::Unavailable)?
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .map_err(DatabaseSetupError::Unavailable)
}

// Statements are idempotent so re-running them at every boot is safe.
const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS identities (
        tag TEXT PRIMARY KEY,
        label TEXT NOT NULL,
        secret_key TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS capabilities (
        share TEXT NOT NULL,
        kind TEXT NOT NULL,
        token BLOB NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (share, kind)
    )",
    "CREATE TABLE IF NOT EXISTS documents (
        share TEXT NOT NULL,
        path TEXT NOT NULL,
        payload BLOB NOT NULL,
        timestamp INTEGER NOT NULL,
        PRIMARY KEY (share, path)
    )",
    "CREATE INDEX IF NOT EXISTS documents_by_time ON documents (share, timestamp)",
];

async fn migrate_sqlite(pool: &SqlitePool) -> Result<(), DatabaseSetupError> {
    for statement in MIGRATIONS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(DatabaseSetupError::MigrationFailed)?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(sqlx::Error),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(sqlx::Error),

    #[error("requested database type was not recognized: {0}")]
    UnknownDbType(String),
}
