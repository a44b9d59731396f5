//! SQLite-backed storage driver.
//!
//! Persists the peer's identities, capabilities, and documents so a server
//! keeps its identity and authorization state across restarts. Last-write-
//! wins lands in the document upsert's WHERE clause; everything else is
//! straightforward row mapping.

use common::cap::Capability;
use common::crypto::SecretKey;
use common::identity::Identity;
use common::share::ShareTag;
use common::store::{DocOrder, DocPath, Document, DriverError, StorageDriver};

use super::Database;

#[derive(Debug, Clone)]
pub struct SqliteDriver {
    database: Database,
}

impl SqliteDriver {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

fn backend(e: sqlx::Error) -> DriverError {
    DriverError::Backend(e.to_string())
}

fn corrupt(e: impl std::fmt::Display) -> DriverError {
    DriverError::Corrupt(e.to_string())
}

fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

#[async_trait::async_trait]
impl StorageDriver for SqliteDriver {
    async fn identities(&self) -> Result<Vec<Identity>, DriverError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT label, secret_key FROM identities ORDER BY created_at ASC, tag ASC")
                .fetch_all(&*self.database)
                .await
                .map_err(backend)?;
        rows.into_iter()
            .map(|(label, secret_hex)| {
                let secret = SecretKey::from_hex(&secret_hex).map_err(corrupt)?;
                Identity::from_parts(label, secret).map_err(corrupt)
            })
            .collect()
    }

    async fn put_identity(&self, identity: &Identity) -> Result<(), DriverError> {
        sqlx::query(
            "INSERT INTO identities (tag, label, secret_key, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(tag) DO UPDATE SET
                 label = excluded.label,
                 secret_key = excluded.secret_key",
        )
        .bind(identity.tag().to_string())
        .bind(identity.label())
        .bind(identity.secret().to_hex())
        .bind(now_micros())
        .execute(&*self.database)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn capabilities(&self) -> Result<Vec<Capability>, DriverError> {
        let rows: Vec<(Vec<u8>,)> =
            sqlx::query_as("SELECT token FROM capabilities ORDER BY share ASC, kind ASC")
                .fetch_all(&*self.database)
                .await
                .map_err(backend)?;
        rows.into_iter()
            .map(|(token,)| Capability::decode(&token).map_err(corrupt))
            .collect()
    }

    async fn put_capability(&self, cap: &Capability) -> Result<(), DriverError> {
        let token = cap.encode().map_err(corrupt)?;
        sqlx::query(
            "INSERT INTO capabilities (share, kind, token, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(share, kind) DO NOTHING",
        )
        .bind(cap.share().to_string())
        .bind(cap.kind().as_str())
        .bind(token)
        .bind(now_micros())
        .execute(&*self.database)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn document(
        &self,
        share: &ShareTag,
        path: &DocPath,
    ) -> Result<Option<Document>, DriverError> {
        let row: Option<(Vec<u8>, i64)> =
            sqlx::query_as("SELECT payload, timestamp FROM documents WHERE share = ?1 AND path = ?2")
                .bind(share.to_string())
                .bind(path.to_string())
                .fetch_optional(&*self.database)
                .await
                .map_err(backend)?;
        Ok(row.map(|(payload, timestamp)| Document {
            path: path.clone(),
            payload: payload.into(),
            timestamp: timestamp as u64,
        }))
    }

    async fn documents(
        &self,
        share: &ShareTag,
        order: DocOrder,
    ) -> Result<Vec<Document>, DriverError> {
        let sql = match order {
            DocOrder::Timestamp => {
                "SELECT path, payload, timestamp FROM documents
                 WHERE share = ?1 ORDER BY timestamp ASC, path ASC"
            }
            DocOrder::Path => {
                "SELECT path, payload, timestamp FROM documents
                 WHERE share = ?1 ORDER BY path ASC"
            }
        };
        let rows: Vec<(String, Vec<u8>, i64)> = sqlx::query_as(sql)
            .bind(share.to_string())
            .fetch_all(&*self.database)
            .await
            .map_err(backend)?;
        rows.into_iter()
            .map(|(path, payload, timestamp)| {
                Ok(Document {
                    path: path.parse().map_err(corrupt)?,
                    payload: payload.into(),
                    timestamp: timestamp as u64,
                })
            })
            .collect()
    }

    async fn put_document(&self, share: &ShareTag, doc: &Document) -> Result<bool, DriverError> {
        let result = sqlx::query(
            "INSERT INTO documents (share, path, payload, timestamp)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(share, path) DO UPDATE SET
                 payload = excluded.payload,
                 timestamp = excluded.timestamp
             WHERE excluded.timestamp > documents.timestamp",
        )
        .bind(share.to_string())
        .bind(doc.path.to_string())
        .bind(doc.payload.as_ref())
        .bind(doc.timestamp as i64)
        .execute(&*self.database)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use common::cap::CapKind;
    use common::peer::Peer;
    use common::share::ShareKeypair;

    use super::*;

    async fn memory_driver() -> SqliteDriver {
        SqliteDriver::new(Database::memory().await.unwrap())
    }

    fn doc(path: &str, payload: &str, timestamp: u64) -> Document {
        Document {
            path: path.parse().unwrap(),
            payload: payload.as_bytes().to_vec().into(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_last_write_wins_upsert() {
        let driver = memory_driver().await;
        let share = ShareKeypair::generate("sqlw").unwrap().tag();

        assert!(driver.put_document(&share, &doc("a", "one", 10)).await.unwrap());
        assert!(!driver.put_document(&share, &doc("a", "old", 9)).await.unwrap());
        assert!(!driver.put_document(&share, &doc("a", "tie", 10)).await.unwrap());
        assert!(driver.put_document(&share, &doc("a", "two", 11)).await.unwrap());

        let stored = driver
            .document(&share, &"a".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payload.as_ref(), b"two");
    }

    #[tokio::test]
    async fn test_document_orderings() {
        let driver = memory_driver().await;
        let share = ShareKeypair::generate("sqlo").unwrap().tag();
        driver.put_document(&share, &doc("z", "z", 1)).await.unwrap();
        driver.put_document(&share, &doc("a", "a", 3)).await.unwrap();

        let by_time: Vec<String> = driver
            .documents(&share, DocOrder::Timestamp)
            .await
            .unwrap()
            .iter()
            .map(|d| d.path.to_string())
            .collect();
        assert_eq!(by_time, ["z", "a"]);

        let by_path: Vec<String> = driver
            .documents(&share, DocOrder::Path)
            .await
            .unwrap()
            .iter()
            .map(|d| d.path.to_string())
            .collect();
        assert_eq!(by_path, ["a", "z"]);
    }

    #[tokio::test]
    async fn test_capability_upsert_is_idempotent() {
        let driver = memory_driver().await;
        let room = ShareKeypair::generate("sqlc").unwrap();
        let cap = Capability::grant(&room, CapKind::Read);

        driver.put_capability(&cap).await.unwrap();
        driver.put_capability(&cap).await.unwrap();
        assert_eq!(driver.capabilities().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_state_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = url::Url::parse(&format!(
            "sqlite://{}",
            dir.path().join("burrow.db").display()
        ))
        .unwrap();

        let tag = {
            let database = Database::connect(&url).await.unwrap();
            let peer = Peer::new(Arc::new(SqliteDriver::new(database)));
            let identity = peer.create_identity("srvr").await.unwrap();

            let room = ShareKeypair::generate("sqlp").unwrap();
            let token = Capability::grant(&room, CapKind::Write).encode().unwrap();
            peer.import_cap(&token).await.unwrap();

            identity.tag()
        };

        // fresh pool over the same file sees the same state
        let database = Database::connect(&url).await.unwrap();
        let peer = Peer::new(Arc::new(SqliteDriver::new(database)));
        let identities = peer.identities().await.unwrap();
        assert_eq!(identities.len(), 1);
        assert_eq!(identities[0].tag(), tag);
        assert_eq!(peer.shares().await.unwrap().len(), 1);
    }
}
