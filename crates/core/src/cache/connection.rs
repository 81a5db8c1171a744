//! Opening the shelf database.
//!
//! Both file and in-memory databases get the same pragmas (WAL, foreign
//! keys on) and are migrated before the handle is returned.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Shared handle on the namespace store.
///
/// Statements run one at a time on the tokio-rusqlite worker thread, so
/// concurrent puts to one key resolve as last write wins.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// In-memory database, dropped with the last handle.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fk: i64 = db
            .conn
            .call(|conn| conn.query_row("PRAGMA foreign_keys", [], |row| row.get::<_, i64>(0)))
            .await
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[tokio::test]
    async fn test_open_file_reopens_existing() {
        let path = std::env::temp_dir().join(format!("shelf-test-{}.sqlite", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let db = CacheDb::open(&path).await.unwrap();
        drop(db);
        let reopened = CacheDb::open(&path).await;
        assert!(reopened.is_ok());

        let _ = std::fs::remove_file(&path);
    }
}
