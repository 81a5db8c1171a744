//! Namespaced response store.
//!
//! A [`Store`] is a handle on one namespace. Namespace enumeration and
//! deletion live on [`CacheDb`] since they span namespaces.

use std::collections::BTreeSet;

use super::connection::CacheDb;
use super::key::CacheKey;
use super::namespace::Namespace;
use crate::Error;
use crate::response::ResponseSnapshot;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response together with its key and write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub key: CacheKey,
    pub response: ResponseSnapshot,
    pub stored_at: String,
}

/// Handle on a single namespace.
#[derive(Debug, Clone)]
pub struct Store {
    db: CacheDb,
    namespace: Namespace,
}

struct EntryRow {
    key_hash: String,
    key: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(key: &CacheKey, response: &ResponseSnapshot) -> Result<Self, Error> {
        let headers_json = response
            .headers_json()
            .map_err(|e| Error::StoreWrite(format!("failed to encode headers for {key}: {e}")))?;
        Ok(Self {
            key_hash: key.digest(),
            key: key.as_str().to_string(),
            status: response.status,
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

const UPSERT_ENTRY: &str = "INSERT INTO entries (namespace, key_hash, key, status, headers_json, body, stored_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(namespace, key_hash) DO UPDATE SET
        key = excluded.key,
        status = excluded.status,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

impl CacheDb {
    /// Open a namespace, creating it if absent. Idempotent.
    pub async fn open_store(&self, namespace: &Namespace) -> Result<Store, Error> {
        let name = namespace.name();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Store { db: self.clone(), namespace: namespace.clone() })
    }

    /// Names of all namespaces starting with `prefix`.
    pub async fn list_namespaces(&self, prefix: &str) -> Result<BTreeSet<String>, Error> {
        let prefix = prefix.to_string();
        self.conn
            .call(move |conn| -> Result<BTreeSet<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT name FROM namespaces WHERE substr(name, 1, length(?1)) = ?1")?;
                let names = stmt
                    .query_map(params![prefix], |row| row.get::<_, String>(0))?
                    .collect::<Result<BTreeSet<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a namespace and all of its entries.
    ///
    /// Returns false if the namespace did not exist.
    pub async fn delete_namespace(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let label = name.clone();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE namespace = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM namespaces WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(|e| match Error::from(e) {
                Error::Database(db) => Error::StoreDelete { namespace: label, reason: db.to_string() },
                other => other,
            })
    }
}

impl Store {
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Look up an entry by key.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<StoreEntry>, Error> {
        let namespace = self.namespace.name();
        let key_hash = key.digest();
        self.db
            .conn
            .call(move |conn| -> Result<Option<StoreEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, status, headers_json, body, stored_at
                    FROM entries WHERE namespace = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![namespace, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                });

                match result {
                    Ok((key, status, headers_json, body, stored_at)) => {
                        let response = ResponseSnapshot::from_stored(status, &headers_json, body)
                            .map_err(|e| Error::InvalidInput(format!("corrupt headers for {key}: {e}")))?;
                        Ok(Some(StoreEntry { key: CacheKey::new(key), response, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite the entry for `key`. Last write wins.
    pub async fn put(&self, key: &CacheKey, response: &ResponseSnapshot) -> Result<(), Error> {
        let row = EntryRow::new(key, response)?;
        let namespace = self.namespace.name();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    UPSERT_ENTRY,
                    params![namespace, row.key_hash, row.key, row.status, row.headers_json, row.body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| match Error::from(e) {
                Error::Database(db) => Error::StoreWrite(db.to_string()),
                other => other,
            })
    }

    /// Write several entries in one transaction: either all land or none do.
    pub async fn put_all(&self, entries: &[(CacheKey, ResponseSnapshot)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(key, response)| EntryRow::new(key, response))
            .collect::<Result<Vec<_>, _>>()?;
        let namespace = self.namespace.name();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(UPSERT_ENTRY)?;
                    for row in &rows {
                        stmt.execute(params![
                            namespace,
                            row.key_hash,
                            row.key,
                            row.status,
                            row.headers_json,
                            row.body,
                            stored_at
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|e| match Error::from(e) {
                Error::Database(db) => Error::StoreWrite(db.to_string()),
                other => other,
            })
    }

    /// All keys in this namespace, oldest write first.
    pub async fn keys(&self) -> Result<Vec<CacheKey>, Error> {
        let namespace = self.namespace.name();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<CacheKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT key FROM entries WHERE namespace = ?1 ORDER BY stored_at ASC, key ASC")?;
                let keys = stmt
                    .query_map(params![namespace], |row| row.get::<_, String>(0).map(CacheKey::new))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this namespace.
    pub async fn len(&self) -> Result<u64, Error> {
        let namespace = self.namespace.name();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE namespace = ?1", params![namespace], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}
