use super::list_models::{ItemPredicate, ListDocument, ListName};
use super::list_store::{ListCollections, ListStore, StoreError};
use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Every list collection shares the same document layout.
const LIST_COLUMNS: &[Column] = &[
    sqlite_column!(
        "owner_id",
        &SqlType::Text,
        is_primary_key = true,
        non_null = true
    ),
    // JSON array of item ids, most recent first
    sqlite_column!("item_ids", &SqlType::Text, non_null = true),
    sqlite_column!(
        "version",
        &SqlType::Integer,
        non_null = true,
        default_value = Some("1")
    ),
    // Unix epoch millis
    sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
];

const WATCHLIST_TABLE: Table = Table {
    name: "watchlist",
    columns: LIST_COLUMNS,
};
const FAVOURITES_TABLE: Table = Table {
    name: "favourites",
    columns: LIST_COLUMNS,
};
const VIEWED_TABLE: Table = Table {
    name: "viewed",
    columns: LIST_COLUMNS,
};
const RECENT_BIDS_TABLE: Table = Table {
    name: "recentbids",
    columns: LIST_COLUMNS,
};
const PURCHASED_TABLE: Table = Table {
    name: "purchased",
    columns: LIST_COLUMNS,
};

pub const LISTS_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[
        WATCHLIST_TABLE,
        FAVOURITES_TABLE,
        VIEWED_TABLE,
        RECENT_BIDS_TABLE,
        PURCHASED_TABLE,
    ],
};

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(2);

/// A single list collection backed by its own SQLite table.
#[derive(Clone)]
pub struct SqliteListStore {
    conn: Arc<Mutex<Connection>>,
    list: ListName,
    lock_timeout: Duration,
}

impl SqliteListStore {
    /// Opens (creating if needed) the lists database and returns a store for every
    /// list name, all sharing one connection.
    ///
    /// `timeout` bounds how long a call waits for the shared connection, and how long a
    /// statement waits on a locked database file, before failing with `StoreError::Timeout`.
    pub fn open_collections<T: AsRef<Path>>(
        db_path: T,
        timeout: Duration,
    ) -> Result<ListCollections> {
        let db_path = db_path.as_ref();
        let conn = LISTS_SCHEMA.open(db_path)?;
        conn.busy_timeout(timeout)
            .context("Failed to set database busy timeout")?;
        info!("Opened lists database at {:?}", db_path);

        let conn = Arc::new(Mutex::new(conn));
        ListCollections::from_fn(|list| {
            Arc::new(SqliteListStore {
                conn: conn.clone(),
                list,
                lock_timeout: timeout,
            }) as Arc<dyn ListStore>
        })
    }

    fn table(&self) -> &'static str {
        self.list.as_str()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        let started = Instant::now();
        loop {
            match self.conn.try_lock() {
                Ok(conn) => return Ok(conn),
                Err(TryLockError::WouldBlock) if started.elapsed() < self.lock_timeout => {
                    std::thread::sleep(LOCK_RETRY_INTERVAL)
                }
                Err(TryLockError::WouldBlock) => {
                    debug!("Gave up waiting for the {} connection", self.list);
                    return Err(StoreError::Timeout);
                }
                Err(TryLockError::Poisoned(_)) => {
                    return Err(StoreError::Other(anyhow!(
                        "Lists database connection lock poisoned"
                    )))
                }
            }
        }
    }

    fn corrupt(&self, owner: &str, reason: String) -> StoreError {
        StoreError::Corrupt {
            list: self.list,
            owner: owner.to_string(),
            reason,
        }
    }

    fn decode_timestamp(&self, owner: &str, millis: i64) -> Result<DateTime<Utc>, StoreError> {
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| self.corrupt(owner, format!("invalid timestamp {}", millis)))
    }

    fn encode_items(item_ids: &[String]) -> Result<String, StoreError> {
        serde_json::to_string(item_ids).map_err(|e| StoreError::Other(e.into()))
    }
}

impl ListStore for SqliteListStore {
    fn list_name(&self) -> ListName {
        self.list
    }

    fn find_by_owner(&self, owner: &str) -> Result<Option<ListDocument>, StoreError> {
        let row = {
            let conn = self.lock()?;
            let row = conn.query_row(
                &format!(
                    "SELECT item_ids, version, created_at, updated_at FROM {} WHERE owner_id = ?1",
                    self.table()
                ),
                params![owner],
                |row| {
                    Ok((
                        row.get::<usize, String>(0)?,
                        row.get::<usize, i64>(1)?,
                        row.get::<usize, i64>(2)?,
                        row.get::<usize, i64>(3)?,
                    ))
                },
            );
            row.optional()?
        };

        let Some((item_ids, version, created_at, updated_at)) = row else {
            debug!("find_by_owner({}, {}) found nothing", self.list, owner);
            return Ok(None);
        };

        let item_ids: Vec<String> = serde_json::from_str(&item_ids)
            .map_err(|e| self.corrupt(owner, format!("undecodable item ids: {}", e)))?;

        Ok(Some(ListDocument {
            owner_id: owner.to_string(),
            item_ids,
            created_at: self.decode_timestamp(owner, created_at)?,
            updated_at: self.decode_timestamp(owner, updated_at)?,
            version: version as u64,
        }))
    }

    fn insert(&self, document: &ListDocument) -> Result<(), StoreError> {
        let item_ids = Self::encode_items(&document.item_ids)?;
        let conn = self.lock()?;
        let result = conn.execute(
            &format!(
                "INSERT INTO {} (owner_id, item_ids, version, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                self.table()
            ),
            params![
                document.owner_id,
                item_ids,
                document.version as i64,
                document.created_at.timestamp_millis(),
                document.updated_at.timestamp_millis(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::AlreadyExists {
                    list: self.list,
                    owner: document.owner_id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn replace(
        &self,
        owner: &str,
        item_ids: &[String],
        updated_at: DateTime<Utc>,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let item_ids = Self::encode_items(item_ids)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET item_ids = ?1, updated_at = ?2, version = version + 1 \
                 WHERE owner_id = ?3 AND version = ?4",
                self.table()
            ),
            params![
                item_ids,
                updated_at.timestamp_millis(),
                owner,
                expected_version as i64
            ],
        )?;

        if changed == 0 {
            debug!(
                "replace({}, {}) expected version {} but the document moved on",
                self.list, owner, expected_version
            );
            return Err(StoreError::VersionConflict {
                list: self.list,
                owner: owner.to_string(),
            });
        }
        Ok(())
    }

    fn delete(&self, owner: &str, expected_version: Option<u64>) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let Some(version) = expected_version else {
            conn.execute(
                &format!("DELETE FROM {} WHERE owner_id = ?1", self.table()),
                params![owner],
            )?;
            return Ok(());
        };

        let changed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE owner_id = ?1 AND version = ?2",
                self.table()
            ),
            params![owner, version as i64],
        )?;
        if changed > 0 {
            return Ok(());
        }

        let still_there: bool = conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE owner_id = ?1", self.table()),
                params![owner],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if still_there {
            return Err(StoreError::VersionConflict {
                list: self.list,
                owner: owner.to_string(),
            });
        }
        Ok(())
    }

    fn count_where(&self, predicate: &ItemPredicate) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count = match predicate {
            ItemPredicate::Contains(item_id) => conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {0} WHERE EXISTS \
                     (SELECT 1 FROM json_each({0}.item_ids) WHERE json_each.value = ?1)",
                    self.table()
                ),
                params![item_id],
                |row| row.get::<usize, i64>(0),
            )?,
        };
        Ok(count as usize)
    }
}
