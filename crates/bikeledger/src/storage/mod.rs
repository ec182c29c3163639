//! Storage layer for bikeledger.
//!
//! This module provides `SQLite`-based persistent storage for delivery
//! records and the small key-value table that holds the active session.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::attachment::Attachment;
use crate::auth::{Session, SessionFlag};
use crate::error::{Error, Result};
use crate::record::{DeliveryRecord, Documents, RecordDraft};
use crate::store::RecordBackend;

/// Metadata key under which the active session is kept.
const SESSION_KEY: &str = "session";

const RECORD_COLUMNS: &str = r"
    id, owner_id, bike_number, chassis_number, bike_model, bike_details,
    registration_date, buyer_name, buyer_mobile, buyer_address, sell_amount,
    sale_date, buyer_photo, signature, documents, created_at
";

/// Storage engine for delivery records.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Record insertion with store-assigned id and creation time
/// - Per-owner listing, newest first
/// - The session flag used by the auth gate
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps readers unblocked while a record is being written
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Insert a delivery record for the given owner.
    ///
    /// The id and creation time are assigned here; the draft is stored as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the documents cannot be encoded or the database
    /// operation fails.
    pub fn insert_record(&self, owner_id: &str, draft: &RecordDraft) -> Result<DeliveryRecord> {
        let record = DeliveryRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            // Stored with microsecond precision
            created_at: Utc::now().trunc_subsecs(6),
            details: draft.clone(),
        };

        let documents = serde_json::to_string(&record.details.documents)?;
        let created_at = record
            .created_at
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        self.conn()?.execute(
            r"
            INSERT INTO delivery_records (
                id, owner_id, bike_number, chassis_number, bike_model, bike_details,
                registration_date, buyer_name, buyer_mobile, buyer_address, sell_amount,
                sale_date, buyer_photo, signature, documents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ",
            params![
                record.id,
                record.owner_id,
                draft.bike_number,
                draft.chassis_number,
                draft.bike_model,
                draft.bike_details,
                draft.registration_date.map(|d| d.to_string()),
                draft.buyer_name,
                draft.buyer_mobile,
                draft.buyer_address,
                draft.sell_amount,
                draft.sale_date.to_string(),
                draft.buyer_photo.as_ref().map(Attachment::as_str),
                draft.signature.as_ref().map(Attachment::as_str),
                documents,
                created_at,
            ],
        )?;

        debug!(
            "Inserted record {} for bike {}",
            record.short_id(),
            draft.bike_number
        );
        Ok(record)
    }

    /// Get a record by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: &str) -> Result<Option<DeliveryRecord>> {
        let result = self
            .conn()?
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM delivery_records WHERE id = ?1"),
                [id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(result)
    }

    /// Get every record created by the given owner, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a stored row
    /// cannot be decoded.
    pub fn records_for_owner(&self, owner_id: &str) -> Result<Vec<DeliveryRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM delivery_records WHERE owner_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;

        let records = stmt
            .query_map([owner_id], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Count total records in storage, across all owners.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 =
            self.conn()?
                .query_row("SELECT COUNT(*) FROM delivery_records", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_records = self.count()?;

        let (oldest, newest): (Option<String>, Option<String>) = self.conn()?.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM delivery_records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let oldest_record = oldest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let newest_record = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_records,
            oldest_record,
            newest_record,
            db_size_bytes,
        })
    }

    pub(crate) fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()?
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub(crate) fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            (key, value),
        )?;
        Ok(())
    }

    pub(crate) fn delete_metadata(&self, key: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM metadata WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Convert a database row to a `DeliveryRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<DeliveryRecord> {
        let registration_date: Option<String> = row.get(6)?;
        let sale_date: String = row.get(11)?;
        let buyer_photo: Option<String> = row.get(12)?;
        let signature: Option<String> = row.get(13)?;
        let documents: String = row.get(14)?;
        let created_at: String = row.get(15)?;

        let registration_date = registration_date
            .map(|s| parse_date(6, &s))
            .transpose()?;
        let buyer_photo = buyer_photo
            .map(|s| Attachment::parse(s).map_err(|e| conversion_error(12, e)))
            .transpose()?;
        let signature = signature
            .map(|s| Attachment::parse(s).map_err(|e| conversion_error(13, e)))
            .transpose()?;
        let documents: Documents =
            serde_json::from_str(&documents).map_err(|e| conversion_error(14, e))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| conversion_error(15, e))?
            .with_timezone(&Utc);

        Ok(DeliveryRecord {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            created_at,
            details: RecordDraft {
                bike_number: row.get(2)?,
                chassis_number: row.get(3)?,
                bike_model: row.get(4)?,
                bike_details: row.get(5)?,
                registration_date,
                buyer_name: row.get(7)?,
                buyer_mobile: row.get(8)?,
                buyer_address: row.get(9)?,
                sell_amount: row.get(10)?,
                sale_date: parse_date(11, &sale_date)?,
                buyer_photo,
                signature,
                documents,
            },
        })
    }
}

fn parse_date(column: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| conversion_error(column, e))
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

#[async_trait]
impl RecordBackend for Storage {
    async fn insert(&self, owner_id: &str, draft: &RecordDraft) -> Result<DeliveryRecord> {
        self.insert_record(owner_id, draft)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<DeliveryRecord>> {
        self.records_for_owner(owner_id)
    }
}

impl SessionFlag for Storage {
    fn load(&self) -> Result<Option<Session>> {
        self.get_metadata(SESSION_KEY)?
            .map(|json| serde_json::from_str(&json).map_err(Error::from))
            .transpose()
    }

    fn save(&self, session: &Session) -> Result<()> {
        self.set_metadata(SESSION_KEY, &serde_json::to_string(session)?)
    }

    fn clear(&self) -> Result<()> {
        self.delete_metadata(SESSION_KEY)
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of records stored.
    pub total_records: i64,
    /// Creation time of the oldest record.
    pub oldest_record: Option<DateTime<Utc>>,
    /// Creation time of the newest record.
    pub newest_record: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
