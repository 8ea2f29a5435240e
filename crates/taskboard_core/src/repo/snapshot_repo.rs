//! Board snapshot persistence contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide load/save of the whole board aggregate as one named record.
//! - Keep SQL and JSON encoding details inside the persistence boundary.
//!
//! # Invariants
//! - `save` replaces the previous snapshot in a single atomic upsert; a
//!   failed write leaves the prior snapshot intact.
//! - `load` validates aggregate integrity and rejects corrupt snapshots.

use crate::db::DbError;
use crate::model::board::{Board, BoardIntegrityError};
use chrono::Utc;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default record name the application board is persisted under.
pub const BOARD_SNAPSHOT_NAME: &str = "board";

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Persistence error for snapshot load/save operations.
#[derive(Debug)]
pub enum SnapshotError {
    Db(DbError),
    Encode(serde_json::Error),
    /// Persisted snapshot failed JSON decoding or integrity validation.
    Corrupt(String),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode board snapshot: {err}"),
            Self::Corrupt(message) => write!(f, "corrupt board snapshot: {message}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Corrupt(_) => None,
        }
    }
}

impl From<DbError> for SnapshotError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SnapshotError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<BoardIntegrityError> for SnapshotError {
    fn from(value: BoardIntegrityError) -> Self {
        Self::Corrupt(value.to_string())
    }
}

/// Durable store for the board aggregate.
///
/// One snapshot per repository instance; `save` always replaces the whole
/// record (write-through callers never batch or diff).
pub trait SnapshotRepository {
    /// Reads the last saved snapshot; `None` when none exists (first run).
    fn load(&self) -> SnapshotResult<Option<Board>>;
    /// Serializes and durably writes the full board, replacing any prior
    /// snapshot.
    fn save(&self, board: &Board) -> SnapshotResult<()>;
}

/// SQLite-backed snapshot repository: one named row in the `snapshots`
/// key/value table, body encoded as a JSON document.
pub struct SqliteSnapshotRepository<'conn> {
    conn: &'conn Connection,
    name: String,
}

impl<'conn> SqliteSnapshotRepository<'conn> {
    pub fn new(conn: &'conn Connection, name: impl Into<String>) -> Self {
        Self {
            conn,
            name: name.into(),
        }
    }
}

impl SnapshotRepository for SqliteSnapshotRepository<'_> {
    fn load(&self) -> SnapshotResult<Option<Board>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM snapshots WHERE name = ?1;",
                [self.name.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(body) = body else {
            debug!(
                "event=snapshot_load module=repo status=ok name={} found=false",
                self.name
            );
            return Ok(None);
        };

        let board: Board = serde_json::from_str(&body).map_err(|err| {
            warn!(
                "event=snapshot_load module=repo status=error name={} error={err}",
                self.name
            );
            SnapshotError::Corrupt(format!("snapshot `{}` is not valid JSON: {err}", self.name))
        })?;
        board.validate()?;

        debug!(
            "event=snapshot_load module=repo status=ok name={} found=true columns={} tasks={}",
            self.name,
            board.columns.len(),
            board.tasks.len()
        );
        Ok(Some(board))
    }

    fn save(&self, board: &Board) -> SnapshotResult<()> {
        let body = serde_json::to_string(board).map_err(SnapshotError::Encode)?;

        self.conn.execute(
            "INSERT INTO snapshots (name, body, saved_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                body = excluded.body,
                saved_at = excluded.saved_at;",
            params![
                self.name.as_str(),
                body.as_str(),
                Utc::now().timestamp_millis()
            ],
        )?;

        info!(
            "event=snapshot_save module=repo status=ok name={} columns={} tasks={}",
            self.name,
            board.columns.len(),
            board.tasks.len()
        );
        Ok(())
    }
}
