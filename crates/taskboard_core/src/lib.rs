//! Core domain logic for the task board.
//! This crate is the single source of truth for board invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{
    Board, BoardIntegrityError, Column, ColumnId, Task, TaskDraft, TaskId, TaskPatch,
};
pub use repo::snapshot_repo::{
    SnapshotError, SnapshotRepository, SnapshotResult, SqliteSnapshotRepository,
    BOARD_SNAPSHOT_NAME,
};
pub use service::board_store::{
    BoardError, BoardEvent, BoardObserver, BoardResult, BoardStore, ObserverId,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
