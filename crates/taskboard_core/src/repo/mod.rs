//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the snapshot persistence contract consumed by the board store.
//! - Isolate SQLite and JSON encoding details from service orchestration.
//!
//! # Invariants
//! - Load paths must reject invalid persisted state instead of masking it.
//! - Save paths replace the full snapshot atomically.

pub mod snapshot_repo;
