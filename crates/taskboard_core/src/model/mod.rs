//! Domain model for the task board aggregate.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one serializable shape for the whole board aggregate.
//!
//! # Invariants
//! - Column and task ids are stable and never reused.
//! - Every task references a column present on the same board.

pub mod board;
