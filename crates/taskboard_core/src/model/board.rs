//! Board aggregate: columns, tasks and their integrity rules.
//!
//! # Responsibility
//! - Define the canonical `Column`/`Task`/`Board` records.
//! - Provide the first-run starter board and integrity validation.
//!
//! # Invariants
//! - Column and task ids are unique within one board.
//! - Every `Task::column_id` resolves to a column on the same board.
//! - Serde field names match the persisted snapshot schema (camelCase).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a column.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type ColumnId = Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// A named lane grouping tasks (e.g. "To Do").
///
/// Column order on the board is display order; the column itself carries
/// no position field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Stable ID, generated at creation, immutable afterwards.
    pub id: ColumnId,
    /// User-visible display string. May be empty; input validation is an
    /// upstream UI concern, the model never rejects it.
    pub label: String,
}

impl Column {
    /// Creates a column with a generated stable ID.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
        }
    }
}

/// A unit of work with title, description, due date and column membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable ID, generated at creation, immutable afterwards.
    pub id: TaskId,
    pub title: String,
    pub description: String,
    /// Calendar deadline; no enforced range.
    pub due_date: DateTime<Utc>,
    /// Back-reference to the owning column. Must resolve on the same board.
    pub column_id: ColumnId,
    /// Set once at creation, never changed.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful mutation of this task.
    pub updated_at: DateTime<Utc>,
}

/// Caller-provided fields for creating a task.
///
/// Id and timestamps are allocated by the store, never by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub column_id: ColumnId,
}

/// Partial update for an existing task. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// Re-validated against current columns when present.
    pub column_id: Option<ColumnId>,
}

/// The whole board aggregate for one user.
///
/// This is also the persisted snapshot shape: the aggregate serializes to
/// `{ "columns": [...], "tasks": [...] }` and round-trips losslessly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Ordered; insertion order is display order.
    pub columns: Vec<Column>,
    /// Unordered; column membership derived via `column_id`.
    pub tasks: Vec<Task>,
}

/// Integrity violation found in a board aggregate.
///
/// Raised when validating loaded snapshots; a running store never
/// produces these states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardIntegrityError {
    DuplicateColumnId(ColumnId),
    DuplicateTaskId(TaskId),
    DanglingColumnRef { task_id: TaskId, column_id: ColumnId },
}

impl Display for BoardIntegrityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateColumnId(id) => write!(f, "duplicate column id: {id}"),
            Self::DuplicateTaskId(id) => write!(f, "duplicate task id: {id}"),
            Self::DanglingColumnRef { task_id, column_id } => write!(
                f,
                "task {task_id} references missing column {column_id}"
            ),
        }
    }
}

impl Error for BoardIntegrityError {}

impl Board {
    /// Builds the first-run starter board: three default lanes and one
    /// welcome task per lane, due 7/3/1 days from `now`.
    pub fn starter(now: DateTime<Utc>) -> Self {
        let todo = Column::new("To Do");
        let in_progress = Column::new("In Progress");
        let done = Column::new("Done");

        let welcome = |title: &str, description: &str, column_id: ColumnId, due_in_days: i64| {
            Task {
                id: Uuid::new_v4(),
                title: title.to_string(),
                description: description.to_string(),
                due_date: now + Duration::days(due_in_days),
                column_id,
                created_at: now,
                updated_at: now,
            }
        };

        let tasks = vec![
            welcome(
                "Welcome to your board",
                "This is your first task. Drag cards between lanes to update them.",
                todo.id,
                7,
            ),
            welcome(
                "Complete project setup",
                "Set up the development environment and install dependencies.",
                in_progress.id,
                3,
            ),
            welcome(
                "Review code",
                "Review the codebase and understand the architecture.",
                done.id,
                1,
            ),
        ];

        Self {
            columns: vec![todo, in_progress, done],
            tasks,
        }
    }

    /// Returns the column with the given id, if present.
    pub fn column_by_id(&self, column_id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == column_id)
    }

    /// Returns whether a column with the given id exists on this board.
    pub fn column_exists(&self, column_id: ColumnId) -> bool {
        self.column_by_id(column_id).is_some()
    }

    /// Returns all tasks belonging to the given column.
    ///
    /// Unknown columns yield an empty vector, never an error.
    pub fn tasks_by_column(&self, column_id: ColumnId) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| task.column_id == column_id)
            .cloned()
            .collect()
    }

    /// Checks id uniqueness and referential integrity of the aggregate.
    ///
    /// # Contract
    /// - Every task's `column_id` must resolve to a column on this board.
    /// - Column and task ids must be unique.
    pub fn validate(&self) -> Result<(), BoardIntegrityError> {
        let mut column_ids = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !column_ids.insert(column.id) {
                return Err(BoardIntegrityError::DuplicateColumnId(column.id));
            }
        }

        let mut task_ids = HashSet::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if !task_ids.insert(task.id) {
                return Err(BoardIntegrityError::DuplicateTaskId(task.id));
            }
            if !column_ids.contains(&task.column_id) {
                return Err(BoardIntegrityError::DanglingColumnRef {
                    task_id: task.id,
                    column_id: task.column_id,
                });
            }
        }

        Ok(())
    }
}
