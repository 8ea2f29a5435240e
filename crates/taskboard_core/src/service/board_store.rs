//! Board state store: the single owner and mutator of the board aggregate.
//!
//! # Responsibility
//! - Apply create/update/delete/move commands atomically.
//! - Enforce referential integrity before every state transition.
//! - Write-through persist after every successful mutation.
//! - Notify registered observers after each state-changing command.
//!
//! # Invariants
//! - No dangling `column_id` is ever observable through queries.
//! - Commands are serialized: mutation requires `&mut self`, so invariant
//!   checks always observe a fully settled prior state.
//! - A failed command leaves the aggregate unchanged; a failed snapshot
//!   save leaves the in-memory mutation applied and surfaces the error.
//! - Queries hand out owned clones or shared borrows, never live mutable
//!   references.

use crate::model::board::{Board, Column, ColumnId, Task, TaskDraft, TaskId, TaskPatch};
use crate::repo::snapshot_repo::{SnapshotError, SnapshotRepository};
use chrono::Utc;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type BoardResult<T> = Result<T, BoardError>;

/// Command error surfaced by the board store.
///
/// Commands targeting an absent task/column id are successful no-ops, not
/// errors; only referential violations and persistence failures surface.
#[derive(Debug)]
pub enum BoardError {
    /// A command referenced a column that does not exist at validation
    /// time. The aggregate is unchanged.
    UnknownColumn(ColumnId),
    /// The durable write failed after the in-memory mutation was applied.
    /// The mutation is not rolled back; the next successful save
    /// reconciles durable state.
    Persistence(SnapshotError),
}

impl Display for BoardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownColumn(id) => write!(f, "column not found: {id}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownColumn(_) => None,
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<SnapshotError> for BoardError {
    fn from(value: SnapshotError) -> Self {
        Self::Persistence(value)
    }
}

/// Mutation notification delivered to observers after a state change.
///
/// No-op commands (absent target id) do not produce events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    ColumnAdded {
        column_id: ColumnId,
    },
    ColumnRemoved {
        column_id: ColumnId,
        /// Tasks cascade-deleted together with the column.
        removed_tasks: Vec<TaskId>,
    },
    ColumnRenamed {
        column_id: ColumnId,
    },
    TaskAdded {
        task_id: TaskId,
        column_id: ColumnId,
    },
    TaskRemoved {
        task_id: TaskId,
    },
    TaskUpdated {
        task_id: TaskId,
    },
    TaskMoved {
        task_id: TaskId,
        from: ColumnId,
        to: ColumnId,
    },
}

/// Subscription contract for UI layers reacting to board mutations.
///
/// Observers are called synchronously after the in-memory mutation and the
/// snapshot save attempt, in subscription order.
pub trait BoardObserver {
    fn board_changed(&self, event: &BoardEvent);
}

/// Handle for removing a subscription.
pub type ObserverId = u64;

/// In-memory authoritative board model with write-through persistence.
///
/// Constructed once at application startup and passed by handle to
/// consumers; there is no process-wide singleton.
pub struct BoardStore<R: SnapshotRepository> {
    repo: R,
    board: Board,
    observers: Vec<(ObserverId, Box<dyn BoardObserver>)>,
    next_observer_id: ObserverId,
}

impl<R: SnapshotRepository> std::fmt::Debug for BoardStore<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardStore")
            .field("board", &self.board)
            .finish_non_exhaustive()
    }
}

impl<R: SnapshotRepository> BoardStore<R> {
    /// Opens the store from the last persisted snapshot, seeding and
    /// persisting the starter board on first run.
    ///
    /// # Errors
    /// - Corrupt or unreadable snapshots are rejected, never repaired.
    /// - A failed seed save fails startup; there is no user mutation to
    ///   preserve yet.
    pub fn open(repo: R) -> BoardResult<Self> {
        let board = match repo.load()? {
            Some(board) => board,
            None => {
                let board = Board::starter(Utc::now());
                repo.save(&board)?;
                info!(
                    "event=board_seed module=store status=ok columns={} tasks={}",
                    board.columns.len(),
                    board.tasks.len()
                );
                board
            }
        };

        Ok(Self {
            repo,
            board,
            observers: Vec::new(),
            next_observer_id: 0,
        })
    }

    /// Opens the store with a caller-provided board, replacing any
    /// persisted snapshot.
    ///
    /// Used by tests and import paths where board content already exists.
    pub fn with_board(repo: R, board: Board) -> BoardResult<Self> {
        board.validate().map_err(SnapshotError::from)?;
        repo.save(&board)?;
        Ok(Self {
            repo,
            board,
            observers: Vec::new(),
            next_observer_id: 0,
        })
    }

    // ----- commands -----

    /// Appends a new column at the end of the display order.
    ///
    /// Empty labels are accepted; input validation lives upstream.
    pub fn add_column(&mut self, label: impl Into<String>) -> BoardResult<ColumnId> {
        let column = Column::new(label);
        let column_id = column.id;
        self.board.columns.push(column);
        info!("event=column_add module=store status=ok column_id={column_id}");
        self.commit(BoardEvent::ColumnAdded { column_id })?;
        Ok(column_id)
    }

    /// Removes the column and, atomically, every task belonging to it.
    ///
    /// Idempotent: unknown ids are successful no-ops.
    pub fn remove_column(&mut self, column_id: ColumnId) -> BoardResult<()> {
        if !self.board.column_exists(column_id) {
            debug!("event=column_remove module=store status=noop column_id={column_id}");
            return Ok(());
        }

        let removed_tasks: Vec<TaskId> = self
            .board
            .tasks
            .iter()
            .filter(|task| task.column_id == column_id)
            .map(|task| task.id)
            .collect();
        self.board.tasks.retain(|task| task.column_id != column_id);
        self.board.columns.retain(|column| column.id != column_id);

        info!(
            "event=column_remove module=store status=ok column_id={column_id} cascaded_tasks={}",
            removed_tasks.len()
        );
        self.commit(BoardEvent::ColumnRemoved {
            column_id,
            removed_tasks,
        })
    }

    /// Renames the column. No-op when the id is unknown.
    ///
    /// Labels are not denormalized onto tasks, so a rename touches no
    /// task timestamps; displays re-derive the label via `column_by_id`.
    pub fn update_column(
        &mut self,
        column_id: ColumnId,
        new_label: impl Into<String>,
    ) -> BoardResult<()> {
        let Some(column) = self
            .board
            .columns
            .iter_mut()
            .find(|column| column.id == column_id)
        else {
            debug!("event=column_update module=store status=noop column_id={column_id}");
            return Ok(());
        };

        column.label = new_label.into();
        info!("event=column_update module=store status=ok column_id={column_id}");
        self.commit(BoardEvent::ColumnRenamed { column_id })
    }

    /// Creates a task in the referenced column.
    ///
    /// # Errors
    /// - `BoardError::UnknownColumn` when `draft.column_id` does not
    ///   resolve; the task set is left unchanged.
    pub fn add_task(&mut self, draft: TaskDraft) -> BoardResult<TaskId> {
        if !self.board.column_exists(draft.column_id) {
            warn!(
                "event=task_add module=store status=error column_id={} error=unknown_column",
                draft.column_id
            );
            return Err(BoardError::UnknownColumn(draft.column_id));
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            due_date: draft.due_date,
            column_id: draft.column_id,
            created_at: now,
            updated_at: now,
        };
        let task_id = task.id;
        let column_id = task.column_id;
        self.board.tasks.push(task);

        info!("event=task_add module=store status=ok task_id={task_id} column_id={column_id}");
        self.commit(BoardEvent::TaskAdded { task_id, column_id })?;
        Ok(task_id)
    }

    /// Removes the task. Idempotent: unknown ids are successful no-ops.
    pub fn remove_task(&mut self, task_id: TaskId) -> BoardResult<()> {
        let before = self.board.tasks.len();
        self.board.tasks.retain(|task| task.id != task_id);
        if self.board.tasks.len() == before {
            debug!("event=task_remove module=store status=noop task_id={task_id}");
            return Ok(());
        }

        info!("event=task_remove module=store status=ok task_id={task_id}");
        self.commit(BoardEvent::TaskRemoved { task_id })
    }

    /// Applies a partial update to the task, refreshing `updated_at`.
    ///
    /// A `column_id` in the patch is re-validated against current columns
    /// before anything is applied, so a failed patch changes nothing.
    /// No-op when the task id is unknown.
    pub fn update_task(&mut self, task_id: TaskId, patch: TaskPatch) -> BoardResult<()> {
        if let Some(column_id) = patch.column_id {
            if !self.board.column_exists(column_id) {
                warn!(
                    "event=task_update module=store status=error task_id={task_id} \
                     column_id={column_id} error=unknown_column"
                );
                return Err(BoardError::UnknownColumn(column_id));
            }
        }

        let Some(task) = self.board.tasks.iter_mut().find(|task| task.id == task_id) else {
            debug!("event=task_update module=store status=noop task_id={task_id}");
            return Ok(());
        };

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(column_id) = patch.column_id {
            task.column_id = column_id;
        }
        task.updated_at = Utc::now();

        info!("event=task_update module=store status=ok task_id={task_id}");
        self.commit(BoardEvent::TaskUpdated { task_id })
    }

    /// Moves the task to the target column, changing only `column_id` and
    /// `updated_at`.
    ///
    /// # Errors
    /// - `BoardError::UnknownColumn` when the target does not exist; the
    ///   check runs even when the task itself is absent.
    pub fn move_task(&mut self, task_id: TaskId, target_column: ColumnId) -> BoardResult<()> {
        if !self.board.column_exists(target_column) {
            warn!(
                "event=task_move module=store status=error task_id={task_id} \
                 column_id={target_column} error=unknown_column"
            );
            return Err(BoardError::UnknownColumn(target_column));
        }

        let Some(task) = self.board.tasks.iter_mut().find(|task| task.id == task_id) else {
            debug!("event=task_move module=store status=noop task_id={task_id}");
            return Ok(());
        };

        let from = task.column_id;
        task.column_id = target_column;
        task.updated_at = Utc::now();

        info!(
            "event=task_move module=store status=ok task_id={task_id} from={from} to={target_column}"
        );
        self.commit(BoardEvent::TaskMoved {
            task_id,
            from,
            to: target_column,
        })
    }

    // ----- queries -----

    /// Tasks belonging to the column; empty for unknown columns.
    pub fn tasks_by_column(&self, column_id: ColumnId) -> Vec<Task> {
        self.board.tasks_by_column(column_id)
    }

    /// Returns a clone of the column, if present.
    pub fn column_by_id(&self, column_id: ColumnId) -> Option<Column> {
        self.board.column_by_id(column_id).cloned()
    }

    /// All columns in display order.
    pub fn columns(&self) -> &[Column] {
        &self.board.columns
    }

    /// The full task set, in no particular order.
    pub fn tasks(&self) -> &[Task] {
        &self.board.tasks
    }

    // ----- observers -----

    /// Registers an observer; returns its removal handle.
    pub fn subscribe(&mut self, observer: Box<dyn BoardObserver>) -> ObserverId {
        let id = self.next_observer_id;
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Removes a subscription; returns whether it existed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Write-through save plus observer notification for an applied
    /// mutation.
    ///
    /// Observers mirror in-memory state, so they are notified even when
    /// the save fails; the persistence error is surfaced afterwards.
    fn commit(&mut self, event: BoardEvent) -> BoardResult<()> {
        let saved = self.repo.save(&self.board);
        if let Err(err) = &saved {
            warn!("event=snapshot_save module=store status=error error={err}");
        }
        for (_, observer) in &self.observers {
            observer.board_changed(&event);
        }
        saved.map_err(BoardError::Persistence)
    }
}
