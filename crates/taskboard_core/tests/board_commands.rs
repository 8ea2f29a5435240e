use chrono::{Duration, TimeZone, Utc};
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::{
    Board, BoardError, BoardEvent, BoardObserver, BoardStore, ColumnId, SnapshotError,
    SnapshotRepository, SnapshotResult, SqliteSnapshotRepository, TaskDraft, TaskPatch,
};

fn empty_store(conn: &Connection) -> BoardStore<SqliteSnapshotRepository<'_>> {
    let repo = SqliteSnapshotRepository::new(conn, "board");
    BoardStore::with_board(repo, Board::default()).unwrap()
}

fn draft(column_id: ColumnId) -> TaskDraft {
    TaskDraft {
        title: "A".to_string(),
        description: "d".to_string(),
        due_date: Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap(),
        column_id,
    }
}

#[test]
fn add_column_then_add_task_then_query() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let c1 = store.add_column("Todo").unwrap();
    let t1 = store.add_task(draft(c1)).unwrap();

    let tasks = store.tasks_by_column(c1);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, t1);
    assert_eq!(tasks[0].title, "A");
    assert_eq!(tasks[0].column_id, c1);
    assert_eq!(tasks[0].created_at, tasks[0].updated_at);
    assert_eq!(store.column_by_id(c1).unwrap().label, "Todo");
}

#[test]
fn add_task_into_unknown_column_fails_and_leaves_task_set_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let missing = uuid::Uuid::new_v4();
    let err = store.add_task(draft(missing)).unwrap_err();
    assert!(matches!(err, BoardError::UnknownColumn(id) if id == missing));
    assert!(store.tasks().is_empty());
}

#[test]
fn move_task_between_columns() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let c1 = store.add_column("Todo").unwrap();
    let c2 = store.add_column("Done").unwrap();
    let t1 = store.add_task(draft(c1)).unwrap();

    store.move_task(t1, c2).unwrap();

    assert!(store.tasks_by_column(c1).is_empty());
    let in_c2 = store.tasks_by_column(c2);
    assert_eq!(in_c2.len(), 1);
    assert_eq!(in_c2[0].id, t1);
}

#[test]
fn move_task_changes_only_column_and_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let c1 = store.add_column("Todo").unwrap();
    let c2 = store.add_column("Done").unwrap();
    let t1 = store.add_task(draft(c1)).unwrap();
    let other = store.add_task(draft(c1)).unwrap();

    let before = store.tasks_by_column(c1);
    let t1_before = before.iter().find(|task| task.id == t1).unwrap().clone();
    let other_before = before.iter().find(|task| task.id == other).unwrap().clone();

    store.move_task(t1, c2).unwrap();

    let t1_after = store.tasks_by_column(c2).remove(0);
    assert_eq!(t1_after.column_id, c2);
    assert!(t1_after.updated_at >= t1_before.updated_at);
    assert_eq!(t1_after.title, t1_before.title);
    assert_eq!(t1_after.description, t1_before.description);
    assert_eq!(t1_after.due_date, t1_before.due_date);
    assert_eq!(t1_after.created_at, t1_before.created_at);

    let other_after = store
        .tasks_by_column(c1)
        .into_iter()
        .find(|task| task.id == other)
        .unwrap();
    assert_eq!(other_after, other_before);
}

#[test]
fn move_task_to_unknown_column_fails_even_for_unknown_task() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let c1 = store.add_column("Todo").unwrap();
    let t1 = store.add_task(draft(c1)).unwrap();

    let missing = uuid::Uuid::new_v4();
    let err = store.move_task(t1, missing).unwrap_err();
    assert!(matches!(err, BoardError::UnknownColumn(id) if id == missing));
    assert_eq!(store.tasks_by_column(c1).len(), 1);

    // Target check still applies when the task itself is absent.
    let err = store.move_task(uuid::Uuid::new_v4(), missing).unwrap_err();
    assert!(matches!(err, BoardError::UnknownColumn(_)));

    // Unknown task with a valid target is a successful no-op.
    store.move_task(uuid::Uuid::new_v4(), c1).unwrap();
}

#[test]
fn remove_column_cascades_exactly_its_own_tasks() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let c1 = store.add_column("Todo").unwrap();
    let c2 = store.add_column("Done").unwrap();
    let t1 = store.add_task(draft(c1)).unwrap();
    let _t2 = store.add_task(draft(c1)).unwrap();
    let t3 = store.add_task(draft(c2)).unwrap();

    store.remove_column(c1).unwrap();

    assert!(store.column_by_id(c1).is_none());
    assert!(store.tasks_by_column(c1).is_empty());
    assert!(store.tasks().iter().all(|task| task.id != t1));
    let survivors = store.tasks_by_column(c2);
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].id, t3);
    assert_eq!(store.tasks().len(), 1);
}

#[test]
fn removals_are_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let c1 = store.add_column("Todo").unwrap();
    let t1 = store.add_task(draft(c1)).unwrap();

    store.remove_task(t1).unwrap();
    store.remove_task(t1).unwrap();
    assert!(store.tasks().is_empty());

    store.remove_column(c1).unwrap();
    store.remove_column(c1).unwrap();
    assert!(store.columns().is_empty());
}

#[test]
fn update_task_applies_patch_and_revalidates_column() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let c1 = store.add_column("Todo").unwrap();
    let c2 = store.add_column("Done").unwrap();
    let t1 = store.add_task(draft(c1)).unwrap();

    let new_due = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap() + Duration::hours(3);
    store
        .update_task(
            t1,
            TaskPatch {
                title: Some("B".to_string()),
                due_date: Some(new_due),
                column_id: Some(c2),
                ..TaskPatch::default()
            },
        )
        .unwrap();

    let task = store.tasks_by_column(c2).remove(0);
    assert_eq!(task.title, "B");
    assert_eq!(task.description, "d");
    assert_eq!(task.due_date, new_due);

    // Patch referencing a deleted column fails and applies nothing.
    store.remove_column(c2).unwrap();
    let err = store
        .update_task(
            t1,
            TaskPatch {
                column_id: Some(c2),
                ..TaskPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, BoardError::UnknownColumn(id) if id == c2));
}

#[test]
fn update_column_renames_without_touching_tasks() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let c1 = store.add_column("Todo").unwrap();
    let t1 = store.add_task(draft(c1)).unwrap();
    let before = store.tasks_by_column(c1).remove(0);

    store.update_column(c1, "Backlog").unwrap();

    assert_eq!(store.column_by_id(c1).unwrap().label, "Backlog");
    let after = store.tasks_by_column(c1).remove(0);
    assert_eq!(after, before);
    assert_eq!(after.id, t1);
}

#[test]
fn commands_against_unknown_ids_are_noops() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);
    let c1 = store.add_column("Todo").unwrap();

    store.update_column(uuid::Uuid::new_v4(), "x").unwrap();
    store.update_task(uuid::Uuid::new_v4(), TaskPatch::default()).unwrap();
    store.remove_task(uuid::Uuid::new_v4()).unwrap();
    store.remove_column(uuid::Uuid::new_v4()).unwrap();

    assert_eq!(store.columns().len(), 1);
    assert_eq!(store.column_by_id(c1).unwrap().label, "Todo");
    assert!(store.tasks().is_empty());
}

#[test]
fn referential_integrity_holds_after_mixed_command_sequence() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let c1 = store.add_column("Todo").unwrap();
    let c2 = store.add_column("Doing").unwrap();
    let c3 = store.add_column("Done").unwrap();
    let t1 = store.add_task(draft(c1)).unwrap();
    let t2 = store.add_task(draft(c2)).unwrap();
    let _t3 = store.add_task(draft(c2)).unwrap();

    store.move_task(t1, c2).unwrap();
    store.remove_column(c2).unwrap();
    assert!(store.move_task(t2, c2).is_err());
    store.update_column(c3, "Shipped").unwrap();
    let t4 = store.add_task(draft(c3)).unwrap();
    store.move_task(t4, c1).unwrap();
    store.remove_task(t4).unwrap();

    for task in store.tasks() {
        assert!(
            store.column_by_id(task.column_id).is_some(),
            "task {} dangles on column {}",
            task.id,
            task.column_id
        );
    }
}

struct RecordingObserver {
    events: Rc<RefCell<Vec<BoardEvent>>>,
}

impl BoardObserver for RecordingObserver {
    fn board_changed(&self, event: &BoardEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[test]
fn observers_are_notified_after_mutations_but_not_noops() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let events = Rc::new(RefCell::new(Vec::new()));
    let id = store.subscribe(Box::new(RecordingObserver {
        events: Rc::clone(&events),
    }));

    let c1 = store.add_column("Todo").unwrap();
    let t1 = store.add_task(draft(c1)).unwrap();
    store.remove_task(uuid::Uuid::new_v4()).unwrap();
    store.remove_column(c1).unwrap();

    let seen = events.borrow().clone();
    assert_eq!(
        seen,
        vec![
            BoardEvent::ColumnAdded { column_id: c1 },
            BoardEvent::TaskAdded {
                task_id: t1,
                column_id: c1
            },
            BoardEvent::ColumnRemoved {
                column_id: c1,
                removed_tasks: vec![t1]
            },
        ]
    );

    assert!(store.unsubscribe(id));
    assert!(!store.unsubscribe(id));
    store.add_column("Quiet").unwrap();
    assert_eq!(events.borrow().len(), 3);
}

/// Snapshot repository stub whose saves can be flipped into a failing
/// mode at runtime, for exercising persistence-failure semantics.
struct FlakyRepo {
    board: Board,
    fail_saves: Rc<Cell<bool>>,
}

impl SnapshotRepository for FlakyRepo {
    fn load(&self) -> SnapshotResult<Option<Board>> {
        Ok(Some(self.board.clone()))
    }

    fn save(&self, _board: &Board) -> SnapshotResult<()> {
        if self.fail_saves.get() {
            return Err(SnapshotError::Corrupt("disk unavailable".to_string()));
        }
        Ok(())
    }
}

#[test]
fn persistence_failure_keeps_in_memory_mutation_applied() {
    let column = taskboard_core::Column::new("Todo");
    let column_id = column.id;
    let board = Board {
        columns: vec![column],
        tasks: vec![],
    };

    let fail_saves = Rc::new(Cell::new(false));
    let mut store = BoardStore::open(FlakyRepo {
        board,
        fail_saves: Rc::clone(&fail_saves),
    })
    .unwrap();

    let t1 = store.add_task(draft(column_id)).unwrap();
    let events = Rc::new(RefCell::new(Vec::new()));
    store.subscribe(Box::new(RecordingObserver {
        events: Rc::clone(&events),
    }));

    fail_saves.set(true);
    let err = store.remove_task(t1).unwrap_err();
    assert!(matches!(err, BoardError::Persistence(_)));

    // The mutation is reported as failed but never rolled back, and
    // observers still learn about the in-memory change.
    assert!(store.tasks().is_empty());
    assert_eq!(
        events.borrow().as_slice(),
        [BoardEvent::TaskRemoved { task_id: t1 }]
    );

    // The next successful save reconciles; the command succeeds again.
    fail_saves.set(false);
    store.add_column("Recovered").unwrap();
}
