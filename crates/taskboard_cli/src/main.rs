//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `taskboard_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use std::error::Error;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::{BoardStore, SqliteSnapshotRepository, BOARD_SNAPSHOT_NAME};

fn main() {
    println!("taskboard_core version={}", taskboard_core::core_version());
    if let Err(err) = smoke() {
        eprintln!("smoke check failed: {err}");
        std::process::exit(1);
    }
}

fn smoke() -> Result<(), Box<dyn Error>> {
    let conn = open_db_in_memory()?;
    let repo = SqliteSnapshotRepository::new(&conn, BOARD_SNAPSHOT_NAME);
    let store = BoardStore::open(repo)?;

    for column in store.columns() {
        println!(
            "lane `{}` tasks={}",
            column.label,
            store.tasks_by_column(column.id).len()
        );
    }
    Ok(())
}
