//! Integration test crate for the Loopline royalty engine.
//!
//! The library only holds shared fixtures; the tests under `tests/` exercise
//! end-to-end flows across the types, db and royalty crates against an
//! in-memory SQLite database.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p loopline-integration-tests
//! ```

use loopline_royalty::{splits, SqliteStore};
use loopline_types::{ContentCategory, Payee, SplitModel, SplitSlot, Work, WorkId};
use rusqlite::Connection;

/// Base timestamp for test scenarios.
pub const BASE_TIME: u64 = 1_700_000_000;

/// Uploader of most fixture works.
pub const UPLOADER: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// A second, unrelated uploader.
pub const OTHER_UPLOADER: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

/// Wallet a placeholder collaborator eventually registers.
pub const COLLABORATOR_WALLET: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

/// A producer that had a wallet from the start.
pub const PRODUCER_WALLET: &str = "0xdddddddddddddddddddddddddddddddddddddddd";

/// Fresh in-memory database with the full schema.
pub fn test_db() -> Connection {
    loopline_db::open_memory().expect("open in-memory db")
}

pub fn slot(payee: Payee, percentage: u8) -> SplitSlot {
    SplitSlot::new(payee, percentage)
}

/// Unsaved work with the given splits.
pub fn draft_work(id: &str, category: ContentCategory, splits: SplitModel) -> Work {
    Work {
        id: WorkId::new(id),
        uploader: String::new(),
        title: format!("Track {id}"),
        category,
        is_draft: false,
        source_work_ids: Vec::new(),
        splits,
        remixer_stake_pct: None,
        is_deleted: false,
        splits_version: 0,
        created_at: 0,
        updated_at: 0,
    }
}

/// Save a work through the engine's save path on behalf of `uploader`.
pub fn save_as(conn: &Connection, uploader: &str, work: Work) -> Work {
    splits::save_work(&SqliteStore::new(conn), uploader, work, BASE_TIME).expect("save work")
}

/// Load a work straight from the database.
pub fn load(conn: &Connection, id: &str) -> Work {
    loopline_db::queries::works::get(conn, &WorkId::new(id))
        .expect("query work")
        .expect("work exists")
}
