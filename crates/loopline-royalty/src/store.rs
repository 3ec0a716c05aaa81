//! Persistence seams for the engine.
//!
//! The engine never touches SQL directly. [`SqliteStore`] adapts a borrowed
//! `rusqlite::Connection` to the traits; tests substitute in-memory fakes to
//! inject failures.

use loopline_db::queries::{passes, plays, previews, works};
use loopline_types::{
    ContentCategory, Pass, PassId, PassState, PlayRecord, PreviewPlay, SplitModel, Work, WorkId,
    WorkUsage,
};
use rusqlite::Connection;

use crate::Result;

/// Storage for works and their split models.
pub trait WorkStore {
    /// Load a work, including soft-deleted ones.
    fn load_work(&self, work_id: &WorkId) -> Result<Option<Work>>;

    /// Insert or replace a whole work row.
    fn save_work(&self, work: &Work) -> Result<()>;

    /// Live works uploaded by `uploader`.
    fn works_by_uploader(&self, uploader: &str) -> Result<Vec<Work>>;

    /// Live transitive ancestors of a work, each once.
    fn ancestors(&self, work_id: &WorkId) -> Result<Vec<Work>>;

    /// Compare-and-set write of a split model. Returns `false` if
    /// `expected_version` is stale.
    fn update_splits(
        &self,
        work_id: &WorkId,
        splits: &SplitModel,
        expected_version: u64,
        now: u64,
    ) -> Result<bool>;
}

/// Storage for passes, play records and previews.
pub trait PassStore {
    fn insert_pass(&self, pass: &Pass) -> Result<()>;

    fn load_pass(&self, pass_id: &PassId) -> Result<Option<Pass>>;

    fn set_pass_status(&self, pass_id: &PassId, status: PassState) -> Result<()>;

    /// Write `Expired` on every lapsed active pass.
    fn expire_lapsed(&self, now: u64) -> Result<usize>;

    /// Category of a live work, `None` if it is missing or deleted.
    fn work_category(&self, work_id: &WorkId) -> Result<Option<ContentCategory>>;

    /// Insert a play only if its pass is still live at `record.played_at`.
    fn insert_play_if_live(&self, record: &PlayRecord) -> Result<bool>;

    /// `(plays, credits)` under a pass.
    fn play_totals(&self, pass_id: &PassId) -> Result<(u64, u64)>;

    fn usage_by_work(&self, pass_id: &PassId) -> Result<Vec<WorkUsage>>;

    fn insert_preview(&self, preview: &PreviewPlay) -> Result<()>;

    fn preview_count(&self, work_id: &WorkId) -> Result<u64>;
}

/// SQLite-backed store over a borrowed connection.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl WorkStore for SqliteStore<'_> {
    fn load_work(&self, work_id: &WorkId) -> Result<Option<Work>> {
        Ok(works::get(self.conn, work_id)?)
    }

    fn save_work(&self, work: &Work) -> Result<()> {
        Ok(works::save(self.conn, work)?)
    }

    fn works_by_uploader(&self, uploader: &str) -> Result<Vec<Work>> {
        Ok(works::list_by_uploader(self.conn, uploader, false)?)
    }

    fn ancestors(&self, work_id: &WorkId) -> Result<Vec<Work>> {
        let mut found = Vec::new();
        for id in works::ancestors(self.conn, work_id)? {
            if let Some(work) = works::get(self.conn, &id)?.filter(|w| !w.is_deleted) {
                found.push(work);
            }
        }
        Ok(found)
    }

    fn update_splits(
        &self,
        work_id: &WorkId,
        splits: &SplitModel,
        expected_version: u64,
        now: u64,
    ) -> Result<bool> {
        Ok(works::update_splits_if_version(
            self.conn,
            work_id,
            splits,
            expected_version,
            now,
        )?)
    }
}

impl PassStore for SqliteStore<'_> {
    fn insert_pass(&self, pass: &Pass) -> Result<()> {
        Ok(passes::insert(self.conn, pass)?)
    }

    fn load_pass(&self, pass_id: &PassId) -> Result<Option<Pass>> {
        Ok(passes::get(self.conn, pass_id)?)
    }

    fn set_pass_status(&self, pass_id: &PassId, status: PassState) -> Result<()> {
        Ok(passes::set_status(self.conn, pass_id, status)?)
    }

    fn expire_lapsed(&self, now: u64) -> Result<usize> {
        Ok(passes::expire_lapsed(self.conn, now)?)
    }

    fn work_category(&self, work_id: &WorkId) -> Result<Option<ContentCategory>> {
        Ok(works::live_category(self.conn, work_id)?)
    }

    fn insert_play_if_live(&self, record: &PlayRecord) -> Result<bool> {
        Ok(plays::insert_if_live(self.conn, record)?)
    }

    fn play_totals(&self, pass_id: &PassId) -> Result<(u64, u64)> {
        Ok(plays::totals_for_pass(self.conn, pass_id)?)
    }

    fn usage_by_work(&self, pass_id: &PassId) -> Result<Vec<WorkUsage>> {
        Ok(plays::usage_by_work(self.conn, pass_id)?)
    }

    fn insert_preview(&self, preview: &PreviewPlay) -> Result<()> {
        Ok(previews::insert(self.conn, preview)?)
    }

    fn preview_count(&self, work_id: &WorkId) -> Result<u64> {
        Ok(previews::count_for_work(self.conn, work_id)?)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory store with failure injection for engine tests.

    use std::cell::RefCell;
    use std::collections::{BTreeMap, HashSet};

    use super::*;
    use crate::RoyaltyError;

    #[derive(Default)]
    pub(crate) struct MemoryStore {
        works: RefCell<BTreeMap<WorkId, Work>>,
        fail_saves: RefCell<HashSet<WorkId>>,
        race_saves: RefCell<HashSet<WorkId>>,
    }

    impl MemoryStore {
        pub(crate) fn put(&self, work: Work) {
            self.works.borrow_mut().insert(work.id.clone(), work);
        }

        pub(crate) fn get(&self, id: &str) -> Work {
            self.works
                .borrow()
                .get(&WorkId::new(id))
                .cloned()
                .expect("work present in memory store")
        }

        /// Every split write to `id` fails with a storage error.
        pub(crate) fn fail_saves_for(&self, id: &str) {
            self.fail_saves.borrow_mut().insert(WorkId::new(id));
        }

        /// Another writer bumps the version of `id` just before each write.
        pub(crate) fn race_saves_for(&self, id: &str) {
            self.race_saves.borrow_mut().insert(WorkId::new(id));
        }
    }

    impl WorkStore for MemoryStore {
        fn load_work(&self, work_id: &WorkId) -> Result<Option<Work>> {
            Ok(self.works.borrow().get(work_id).cloned())
        }

        fn save_work(&self, work: &Work) -> Result<()> {
            self.put(work.clone());
            Ok(())
        }

        fn works_by_uploader(&self, uploader: &str) -> Result<Vec<Work>> {
            Ok(self
                .works
                .borrow()
                .values()
                .filter(|w| !w.is_deleted && w.uploader.eq_ignore_ascii_case(uploader))
                .cloned()
                .collect())
        }

        fn ancestors(&self, work_id: &WorkId) -> Result<Vec<Work>> {
            let works = self.works.borrow();
            let mut seen = vec![work_id.clone()];
            let mut queue: Vec<WorkId> = works
                .get(work_id)
                .map(|w| w.source_work_ids.clone())
                .unwrap_or_default();
            let mut found = Vec::new();
            while let Some(id) = queue.pop() {
                if seen.contains(&id) {
                    continue;
                }
                seen.push(id.clone());
                if let Some(work) = works.get(&id) {
                    queue.extend(work.source_work_ids.iter().cloned());
                    if !work.is_deleted {
                        found.push(work.clone());
                    }
                }
            }
            Ok(found)
        }

        fn update_splits(
            &self,
            work_id: &WorkId,
            splits: &SplitModel,
            expected_version: u64,
            now: u64,
        ) -> Result<bool> {
            if self.fail_saves.borrow().contains(work_id) {
                return Err(RoyaltyError::Storage(loopline_db::DbError::Constraint(
                    "injected failure".into(),
                )));
            }
            let mut works = self.works.borrow_mut();
            let Some(work) = works.get_mut(work_id) else {
                return Ok(false);
            };
            if self.race_saves.borrow().contains(work_id) {
                work.splits_version += 1;
            }
            if work.splits_version != expected_version {
                return Ok(false);
            }
            work.splits = splits.clone();
            work.splits_version += 1;
            work.updated_at = now;
            Ok(true)
        }
    }
}
