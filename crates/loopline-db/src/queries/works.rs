//! Work & split model query functions.

use loopline_types::{ContentCategory, SplitModel, Work, WorkId};
use rusqlite::{Connection, OptionalExtension};

use crate::{DbError, Result};

const WORK_COLUMNS: &str = "work_id, uploader, title, category, is_draft, splits,
     remixer_stake_pct, splits_version, is_deleted, created_at, updated_at";

/// Insert or update a work row together with its source links.
///
/// The whole row and its sources are written in one transaction. Every save
/// bumps `splits_version`.
pub fn save(conn: &Connection, work: &Work) -> Result<()> {
    let splits_json = serde_json::to_string(&work.splits)?;
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO works
         (work_id, uploader, title, category, is_draft, splits, remixer_stake_pct,
          splits_version, is_deleted, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10)
         ON CONFLICT(work_id) DO UPDATE SET
            title = excluded.title,
            category = excluded.category,
            is_draft = excluded.is_draft,
            splits = excluded.splits,
            remixer_stake_pct = excluded.remixer_stake_pct,
            is_deleted = excluded.is_deleted,
            splits_version = works.splits_version + 1,
            updated_at = excluded.updated_at",
        rusqlite::params![
            work.id.as_str(),
            work.uploader,
            work.title,
            work.category.as_str(),
            work.is_draft,
            splits_json,
            work.remixer_stake_pct,
            work.is_deleted,
            work.created_at as i64,
            work.updated_at as i64,
        ],
    )?;

    tx.execute(
        "DELETE FROM work_sources WHERE work_id = ?1",
        [work.id.as_str()],
    )?;
    for (position, source) in work.source_work_ids.iter().enumerate() {
        tx.execute(
            "INSERT INTO work_sources (work_id, source_work_id, position) VALUES (?1, ?2, ?3)",
            rusqlite::params![work.id.as_str(), source.as_str(), position as i64],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Fetch a work by id, including soft-deleted ones.
pub fn get(conn: &Connection, work_id: &WorkId) -> Result<Option<Work>> {
    let row = conn
        .query_row(
            &format!("SELECT {WORK_COLUMNS} FROM works WHERE work_id = ?1"),
            [work_id.as_str()],
            read_row,
        )
        .optional()?;

    match row {
        Some(row) => {
            let sources = sources(conn, work_id)?;
            Ok(Some(row.into_work(sources)?))
        }
        None => Ok(None),
    }
}

/// List an uploader's works, newest first.
pub fn list_by_uploader(
    conn: &Connection,
    uploader: &str,
    include_deleted: bool,
) -> Result<Vec<Work>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORK_COLUMNS} FROM works
         WHERE uploader = ?1 COLLATE NOCASE AND (?2 OR is_deleted = 0)
         ORDER BY created_at DESC, work_id"
    ))?;

    let rows = stmt
        .query_map(rusqlite::params![uploader, include_deleted], read_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|row| -> Result<Work> {
            let sources = sources(conn, &WorkId::new(row.work_id.clone()))?;
            row.into_work(sources)
        })
        .collect()
}

/// Overwrite a work's splits if nobody else wrote them since `expected_version`.
///
/// Returns `false` when the version moved on (or the work vanished); the
/// caller decides whether that is a conflict.
pub fn update_splits_if_version(
    conn: &Connection,
    work_id: &WorkId,
    splits: &SplitModel,
    expected_version: u64,
    updated_at: u64,
) -> Result<bool> {
    let splits_json = serde_json::to_string(splits)?;
    let updated = conn.execute(
        "UPDATE works
         SET splits = ?1, splits_version = splits_version + 1, updated_at = ?2
         WHERE work_id = ?3 AND splits_version = ?4",
        rusqlite::params![
            splits_json,
            updated_at as i64,
            work_id.as_str(),
            expected_version as i64,
        ],
    )?;
    Ok(updated == 1)
}

/// Soft-delete a work.
pub fn soft_delete(conn: &Connection, work_id: &WorkId, deleted_at: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE works SET is_deleted = 1, updated_at = ?1 WHERE work_id = ?2",
        rusqlite::params![deleted_at as i64, work_id.as_str()],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("work '{work_id}'")));
    }
    Ok(())
}

/// Category of a live (not soft-deleted) work.
pub fn live_category(conn: &Connection, work_id: &WorkId) -> Result<Option<ContentCategory>> {
    let found: Option<String> = conn
        .query_row(
            "SELECT category FROM works WHERE work_id = ?1 AND is_deleted = 0",
            [work_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(category) => Ok(Some(category.parse()?)),
        None => Ok(None),
    }
}

/// Direct sources of a work, in recorded order.
pub fn sources(conn: &Connection, work_id: &WorkId) -> Result<Vec<WorkId>> {
    let mut stmt = conn.prepare(
        "SELECT source_work_id FROM work_sources WHERE work_id = ?1 ORDER BY position",
    )?;
    let ids = stmt
        .query_map([work_id.as_str()], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids.into_iter().map(WorkId).collect())
}

/// Every transitive ancestor of a work. Cycles terminate because `UNION`
/// discards rows already produced.
pub fn ancestors(conn: &Connection, work_id: &WorkId) -> Result<Vec<WorkId>> {
    let mut stmt = conn.prepare(
        "WITH RECURSIVE lineage(id) AS (
             SELECT source_work_id FROM work_sources WHERE work_id = ?1
             UNION
             SELECT ws.source_work_id FROM work_sources ws JOIN lineage l ON ws.work_id = l.id
         )
         SELECT id FROM lineage WHERE id != ?1 ORDER BY id",
    )?;
    let ids = stmt
        .query_map([work_id.as_str()], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids.into_iter().map(WorkId).collect())
}

/// A raw work row before JSON and enum decoding.
#[derive(Debug)]
struct WorkRow {
    work_id: String,
    uploader: String,
    title: String,
    category: String,
    is_draft: bool,
    splits_json: String,
    remixer_stake_pct: Option<u8>,
    splits_version: u64,
    is_deleted: bool,
    created_at: u64,
    updated_at: u64,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkRow> {
    Ok(WorkRow {
        work_id: row.get(0)?,
        uploader: row.get(1)?,
        title: row.get(2)?,
        category: row.get(3)?,
        is_draft: row.get(4)?,
        splits_json: row.get(5)?,
        remixer_stake_pct: row.get(6)?,
        splits_version: row.get::<_, i64>(7)? as u64,
        is_deleted: row.get(8)?,
        created_at: row.get::<_, i64>(9)? as u64,
        updated_at: row.get::<_, i64>(10)? as u64,
    })
}

impl WorkRow {
    fn into_work(self, source_work_ids: Vec<WorkId>) -> Result<Work> {
        let category: ContentCategory = self.category.parse()?;
        let splits: SplitModel = serde_json::from_str(&self.splits_json)?;
        Ok(Work {
            id: WorkId(self.work_id),
            uploader: self.uploader,
            title: self.title,
            category,
            is_draft: self.is_draft,
            source_work_ids,
            splits,
            remixer_stake_pct: self.remixer_stake_pct,
            is_deleted: self.is_deleted,
            splits_version: self.splits_version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
