//! Metered play record query functions.
//!
//! Play records are insert-only; an `UPDATE` trigger enforces it.

use loopline_types::{PassId, PlayRecord, WorkId, WorkUsage};
use rusqlite::Connection;

use crate::Result;

/// Insert a play record only if its pass is still active and unexpired at
/// `played_at`. The liveness check and the insert run as one statement.
///
/// Returns `false` if the pass was not live.
pub fn insert_if_live(conn: &Connection, record: &PlayRecord) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO play_records
         (play_id, pass_id, work_id, category, credits, duration_seconds, played_at)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
         WHERE EXISTS (
             SELECT 1 FROM passes
             WHERE pass_id = ?2 AND status = 'active' AND expires_at > ?7
         )",
        rusqlite::params![
            record.id,
            record.pass_id.as_str(),
            record.work_id.as_str(),
            record.category.as_str(),
            record.credits,
            record.duration_seconds,
            record.played_at as i64,
        ],
    )?;
    Ok(inserted == 1)
}

/// Total play count and credits under a pass.
pub fn totals_for_pass(conn: &Connection, pass_id: &PassId) -> Result<(u64, u64)> {
    let (plays, credits): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(credits), 0) FROM play_records WHERE pass_id = ?1",
        [pass_id.as_str()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((plays as u64, credits as u64))
}

/// Per-work play and credit aggregates under a pass, highest credits first.
pub fn usage_by_work(conn: &Connection, pass_id: &PassId) -> Result<Vec<WorkUsage>> {
    let mut stmt = conn.prepare(
        "SELECT work_id, COUNT(*), SUM(credits)
         FROM play_records WHERE pass_id = ?1
         GROUP BY work_id
         ORDER BY SUM(credits) DESC, work_id",
    )?;

    let rows = stmt
        .query_map([pass_id.as_str()], |row| {
            Ok(WorkUsage {
                work_id: WorkId(row.get(0)?),
                plays: row.get::<_, i64>(1)? as u64,
                credits: row.get::<_, i64>(2)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// All play records under a pass, oldest first.
pub fn list_for_pass(conn: &Connection, pass_id: &PassId) -> Result<Vec<PlayRecord>> {
    let mut stmt = conn.prepare(
        "SELECT play_id, pass_id, work_id, category, credits, duration_seconds, played_at
         FROM play_records WHERE pass_id = ?1
         ORDER BY played_at, play_id",
    )?;

    let raw = stmt
        .query_map([pass_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, Option<u32>>(5)?,
                row.get::<_, i64>(6)? as u64,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|row| -> Result<PlayRecord> {
            let (id, pass_id, work_id, category, credits, duration_seconds, played_at) = row;
            Ok(PlayRecord {
                id,
                pass_id: PassId(pass_id),
                work_id: WorkId(work_id),
                category: category.parse()?,
                credits,
                duration_seconds,
                played_at,
            })
        })
        .collect()
}
