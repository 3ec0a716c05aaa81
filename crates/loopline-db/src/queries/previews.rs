//! Preview play query functions (analytics only, no revenue).

use loopline_types::{PreviewPlay, WorkId};
use rusqlite::Connection;

use crate::Result;

/// Record a preview sample.
pub fn insert(conn: &Connection, preview: &PreviewPlay) -> Result<()> {
    conn.execute(
        "INSERT INTO preview_plays (work_id, listener, duration_seconds, played_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            preview.work_id.as_str(),
            preview.listener,
            preview.duration_seconds,
            preview.played_at as i64,
        ],
    )?;
    Ok(())
}

/// Number of previews recorded for a work.
pub fn count_for_work(conn: &Connection, work_id: &WorkId) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM preview_plays WHERE work_id = ?1",
        [work_id.as_str()],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}
