//! Listening pass query functions.

use loopline_types::{Pass, PassId, PassState};
use rusqlite::{Connection, OptionalExtension};

use crate::{DbError, Result};

/// Insert a new pass.
pub fn insert(conn: &Connection, pass: &Pass) -> Result<()> {
    conn.execute(
        "INSERT INTO passes (pass_id, payer, tx_reference, purchased_at, expires_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            pass.id.as_str(),
            pass.payer,
            pass.tx_reference,
            pass.purchased_at as i64,
            pass.expires_at as i64,
            pass.status.as_str(),
        ],
    )?;
    Ok(())
}

/// Fetch a pass by id.
pub fn get(conn: &Connection, pass_id: &PassId) -> Result<Option<Pass>> {
    let row = conn
        .query_row(
            "SELECT pass_id, payer, tx_reference, purchased_at, expires_at, status
             FROM passes WHERE pass_id = ?1",
            [pass_id.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)? as u64,
                    row.get::<_, i64>(4)? as u64,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, payer, tx_reference, purchased_at, expires_at, status)) => Ok(Some(Pass {
            id: PassId(id),
            payer,
            tx_reference,
            purchased_at,
            expires_at,
            status: status.parse()?,
        })),
        None => Ok(None),
    }
}

/// Set the stored status of a pass.
pub fn set_status(conn: &Connection, pass_id: &PassId, status: PassState) -> Result<()> {
    let updated = conn.execute(
        "UPDATE passes SET status = ?1 WHERE pass_id = ?2",
        rusqlite::params![status.as_str(), pass_id.as_str()],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("pass '{pass_id}'")));
    }
    Ok(())
}

/// Mark every lapsed active pass as expired. Returns the number touched.
pub fn expire_lapsed(conn: &Connection, now: u64) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE passes SET status = 'expired' WHERE status = 'active' AND expires_at <= ?1",
        [now as i64],
    )?;
    Ok(updated)
}
