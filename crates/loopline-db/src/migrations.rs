//! Database migration system.
//!
//! Schema version stored in `PRAGMA user_version`. Migrations are
//! forward-only; a fresh database gets the base schema and then walks the
//! same incremental path as an upgraded one.

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    let mut current_version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(DbError::Sqlite)?;

    if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "Database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    if current_version == 0 {
        tracing::info!("Initializing database schema v1");
        conn.execute_batch(schema::SCHEMA_V1)
            .map_err(DbError::Sqlite)?;
        conn.pragma_update(None, "user_version", 1u32)
            .map_err(DbError::Sqlite)?;
        current_version = 1;
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        tracing::info!("Running migration to v{version}");
        run_migration(conn, version)?;
        conn.pragma_update(None, "user_version", version)
            .map_err(DbError::Sqlite)?;
    }

    Ok(())
}

/// Run a specific migration.
fn run_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        2 => conn
            .execute_batch(schema::MIGRATION_V2)
            .map_err(DbError::Sqlite),
        _ => Err(DbError::Migration(format!(
            "Unknown migration version: {version}"
        ))),
    }
}
