//! SQLite migration executor and entity table bootstrap.
//!
//! # Invariants
//! - `version` values must be strictly increasing within one migration list.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Entity tables are created with `IF NOT EXISTS` SQL and never altered.

use crate::db::{DbError, DbResult};
use crate::model::entity::EntityDescriptor;
use log::info;
use rusqlite::Connection;

/// One schema step owned by a database context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: u32,
    pub sql: &'static str,
}

/// Returns the latest version in `migrations`, or 0 for an empty list.
pub fn latest_version(migrations: &[Migration]) -> u32 {
    migrations.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection in one transaction.
pub fn apply_migrations(conn: &mut Connection, migrations: &[Migration]) -> DbResult<()> {
    ensure_monotonic(migrations)?;

    let current_version = current_user_version(conn)?;
    let latest = latest_version(migrations);

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in migrations
        .iter()
        .filter(|migration| migration.version > current_version)
    {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

/// Creates the table of every descriptor that does not exist yet.
pub fn ensure_entity_tables(conn: &mut Connection, tables: &[EntityDescriptor]) -> DbResult<()> {
    let tx = conn.transaction()?;
    for table in tables {
        tx.execute_batch(table.create_sql)?;
    }
    tx.commit()?;
    Ok(())
}

/// Returns `PRAGMA user_version` of the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn ensure_monotonic(migrations: &[Migration]) -> DbResult<()> {
    for pair in migrations.windows(2) {
        if pair[1].version <= pair[0].version {
            return Err(DbError::NonMonotonicMigration {
                previous: pair[0].version,
                version: pair[1].version,
            });
        }
    }
    Ok(())
}
