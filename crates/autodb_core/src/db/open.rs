//! Connection bootstrap utilities for SQLite.
//!
//! # Invariants
//! - Returned connections carry the pragmas requested by [`DbConfig`].
//! - Returned connections have the supplied migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbResult, Migration};
use crate::config::DbConfig;
use log::{debug, error};
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Opens the database file named by `config` and applies pending migrations.
///
/// Called once per repository operation, so success is logged at `debug`.
pub fn open_db(config: &DbConfig, migrations: &[Migration]) -> DbResult<Connection> {
    let started_at = Instant::now();
    let opened = Connection::open(&config.path).map_err(|err| {
        error!(
            "event=db_open module=db status=error mode=file duration_ms={} error_code=db_open_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
        err
    })?;
    finish_open(opened, config, migrations, "file", started_at)
}

/// Opens an in-memory database and applies pending migrations.
///
/// The data disappears with the connection; useful for schema checks only.
pub fn open_db_in_memory(migrations: &[Migration]) -> DbResult<Connection> {
    let started_at = Instant::now();
    let opened = Connection::open_in_memory().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode=memory duration_ms={} error_code=db_open_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
        err
    })?;
    finish_open(opened, &DbConfig::default(), migrations, "memory", started_at)
}

fn finish_open(
    mut conn: Connection,
    config: &DbConfig,
    migrations: &[Migration],
    mode: &str,
    started_at: Instant,
) -> DbResult<Connection> {
    match configure_connection(&mut conn, config, migrations) {
        Ok(()) => {
            debug!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure_connection(
    conn: &mut Connection,
    config: &DbConfig,
    migrations: &[Migration],
) -> DbResult<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    apply_migrations(conn, migrations)?;
    Ok(())
}
