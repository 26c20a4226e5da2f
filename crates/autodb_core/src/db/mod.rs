//! SQLite storage bootstrap, context contract and per-call sessions.
//!
//! # Responsibility
//! - Open and configure SQLite connections for a database context.
//! - Apply context migrations and entity tables in deterministic order.
//! - Provide short-lived write sessions that stage detached entity copies.
//!
//! # Invariants
//! - Every repository operation opens its own connection and drops it before
//!   returning. Nothing here caches a connection.
//! - Migration version is tracked via `PRAGMA user_version`.

use crate::config::DbConfig;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod migrations;
mod open;
pub mod session;

pub use migrations::Migration;
pub use open::{open_db, open_db_in_memory};
pub use session::{DbSession, EntityState};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    NonMonotonicMigration {
        previous: u32,
        version: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::NonMonotonicMigration { previous, version } => write!(
                f,
                "migration version {version} does not follow {previous}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::NonMonotonicMigration { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// A database context: where the data lives and which entities belong to it.
///
/// Entity types are discovered under `<namespace>::entities`, so the usual
/// implementation of [`DbContext::namespace`] is `module_path!()` evaluated
/// in the module that declares the context.
pub trait DbContext: Send + Sync + 'static {
    /// Module path used by the convention scan.
    fn namespace(&self) -> &'static str;

    fn config(&self) -> &DbConfig;

    /// Schema migrations applied on every open, before entity tables exist.
    fn migrations(&self) -> &'static [Migration] {
        &[]
    }

    /// Opens a fresh, migrated connection.
    fn open(&self) -> DbResult<Connection> {
        open_db(self.config(), self.migrations())
    }
}

/// Context handle shared by every repository built for one engine.
pub type SharedContext = Arc<dyn DbContext>;
