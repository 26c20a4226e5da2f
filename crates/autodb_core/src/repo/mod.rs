//! Generic repository layer and repository factory.
//!
//! # Responsibility
//! - Define the per-entity repository contract consumed by callers.
//! - Build one closed repository per discovered entity type.
//!
//! # Invariants
//! - `None` entities are rejected with `Ok(false)` before any connection opens.
//! - Persistence failures surface as `Err`; nothing is retried or swallowed.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod db_service;
pub mod factory;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
    Detach(serde_json::Error),
    Join(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted entity data: {message}"),
            Self::Detach(err) => write!(f, "failed to detach entity copy: {err}"),
            Self::Join(message) => write!(f, "blocking query task failed: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Detach(err) => Some(err),
            Self::InvalidData(_) | Self::Join(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
