//! Auto-registered repositories over SQLite.
//!
//! A database context names a module; entity types registered with
//! [`register_entity!`] in its `entities` sub-module are discovered at
//! bootstrap, their tables are created, and one [`DbService`] per entity is
//! registered in the engine's [`ServiceRegistry`] under `dyn Repository<E>`.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod query;
pub mod registry;
pub mod repo;
pub mod scan;
mod sql;

pub use config::{ConfigError, DbConfig};
pub use db::{DbContext, DbError, DbResult, DbSession, EntityState, Migration, SharedContext};
pub use engine::AutoDbEngine;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entity::{detach, Entity, EntityDescriptor};
pub use query::{extender, Extender, Filter, ListQuery, Listing, OrderBy, Page, MIN_TAKE};
pub use registry::{Implements, ServiceRegistry};
pub use repo::db_service::{DbService, Repository};
pub use repo::factory::{create_db_service, RepositoryBase, RepositoryMap};
pub use repo::{RepoError, RepoResult};
pub use scan::{ConventionTableSearch, ExplicitTableSearch, TableSearch};

#[doc(hidden)]
pub mod __private {
    pub use linkme;
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
