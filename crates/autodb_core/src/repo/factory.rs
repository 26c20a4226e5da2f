//! Repository factory: one closed `DbService<E>` per discovered entity.
//!
//! # Responsibility
//! - Turn scanned entity descriptors into repositories bound to the shared
//!   context.
//! - Install those repositories into the registry keyed by
//!   `dyn Repository<E>`.
//!
//! # Invariants
//! - Requires `dyn TableSearch` and `RepositoryBase` registrations; returns
//!   `None` without them.
//! - Returns `None`, not an empty map, when no entity types are found.

use crate::db::SharedContext;
use crate::model::entity::{Entity, EntityDescriptor};
use crate::registry::ServiceRegistry;
use crate::repo::db_service::{DbService, Repository};
use crate::scan::TableSearch;
use log::{info, warn};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// A repository erased over its entity type. Holds `Arc<dyn Repository<E>>`.
pub type ErasedRepository = Box<dyn Any + Send + Sync>;

/// Registered base from which every closed repository is built.
#[derive(Clone)]
pub struct RepositoryBase {
    context: SharedContext,
}

impl RepositoryBase {
    pub fn new(context: SharedContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }
}

/// Repositories built in one bootstrap, keyed by entity type name.
pub struct RepositoryMap {
    entries: BTreeMap<&'static str, (EntityDescriptor, ErasedRepository)>,
}

impl RepositoryMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns sorted entity type names.
    pub fn entity_names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Returns the repository built for `E`.
    pub fn get<E: Entity>(&self) -> Option<Arc<dyn Repository<E>>> {
        self.entries
            .get(std::any::type_name::<E>())
            .and_then(|(_, repo)| repo.downcast_ref::<Arc<dyn Repository<E>>>())
            .cloned()
    }

    /// Registers every repository under `dyn Repository<E>`.
    ///
    /// Returns how many were newly registered.
    pub fn install(self, registry: &ServiceRegistry) -> usize {
        self.entries
            .into_values()
            .map(|(descriptor, repo)| descriptor.install_repository(registry, repo))
            .filter(|installed| *installed)
            .count()
    }
}

/// Builds one repository per entity found by the registered scanner.
pub fn create_db_service(registry: &ServiceRegistry) -> Option<RepositoryMap> {
    let started_at = Instant::now();
    let Some(search) = registry.get::<dyn TableSearch>() else {
        warn!("event=repo_create module=repo status=skipped reason=no_table_search");
        return None;
    };
    let Some(base) = registry.get::<RepositoryBase>() else {
        warn!("event=repo_create module=repo status=skipped reason=no_repository_base");
        return None;
    };

    let tables = search.search_table(base.context().namespace());
    if tables.is_empty() {
        info!(
            "event=repo_create module=repo status=empty namespace={}",
            base.context().namespace()
        );
        return None;
    }

    let entries = tables
        .into_iter()
        .map(|descriptor| {
            let repo = descriptor.build_repository(Arc::clone(base.context()));
            (descriptor.type_name(), (descriptor, repo))
        })
        .collect::<BTreeMap<_, _>>();

    info!(
        "event=repo_create module=repo status=ok repositories={} duration_ms={}",
        entries.len(),
        started_at.elapsed().as_millis()
    );
    Some(RepositoryMap { entries })
}

pub(crate) fn build_repository<E: Entity>(context: SharedContext) -> ErasedRepository {
    let repo: Arc<dyn Repository<E>> = Arc::new(DbService::<E>::new(context));
    Box::new(repo)
}

pub(crate) fn install_repository<E: Entity>(
    registry: &ServiceRegistry,
    repo: ErasedRepository,
) -> bool {
    match repo.downcast::<Arc<dyn Repository<E>>>() {
        Ok(repo) => registry.add_instance::<dyn Repository<E>>(*repo),
        Err(_) => false,
    }
}
