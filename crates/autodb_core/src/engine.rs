//! Bootstrap of the registry, scanner, factory and repositories.
//!
//! # Responsibility
//! - Wire a database context into a fresh [`ServiceRegistry`] in fixed order:
//!   scanner, repository base, context, scan, entity tables, repositories.
//! - Expose typed repository lookups for application code.
//!
//! # Invariants
//! - Each engine owns its registry; nothing is process-global.
//! - Finding no entity types is not an error; the engine simply serves no
//!   repositories.
//! - After `dispose`, every lookup returns `None`.

use crate::db::migrations::ensure_entity_tables;
use crate::db::{DbContext, SharedContext};
use crate::model::entity::Entity;
use crate::registry::ServiceRegistry;
use crate::repo::db_service::Repository;
use crate::repo::factory::{create_db_service, RepositoryBase};
use crate::repo::RepoResult;
use crate::scan::{ConventionTableSearch, TableSearch};
use log::{error, info};
use std::sync::Arc;
use std::time::Instant;

crate::implements!(ConventionTableSearch => dyn TableSearch);

/// Owner of one bootstrapped registry.
#[derive(Debug)]
pub struct AutoDbEngine {
    registry: ServiceRegistry,
}

impl AutoDbEngine {
    /// Bootstraps `context` with the namespace convention scan.
    pub fn builder<C: DbContext>(context: C) -> RepoResult<Self> {
        let registry = ServiceRegistry::new();
        registry.add_type::<dyn TableSearch, ConventionTableSearch>(
            Some(Arc::new(ConventionTableSearch::new())),
            true,
        );
        Self::finish(registry, context)
    }

    /// Bootstraps `context` with a caller-supplied scanner.
    pub fn builder_with<C: DbContext>(context: C, search: Arc<dyn TableSearch>) -> RepoResult<Self> {
        let registry = ServiceRegistry::new();
        registry.add_instance::<dyn TableSearch>(search);
        Self::finish(registry, context)
    }

    fn finish<C: DbContext>(registry: ServiceRegistry, context: C) -> RepoResult<Self> {
        let started_at = Instant::now();
        let context = Arc::new(context);
        let shared: SharedContext = context.clone();
        let namespace = shared.namespace();

        registry.add_instance::<RepositoryBase>(Arc::new(RepositoryBase::new(Arc::clone(&shared))));
        registry.add_instance::<C>(context);
        registry.add_instance::<dyn DbContext>(Arc::clone(&shared));

        let tables = registry
            .get::<dyn TableSearch>()
            .map(|search| search.search_table(namespace))
            .unwrap_or_default();

        if !tables.is_empty() {
            let prepared = shared
                .open()
                .and_then(|mut conn| ensure_entity_tables(&mut conn, &tables));
            if let Err(err) = prepared {
                error!(
                    "event=engine_build module=engine status=error namespace={} error_code=entity_tables_failed error={}",
                    namespace, err
                );
                return Err(err.into());
            }
        }

        let repositories = create_db_service(&registry)
            .map(|repositories| repositories.install(&registry))
            .unwrap_or(0);

        info!(
            "event=engine_build module=engine status=ok namespace={} tables={} repositories={} duration_ms={}",
            namespace,
            tables.len(),
            repositories,
            started_at.elapsed().as_millis()
        );
        Ok(Self { registry })
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Returns the repository registered for `E`.
    pub fn repository<E: Entity>(&self) -> Option<Arc<dyn Repository<E>>> {
        self.registry.get::<dyn Repository<E>>()
    }

    /// Returns the bootstrapped context as its concrete type.
    pub fn context<C: DbContext>(&self) -> Option<Arc<C>> {
        self.registry.get::<C>()
    }

    /// Clears every registration.
    pub fn dispose(&self) {
        let entries = self.registry.len();
        self.registry.dispose();
        info!(
            "event=engine_dispose module=engine status=ok entries={}",
            entries
        );
    }
}
