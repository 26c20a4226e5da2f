//! Entity contract and compile-time entity descriptors.
//!
//! # Responsibility
//! - Describe how one Rust type maps onto one SQLite table.
//! - Collect descriptors at link time so the scanner can find them without
//!   runtime reflection.
//! - Provide the value-copy boundary used before entities are staged.
//!
//! # Invariants
//! - `values()` yields exactly one value per entry of `COLUMNS`, in order.
//! - `from_row` reads columns by name; the key column is always selected.
//! - A detached copy never shares storage with the caller's instance.

use crate::db::SharedContext;
use crate::registry::ServiceRegistry;
use crate::repo::factory::{build_repository, install_repository, ErasedRepository};
use crate::repo::{RepoError, RepoResult};
use linkme::distributed_slice;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;
use std::fmt::{Debug, Formatter};

/// A persistable record backed by one table.
///
/// The serde bounds carry the clone-before-track boundary: see [`detach`].
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;
    /// Non-key columns, in the order produced by [`Entity::values`].
    const COLUMNS: &'static [&'static str];
    /// `CREATE TABLE IF NOT EXISTS` statement for [`Entity::TABLE`].
    const CREATE_SQL: &'static str;

    fn key(&self) -> Value;
    fn values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// Static description of one entity type, erased over the type itself.
#[derive(Clone, Copy)]
pub struct EntityDescriptor {
    pub namespace: &'static str,
    pub table: &'static str,
    pub create_sql: &'static str,
    type_name: fn() -> &'static str,
    type_id: fn() -> TypeId,
    build: fn(SharedContext) -> ErasedRepository,
    install: fn(&ServiceRegistry, ErasedRepository) -> bool,
}

impl EntityDescriptor {
    /// Describes `E` as registered from module `namespace`.
    pub const fn of<E: Entity>(namespace: &'static str) -> Self {
        Self {
            namespace,
            table: E::TABLE,
            create_sql: E::CREATE_SQL,
            type_name: std::any::type_name::<E>,
            type_id: TypeId::of::<E>,
            build: build_repository::<E>,
            install: install_repository::<E>,
        }
    }

    /// Describes `E` with the namespace taken from its own type path.
    pub fn explicit<E: Entity>() -> Self {
        let type_name = std::any::type_name::<E>();
        let namespace = type_name
            .rsplit_once("::")
            .map_or("", |(namespace, _)| namespace);
        Self::of::<E>(namespace)
    }

    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    pub fn is<E: Entity>(&self) -> bool {
        self.type_id() == TypeId::of::<E>()
    }

    /// Builds the closed `DbService` for this entity over `context`.
    pub fn build_repository(&self, context: SharedContext) -> ErasedRepository {
        (self.build)(context)
    }

    /// Registers a repository built by [`EntityDescriptor::build_repository`].
    ///
    /// Returns `false` when the abstraction was already registered or the
    /// repository belongs to another entity type.
    pub fn install_repository(&self, registry: &ServiceRegistry, repo: ErasedRepository) -> bool {
        (self.install)(registry, repo)
    }
}

impl Debug for EntityDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("type_name", &self.type_name())
            .field("namespace", &self.namespace)
            .field("table", &self.table)
            .finish()
    }
}

/// Every entity registered with [`register_entity!`](crate::register_entity).
#[distributed_slice]
pub static ENTITIES: [EntityDescriptor] = [..];

/// Returns the registered descriptor of `E`, if any.
pub fn descriptor_of<E: Entity>() -> Option<EntityDescriptor> {
    ENTITIES.iter().copied().find(EntityDescriptor::is::<E>)
}

/// Produces an independent copy of `entity` through a serde value round-trip.
pub fn detach<E: Serialize + DeserializeOwned>(entity: &E) -> RepoResult<E> {
    let value = serde_json::to_value(entity).map_err(RepoError::Detach)?;
    serde_json::from_value(value).map_err(RepoError::Detach)
}

/// Registers an entity type for the convention scan.
///
/// The namespace recorded is the module the macro is invoked from, so entity
/// types belong in a module named `entities` below their context.
#[macro_export]
macro_rules! register_entity {
    ($entity:ty) => {
        const _: () = {
            #[$crate::__private::linkme::distributed_slice($crate::model::entity::ENTITIES)]
            #[linkme(crate = $crate::__private::linkme)]
            static DESCRIPTOR: $crate::model::entity::EntityDescriptor =
                $crate::model::entity::EntityDescriptor::of::<$entity>(module_path!());
        };
    };
}
