//! Entity table discovery.
//!
//! # Responsibility
//! - Resolve the set of entity descriptors that belong to a context.
//!
//! # Invariants
//! - The convention scan matches descriptors registered from
//!   `<namespace>::entities` exactly; sub-modules do not match.
//! - The first non-empty convention scan is cached without a key and
//!   returned for every later call, whatever namespace is requested.
//! - An empty scan is not cached.

use crate::model::entity::{descriptor_of, Entity, EntityDescriptor, ENTITIES};
use log::{info, warn};
use once_cell::sync::OnceCell;

/// Module name, below a context's namespace, that holds its entity types.
pub const ENTITIES_MODULE: &str = "entities";

/// Source of the entity types a context persists.
pub trait TableSearch: Send + Sync {
    /// Returns the entity descriptors for the context at `namespace`.
    fn search_table(&self, namespace: &str) -> Vec<EntityDescriptor>;

    /// Returns whether a result has been cached.
    fn scanned(&self) -> bool;
}

/// Scans link-time registered entities by namespace convention.
#[derive(Debug, Default)]
pub struct ConventionTableSearch {
    cache: OnceCell<ScanCache>,
}

#[derive(Debug)]
struct ScanCache {
    namespace: String,
    tables: Vec<EntityDescriptor>,
}

impl ConventionTableSearch {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableSearch for ConventionTableSearch {
    fn search_table(&self, namespace: &str) -> Vec<EntityDescriptor> {
        if let Some(cache) = self.cache.get() {
            if cache.namespace != namespace {
                warn!(
                    "event=table_scan module=scan status=cached requested={} cached={}",
                    namespace, cache.namespace
                );
            }
            return cache.tables.clone();
        }

        let tables = match_namespace(ENTITIES.iter().copied(), namespace);
        if tables.is_empty() {
            info!(
                "event=table_scan module=scan status=empty namespace={}",
                namespace
            );
            return tables;
        }

        let cache = self.cache.get_or_init(|| ScanCache {
            namespace: namespace.to_string(),
            tables,
        });
        info!(
            "event=table_scan module=scan status=ok namespace={} tables={}",
            cache.namespace,
            cache.tables.len()
        );
        cache.tables.clone()
    }

    fn scanned(&self) -> bool {
        self.cache.get().is_some()
    }
}

/// Entity set built by explicit registration; ignores the namespace.
#[derive(Debug, Default, Clone)]
pub struct ExplicitTableSearch {
    tables: Vec<EntityDescriptor>,
}

impl ExplicitTableSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `E`, reusing its link-time descriptor when one exists.
    pub fn with<E: Entity>(mut self) -> Self {
        if self.tables.iter().any(EntityDescriptor::is::<E>) {
            return self;
        }
        let descriptor = descriptor_of::<E>().unwrap_or_else(EntityDescriptor::explicit::<E>);
        self.tables.push(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TableSearch for ExplicitTableSearch {
    fn search_table(&self, _namespace: &str) -> Vec<EntityDescriptor> {
        self.tables.clone()
    }

    fn scanned(&self) -> bool {
        !self.tables.is_empty()
    }
}

/// Returns `<namespace>::entities`.
pub fn entities_namespace(namespace: &str) -> String {
    format!("{namespace}::{ENTITIES_MODULE}")
}

fn match_namespace(
    descriptors: impl Iterator<Item = EntityDescriptor>,
    namespace: &str,
) -> Vec<EntityDescriptor> {
    let wanted = entities_namespace(namespace);
    let mut tables = descriptors
        .filter(|descriptor| descriptor.namespace == wanted)
        .collect::<Vec<_>>();
    tables.sort_by_key(|descriptor| descriptor.table);
    tables
}
