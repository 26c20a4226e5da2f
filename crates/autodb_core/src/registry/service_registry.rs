//! Type-keyed service registry.
//!
//! # Responsibility
//! - Map an abstraction type (often a trait object) to a concrete
//!   constructor and an optional shared instance.
//! - Hand out `Arc<A>` values: the shared instance when one was supplied,
//!   otherwise a freshly constructed transient.
//!
//! # Invariants
//! - At most one entry per abstraction; the first registration wins.
//! - `has_instance` is true iff the entry was registered with
//!   `make_instance = true`.
//! - Missing abstractions yield `None`/`false`, never an error.
//! - Safe to share across threads; constructors run outside the lock.

use log::debug;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Conversion from a concrete value into the abstraction it is served as.
///
/// Every `Send + Sync` type implements this for itself. Implement it for a
/// trait object with [`implements!`](crate::implements).
pub trait Implements<A: ?Sized>: Sized {
    /// Wraps `self` as the shared handle stored for `A`.
    fn into_service(self) -> Arc<A>;
}

impl<T: Send + Sync + 'static> Implements<T> for T {
    fn into_service(self) -> Arc<T> {
        Arc::new(self)
    }
}

/// Declares that a concrete type can be served as a trait object.
///
/// ```ignore
/// implements!(EnglishGreeter => dyn Greeter);
/// ```
#[macro_export]
macro_rules! implements {
    ($concrete:ty => $abstraction:ty) => {
        impl $crate::registry::Implements<$abstraction> for $concrete {
            fn into_service(self) -> ::std::sync::Arc<$abstraction> {
                ::std::sync::Arc::new(self)
            }
        }
    };
}

type Constructor<A> = Arc<dyn Fn() -> Arc<A> + Send + Sync>;
type ErasedValue = Box<dyn Any + Send + Sync>;

fn default_constructor<A, C>() -> Constructor<A>
where
    A: ?Sized + Send + Sync + 'static,
    C: Implements<A> + Default + 'static,
{
    Arc::new(|| <C as Implements<A>>::into_service(C::default()))
}

struct Entry {
    abstraction: &'static str,
    concrete: &'static str,
    /// Holds a `Constructor<A>`.
    constructor: ErasedValue,
    /// Holds an `Arc<A>`.
    instance: Option<ErasedValue>,
    make_instance: bool,
}

impl Entry {
    fn new<A>(
        concrete: &'static str,
        constructor: Constructor<A>,
        instance: Option<Arc<A>>,
        make_instance: bool,
    ) -> Self
    where
        A: ?Sized + Send + Sync + 'static,
    {
        let instance = if make_instance {
            instance.map(|instance| Box::new(instance) as ErasedValue)
        } else {
            None
        };
        Self {
            abstraction: type_name::<A>(),
            concrete,
            constructor: Box::new(constructor),
            instance,
            make_instance,
        }
    }
}

/// Registry of services keyed by abstraction type.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: RwLock<HashMap<TypeId, Entry>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `C` as the concrete type served for `A`.
    ///
    /// Returns `false` and changes nothing when `A` is already registered.
    /// With `make_instance = false` a supplied `instance` is discarded.
    pub fn add_type<A, C>(&self, instance: Option<Arc<A>>, make_instance: bool) -> bool
    where
        A: ?Sized + Send + Sync + 'static,
        C: Implements<A> + Default + 'static,
    {
        let constructor = default_constructor::<A, C>();
        let added = self.insert_first::<A>(Entry::new(
            type_name::<C>(),
            constructor,
            instance,
            make_instance,
        ));
        log_add(type_name::<A>(), type_name::<C>(), make_instance, added);
        added
    }

    /// Registers a shared instance for `A`; every lookup returns it.
    ///
    /// Returns `false` and changes nothing when `A` is already registered.
    pub fn add_instance<A>(&self, instance: Arc<A>) -> bool
    where
        A: ?Sized + Send + Sync + 'static,
    {
        let shared = Arc::clone(&instance);
        let constructor: Constructor<A> = Arc::new(move || Arc::clone(&shared));
        let added =
            self.insert_first::<A>(Entry::new("instance", constructor, Some(instance), true));
        log_add(type_name::<A>(), "instance", true, added);
        added
    }

    /// Overwrites the concrete type and instance of an existing entry.
    ///
    /// Returns `false` and does nothing when `A` was never registered.
    pub fn replace_service_value<A, C>(&self, value: Option<Arc<A>>, make_instance: bool) -> bool
    where
        A: ?Sized + Send + Sync + 'static,
        C: Implements<A> + Default + 'static,
    {
        let mut entries = self.write();
        let Some(entry) = entries.get_mut(&TypeId::of::<A>()) else {
            debug!(
                "event=registry_replace module=registry status=skipped reason=not_registered abstraction={}",
                type_name::<A>()
            );
            return false;
        };

        let constructor = default_constructor::<A, C>();
        *entry = Entry::new(type_name::<C>(), constructor, value, make_instance);
        debug!(
            "event=registry_replace module=registry status=ok abstraction={} concrete={} make_instance={}",
            type_name::<A>(),
            type_name::<C>(),
            make_instance
        );
        true
    }

    /// Removes the entry for `A`. Returns whether one existed.
    pub fn remove_type<A>(&self) -> bool
    where
        A: ?Sized + 'static,
    {
        let removed = self.write().remove(&TypeId::of::<A>()).is_some();
        debug!(
            "event=registry_remove module=registry status={} abstraction={}",
            if removed { "ok" } else { "skipped" },
            type_name::<A>()
        );
        removed
    }

    /// Fetches a service for `A`.
    ///
    /// Returns the shared instance when the entry holds one; otherwise builds
    /// a new value on every call, so transient lookups are never pointer-equal.
    pub fn get<A>(&self) -> Option<Arc<A>>
    where
        A: ?Sized + Send + Sync + 'static,
    {
        let constructor = {
            let entries = self.read();
            let entry = entries.get(&TypeId::of::<A>())?;
            if let Some(instance) = entry
                .instance
                .as_ref()
                .and_then(|instance| instance.downcast_ref::<Arc<A>>())
            {
                return Some(Arc::clone(instance));
            }
            Arc::clone(entry.constructor.downcast_ref::<Constructor<A>>()?)
        };
        Some(constructor())
    }

    pub fn is_registered<A>(&self) -> bool
    where
        A: ?Sized + 'static,
    {
        self.read().contains_key(&TypeId::of::<A>())
    }

    /// Returns whether `A` was registered in instance mode.
    pub fn has_instance<A>(&self) -> bool
    where
        A: ?Sized + 'static,
    {
        self.read()
            .get(&TypeId::of::<A>())
            .is_some_and(|entry| entry.make_instance)
    }

    /// Returns the type name of the concrete type registered for `A`.
    pub fn concrete_name<A>(&self) -> Option<&'static str>
    where
        A: ?Sized + 'static,
    {
        self.read()
            .get(&TypeId::of::<A>())
            .map(|entry| entry.concrete)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns sorted abstraction type names.
    pub fn registered_names(&self) -> Vec<&'static str> {
        let mut names = self
            .read()
            .values()
            .map(|entry| entry.abstraction)
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Removes every entry.
    pub fn dispose(&self) {
        let mut entries = self.write();
        let removed = entries.len();
        entries.clear();
        debug!(
            "event=registry_dispose module=registry status=ok removed={}",
            removed
        );
    }

    fn insert_first<A: ?Sized + 'static>(&self, entry: Entry) -> bool {
        let mut entries = self.write();
        if entries.contains_key(&TypeId::of::<A>()) {
            return false;
        }
        entries.insert(TypeId::of::<A>(), entry);
        true
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_add(abstraction: &str, concrete: &str, make_instance: bool, added: bool) {
    if added {
        debug!(
            "event=registry_add module=registry status=ok abstraction={} concrete={} make_instance={}",
            abstraction, concrete, make_instance
        );
    } else {
        debug!(
            "event=registry_add module=registry status=skipped reason=already_registered abstraction={}",
            abstraction
        );
    }
}

impl Debug for ServiceRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("abstractions", &self.registered_names())
            .finish()
    }
}
