//! Service registry keyed by abstraction type.
//!
//! # Responsibility
//! - Own the register/replace/remove/fetch contract used by bootstrap code.
//!
//! # Invariants
//! - Registration is first-writer-wins.
//! - Lookups on unknown abstractions return `None`.

pub mod service_registry;

pub use service_registry::{Implements, ServiceRegistry};
