//! Entity contract for persisted types.
//!
//! # Responsibility
//! - Define how a Rust type maps onto one SQLite table.
//! - Register entity descriptors for discovery at link time.

pub mod entity;
