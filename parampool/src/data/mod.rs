//! Parameter tree data structures.
//!
//! - [`value`] - Value kinds, typed values and coercion
//! - [`item`] - Leaf parameters
//! - [`group`] - Named groups of items and subgroups
//! - [`pool`] - Pool construction and path-addressed access

/// Value kinds, typed values and raw-text coercion.
pub mod value;

/// Leaf parameter representation.
pub mod item;

/// Groups of items and nested groups.
pub mod group;

/// Pool builder and finalized pool.
pub mod pool;

pub use group::{Group, Node};
pub use item::Item;
pub use pool::{Pool, PoolBuilder};
pub use value::{CoerceError, Value, ValueKind, ValueTag};
