//! # parampool
//!
//! Hierarchical, typed parameter pools for simulation and scientific programs.
//!
//! A program declares its parameters once, as a tree of named groups and typed
//! leaves, and the pool then resolves every value from compiled-in defaults, a
//! saved pool-state file and command-line flags, in that order.
//!
//! ## Features
//!
//! - Typed leaves: `int`, `real`, `bool`, `str` and string `choice`s, with
//!   optional help text, unit and numeric range
//! - Import of foreign parameter descriptions: plain JSON objects, JSON Schema
//!   documents and any Rust type deriving `schemars::JsonSchema`
//! - Atomic override sources with exact-path, flag-form and suffix name lookup
//! - Generated `clap` command with one `--<path>` flag per leaf
//! - Line-oriented pool-state files that can be edited by hand
//! - Deterministic traversal, export into foreign sinks and JSON extraction
//!
//! ## Quick Start
//!
//! ```rust
//! use parampool::data::{PoolBuilder, Value, ValueKind};
//!
//! let mut builder = PoolBuilder::new();
//! builder
//!     .enter_group("Main menu")?
//!     .add("Nx", 10, ValueKind::Int)?
//!     .add("Ny", 10, ValueKind::Int)?
//!     .leave_group()?;
//! let mut pool = builder.finalize();
//!
//! parampool::cli::set_values_from_command_line(&mut pool, ["--Nx", "40"])?;
//! assert_eq!(pool.get("Main menu/Nx")?, &Value::Int(40));
//! # Ok::<(), parampool::PoolError>(())
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Values, items, groups and the pool itself
//! - [`import`] - Foreign description adapters
//! - [`resolve`] - Override sources and their application
//! - [`traverse`] - Visitors, export and JSON extraction
//! - [`serialize`] - Pool-state files
//! - [`cli`] - Command-line flags

/// Parameter tree data structures.
///
/// Values and their coercion, leaf items, groups, and the builder that
/// produces a finalized pool.
pub mod data;

/// Foreign parameter description import.
pub mod import;

/// Override sources applied to a finalized pool.
pub mod resolve;

/// Depth-first traversal and export.
pub mod traverse;

/// Reading and writing pool-state files.
pub mod serialize;

/// Command-line flag surface generated from a pool.
pub mod cli;

mod error;

pub use data::{Pool, PoolBuilder, Value, ValueKind};
pub use error::{Origin, PoolError, Result};
pub use serde_json::Value as JsonValue;
