use std::path::PathBuf;

use thiserror::Error;

use crate::data::value::CoerceError;

/// Result alias used throughout the crate.
pub type Result<T, E = PoolError> = std::result::Result<T, E>;

/// Where a batch of override values came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Compiled-in defaults.
    Defaults,
    /// A saved pool-state file.
    PoolFile(PathBuf),
    /// Command-line flags.
    CommandLine,
    /// Any other in-memory source, labelled by the caller.
    Named(String),
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Defaults => write!(f, "defaults"),
            Origin::PoolFile(path) => write!(f, "pool file {}", path.display()),
            Origin::CommandLine => write!(f, "command line"),
            Origin::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Errors raised while building, resolving or serializing a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Two children of one group share a name.
    #[error("duplicate name `{name}` in group `{group}`")]
    DuplicateName {
        /// Path of the group, empty for the root.
        group: String,
        /// The name already taken.
        name: String,
    },

    /// A name that cannot be used as a path segment or flag.
    #[error(
        "invalid parameter name {name:?}: names must be non-empty, must not start with `-` \
         and must not contain `/`, `=` or control characters"
    )]
    InvalidName { name: String },

    /// [`leave_group`](crate::PoolBuilder::leave_group) called at the root.
    #[error("cannot leave group: cursor is already at the root")]
    CursorAtRoot,

    /// No leaf, or no group, at the given path.
    #[error("no parameter at path `{path}`")]
    UnknownPath { path: String },

    /// A default or an assigned typed value does not fit the leaf.
    #[error("type mismatch at `{path}`: {reason}")]
    TypeMismatch {
        path: String,
        reason: CoerceError,
    },

    /// An import would overwrite parameters that already exist.
    #[error("cannot import at `{path}`: it already exists in the pool")]
    ImportConflict { path: String },

    /// A foreign leaf type with no pool counterpart.
    #[error("unsupported foreign type `{type_name}` at `{path}`")]
    UnsupportedType {
        path: String,
        /// Foreign type name, e.g. `array`, `null` or `recursive`.
        type_name: String,
    },

    /// Two leaves share one command-line flag.
    #[error("leaves `{}` share the flag `--{flag}`", paths.join("`, `"))]
    FlagCollision {
        flag: String,
        /// Every leaf path spelled as `flag`.
        paths: Vec<String>,
    },

    /// A source names a parameter the pool does not have.
    #[error("unknown parameter `{name}` from {origin}")]
    UnknownParameter { name: String, origin: Origin },

    /// A short name from a source matches more than one leaf.
    #[error("parameter name `{name}` from {origin} is ambiguous: {}", candidates.join(", "))]
    AmbiguousParameter {
        name: String,
        origin: Origin,
        /// Full paths of the matching leaves.
        candidates: Vec<String>,
    },

    /// Raw text from a source that does not coerce to the leaf's kind.
    #[error("invalid value {raw:?} for `{path}`: {reason}")]
    InvalidValue {
        path: String,
        /// Text as given in the source.
        raw: String,
        reason: CoerceError,
    },

    /// A bad line in a pool-state file, or a bad assignment read from it.
    #[error("{}:{line}: {message}", file.display())]
    PoolFileParse {
        file: PathBuf,
        /// 1-based line number.
        line: usize,
        message: String,
    },

    /// Usage error from the generated command line, e.g. a flag without
    /// its value.
    #[error(transparent)]
    CommandLine(#[from] clap::Error),

    /// Reading or writing a file failed.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed, e.g. in [`extract`](crate::traverse::extract).
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PoolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PoolError::Io {
            path: path.into(),
            source,
        }
    }
}
