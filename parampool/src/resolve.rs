//! Ordered application of override sources to a finalized pool.
//!
//! Sources are applied in the order given, so later sources win. Each
//! source is atomic: all of its assignments are checked before any is
//! stored, and a single bad assignment leaves the pool untouched.

use std::path::Path;

use log::debug;

use crate::{
    data::{
        pool::{Pool, flag_name},
        value::{Value, ValueTag},
    },
    error::{Origin, PoolError, Result},
};

/// One `name = raw text` pair from a source.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Full path, flag-safe path, or an unambiguous trailing part of a path.
    pub name: String,
    /// Text before coercion.
    pub raw: String,
    /// Type tag stated next to the value, as in pool files.
    pub tag: Option<ValueTag>,
    /// 1-based line number in the originating file.
    pub line: Option<usize>,
}

impl Assignment {
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Assignment {
            name: name.into(),
            raw: raw.into(),
            tag: None,
            line: None,
        }
    }
}

/// A batch of assignments with a common origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    origin: Origin,
    assignments: Vec<Assignment>,
}

impl Source {
    pub fn new(origin: Origin) -> Self {
        Source {
            origin,
            assignments: Vec::new(),
        }
    }

    /// In-memory source labelled `label` in error messages.
    pub fn named(label: impl Into<String>) -> Self {
        Self::new(Origin::Named(label.into()))
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Append an untagged assignment.
    pub fn set(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.push(Assignment::new(name, raw));
        self
    }

    pub fn push(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }
}

fn matches_suffix(path: &str, name: &str) -> bool {
    path.strip_suffix(name)
        .is_some_and(|head| head.is_empty() || head.ends_with('/'))
}

/// Find the leaf path that `name` denotes.
///
/// Tries the exact path, then the flag-safe spelling, then paths ending in
/// `name` at a segment boundary, which must be unique.
pub fn resolve_name<'p>(pool: &'p Pool, name: &str, origin: &Origin) -> Result<&'p str> {
    let name = name.trim_matches('/');
    let leaves = pool.leaf_paths();
    if let Some(path) = leaves.iter().find(|p| p.as_str() == name) {
        return Ok(path.as_str());
    }
    if let Some(path) = leaves.iter().find(|p| flag_name(p) == name) {
        return Ok(path.as_str());
    }
    let candidates: Vec<&'p String> = leaves
        .iter()
        .filter(|p| matches_suffix(p, name) || matches_suffix(&flag_name(p), name))
        .collect();
    match candidates.as_slice() {
        [only] => Ok(only.as_str()),
        [] => Err(PoolError::UnknownParameter {
            name: name.to_string(),
            origin: origin.clone(),
        }),
        many => Err(PoolError::AmbiguousParameter {
            name: name.to_string(),
            origin: origin.clone(),
            candidates: many.iter().map(|p| p.to_string()).collect(),
        }),
    }
}

fn stage(pool: &Pool, origin: &Origin, assignment: &Assignment) -> Result<(String, Value)> {
    let path = resolve_name(pool, &assignment.name, origin)?;
    let item = pool.item(path)?;
    let value = match assignment.tag {
        Some(tag) => tag.parse_raw(&assignment.raw).and_then(|v| item.accept(v)),
        None => item.coerce(&assignment.raw),
    }
    .map_err(|reason| PoolError::InvalidValue {
        path: path.to_string(),
        raw: assignment.raw.clone(),
        reason,
    })?;
    Ok((path.to_string(), value))
}

/// Apply one source atomically; returns the number of values stored.
pub fn apply_source(pool: &mut Pool, source: &Source) -> Result<usize> {
    let mut staged = Vec::with_capacity(source.len());
    for assignment in &source.assignments {
        let entry = stage(pool, &source.origin, assignment).map_err(|err| {
            match (&source.origin, assignment.line) {
                (Origin::PoolFile(file), Some(line)) => PoolError::PoolFileParse {
                    file: file.clone(),
                    line,
                    message: err.to_string(),
                },
                _ => err,
            }
        })?;
        staged.push(entry);
    }
    let count = staged.len();
    pool.commit(staged)?;
    debug!("applied {count} values from {}", source.origin);
    Ok(count)
}

/// Ordered list of sources, later ones taking precedence.
///
/// The pool's compiled-in defaults are the implicit first source.
#[derive(Debug, Clone, Default)]
pub struct SourceResolver {
    sources: Vec<Source>,
}

impl SourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source after those already present.
    pub fn source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    /// Append the contents of a pool-state file.
    pub fn pool_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let source = crate::serialize::read_pool_file(path)?;
        Ok(self.source(source))
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Apply every source in order.
    ///
    /// Stops at the first failing source; sources before it stay applied,
    /// the failing one leaves no trace.
    pub fn resolve(&self, pool: &mut Pool) -> Result<()> {
        for source in &self.sources {
            apply_source(pool, source)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PoolBuilder, ValueKind};

    fn pool() -> Pool {
        let mut builder = PoolBuilder::new();
        builder
            .add_item("Main menu", "Nx", 10, ValueKind::Int)
            .unwrap()
            .add_item("Main menu", "Ny", 10, ValueKind::Int)
            .unwrap()
            .add_item("Main menu", "scheme", "CN", ValueKind::Str)
            .unwrap()
            .add_item("dolfin/krylov", "maximum_iterations", 1000, ValueKind::Int)
            .unwrap()
            .add_item("petsc/krylov", "maximum_iterations", 500, ValueKind::Int)
            .unwrap();
        builder.finalize()
    }

    #[test]
    fn test_name_resolution() {
        let pool = pool();
        let origin = Origin::CommandLine;
        assert_eq!(resolve_name(&pool, "Main menu/Nx", &origin).unwrap(), "Main menu/Nx");
        assert_eq!(resolve_name(&pool, "Main_menu/Nx", &origin).unwrap(), "Main menu/Nx");
        assert_eq!(resolve_name(&pool, "Nx", &origin).unwrap(), "Main menu/Nx");
        assert_eq!(
            resolve_name(&pool, "dolfin/krylov/maximum_iterations", &origin).unwrap(),
            "dolfin/krylov/maximum_iterations"
        );
        assert_eq!(
            resolve_name(&pool, "petsc/krylov/maximum_iterations", &origin).unwrap(),
            "petsc/krylov/maximum_iterations"
        );
        assert!(matches!(
            resolve_name(&pool, "maximum_iterations", &origin),
            Err(PoolError::AmbiguousParameter { candidates, .. }) if candidates.len() == 2
        ));
        assert!(matches!(
            resolve_name(&pool, "x", &origin),
            Err(PoolError::UnknownParameter { .. })
        ));
        // suffix must start at a segment boundary
        assert!(resolve_name(&pool, "menu/Nx", &origin).is_err());
    }

    #[test]
    fn test_precedence() {
        let file = Source::new(Origin::PoolFile("saved.pool".into())).set("Main menu/Nx", "20");
        let cli = Source::new(Origin::CommandLine).set("Nx", "30");

        let mut all = pool();
        SourceResolver::new()
            .source(file.clone())
            .source(cli.clone())
            .resolve(&mut all)
            .unwrap();
        assert_eq!(all.get("Main menu/Nx").unwrap(), &Value::Int(30));

        let mut file_only = pool();
        SourceResolver::new().source(file).resolve(&mut file_only).unwrap();
        assert_eq!(file_only.get("Main menu/Nx").unwrap(), &Value::Int(20));

        let mut defaults = pool();
        SourceResolver::new().resolve(&mut defaults).unwrap();
        assert_eq!(defaults.get("Main menu/Nx").unwrap(), &Value::Int(10));
    }

    #[test]
    fn test_source_is_atomic() {
        let mut pool = pool();
        let before = pool.clone();

        let unknown = Source::new(Origin::CommandLine)
            .set("Nx", "40")
            .set("Nz", "5");
        assert!(matches!(
            apply_source(&mut pool, &unknown),
            Err(PoolError::UnknownParameter { name, .. }) if name == "Nz"
        ));
        assert_eq!(pool, before);

        let invalid = Source::named("test").set("Ny", "7").set("Nx", "lots");
        match apply_source(&mut pool, &invalid) {
            Err(PoolError::InvalidValue { path, raw, .. }) => {
                assert_eq!(path, "Main menu/Nx");
                assert_eq!(raw, "lots");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(pool, before);
    }

    #[test]
    fn test_failing_source_keeps_earlier_ones() {
        let mut pool = pool();
        let result = SourceResolver::new()
            .source(Source::named("first").set("Ny", "11"))
            .source(Source::named("second").set("Ny", "12").set("bogus", "1"))
            .resolve(&mut pool);
        assert!(result.is_err());
        assert_eq!(pool.get("Main menu/Ny").unwrap(), &Value::Int(11));
    }

    #[test]
    fn test_pool_file_errors_carry_line() {
        let mut pool = pool();
        let mut source = Source::new(Origin::PoolFile("state.pool".into()));
        source.push(Assignment {
            line: Some(7),
            ..Assignment::new("Nx", "x")
        });
        match apply_source(&mut pool, &source) {
            Err(PoolError::PoolFileParse { line, file, .. }) => {
                assert_eq!(line, 7);
                assert_eq!(file, Path::new("state.pool"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_tagged_assignment() {
        let mut pool = pool();
        let mut source = Source::named("tagged");
        source.push(Assignment {
            tag: Some(ValueTag::Str),
            ..Assignment::new("scheme", "BE")
        });
        source.push(Assignment {
            tag: Some(ValueTag::Real),
            ..Assignment::new("Nx", "2.5")
        });
        assert!(matches!(
            apply_source(&mut pool, &source),
            Err(PoolError::InvalidValue { .. })
        ));
        source.assignments.pop();
        assert_eq!(apply_source(&mut pool, &source).unwrap(), 1);
        assert_eq!(pool.get("Main menu/scheme").unwrap(), &Value::Str("BE".into()));
    }
}
