use log::debug;

use crate::{
    data::{
        group::{Group, Node},
        item::Item,
        value::{Value, ValueKind},
    },
    error::{PoolError, Result},
    traverse,
};

/// Path separator between group and item names.
pub const SEPARATOR: char = '/';

/// Split a `/`-joined path into its segments.
///
/// Leading and trailing separators are ignored; `None` for empty inner
/// segments such as `a//b`.
pub fn split_path(path: &str) -> Option<Vec<&str>> {
    let trimmed = path.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        return Some(Vec::new());
    }
    let segments: Vec<&str> = trimmed.split(SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

/// Join a group path and a child name.
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{name}")
    }
}

/// Flag-safe spelling of a path: whitespace becomes `_`.
pub fn flag_name(path: &str) -> String {
    path.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Reject names that cannot appear in a path, a flag or a pool-file line.
///
/// A name must be non-empty, must not start with `-` and must not contain
/// the separator, `=` or control characters.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('-')
        || name.contains([SEPARATOR, '='])
        || name.chars().any(char::is_control)
    {
        return Err(PoolError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Mutable pool under construction.
///
/// Items are added at a cursor that moves with [`enter_group`] and
/// [`leave_group`], or at an explicit group path. [`finalize`] freezes the
/// shape.
///
/// [`enter_group`]: PoolBuilder::enter_group
/// [`leave_group`]: PoolBuilder::leave_group
/// [`finalize`]: PoolBuilder::finalize
#[derive(Debug, Clone, Default)]
pub struct PoolBuilder {
    root: Group,
    cursor: Vec<String>,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor as a `/`-joined path, empty at the root.
    pub fn cursor(&self) -> String {
        self.cursor.join("/")
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Enter a subgroup of the cursor, creating it when absent.
    pub fn enter_group(&mut self, name: &str) -> Result<&mut Self> {
        check_name(name)?;
        let mut segments = self.cursor.clone();
        segments.push(name.to_string());
        self.ensure_group(&segments)?;
        self.cursor = segments;
        Ok(self)
    }

    /// Move the cursor to the parent group.
    pub fn leave_group(&mut self) -> Result<&mut Self> {
        if self.cursor.pop().is_none() {
            return Err(PoolError::CursorAtRoot);
        }
        Ok(self)
    }

    /// Add an item to the group under the cursor.
    pub fn add(
        &mut self,
        name: &str,
        default: impl Into<Value>,
        kind: ValueKind,
    ) -> Result<&mut Self> {
        let group_path = self.cursor();
        self.add_item(&group_path, name, default, kind)
    }

    /// Add an item to the group at `group_path`, creating missing groups.
    pub fn add_item(
        &mut self,
        group_path: &str,
        name: &str,
        default: impl Into<Value>,
        kind: ValueKind,
    ) -> Result<&mut Self> {
        let item = Item::new(name, kind, default).map_err(|reason| PoolError::TypeMismatch {
            path: join_path(group_path, name),
            reason,
        })?;
        self.insert(group_path, item)
    }

    /// Add a prepared item (with help, unit or range) under the cursor.
    pub fn push(&mut self, item: Item) -> Result<&mut Self> {
        let group_path = self.cursor();
        self.insert(&group_path, item)
    }

    /// Add a prepared item to the group at `group_path`.
    pub fn insert(&mut self, group_path: &str, item: Item) -> Result<&mut Self> {
        check_name(item.name())?;
        let segments = split_path(group_path).ok_or_else(|| PoolError::InvalidName {
            name: group_path.to_string(),
        })?;
        let group = self.ensure_group(&segments)?;
        if group.child(item.name()).is_some() {
            return Err(PoolError::DuplicateName {
                group: group_path.to_string(),
                name: item.name().to_string(),
            });
        }
        group.push(Node::Item(item));
        Ok(self)
    }

    /// Walk down `segments`, creating absent groups.
    pub(crate) fn ensure_group<S: AsRef<str>>(&mut self, segments: &[S]) -> Result<&mut Group> {
        let mut group = &mut self.root;
        let mut path = String::new();
        for segment in segments {
            let segment = segment.as_ref();
            check_name(segment)?;
            let is_group = group.child(segment).map(|c| c.as_group().is_some());
            match is_group {
                None => group.push(Node::Group(Group::new(segment))),
                Some(false) => {
                    return Err(PoolError::DuplicateName {
                        group: path,
                        name: segment.to_string(),
                    });
                }
                Some(true) => {}
            }
            path = join_path(&path, segment);
            group = match group.child_mut(segment) {
                Some(Node::Group(g)) => g,
                _ => unreachable!("group `{path}` was just ensured"),
            };
        }
        Ok(group)
    }

    /// Freeze the shape and produce a resolvable pool.
    pub fn finalize(self) -> Pool {
        let leaves = traverse::leaf_paths(&self.root);
        debug!("pool finalized with {} parameters", leaves.len());
        Pool {
            root: self.root,
            leaves,
        }
    }
}

/// Finalized parameter tree: fixed shape, mutable leaf values.
///
/// A finalized pool can serve as a shared template: keep it behind an
/// `Arc` and clone it for every resolution session.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool {
    root: Group,
    leaves: Vec<String>,
}

impl Pool {
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Every leaf path in traversal order.
    pub fn leaf_paths(&self) -> &[String] {
        &self.leaves
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.item(path).is_ok()
    }

    /// Leaf at `path`, with its metadata.
    pub fn item(&self, path: &str) -> Result<&Item> {
        split_path(path)
            .and_then(|segments| self.root.find(&segments))
            .and_then(Node::as_item)
            .ok_or_else(|| PoolError::UnknownPath {
                path: path.to_string(),
            })
    }

    pub(crate) fn item_mut(&mut self, path: &str) -> Result<&mut Item> {
        split_path(path)
            .and_then(|segments| self.root.item_mut(&segments))
            .ok_or_else(|| PoolError::UnknownPath {
                path: path.to_string(),
            })
    }

    /// Current value at `path`.
    pub fn get(&self, path: &str) -> Result<&Value> {
        self.item(path).map(Item::value)
    }

    /// Assign a typed value; strings are coerced as raw text.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let item = self.item_mut(path)?;
        let value = item
            .accept(value.into())
            .map_err(|reason| PoolError::TypeMismatch {
                path: path.to_string(),
                reason,
            })?;
        item.store(value);
        Ok(())
    }

    /// Restore the default at `path`.
    pub fn reset(&mut self, path: &str) -> Result<()> {
        self.item_mut(path)?.reset();
        Ok(())
    }

    /// Restore every default.
    pub fn reset_all(&mut self) {
        let leaves = self.leaves.clone();
        for path in leaves {
            if let Ok(item) = self.item_mut(&path) {
                item.reset();
            }
        }
    }

    /// Store values that were already checked against their items.
    pub(crate) fn commit(&mut self, staged: Vec<(String, Value)>) -> Result<()> {
        for (path, value) in staged {
            self.item_mut(&path)?.store(value);
        }
        Ok(())
    }
}
