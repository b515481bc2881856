//! Conversion of foreign parameter descriptions into pool subtrees.
//!
//! A foreign description is anything that can enumerate a group's children
//! and report each leaf's declared type and default; see [`ForeignNode`].
//! Adapters are provided for plain JSON objects ([`JsonDescription`]) and
//! JSON Schema documents ([`SchemaDescription`]), the latter also covering
//! any Rust type deriving `schemars::JsonSchema`.

use log::debug;

use crate::{
    data::{
        group::{Group, Node},
        item::Item,
        pool::{PoolBuilder, check_name, join_path, split_path},
        value::{Value, ValueKind},
    },
    error::{PoolError, Result},
};

/// Plain nested JSON object adapter.
pub mod json;

/// JSON Schema adapter.
pub mod schema;

pub use json::JsonDescription;
pub use schema::{SchemaDescription, schema_of};

/// Read access to one node of a foreign parameter description.
pub trait ForeignNode: Sized {
    /// Named children of a group, in declaration order; `None` for a leaf.
    fn enumerate_children(&self) -> Option<Vec<(String, Self)>>;

    /// Declared type of a leaf. `Err` carries the foreign type name when it
    /// has no pool equivalent.
    fn leaf_type(&self) -> Result<ValueKind, String>;

    /// Declared default of a leaf, `None` to use the kind's zero value.
    fn leaf_default(&self) -> Option<Value>;

    fn leaf_help(&self) -> Option<String> {
        None
    }

    /// Inclusive numeric bounds of a leaf.
    fn leaf_range(&self) -> Option<(f64, f64)> {
        None
    }
}

/// Behaviour when the imported tree meets existing parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// The mount path must not exist yet.
    #[default]
    Reject,
    /// Overlapping leaves get the foreign default; everything else in the
    /// pool is left untouched and new entries are added.
    Merge,
}

/// Zero value of `kind`, moved up to the lower bound when that excludes it.
fn zero_within(kind: &ValueKind, range: Option<(f64, f64)>) -> Value {
    match (kind, range) {
        (ValueKind::Int, Some((min, _))) if min > 0.0 => Value::Int(min.ceil() as i64),
        (ValueKind::Real, Some((min, _))) if min > 0.0 => Value::Real(min),
        (ValueKind::Int, Some((_, max))) if max < 0.0 => Value::Int(max.floor() as i64),
        (ValueKind::Real, Some((_, max))) if max < 0.0 => Value::Real(max),
        _ => kind.zero(),
    }
}

fn leaf_item<N: ForeignNode>(name: &str, path: &str, node: &N) -> Result<Item> {
    check_name(name)?;
    let kind = node
        .leaf_type()
        .map_err(|type_name| PoolError::UnsupportedType {
            path: path.to_string(),
            type_name,
        })?;
    let range = node.leaf_range();
    let default = node
        .leaf_default()
        .unwrap_or_else(|| zero_within(&kind, range));
    let mut item = Item::new(name, kind, default).map_err(|reason| PoolError::TypeMismatch {
        path: path.to_string(),
        reason,
    })?;
    if let Some((min, max)) = range {
        item = item
            .with_range(min, max)
            .map_err(|reason| PoolError::TypeMismatch {
                path: path.to_string(),
                reason,
            })?;
    }
    item.help = node.leaf_help();
    Ok(item)
}

/// Build a detached group from a foreign group node.
fn convert_group<N: ForeignNode>(name: &str, path: &str, node: &N) -> Result<Group> {
    let mut group = Group::new(name);
    for (child_name, child) in node.enumerate_children().unwrap_or_default() {
        check_name(&child_name)?;
        let child_path = join_path(path, &child_name);
        if group.child(&child_name).is_some() {
            return Err(PoolError::DuplicateName {
                group: path.to_string(),
                name: child_name,
            });
        }
        group.push(convert(&child_name, &child_path, &child)?);
    }
    Ok(group)
}

fn convert<N: ForeignNode>(name: &str, path: &str, node: &N) -> Result<Node> {
    if node.enumerate_children().is_some() {
        convert_group(name, path, node).map(Node::Group)
    } else {
        leaf_item(name, path, node).map(Node::Item)
    }
}

/// Merge converted children into `group`, whose path is `path`.
fn merge_into(group: &mut Group, path: &str, incoming: Group) -> Result<()> {
    for node in incoming.into_children() {
        let child_path = join_path(path, node.name());
        let Some(existing) = group.child_mut(node.name()) else {
            group.push(node);
            continue;
        };
        match (existing, node) {
            (Node::Group(existing), Node::Group(incoming)) => {
                merge_into(existing, &child_path, incoming)?;
            }
            (Node::Item(existing), Node::Item(incoming)) => {
                let default = existing.accept(incoming.default().clone()).map_err(|reason| {
                    PoolError::TypeMismatch {
                        path: child_path.clone(),
                        reason,
                    }
                })?;
                existing.replace_default(default);
                if existing.help.is_none() {
                    existing.help = incoming.help.clone();
                }
            }
            _ => return Err(PoolError::ImportConflict { path: child_path }),
        }
    }
    Ok(())
}

/// Convert `node` and mount it at `mount` inside `builder`.
///
/// A group node contributes its children to the mount group; a leaf node is
/// mounted as a single item named by the last mount segment. On error the
/// builder is left as it was.
pub fn import<N: ForeignNode>(
    builder: &mut PoolBuilder,
    mount: &str,
    node: &N,
    mode: ImportMode,
) -> Result<()> {
    let snapshot = builder.clone();
    let imported = import_into(builder, mount, node, mode);
    if imported.is_err() {
        *builder = snapshot;
    }
    imported
}

fn import_into<N: ForeignNode>(
    builder: &mut PoolBuilder,
    mount: &str,
    node: &N,
    mode: ImportMode,
) -> Result<()> {
    let segments = split_path(mount).ok_or_else(|| PoolError::InvalidName {
        name: mount.to_string(),
    })?;
    let mount = segments.join("/");

    if node.enumerate_children().is_none() {
        let Some((name, parent)) = segments.split_last() else {
            return Err(PoolError::InvalidName { name: mount });
        };
        let item = leaf_item(name, &mount, node)?;
        let mut incoming = Group::default();
        incoming.push(Node::Item(item));
        return mount_group(builder, parent, &parent.join("/"), incoming, mode, false);
    }

    let incoming = convert_group("", &mount, node)?;
    debug!(
        "importing {} parameters at `{mount}` ({mode:?})",
        incoming.leaf_count()
    );
    mount_group(builder, &segments, &mount, incoming, mode, true)
}

fn mount_group(
    builder: &mut PoolBuilder,
    segments: &[&str],
    mount: &str,
    incoming: Group,
    mode: ImportMode,
    whole_mount: bool,
) -> Result<()> {
    let target = match mode {
        ImportMode::Reject => {
            if whole_mount && builder.root().find(segments).is_some() {
                return Err(PoolError::ImportConflict {
                    path: mount.to_string(),
                });
            }
            let target = builder.ensure_group(segments)?;
            if let Some(clash) = incoming
                .children()
                .iter()
                .find(|c| target.child(c.name()).is_some())
            {
                return Err(PoolError::ImportConflict {
                    path: join_path(mount, clash.name()),
                });
            }
            target
        }
        ImportMode::Merge => builder.ensure_group(segments).map_err(|_| {
            PoolError::ImportConflict {
                path: mount.to_string(),
            }
        })?,
    };
    merge_into(target, mount, incoming)
}

impl PoolBuilder {
    /// Import a foreign description at `mount`. See [`import`].
    pub fn import<N: ForeignNode>(
        &mut self,
        mount: &str,
        node: &N,
        mode: ImportMode,
    ) -> Result<&mut Self> {
        import(self, mount, node, mode)?;
        Ok(self)
    }
}
