//! Deterministic depth-first traversal of a pool and the sinks built on it.
//!
//! Leaves are visited in insertion order, a group's children before its
//! next sibling. Walking only borrows the tree, so any number of sinks can
//! run over the same pool.

use log::{debug, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value as JsonValue};

use crate::{
    data::{
        group::{Group, Node},
        item::Item,
        pool::{Pool, join_path, split_path},
        value::Value,
    },
    error::{PoolError, Result},
};

/// Receives traversal events.
///
/// Only [`leaf`](Visitor::leaf) is required; the group hooks let form or
/// outline renderers track nesting.
pub trait Visitor {
    fn enter_group(&mut self, _path: &str, _group: &Group) {}

    fn leave_group(&mut self, _path: &str, _group: &Group) {}

    fn leaf(&mut self, path: &str, item: &Item);
}

/// Walk the children of `group`, whose own path is `prefix`.
pub fn walk<V: Visitor + ?Sized>(group: &Group, prefix: &str, visitor: &mut V) {
    for child in group.children() {
        let path = join_path(prefix, child.name());
        match child {
            Node::Item(item) => visitor.leaf(&path, item),
            Node::Group(sub) => {
                visitor.enter_group(&path, sub);
                walk(sub, &path, visitor);
                visitor.leave_group(&path, sub);
            }
        }
    }
}

struct PathCollector(Vec<String>);

impl Visitor for PathCollector {
    fn leaf(&mut self, path: &str, _item: &Item) {
        self.0.push(path.to_string());
    }
}

pub(crate) fn leaf_paths(root: &Group) -> Vec<String> {
    let mut collector = PathCollector(Vec::new());
    walk(root, "", &mut collector);
    collector.0
}

struct LeafFn<F>(F);

impl<F: FnMut(&str, &Value)> Visitor for LeafFn<F> {
    fn leaf(&mut self, path: &str, item: &Item) {
        (self.0)(path, item.value())
    }
}

impl Pool {
    /// Run `visitor` over the whole tree.
    pub fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        walk(self.root(), "", visitor);
    }

    /// Call `f` with the full path and current value of every leaf.
    pub fn for_each_leaf(&self, f: impl FnMut(&str, &Value)) {
        self.walk(&mut LeafFn(f));
    }

    /// All `(path, value)` pairs in traversal order.
    pub fn flatten(&self) -> Vec<(String, Value)> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each_leaf(|path, value| out.push((path.to_string(), value.clone())));
        out
    }
}

/// External parameter object that accepts values by trailing name.
pub trait ExportSink {
    /// Store `value` under `name`. Returns `false` when the sink has no
    /// such key; the value is then dropped.
    fn set_by_name(&mut self, name: &str, value: &Value) -> bool;
}

/// What to do with pool leaves that have no counterpart in a sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingKeyPolicy {
    /// Skip without a trace. Pools often aggregate several external
    /// objects, so partial overlap is normal.
    #[default]
    Silent,
    /// Skip and log a warning per leaf.
    Warn,
}

/// Outcome of an export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Paths whose value reached the sink.
    pub matched: Vec<String>,
    /// Paths the sink had no key for.
    pub unmatched: Vec<String>,
}

struct Exporter<'a, S: ?Sized> {
    sink: &'a mut S,
    policy: MissingKeyPolicy,
    report: ExportReport,
}

impl<S: ExportSink + ?Sized> Visitor for Exporter<'_, S> {
    fn leaf(&mut self, path: &str, item: &Item) {
        if self.sink.set_by_name(item.name(), item.value()) {
            self.report.matched.push(path.to_string());
            return;
        }
        if self.policy == MissingKeyPolicy::Warn {
            warn!("no counterpart for `{path}` in export target, skipped");
        }
        self.report.unmatched.push(path.to_string());
    }
}

/// Push every leaf of `pool` into `sink`, matching by trailing name.
pub fn export<S: ExportSink + ?Sized>(
    pool: &Pool,
    sink: &mut S,
    policy: MissingKeyPolicy,
) -> ExportReport {
    let mut exporter = Exporter {
        sink,
        policy,
        report: ExportReport::default(),
    };
    pool.walk(&mut exporter);
    debug!(
        "exported {} parameters, {} without counterpart",
        exporter.report.matched.len(),
        exporter.report.unmatched.len()
    );
    exporter.report
}

/// Like [`export`], limited to the subtree mounted at `mount`.
pub fn export_under<S: ExportSink + ?Sized>(
    pool: &Pool,
    mount: &str,
    sink: &mut S,
    policy: MissingKeyPolicy,
) -> Result<ExportReport> {
    let group = subtree(pool, mount)?;
    let mut exporter = Exporter {
        sink,
        policy,
        report: ExportReport::default(),
    };
    walk(group, mount.trim_matches('/'), &mut exporter);
    Ok(exporter.report)
}

impl ExportSink for JsonValue {
    /// Sets the first non-object entry named `name`, searching nested
    /// objects depth-first.
    fn set_by_name(&mut self, name: &str, value: &Value) -> bool {
        let JsonValue::Object(map) = self else {
            return false;
        };
        if let Some(slot) = map.get_mut(name)
            && !slot.is_object()
        {
            *slot = value.to_json();
            return true;
        }
        map.values_mut()
            .filter(|v| v.is_object())
            .any(|v| v.set_by_name(name, value))
    }
}

fn subtree<'a>(pool: &'a Pool, mount: &str) -> Result<&'a Group> {
    split_path(mount)
        .and_then(|segments| pool.root().group(&segments))
        .ok_or_else(|| PoolError::UnknownPath {
            path: mount.to_string(),
        })
}

#[derive(Default)]
struct JsonBuilder {
    stack: Vec<Map<String, JsonValue>>,
    current: Map<String, JsonValue>,
}

impl Visitor for JsonBuilder {
    fn enter_group(&mut self, _path: &str, _group: &Group) {
        self.stack.push(std::mem::take(&mut self.current));
    }

    fn leave_group(&mut self, _path: &str, group: &Group) {
        let finished = std::mem::replace(&mut self.current, self.stack.pop().unwrap_or_default());
        self.current
            .insert(group.name().to_string(), JsonValue::Object(finished));
    }

    fn leaf(&mut self, _path: &str, item: &Item) {
        self.current
            .insert(item.name().to_string(), item.value().to_json());
    }
}

/// Nested JSON object of all current values, groups as objects.
pub fn to_json(pool: &Pool) -> JsonValue {
    let mut builder = JsonBuilder::default();
    pool.walk(&mut builder);
    JsonValue::Object(builder.current)
}

/// Nested JSON object of the subtree mounted at `mount`.
pub fn subtree_json(pool: &Pool, mount: &str) -> Result<JsonValue> {
    let group = subtree(pool, mount)?;
    let mut builder = JsonBuilder::default();
    walk(group, mount, &mut builder);
    Ok(JsonValue::Object(builder.current))
}

/// Deserialize the subtree at `mount` into a typed parameter object.
///
/// An empty mount uses the whole pool.
pub fn extract<C: DeserializeOwned>(pool: &Pool, mount: &str) -> Result<C> {
    let value = subtree_json(pool, mount)?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::data::{PoolBuilder, ValueKind};

    fn pool() -> Pool {
        let mut builder = PoolBuilder::new();
        builder
            .enter_group("Main menu")
            .unwrap()
            .add("Nx", 10, ValueKind::Int)
            .unwrap()
            .enter_group("time")
            .unwrap()
            .add("dt", 0.1, ValueKind::Real)
            .unwrap()
            .leave_group()
            .unwrap()
            .add("Ny", 12, ValueKind::Int)
            .unwrap()
            .leave_group()
            .unwrap()
            .enter_group("dolfin")
            .unwrap()
            .add("linear_solver", "lu", ValueKind::Str)
            .unwrap();
        builder.finalize()
    }

    #[derive(Default)]
    struct Events(Vec<String>);

    impl Visitor for Events {
        fn enter_group(&mut self, path: &str, _group: &Group) {
            self.0.push(format!("enter {path}"));
        }

        fn leave_group(&mut self, path: &str, _group: &Group) {
            self.0.push(format!("leave {path}"));
        }

        fn leaf(&mut self, path: &str, _item: &Item) {
            self.0.push(path.to_string());
        }
    }

    #[test]
    fn test_walk_order() {
        let pool = pool();
        let mut events = Events::default();
        pool.walk(&mut events);
        assert_eq!(
            events.0,
            [
                "enter Main menu",
                "Main menu/Nx",
                "enter Main menu/time",
                "Main menu/time/dt",
                "leave Main menu/time",
                "Main menu/Ny",
                "leave Main menu",
                "enter dolfin",
                "dolfin/linear_solver",
                "leave dolfin",
            ]
        );
    }

    #[test]
    fn test_walk_is_restartable() {
        let pool = pool();
        let first = pool.flatten();
        let second = pool.flatten();
        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>(),
            pool.leaf_paths()
        );
    }

    #[derive(Default)]
    struct Settings(HashMap<String, Value>);

    impl ExportSink for Settings {
        fn set_by_name(&mut self, name: &str, value: &Value) -> bool {
            match self.0.get_mut(name) {
                Some(slot) => {
                    *slot = value.clone();
                    true
                }
                None => false,
            }
        }
    }

    #[test]
    fn test_export_partial_overlap() {
        let mut pool = pool();
        pool.set("dolfin/linear_solver", "gmres").unwrap();

        let mut settings = Settings::default();
        settings
            .0
            .insert("linear_solver".into(), Value::Str("lu".into()));
        settings.0.insert("krylov_tol".into(), Value::Real(1e-8));

        let report = export(&pool, &mut settings, MissingKeyPolicy::Warn);
        assert_eq!(report.matched, ["dolfin/linear_solver"]);
        assert_eq!(report.unmatched.len(), 3);
        assert_eq!(settings.0["linear_solver"], Value::Str("gmres".into()));
        assert_eq!(settings.0["krylov_tol"], Value::Real(1e-8));
    }

    #[test]
    fn test_export_into_json() {
        let pool = pool();
        let mut target = json!({
            "mesh": {"Nx": 1, "Nz": 3},
            "dt": {"nested": true},
        });
        let report = export_under(&pool, "Main menu", &mut target, MissingKeyPolicy::Silent)
            .unwrap();
        assert_eq!(report.matched, ["Main menu/Nx"]);
        assert_eq!(target, json!({"mesh": {"Nx": 10, "Nz": 3}, "dt": {"nested": true}}));

        assert!(matches!(
            export_under(&pool, "nowhere", &mut target, MissingKeyPolicy::Silent),
            Err(PoolError::UnknownPath { .. })
        ));
    }

    #[test]
    fn test_to_json_and_extract() {
        let pool = pool();
        assert_eq!(
            to_json(&pool),
            json!({
                "Main menu": {"Nx": 10, "time": {"dt": 0.1}, "Ny": 12},
                "dolfin": {"linear_solver": "lu"},
            })
        );

        #[derive(serde::Deserialize)]
        struct Dolfin {
            linear_solver: String,
        }
        let dolfin: Dolfin = extract(&pool, "dolfin").unwrap();
        assert_eq!(dolfin.linear_solver, "lu");
        assert!(extract::<Dolfin>(&pool, "Main menu").is_err());
    }
}
