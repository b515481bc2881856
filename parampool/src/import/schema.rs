use schemars::JsonSchema;
use serde_json::Value as JsonValue;

use crate::{
    data::value::{Value, ValueKind},
    error::Result,
    import::ForeignNode,
};

const MAX_REF_DEPTH: usize = 32;

/// A JSON Schema document read as a parameter description.
///
/// Objects with `properties` are groups. `$ref` pointers into the same
/// document are followed, nullable unions collapse to their non-null
/// member, and string enumerations become choices. A property that refers
/// back to one of its enclosing objects is reported as the unsupported type
/// `recursive`.
#[derive(Debug, Clone)]
pub struct SchemaDescription<'a> {
    root: &'a JsonValue,
    /// Schema as written at the use site, may carry description/default
    /// next to a `$ref`.
    outer: &'a JsonValue,
    /// `outer` with references and nullable unions resolved.
    node: &'a JsonValue,
    /// Resolved schemas of the enclosing objects, outermost first.
    ancestors: Vec<&'a JsonValue>,
}

/// JSON Schema of a Rust type, ready for [`SchemaDescription::new`].
///
/// This is how the parameter object of another Rust library is imported.
pub fn schema_of<C: JsonSchema>() -> Result<JsonValue> {
    let schema = schemars::schema_for!(C);
    Ok(serde_json::to_value(&schema)?)
}

fn lookup_ref<'a>(root: &'a JsonValue, reference: &str) -> Option<&'a JsonValue> {
    root.pointer(reference.strip_prefix('#')?)
}

fn is_null_schema(schema: &JsonValue) -> bool {
    schema.get("type").and_then(JsonValue::as_str) == Some("null")
}

fn resolve<'a>(root: &'a JsonValue, mut node: &'a JsonValue) -> &'a JsonValue {
    for _ in 0..MAX_REF_DEPTH {
        if let Some(target) = node
            .get("$ref")
            .and_then(JsonValue::as_str)
            .and_then(|r| lookup_ref(root, r))
        {
            node = target;
            continue;
        }
        if let Some([single]) = node.get("allOf").and_then(JsonValue::as_array).map(Vec::as_slice) {
            node = single;
            continue;
        }
        let union = node
            .get("anyOf")
            .or_else(|| node.get("oneOf"))
            .and_then(JsonValue::as_array);
        if let Some(members) = union {
            let mut non_null = members.iter().filter(|m| !is_null_schema(m));
            if let (Some(only), None) = (non_null.next(), non_null.next()) {
                node = only;
                continue;
            }
        }
        break;
    }
    node
}

/// Strings of a `{"enum": [...]}` schema or a union of `const` strings.
fn string_choices(root: &JsonValue, node: &JsonValue) -> Option<Vec<String>> {
    if let Some(values) = node.get("enum").and_then(JsonValue::as_array) {
        return values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| v.as_str().map(str::to_string))
            .collect();
    }
    let members = node
        .get("oneOf")
        .or_else(|| node.get("anyOf"))
        .and_then(JsonValue::as_array)?;
    let mut choices = Vec::new();
    for member in members {
        let member = resolve(root, member);
        if is_null_schema(member) {
            continue;
        }
        if let Some(c) = member.get("const").and_then(JsonValue::as_str) {
            choices.push(c.to_string());
        } else {
            choices.extend(string_choices(root, member)?);
        }
    }
    (!choices.is_empty()).then_some(choices)
}

fn declared_type(node: &JsonValue) -> Option<&str> {
    match node.get("type")? {
        JsonValue::String(t) => Some(t.as_str()),
        JsonValue::Array(types) => {
            let mut non_null = types
                .iter()
                .filter_map(JsonValue::as_str)
                .filter(|t| *t != "null");
            match (non_null.next(), non_null.next()) {
                (Some(t), None) => Some(t),
                _ => None,
            }
        }
        _ => None,
    }
}

impl<'a> SchemaDescription<'a> {
    /// Describe the document `root`, starting at its top-level schema.
    pub fn new(root: &'a JsonValue) -> Self {
        Self {
            root,
            outer: root,
            node: resolve(root, root),
            ancestors: Vec::new(),
        }
    }

    fn child(&self, outer: &'a JsonValue) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(self.node);
        Self {
            root: self.root,
            outer,
            node: resolve(self.root, outer),
            ancestors,
        }
    }

    fn is_recursive(&self) -> bool {
        self.ancestors.iter().any(|a| std::ptr::eq(*a, self.node))
    }

    fn field(&self, key: &str) -> Option<&'a JsonValue> {
        self.outer.get(key).or_else(|| self.node.get(key))
    }
}

impl ForeignNode for SchemaDescription<'_> {
    fn enumerate_children(&self) -> Option<Vec<(String, Self)>> {
        if self.is_recursive() {
            return None;
        }
        let properties = self.node.get("properties")?.as_object()?;
        Some(
            properties
                .iter()
                .map(|(name, schema)| (name.clone(), self.child(schema)))
                .collect(),
        )
    }

    fn leaf_type(&self) -> Result<ValueKind, String> {
        if self.is_recursive() {
            return Err("recursive".to_string());
        }
        if let Some(choices) = string_choices(self.root, self.node) {
            return Ok(ValueKind::Choice(choices));
        }
        match declared_type(self.node) {
            Some("integer") => Ok(ValueKind::Int),
            Some("number") => Ok(ValueKind::Real),
            Some("boolean") => Ok(ValueKind::Bool),
            Some("string") => Ok(ValueKind::Str),
            Some(other) => Err(other.to_string()),
            None if self.node.get("anyOf").is_some() || self.node.get("oneOf").is_some() => {
                Err("union".to_string())
            }
            None => Err("untyped".to_string()),
        }
    }

    fn leaf_default(&self) -> Option<Value> {
        self.field("default").and_then(Value::from_json)
    }

    fn leaf_help(&self) -> Option<String> {
        self.field("description")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
    }

    fn leaf_range(&self) -> Option<(f64, f64)> {
        let min = self.node.get("minimum").and_then(JsonValue::as_f64);
        let max = self.node.get("maximum").and_then(JsonValue::as_f64);
        if min.is_none() && max.is_none() {
            return None;
        }
        Some((min.unwrap_or(f64::NEG_INFINITY), max.unwrap_or(f64::INFINITY)))
    }
}

#[cfg(test)]
mod tests {
    use schemars::JsonSchema;
    use serde_json::json;

    use super::*;
    use crate::{
        data::PoolBuilder,
        error::PoolError,
        import::ImportMode,
    };

    fn solver_schema() -> JsonValue {
        json!({
            "title": "Dolfin",
            "type": "object",
            "properties": {
                "linear_solver": {
                    "description": "Linear solver backend",
                    "$ref": "#/$defs/Solver",
                    "default": "lu"
                },
                "krylov": {"$ref": "#/$defs/Krylov"},
                "cells": {"type": ["integer", "null"], "minimum": 1}
            },
            "$defs": {
                "Solver": {"type": "string", "enum": ["lu", "gmres", "cg"]},
                "Krylov": {
                    "type": "object",
                    "properties": {
                        "relative_tolerance": {"type": "number", "default": 1e-6},
                        "maximum_iterations": {
                            "type": "integer",
                            "minimum": 0,
                            "maximum": 100000,
                            "default": 1000
                        },
                        "monitor": {
                            "oneOf": [
                                {"const": "none", "type": "string"},
                                {"const": "residual", "type": "string"}
                            ]
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_import_schema() {
        let schema = solver_schema();
        let mut builder = PoolBuilder::new();
        builder
            .import("dolfin", &SchemaDescription::new(&schema), ImportMode::Reject)
            .unwrap();
        let pool = builder.finalize();

        assert_eq!(
            pool.leaf_paths(),
            [
                "dolfin/linear_solver",
                "dolfin/krylov/relative_tolerance",
                "dolfin/krylov/maximum_iterations",
                "dolfin/krylov/monitor",
                "dolfin/cells",
            ]
        );

        let solver = pool.item("dolfin/linear_solver").unwrap();
        assert_eq!(
            solver.kind(),
            &ValueKind::Choice(vec!["lu".into(), "gmres".into(), "cg".into()])
        );
        assert_eq!(solver.value(), &Value::Str("lu".into()));
        assert_eq!(solver.help.as_deref(), Some("Linear solver backend"));

        let iterations = pool.item("dolfin/krylov/maximum_iterations").unwrap();
        assert_eq!(iterations.value(), &Value::Int(1000));
        assert_eq!(iterations.range(), Some((0.0, 100000.0)));

        let monitor = pool.item("dolfin/krylov/monitor").unwrap();
        assert_eq!(monitor.value(), &Value::Str("none".into()));

        let cells = pool.item("dolfin/cells").unwrap();
        assert_eq!(cells.kind(), &ValueKind::Int);
        assert_eq!(cells.value(), &Value::Int(1));
        assert_eq!(cells.range(), Some((1.0, f64::INFINITY)));
    }

    #[test]
    fn test_declared_default_outside_range() {
        let schema = json!({
            "type": "object",
            "properties": {"cells": {"type": "integer", "minimum": 1, "default": 0}}
        });
        let mut builder = PoolBuilder::new();
        assert!(matches!(
            builder.import("m", &SchemaDescription::new(&schema), ImportMode::Reject),
            Err(PoolError::TypeMismatch { path, .. }) if path == "m/cells"
        ));
    }

    #[test]
    fn test_unsupported_schema_types() {
        let schema = json!({
            "type": "object",
            "properties": {"tags": {"type": "array", "items": {"type": "string"}}}
        });
        let mut builder = PoolBuilder::new();
        assert!(matches!(
            builder.import("m", &SchemaDescription::new(&schema), ImportMode::Reject),
            Err(PoolError::UnsupportedType { path, type_name })
                if path == "m/tags" && type_name == "array"
        ));
    }

    #[test]
    fn test_recursive_schema_is_unsupported() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "child": {"anyOf": [{"$ref": "#"}, {"type": "null"}]}
            }
        });
        let mut builder = PoolBuilder::new();
        assert!(matches!(
            builder.import("tree", &SchemaDescription::new(&schema), ImportMode::Reject),
            Err(PoolError::UnsupportedType { path, type_name })
                if path == "tree/child" && type_name == "recursive"
        ));
        assert!(builder.root().is_empty());

        let indirect = json!({
            "type": "object",
            "properties": {"outer": {"$ref": "#/$defs/A"}},
            "$defs": {
                "A": {"type": "object", "properties": {"b": {"$ref": "#/$defs/B"}}},
                "B": {"type": "object", "properties": {"a": {"$ref": "#/$defs/A"}}}
            }
        });
        assert!(matches!(
            builder.import("m", &SchemaDescription::new(&indirect), ImportMode::Reject),
            Err(PoolError::UnsupportedType { path, type_name })
                if path == "m/outer/b/a" && type_name == "recursive"
        ));
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Node {
        name: String,
        child: Option<Box<Node>>,
    }

    #[test]
    fn test_recursive_rust_type_is_unsupported() {
        let schema = schema_of::<Node>().unwrap();
        let mut builder = PoolBuilder::new();
        assert!(matches!(
            builder.import("node", &SchemaDescription::new(&schema), ImportMode::Reject),
            Err(PoolError::UnsupportedType { type_name, .. }) if type_name == "recursive"
        ));
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    enum Preconditioner {
        Ilu,
        Amg,
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Krylov {
        relative_tolerance: f64,
        maximum_iterations: u32,
        preconditioner: Preconditioner,
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Solver {
        reorder: bool,
        krylov: Krylov,
        label: Option<String>,
    }

    #[test]
    fn test_import_rust_type() {
        let schema = schema_of::<Solver>().unwrap();
        let mut builder = PoolBuilder::new();
        builder
            .import("solver", &SchemaDescription::new(&schema), ImportMode::Reject)
            .unwrap();
        let pool = builder.finalize();

        assert_eq!(
            pool.leaf_paths(),
            [
                "solver/reorder",
                "solver/krylov/relative_tolerance",
                "solver/krylov/maximum_iterations",
                "solver/krylov/preconditioner",
                "solver/label",
            ]
        );
        let kind = |path| pool.item(path).unwrap().kind().clone();
        assert_eq!(kind("solver/reorder"), ValueKind::Bool);
        assert_eq!(kind("solver/krylov/relative_tolerance"), ValueKind::Real);
        assert_eq!(kind("solver/krylov/maximum_iterations"), ValueKind::Int);
        assert_eq!(
            kind("solver/krylov/preconditioner"),
            ValueKind::Choice(vec!["Ilu".into(), "Amg".into()])
        );
        assert_eq!(kind("solver/label"), ValueKind::Str);
    }
}
