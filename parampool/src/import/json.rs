use serde_json::Value as JsonValue;

use crate::{
    data::value::{Value, ValueKind},
    import::ForeignNode,
};

/// A plain nested JSON object read as a parameter description.
///
/// Objects are groups and scalars are leaves whose kind follows the JSON
/// type: integral numbers become `int`, other numbers `real`.
///
/// ```
/// use parampool::{data::PoolBuilder, import::{ImportMode, JsonDescription}};
///
/// let desc = serde_json::json!({"linear_solver": "lu", "krylov": {"max_it": 100}});
/// let mut builder = PoolBuilder::new();
/// builder.import("dolfin", &JsonDescription::new(&desc), ImportMode::Reject).unwrap();
/// let pool = builder.finalize();
/// assert_eq!(pool.leaf_paths(), ["dolfin/linear_solver", "dolfin/krylov/max_it"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct JsonDescription<'a> {
    value: &'a JsonValue,
}

impl<'a> JsonDescription<'a> {
    pub fn new(value: &'a JsonValue) -> Self {
        Self { value }
    }
}

impl ForeignNode for JsonDescription<'_> {
    fn enumerate_children(&self) -> Option<Vec<(String, Self)>> {
        let map = self.value.as_object()?;
        Some(
            map.iter()
                .map(|(k, v)| (k.clone(), JsonDescription::new(v)))
                .collect(),
        )
    }

    fn leaf_type(&self) -> Result<ValueKind, String> {
        match self.value {
            JsonValue::Bool(_) => Ok(ValueKind::Bool),
            JsonValue::Number(n) if n.is_i64() => Ok(ValueKind::Int),
            JsonValue::Number(_) => Ok(ValueKind::Real),
            JsonValue::String(_) => Ok(ValueKind::Str),
            JsonValue::Array(_) => Err("array".to_string()),
            JsonValue::Null => Err("null".to_string()),
            JsonValue::Object(_) => Err("object".to_string()),
        }
    }

    fn leaf_default(&self) -> Option<Value> {
        Value::from_json(self.value)
    }
}
