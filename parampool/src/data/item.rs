use crate::data::value::{CoerceError, Value, ValueKind};

/// Leaf parameter with a declared kind, a default and a current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    name: String,
    kind: ValueKind,
    default: Value,
    value: Value,
    /// Help text shown in generated forms and flag help.
    pub help: Option<String>,
    /// Unit label, display only.
    pub unit: Option<String>,
    range: Option<(f64, f64)>,
}

impl Item {
    /// Create an item whose value starts at `default`.
    ///
    /// The default is checked against `kind` the same way later
    /// assignments are.
    pub fn new(
        name: impl Into<String>,
        kind: ValueKind,
        default: impl Into<Value>,
    ) -> Result<Self, CoerceError> {
        let default = kind.accept(default.into())?;
        Ok(Item {
            name: name.into(),
            kind,
            value: default.clone(),
            default,
            help: None,
            unit: None,
            range: None,
        })
    }

    /// Attach help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach a unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Restrict numeric values to the inclusive range `[min, max]`.
    ///
    /// Fails if the current default lies outside the range.
    pub fn with_range(mut self, min: f64, max: f64) -> Result<Self, CoerceError> {
        self.range = Some((min, max));
        self.check_range(&self.default)?;
        Ok(self)
    }

    /// Name of the leaf, the last segment of its path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind.
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Value restored by [`Item::reset`].
    pub fn default(&self) -> &Value {
        &self.default
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Inclusive `(min, max)` bounds, if any.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    /// Whether the current value differs from the default.
    pub fn is_modified(&self) -> bool {
        self.value != self.default
    }

    fn check_range(&self, value: &Value) -> Result<(), CoerceError> {
        let (Some((min, max)), Some(x)) = (self.range, value.as_real()) else {
            return Ok(());
        };
        if !(min..=max).contains(&x) {
            return Err(CoerceError::OutOfRange {
                value: value.to_string(),
                min,
                max,
            });
        }
        Ok(())
    }

    /// Coerce raw text through this item's kind and range.
    pub fn coerce(&self, raw: &str) -> Result<Value, CoerceError> {
        let value = self.kind.coerce(raw)?;
        self.check_range(&value)?;
        Ok(value)
    }

    /// Check a typed value against this item's kind and range.
    pub fn accept(&self, value: Value) -> Result<Value, CoerceError> {
        let value = self.kind.accept(value)?;
        self.check_range(&value)?;
        Ok(value)
    }

    /// Replace the current value. The value must already be accepted.
    pub(crate) fn store(&mut self, value: Value) {
        self.value = value;
    }

    /// Replace the default; the current value follows it.
    pub(crate) fn replace_default(&mut self, default: Value) {
        self.value = default.clone();
        self.default = default;
    }

    /// Restore the default value.
    pub fn reset(&mut self) {
        self.value = self.default.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_default() {
        let item = Item::new("Nx", ValueKind::Int, 10).unwrap();
        assert_eq!(item.value(), &Value::Int(10));
        assert_eq!(item.default(), &Value::Int(10));
        assert!(!item.is_modified());

        assert!(Item::new("Nx", ValueKind::Int, "ten").is_err());
        let dt = Item::new("dt", ValueKind::Real, 1).unwrap();
        assert_eq!(dt.default(), &Value::Real(1.0));
    }

    #[test]
    fn test_range() {
        let item = Item::new("theta", ValueKind::Real, 0.5)
            .unwrap()
            .with_range(0.0, 1.0)
            .unwrap();
        assert_eq!(item.coerce("1").unwrap(), Value::Real(1.0));
        assert!(matches!(
            item.coerce("1.5"),
            Err(CoerceError::OutOfRange { .. })
        ));
        assert!(item.accept(Value::Int(-1)).is_err());

        let bad = Item::new("theta", ValueKind::Real, 2.0)
            .unwrap()
            .with_range(0.0, 1.0);
        assert!(bad.is_err());
    }

    #[test]
    fn test_range_rejects_nan() {
        let item = Item::new("theta", ValueKind::Real, 0.5)
            .unwrap()
            .with_range(0.0, 1.0)
            .unwrap();
        assert!(matches!(
            item.coerce("NaN"),
            Err(CoerceError::OutOfRange { .. })
        ));
        assert!(item.accept(Value::Real(f64::NAN)).is_err());
        assert!(item.accept(Value::Real(f64::INFINITY)).is_err());

        let free = Item::new("theta", ValueKind::Real, 0.5).unwrap();
        assert!(free.coerce("NaN").is_ok());
    }

    #[test]
    fn test_store_and_reset() {
        let mut item = Item::new("solver", ValueKind::Str, "lu")
            .unwrap()
            .with_help("linear solver")
            .with_unit("-");
        item.store(Value::Str("gmres".into()));
        assert!(item.is_modified());
        item.reset();
        assert_eq!(item.value(), &Value::Str("lu".into()));
        assert_eq!(item.help.as_deref(), Some("linear solver"));
    }
}
