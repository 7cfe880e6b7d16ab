//! # Instances — Values Under Validation
//!
//! [`Instance`] wraps a borrowed JSON value or the `Undefined` sentinel.
//! `Instance::Undefined` means "the property is absent" and is never equal to
//! JSON `null`.

use serde_json::Value;

/// A value presented to a validator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instance<'a> {
    /// The property is absent.
    Undefined,
    /// A present JSON value (which may be `null`).
    Defined(&'a Value),
}

impl<'a> Instance<'a> {
    /// Returns true for the `Undefined` sentinel.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// The wrapped value, if present.
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Self::Undefined => None,
            Self::Defined(v) => Some(v),
        }
    }

    /// Render the instance for diagnostics.
    pub fn render(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Defined(v) => render_value(v),
        }
    }
}

impl<'a> From<&'a Value> for Instance<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Defined(value)
    }
}

impl<'a> From<Option<&'a Value>> for Instance<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        value.map_or(Self::Undefined, Self::Defined)
    }
}

/// The JSON Schema type name of a value.
///
/// Numbers with no fractional part report `integer`, everything else
/// numeric reports `number`.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if is_integral(n) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a JSON number has an integral value (`3` and `3.0` both do).
pub(crate) fn is_integral(n: &serde_json::Number) -> bool {
    if n.is_i64() || n.is_u64() {
        return true;
    }
    n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

/// Member equality between JSON values.
///
/// Numbers compare by numeric value (`1 == 1.0`); every other kind compares
/// structurally. `true`, `1`, `0`, `false` and `null` are all distinct.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(i), Some(j)) = (x.as_i64(), y.as_i64()) {
                i == j
            } else if let (Some(i), Some(j)) = (x.as_u64(), y.as_u64()) {
                i == j
            } else {
                matches!((x.as_f64(), y.as_f64()), (Some(p), Some(q)) if p == q)
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Compact rendering of a value, truncated for long payloads.
pub(crate) fn render_value(value: &Value) -> String {
    const MAX: usize = 80;
    let s = value.to_string();
    if s.chars().count() <= MAX {
        s
    } else {
        let head: String = s.chars().take(MAX).collect();
        format!("{head}...")
    }
}
