//! # Typed Keyword Table
//!
//! Every schema node parses its fragment into a [`Keywords`] value once, at
//! construction. Absent keywords take the draft-04 defaults below, so the
//! classifier never inspects the raw mapping for a missing key:
//!
//! | Keyword | Default |
//! |---|---|
//! | `title`, `description` | `""` |
//! | `properties`, `definitions` | empty |
//! | `default`, `examples` | absent |
//! | `type` | `"object"` |
//! | `required` | `[]` |
//! | `additionalProperties` | `true` |
//!
//! Malformed keyword values (a non-array `anyOf`, a string `minimum`, an
//! empty `oneOf`, a non-positive `multipleOf`) are rejected with
//! `SchemaError::InvalidSchema`.

use serde_json::{Map, Value};
use sperf_core::SchemaError;
use sperf_validate::{NumericConstraints, StringConstraints};

/// Primitive type names accepted by `SimpleType`.
pub const PRIMITIVE_TYPES: &[&str] = &["null", "boolean", "number", "integer", "string"];

/// The `type` keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDecl {
    /// A single type name (the default is `object`).
    Single(String),
    /// A list of type names, in schema order.
    Multiple(Vec<String>),
}

impl TypeDecl {
    /// True for a single type equal to `name`.
    pub fn is(&self, name: &str) -> bool {
        matches!(self, Self::Single(t) if t == name)
    }

    /// True unless the type is exactly `object`.
    pub fn is_non_object(&self) -> bool {
        !self.is("object")
    }
}

/// The `additionalProperties` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalDecl {
    /// Not present: behaves as `true`.
    Absent,
    /// `true` or `false`.
    Allowed(bool),
    /// A schema mapping.
    Schema,
}

impl AdditionalDecl {
    /// True unless the keyword is absent or `true`.
    pub fn is_restrictive(&self) -> bool {
        matches!(self, Self::Allowed(false) | Self::Schema)
    }
}

/// The `items` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemsDecl {
    /// Not present.
    Absent,
    /// A single schema for every element.
    Single,
    /// One schema per position.
    Tuple(usize),
}

/// Composition keywords and their branch counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositionDecl {
    /// Number of `anyOf` branches (0 when absent).
    pub any_of: usize,
    /// Number of `allOf` branches (0 when absent).
    pub all_of: usize,
    /// Number of `oneOf` branches (0 when absent).
    pub one_of: usize,
    /// Whether `not` is present.
    pub not: bool,
}

impl CompositionDecl {
    /// True when any of `anyOf`/`allOf`/`oneOf` is present.
    pub fn any(&self) -> bool {
        self.any_of > 0 || self.all_of > 0 || self.one_of > 0
    }
}

/// The parsed keyword set of one schema fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Keywords {
    /// `title`.
    pub title: String,
    /// `description`.
    pub description: String,
    /// `default`.
    pub default: Option<Value>,
    /// `examples`.
    pub examples: Option<Value>,
    /// `type`, defaulted to `object`.
    pub types: TypeDecl,
    /// Whether `type` was written in the fragment.
    pub type_declared: bool,
    /// `required`, in schema order.
    pub required: Vec<String>,
    /// `additionalProperties`.
    pub additional: AdditionalDecl,
    /// `$ref`.
    pub reference: Option<String>,
    /// Whether `properties` is present (even when empty).
    pub has_properties: bool,
    /// Property names in schema order.
    pub properties: Vec<String>,
    /// `enum` values.
    pub enumeration: Option<Vec<Value>>,
    /// `anyOf`/`allOf`/`oneOf`/`not`.
    pub composition: CompositionDecl,
    /// `minimum`/`maximum`/`exclusiveMinimum`/`exclusiveMaximum`/`multipleOf`.
    pub numeric: NumericConstraints,
    /// `minLength`/`maxLength`.
    pub string: StringConstraints,
    /// `items`.
    pub items: ItemsDecl,
    /// `minItems`.
    pub min_items: Option<u64>,
    /// `maxItems`.
    pub max_items: Option<u64>,
    /// Raw key set, in schema order, for diagnostics.
    pub keys: Vec<String>,
}

impl Keywords {
    /// Parse a fragment. `path` locates it in error messages.
    pub fn parse(fragment: &Value, path: &str) -> Result<Self, SchemaError> {
        let Some(map) = fragment.as_object() else {
            return Err(SchemaError::invalid(
                path,
                format!("schema must be a JSON object, found {}", kind(fragment)),
            ));
        };
        let p = Parser { map, path };

        let (types, type_declared) = p.types()?;
        let properties = match map.get("properties") {
            None => None,
            Some(Value::Object(props)) => Some(props.keys().cloned().collect()),
            Some(other) => return Err(p.malformed("properties", "an object", other)),
        };

        let composition = CompositionDecl {
            any_of: p.branches("anyOf")?,
            all_of: p.branches("allOf")?,
            one_of: p.branches("oneOf")?,
            not: match map.get("not") {
                None => false,
                Some(Value::Object(_)) => true,
                Some(other) => return Err(p.malformed("not", "a schema object", other)),
            },
        };

        let numeric = NumericConstraints {
            minimum: p.number("minimum")?,
            maximum: p.number("maximum")?,
            exclusive_minimum: p.flag("exclusiveMinimum")?,
            exclusive_maximum: p.flag("exclusiveMaximum")?,
            multiple_of: match p.number("multipleOf")? {
                Some(m) if m <= 0.0 => {
                    return Err(SchemaError::invalid(path, "'multipleOf' must be greater than 0"))
                }
                m => m,
            },
        };

        let items = match map.get("items") {
            None => ItemsDecl::Absent,
            Some(Value::Object(_)) => ItemsDecl::Single,
            Some(Value::Array(list)) => ItemsDecl::Tuple(list.len()),
            Some(other) => return Err(p.malformed("items", "a schema or an array of schemas", other)),
        };

        Ok(Self {
            title: p.text("title")?,
            description: p.text("description")?,
            default: map.get("default").cloned(),
            examples: map.get("examples").cloned(),
            types,
            type_declared,
            required: p.required()?,
            additional: match map.get("additionalProperties") {
                None => AdditionalDecl::Absent,
                Some(Value::Bool(b)) => AdditionalDecl::Allowed(*b),
                Some(Value::Object(_)) => AdditionalDecl::Schema,
                Some(other) => {
                    return Err(p.malformed("additionalProperties", "a boolean or a schema", other))
                }
            },
            reference: match map.get("$ref") {
                None => None,
                Some(Value::String(r)) => Some(r.clone()),
                Some(other) => return Err(p.malformed("$ref", "a string", other)),
            },
            has_properties: properties.is_some(),
            properties: properties.unwrap_or_default(),
            enumeration: match map.get("enum") {
                None => None,
                Some(Value::Array(values)) => Some(values.clone()),
                Some(other) => return Err(p.malformed("enum", "an array", other)),
            },
            composition,
            numeric,
            string: StringConstraints {
                min_length: p.count("minLength")?,
                max_length: p.count("maxLength")?,
            },
            items,
            min_items: p.count("minItems")?,
            max_items: p.count("maxItems")?,
            keys: map.keys().cloned().collect(),
        })
    }

    /// Whether `name` is listed in `required`.
    pub fn requires(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

struct Parser<'a> {
    map: &'a Map<String, Value>,
    path: &'a str,
}

impl Parser<'_> {
    fn malformed(&self, keyword: &str, expected: &str, found: &Value) -> SchemaError {
        SchemaError::invalid(
            self.path,
            format!("'{keyword}' must be {expected}, found {}", kind(found)),
        )
    }

    fn text(&self, keyword: &str) -> Result<String, SchemaError> {
        match self.map.get(keyword) {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.malformed(keyword, "a string", other)),
        }
    }

    fn types(&self) -> Result<(TypeDecl, bool), SchemaError> {
        match self.map.get("type") {
            None => Ok((TypeDecl::Single("object".to_string()), false)),
            Some(Value::String(t)) => Ok((TypeDecl::Single(t.clone()), true)),
            Some(Value::Array(list)) => {
                let names = list
                    .iter()
                    .map(|t| {
                        t.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| self.malformed("type", "a string or an array of strings", t))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if names.is_empty() {
                    return Err(SchemaError::invalid(self.path, "'type' must not be an empty array"));
                }
                Ok((TypeDecl::Multiple(names), true))
            }
            Some(other) => Err(self.malformed("type", "a string or an array of strings", other)),
        }
    }

    fn required(&self) -> Result<Vec<String>, SchemaError> {
        match self.map.get("required") {
            None => Ok(Vec::new()),
            Some(Value::Array(list)) => list
                .iter()
                .map(|r| {
                    r.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.malformed("required", "an array of strings", r))
                })
                .collect(),
            Some(other) => Err(self.malformed("required", "an array of strings", other)),
        }
    }

    fn branches(&self, keyword: &str) -> Result<usize, SchemaError> {
        match self.map.get(keyword) {
            None => Ok(0),
            Some(Value::Array(list)) if list.is_empty() => Err(SchemaError::invalid(
                self.path,
                format!("'{keyword}' must have at least one branch"),
            )),
            Some(Value::Array(list)) => Ok(list.len()),
            Some(other) => Err(self.malformed(keyword, "a non-empty array of schemas", other)),
        }
    }

    fn number(&self, keyword: &str) -> Result<Option<f64>, SchemaError> {
        match self.map.get(keyword) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(self.malformed(keyword, "a number", other)),
        }
    }

    fn flag(&self, keyword: &str) -> Result<bool, SchemaError> {
        match self.map.get(keyword) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(self.malformed(keyword, "a boolean", other)),
        }
    }

    fn count(&self, keyword: &str) -> Result<Option<u64>, SchemaError> {
        match self.map.get(keyword) {
            None => Ok(None),
            Some(Value::Number(n)) if n.as_u64().is_some() => Ok(n.as_u64()),
            Some(other) => Err(self.malformed(keyword, "a non-negative integer", other)),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    sperf_validate::json_type_name(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> Result<Keywords, SchemaError> {
        Keywords::parse(&v, "#")
    }

    #[test]
    fn test_defaults() {
        let k = parse(json!({})).unwrap();
        assert_eq!(k.title, "");
        assert_eq!(k.description, "");
        assert_eq!(k.types, TypeDecl::Single("object".into()));
        assert!(!k.type_declared);
        assert!(k.required.is_empty());
        assert_eq!(k.additional, AdditionalDecl::Absent);
        assert!(!k.has_properties);
        assert!(k.default.is_none());
        assert_eq!(k.items, ItemsDecl::Absent);
        assert!(k.numeric.is_unconstrained());
    }

    #[test]
    fn test_full_fragment() {
        let k = parse(json!({
            "type": "number",
            "title": "Opacity",
            "minimum": 0,
            "maximum": 1,
            "exclusiveMaximum": true,
            "multipleOf": 0.25,
            "default": 1
        }))
        .unwrap();
        assert!(k.types.is("number"));
        assert_eq!(k.title, "Opacity");
        assert_eq!(k.numeric.minimum, Some(0.0));
        assert!(k.numeric.exclusive_maximum);
        assert_eq!(k.numeric.multiple_of, Some(0.25));
        assert_eq!(k.default, Some(json!(1)));
        assert_eq!(k.keys.len(), 7);
    }

    #[test]
    fn test_property_order_preserved() {
        let k = parse(json!({
            "properties": {"zeta": {}, "alpha": {}, "mid": {}},
            "required": ["alpha"]
        }))
        .unwrap();
        assert_eq!(k.properties, vec!["zeta", "alpha", "mid"]);
        assert!(k.requires("alpha"));
        assert!(!k.requires("zeta"));
    }

    #[test]
    fn test_compound_type() {
        let k = parse(json!({"type": ["integer", "string"]})).unwrap();
        assert_eq!(
            k.types,
            TypeDecl::Multiple(vec!["integer".into(), "string".into()])
        );
        assert!(k.types.is_non_object());
    }

    #[test]
    fn test_composition_counts() {
        let k = parse(json!({"anyOf": [{}, {}], "not": {}})).unwrap();
        assert_eq!(k.composition.any_of, 2);
        assert!(k.composition.not);
        assert!(k.composition.any());
    }

    #[test]
    fn test_items_forms() {
        assert_eq!(parse(json!({"items": {}})).unwrap().items, ItemsDecl::Single);
        assert_eq!(
            parse(json!({"items": [{}, {}, {}]})).unwrap().items,
            ItemsDecl::Tuple(3)
        );
    }

    #[test]
    fn test_non_object_fragment_rejected() {
        let err = Keywords::parse(&json!([1]), "#/definitions/X").unwrap_err();
        assert!(err.to_string().contains("#/definitions/X"));
        assert!(err.to_string().contains("found array"));
    }

    #[test]
    fn test_malformed_keywords_rejected() {
        for bad in [
            json!({"anyOf": {}}),
            json!({"oneOf": []}),
            json!({"minimum": "0"}),
            json!({"multipleOf": 0}),
            json!({"required": [1]}),
            json!({"type": 3}),
            json!({"type": []}),
            json!({"$ref": 7}),
            json!({"additionalProperties": "no"}),
            json!({"minItems": -1}),
            json!({"exclusiveMinimum": 3}),
        ] {
            assert!(
                matches!(parse(bad.clone()), Err(SchemaError::InvalidSchema { .. })),
                "{bad} should be rejected"
            );
        }
    }
}
