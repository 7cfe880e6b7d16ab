//! Interpretation of validator descriptors against values.
//!
//! Every descriptor first applies the `Undefined` rule: an absent value
//! passes when `allow_undefined` is set and fails with a `required`
//! violation otherwise. Only defined values reach the category checks.

use serde_json::{Number, Value};
use sperf_core::pointer;
use sperf_core::ValidationError;

use crate::descriptor::{
    ArrayConstraints, InstanceType, Items, NumericConstraints, StringConstraints, Validator,
    ValidatorKind,
};
use crate::instance::{is_integral, json_equal, json_type_name, render_value, Instance};
use crate::object::{NoLookup, ObjectLookup, ObjectRef};

/// Relative tolerance of the floating-point `multipleOf` check.
const MULTIPLE_OF_EPSILON: f64 = 1e-9;

impl Validator {
    /// Validate an instance. Named object references are only type-checked.
    pub fn validate<'a>(&self, instance: impl Into<Instance<'a>>) -> Result<(), ValidationError> {
        self.validate_at(instance.into(), "", &NoLookup)
    }

    /// Validate an instance, resolving named object references through `lookup`.
    pub fn validate_in<'a>(
        &self,
        instance: impl Into<Instance<'a>>,
        lookup: &dyn ObjectLookup,
    ) -> Result<(), ValidationError> {
        self.validate_at(instance.into(), "", lookup)
    }

    /// Shorthand for `validate(..).is_ok()`.
    pub fn is_valid<'a>(&self, instance: impl Into<Instance<'a>>) -> bool {
        self.validate(instance).is_ok()
    }

    pub(crate) fn validate_at(
        &self,
        instance: Instance<'_>,
        path: &str,
        lookup: &dyn ObjectLookup,
    ) -> Result<(), ValidationError> {
        let value = match instance {
            Instance::Undefined if self.allow_undefined => return Ok(()),
            Instance::Undefined => {
                return Err(ValidationError::ConstraintViolation {
                    path: path.to_string(),
                    keyword: "required".to_string(),
                    value: instance.render(),
                    reason: format!("a {} value is required", self.category()),
                })
            }
            Instance::Defined(value) => value,
        };

        match &self.kind {
            ValidatorKind::Null => expect_type(value.is_null(), "null", value, path),
            ValidatorKind::Boolean => expect_type(value.is_boolean(), "boolean", value, path),
            ValidatorKind::Number(c) => check_number(c, false, value, path),
            ValidatorKind::Integer(c) => check_number(c, true, value, path),
            ValidatorKind::String(c) => check_string(c, value, path),
            ValidatorKind::Array(c) => check_array(c, value, path, lookup),
            ValidatorKind::Enum { values } => {
                if values.iter().any(|allowed| json_equal(allowed, value)) {
                    Ok(())
                } else {
                    Err(violation(path, "enum", value, format!(
                        "not one of {}",
                        Value::Array(values.clone())
                    )))
                }
            }
            ValidatorKind::InstanceOf { instance } => check_instance(instance, value, path, lookup),
            ValidatorKind::Union { members } => {
                if members.iter().any(|m| m.type_check(value, lookup)) {
                    Ok(())
                } else {
                    let expected: Vec<&str> = members.iter().map(member_type_name).collect();
                    Err(ValidationError::TypeMismatch {
                        path: path.to_string(),
                        expected: expected.join(" | "),
                        found: json_type_name(value).to_string(),
                    })
                }
            }
            ValidatorKind::AnyOf { branches } => {
                let (matched, failures) = run_branches(branches, value, path, lookup);
                if matched.is_empty() {
                    Err(violation(path, "anyOf", value, format!(
                        "no branch matched: {}",
                        failures.join("; ")
                    )))
                } else {
                    Ok(())
                }
            }
            ValidatorKind::OneOf { branches } => {
                let (matched, failures) = run_branches(branches, value, path, lookup);
                match matched.len() {
                    1 => Ok(()),
                    0 => Err(violation(path, "oneOf", value, format!(
                        "no branch matched: {}",
                        failures.join("; ")
                    ))),
                    _ => Err(violation(path, "oneOf", value, format!(
                        "branches {matched:?} all matched, exactly one is allowed"
                    ))),
                }
            }
            ValidatorKind::AllOf { branches } => {
                for (i, branch) in branches.iter().enumerate() {
                    if let Err(e) = branch.validate_at(Instance::Defined(value), path, lookup) {
                        return Err(violation(path, "allOf", value, format!("branch [{i}] failed: {e}")));
                    }
                }
                Ok(())
            }
            ValidatorKind::Not { inner } => {
                if inner.validate_at(Instance::Defined(value), path, lookup).is_ok() {
                    Err(violation(path, "not", value, format!(
                        "must not satisfy the {} descriptor",
                        inner.category()
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// The structural type check used by `Union` members.
    ///
    /// Primitive, array, enum and instance-of members check the JSON type
    /// (or membership) only; composition members fall back to full
    /// validation since they have no single type.
    fn type_check(&self, value: &Value, lookup: &dyn ObjectLookup) -> bool {
        match &self.kind {
            ValidatorKind::Null => value.is_null(),
            ValidatorKind::Boolean => value.is_boolean(),
            ValidatorKind::Number(_) => value.is_number(),
            ValidatorKind::Integer(_) => value.as_number().is_some_and(is_integral),
            ValidatorKind::String(_) => value.is_string(),
            ValidatorKind::Array(_) => value.is_array(),
            ValidatorKind::Enum { values } => values.iter().any(|v| json_equal(v, value)),
            ValidatorKind::InstanceOf { .. } => value.is_object(),
            ValidatorKind::Union { members } => members.iter().any(|m| m.type_check(value, lookup)),
            ValidatorKind::AnyOf { .. }
            | ValidatorKind::OneOf { .. }
            | ValidatorKind::AllOf { .. }
            | ValidatorKind::Not { .. } => self
                .validate_at(Instance::Defined(value), "", lookup)
                .is_ok(),
        }
    }
}

fn member_type_name(member: &Validator) -> &'static str {
    match &member.kind {
        ValidatorKind::InstanceOf { .. } => "object",
        _ => member.category(),
    }
}

fn violation(path: &str, keyword: &str, value: &Value, reason: String) -> ValidationError {
    ValidationError::ConstraintViolation {
        path: path.to_string(),
        keyword: keyword.to_string(),
        value: render_value(value),
        reason,
    }
}

fn expect_type(ok: bool, expected: &str, value: &Value, path: &str) -> Result<(), ValidationError> {
    if ok {
        Ok(())
    } else {
        Err(ValidationError::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            found: json_type_name(value).to_string(),
        })
    }
}

fn run_branches(
    branches: &[Validator],
    value: &Value,
    path: &str,
    lookup: &dyn ObjectLookup,
) -> (Vec<usize>, Vec<String>) {
    let mut matched = Vec::new();
    let mut failures = Vec::new();
    for (i, branch) in branches.iter().enumerate() {
        match branch.validate_at(Instance::Defined(value), path, lookup) {
            Ok(()) => matched.push(i),
            Err(e) => failures.push(format!("[{i}] {e}")),
        }
    }
    (matched, failures)
}

fn check_number(
    c: &NumericConstraints,
    integer: bool,
    value: &Value,
    path: &str,
) -> Result<(), ValidationError> {
    let expected = if integer { "integer" } else { "number" };
    let Some(n) = value.as_number() else {
        return expect_type(false, expected, value, path);
    };
    if integer && !is_integral(n) {
        return expect_type(false, expected, value, path);
    }
    let Some(x) = n.as_f64() else {
        return expect_type(false, expected, value, path);
    };

    if let Some(min) = c.minimum {
        if c.exclusive_minimum && x <= min {
            return Err(violation(path, "exclusiveMinimum", value, format!("must be greater than {min}")));
        }
        if !c.exclusive_minimum && x < min {
            return Err(violation(path, "minimum", value, format!("must be at least {min}")));
        }
    }
    if let Some(max) = c.maximum {
        if c.exclusive_maximum && x >= max {
            return Err(violation(path, "exclusiveMaximum", value, format!("must be less than {max}")));
        }
        if !c.exclusive_maximum && x > max {
            return Err(violation(path, "maximum", value, format!("must be at most {max}")));
        }
    }
    if let Some(multiple) = c.multiple_of {
        if !is_multiple_of(n, x, multiple) {
            return Err(violation(path, "multipleOf", value, format!("must be a multiple of {multiple}")));
        }
    }
    Ok(())
}

fn is_multiple_of(n: &Number, x: f64, multiple: f64) -> bool {
    if !(multiple.is_finite() && multiple > 0.0) {
        return false;
    }
    // Exact arithmetic when both sides are integers.
    if multiple.fract() == 0.0 && multiple <= i64::MAX as f64 {
        let m = multiple as i64;
        if let Some(i) = n.as_i64() {
            return i % m == 0;
        }
        if let Some(u) = n.as_u64() {
            return u % (m as u64) == 0;
        }
    }
    let quotient = x / multiple;
    (quotient - quotient.round()).abs() <= MULTIPLE_OF_EPSILON * quotient.abs().max(1.0)
}

fn check_string(c: &StringConstraints, value: &Value, path: &str) -> Result<(), ValidationError> {
    let Some(s) = value.as_str() else {
        return expect_type(false, "string", value, path);
    };
    let len = s.chars().count() as u64;
    if let Some(min) = c.min_length {
        if len < min {
            return Err(violation(path, "minLength", value, format!("length {len} is below {min}")));
        }
    }
    if let Some(max) = c.max_length {
        if len > max {
            return Err(violation(path, "maxLength", value, format!("length {len} exceeds {max}")));
        }
    }
    Ok(())
}

fn check_array(
    c: &ArrayConstraints,
    value: &Value,
    path: &str,
    lookup: &dyn ObjectLookup,
) -> Result<(), ValidationError> {
    let Some(elements) = value.as_array() else {
        return expect_type(false, "array", value, path);
    };
    let len = elements.len() as u64;
    if let Some(min) = c.min_items {
        if len < min {
            return Err(violation(path, "minItems", value, format!("{len} items, at least {min} required")));
        }
    }
    if let Some(max) = c.max_items {
        if len > max {
            return Err(violation(path, "maxItems", value, format!("{len} items, at most {max} allowed")));
        }
    }

    match &c.items {
        Items::Any => Ok(()),
        Items::Each(item) => elements.iter().enumerate().try_for_each(|(i, element)| {
            item.validate_at(Instance::Defined(element), &pointer::push_index(path, i), lookup)
        }),
        Items::Positional(items) => items.iter().zip(elements).enumerate().try_for_each(
            |(i, (item, element))| {
                item.validate_at(Instance::Defined(element), &pointer::push_index(path, i), lookup)
            },
        ),
    }
}

fn check_instance(
    instance: &InstanceType,
    value: &Value,
    path: &str,
    lookup: &dyn ObjectLookup,
) -> Result<(), ValidationError> {
    match instance {
        InstanceType::Mapping => expect_type(value.is_object(), "object", value, path),
        InstanceType::Object(ObjectRef::Inline(def)) => def.validate_at(value, path, lookup),
        InstanceType::Object(ObjectRef::Named(name)) => match lookup.lookup_object(name) {
            Some(def) => def.validate_at(value, path, lookup),
            None => expect_type(value.is_object(), &format!("object ({name})"), value, path),
        },
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        /// `Undefined` passes every optional descriptor.
        #[test]
        fn undefined_passes_optional(min in -1000i64..1000, max in -1000i64..1000) {
            let v = Validator::integer_with(
                NumericConstraints::default().minimum(min as f64).maximum(max as f64),
            );
            prop_assert!(v.validate(Instance::Undefined).is_ok());
        }

        /// `oneOf` passes iff exactly one branch passes.
        #[test]
        fn one_of_exactly_one(x in -1000.0f64..1000.0) {
            let a = Validator::number_with(NumericConstraints::default().minimum(0.0));
            let b = Validator::number_with(NumericConstraints::default().maximum(10.0));
            let value = json!(x);
            let count = [&a, &b].iter().filter(|v| v.is_valid(&value)).count();
            let one_of = Validator::one_of(vec![a.clone(), b.clone()]);
            prop_assert_eq!(one_of.is_valid(&value), count == 1);
            let any_of = Validator::any_of(vec![a, b]);
            prop_assert_eq!(any_of.is_valid(&value), count >= 1);
        }

        /// Integer multiples are exact.
        #[test]
        fn integer_multiple_exact(i in -100_000i64..100_000, m in 1i64..50) {
            let v = Validator::integer_with(NumericConstraints::default().multiple_of(m as f64));
            prop_assert_eq!(v.is_valid(&json!(i)), i % m == 0);
        }

        /// `not` inverts validation of defined values.
        #[test]
        fn not_inverts(s in ".{0,8}", n in any::<i32>()) {
            let v = Validator::string();
            let neg = Validator::not(v.clone());
            for value in [json!(s), json!(n)] {
                prop_assert_eq!(v.is_valid(&value), !neg.is_valid(&value));
            }
        }
    }
}
