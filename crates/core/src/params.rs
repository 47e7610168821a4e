//! Typed parameter extraction from `serde_json::Value` objects.
//!
//! The lenient helpers (`param_*`) fall back to a default when the key is
//! missing or has the wrong type; tracing tunables use them so a partial
//! params object is always usable. The strict helper (`require_f64`) is used
//! for scene fields that have no sensible default.

use crate::error::FieldError;
use serde_json::Value;

/// Extracts an `f64` from `params[name]`, returning `default` if missing or wrong type.
///
/// Integers are accepted and converted.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Extracts a `usize` from `params[name]`, returning `default` if missing or wrong type.
///
/// Only non-negative integers are accepted.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

/// Extracts a `String` from `params[name]`, returning `default` if missing or wrong type.
pub fn param_string(params: &Value, name: &str, default: &str) -> String {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| default.to_owned())
}

/// Extracts a required finite `f64` from `params[name]`.
///
/// Returns `FieldError::ParamNotFound` when the key is absent and
/// `FieldError::ParamTypeMismatch` when it is not a finite number.
pub fn require_f64(params: &Value, name: &str) -> Result<f64, FieldError> {
    let value = params
        .get(name)
        .ok_or_else(|| FieldError::ParamNotFound(name.to_owned()))?;
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FieldError::ParamTypeMismatch {
            name: name.to_owned(),
            expected: "finite number".into(),
            got: json_type_name(value).into(),
        })
}

/// Short JSON type name used in mismatch messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- param_f64 --

    #[test]
    fn param_f64_extracts_existing_float() {
        let params = json!({"step_size": 2.5});
        assert!((param_f64(&params, "step_size", 1.0) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_extracts_integer_as_float() {
        let params = json!({"capture_radius": 10});
        assert!((param_f64(&params, "capture_radius", 0.0) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_returns_default_when_key_missing_or_wrong_type() {
        let params = json!({"step_size": "fast"});
        assert!((param_f64(&params, "step_size", 5.0) - 5.0).abs() < f64::EPSILON);
        assert!((param_f64(&params, "other", 3.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_returns_default_for_non_object() {
        let params = json!("not an object");
        assert!((param_f64(&params, "step_size", 7.0) - 7.0).abs() < f64::EPSILON);
    }

    // -- param_usize --

    #[test]
    fn param_usize_extracts_existing_integer() {
        let params = json!({"max_steps": 4000});
        assert_eq!(param_usize(&params, "max_steps", 0), 4000);
    }

    #[test]
    fn param_usize_rejects_float_and_negative() {
        assert_eq!(param_usize(&json!({"max_steps": 2.5}), "max_steps", 99), 99);
        assert_eq!(param_usize(&json!({"max_steps": -1}), "max_steps", 5), 5);
    }

    // -- param_string --

    #[test]
    fn param_string_extracts_existing_string() {
        let params = json!({"traversal": "arrival_pressure"});
        assert_eq!(
            param_string(&params, "traversal", "static_score"),
            "arrival_pressure"
        );
    }

    #[test]
    fn param_string_returns_default_for_wrong_type() {
        let params = json!({"traversal": 42});
        assert_eq!(param_string(&params, "traversal", "static_score"), "static_score");
    }

    // -- require_f64 --

    #[test]
    fn require_f64_returns_value() {
        let params = json!({"width": 400});
        assert!((require_f64(&params, "width").unwrap() - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn require_f64_missing_is_param_not_found() {
        let result = require_f64(&json!({}), "width");
        assert!(matches!(result, Err(FieldError::ParamNotFound(name)) if name == "width"));
    }

    #[test]
    fn require_f64_wrong_type_reports_json_type() {
        let result = require_f64(&json!({"width": "wide"}), "width");
        match result {
            Err(FieldError::ParamTypeMismatch { name, got, .. }) => {
                assert_eq!(name, "width");
                assert_eq!(got, "string");
            }
            other => panic!("expected ParamTypeMismatch, got {other:?}"),
        }
    }
}
