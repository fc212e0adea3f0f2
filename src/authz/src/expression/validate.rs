//! Shape validation for expressions and templates in their JSON form

use serde_json::{Map, Value};

use crate::error::{AuthzError, Result};

/// Checks whether `value` is a well-formed expression or template
///
/// Well-formed means a non-empty string, or an object with exactly one of
/// the keys `AnyOf`, `AllOf`, `if` (with `then`) or `for` (with `in` and
/// `each`) whose value has the right shape, recursively.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use taskauth_authz::expression::validate;
///
/// assert!(validate(&json!({"AnyOf": ["something"]})));
/// assert!(validate(&json!({"AnyOf": [{"for": "foo", "in": "bar", "each": "<foo>"}]})));
/// assert!(!validate(&json!(["test:unit"])));
/// assert!(!validate(&json!([[]])));
/// ```
pub fn validate(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Object(map) => validate_object(map),
        _ => false,
    }
}

fn validate_object(map: &Map<String, Value>) -> bool {
    let has = |key: &str| map.contains_key(key);

    if has("if") {
        return map.len() == 2
            && matches!(map.get("if"), Some(Value::String(_)))
            && map.get("then").map(validate).unwrap_or(false);
    }

    if has("for") {
        return map.len() == 3
            && ["for", "in", "each"]
                .iter()
                .all(|k| matches!(map.get(*k), Some(Value::String(_))));
    }

    if map.len() != 1 {
        return false;
    }

    match (map.get("AnyOf"), map.get("AllOf")) {
        (Some(Value::Array(items)), None) | (None, Some(Value::Array(items))) => {
            items.iter().all(validate)
        }
        _ => false,
    }
}

/// Validates the scope declaration of an operation at registration time
///
/// Declarations must be objects. A bare string, a bare array, or any
/// malformed nested shape is rejected with an `InvalidExpression` error so
/// start-up fails before the first request.
pub fn validate_declaration(value: &Value) -> Result<()> {
    match value {
        Value::Object(_) if validate(value) => Ok(()),
        Value::Object(_) => Err(AuthzError::InvalidExpression(format!(
            "Invalid scope expression template: {}",
            value
        ))),
        _ => Err(AuthzError::InvalidExpression(
            "Scope expressions must be objects".to_string(),
        )),
    }
}
