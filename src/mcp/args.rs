// src/mcp/args.rs
//
// Typed access to the `arguments` object of a tools/call request.
// Every failure is a ValidationError naming the offending field, so
// bad input is rejected before any RPC work starts.

use crate::errors::ServerError;
use serde_json::Value;

pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ServerError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            ServerError::validation(format!("missing or invalid required argument '{}'", key))
        })
}

pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str()).filter(|s| !s.trim().is_empty())
}

pub fn optional_f64(args: &Value, key: &str) -> Result<Option<f64>, ServerError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| {
            ServerError::validation(format!("argument '{}' must be a number", key))
        }),
    }
}

pub fn optional_u64(args: &Value, key: &str) -> Result<Option<u64>, ServerError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            ServerError::validation(format!("argument '{}' must be a non-negative integer", key))
        }),
    }
}

pub fn required_array<'a>(args: &'a Value, key: &str) -> Result<&'a Vec<Value>, ServerError> {
    args.get(key).and_then(|v| v.as_array()).ok_or_else(|| {
        ServerError::validation(format!("missing or invalid required argument '{}' (array)", key))
    })
}

/// Optional array of strings, e.g. a candidate network list.
pub fn optional_str_array(args: &Value, key: &str) -> Result<Option<Vec<String>>, ServerError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) => out.push(s.to_string()),
                    None => {
                        return Err(ServerError::validation(format!(
                            "argument '{}' must be an array of strings",
                            key
                        )))
                    }
                }
            }
            Ok(Some(out))
        }
        Some(_) => Err(ServerError::validation(format!(
            "argument '{}' must be an array of strings",
            key
        ))),
    }
}

/// An enum-typed string argument, rejected early when outside its domain.
pub fn optional_enum<'a>(
    args: &'a Value,
    key: &str,
    allowed: &[&str],
) -> Result<Option<&'a str>, ServerError> {
    match optional_str(args, key) {
        None => Ok(None),
        Some(s) if allowed.contains(&s) => Ok(Some(s)),
        Some(s) => Err(ServerError::validation(format!(
            "argument '{}' must be one of [{}], got '{}'",
            key,
            allowed.join(", "),
            s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_str_rejects_missing_empty_and_nonstring() {
        assert!(required_str(&json!({}), "address").is_err());
        assert!(required_str(&json!({"address": ""}), "address").is_err());
        assert!(required_str(&json!({"address": 7}), "address").is_err());
        assert_eq!(required_str(&json!({"address": "0xabc"}), "address").unwrap(), "0xabc");
    }

    #[test]
    fn enum_domain_is_enforced() {
        let allowed = ["slow", "standard", "fast", "instant"];
        assert_eq!(
            optional_enum(&json!({"speed": "fast"}), "speed", &allowed).unwrap(),
            Some("fast")
        );
        assert!(optional_enum(&json!({"speed": "warp"}), "speed", &allowed).is_err());
        assert_eq!(optional_enum(&json!({}), "speed", &allowed).unwrap(), None);
    }

    #[test]
    fn string_arrays_must_be_homogeneous() {
        assert_eq!(
            optional_str_array(&json!({"networks": ["iota", "shimmer"]}), "networks").unwrap(),
            Some(vec!["iota".to_string(), "shimmer".to_string()])
        );
        assert!(optional_str_array(&json!({"networks": ["iota", 5]}), "networks").is_err());
        assert!(optional_str_array(&json!({"networks": "iota"}), "networks").is_err());
    }

    #[test]
    fn numbers_are_validated_not_coerced() {
        assert_eq!(optional_f64(&json!({"p": 1.5}), "p").unwrap(), Some(1.5));
        assert!(optional_f64(&json!({"p": "1.5"}), "p").is_err());
        assert_eq!(optional_u64(&json!({"n": 3}), "n").unwrap(), Some(3));
        assert!(optional_u64(&json!({"n": -3}), "n").is_err());
    }
}
