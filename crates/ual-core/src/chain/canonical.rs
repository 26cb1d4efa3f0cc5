//! Canonical JSON serialization.
//!
//! Produces compact JSON with object keys sorted lexicographically at every
//! nesting level. Record hashing depends on it: the same logical payload must
//! always produce the same byte sequence, regardless of map insertion order.
//!
//! Rules:
//! - Compact: no whitespace between tokens.
//! - Object keys sorted lexicographically (recursive at every depth).
//! - Arrays preserve element order.
//! - Numbers, strings, booleans, and null serialized normally.

use serde_json::Value;

/// Produce a canonical JSON string from a [`serde_json::Value`].
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use ual_core::chain::canonical::canonicalize_json;
///
/// let val = json!({"z": 1, "a": {"c": 3, "b": 2}});
/// assert_eq!(canonicalize_json(&val), r#"{"a":{"b":2,"c":3},"z":1}"#);
/// ```
#[must_use]
pub fn canonicalize_json(value: &Value) -> String {
    let mut buf = String::new();
    write_canonical(value, &mut buf);
    buf
}

fn write_canonical(value: &Value, buf: &mut String) {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => buf.push_str(&n.to_string()),
        // Value's Display emits compact, correctly escaped JSON.
        Value::String(_) => buf.push_str(&value.to_string()),
        Value::Array(arr) => {
            buf.push('[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_canonical(item, buf);
            }
            buf.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            buf.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                buf.push_str(&Value::String(key.clone()).to_string());
                buf.push(':');
                write_canonical(val, buf);
            }
            buf.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert_eq!(canonicalize_json(&json!(null)), "null");
        assert_eq!(canonicalize_json(&json!(true)), "true");
        assert_eq!(canonicalize_json(&json!(42)), "42");
        assert_eq!(canonicalize_json(&json!(2.5)), "2.5");
        assert_eq!(canonicalize_json(&json!("hello")), "\"hello\"");
    }

    #[test]
    fn string_with_escapes() {
        assert_eq!(
            canonicalize_json(&json!("he said \"hi\"\n")),
            "\"he said \\\"hi\\\"\\n\""
        );
    }

    #[test]
    fn array_preserves_order() {
        assert_eq!(canonicalize_json(&json!([3, 1, 2])), "[3,1,2]");
    }

    #[test]
    fn nested_object_keys_sorted() {
        let val = json!({"z": 1, "a": {"c": 3, "b": 2}, "m": [{"y": 1, "x": 2}]});
        assert_eq!(
            canonicalize_json(&val),
            r#"{"a":{"b":2,"c":3},"m":[{"x":2,"y":1}],"z":1}"#
        );
    }

    #[test]
    fn escaped_keys() {
        let val = json!({"quote\"key": 1});
        assert_eq!(canonicalize_json(&val), r#"{"quote\"key":1}"#);
    }

    #[test]
    fn record_payload_canonical() {
        let val = json!({
            "target_item": "PO-1023",
            "action_type": "approve",
            "context_tags": {"priority": "high", "channel": "email"},
        });
        assert_eq!(
            canonicalize_json(&val),
            r#"{"action_type":"approve","context_tags":{"channel":"email","priority":"high"},"target_item":"PO-1023"}"#
        );
    }

    #[test]
    fn idempotent_and_unicode() {
        let val = json!({"b": 1, "a": {"d": "日本語", "c": "🎉"}});
        let first = canonicalize_json(&val);
        let reparsed: Value = serde_json::from_str(&first).expect("parse");
        assert_eq!(first, canonicalize_json(&reparsed));
        assert!(first.contains("日本語"));
    }
}
