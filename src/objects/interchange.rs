//! Lenient GeoJSON-superset text handling.
//!
//! The remote side exchanges annotation objects as GeoJSON text that may
//! contain bare `NaN`, `Infinity` and `-Infinity` literals; measurement
//! values are frequently NaN and must survive a round trip. `serde_json`
//! rejects non-finite numbers in both directions, so this module rewrites
//! those literals to sentinel strings before parsing and back to literals
//! after serializing. The sentinels start with a NUL byte, which cannot
//! appear unescaped in JSON text, so they can never collide with real data.

use serde_json::{Map, Value};

/// Sentinel for a bare `NaN` literal.
const NAN_SENTINEL: &str = "\u{0}NaN";

/// Sentinel for a bare `Infinity` literal.
const INF_SENTINEL: &str = "\u{0}Infinity";

/// Sentinel for a bare `-Infinity` literal.
const NEG_INF_SENTINEL: &str = "\u{0}-Infinity";

// =============================================================================
// Parsing
// =============================================================================

/// Parse interchange text, accepting non-finite number literals.
pub fn parse(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_slice(&quote_non_finite(text))
}

/// Extract the feature objects from parsed interchange text.
///
/// A feature-collection wrapper is unwrapped to its feature list; a bare
/// array is taken as-is; any other object is treated as a single feature.
pub fn unwrap_features(value: Value) -> Vec<Map<String, Value>> {
    let entries = match value {
        Value::Object(mut obj) => match obj.remove("features") {
            Some(Value::Array(features)) => features,
            _ => vec![Value::Object(obj)],
        },
        Value::Array(entries) => entries,
        _ => Vec::new(),
    };
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(obj) => Some(obj),
            _ => None,
        })
        .collect()
}

/// Rewrite bare non-finite literals to quoted sentinels.
///
/// Operates outside string context only; `"NaN"` inside a string value is
/// left alone. Works on bytes so multibyte text passes through untouched.
fn quote_non_finite(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    let mut in_string = false;
    let mut escaped = false;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            out.push(b);
            i += 1;
            continue;
        }
        match b {
            b'"' => {
                in_string = true;
                out.push(b'"');
                i += 1;
            }
            b'N' if bytes[i..].starts_with(b"NaN") => {
                out.extend_from_slice(b"\"\\u0000NaN\"");
                i += 3;
            }
            b'I' if bytes[i..].starts_with(b"Infinity") => {
                out.extend_from_slice(b"\"\\u0000Infinity\"");
                i += 8;
            }
            b'-' if bytes[i..].starts_with(b"-Infinity") => {
                out.extend_from_slice(b"\"\\u0000-Infinity\"");
                i += 9;
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

// =============================================================================
// Serializing
// =============================================================================

/// Serialize a value to interchange text, emitting non-finite literals.
pub fn to_string(value: &Value) -> Result<String, serde_json::Error> {
    let text = serde_json::to_string(value)?;
    Ok(restore_non_finite(text))
}

/// Rewrite serialized sentinel strings back to bare literals.
fn restore_non_finite(text: String) -> String {
    // serde_json escapes the NUL prefix as \u0000, so the serialized
    // sentinels have a fixed spelling.
    text.replace("\"\\u0000NaN\"", "NaN")
        .replace("\"\\u0000-Infinity\"", "-Infinity")
        .replace("\"\\u0000Infinity\"", "Infinity")
}

// =============================================================================
// Number Bridging
// =============================================================================

/// Convert an f64 to an interchange value, non-finite included.
pub fn number_value(v: f64) -> Value {
    if v.is_nan() {
        Value::String(NAN_SENTINEL.to_string())
    } else if v == f64::INFINITY {
        Value::String(INF_SENTINEL.to_string())
    } else if v == f64::NEG_INFINITY {
        Value::String(NEG_INF_SENTINEL.to_string())
    } else {
        // Finite f64 always converts.
        Value::from(v)
    }
}

/// Read an interchange value as an f64, sentinels included.
pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s == NAN_SENTINEL => Some(f64::NAN),
        Value::String(s) if s == INF_SENTINEL => Some(f64::INFINITY),
        Value::String(s) if s == NEG_INF_SENTINEL => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
