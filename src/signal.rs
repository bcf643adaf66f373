//! Outcome signal coercion.
//!
//! Pipelines set outcome flags either as native booleans or as strings.
//! Every flag read by the bridge goes through [`parse_flag`].

use serde_json::Value;

/// Coerce a dynamically typed flag into a boolean.
///
/// - `Bool(b)` → `b`
/// - `String(s)` → `true` iff `s` (trimmed) equals `"true"` ignoring case
/// - anything else, including an absent value → `false`
pub fn parse_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => parse_bool_str(s).unwrap_or(false),
        _ => false,
    }
}

/// Parse a boolean string case-insensitively. Returns `None` when unparsable.
pub fn parse_bool_str(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
