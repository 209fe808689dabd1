//! Typed coercion of raw setting strings.

/// Integer form of a setting: an optional leading `-` followed by ASCII
/// digits. `None` when empty, signed with `+`, or not a number.
pub fn parse_int(raw: &str) -> Option<i64> {
    if raw.is_empty() || raw.starts_with('+') {
        return None;
    }
    raw.parse::<i64>().ok()
}

/// Boolean form of a setting; `None` for unrecognised tokens
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "True" | "TRUE" | "1" | "yes" | "Yes" | "YES" => Some(true),
        "false" | "False" | "FALSE" | "0" | "no" | "No" | "NO" => Some(false),
        _ => None,
    }
}
