//! Helpers for reading the `TKT_*` settings that the server and the provider client share.

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Splits a comma-separated setting into its trimmed, non-empty entries.
///
/// `None` is returned when the value is missing or holds no entries at all, so that callers can fall back to their
/// defaults with `unwrap_or`.
pub fn parse_list(value: Option<String>) -> Option<Vec<String>> {
    let entries = value?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect::<Vec<_>>();
    (!entries.is_empty()).then_some(entries)
}

/// Trims and lowercases a setting such as a header name or currency code. Blank values mean "use the default".
pub fn lowercase_or(value: Option<String>, default: &str) -> String {
    value
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Provider base URLs are joined with paths that start with `/`.
pub fn base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}
