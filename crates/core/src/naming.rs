//! Identifier helpers for declaration names and property keys.

use crate::types::{HttpMethod, Verb};

/// Check if a property key must be quoted.
///
/// Returns true if the name:
/// - Is empty
/// - Doesn't start with a letter, underscore, or dollar sign
/// - Contains characters other than alphanumeric, underscore, or dollar sign
pub fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    !chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Escape a string for use in a double-quoted TypeScript string literal.
pub fn escape_ts_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Quote a property key if it is not a valid identifier.
pub fn quote_if_needed(name: &str) -> String {
    if needs_quoting(name) {
        format!("\"{}\"", escape_ts_string(name))
    } else {
        name.to_string()
    }
}

/// Convert a string to UpperCamelCase.
///
/// Words are split on `-`, `_`, `.`, space and `/`. A word written entirely in
/// upper case is lowered after its first letter (`GET` -> `Get`); mixed-case
/// words keep their inner casing (`userId` -> `UserId`).
pub fn upper_camel(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for word in s.split(['-', '_', '.', ' ', '/']) {
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        result.extend(first.to_uppercase());
        let rest = chars.as_str();
        let shouting = word.chars().any(char::is_alphabetic)
            && !word.chars().any(char::is_lowercase);
        if shouting {
            result.push_str(&rest.to_lowercase());
        } else {
            result.push_str(rest);
        }
    }
    result
}

/// Strip bracket markup from a route segment: `[[...slugs]]`, `[...slugs]`
/// and `[id]` become `slugs`, `slugs` and `id`.
pub fn bare_segment(segment: &str) -> &str {
    if let Some(inner) = segment
        .strip_prefix("[[...")
        .and_then(|s| s.strip_suffix("]]"))
    {
        return inner;
    }
    if let Some(inner) = segment.strip_prefix("[...").and_then(|s| s.strip_suffix(']')) {
        return inner;
    }
    if let Some(inner) = segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return inner;
    }
    segment
}

/// Deterministic declaration name for a (method, route, verb) triple.
///
/// `GET` + `api/widgets/[id]` + request gives `GetApiWidgetsIdRequest`.
pub fn declaration_name(route_key: &str, method: HttpMethod, verb: Verb) -> String {
    let route: String = route_key
        .split('/')
        .map(|segment| upper_camel(bare_segment(segment)))
        .collect();
    format!(
        "{}{}{}",
        upper_camel(method.as_str()),
        route,
        upper_camel(verb.suffix())
    )
}

/// Name of the exported route-index interface, e.g. `GetRequest`.
pub fn index_name(method: HttpMethod, verb: Verb) -> String {
    format!("{}{}", upper_camel(method.as_str()), verb.suffix())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_quoting() {
        assert!(!needs_quoting("foo"));
        assert!(!needs_quoting("_foo"));
        assert!(!needs_quoting("$foo"));
        assert!(!needs_quoting("foo123"));

        assert!(needs_quoting(""));
        assert!(needs_quoting("123foo"));
        assert!(needs_quoting("foo-bar"));
        assert!(needs_quoting("api/widgets/[id]"));
    }

    #[test]
    fn test_quote_if_needed() {
        assert_eq!(quote_if_needed("id"), "id");
        assert_eq!(quote_if_needed("content-type"), "\"content-type\"");
        assert_eq!(quote_if_needed("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_upper_camel() {
        assert_eq!(upper_camel("GET"), "Get");
        assert_eq!(upper_camel("api"), "Api");
        assert_eq!(upper_camel("userId"), "UserId");
        assert_eq!(upper_camel("user-profile"), "UserProfile");
        assert_eq!(upper_camel("snake_case_name"), "SnakeCaseName");
        assert_eq!(upper_camel("v2"), "V2");
        assert_eq!(upper_camel(""), "");
    }

    #[test]
    fn test_bare_segment() {
        assert_eq!(bare_segment("[id]"), "id");
        assert_eq!(bare_segment("[...slugs]"), "slugs");
        assert_eq!(bare_segment("[[...slugs]]"), "slugs");
        assert_eq!(bare_segment("widgets"), "widgets");
    }

    #[test]
    fn test_declaration_name() {
        assert_eq!(
            declaration_name("api/widgets/[id]", HttpMethod::Get, Verb::Request),
            "GetApiWidgetsIdRequest"
        );
        assert_eq!(
            declaration_name("api/files/[[...path]]", HttpMethod::Delete, Verb::Response),
            "DeleteApiFilesPathResponse"
        );
        assert_eq!(
            declaration_name("api/user-profile", HttpMethod::Post, Verb::Request),
            "PostApiUserProfileRequest"
        );
    }

    #[test]
    fn test_names_differ_only_by_method_prefix() {
        let get = declaration_name("api/widgets/[id]", HttpMethod::Get, Verb::Request);
        let put = declaration_name("api/widgets/[id]", HttpMethod::Put, Verb::Request);
        assert_eq!(get.strip_prefix("Get"), put.strip_prefix("Put"));
        assert_ne!(get, put);
    }

    #[test]
    fn test_index_name() {
        assert_eq!(index_name(HttpMethod::Options, Verb::Response), "OptionsResponse");
    }
}
