//! Literal, case-insensitive substring search on organization names.

use crate::error::check_limit;
use crate::Result;

pub const DEFAULT_SEARCH_LIMIT: usize = 50;
pub const MAX_SEARCH_LIMIT: usize = 200;

/// Escape character used in generated `LIKE` patterns.
pub const LIKE_ESCAPE: char = '\\';

/// Trimmed query, or `None` when nothing is left to search for.
#[must_use]
pub fn normalize_query(query: &str) -> Option<&str> {
    let trimmed = query.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Escape `LIKE` metacharacters so they match literally.
#[must_use]
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// `%<escaped query>%` for an `ILIKE ... ESCAPE '\'` clause, or `None` for a
/// blank query.
#[must_use]
pub fn like_pattern(query: &str) -> Option<String> {
    normalize_query(query).map(|q| format!("%{}%", escape_like(q)))
}

/// In-process equivalent of the `ILIKE` pattern built by [`like_pattern`].
#[must_use]
pub fn matches_name(name: &str, query: &str) -> bool {
    normalize_query(query).is_some_and(|q| name.to_lowercase().contains(&q.to_lowercase()))
}

/// # Errors
///
/// Returns `InvalidParameter` unless `1 <= limit <= MAX_SEARCH_LIMIT`.
pub fn validate_search_limit(limit: usize) -> Result<()> {
    check_limit(limit, MAX_SEARCH_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_queries_normalize_to_none() {
        assert_eq!(normalize_query(""), None);
        assert_eq!(normalize_query(" \t\n "), None);
        assert_eq!(normalize_query("  рога "), Some("рога"));
    }

    #[test]
    fn escape_like_escapes_metacharacters() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\x"), "c:\\\\x");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn like_pattern_wraps_escaped_query() {
        assert_eq!(like_pattern(" 50% off "), Some("%50\\% off%".to_string()));
        assert_eq!(like_pattern("   "), None);
    }

    #[test]
    fn matches_name_is_case_insensitive() {
        assert!(matches_name("ООО \"Рога и Копыта\"", "рога"));
        assert!(matches_name("Acme Corp", "ACME"));
        assert!(!matches_name("Acme Corp", "globex"));
    }

    #[test]
    fn matches_name_treats_wildcards_literally() {
        assert!(matches_name("Sale 100% off", "100%"));
        assert!(!matches_name("Sale 100 off", "100%"));
        assert!(matches_name("snake_case", "_"));
        assert!(!matches_name("snakecase", "_"));
    }

    #[test]
    fn blank_query_matches_nothing() {
        assert!(!matches_name("anything", ""));
        assert!(!matches_name("anything", "   "));
    }

    #[test]
    fn search_limit_range() {
        assert!(validate_search_limit(1).is_ok());
        assert!(validate_search_limit(MAX_SEARCH_LIMIT).is_ok());
        assert!(validate_search_limit(0).is_err());
        assert!(validate_search_limit(MAX_SEARCH_LIMIT + 1).is_err());
    }
}
