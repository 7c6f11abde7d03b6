//! Error-message classification
//!
//! Stores report a missing table only through their message text, so the
//! relation name is recovered by pattern matching.

use regex::Regex;
use std::sync::OnceLock;

static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn patterns() -> &'static [Regex] {
    PATTERNS.get_or_init(|| {
        [
            // Postgres: relation "public.meetings" does not exist
            r#"relation "(?:[A-Za-z_][A-Za-z0-9_]*\.)?([A-Za-z_][A-Za-z0-9_]*)" does not exist"#,
            // SQLite: no such table: main.meetings
            r"no such table: (?:[A-Za-z_][A-Za-z0-9_]*\.)?([A-Za-z_][A-Za-z0-9_]*)",
            // PostgREST schema cache: Could not find the table 'public.meetings' in the schema cache
            r"Could not find the table '(?:[A-Za-z_][A-Za-z0-9_]*\.)?([A-Za-z_][A-Za-z0-9_]*)'",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Name of the missing relation if `message` reports one
pub fn missing_relation(message: &str) -> Option<String> {
    patterns()
        .iter()
        .find_map(|re| re.captures(message))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_message() {
        assert_eq!(
            missing_relation("relation \"public.meetings\" does not exist").as_deref(),
            Some("meetings")
        );
        assert_eq!(
            missing_relation("ERROR: relation \"sermons\" does not exist at character 15").as_deref(),
            Some("sermons")
        );
    }

    #[test]
    fn test_sqlite_message() {
        assert_eq!(
            missing_relation("no such table: prayer_requests").as_deref(),
            Some("prayer_requests")
        );
    }

    #[test]
    fn test_schema_cache_message() {
        assert_eq!(
            missing_relation("Could not find the table 'public.livestream' in the schema cache").as_deref(),
            Some("livestream")
        );
    }

    #[test]
    fn test_other_failures_are_not_missing() {
        assert_eq!(missing_relation("connection refused"), None);
        assert_eq!(missing_relation("column \"foo\" does not exist"), None);
    }
}
