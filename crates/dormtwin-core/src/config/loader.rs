//! Environment variable loading with alias fallback chains.

use std::env;
use std::path::Path;

/// Load `./.env` into the process environment once. Variables that are
/// already set are never overridden.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let path = env::current_dir()
            .map(|d| d.join(".env"))
            .unwrap_or_else(|_| std::path::PathBuf::from(".env"));
        load_dotenv_from(&path);
    });
}

/// Load a specific dotenv file. Returns the number of variables applied.
pub fn load_dotenv_from(path: &Path) -> usize {
    let Ok(content) = std::fs::read_to_string(path) else {
        return 0;
    };
    let mut applied = 0;
    for line in content.lines() {
        if let Some((key, value)) = parse_dotenv_line(line) {
            if env::var(key).is_err() {
                env::set_var(key, value);
                applied += 1;
            }
        }
    }
    applied
}

/// Parse one `KEY=value` line. Handles comments, inline `#` comments outside
/// quotes, and a single pair of surrounding quotes.
pub(crate) fn parse_dotenv_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let mut value = line[eq_pos + 1..].trim();
    if let Some(hash_pos) = value.find('#') {
        let before_hash = value[..hash_pos].trim_end();
        if !before_hash.contains('"') && !before_hash.contains('\'') {
            value = before_hash;
        }
    }
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value = &value[1..value.len() - 1];
    }
    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

/// Read `primary`, then each alias in order; empty values count as unset.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env_optional(primary, aliases).unwrap_or_else(default)
}

/// Like [`env_or`] but returns `None` when nothing is set.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    std::iter::once(primary)
        .chain(aliases.iter().copied())
        .filter_map(|k| env::var(k).ok())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

/// Boolean variable: `0/false/no/off` is false, anything else set is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    match env_optional(primary, aliases) {
        Some(s) => !matches!(s.to_lowercase().as_str(), "0" | "false" | "no" | "off"),
        None => default,
    }
}

/// Numeric variable. Unparseable values fall back to `default` with a warning.
pub fn env_usize(primary: &str, aliases: &[&str], default: usize) -> usize {
    match env_optional(primary, aliases) {
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::warn!(key = primary, value = %s, "Ignoring non-numeric value, using {}", default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_line_basic() {
        assert_eq!(parse_dotenv_line("NEO4J_USER=neo4j"), Some(("NEO4J_USER", "neo4j")));
        assert_eq!(parse_dotenv_line("  KEY = value  "), Some(("KEY", "value")));
        assert_eq!(parse_dotenv_line("export KEY=1"), Some(("KEY", "1")));
    }

    #[test]
    fn test_parse_dotenv_line_quotes_and_comments() {
        assert_eq!(parse_dotenv_line("# comment"), None);
        assert_eq!(parse_dotenv_line(""), None);
        assert_eq!(parse_dotenv_line("KEY=\"quoted value\""), Some(("KEY", "quoted value")));
        assert_eq!(parse_dotenv_line("KEY='single'"), Some(("KEY", "single")));
        assert_eq!(parse_dotenv_line("KEY=abc # trailing"), Some(("KEY", "abc")));
        assert_eq!(parse_dotenv_line("KEY=\"a # b\""), Some(("KEY", "a # b")));
        assert_eq!(parse_dotenv_line("=novalue"), None);
        assert_eq!(parse_dotenv_line("no_equals_sign"), None);
    }

    #[test]
    fn test_env_optional_alias_chain() {
        env::set_var("DORMTWIN_TEST_ALIAS_B", "from-alias");
        env::set_var("DORMTWIN_TEST_ALIAS_PRIMARY", "   ");
        let v = env_optional("DORMTWIN_TEST_ALIAS_PRIMARY", &["DORMTWIN_TEST_ALIAS_A", "DORMTWIN_TEST_ALIAS_B"]);
        assert_eq!(v.as_deref(), Some("from-alias"));
    }

    #[test]
    fn test_env_bool_and_usize() {
        env::set_var("DORMTWIN_TEST_BOOL_OFF", "off");
        env::set_var("DORMTWIN_TEST_USIZE_BAD", "ten");
        env::set_var("DORMTWIN_TEST_USIZE_OK", "7");
        assert!(!env_bool("DORMTWIN_TEST_BOOL_OFF", &[], true));
        assert!(env_bool("DORMTWIN_TEST_BOOL_UNSET", &[], true));
        assert_eq!(env_usize("DORMTWIN_TEST_USIZE_BAD", &[], 10), 10);
        assert_eq!(env_usize("DORMTWIN_TEST_USIZE_OK", &[], 10), 7);
    }

    #[test]
    fn test_load_dotenv_from_does_not_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "DORMTWIN_TEST_DOTENV_NEW=fresh\nDORMTWIN_TEST_DOTENV_SET=from-file\n",
        )
        .unwrap();
        env::set_var("DORMTWIN_TEST_DOTENV_SET", "from-process");

        let applied = load_dotenv_from(&path);

        assert_eq!(applied, 1);
        assert_eq!(env::var("DORMTWIN_TEST_DOTENV_NEW").unwrap(), "fresh");
        assert_eq!(env::var("DORMTWIN_TEST_DOTENV_SET").unwrap(), "from-process");
    }
}
