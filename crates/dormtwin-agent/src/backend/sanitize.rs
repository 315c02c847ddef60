//! Credential scrubbing for backend error text.
//!
//! Backend drivers like to echo connection strings in their errors. Anything
//! that goes back into the conversation passes through [`sanitize_error`].

use std::sync::LazyLock;

use regex::Regex;

use super::BackendError;

/// Longest backend fragment carried into the conversation.
pub const MAX_FRAGMENT_BYTES: usize = 300;

/// Whole URLs: endpoints, connection strings and any userinfo they carry.
static URL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)\b[a-z][a-z0-9+.\-]*://[^\s()<>"']+"#).ok());

static BEARER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(Bearer|Basic|Token)\s+[A-Za-z0-9._~+/=\-]{8,}").ok());

// An auth scheme between the separator and the value belongs to the value.
static KEY_VALUE_SECRET_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(password|passwd|pwd|token|api[_-]?key|secret|authorization)(\s*[=:]\s*)((?:Bearer|Basic|Token)\s+)?("[^"]*"|'[^']*'|[^\s,;&]+)"#)
        .ok()
});

static SK_KEY_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"sk-[a-zA-Z0-9_\-]{20,}").ok());

/// Redact URLs and credentials from free text.
pub fn redact_secrets(text: &str) -> String {
    let mut out = text.to_string();
    if let Some(re) = URL_RE.as_ref() {
        out = re.replace_all(&out, "[REDACTED_URL]").into_owned();
    }
    if let Some(re) = BEARER_RE.as_ref() {
        out = re.replace_all(&out, "${1} [REDACTED]").into_owned();
    }
    if let Some(re) = KEY_VALUE_SECRET_RE.as_ref() {
        out = re.replace_all(&out, "${1}${2}${3}[REDACTED]").into_owned();
    }
    if let Some(re) = SK_KEY_RE.as_ref() {
        out = re.replace_all(&out, "[REDACTED]").into_owned();
    }
    out
}

/// Truncate to at most `max_bytes`, on a char boundary, with a trailing marker.
pub fn safe_truncate(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Model-facing error text: `"<category>: <sanitized fragment>"`.
pub fn sanitize_error(err: &BackendError) -> String {
    let detail = redact_secrets(err.detail().trim());
    let detail = collapse_whitespace(&detail);
    if detail.is_empty() {
        err.category().to_string()
    } else {
        format!("{}: {}", err.category(), safe_truncate(&detail, MAX_FRAGMENT_BYTES))
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
