//! Read-only gate for generated queries.
//!
//! Every query the model produces is checked here before a backend sees it.
//! Validation is a keyword scan, not a parser:
//!
//! 1. **Empty check**: blank queries are rejected with reason `empty query`.
//! 2. **Write keyword scan**: any word from the dialect's mutation or
//!    administrative keyword set, anywhere in the text, case-insensitive and
//!    word-boundary matched, rejects the query. A read query that mentions such
//!    a word inside a string literal is rejected too.
//! 3. **Read form check**: graph queries must contain `MATCH` or `RETURN`;
//!    tabular queries must start with `SELECT` or `WITH` once leading
//!    comments are skipped.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Query language a tool speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Graph pattern language (Cypher).
    Graph,
    /// Tabular SQL as served by the time-series store.
    Tabular,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Graph => "graph",
            Dialect::Tabular => "tabular",
        }
    }

    fn allowed_forms(&self) -> &'static str {
        match self {
            Dialect::Graph => "read queries (MATCH/RETURN)",
            Dialect::Tabular => "SELECT queries",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "graph" | "cypher" => Ok(Dialect::Graph),
            "tabular" | "series" | "sql" => Ok(Dialect::Tabular),
            other => Err(format!("unknown dialect '{}' (expected graph or series)", other)),
        }
    }
}

/// Why a query was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryRejection {
    #[error("empty query")]
    Empty,

    #[error("write operation '{keyword}' is not allowed; only {allowed} are permitted")]
    WriteKeyword { keyword: String, allowed: &'static str },

    #[error("query must contain a MATCH or RETURN clause")]
    MissingGraphReadClause,

    #[error("query must be a SELECT statement")]
    NotSelect,
}

/// Allow/reject outcome of validation. Carries no side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationVerdict {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationVerdict {
    pub fn allow() -> Self {
        Self { allowed: true, reason: None }
    }

    pub fn reject(rejection: &QueryRejection) -> Self {
        Self {
            allowed: false,
            reason: Some(rejection.to_string()),
        }
    }
}

/// Graph keywords that write nodes, relationships, properties or schema.
const GRAPH_WRITE_PATTERNS: &[&str] = &[
    r"\bCREATE\b",
    r"\bMERGE\b",
    r"\bDETACH\s+DELETE\b",
    r"\bDELETE\b",
    r"\bSET\b",
    r"\bREMOVE\b",
    r"\bDROP\b",
    r"\bFOREACH\b",
    r"\bLOAD\s+CSV\b",
    // Subqueries can carry writes; apoc has write procedures.
    r"\bCALL\s*\{",
    r"\bCALL\s+apoc\.",
    r"\bALTER\b",
    r"\bRENAME\b",
    r"\bGRANT\b",
    r"\bREVOKE\b",
    r"\bDENY\b",
];

/// Tabular data-modification, data-definition and administrative keywords.
const TABULAR_WRITE_PATTERNS: &[&str] = &[
    r"\bINSERT\b",
    r"\bUPDATE\b",
    r"\bDELETE\b",
    r"\bDROP\b",
    r"\bALTER\b",
    r"\bCREATE\b",
    r"\bTRUNCATE\b",
    r"\bREPLACE\b",
    r"\bMERGE\b",
    r"\bUPSERT\b",
    r"\bINTO\b",
    r"\bGRANT\b",
    r"\bREVOKE\b",
    r"\bCOPY\b",
    r"\bATTACH\b",
    r"\bDETACH\b",
    r"\bVACUUM\b",
    r"\bEXEC(?:UTE)?\b",
    r"\bCALL\b",
    r"\bSET\b",
    r"\bRENAME\b",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(&format!("(?i){}", p)) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(pattern = p, "Invalid validator pattern: {}", e);
                None
            }
        })
        .collect()
}

static GRAPH_WRITE_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(GRAPH_WRITE_PATTERNS));
static TABULAR_WRITE_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(TABULAR_WRITE_PATTERNS));
static GRAPH_READ_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:MATCH|RETURN)\b").ok());
static WHITESPACE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Classify `query` for `dialect`. Never panics and never errors: malformed
/// input is a rejecting verdict.
pub fn validate(dialect: Dialect, query: &str) -> ValidationVerdict {
    match check(dialect, query) {
        Ok(()) => ValidationVerdict::allow(),
        Err(rejection) => ValidationVerdict::reject(&rejection),
    }
}

/// Same as [`validate`] but returns the structured rejection.
pub fn check(dialect: Dialect, query: &str) -> Result<(), QueryRejection> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(QueryRejection::Empty);
    }

    let deny = match dialect {
        Dialect::Graph => &*GRAPH_WRITE_RE,
        Dialect::Tabular => &*TABULAR_WRITE_RE,
    };
    if let Some(m) = deny.iter().find_map(|re| re.find(trimmed)) {
        return Err(QueryRejection::WriteKeyword {
            keyword: normalize_keyword(m.as_str()),
            allowed: dialect.allowed_forms(),
        });
    }

    match dialect {
        Dialect::Graph => {
            let has_read_clause = GRAPH_READ_RE
                .as_ref()
                .map_or(false, |re| re.is_match(trimmed));
            if !has_read_clause {
                return Err(QueryRejection::MissingGraphReadClause);
            }
        }
        Dialect::Tabular => {
            let head = first_word(skip_leading_sql_comments(trimmed)).to_uppercase();
            if head != "SELECT" && head != "WITH" {
                return Err(QueryRejection::NotSelect);
            }
        }
    }
    Ok(())
}

/// Upper-case the matched keyword and collapse inner whitespace (`detach\n delete` -> `DETACH DELETE`).
fn normalize_keyword(matched: &str) -> String {
    let upper = matched.trim().to_uppercase();
    match WHITESPACE_RE.as_ref() {
        Some(re) => re.replace_all(&upper, " ").to_string(),
        None => upper,
    }
}

fn skip_leading_sql_comments(mut s: &str) -> &str {
    loop {
        s = s.trim_start();
        if let Some(rest) = s.strip_prefix("--") {
            s = rest.split_once('\n').map_or("", |(_, after)| after);
        } else if let Some(rest) = s.strip_prefix("/*") {
            s = rest.split_once("*/").map_or("", |(_, after)| after);
        } else {
            return s;
        }
    }
}

fn first_word(s: &str) -> &str {
    let end = s
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(dialect: Dialect, q: &str) -> bool {
        !validate(dialect, q).allowed
    }

    // ---- Graph dialect ----

    #[test]
    fn test_graph_detach_delete_rejected() {
        let v = validate(Dialect::Graph, "MATCH (r:Room) DETACH DELETE r");
        assert!(!v.allowed);
        assert!(v.reason.unwrap().contains("DETACH DELETE"));
    }

    #[test]
    fn test_graph_write_clauses_rejected_any_case() {
        for q in [
            "CREATE (r:Room {room_number: '999'})",
            "merge (a:ACUnit {unit_id: 'AC-9'}) RETURN a",
            "MATCH (r:Room) SET r.room_type = 'dorm' RETURN r",
            "MATCH (r:Room) remove r.room_type RETURN r",
            "DROP CONSTRAINT room_number",
            "MATCH (r:Room) FOREACH (x IN [1] | SET r.x = x)",
            "MATCH (r) CALL { WITH r RETURN r } RETURN r",
            "LOAD CSV FROM 'file:///x.csv' AS line RETURN line",
            "MATCH (a)-[s:SERVICES]->(r) Delete s",
        ] {
            assert!(rejected(Dialect::Graph, q), "should reject: {}", q);
        }
    }

    #[test]
    fn test_graph_read_allowed() {
        for q in [
            "MATCH (ac:ACUnit {unit_id:'AC-1'})-[:SERVICES]->(r) RETURN r",
            "  match (s)-[:INSTALLED_IN]->(r:Room {room_number: \"101\"}) return s.sensor_id  ",
            "MATCH (r:Room) RETURN r.room_number // all rooms",
            "RETURN 1 AS num",
            "MATCH (s) WHERE s.created_at IS NOT NULL RETURN s.sensor_id",
        ] {
            assert!(validate(Dialect::Graph, q).allowed, "should allow: {}", q);
        }
    }

    #[test]
    fn test_graph_requires_read_clause() {
        assert_eq!(
            check(Dialect::Graph, "SHOW DATABASES"),
            Err(QueryRejection::MissingGraphReadClause)
        );
    }

    #[test]
    fn test_keyword_in_string_literal_is_rejected() {
        // Deny-by-presence: false rejection is the accepted cost.
        assert!(rejected(Dialect::Graph, "MATCH (r:Room {note: 'do not delete'}) RETURN r"));
        assert!(rejected(Dialect::Tabular, "SELECT * FROM logs WHERE msg = 'update failed'"));
    }

    // ---- Tabular dialect ----

    #[test]
    fn test_tabular_drop_table_rejected() {
        let v = validate(Dialect::Tabular, "DROP TABLE sensor_readings");
        assert!(!v.allowed);
        assert_eq!(
            v.reason.as_deref(),
            Some("write operation 'DROP' is not allowed; only SELECT queries are permitted")
        );
    }

    #[test]
    fn test_tabular_mutations_rejected() {
        for q in [
            "insert into sensor_readings (sensor_id, reading) values ('TEMP-101', 20)",
            "UPDATE sensor_readings SET reading = 0",
            "DELETE FROM sensor_readings WHERE sensor_id = 'TEMP-101'",
            "ALTER TABLE sensor_readings ADD COLUMN x INT",
            "CREATE TABLE t (x INT)",
            "TRUNCATE sensor_readings",
            "GRANT ALL ON sensor_readings TO bob",
            "SELECT * INTO backup FROM sensor_readings",
            "SELECT 1; DROP TABLE sensor_readings",
            "select reading from sensor_readings;\n\tdelete from sensor_readings",
        ] {
            assert!(rejected(Dialect::Tabular, q), "should reject: {}", q);
        }
    }

    #[test]
    fn test_tabular_reads_allowed() {
        for q in [
            "SELECT * FROM sensor_readings LIMIT 10",
            "select reading, time from sensor_readings where sensor_id = 'TEMP-101' order by time desc limit 1",
            "SELECT AVG(reading) FROM sensor_readings -- average over all data",
            "-- latest value\nSELECT reading FROM sensor_readings ORDER BY time DESC LIMIT 1",
            "/* bucketed */ SELECT DATE_BIN('1 hour', time) AS h, AVG(reading) FROM sensor_readings GROUP BY 1",
            "WITH latest AS (SELECT MAX(time) AS t FROM sensor_readings) SELECT * FROM latest",
            "\n\n   SELECT created_at, updated_by FROM sensor_readings   \n",
        ] {
            assert!(validate(Dialect::Tabular, q).allowed, "should allow: {}", q);
        }
    }

    #[test]
    fn test_tabular_requires_select() {
        assert_eq!(check(Dialect::Tabular, "SHOW TABLES"), Err(QueryRejection::NotSelect));
        assert_eq!(check(Dialect::Tabular, "-- only a comment"), Err(QueryRejection::NotSelect));
    }

    // ---- Edge cases ----

    #[test]
    fn test_empty_and_whitespace_rejected() {
        for dialect in [Dialect::Graph, Dialect::Tabular] {
            for q in ["", "   ", "\n\t"] {
                let v = validate(dialect, q);
                assert!(!v.allowed);
                assert_eq!(v.reason.as_deref(), Some("empty query"));
            }
        }
    }

    #[test]
    fn test_validation_is_deterministic() {
        let q = "MATCH (r:Room) RETURN r";
        assert_eq!(validate(Dialect::Graph, q), validate(Dialect::Graph, q));
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("Graph".parse::<Dialect>(), Ok(Dialect::Graph));
        assert_eq!("series".parse::<Dialect>(), Ok(Dialect::Tabular));
        assert!("weather".parse::<Dialect>().is_err());
    }
}
