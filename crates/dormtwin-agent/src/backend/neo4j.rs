//! Neo4j over the HTTP transactional endpoint.
//!
//! `POST {url}/db/{database}/tx/commit` with a single statement, basic auth.
//! Errors come back as HTTP 200 with a non-empty `errors` array.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{build_http_client, Backend, BackendError, QueryBackend, RawResultSet};
use dormtwin_core::config::GraphConfig;

pub struct Neo4jHttpBackend {
    http: reqwest::Client,
    endpoint: String,
    user: String,
    password: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl Neo4jHttpBackend {
    pub fn new(config: &GraphConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        Ok(Self {
            http: build_http_client(timeout)?,
            endpoint: format!(
                "{}/db/{}/tx/commit",
                config.url.trim_end_matches('/'),
                config.database
            ),
            user: config.user.clone(),
            password: config.password.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryBackend for Neo4jHttpBackend {
    fn kind(&self) -> Backend {
        Backend::Graph
    }

    async fn execute(&self, query: &str) -> Result<RawResultSet, BackendError> {
        let body = json!({
            "statements": [
                { "statement": query, "resultDataContents": ["row"] }
            ]
        });

        tracing::debug!(endpoint = %self.endpoint, "Neo4j request");

        let resp = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::from_transport(&e, self.timeout))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| BackendError::from_transport(&e, self.timeout))?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(BackendError::Unavailable(format!(
                "authentication failed (HTTP {})",
                status.as_u16()
            )));
        }
        if status.is_server_error() {
            return Err(BackendError::Unavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }
        if !status.is_success() {
            return Err(BackendError::Execution(format!("HTTP {}: {}", status.as_u16(), text)));
        }

        parse_commit_response(&text)
    }
}

fn parse_commit_response(text: &str) -> Result<RawResultSet, BackendError> {
    let parsed: CommitResponse = serde_json::from_str(text)
        .map_err(|e| BackendError::Protocol(format!("invalid Neo4j response: {}", e)))?;

    if let Some(err) = parsed.errors.into_iter().next() {
        let message = if err.code.is_empty() {
            err.message
        } else {
            format!("{}: {}", err.code, err.message)
        };
        return Err(BackendError::Execution(message));
    }

    let Some(result) = parsed.results.into_iter().next() else {
        return Ok(RawResultSet::default());
    };
    Ok(RawResultSet {
        columns: result.columns,
        rows: result.data.into_iter().map(|d| d.row).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: &str) -> GraphConfig {
        GraphConfig {
            url: url.to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_parse_rows_keep_column_order() {
        let body = r#"{"results":[{"columns":["unit_id","room_number"],
            "data":[{"row":["AC-1","103"],"meta":[null,null]},{"row":["AC-2","104"],"meta":[null,null]}]}],
            "errors":[]}"#;
        let set = parse_commit_response(body).unwrap();
        assert_eq!(set.columns, vec!["unit_id", "room_number"]);
        assert_eq!(set.rows.len(), 2);
        assert_eq!(set.rows[1][1], json!("104"));
    }

    #[test]
    fn test_parse_error_payload() {
        let body = r#"{"results":[],"errors":[{"code":"Neo.ClientError.Statement.SyntaxError","message":"Invalid input 'MATC'"}]}"#;
        let err = parse_commit_response(body).unwrap_err();
        assert!(matches!(err, BackendError::Execution(ref m) if m.contains("SyntaxError")));
    }

    #[test]
    fn test_parse_garbage_is_protocol_error() {
        assert!(matches!(parse_commit_response("<html>"), Err(BackendError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_execute_posts_statement() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .and(header_exists("authorization"))
            .and(body_partial_json(json!({
                "statements": [{ "statement": "MATCH (r:Room) RETURN r.room_number" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "columns": ["r.room_number"], "data": [{ "row": ["101"] }] }],
                "errors": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = Neo4jHttpBackend::new(&config(&server.uri())).unwrap();
        let set = backend.execute("MATCH (r:Room) RETURN r.room_number").await.unwrap();
        assert_eq!(set.columns, vec!["r.room_number"]);
        assert_eq!(set.rows, vec![vec![json!("101")]]);
    }

    #[tokio::test]
    async fn test_execute_auth_failure_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let backend = Neo4jHttpBackend::new(&config(&server.uri())).unwrap();
        let err = backend.ping().await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_execute_connection_refused_is_unavailable() {
        // Nothing listens on port 9 locally.
        let backend = Neo4jHttpBackend::new(&config("http://127.0.0.1:9")).unwrap();
        let err = backend.execute("RETURN 1").await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));

        let text = crate::backend::sanitize::sanitize_error(&err);
        assert!(text.starts_with("backend unavailable"), "{}", text);
        assert!(!text.contains("127.0.0.1"), "{}", text);
        assert!(!text.contains(":9"), "{}", text);
        assert!(!text.contains("tx/commit"), "{}", text);
    }
}
