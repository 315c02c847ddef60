//! InfluxDB 3 over the SQL query endpoint.
//!
//! `POST {url}/api/v3/query_sql` with `{"db", "q", "format": "json"}`.
//! The response is a JSON array of row objects; column order is the order
//! keys first appear (serde_json is built with `preserve_order`).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{build_http_client, Backend, BackendError, QueryBackend, RawResultSet};
use dormtwin_core::config::SeriesConfig;

pub struct InfluxSqlBackend {
    http: reqwest::Client,
    endpoint: String,
    database: String,
    token: String,
    timeout: Duration,
}

impl InfluxSqlBackend {
    pub fn new(config: &SeriesConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        Ok(Self {
            http: build_http_client(timeout)?,
            endpoint: format!("{}/api/v3/query_sql", config.url.trim_end_matches('/')),
            database: config.database.clone(),
            token: config.token.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryBackend for InfluxSqlBackend {
    fn kind(&self) -> Backend {
        Backend::Series
    }

    async fn execute(&self, query: &str) -> Result<RawResultSet, BackendError> {
        let body = json!({ "db": self.database, "q": query, "format": "json" });

        tracing::debug!(endpoint = %self.endpoint, database = %self.database, "InfluxDB request");

        let mut req = self.http.post(&self.endpoint).json(&body);
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }
        let resp = req
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
                error_message(&text)
            )));
        }
        if !status.is_success() {
            return Err(BackendError::Execution(error_message(&text)));
        }

        parse_rows(&text)
    }
}

/// Influx error bodies are `{"error": "..."}` or plain text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn parse_rows(text: &str) -> Result<RawResultSet, BackendError> {
    if text.trim().is_empty() {
        return Ok(RawResultSet::default());
    }
    let value: Value = serde_json::from_str(text)
        .map_err(|e| BackendError::Protocol(format!("invalid InfluxDB response: {}", e)))?;
    let Value::Array(items) = value else {
        return Err(BackendError::Protocol("expected a JSON array of rows".to_string()));
    };

    let objects: Vec<Map<String, Value>> = items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(BackendError::Protocol(format!(
                "expected row object, got {}",
                other
            ))),
        })
        .collect::<Result<_, _>>()?;

    let mut columns: Vec<String> = Vec::new();
    for obj in &objects {
        for key in obj.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = objects
        .iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(RawResultSet { columns, rows })
}
