//! ToolRegistry: the closed set of query tools the model may call.
//!
//! Tools are an enumerated [`ToolKind`]; a registry binds each kind to a
//! backend at construction. Pattern:
//! ```ignore
//! let registry = ToolRegistry::builder()
//!     .register(ToolKind::QueryGraph, graph_backend)
//!     .register(ToolKind::QuerySeries, series_backend)
//!     .build();
//! ```
//! Adding a tool = add a `ToolKind` variant and register it.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;

use crate::backend::{Backend, QueryBackend};
use crate::types::{FunctionDef, ToolDefinition, ToolRequest};
use crate::validator::Dialect;

/// The fixed tool set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    QueryGraph,
    QuerySeries,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::QueryGraph, ToolKind::QuerySeries];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::QueryGraph => "queryGraph",
            ToolKind::QuerySeries => "querySeries",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn backend(self) -> Backend {
        match self {
            ToolKind::QueryGraph => Backend::Graph,
            ToolKind::QuerySeries => Backend::Series,
        }
    }

    pub fn dialect(self) -> Dialect {
        match self {
            ToolKind::QueryGraph => Dialect::Graph,
            ToolKind::QuerySeries => Dialect::Tabular,
        }
    }

    /// Required argument names.
    pub fn required_arguments(self) -> &'static [&'static str] {
        &["query"]
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::QueryGraph => {
                "Run a read-only Cypher query against the building graph (rooms, AC units, \
                 sensors and how they are connected). Use for structure and relationships: \
                 which unit services which room, which sensors are installed where. \
                 Only MATCH/RETURN style reads are accepted."
            }
            ToolKind::QuerySeries => {
                "Run a read-only SQL SELECT against the sensor time-series database \
                 (measurement sensor_readings with time, sensor_id, room_number, reading). \
                 Use for temperatures, occupancy, trends and aggregates over time. \
                 Only SELECT statements are accepted."
            }
        }
    }

    fn query_hint(self) -> &'static str {
        match self {
            ToolKind::QueryGraph => "A read-only Cypher query.",
            ToolKind::QuerySeries => "A read-only SQL SELECT statement.",
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDef {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": self.query_hint() }
                    },
                    "required": self.required_arguments(),
                }),
            },
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved tool: kind plus the backend it invokes.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub kind: ToolKind,
    pub backend: Arc<dyn QueryBackend>,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("kind", &self.kind)
            .field("backend", &self.backend.kind())
            .finish()
    }
}

impl ToolDescriptor {
    pub fn dialect(&self) -> Dialect {
        self.kind.dialect()
    }

    /// Pull the `query` argument out of a request.
    pub fn extract_query<'r>(&self, request: &'r ToolRequest) -> Result<&'r str, ArgumentError> {
        match &request.arguments {
            Value::Object(map) => match map.get("query") {
                Some(Value::String(q)) => Ok(q.as_str()),
                Some(_) => Err(ArgumentError::WrongType("query")),
                None => Err(ArgumentError::Missing("query")),
            },
            _ => Err(ArgumentError::NotAnObject),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown tool '{0}'")]
pub struct ToolNotFound(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("missing required argument '{0}'")]
    Missing(&'static str),
    #[error("argument '{0}' must be a string")]
    WrongType(&'static str),
    #[error("tool arguments must be a JSON object")]
    NotAnObject,
}

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

/// Builder for ToolRegistry with explicit registration.
#[derive(Debug, Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistryBuilder {
    /// Bind `kind` to `backend`. Registering a kind twice keeps the last binding.
    ///
    /// A backend of the wrong kind is refused: the query would be validated
    /// for one dialect and executed by a store that speaks the other. The
    /// binding is skipped, so the tool resolves as unknown.
    #[must_use]
    pub fn register(mut self, kind: ToolKind, backend: Arc<dyn QueryBackend>) -> Self {
        if backend.kind() != kind.backend() {
            tracing::error!(
                tool = kind.name(),
                expected = %kind.backend(),
                got = %backend.kind(),
                "Refusing to bind tool to a backend of a different kind"
            );
            return self;
        }
        self.tools.retain(|t| t.kind != kind);
        self.tools.push(ToolDescriptor { kind, backend });
        self
    }

    pub fn build(mut self) -> ToolRegistry {
        self.tools.sort_by_key(|t| ToolKind::ALL.iter().position(|k| *k == t.kind));
        ToolRegistry { tools: self.tools }
    }
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Registry with both standard tools bound.
    pub fn standard(graph: Arc<dyn QueryBackend>, series: Arc<dyn QueryBackend>) -> Self {
        Self::builder()
            .register(ToolKind::QueryGraph, graph)
            .register(ToolKind::QuerySeries, series)
            .build()
    }

    /// Exact, case-sensitive lookup by tool name.
    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, ToolNotFound> {
        let kind = ToolKind::from_name(name).ok_or_else(|| ToolNotFound(name.to_string()))?;
        self.tools
            .iter()
            .find(|t| t.kind == kind)
            .ok_or_else(|| ToolNotFound(name.to_string()))
    }

    /// Tool catalogue for the completion capability.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.kind.definition()).collect()
    }

    pub fn kinds(&self) -> impl Iterator<Item = ToolKind> + '_ {
        self.tools.iter().map(|t| t.kind)
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, RawResultSet};
    use async_trait::async_trait;

    struct Stub(Backend);

    #[async_trait]
    impl QueryBackend for Stub {
        fn kind(&self) -> Backend {
            self.0
        }
        async fn execute(&self, _query: &str) -> Result<RawResultSet, BackendError> {
            Ok(RawResultSet::default())
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::standard(Arc::new(Stub(Backend::Graph)), Arc::new(Stub(Backend::Series)))
    }

    #[test]
    fn test_resolve_known_tools() {
        let reg = registry();
        let graph = reg.resolve("queryGraph").unwrap();
        assert_eq!(graph.kind, ToolKind::QueryGraph);
        assert_eq!(graph.dialect(), Dialect::Graph);
        assert_eq!(reg.resolve("querySeries").unwrap().dialect(), Dialect::Tabular);
    }

    #[test]
    fn test_resolve_unknown_tool() {
        let reg = registry();
        assert_eq!(reg.resolve("queryWeather").unwrap_err(), ToolNotFound("queryWeather".to_string()));
        // Lookup is case-sensitive.
        assert!(reg.resolve("querygraph").is_err());
    }

    #[test]
    fn test_unregistered_kind_is_not_found() {
        let reg = ToolRegistry::builder()
            .register(ToolKind::QueryGraph, Arc::new(Stub(Backend::Graph)))
            .build();
        assert!(reg.resolve("querySeries").is_err());
        assert_eq!(reg.tool_definitions().len(), 1);
    }

    #[test]
    fn test_mismatched_backend_is_refused() {
        let reg = ToolRegistry::builder()
            .register(ToolKind::QueryGraph, Arc::new(Stub(Backend::Series)))
            .register(ToolKind::QuerySeries, Arc::new(Stub(Backend::Series)))
            .build();
        assert_eq!(reg.resolve("queryGraph").unwrap_err(), ToolNotFound("queryGraph".to_string()));
        assert_eq!(reg.kinds().collect::<Vec<_>>(), vec![ToolKind::QuerySeries]);

        // A wrong binding does not displace an earlier correct one.
        let reg = ToolRegistry::builder()
            .register(ToolKind::QueryGraph, Arc::new(Stub(Backend::Graph)))
            .register(ToolKind::QueryGraph, Arc::new(Stub(Backend::Series)))
            .build();
        assert_eq!(reg.resolve("queryGraph").unwrap().backend.kind(), Backend::Graph);
    }

    #[test]
    fn test_every_descriptor_executes_on_its_dialect() {
        let reg = ToolRegistry::standard(Arc::new(Stub(Backend::Series)), Arc::new(Stub(Backend::Graph)));
        assert!(reg.is_empty());
        for d in registry().descriptors() {
            assert_eq!(d.backend.kind(), d.kind.backend());
        }
    }

    #[test]
    fn test_tool_definitions_require_query() {
        let defs = registry().tool_definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.function.name.as_str()).collect();
        assert_eq!(names, vec!["queryGraph", "querySeries"]);
        for d in &defs {
            assert_eq!(d.function.parameters["required"], json!(["query"]));
            assert_eq!(d.function.parameters["properties"]["query"]["type"], "string");
        }
    }

    #[test]
    fn test_extract_query() {
        let reg = registry();
        let desc = reg.resolve("queryGraph").unwrap();
        let ok = ToolRequest::new("1", "queryGraph", json!({"query": "RETURN 1"}));
        assert_eq!(desc.extract_query(&ok), Ok("RETURN 1"));

        let missing = ToolRequest::new("2", "queryGraph", json!({}));
        assert_eq!(desc.extract_query(&missing), Err(ArgumentError::Missing("query")));

        let wrong = ToolRequest::new("3", "queryGraph", json!({"query": 42}));
        assert_eq!(desc.extract_query(&wrong), Err(ArgumentError::WrongType("query")));

        let raw = ToolRequest::new("4", "queryGraph", json!("RETURN 1"));
        assert_eq!(desc.extract_query(&raw), Err(ArgumentError::NotAnObject));
    }
}
