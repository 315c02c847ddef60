//! Trace emitter: structured events around each planner step.
//!
//! Sinks are best-effort. `record_event` returns nothing, IO failures are
//! swallowed, and a panicking sink is contained by [`RunTrace::emit`], so
//! tracing can never change the outcome of a run.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceEventKind {
    ModelCall,
    ToolDispatch,
    ValidationRejected,
    BackendError,
    LoopFinished,
}

impl TraceEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TraceEventKind::ModelCall => "model_call",
            TraceEventKind::ToolDispatch => "tool_dispatch",
            TraceEventKind::ValidationRejected => "validation_rejected",
            TraceEventKind::BackendError => "backend_error",
            TraceEventKind::LoopFinished => "loop_finished",
        }
    }
}

pub trait TraceSink: Send + Sync {
    fn record_event(&self, kind: TraceEventKind, payload: &Value);
}

/// Emits each event as a `tracing` event under the `dormtwin_agent::trace` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTraceSink;

impl TraceSink for TracingTraceSink {
    fn record_event(&self, kind: TraceEventKind, payload: &Value) {
        match kind {
            TraceEventKind::ValidationRejected | TraceEventKind::BackendError => {
                tracing::warn!(target: "dormtwin_agent::trace", event = kind.as_str(), payload = %payload, "trace")
            }
            _ => tracing::debug!(target: "dormtwin_agent::trace", event = kind.as_str(), payload = %payload, "trace"),
        }
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug, Clone)]
pub struct JsonlTraceSink {
    path: PathBuf,
}

impl JsonlTraceSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl TraceSink for JsonlTraceSink {
    fn record_event(&self, kind: TraceEventKind, payload: &Value) {
        let record = json!({
            "ts": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "event": kind.as_str(),
            "payload": payload,
        });
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{}", record);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn record_event(&self, _kind: TraceEventKind, _payload: &Value) {}
}

/// Keeps events in memory; useful for embedding callers and tests.
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    events: Mutex<Vec<(TraceEventKind, Value)>>,
}

impl MemoryTraceSink {
    pub fn events(&self) -> Vec<(TraceEventKind, Value)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, kind: TraceEventKind) -> usize {
        self.events().iter().filter(|(k, _)| *k == kind).count()
    }
}

impl TraceSink for MemoryTraceSink {
    fn record_event(&self, kind: TraceEventKind, payload: &Value) {
        if let Ok(mut events) = self.events.lock() {
            events.push((kind, payload.clone()));
        }
    }
}

/// Forwards every event to each inner sink.
#[derive(Default, Clone)]
pub struct FanoutTraceSink {
    sinks: Vec<Arc<dyn TraceSink>>,
}

impl FanoutTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TraceSink for FanoutTraceSink {
    fn record_event(&self, kind: TraceEventKind, payload: &Value) {
        for sink in &self.sinks {
            sink.record_event(kind, payload);
        }
    }
}

/// Default sink stack: `tracing` events, plus a JSONL file when a path is set.
pub fn default_sink(trace_log: Option<&str>) -> Arc<dyn TraceSink> {
    let mut fanout = FanoutTraceSink::new().with(Arc::new(TracingTraceSink));
    if let Some(path) = trace_log.filter(|p| !p.trim().is_empty()) {
        fanout = fanout.with(Arc::new(JsonlTraceSink::new(path)));
    }
    Arc::new(fanout)
}

/// Binds a sink to one run; stamps `run_id` and `iteration` on every payload.
#[derive(Clone)]
pub struct RunTrace {
    sink: Arc<dyn TraceSink>,
    run_id: String,
}

impl RunTrace {
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self {
            sink,
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emit(&self, kind: TraceEventKind, iteration: usize, payload: Value) {
        let mut payload = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        payload.insert("run_id".to_string(), json!(self.run_id));
        payload.insert("iteration".to_string(), json!(iteration));
        let payload = Value::Object(payload);

        let sink = &self.sink;
        let recorded = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            sink.record_event(kind, &payload)
        }));
        if recorded.is_err() {
            tracing::debug!(event = kind.as_str(), "Trace sink panicked; event dropped");
        }
    }
}
