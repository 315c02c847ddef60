//! Scripted completion providers and counting backends.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, BackendError, QueryBackend, RawResultSet};
use crate::llm::CompletionProvider;
use crate::types::{ChatMessage, ModelReply, ToolDefinition, ToolRequest};

pub fn tool_request(id: &str, tool: &str, query: &str) -> ModelReply {
    ModelReply::ToolRequest {
        text: None,
        request: ToolRequest::new(id, tool, json!({ "query": query })),
    }
}

pub fn answer(text: &str) -> ModelReply {
    ModelReply::FinalAnswer(text.to_string())
}

/// Replays a fixed list of replies; fails once the script runs out.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ModelReply, String>>>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ModelReply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(replies.into_iter().map(Ok).collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::from([Err(message.to_string())])),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Messages passed on the `n`th call (0-based).
    pub fn messages_at(&self, n: usize) -> Vec<ChatMessage> {
        self.seen.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, messages: &[ChatMessage], _tools: &[ToolDefinition]) -> Result<ModelReply> {
        self.seen.lock().unwrap().push(messages.to_vec());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(anyhow::anyhow!(e)),
            None => Err(anyhow::anyhow!("script exhausted")),
        }
    }
}

/// Requests the same tool forever, with a fresh call id each time.
pub struct AlwaysToolProvider {
    tool: String,
    query: String,
    calls: AtomicUsize,
}

impl AlwaysToolProvider {
    pub fn new(tool: &str, query: &str) -> Arc<Self> {
        Arc::new(Self {
            tool: tool.to_string(),
            query: query.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for AlwaysToolProvider {
    async fn complete(&self, _messages: &[ChatMessage], _tools: &[ToolDefinition]) -> Result<ModelReply> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(tool_request(&format!("call_{}", n), &self.tool, &self.query))
    }
}

/// Never answers.
pub struct HangingProvider;

#[async_trait]
impl CompletionProvider for HangingProvider {
    async fn complete(&self, _messages: &[ChatMessage], _tools: &[ToolDefinition]) -> Result<ModelReply> {
        std::future::pending().await
    }
}

enum Behaviour {
    Rows(RawResultSet),
    Fail(fn() -> BackendError),
    /// Cancel the token, then never return.
    CancelAndHang(CancellationToken),
}

/// Backend that counts calls and records the queries it received.
pub struct CountingBackend {
    kind: Backend,
    behaviour: Behaviour,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl CountingBackend {
    fn with(kind: Backend, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behaviour,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn rows(kind: Backend, columns: &[&str], rows: Vec<Vec<Value>>) -> Arc<Self> {
        Self::with(
            kind,
            Behaviour::Rows(RawResultSet::new(columns.iter().map(|c| c.to_string()).collect(), rows)),
        )
    }

    pub fn empty(kind: Backend) -> Arc<Self> {
        Self::rows(kind, &[], vec![])
    }

    pub fn failing(kind: Backend, err: fn() -> BackendError) -> Arc<Self> {
        Self::with(kind, Behaviour::Fail(err))
    }

    pub fn cancelling(kind: Backend, token: CancellationToken) -> Arc<Self> {
        Self::with(kind, Behaviour::CancelAndHang(token))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryBackend for CountingBackend {
    fn kind(&self) -> Backend {
        self.kind
    }

    async fn execute(&self, query: &str) -> Result<RawResultSet, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        match &self.behaviour {
            Behaviour::Rows(set) => Ok(set.clone()),
            Behaviour::Fail(err) => Err(err()),
            Behaviour::CancelAndHang(token) => {
                token.cancel();
                std::future::pending().await
            }
        }
    }
}
