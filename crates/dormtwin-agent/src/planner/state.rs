//! Per-run loop state. Created by `Planner::run`, dropped when it returns.

use std::time::Instant;

use crate::conversation::Conversation;
use crate::types::{AgentStep, ToolRequest};

/// Where the loop is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    Started,
    AwaitingModel,
    Dispatching,
    Finished,
}

pub(super) struct LoopState {
    pub conversation: Conversation,
    /// Model calls made so far; one per iteration.
    pub iterations: usize,
    pub budget_exceeded: bool,
    pub phase: Phase,
    pub tool_calls: usize,
    pub steps: Vec<AgentStep>,
    /// Consecutive intent nudges without a tool call in between.
    pub nudges: usize,
    last_request: Option<ToolRequest>,
    repeat_streak: usize,
    pub started: Instant,
}

impl LoopState {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            iterations: 0,
            budget_exceeded: false,
            phase: Phase::Started,
            tool_calls: 0,
            steps: Vec::new(),
            nudges: 0,
            last_request: None,
            repeat_streak: 0,
            started: Instant::now(),
        }
    }

    pub fn transition(&mut self, next: Phase) {
        tracing::trace!(from = ?self.phase, to = ?next, iteration = self.iterations, "Planner transition");
        self.phase = next;
    }

    /// Record a dispatched request; returns how many identical requests
    /// (same tool, same arguments) have now been made in a row.
    pub fn note_request(&mut self, request: &ToolRequest) -> usize {
        let repeated = self
            .last_request
            .as_ref()
            .is_some_and(|prev| prev.same_invocation(request));
        self.repeat_streak = if repeated { self.repeat_streak + 1 } else { 1 };
        self.last_request = Some(request.clone());
        self.repeat_streak
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
