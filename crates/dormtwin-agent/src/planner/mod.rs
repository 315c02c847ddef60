//! Planner loop: model ↔ tool dispatch cycle for one question.
//!
//! `Started -> AwaitingModel -> (Dispatching -> AwaitingModel)* -> Finished`.
//! Every model call is one iteration. The loop ends with an answer, or with a
//! failure when the iteration budget runs out, the caller cancels (or the
//! question deadline passes), or the model cannot be reached. Tool failures
//! are never terminal: they go back into the conversation.
//!
//! Sub-modules:
//!   - `state`:      per-run counters and the state-machine phase
//!   - `dispatch`:   resolve → validate → execute → normalize
//!   - `reflection`: intent nudges and repeat warnings

mod dispatch;
mod reflection;
mod state;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use dormtwin_core::config::PlannerSettings;

use crate::conversation::Conversation;
use crate::llm::CompletionProvider;
use crate::prompt::build_system_framing;
use crate::registry::ToolRegistry;
use crate::trace::{RunTrace, TraceEventKind, TraceSink, TracingTraceSink};
use crate::types::{AgentStep, ModelReply};

use reflection::TextOutcome;
use state::{LoopState, Phase};

/// Why a run ended without an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    BudgetExhausted,
    Cancelled,
    ModelUnavailable(String),
}

impl FailureReason {
    /// Natural-language explanation for the user. Never carries raw error text.
    pub fn user_message(&self, gathered_data: bool) -> &'static str {
        match self {
            FailureReason::BudgetExhausted if gathered_data => {
                "I gathered some data but couldn't complete the analysis. Please see the results above."
            }
            FailureReason::BudgetExhausted => "I wasn't able to answer your question.",
            FailureReason::Cancelled => "The question was cancelled before an answer was ready.",
            FailureReason::ModelUnavailable(_) => {
                "The language model could not be reached, so no answer was produced."
            }
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::BudgetExhausted => f.write_str("iteration budget exhausted"),
            FailureReason::Cancelled => f.write_str("cancelled"),
            FailureReason::ModelUnavailable(e) => write!(f, "model unavailable: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LoopOutcome {
    Answer(String),
    Failure(FailureReason),
}

impl LoopOutcome {
    pub fn is_answer(&self) -> bool {
        matches!(self, LoopOutcome::Answer(_))
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            LoopOutcome::Failure(r) => Some(r),
            LoopOutcome::Answer(_) => None,
        }
    }
}

/// Result of one run.
#[derive(Debug, Serialize)]
pub struct PlannerResult {
    pub run_id: String,
    pub outcome: LoopOutcome,
    /// Text to show the user: the answer, or the failure explanation.
    pub response: String,
    pub steps: Vec<AgentStep>,
    pub iterations: usize,
    pub tool_calls: usize,
    pub elapsed_ms: u64,
    #[serde(skip)]
    pub conversation: Conversation,
}

/// Why a suspension point was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupted {
    Cancelled,
    DeadlineElapsed,
}

pub struct Planner {
    provider: Arc<dyn CompletionProvider>,
    registry: ToolRegistry,
    trace_sink: Arc<dyn TraceSink>,
    settings: PlannerSettings,
    system_framing: String,
}

impl Planner {
    pub fn new(provider: Arc<dyn CompletionProvider>, registry: ToolRegistry, settings: PlannerSettings) -> Self {
        let system_framing = build_system_framing(&registry);
        Self {
            provider,
            registry,
            trace_sink: Arc::new(TracingTraceSink),
            settings,
            system_framing,
        }
    }

    #[must_use]
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = sink;
        self
    }

    #[must_use]
    pub fn with_system_framing(mut self, framing: impl Into<String>) -> Self {
        self.system_framing = framing.into();
        self
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer one question. Always returns; failures are in `outcome`.
    pub async fn run(&self, question: &str, cancel: &CancellationToken) -> PlannerResult {
        let trace = RunTrace::new(self.trace_sink.clone());
        let deadline = self
            .settings
            .question_timeout_secs
            .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
        let tools = self.registry.tool_definitions();
        let max_iterations = self.settings.max_iterations;
        let mut state = LoopState::new(Conversation::start(&self.system_framing, question));

        tracing::info!(run_id = %trace.run_id(), max_iterations, "Planner started");

        let outcome = loop {
            if cancel.is_cancelled() {
                break LoopOutcome::Failure(FailureReason::Cancelled);
            }
            if state.iterations >= max_iterations {
                state.budget_exceeded = true;
                tracing::warn!("Planner reached max iterations ({})", max_iterations);
                break LoopOutcome::Failure(FailureReason::BudgetExhausted);
            }
            state.iterations += 1;
            state.transition(Phase::AwaitingModel);

            // ── Model call ──────────────────────────────────────────────────
            let messages = state.conversation.to_messages();
            trace.emit(
                TraceEventKind::ModelCall,
                state.iterations,
                json!({ "messages": messages.len(), "tools": tools.len() }),
            );
            let reply = match interruptible(self.provider.complete(&messages, &tools), cancel, deadline).await {
                Err(why) => {
                    tracing::info!(?why, iteration = state.iterations, "Planner interrupted awaiting model");
                    break LoopOutcome::Failure(FailureReason::Cancelled);
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Completion call failed");
                    break LoopOutcome::Failure(FailureReason::ModelUnavailable(e.to_string()));
                }
                Ok(Ok(reply)) => reply,
            };

            let (text, request) = match reply {
                ModelReply::FinalAnswer(text) => match reflection::reflect_on_text(&text, &mut state, &self.settings) {
                    TextOutcome::Nudge(guidance) => {
                        state.conversation.push_draft(text);
                        state.conversation.push_guidance(guidance);
                        continue;
                    }
                    TextOutcome::Accept => break LoopOutcome::Answer(text),
                },
                ModelReply::ToolRequest { text, request } => (text, request),
            };

            // ── Dispatch ────────────────────────────────────────────────────
            state.nudges = 0;
            state.transition(Phase::Dispatching);
            state.tool_calls += 1;
            let streak = state.note_request(&request);

            let dispatched = match interruptible(
                dispatch::dispatch(&self.registry, &request, self.settings.max_result_rows, &trace, state.iterations),
                cancel,
                deadline,
            )
            .await
            {
                Ok(d) => d,
                Err(why) => {
                    tracing::info!(?why, tool = %request.tool_name, "Planner interrupted during dispatch");
                    break LoopOutcome::Failure(FailureReason::Cancelled);
                }
            };

            state.steps.push(AgentStep {
                iteration: state.iterations,
                tool_name: request.tool_name.clone(),
                query: dispatched.query,
                result: dispatched.result.clone(),
            });
            state.conversation.push_tool_request(text, request.clone());
            state.conversation.push_tool_result(dispatched.result);

            if let Some(warning) = reflection::repeat_warning(&request.tool_name, streak, &self.settings) {
                state.conversation.push_guidance(warning);
            }
        };

        state.transition(Phase::Finished);
        let response = match &outcome {
            LoopOutcome::Answer(text) => {
                state.conversation.finish_with_answer(text.clone());
                text.clone()
            }
            LoopOutcome::Failure(reason) => {
                state.conversation.finish_with_failure(reason.clone());
                reason.user_message(!state.steps.is_empty()).to_string()
            }
        };

        let elapsed_ms = state.elapsed_ms();
        trace.emit(
            TraceEventKind::LoopFinished,
            state.iterations,
            json!({
                "outcome": &outcome,
                "budget_exceeded": state.budget_exceeded,
                "tool_calls": state.tool_calls,
                "elapsed_ms": elapsed_ms,
            }),
        );
        tracing::info!(
            run_id = %trace.run_id(),
            iterations = state.iterations,
            tool_calls = state.tool_calls,
            answered = outcome.is_answer(),
            elapsed_ms,
            "Planner finished"
        );

        PlannerResult {
            run_id: trace.run_id().to_string(),
            outcome,
            response,
            steps: state.steps,
            iterations: state.iterations,
            tool_calls: state.tool_calls,
            elapsed_ms,
            conversation: state.conversation,
        }
    }
}

/// Await `fut` unless the token is cancelled or the deadline passes first.
async fn interruptible<F: Future>(
    fut: F,
    cancel: &CancellationToken,
    deadline: Option<tokio::time::Instant>,
) -> Result<F::Output, Interrupted> {
    let expired = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupted::Cancelled),
        _ = expired => Err(Interrupted::DeadlineElapsed),
        out = fut => Ok(out),
    }
}
