//! Reflection sub-module: text-only replies and repeated requests.
//!
//! Decides whether a text reply is the final answer or an announced-but-not-
//! made tool call that deserves a nudge, and builds the change-approach
//! warning for repeated identical requests.

use super::state::LoopState;
use dormtwin_core::config::PlannerSettings;

const INTENT_PHRASES: &[&str] = &[
    "i'll use",
    "i will use",
    "i'll call",
    "i will call",
    "let me use",
    "let me call",
    "i need to use",
    "i need to call",
    "i'll query",
    "let me query",
    "using querygraph",
    "using queryseries",
    "call querygraph",
    "call queryseries",
];

pub(super) const NUDGE_MESSAGE: &str =
    "Please actually call the tool now with a query. Don't describe what you'll do, execute the function.";

/// What to do with a text-only reply.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum TextOutcome {
    Accept,
    Nudge(&'static str),
}

/// Text that announces a tool call without making one.
pub(super) fn looks_like_intent_without_call(text: &str) -> bool {
    let lower = text.to_lowercase();
    INTENT_PHRASES.iter().any(|p| lower.contains(p))
}

/// Reflect on a text reply. Nudging needs budget left for the retry and
/// stops after `max_nudges` consecutive nudges.
pub(super) fn reflect_on_text(text: &str, state: &mut LoopState, settings: &PlannerSettings) -> TextOutcome {
    let budget_left = state.iterations < settings.max_iterations;
    if budget_left && state.nudges < settings.max_nudges && looks_like_intent_without_call(text) {
        state.nudges += 1;
        tracing::info!(
            iteration = state.iterations,
            nudges = state.nudges,
            "Model described a tool call without making it, nudging"
        );
        return TextOutcome::Nudge(NUDGE_MESSAGE);
    }
    TextOutcome::Accept
}

/// Guidance after `streak` identical requests, if the threshold is reached.
pub(super) fn repeat_warning(tool_name: &str, streak: usize, settings: &PlannerSettings) -> Option<String> {
    if streak < settings.repeat_warning_threshold {
        return None;
    }
    tracing::warn!(tool = tool_name, streak, "Model repeated an identical tool request");
    Some(format!(
        "You have sent the same {} request {} times in a row and got the same result. \
         Do not repeat it. Change the query, use the other tool, or answer with what you have.",
        tool_name, streak
    ))
}
