use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::payloads::UpdatePayload;

/// Everything that flows over the in-process event bus during a run.
///
/// The bus carries more than the client ever sees: sinks get diagnostics
/// and unfiltered tokens, while the wire multiplexer forwards only tokens
/// from streaming-enabled steps, step updates, and the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// One incremental token emitted by a running step.
    Token(TokenEvent),
    /// A step completed and surfaced a payload.
    StepUpdate(StepUpdateEvent),
    /// Operator-facing diagnostic line; never reaches the wire.
    Diagnostic(DiagnosticEvent),
    /// Terminal marker: the run is over, nothing follows.
    RunEnded(RunEndedEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEvent {
    pub node: String,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub when: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepUpdateEvent {
    pub step: String,
    pub payload: UpdatePayload,
    pub when: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub scope: String,
    pub message: String,
    pub when: DateTime<Utc>,
}

/// How a run finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEndedEvent {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub step: u64,
    pub when: DateTime<Utc>,
}

impl Event {
    pub fn token(node: impl Into<String>, text: impl Into<String>, tags: Vec<String>) -> Self {
        Event::Token(TokenEvent {
            node: node.into(),
            text: text.into(),
            tags,
            when: Utc::now(),
        })
    }

    pub fn step_update(step: impl Into<String>, payload: UpdatePayload) -> Self {
        Event::StepUpdate(StepUpdateEvent {
            step: step.into(),
            payload,
            when: Utc::now(),
        })
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
            when: Utc::now(),
        })
    }

    pub fn run_ended(run_id: impl Into<String>, outcome: RunOutcome, step: u64) -> Self {
        Event::RunEnded(RunEndedEvent {
            run_id: run_id.into(),
            outcome,
            step,
            when: Utc::now(),
        })
    }

    /// Returns `true` for the terminal marker.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::RunEnded(_))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Token(t) => write!(f, "[token {}] {:?} {}", t.node, t.tags, t.text),
            Event::StepUpdate(u) => write!(f, "[update {}]", u.step),
            Event::Diagnostic(d) => write!(f, "[{}] {}", d.scope, d.message),
            Event::RunEnded(r) => match &r.outcome {
                RunOutcome::Completed => {
                    write!(f, "[run {}] completed at step {}", r.run_id, r.step)
                }
                RunOutcome::Failed { error } => {
                    write!(f, "[run {}] failed at step {}: {}", r.run_id, r.step, error)
                }
            },
        }
    }
}
