//! The `Node` trait and its supporting types.
//!
//! A node is one pipeline step: it receives an immutable [`StateSnapshot`]
//! and a [`NodeContext`], does its work (usually an opaque external call),
//! and returns a [`NodePartial`] describing what it wants merged into state,
//! which payload to surface to the client, and any recoverable errors.
//!
//! Nodes never mutate state directly; the barrier applies partials through
//! the reducer registry in completion order.
//!
//! # Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use claritas::node::{Node, NodeContext, NodeError, NodePartial};
//! use claritas::payloads::UpdatePayload;
//! use claritas::state::StateSnapshot;
//! use serde_json::json;
//!
//! struct Reporter;
//!
//! #[async_trait]
//! impl Node for Reporter {
//!     async fn run(
//!         &self,
//!         snapshot: StateSnapshot,
//!         _ctx: NodeContext,
//!     ) -> Result<NodePartial, NodeError> {
//!         if snapshot.list("verified_claims").is_empty() && snapshot.list("biases").is_empty() {
//!             return Err(NodeError::MissingInput {
//!                 what: "verified claims or biases",
//!             });
//!         }
//!         Ok(NodePartial::new()
//!             .with_update("report", json!("nothing to report"))
//!             .with_event(UpdatePayload::Report {
//!                 report: "nothing to report".to_string(),
//!             }))
//!     }
//! }
//! ```

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::RunConfig;
use crate::channels::errors::ErrorEvent;
use crate::event_bus::Event;
use crate::payloads::UpdatePayload;
use crate::state::StateSnapshot;

/// Execution context handed to a node for one invocation.
///
/// Carries the node's identity, the superstep number, the frozen run
/// configuration, and a sender into the event bus for incremental tokens.
#[derive(Clone, Debug)]
pub struct NodeContext {
    pub node_id: String,
    pub step: u64,
    pub config: Arc<RunConfig>,
    pub event_sender: flume::Sender<Event>,
}

impl NodeContext {
    /// Emit one incremental token with attribution tags.
    ///
    /// Tokens always reach the bus; whether they reach the wire depends on
    /// `RunConfig::streaming_nodes`.
    pub fn emit_token(
        &self,
        text: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<(), NodeError> {
        self.event_sender
            .send(Event::token(&self.node_id, text, tags))
            .map_err(|e| NodeError::EventBus(e.to_string()))
    }

    /// Emit an untagged token.
    pub fn emit_plain_token(&self, text: impl Into<String>) -> Result<(), NodeError> {
        self.emit_token(text, Vec::new())
    }

    /// Emit a diagnostic line visible to bus sinks.
    pub fn emit_diagnostic(
        &self,
        message: impl Into<String>,
    ) -> Result<(), NodeError> {
        self.event_sender
            .send(Event::diagnostic(&self.node_id, message))
            .map_err(|e| NodeError::EventBus(e.to_string()))
    }
}

/// The delta a node hands back to the barrier.
///
/// `updates` are merged per channel policy; `events` surface to the client
/// stream (only the first one is forwarded, extras are dropped with a debug
/// log); `errors` are folded into the errors channel.
#[derive(Debug, Default, Clone)]
pub struct NodePartial {
    pub updates: Option<FxHashMap<String, Value>>,
    pub events: Vec<UpdatePayload>,
    pub errors: Option<Vec<ErrorEvent>>,
}

impl NodePartial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one channel.
    #[must_use]
    pub fn with_update(mut self, key: impl Into<String>, value: Value) -> Self {
        self.updates
            .get_or_insert_with(FxHashMap::default)
            .insert(key.into(), value);
        self
    }

    /// Write several channels at once.
    #[must_use]
    pub fn with_updates(mut self, updates: FxHashMap<String, Value>) -> Self {
        self.updates.get_or_insert_with(FxHashMap::default).extend(updates);
        self
    }

    /// Attach a client-visible payload for this step.
    #[must_use]
    pub fn with_event(mut self, payload: UpdatePayload) -> Self {
        self.events.push(payload);
        self
    }

    /// Attach recoverable error events.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ErrorEvent>) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// Failure modes a node can report.
///
/// Whether a `NodeError` aborts the run is the runner's decision: it is
/// recoverable for ordinary steps and fatal for joins.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(claritas::node::missing_input),
        help("check that upstream steps populate this channel before this node runs")
    )]
    MissingInput { what: &'static str },

    #[error("external call failed: {message}")]
    #[diagnostic(code(claritas::node::external))]
    External { message: String },

    #[error("serialization error: {0}")]
    #[diagnostic(code(claritas::node::serde))]
    Serde(#[from] serde_json::Error),

    #[error("validation failed: {0}")]
    #[diagnostic(code(claritas::node::validation))]
    ValidationFailed(String),

    #[error("event bus unavailable: {0}")]
    #[diagnostic(
        code(claritas::node::event_bus),
        help("the run may already be finished or cancelled")
    )]
    EventBus(String),
}

/// One pipeline step.
///
/// Implementations must be `Send + Sync`; the runner executes all frontier
/// nodes concurrently against the same snapshot.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError>;
}
