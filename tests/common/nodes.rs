//! Fake node implementations shared across the integration suites.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use claritas::node::{Node, NodeContext, NodeError, NodePartial};
use claritas::payloads::UpdatePayload;
use claritas::state::StateSnapshot;

/// Writes a fixed value to one channel, optionally after a delay, and
/// counts how many times it ran.
pub struct Writer {
    key: &'static str,
    value: Value,
    delay: Option<Duration>,
    payload: Option<UpdatePayload>,
    runs: Arc<AtomicUsize>,
}

impl Writer {
    pub fn new(key: &'static str, value: Value) -> Self {
        Self {
            key,
            value,
            delay: None,
            payload: None,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn with_delay_ms(mut self, millis: u64) -> Self {
        self.delay = Some(Duration::from_millis(millis));
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: UpdatePayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Handle to this node's run counter.
    pub fn runs(&self) -> Arc<AtomicUsize> {
        self.runs.clone()
    }
}

#[async_trait]
impl Node for Writer {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        let mut partial = NodePartial::new().with_update(self.key, self.value.clone());
        if let Some(payload) = &self.payload {
            partial = partial.with_event(payload.clone());
        }
        Ok(partial)
    }
}

/// Always fails with an external error.
pub struct Failing {
    message: &'static str,
    runs: Arc<AtomicUsize>,
}

impl Failing {
    pub fn new(message: &'static str) -> Self {
        Self {
            message,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn runs(&self) -> Arc<AtomicUsize> {
        self.runs.clone()
    }
}

#[async_trait]
impl Node for Failing {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Err(NodeError::External {
            message: self.message.to_string(),
        })
    }
}

/// Emits a sequence of tagged tokens, then an optional update.
pub struct Streaming {
    tokens: Vec<(String, Vec<String>)>,
    partial: NodePartial,
}

impl Streaming {
    pub fn new(tokens: Vec<(String, Vec<String>)>) -> Self {
        Self {
            tokens,
            partial: NodePartial::default(),
        }
    }

    #[must_use]
    pub fn with_partial(mut self, partial: NodePartial) -> Self {
        self.partial = partial;
        self
    }
}

#[async_trait]
impl Node for Streaming {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        for (text, tags) in &self.tokens {
            ctx.emit_token(text.clone(), tags.clone())?;
        }
        Ok(self.partial.clone())
    }
}

/// Wraps a closure so tests can express snapshot-dependent behavior inline.
pub struct FnNode<F>(pub F);

#[async_trait]
impl<F> Node for FnNode<F>
where
    F: Fn(&StateSnapshot, &NodeContext) -> Result<NodePartial, NodeError> + Send + Sync,
{
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        (self.0)(&snapshot, &ctx)
    }
}

/// Counting wrapper around any node, for run-count assertions on nodes
/// whose behavior lives elsewhere.
pub struct Counted<N> {
    inner: N,
    runs: Arc<AtomicUsize>,
}

impl<N: Node> Counted<N> {
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn runs(&self) -> Arc<AtomicUsize> {
        self.runs.clone()
    }
}

#[async_trait]
impl<N: Node> Node for Counted<N> {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.inner.run(snapshot, ctx).await
    }
}
