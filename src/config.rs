//! Per-run configuration.
//!
//! A [`RunConfig`] is built once, frozen behind an `Arc`, and handed to the
//! runner; routers and nodes read it through their context. There is no
//! global mutable configuration anywhere in the engine. Defaults can be
//! overridden from the environment (`CLARITAS_*`, resolved through dotenvy
//! once at construction).

use crate::utils::id_generator::IdGenerator;

/// Which backend a verification router should send extracted claims to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationSource {
    Web,
    Llm,
}

impl VerificationSource {
    /// The branch key this source selects in a verification router.
    #[must_use]
    pub fn branch_key(&self) -> &'static str {
        match self {
            VerificationSource::Web => "web",
            VerificationSource::Llm => "llm",
        }
    }

    fn from_env_value(value: &str) -> Option<Self> {
        match value {
            "web" => Some(VerificationSource::Web),
            "llm" => Some(VerificationSource::Llm),
            _ => None,
        }
    }
}

/// Immutable parameters for one pipeline run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Identifies the run in logs, error scopes, and diagnostics.
    pub run_id: String,
    /// Backend for claim verification. Default `Llm`.
    pub verification_source: VerificationSource,
    /// Upper bound on segment length in characters. Default 1000.
    pub segment_size: usize,
    /// Hint for debate-style routers: end the loop after this many turns.
    /// Default 10. The engine-level bound is `max_supersteps`.
    pub max_turns: u32,
    /// Steps whose incremental tokens are forwarded to the wire. Tokens
    /// from any other step stay on the bus for sinks but never reach the
    /// client stream.
    pub streaming_nodes: Vec<String>,
    /// Hard bound on supersteps per run; exceeding it aborts the run.
    /// Default 64.
    pub max_supersteps: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        dotenvy::dotenv().ok();
        Self {
            run_id: IdGenerator::new().generate_run_id(),
            verification_source: std::env::var("CLARITAS_VERIFICATION_SOURCE")
                .ok()
                .as_deref()
                .and_then(VerificationSource::from_env_value)
                .unwrap_or(VerificationSource::Llm),
            segment_size: std::env::var("CLARITAS_SEGMENT_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            max_turns: std::env::var("CLARITAS_MAX_TURNS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            streaming_nodes: Vec::new(),
            max_supersteps: 64,
        }
    }
}

impl RunConfig {
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    #[must_use]
    pub fn with_verification_source(mut self, source: VerificationSource) -> Self {
        self.verification_source = source;
        self
    }

    #[must_use]
    pub fn with_segment_size(mut self, segment_size: usize) -> Self {
        self.segment_size = segment_size;
        self
    }

    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Mark a step's tokens as wire-visible.
    #[must_use]
    pub fn with_streaming_node(mut self, node: impl Into<String>) -> Self {
        self.streaming_nodes.push(node.into());
        self
    }

    #[must_use]
    pub fn with_max_supersteps(mut self, max_supersteps: u64) -> Self {
        self.max_supersteps = max_supersteps;
        self
    }

    /// Whether tokens from `node` should be forwarded to the wire.
    #[must_use]
    pub fn streams_tokens_from(&self, node: &str) -> bool {
        self.streaming_nodes.iter().any(|n| n == node)
    }
}
