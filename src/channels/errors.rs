use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// NodeKind is carried in its encoded string form so the event stays a plain
// JSON value on the wire.

/// A recoverable failure recorded in the run's errors channel.
///
/// Step failures do not abort a run (unless the step is a join); instead the
/// runner folds an `ErrorEvent` into state so the embedder can inspect what
/// went wrong after the run reaches `complete`.
///
/// # Examples
///
/// ```
/// use claritas::channels::errors::{ErrorEvent, CauseChain};
/// use serde_json::json;
///
/// let event = ErrorEvent::node("verify_claims", 2, CauseChain::msg("search backend down"))
///     .with_tag("external")
///     .with_context(json!({"claims": 4}));
/// let json_str = serde_json::to_string(&event).unwrap();
/// assert!(json_str.contains("verify_claims"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ErrorEvent {
    #[serde(default = "chrono::Utc::now")]
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub scope: ErrorScope,
    #[serde(default)]
    pub error: CauseChain,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl ErrorEvent {
    /// Create a node-scoped error event.
    pub fn node<S: Into<String>>(kind: S, step: u64, error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Node {
                kind: kind.into(),
                step,
            },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Create a runner-scoped error event.
    pub fn runner<S: Into<String>>(run: S, step: u64, error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Runner {
                run: run.into(),
                step,
            },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Create an app-scoped error event.
    pub fn app(error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::App,
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Replace the tag list on this error event.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Add a single tag to this error event.
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Attach context metadata to this error event.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

/// Where in the engine an [`ErrorEvent`] originated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ErrorScope {
    Node {
        kind: String,
        step: u64,
    },
    Runner {
        run: String,
        step: u64,
    },
    #[default]
    App,
}

impl ErrorScope {
    /// Stable sort key used by the barrier to order errors deterministically.
    #[must_use]
    pub fn sort_key(&self) -> String {
        match self {
            ErrorScope::Node { kind, step } => format!("node:{step:08}:{kind}"),
            ErrorScope::Runner { run, step } => format!("runner:{step:08}:{run}"),
            ErrorScope::App => "app".to_string(),
        }
    }
}

/// A serializable error value with an optional cause chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CauseChain {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<CauseChain>>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl Default for CauseChain {
    fn default() -> Self {
        CauseChain {
            message: String::new(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }
}

impl std::fmt::Display for CauseChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CauseChain {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c as &dyn std::error::Error)
    }
}

impl CauseChain {
    pub fn msg<M: Into<String>>(m: M) -> Self {
        CauseChain {
            message: m.into(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_cause(mut self, cause: CauseChain) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}
