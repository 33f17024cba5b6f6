//! Core types for the claritas pipeline engine.
//!
//! This module defines the fundamental identifiers used throughout the
//! system: [`NodeKind`] names nodes in a workflow graph, and
//! [`ChannelPolicy`] declares how a state channel merges concurrent writes.
//!
//! # Examples
//!
//! ```rust
//! use claritas::types::{NodeKind, ChannelPolicy};
//!
//! let start = NodeKind::Start;
//! let step = NodeKind::Custom("extract_claims".to_string());
//! assert_eq!(step.encode(), "Custom:extract_claims");
//!
//! let policy = ChannelPolicy::AppendList;
//! assert_ne!(policy, ChannelPolicy::LastWrite);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `Start` and `End` are virtual: they carry no implementation and may only
/// appear as edge endpoints. `Start` seeds the initial frontier; an edge to
/// `End` terminates that branch. All real pipeline steps are `Custom`.
///
/// # Examples
///
/// ```rust
/// use claritas::types::NodeKind;
///
/// let reporter = NodeKind::Custom("report".to_string());
/// let decoded = NodeKind::decode(&reporter.encode());
/// assert_eq!(reporter, decoded);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Virtual entry point. Has no incoming edges and is never executed.
    Start,
    /// Virtual terminal. Has no outgoing edges and is never executed.
    End,
    /// A real pipeline step, identified by a string unique within the graph.
    Custom(String),
}

impl NodeKind {
    /// Encode a `NodeKind` into its stable string form.
    ///
    /// - `Start` → `"Start"`
    /// - `End` → `"End"`
    /// - `Custom("X")` → `"Custom:X"`
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(s) => format!("Custom:{s}"),
        }
    }

    /// Decode the string form back into a `NodeKind`.
    ///
    /// Unrecognized formats fall back to `Custom(s)` for forward
    /// compatibility.
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeKind::Start
        } else if s == "End" {
            NodeKind::End
        } else if let Some(rest) = s.strip_prefix("Custom:") {
            NodeKind::Custom(rest.to_string())
        } else {
            NodeKind::Custom(s.to_string())
        }
    }

    /// Returns `true` if this is the virtual [`Start`](Self::Start) node.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` if this is the virtual [`End`](Self::End) node.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` if this node is a real pipeline step.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

// Allow using string literals where a NodeKind is expected.
impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

/// Declares how a state channel merges an incoming write at a barrier.
///
/// Every channel in a [`StateSchema`](crate::state::StateSchema) carries a
/// policy. Channels written by parallel branches almost always want
/// [`AppendList`](Self::AppendList); single-writer scalars and objects use
/// [`LastWrite`](Self::LastWrite).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelPolicy {
    /// The channel holds a JSON array; each incoming array is concatenated
    /// onto the existing value in arrival order.
    AppendList,
    /// The incoming value replaces the existing one.
    LastWrite,
}

impl fmt::Display for ChannelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppendList => write!(f, "append_list"),
            Self::LastWrite => write!(f, "last_write"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_encode_decode_round_trip() {
        let kinds = [
            NodeKind::Start,
            NodeKind::End,
            NodeKind::Custom("verify_claims".to_string()),
        ];
        for kind in kinds {
            assert_eq!(NodeKind::decode(&kind.encode()), kind);
        }
    }

    #[test]
    fn node_kind_from_str_literals() {
        assert_eq!(NodeKind::from("Start"), NodeKind::Start);
        assert_eq!(NodeKind::from("End"), NodeKind::End);
        assert_eq!(
            NodeKind::from("preprocess"),
            NodeKind::Custom("preprocess".to_string())
        );
    }

    #[test]
    fn decode_unknown_falls_back_to_custom() {
        assert_eq!(
            NodeKind::decode("Mystery"),
            NodeKind::Custom("Mystery".to_string())
        );
    }
}
