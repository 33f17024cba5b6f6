//! Typed step payloads and domain data shapes.
//!
//! Every `update` message on the wire carries an [`UpdatePayload`]: a closed
//! tagged union with one variant per step identity. Nothing in the system
//! passes untyped payload blobs; consumers match on the variant and get the
//! concrete shape.
//!
//! # Examples
//!
//! ```rust
//! use claritas::payloads::{Segment, UpdatePayload};
//!
//! let payload = UpdatePayload::Segments {
//!     segments: vec![Segment {
//!         id: "seg-1".to_string(),
//!         content: "The sky is green.".to_string(),
//!     }],
//! };
//! let json = serde_json::to_value(&payload).unwrap();
//! assert_eq!(json["kind"], "segments");
//! ```

use serde::{Deserialize, Serialize};

/// A size-bounded chunk of the input text produced by preprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub content: String,
}

/// A bias finding anchored to a segment by quoted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bias {
    pub segment_id: String,
    /// Verbatim quote from the segment; used to anchor the overlay.
    pub content: String,
    pub bias_type: String,
    pub explanation: String,
    pub type_explanation: String,
}

/// A factual claim extracted from a segment, not yet verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub segment_id: String,
    pub index: u32,
    /// Verbatim quote from the segment; used to anchor the overlay.
    pub content: String,
    pub explanation: String,
}

/// Verification outcome for a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    True,
    False,
    PartiallyTrue,
    Unverifiable,
}

/// A claim together with its verification outcome and supporting sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedClaim {
    pub segment_id: String,
    pub index: u32,
    pub content: String,
    pub explanation: String,
    pub verdict: Verdict,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Where the debate manager routes the conversation next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateRouting {
    Agent,
    End,
}

/// The debate manager's routing decision for the next turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextTurn {
    pub routing: DebateRouting,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Summary of one completed agent turn in a debate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTurn {
    pub agent_id: String,
    pub agent_name: String,
    pub summary: String,
}

/// Closed union of step payloads, one variant per step identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdatePayload {
    Segments { segments: Vec<Segment> },
    Claims { claims: Vec<Claim> },
    Biases { biases: Vec<Bias> },
    VerifiedClaims { claims: Vec<VerifiedClaim> },
    Report { report: String },
    NextTurn { turn: NextTurn },
    AgentTurn { turn: AgentTurn },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_wire_form_is_snake_case() {
        assert_eq!(
            serde_json::to_value(Verdict::PartiallyTrue).unwrap(),
            json!("partially_true")
        );
        assert_eq!(serde_json::to_value(Verdict::True).unwrap(), json!("true"));
    }

    #[test]
    fn payload_kind_tag() {
        let payload = UpdatePayload::Report {
            report: "all clear".to_string(),
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v, json!({"kind": "report", "report": "all clear"}));
        let back: UpdatePayload = serde_json::from_value(v).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn next_turn_omits_empty_fields() {
        let turn = NextTurn {
            routing: DebateRouting::End,
            agent_id: None,
            notes: None,
        };
        let v = serde_json::to_value(&turn).unwrap();
        assert_eq!(v, json!({"routing": "end"}));
    }
}
