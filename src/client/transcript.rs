//! Per-speaker token accumulation.
//!
//! Streamed tokens carry attribution tags (`agent:<id>`,
//! `agent-name:<name>`). The transcript keeps one accumulating buffer per
//! entity: the first token with a new tag opens a turn, and every later
//! token with the same tag appends to that turn, regardless of
//! interleaving with other speakers. Untagged tokens land in a shared
//! narrator turn.

use rustc_hash::FxHashMap;

use crate::wire::WireMessage;

const AGENT_TAG: &str = "agent:";
const AGENT_NAME_TAG: &str = "agent-name:";
const NARRATOR: &str = "narrator";

/// One speaker's accumulated text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeakerTurn {
    /// Entity key parsed from the attribution tag.
    pub entity: String,
    /// Display label, from `agent-name:` when present.
    pub label: String,
    pub text: String,
}

/// Token reducer: entity-keyed accumulating buffers in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    turns: Vec<SpeakerTurn>,
    index: FxHashMap<String, usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[SpeakerTurn] {
        &self.turns
    }

    /// The accumulated text for an entity, if any tokens arrived for it.
    pub fn text_for(&self, entity: &str) -> Option<&str> {
        self.index
            .get(entity)
            .map(|&i| self.turns[i].text.as_str())
    }

    /// Fold one wire message; only tokens affect the transcript.
    pub fn apply(&mut self, message: &WireMessage) {
        if let WireMessage::Token { token, tags } = message {
            self.apply_token(token, tags);
        }
    }

    pub fn apply_token(&mut self, token: &str, tags: &[String]) {
        let entity = tags
            .iter()
            .find_map(|t| t.strip_prefix(AGENT_TAG))
            .unwrap_or(NARRATOR)
            .to_string();
        let label = tags
            .iter()
            .find_map(|t| t.strip_prefix(AGENT_NAME_TAG))
            .unwrap_or(&entity)
            .to_string();
        match self.index.get(&entity) {
            Some(&i) => self.turns[i].text.push_str(token),
            None => {
                self.index.insert(entity.clone(), self.turns.len());
                self.turns.push(SpeakerTurn {
                    entity,
                    label,
                    text: token.to_string(),
                });
            }
        }
    }
}
