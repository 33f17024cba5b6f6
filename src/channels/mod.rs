//! Versioned state channels.
//!
//! A run's state is a set of channels. Keyed channels hold arbitrary JSON
//! values merged under a [`ChannelPolicy`](crate::types::ChannelPolicy);
//! the errors channel collects [`ErrorEvent`]s from recoverable failures.
//! Every channel carries a version that the barrier bumps only when a merge
//! actually changed the contents, so schedulers and consumers can cheaply
//! detect staleness.

pub mod errors;

pub use errors::{CauseChain, ErrorEvent, ErrorScope};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single keyed channel: the current JSON value plus its version.
///
/// Versions start at 1 for seeded defaults and increase monotonically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChannel {
    pub value: Value,
    pub version: u32,
}

impl ValueChannel {
    pub fn new(value: Value) -> Self {
        Self { value, version: 1 }
    }

    pub fn bump(&mut self) {
        self.version += 1;
    }
}

impl Default for ValueChannel {
    fn default() -> Self {
        Self {
            value: Value::Null,
            version: 1,
        }
    }
}

/// The dedicated errors channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorsChannel {
    pub items: Vec<ErrorEvent>,
    pub version: u32,
}

impl ErrorsChannel {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
