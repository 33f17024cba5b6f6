//! Versioned run state and snapshots.
//!
//! State is declared up front by a [`StateSchema`]: each key names a channel
//! with a [`ChannelPolicy`] and a default value, so every consumer sees every
//! key from the first superstep on (an append-list channel is `[]` before
//! anything wrote to it, never missing). [`VersionedState`] is the live,
//! mutable form owned by the runner; nodes only ever see an immutable
//! [`StateSnapshot`] clone.
//!
//! # Examples
//!
//! ```rust
//! use claritas::state::{StateSchema, VersionedState};
//! use serde_json::json;
//!
//! let schema = StateSchema::builder()
//!     .list("claims")
//!     .scalar("report")
//!     .build();
//!
//! let state = VersionedState::from_schema(&schema)
//!     .with_value("report", json!(null));
//! let snap = state.snapshot();
//! assert_eq!(snap.get("claims"), Some(&json!([])));
//! ```

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::channels::{ErrorEvent, ErrorsChannel, ValueChannel};
use crate::types::ChannelPolicy;

/// Declaration of a single state channel: merge policy plus seeded default.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub policy: ChannelPolicy,
    pub default: Value,
}

/// The set of channels a graph's state is made of.
///
/// Keys not declared here may still be written; they are merged with
/// [`ChannelPolicy::LastWrite`] and default to `null`.
#[derive(Debug, Clone, Default)]
pub struct StateSchema {
    channels: FxHashMap<String, ChannelSpec>,
}

impl StateSchema {
    pub fn builder() -> StateSchemaBuilder {
        StateSchemaBuilder::default()
    }

    /// The merge policy for `key` (undeclared keys are last-write).
    #[must_use]
    pub fn policy(&self, key: &str) -> ChannelPolicy {
        self.channels
            .get(key)
            .map_or(ChannelPolicy::LastWrite, |spec| spec.policy)
    }

    /// The seeded default for `key` (undeclared keys default to `null`).
    #[must_use]
    pub fn default_value(&self, key: &str) -> Value {
        self.channels
            .get(key)
            .map_or(Value::Null, |spec| spec.default.clone())
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.channels.keys()
    }

    pub fn is_declared(&self, key: &str) -> bool {
        self.channels.contains_key(key)
    }
}

/// Fluent builder for [`StateSchema`].
#[derive(Debug, Default)]
pub struct StateSchemaBuilder {
    channels: FxHashMap<String, ChannelSpec>,
}

impl StateSchemaBuilder {
    /// Declare an append-list channel, seeded with an empty array.
    pub fn list(mut self, key: impl Into<String>) -> Self {
        self.channels.insert(
            key.into(),
            ChannelSpec {
                policy: ChannelPolicy::AppendList,
                default: Value::Array(Vec::new()),
            },
        );
        self
    }

    /// Declare a last-write channel, seeded with `null`.
    pub fn scalar(mut self, key: impl Into<String>) -> Self {
        self.channels.insert(
            key.into(),
            ChannelSpec {
                policy: ChannelPolicy::LastWrite,
                default: Value::Null,
            },
        );
        self
    }

    /// Declare a last-write channel with an explicit seeded default.
    pub fn scalar_with_default(mut self, key: impl Into<String>, default: Value) -> Self {
        self.channels.insert(
            key.into(),
            ChannelSpec {
                policy: ChannelPolicy::LastWrite,
                default,
            },
        );
        self
    }

    pub fn build(self) -> StateSchema {
        StateSchema {
            channels: self.channels,
        }
    }
}

/// The live state of a run: keyed channels plus the errors channel.
#[derive(Debug, Clone, Default)]
pub struct VersionedState {
    channels: FxHashMap<String, ValueChannel>,
    pub errors: ErrorsChannel,
}

impl VersionedState {
    /// Seed a fresh state with every schema key at its default, version 1.
    #[must_use]
    pub fn from_schema(schema: &StateSchema) -> Self {
        let mut channels = FxHashMap::default();
        for key in schema.keys() {
            channels.insert(key.clone(), ValueChannel::new(schema.default_value(key)));
        }
        Self {
            channels,
            errors: ErrorsChannel::default(),
        }
    }

    /// Set a channel's value without bumping its version. Intended for
    /// seeding inputs before a run starts.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        let entry = self.channels.entry(key.into()).or_default();
        entry.value = value;
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.channels.get(key).map(|c| &c.value)
    }

    pub fn version(&self, key: &str) -> Option<u32> {
        self.channels.get(key).map(|c| c.version)
    }

    /// Replace a channel's value, bumping its version when it changed.
    /// Creates the channel when absent. Returns whether the value changed.
    pub fn apply(&mut self, key: &str, value: Value) -> bool {
        match self.channels.get_mut(key) {
            Some(channel) => {
                if channel.value == value {
                    false
                } else {
                    channel.value = value;
                    channel.bump();
                    true
                }
            }
            None => {
                self.channels.insert(key.to_string(), ValueChannel::new(value));
                true
            }
        }
    }

    /// Append error events, bumping the errors channel version once.
    pub fn push_errors(&mut self, events: Vec<ErrorEvent>) {
        if events.is_empty() {
            return;
        }
        self.errors.items.extend(events);
        self.errors.version += 1;
    }

    /// An immutable snapshot of all channels for node and router consumption.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            values: self
                .channels
                .iter()
                .map(|(k, c)| (k.clone(), c.value.clone()))
                .collect(),
            versions: self
                .channels
                .iter()
                .map(|(k, c)| (k.clone(), c.version))
                .collect(),
            errors: self.errors.items.clone(),
            errors_version: self.errors.version,
        }
    }
}

/// A point-in-time, immutable view of run state.
///
/// Snapshots are cheap clones handed to every scheduled node and router.
/// Mutating a snapshot never affects the run.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    pub values: FxHashMap<String, Value>,
    pub versions: FxHashMap<String, u32>,
    pub errors: Vec<ErrorEvent>,
    pub errors_version: u32,
}

impl StateSnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Borrow an append-list channel as a slice of items.
    ///
    /// Returns an empty slice for missing or non-array values, so callers
    /// can iterate without guarding.
    #[must_use]
    pub fn list(&self, key: &str) -> &[Value] {
        self.values
            .get(key)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// Deserialize a channel value into a concrete type.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
