use rustc_hash::FxHashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::{
    node::NodePartial,
    reducers::{AppendList, LastWrite, Reducer, ReducerError},
    state::{StateSchema, VersionedState},
    types::ChannelPolicy,
};

/// Maps channel policies to reducer implementations and applies one
/// [`NodePartial`] at a time against live state.
///
/// Barriers call [`apply_partial`](Self::apply_partial) once per completed
/// node, in completion order; each call merges every key the partial wrote
/// and folds the partial's error events into the errors channel.
#[derive(Clone)]
pub struct ReducerRegistry {
    reducer_map: FxHashMap<ChannelPolicy, Arc<dyn Reducer>>,
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        Self::new()
            .with_reducer(ChannelPolicy::AppendList, Arc::new(AppendList))
            .with_reducer(ChannelPolicy::LastWrite, Arc::new(LastWrite))
    }
}

impl ReducerRegistry {
    /// Creates a new empty reducer registry.
    pub fn new() -> Self {
        Self {
            reducer_map: FxHashMap::default(),
        }
    }

    /// Builder-style registration of a reducer for a policy.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use claritas::reducers::{ReducerRegistry, LastWrite};
    /// use claritas::types::ChannelPolicy;
    ///
    /// let registry = ReducerRegistry::new()
    ///     .with_reducer(ChannelPolicy::LastWrite, Arc::new(LastWrite));
    /// ```
    pub fn with_reducer(mut self, policy: ChannelPolicy, reducer: Arc<dyn Reducer>) -> Self {
        self.reducer_map.insert(policy, reducer);
        self
    }

    /// Merge one partial into state. Returns the keys whose channels
    /// actually changed (their versions were bumped).
    #[instrument(skip_all, err)]
    pub fn apply_partial(
        &self,
        schema: &StateSchema,
        state: &mut VersionedState,
        partial: &NodePartial,
    ) -> Result<Vec<String>, ReducerError> {
        let mut updated = Vec::new();
        if let Some(updates) = &partial.updates {
            // Stable key order within a single partial.
            let mut keys: Vec<&String> = updates.keys().collect();
            keys.sort();
            for key in keys {
                let policy = schema.policy(key);
                let reducer = self
                    .reducer_map
                    .get(&policy)
                    .ok_or(ReducerError::UnknownPolicy(policy))?;
                let seeded = schema.default_value(key);
                let current = state.get(key).unwrap_or(&seeded);
                let merged =
                    reducer
                        .apply(current, &updates[key])
                        .map_err(|err| match err {
                            ReducerError::Apply { message, .. } => ReducerError::Apply {
                                key: key.clone(),
                                message,
                            },
                            other => other,
                        })?;
                if state.apply(key, merged) {
                    updated.push(key.clone());
                }
            }
        }
        if let Some(errors) = &partial.errors
            && !errors.is_empty()
        {
            state.push_errors(errors.clone());
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> StateSchema {
        StateSchema::builder().list("claims").scalar("report").build()
    }

    #[test]
    fn append_then_last_write() {
        let schema = schema();
        let registry = ReducerRegistry::default();
        let mut state = VersionedState::from_schema(&schema);

        let first = NodePartial::new()
            .with_update("claims", json!([{"index": 0}]))
            .with_update("report", json!("partial"));
        let updated = registry.apply_partial(&schema, &mut state, &first).unwrap();
        assert_eq!(updated, vec!["claims".to_string(), "report".to_string()]);

        let second = NodePartial::new().with_update("claims", json!([{"index": 1}]));
        registry.apply_partial(&schema, &mut state, &second).unwrap();
        assert_eq!(
            state.get("claims"),
            Some(&json!([{"index": 0}, {"index": 1}]))
        );
        assert_eq!(state.get("report"), Some(&json!("partial")));
    }

    #[test]
    fn non_array_write_to_list_channel_fails() {
        let schema = schema();
        let registry = ReducerRegistry::default();
        let mut state = VersionedState::from_schema(&schema);
        let bad = NodePartial::new().with_update("claims", json!("oops"));
        let err = registry.apply_partial(&schema, &mut state, &bad).unwrap_err();
        assert!(matches!(err, ReducerError::Apply { ref key, .. } if key == "claims"));
    }

    #[test]
    fn undeclared_key_defaults_to_last_write() {
        let schema = schema();
        let registry = ReducerRegistry::default();
        let mut state = VersionedState::from_schema(&schema);
        let partial = NodePartial::new().with_update("scratch", json!(42));
        registry.apply_partial(&schema, &mut state, &partial).unwrap();
        assert_eq!(state.get("scratch"), Some(&json!(42)));
    }
}
