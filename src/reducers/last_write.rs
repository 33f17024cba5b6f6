use serde_json::Value;

use super::{Reducer, ReducerError};

/// Replaces the current value with the incoming one.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct LastWrite;

impl Reducer for LastWrite {
    fn apply(&self, _current: &Value, incoming: &Value) -> Result<Value, ReducerError> {
        Ok(incoming.clone())
    }
}
