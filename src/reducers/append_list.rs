use serde_json::Value;

use super::{Reducer, ReducerError};

/// Concatenates the incoming array onto the current one.
///
/// The current value may be `null` (treated as empty); the incoming value
/// must be an array. Parallel writers interleave by arrival order, so the
/// resulting sequence is nondeterministic but its contents are not.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct AppendList;

impl Reducer for AppendList {
    fn apply(&self, current: &Value, incoming: &Value) -> Result<Value, ReducerError> {
        let incoming_items = incoming.as_array().ok_or_else(|| ReducerError::Apply {
            key: String::new(),
            message: format!("append-list channel received non-array value: {incoming}"),
        })?;
        let mut items = match current {
            Value::Array(existing) => existing.clone(),
            Value::Null => Vec::new(),
            other => {
                return Err(ReducerError::Apply {
                    key: String::new(),
                    message: format!("append-list channel holds non-array value: {other}"),
                });
            }
        };
        items.extend(incoming_items.iter().cloned());
        Ok(Value::Array(items))
    }
}
