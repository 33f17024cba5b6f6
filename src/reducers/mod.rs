mod append_list;
mod last_write;
mod reducer_registry;

pub use append_list::AppendList;
pub use last_write::LastWrite;
pub use reducer_registry::ReducerRegistry;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::types::ChannelPolicy;

/// Unified reducer trait: a reducer folds one incoming channel write into
/// the channel's current value. Policies currently implemented: append-list
/// (array concat in arrival order) and last-write (replace).
pub trait Reducer: Send + Sync {
    fn apply(&self, current: &Value, incoming: &Value) -> Result<Value, ReducerError>;
}

#[derive(Debug, Error, Diagnostic)]
pub enum ReducerError {
    #[error("no reducer registered for policy: {0}")]
    #[diagnostic(
        code(claritas::reducers::unknown_policy),
        help("register a reducer for this policy or use ReducerRegistry::default()")
    )]
    UnknownPolicy(ChannelPolicy),

    #[error("reducer apply failed for channel `{key}`: {message}")]
    #[diagnostic(code(claritas::reducers::apply))]
    Apply { key: String, message: String },
}
