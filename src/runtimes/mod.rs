//! Run-time execution: the superstep runner and invocation handles.

mod runner;
mod streaming;

pub use runner::{GraphRunner, RunnerError};
pub use streaming::InvocationHandle;
