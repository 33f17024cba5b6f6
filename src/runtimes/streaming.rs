use tokio::task::JoinHandle;

use super::RunnerError;
use crate::state::VersionedState;

/// Handle to a spawned streaming run.
///
/// Dropping the handle does not stop the run; call [`abort`](Self::abort)
/// to cancel it. Cancellation is cooperative at await points: the run task
/// stops at its next yield and no further wire messages are produced.
pub struct InvocationHandle {
    run_id: String,
    handle: JoinHandle<Result<VersionedState, RunnerError>>,
}

impl InvocationHandle {
    pub(crate) fn new(
        run_id: String,
        handle: JoinHandle<Result<VersionedState, RunnerError>>,
    ) -> Self {
        Self { run_id, handle }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Cancel the run. The wire stream ends without a further terminal.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run and return its final state.
    pub async fn join(self) -> Result<VersionedState, RunnerError> {
        self.handle.await?
    }
}
