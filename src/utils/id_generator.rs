use uuid::Uuid;

/// Generates the identifiers used across a run.
///
/// Run ids are short and log-friendly; segment ids embed their position so
/// sorted output reads in document order.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    pub fn new() -> Self {
        Self
    }

    /// A fresh run id, e.g. `run-1f3a9c2e`.
    #[must_use]
    pub fn generate_run_id(&self) -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        format!("run-{}", &uuid[..8])
    }

    /// A deterministic segment id for position `index`, e.g. `seg-0003`.
    #[must_use]
    pub fn segment_id(&self, index: usize) -> String {
        format!("seg-{index:04}")
    }
}
