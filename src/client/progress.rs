//! Stage-status reduction over the wire stream.
//!
//! A [`StagePlan`] declares the client's view of the pipeline: ordered
//! stages, which wire step ids map to each, which stages go in-progress
//! when a stage completes, and which stages are joins that wait for a full
//! predecessor set. A [`ProgressBoard`] folds wire messages into statuses
//! under a monotonicity guard: statuses only ever advance, so out-of-order
//! or duplicated updates can never regress the display.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::wire::WireMessage;

/// Display status of one stage. Ordering is the advancement order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Todo,
    InProgress,
    Done,
    Error,
}

/// One stage in the client's pipeline view.
#[derive(Clone, Debug)]
pub struct Stage {
    /// Stable stage identifier, e.g. `verifying_claims`.
    pub id: String,
    /// Wire step ids that complete this stage.
    pub steps: Vec<String>,
    /// Stages set in-progress when this one completes. Join stages are
    /// never listed here; they advance through `join_predecessors`.
    pub successors: Vec<String>,
    /// Non-empty marks this stage as a join: it goes in-progress only when
    /// every listed stage is done.
    pub join_predecessors: Vec<String>,
}

impl Stage {
    pub fn is_join(&self) -> bool {
        !self.join_predecessors.is_empty()
    }
}

/// Ordered set of stages making up the client's pipeline view.
#[derive(Clone, Debug, Default)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// The fact-check pipeline: preprocessing fans out to claim extraction
    /// and bias detection; verification follows extraction; the report is
    /// a join over verification and bias detection.
    #[must_use]
    pub fn fact_check() -> Self {
        Self::new(vec![
            Stage {
                id: "preprocessing".to_string(),
                steps: vec!["preprocess".to_string()],
                successors: vec![
                    "extracting_claims".to_string(),
                    "detecting_biases".to_string(),
                ],
                join_predecessors: Vec::new(),
            },
            Stage {
                id: "extracting_claims".to_string(),
                steps: vec!["extract_claims".to_string()],
                successors: vec!["verifying_claims".to_string()],
                join_predecessors: Vec::new(),
            },
            Stage {
                id: "detecting_biases".to_string(),
                steps: vec!["detect_biases".to_string()],
                successors: Vec::new(),
                join_predecessors: Vec::new(),
            },
            Stage {
                id: "verifying_claims".to_string(),
                steps: vec![
                    "verify_claims_web".to_string(),
                    "verify_claims_llm".to_string(),
                ],
                successors: Vec::new(),
                join_predecessors: Vec::new(),
            },
            Stage {
                id: "generating_report".to_string(),
                steps: vec!["report".to_string()],
                successors: Vec::new(),
                join_predecessors: vec![
                    "verifying_claims".to_string(),
                    "detecting_biases".to_string(),
                ],
            },
        ])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn stage_for_step(&self, step: &str) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|s| s.steps.iter().any(|id| id == step))
    }

    fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }
}

/// Monotonic stage-status state machine.
#[derive(Clone, Debug)]
pub struct ProgressBoard {
    plan: StagePlan,
    statuses: FxHashMap<String, StageStatus>,
}

impl ProgressBoard {
    pub fn new(plan: StagePlan) -> Self {
        let statuses = plan
            .stages()
            .iter()
            .map(|s| (s.id.clone(), StageStatus::Todo))
            .collect();
        Self { plan, statuses }
    }

    /// Mark entry stages in-progress. An entry stage is any non-join stage
    /// nobody lists as a successor.
    pub fn begin(&mut self) {
        let entries: Vec<String> = self
            .plan
            .stages()
            .iter()
            .filter(|s| {
                !s.is_join()
                    && !self
                        .plan
                        .stages()
                        .iter()
                        .any(|other| other.successors.contains(&s.id))
            })
            .map(|s| s.id.clone())
            .collect();
        for id in entries {
            self.advance(&id, StageStatus::InProgress);
        }
    }

    pub fn status(&self, stage_id: &str) -> Option<StageStatus> {
        self.statuses.get(stage_id).copied()
    }

    /// All stages reached `Done`.
    pub fn all_done(&self) -> bool {
        self.statuses.values().all(|s| *s == StageStatus::Done)
    }

    /// Fold one wire message into the board.
    pub fn apply(&mut self, message: &WireMessage) {
        match message {
            WireMessage::Update { step, .. } => {
                let Some(stage) = self.plan.stage_for_step(step) else {
                    return;
                };
                let stage_id = stage.id.clone();
                let successors = stage.successors.clone();
                self.advance(&stage_id, StageStatus::Done);
                for succ in successors {
                    self.advance(&succ, StageStatus::InProgress);
                }
                self.reevaluate_joins();
            }
            WireMessage::Error { .. } => {
                // A failed run leaves whatever was in flight marked errored.
                let in_flight: Vec<String> = self
                    .statuses
                    .iter()
                    .filter(|(_, s)| **s == StageStatus::InProgress)
                    .map(|(id, _)| id.clone())
                    .collect();
                for id in in_flight {
                    self.statuses.insert(id, StageStatus::Error);
                }
            }
            WireMessage::Complete => {
                // The engine can finish without an update for every step: a
                // recovered failure contributes nothing, and a routed branch
                // can bypass a stage entirely. Completion settles whatever
                // is still in flight.
                let in_flight: Vec<String> = self
                    .statuses
                    .iter()
                    .filter(|(_, s)| **s == StageStatus::InProgress)
                    .map(|(id, _)| id.clone())
                    .collect();
                for id in in_flight {
                    self.advance(&id, StageStatus::Done);
                }
                self.reevaluate_joins();
            }
            WireMessage::Token { .. } => {}
        }
    }

    /// Raise a stage's status; never regress.
    fn advance(&mut self, stage_id: &str, to: StageStatus) {
        if let Some(current) = self.statuses.get_mut(stage_id)
            && to > *current
        {
            *current = to;
        }
    }

    /// A join goes in-progress exactly when every predecessor stage is
    /// done. Run to fixpoint so chained joins cascade.
    fn reevaluate_joins(&mut self) {
        loop {
            let mut changed = false;
            let joins: Vec<(String, Vec<String>)> = self
                .plan
                .stages()
                .iter()
                .filter(|s| s.is_join())
                .map(|s| (s.id.clone(), s.join_predecessors.clone()))
                .collect();
            for (id, preds) in joins {
                if self.status(&id) != Some(StageStatus::Todo) {
                    continue;
                }
                let ready = preds.iter().all(|p| {
                    self.plan.stage(p).is_none()
                        || self.status(p) == Some(StageStatus::Done)
                });
                if ready {
                    self.advance(&id, StageStatus::InProgress);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::UpdatePayload;

    fn update(step: &str) -> WireMessage {
        WireMessage::Update {
            step: step.to_string(),
            payload: UpdatePayload::Report {
                report: String::new(),
            },
        }
    }

    #[test]
    fn join_stage_waits_for_all_predecessors_either_order() {
        for order in [
            ["verify_claims_llm", "detect_biases"],
            ["detect_biases", "verify_claims_llm"],
        ] {
            let mut board = ProgressBoard::new(StagePlan::fact_check());
            board.begin();
            board.apply(&update("preprocess"));
            board.apply(&update("extract_claims"));
            board.apply(&update(order[0]));
            assert_eq!(
                board.status("generating_report"),
                Some(StageStatus::Todo),
                "join advanced with only one predecessor done"
            );
            board.apply(&update(order[1]));
            assert_eq!(
                board.status("generating_report"),
                Some(StageStatus::InProgress)
            );
        }
    }

    #[test]
    fn statuses_never_regress() {
        let mut board = ProgressBoard::new(StagePlan::fact_check());
        board.begin();
        board.apply(&update("preprocess"));
        assert_eq!(board.status("preprocessing"), Some(StageStatus::Done));
        // A duplicate or late in-progress signal must not undo done.
        board.apply(&update("preprocess"));
        assert_eq!(board.status("preprocessing"), Some(StageStatus::Done));
    }

    #[test]
    fn error_marks_in_flight_stages() {
        let mut board = ProgressBoard::new(StagePlan::fact_check());
        board.begin();
        board.apply(&update("preprocess"));
        board.apply(&WireMessage::Error {
            error: "boom".to_string(),
        });
        assert_eq!(board.status("extracting_claims"), Some(StageStatus::Error));
        assert_eq!(board.status("preprocessing"), Some(StageStatus::Done));
    }

    #[test]
    fn shortcut_run_completes_join_directly() {
        // No claims: report update arrives without verification ever done.
        let mut board = ProgressBoard::new(StagePlan::fact_check());
        board.begin();
        board.apply(&update("preprocess"));
        board.apply(&update("extract_claims"));
        board.apply(&update("detect_biases"));
        board.apply(&update("report"));
        assert_eq!(board.status("generating_report"), Some(StageStatus::Done));
        // Verification never ran; completion settles it.
        board.apply(&WireMessage::Complete);
        assert_eq!(board.status("verifying_claims"), Some(StageStatus::Done));
        assert!(board.all_done());
    }

    #[test]
    fn complete_settles_stages_without_an_update() {
        // A recovered step failure contributes no update for its stage, so
        // the terminal completion is what finishes the board.
        let mut board = ProgressBoard::new(StagePlan::fact_check());
        board.begin();
        board.apply(&update("preprocess"));
        board.apply(&update("extract_claims"));
        board.apply(&update("verify_claims_llm"));
        board.apply(&update("report"));
        assert_eq!(
            board.status("detecting_biases"),
            Some(StageStatus::InProgress)
        );
        assert!(!board.all_done());
        board.apply(&WireMessage::Complete);
        assert_eq!(board.status("detecting_biases"), Some(StageStatus::Done));
        assert!(board.all_done());
    }
}
