//! Client-side reconstruction of a run from its wire stream.
//!
//! Three reducers consume [`WireMessage`](crate::wire::WireMessage)s:
//! [`ProgressBoard`](progress::ProgressBoard) tracks stage statuses,
//! [`Transcript`](transcript::Transcript) accumulates tokens per speaker,
//! and [`overlay`] anchors findings onto text fragments for display.

pub mod overlay;
pub mod progress;
pub mod transcript;

pub use overlay::{anchor_annotations, resolve, Annotation, AnnotationBody, Fragment};
pub use progress::{ProgressBoard, Stage, StagePlan, StageStatus};
pub use transcript::{SpeakerTurn, Transcript};
