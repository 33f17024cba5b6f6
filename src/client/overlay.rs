//! Annotation overlays: anchoring findings onto text and resolving
//! overlapping ranges into display fragments.
//!
//! Findings quote the text they refer to; [`anchor_annotations`] locates
//! each quote by substring search and drops anything it cannot find, with
//! a warning (a mismatched quote must never break rendering). [`resolve`]
//! then runs a sweep over the annotated ranges' endpoints, cutting the
//! text into fragments that each carry the full set of annotations
//! covering them. Overlapping findings simply stack on the shared
//! fragment.

use std::collections::BTreeSet;
use tracing::warn;

use crate::payloads::{Bias, Verdict, VerifiedClaim};

/// What an annotation says about its range.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationBody {
    Bias(Bias),
    Claim(VerifiedClaim),
}

impl AnnotationBody {
    fn rank(&self) -> u8 {
        match self {
            AnnotationBody::Bias(_) => 0,
            AnnotationBody::Claim(_) => 1,
        }
    }

    fn content(&self) -> &str {
        match self {
            AnnotationBody::Bias(b) => &b.content,
            AnnotationBody::Claim(c) => &c.content,
        }
    }
}

/// A finding anchored to a half-open byte range `[start, end)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub start: usize,
    pub end: usize,
    pub body: AnnotationBody,
}

impl Annotation {
    pub fn is_bias(&self) -> bool {
        matches!(self.body, AnnotationBody::Bias(_))
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match &self.body {
            AnnotationBody::Claim(c) => Some(c.verdict),
            AnnotationBody::Bias(_) => None,
        }
    }
}

/// A contiguous piece of the source text with the annotations covering it.
///
/// Fragments partition the text exactly: concatenating their `text` fields
/// reproduces the input.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
    /// Annotations covering this fragment, with their ranges clamped to
    /// the text. Never out of range.
    pub annotations: Vec<Annotation>,
}

impl Fragment<'_> {
    pub fn has_bias(&self) -> bool {
        self.annotations.iter().any(|a| a.is_bias())
    }

    pub fn verdicts(&self) -> Vec<Verdict> {
        self.annotations.iter().filter_map(|a| a.verdict()).collect()
    }
}

/// Anchor findings onto `text` by locating their quoted content.
///
/// A finding whose quote does not occur in the text is dropped with a
/// warning; everything else becomes an [`Annotation`] at the first match.
pub fn anchor_annotations(
    text: &str,
    biases: &[Bias],
    claims: &[VerifiedClaim],
) -> Vec<Annotation> {
    let mut annotations = Vec::with_capacity(biases.len() + claims.len());
    for bias in biases {
        match text.find(&bias.content) {
            Some(start) => annotations.push(Annotation {
                start,
                end: start + bias.content.len(),
                body: AnnotationBody::Bias(bias.clone()),
            }),
            None => warn!(
                segment = %bias.segment_id,
                content = %bias.content,
                "bias quote not found in segment; dropping annotation"
            ),
        }
    }
    for claim in claims {
        match text.find(&claim.content) {
            Some(start) => annotations.push(Annotation {
                start,
                end: start + claim.content.len(),
                body: AnnotationBody::Claim(claim.clone()),
            }),
            None => warn!(
                segment = %claim.segment_id,
                content = %claim.content,
                "claim quote not found in segment; dropping annotation"
            ),
        }
    }
    annotations
}

/// Cut `text` into fragments at every annotation boundary.
///
/// Each fragment `[a, b)` carries every annotation with
/// `start < b && end > a`. The output is deterministic for a given
/// annotation set regardless of input order; invalid annotations (empty
/// after clamping to the text, or off a UTF-8 boundary) are dropped with a
/// warning.
pub fn resolve<'a>(text: &'a str, annotations: &[Annotation]) -> Vec<Fragment<'a>> {
    // Clamp once up front; fragments only ever expose in-range spans.
    let mut valid: Vec<Annotation> = Vec::with_capacity(annotations.len());
    let mut cuts: BTreeSet<usize> = BTreeSet::new();
    cuts.insert(0);
    cuts.insert(text.len());
    for ann in annotations {
        let start = ann.start.min(text.len());
        let end = ann.end.min(text.len());
        if start >= end {
            warn!(start = ann.start, end = ann.end, "dropping empty annotation range");
            continue;
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            warn!(start, end, "dropping annotation off a character boundary");
            continue;
        }
        cuts.insert(start);
        cuts.insert(end);
        valid.push(Annotation {
            start,
            end,
            body: ann.body.clone(),
        });
    }

    // Stable, input-order-independent annotation ordering per fragment.
    valid.sort_by(|a, b| {
        (a.start, a.end, a.body.rank(), a.body.content())
            .cmp(&(b.start, b.end, b.body.rank(), b.body.content()))
    });

    let offsets: Vec<usize> = cuts.into_iter().collect();
    let mut fragments = Vec::with_capacity(offsets.len().saturating_sub(1));
    for pair in offsets.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a == b {
            continue;
        }
        let covering: Vec<Annotation> = valid
            .iter()
            .filter(|ann| ann.start < b && ann.end > a)
            .cloned()
            .collect();
        fragments.push(Fragment {
            text: &text[a..b],
            start: a,
            end: b,
            annotations: covering,
        });
    }
    if fragments.is_empty() && text.is_empty() {
        // Empty text still renders as one empty, unannotated fragment.
        fragments.push(Fragment {
            text,
            start: 0,
            end: 0,
            annotations: Vec::new(),
        });
    }
    fragments
}
