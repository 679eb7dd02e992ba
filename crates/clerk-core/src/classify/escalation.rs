//! Confidence-gated escalation across stages.
//!
//! Each stage result is offered in order. A result at or above the threshold
//! (or a skip decision) ends the cascade; otherwise the most confident result
//! so far is kept as the fallback.

use std::ops::ControlFlow;

use super::{ClassificationMethod, CommitClassification};
use crate::conventional::CommitType;

/// Reasoning attached when no stage produced anything.
pub(super) const UNCLASSIFIED_REASON: &str = "unable to classify commit";

#[derive(Debug)]
pub(super) struct Escalation {
    min_confidence: f64,
    best: Option<CommitClassification>,
}

impl Escalation {
    pub(super) const fn new(min_confidence: f64) -> Self {
        Self {
            min_confidence,
            best: None,
        }
    }

    /// Offer a stage result. `Break` carries the final answer.
    pub(super) fn offer(
        &mut self,
        candidate: Option<CommitClassification>,
    ) -> ControlFlow<CommitClassification> {
        let Some(candidate) = candidate else {
            return ControlFlow::Continue(());
        };
        if candidate.is_skipped() || candidate.confidence >= self.min_confidence {
            return ControlFlow::Break(candidate);
        }
        // Ties keep the earlier (cheaper) stage.
        if self
            .best
            .as_ref()
            .is_none_or(|best| candidate.confidence > best.confidence)
        {
            self.best = Some(candidate);
        }
        ControlFlow::Continue(())
    }

    /// Best sub-threshold result, or a zero-confidence placeholder.
    pub(super) fn finish(self, hash: &str) -> CommitClassification {
        self.best.unwrap_or_else(|| {
            CommitClassification::new(
                hash,
                CommitType::Unknown,
                ClassificationMethod::Heuristic,
                0.0,
            )
            .with_reasoning(UNCLASSIFIED_REASON)
        })
    }
}
