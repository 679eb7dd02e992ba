//! Batch results and their summary statistics.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ClassificationMethod, CommitClassification};

/// Summary of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Commits classified. Counts inputs, so a hash repeated in the batch
    /// counts once per occurrence.
    pub total_commits: usize,
    /// How many classifications each method produced.
    pub method_counts: BTreeMap<ClassificationMethod, usize>,
    /// Non-skipped classifications below the confidence threshold.
    pub low_confidence_count: usize,
    /// Hashes of those commits, in input order.
    pub low_confidence_commits: Vec<String>,
    /// Mean confidence over every classification, 0 for an empty batch.
    pub average_confidence: f64,
}

/// Output of [`Classifier::analyze_all`](super::Classifier::analyze_all).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Classification per commit hash. A repeated hash keeps its last
    /// classification.
    pub classifications: HashMap<String, CommitClassification>,
    /// Batch statistics over `classifications`.
    pub stats: AnalysisStats,
    /// Whether the batch stopped early. When set, `classifications` holds
    /// only the commits finished before cancellation.
    pub cancelled: bool,
}

impl AnalysisResult {
    /// Classification for a commit hash.
    pub fn get(&self, hash: &str) -> Option<&CommitClassification> {
        self.classifications.get(hash)
    }
}

/// Running totals, folded one classification at a time.
#[derive(Debug)]
pub(super) struct StatsAccumulator {
    min_confidence: f64,
    confidence_sum: f64,
    result: AnalysisResult,
}

impl StatsAccumulator {
    pub(super) fn new(min_confidence: f64) -> Self {
        Self {
            min_confidence,
            confidence_sum: 0.0,
            result: AnalysisResult::default(),
        }
    }

    pub(super) fn record(&mut self, classification: CommitClassification) {
        let stats = &mut self.result.stats;
        stats.total_commits += 1;
        *stats.method_counts.entry(classification.method).or_default() += 1;
        self.confidence_sum += classification.confidence;

        if !classification.is_skipped() && classification.confidence < self.min_confidence {
            stats.low_confidence_count += 1;
            stats
                .low_confidence_commits
                .push(classification.commit_hash.clone());
        }

        let hash = classification.commit_hash.clone();
        if self
            .result
            .classifications
            .insert(hash.clone(), classification)
            .is_some()
        {
            warn!(%hash, "duplicate commit hash in batch, keeping the later classification");
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(super) fn finish(mut self, cancelled: bool) -> AnalysisResult {
        let total = self.result.stats.total_commits;
        self.result.stats.average_confidence = if total == 0 {
            0.0
        } else {
            self.confidence_sum / total as f64
        };
        self.result.cancelled = cancelled;
        self.result
    }
}
