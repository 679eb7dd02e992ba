//! Static-analysis stage: per-file AST analysis merged into one classification.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::collaborators::{AnalyzerRegistry, AstAnalysis, Language};
use super::{ClassificationMethod, CommitClassification};
use crate::commit::CommitInfo;
use crate::conventional::CommitType;

/// Reasoning used when no exported symbol changed.
const NO_API_CHANGES: &str = "no public API changes detected";

/// Analyses from several files folded together.
///
/// Symbol and reason lists are concatenated as-is, so a symbol touched in two
/// files shows up twice.
#[derive(Debug, Default)]
struct MergedAnalysis {
    added_exports: Vec<String>,
    removed_exports: Vec<String>,
    modified_exports: Vec<String>,
    breaking_changes: Vec<String>,
    is_breaking: bool,
    /// Suggested type and confidence of the most confident file so far.
    adopted: Option<(Option<CommitType>, f64)>,
}

impl MergedAnalysis {
    fn absorb(&mut self, analysis: AstAnalysis) {
        self.added_exports.extend(analysis.added_exports);
        self.removed_exports.extend(analysis.removed_exports);
        self.modified_exports.extend(analysis.modified_exports);
        self.breaking_changes.extend(analysis.breaking_changes);
        self.is_breaking |= analysis.is_breaking;

        if self
            .adopted
            .is_none_or(|(_, confidence)| analysis.confidence > confidence)
        {
            self.adopted = Some((analysis.suggested_type, analysis.confidence));
        }
    }

    fn reasoning(&self) -> String {
        let parts: Vec<String> = [
            ("added exports", &self.added_exports),
            ("removed exports", &self.removed_exports),
            ("modified exports", &self.modified_exports),
        ]
        .into_iter()
        .filter(|(_, symbols)| !symbols.is_empty())
        .map(|(label, symbols)| format!("{label}: {}", symbols.join(", ")))
        .collect();

        if parts.is_empty() {
            NO_API_CHANGES.to_string()
        } else {
            parts.join("; ")
        }
    }

    fn into_classification(self, hash: &str) -> CommitClassification {
        let reasoning = self.reasoning();
        let (suggested, confidence) = self.adopted.unwrap_or_default();
        let commit_type = suggested
            .filter(|t| !t.is_unknown())
            .unwrap_or(CommitType::Refactor);

        let mut classification =
            CommitClassification::new(hash, commit_type, ClassificationMethod::Ast, confidence)
                .with_reasoning(reasoning);
        if self.is_breaking {
            classification.is_breaking = true;
            classification.breaking_reason =
                (!self.breaking_changes.is_empty()).then(|| self.breaking_changes.join("; "));
        }
        classification
    }
}

/// Run every applicable analyzer over the commit's file diffs.
///
/// Files are skipped when their language is unknown, not in `languages`
/// (compared case-insensitively), or not claimed by a registered analyzer.
/// Analyzer errors are logged and the file is ignored. Returns `None` if no
/// file produced an analysis.
pub(super) fn classify(
    registry: &AnalyzerRegistry,
    languages: &[String],
    cancel: &CancellationToken,
    commit: &CommitInfo,
) -> Option<CommitClassification> {
    let mut merged: Option<MergedAnalysis> = None;

    for diff in &commit.file_diffs {
        if cancel.is_cancelled() {
            debug!(hash = %commit.hash, "AST stage cancelled");
            break;
        }
        let Some(language) = Language::from_path(&diff.path) else {
            continue;
        };
        if !languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language.as_str()))
        {
            continue;
        }
        let Some(analyzer) = registry.get(language) else {
            continue;
        };
        if !analyzer.supports_file(&diff.path) {
            continue;
        }

        match analyzer.analyze(cancel, diff.before_bytes(), diff.after_bytes(), &diff.path) {
            Ok(Some(analysis)) => merged.get_or_insert_with(MergedAnalysis::default).absorb(analysis),
            Ok(None) => {}
            Err(e) => warn!(path = %diff.path, %language, error = %e, "AST analysis failed"),
        }
    }

    merged.map(|m| m.into_classification(&commit.hash))
}
