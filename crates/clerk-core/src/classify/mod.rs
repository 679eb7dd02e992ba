//! Commit classification through the escalation cascade.
//!
//! A [`Classifier`] runs each commit through increasingly expensive stages
//! and stops at the first confident answer:
//!
//! 1. **Conventional**: the message parses as a conventional commit.
//!    Always tried, always final (confidence 1.0).
//! 2. **Heuristic**: a [`HeuristicsAnalyzer`], if configured.
//! 3. **AST**: registered [`AstAnalyzer`]s over the commit's file diffs.
//! 4. **AI**: an [`AiClassifier`], if configured. Failures are absorbed.
//!
//! A stage result at or above `min_confidence` ends the cascade, as does any
//! skip decision. Otherwise the most confident result wins, with the earlier
//! stage taking ties. If nothing produced a result the commit gets a
//! zero-confidence placeholder.
//!
//! # Example
//!
//! ```
//! use clerk_core::classify::{ClassificationMethod, Classifier, ClassifierConfig};
//! use clerk_core::commit::CommitInfo;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let classifier = Classifier::builder(ClassifierConfig::default()).build().unwrap();
//! let commit = CommitInfo::new("a1b2c3", "fix(parser): handle empty input");
//! let result = classifier.analyze(&CancellationToken::new(), &commit).await.unwrap();
//! assert_eq!(result.method, ClassificationMethod::Conventional);
//! assert_eq!(result.confidence, 1.0);
//! # });
//! ```

mod ast;
pub mod collaborators;
mod escalation;
mod stats;

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use collaborators::{
    AiClassifier, AiError, AiFuture, AiResult, AnalyzerRegistry, AstAnalysis, AstAnalyzer,
    AstError, CustomKeywords, HeuristicsAnalyzer, Language,
};
pub use stats::{AnalysisResult, AnalysisStats};

use crate::commit::CommitInfo;
use crate::conventional::{self, CommitType, ParseOptions, ParsedCommit};
use escalation::Escalation;
use stats::StatsAccumulator;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from classifier construction and batch runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    /// `min_confidence` is NaN or outside [0, 1].
    #[error("min_confidence must be within [0, 1], got {0}")]
    InvalidMinConfidence(f64),

    /// `concurrency` is zero.
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
}

/// Result alias for classification operations.
pub type ClassifyResult<T> = Result<T, ClassifyError>;

// ──────────────────────────────────────────────
// Types
// ──────────────────────────────────────────────

/// Which stage produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    /// The message is a conventional commit.
    Conventional,
    /// Keyword and path heuristics.
    Heuristic,
    /// Static analysis of changed source files.
    Ast,
    /// An AI backend.
    Ai,
    /// A collaborator decided the commit should not appear in release output.
    Skipped,
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conventional => write!(f, "conventional"),
            Self::Heuristic => write!(f, "heuristic"),
            Self::Ast => write!(f, "ast"),
            Self::Ai => write!(f, "ai"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// The classifier's verdict for one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitClassification {
    /// Hash of the classified commit.
    pub commit_hash: String,
    /// Assigned type.
    #[serde(rename = "type")]
    pub commit_type: CommitType,
    /// Assigned scope.
    pub scope: Option<String>,
    /// Certainty in [0, 1].
    pub confidence: f64,
    /// Stage that produced this result.
    pub method: ClassificationMethod,
    /// Human-readable explanation.
    pub reasoning: String,
    /// Whether the commit breaks compatibility.
    pub is_breaking: bool,
    /// Why it breaks compatibility.
    pub breaking_reason: Option<String>,
    /// Whether the commit should be left out of release output.
    pub should_skip: bool,
    /// Why it should be left out.
    pub skip_reason: Option<String>,
}

impl CommitClassification {
    /// Create a classification. `confidence` is clamped to [0, 1].
    pub fn new(
        commit_hash: impl Into<String>,
        commit_type: CommitType,
        method: ClassificationMethod,
        confidence: f64,
    ) -> Self {
        Self {
            commit_hash: commit_hash.into(),
            commit_type,
            scope: None,
            confidence: clamp_confidence(confidence),
            method,
            reasoning: String::new(),
            is_breaking: false,
            breaking_reason: None,
            should_skip: false,
            skip_reason: None,
        }
    }

    /// A skip decision. Skips are final whatever their confidence.
    pub fn skipped(commit_hash: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            should_skip: true,
            skip_reason: Some(reason.clone()),
            reasoning: reason,
            ..Self::new(
                commit_hash,
                CommitType::Unknown,
                ClassificationMethod::Skipped,
                1.0,
            )
        }
    }

    /// Set the scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the reasoning.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Mark as breaking.
    pub fn with_breaking(mut self, reason: impl Into<String>) -> Self {
        self.is_breaking = true;
        self.breaking_reason = Some(reason.into());
        self
    }

    /// Whether this is a skip decision.
    pub fn is_skipped(&self) -> bool {
        self.method == ClassificationMethod::Skipped
    }

    /// Clamp confidence into [0, 1] (NaN becomes 0).
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.confidence = clamp_confidence(self.confidence);
        self
    }

    fn from_conventional(hash: &str, parsed: ParsedCommit) -> Self {
        let mut classification = Self::new(
            hash,
            parsed.commit_type,
            ClassificationMethod::Conventional,
            1.0,
        )
        .with_reasoning("conventional commit format");
        classification.scope = parsed.scope;
        if parsed.breaking {
            classification.is_breaking = true;
            classification.breaking_reason = parsed
                .breaking_description
                .or_else(|| Some("breaking change marker in subject".into()));
        }
        classification
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Classifier settings. Lives in the `[classifier]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Run the heuristics stage.
    pub enable_heuristics: bool,
    /// Run the AST stage.
    pub enable_ast: bool,
    /// Run the AI stage.
    pub enable_ai: bool,
    /// Confidence at which the cascade stops.
    pub min_confidence: f64,
    /// Extra keywords per type, passed to the heuristics analyzer.
    pub custom_keywords: CustomKeywords,
    /// Languages the AST stage may analyze.
    pub languages: Vec<String>,
    /// Commits classified concurrently by [`Classifier::analyze_all`].
    pub concurrency: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enable_heuristics: true,
            enable_ast: true,
            enable_ai: false,
            min_confidence: 0.7,
            custom_keywords: CustomKeywords::new(),
            languages: vec!["go".into(), "typescript".into(), "python".into()],
            concurrency: 1,
        }
    }
}

impl ClassifierConfig {
    /// Check the numeric settings.
    pub fn validate(&self) -> ClassifyResult<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ClassifyError::InvalidMinConfidence(self.min_confidence));
        }
        if self.concurrency == 0 {
            return Err(ClassifyError::ZeroConcurrency);
        }
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Builder
// ──────────────────────────────────────────────

/// Assembles a [`Classifier`] from config and optional collaborators.
#[derive(Debug)]
pub struct ClassifierBuilder {
    config: ClassifierConfig,
    heuristics: Option<Arc<dyn HeuristicsAnalyzer>>,
    analyzers: AnalyzerRegistry,
    ai: Option<Arc<dyn AiClassifier>>,
}

impl ClassifierBuilder {
    /// Use a heuristics analyzer.
    #[must_use]
    pub fn with_heuristics(mut self, analyzer: impl HeuristicsAnalyzer + 'static) -> Self {
        self.heuristics = Some(Arc::new(analyzer));
        self
    }

    /// Register an AST analyzer for a language.
    #[must_use]
    pub fn with_ast_analyzer(
        mut self,
        language: Language,
        analyzer: impl AstAnalyzer + 'static,
    ) -> Self {
        self.analyzers.register(language, Arc::new(analyzer));
        self
    }

    /// Replace the AST registry wholesale.
    #[must_use]
    pub fn with_analyzer_registry(mut self, registry: AnalyzerRegistry) -> Self {
        self.analyzers = registry;
        self
    }

    /// Use an AI classifier.
    #[must_use]
    pub fn with_ai_classifier(mut self, classifier: impl AiClassifier + 'static) -> Self {
        self.ai = Some(Arc::new(classifier));
        self
    }

    /// Validate the config and build.
    pub fn build(self) -> ClassifyResult<Classifier> {
        self.config.validate()?;
        Ok(Classifier {
            config: self.config,
            heuristics: self.heuristics,
            analyzers: self.analyzers,
            ai: self.ai,
        })
    }
}

impl fmt::Debug for dyn HeuristicsAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HeuristicsAnalyzer")
    }
}

impl fmt::Debug for dyn AiClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AiClassifier")
    }
}

// ──────────────────────────────────────────────
// Classifier
// ──────────────────────────────────────────────

/// Runs the escalation cascade. Cheap to share; holds no per-call state.
#[derive(Debug)]
pub struct Classifier {
    config: ClassifierConfig,
    heuristics: Option<Arc<dyn HeuristicsAnalyzer>>,
    analyzers: AnalyzerRegistry,
    ai: Option<Arc<dyn AiClassifier>>,
}

impl Classifier {
    /// Start building a classifier.
    pub fn builder(config: ClassifierConfig) -> ClassifierBuilder {
        ClassifierBuilder {
            config,
            heuristics: None,
            analyzers: AnalyzerRegistry::new(),
            ai: None,
        }
    }

    /// The active configuration.
    pub const fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one commit.
    ///
    /// Collaborator failures never surface here; they are logged and the
    /// cascade moves on.
    #[instrument(skip_all, fields(hash = %commit.hash))]
    pub async fn analyze(
        &self,
        cancel: &CancellationToken,
        commit: &CommitInfo,
    ) -> ClassifyResult<CommitClassification> {
        if let Some(classification) = self.conventional_stage(commit) {
            debug!(commit_type = %classification.commit_type, "conventional commit");
            return Ok(classification);
        }

        let mut escalation = Escalation::new(self.config.min_confidence);

        if let ControlFlow::Break(decided) = escalation.offer(self.heuristic_stage(commit)) {
            return Ok(decided_by(decided));
        }
        if let ControlFlow::Break(decided) = escalation.offer(self.ast_stage(cancel, commit)) {
            return Ok(decided_by(decided));
        }
        if let ControlFlow::Break(decided) = escalation.offer(self.ai_stage(cancel, commit).await)
        {
            return Ok(decided_by(decided));
        }

        let fallback = escalation.finish(&commit.hash);
        debug!(
            method = %fallback.method,
            confidence = fallback.confidence,
            "no stage reached the confidence threshold"
        );
        Ok(fallback)
    }

    /// Classify a batch.
    ///
    /// Commits are classified `concurrency` at a time and folded in input
    /// order. When `cancel` fires, the batch stops and the commits finished so
    /// far are returned with [`AnalysisResult::cancelled`] set.
    #[instrument(skip_all, fields(commits = commits.len()))]
    pub async fn analyze_all(
        &self,
        cancel: &CancellationToken,
        commits: &[CommitInfo],
    ) -> ClassifyResult<AnalysisResult> {
        let mut acc = StatsAccumulator::new(self.config.min_confidence);
        let mut pending = futures::stream::iter(commits)
            .map(|commit| self.analyze(cancel, commit))
            .buffered(self.config.concurrency.max(1));

        let mut cancelled = false;
        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            match pending.next().await {
                Some(classification) => acc.record(classification?),
                None => break,
            }
        }

        let result = acc.finish(cancelled);
        info!(
            total = result.stats.total_commits,
            low_confidence = result.stats.low_confidence_count,
            average_confidence = result.stats.average_confidence,
            cancelled,
            "classified commits"
        );
        Ok(result)
    }

    // ── Stages ──

    fn conventional_stage(&self, commit: &CommitInfo) -> Option<CommitClassification> {
        let options = ParseOptions {
            strict_mode: false,
            parse_references: false,
        };
        conventional::parse_with(&commit.message, options)
            .ok()
            .filter(|parsed| parsed.is_conventional)
            .map(|parsed| CommitClassification::from_conventional(&commit.hash, parsed))
    }

    fn heuristic_stage(&self, commit: &CommitInfo) -> Option<CommitClassification> {
        if !self.config.enable_heuristics {
            return None;
        }
        let heuristics = self.heuristics.as_ref()?;
        let classification = heuristics.classify(commit, &self.config.custom_keywords)?;
        Some(adopt(classification, commit))
    }

    fn ast_stage(
        &self,
        cancel: &CancellationToken,
        commit: &CommitInfo,
    ) -> Option<CommitClassification> {
        if !self.config.enable_ast || self.analyzers.is_empty() {
            return None;
        }
        ast::classify(&self.analyzers, &self.config.languages, cancel, commit)
    }

    async fn ai_stage(
        &self,
        cancel: &CancellationToken,
        commit: &CommitInfo,
    ) -> Option<CommitClassification> {
        if !self.config.enable_ai {
            return None;
        }
        let ai = self.ai.as_ref()?;

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AiError::Cancelled),
            result = ai.classify(cancel, commit) => result,
        };

        match outcome {
            Ok(classification) => classification.map(|c| adopt(c, commit)),
            Err(e) => {
                warn!(error = %e, "AI classification failed, falling back");
                None
            }
        }
    }
}

/// Bring a collaborator result in line with the commit it describes.
fn adopt(classification: CommitClassification, commit: &CommitInfo) -> CommitClassification {
    let mut classification = classification.normalized();
    if classification.commit_hash != commit.hash {
        classification.commit_hash.clone_from(&commit.hash);
    }
    classification
}

fn decided_by(classification: CommitClassification) -> CommitClassification {
    debug!(
        method = %classification.method,
        confidence = classification.confidence,
        commit_type = %classification.commit_type,
        "classified"
    );
    classification
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use camino::Utf8Path;

    use super::*;
    use crate::commit::FileDiff;

    // ── Stub collaborators ──

    struct StubHeuristics {
        result: Option<CommitClassification>,
        calls: Arc<AtomicUsize>,
        seen_keywords: Arc<Mutex<Option<CustomKeywords>>>,
    }

    impl StubHeuristics {
        fn returning(result: Option<CommitClassification>) -> Self {
            Self {
                result,
                calls: Arc::default(),
                seen_keywords: Arc::default(),
            }
        }
    }

    impl HeuristicsAnalyzer for StubHeuristics {
        fn classify(
            &self,
            _commit: &CommitInfo,
            keywords: &CustomKeywords,
        ) -> Option<CommitClassification> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut seen) = self.seen_keywords.lock() {
                *seen = Some(keywords.clone());
            }
            self.result.clone()
        }
    }

    struct StubAst {
        analysis: AstAnalysis,
        calls: Arc<AtomicUsize>,
    }

    impl AstAnalyzer for StubAst {
        fn supports_file(&self, _path: &Utf8Path) -> bool {
            true
        }

        fn analyze(
            &self,
            _cancel: &CancellationToken,
            _before: &[u8],
            _after: &[u8],
            _path: &Utf8Path,
        ) -> Result<Option<AstAnalysis>, AstError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.analysis.clone()))
        }
    }

    struct StubAi {
        result: AiResult<Option<CommitClassification>>,
        calls: Arc<AtomicUsize>,
    }

    impl StubAi {
        fn returning(result: AiResult<Option<CommitClassification>>) -> Self {
            Self {
                result,
                calls: Arc::default(),
            }
        }
    }

    impl AiClassifier for StubAi {
        fn classify<'a>(
            &'a self,
            _cancel: &'a CancellationToken,
            _commit: &'a CommitInfo,
        ) -> AiFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self.result.clone();
            Box::pin(async move { result })
        }
    }

    /// Never finishes; only cancellation gets the stage out.
    struct HangingAi;

    impl AiClassifier for HangingAi {
        fn classify<'a>(
            &'a self,
            _cancel: &'a CancellationToken,
            _commit: &'a CommitInfo,
        ) -> AiFuture<'a> {
            Box::pin(std::future::pending())
        }
    }

    fn heuristic(commit_type: CommitType, confidence: f64) -> CommitClassification {
        CommitClassification::new("", commit_type, ClassificationMethod::Heuristic, confidence)
    }

    fn ai(commit_type: CommitType, confidence: f64) -> CommitClassification {
        CommitClassification::new("", commit_type, ClassificationMethod::Ai, confidence)
    }

    fn go_commit(hash: &str) -> CommitInfo {
        CommitInfo::new(hash, "update handlers")
            .with_file_diff(FileDiff::modified("pkg/api.go", "package api", "package api\n"))
    }

    fn config(min_confidence: f64) -> ClassifierConfig {
        ClassifierConfig {
            min_confidence,
            enable_ai: true,
            ..ClassifierConfig::default()
        }
    }

    // ── Tests ──

    #[tokio::test]
    async fn conventional_short_circuits() {
        let heuristics = StubHeuristics::returning(Some(heuristic(CommitType::Chore, 0.9)));
        let calls = Arc::clone(&heuristics.calls);
        let classifier = Classifier::builder(config(0.7))
            .with_heuristics(heuristics)
            .build()
            .unwrap();

        let commit = CommitInfo::new("abc", "feat(auth)!: add OAuth2 support");
        let result = classifier
            .analyze(&CancellationToken::new(), &commit)
            .await
            .unwrap();

        assert_eq!(result.method, ClassificationMethod::Conventional);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.commit_type, CommitType::Feat);
        assert_eq!(result.scope.as_deref(), Some("auth"));
        assert!(result.is_breaking);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn confident_heuristic_stops_cascade() {
        let ai_stub = StubAi::returning(Ok(Some(ai(CommitType::Feat, 1.0))));
        let ai_calls = Arc::clone(&ai_stub.calls);
        let classifier = Classifier::builder(config(0.7))
            .with_heuristics(StubHeuristics::returning(Some(heuristic(CommitType::Fix, 0.8))))
            .with_ai_classifier(ai_stub)
            .build()
            .unwrap();

        let result = classifier
            .analyze(&CancellationToken::new(), &CommitInfo::new("abc", "patch crash"))
            .await
            .unwrap();
        assert_eq!(result.method, ClassificationMethod::Heuristic);
        assert_eq!(result.commit_type, CommitType::Fix);
        assert_eq!(result.commit_hash, "abc");
        assert_eq!(ai_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn heuristic_skip_is_final() {
        let mut skip = CommitClassification::skipped("", "merge commit");
        skip.confidence = 0.1;
        let ai_stub = StubAi::returning(Ok(Some(ai(CommitType::Feat, 1.0))));
        let ai_calls = Arc::clone(&ai_stub.calls);
        let classifier = Classifier::builder(config(0.9))
            .with_heuristics(StubHeuristics::returning(Some(skip)))
            .with_ai_classifier(ai_stub)
            .build()
            .unwrap();

        let result = classifier
            .analyze(&CancellationToken::new(), &CommitInfo::new("abc", "Merge branch"))
            .await
            .unwrap();
        assert!(result.should_skip);
        assert_eq!(result.method, ClassificationMethod::Skipped);
        assert_eq!(ai_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ast_beats_weak_heuristic() {
        let classifier = Classifier::builder(ClassifierConfig {
            min_confidence: 0.8,
            ..ClassifierConfig::default()
        })
        .with_heuristics(StubHeuristics::returning(Some(heuristic(CommitType::Fix, 0.4))))
        .with_ast_analyzer(
            Language::Go,
            StubAst {
                analysis: AstAnalysis {
                    added_exports: vec!["NewClient".into()],
                    suggested_type: Some(CommitType::Feat),
                    confidence: 0.9,
                    ..AstAnalysis::default()
                },
                calls: Arc::default(),
            },
        )
        .build()
        .unwrap();

        let result = classifier
            .analyze(&CancellationToken::new(), &go_commit("abc"))
            .await
            .unwrap();
        assert_eq!(result.method, ClassificationMethod::Ast);
        assert_eq!(result.commit_type, CommitType::Feat);
        assert_eq!(result.reasoning, "added exports: NewClient");
    }

    #[tokio::test]
    async fn ai_failure_falls_back_to_best_so_far() {
        let classifier = Classifier::builder(config(0.7))
            .with_heuristics(StubHeuristics::returning(Some(heuristic(CommitType::Fix, 0.3))))
            .with_ai_classifier(StubAi::returning(Err(AiError::Backend("boom".into()))))
            .build()
            .unwrap();

        let result = classifier
            .analyze(&CancellationToken::new(), &CommitInfo::new("abc", "tweak"))
            .await
            .unwrap();
        assert_eq!(result.method, ClassificationMethod::Heuristic);
        assert_eq!(result.confidence, 0.3);
    }

    #[tokio::test]
    async fn ai_skip_is_authoritative() {
        let mut skip = CommitClassification::skipped("", "release bot");
        skip.confidence = 0.2;
        let classifier = Classifier::builder(config(0.9))
            .with_heuristics(StubHeuristics::returning(Some(heuristic(CommitType::Fix, 0.5))))
            .with_ai_classifier(StubAi::returning(Ok(Some(skip))))
            .build()
            .unwrap();

        let result = classifier
            .analyze(&CancellationToken::new(), &CommitInfo::new("abc", "bump"))
            .await
            .unwrap();
        assert_eq!(result.method, ClassificationMethod::Skipped);
    }

    #[tokio::test]
    async fn disabled_stages_do_not_run() {
        let heuristics = StubHeuristics::returning(Some(heuristic(CommitType::Fix, 0.9)));
        let h_calls = Arc::clone(&heuristics.calls);
        let ai_stub = StubAi::returning(Ok(Some(ai(CommitType::Feat, 0.9))));
        let ai_calls = Arc::clone(&ai_stub.calls);
        let ast_calls = Arc::new(AtomicUsize::new(0));
        let classifier = Classifier::builder(ClassifierConfig {
            enable_heuristics: false,
            enable_ast: false,
            enable_ai: false,
            ..ClassifierConfig::default()
        })
        .with_heuristics(heuristics)
        .with_ast_analyzer(
            Language::Go,
            StubAst {
                analysis: AstAnalysis::default(),
                calls: Arc::clone(&ast_calls),
            },
        )
        .with_ai_classifier(ai_stub)
        .build()
        .unwrap();

        let result = classifier
            .analyze(&CancellationToken::new(), &go_commit("abc"))
            .await
            .unwrap();
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.reasoning, "unable to classify commit");
        assert_eq!(h_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ast_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ai_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn custom_keywords_reach_heuristics() {
        let heuristics = StubHeuristics::returning(None);
        let seen = Arc::clone(&heuristics.seen_keywords);
        let mut keywords = CustomKeywords::new();
        keywords.insert("feat".into(), vec!["introduce".into()]);
        let classifier = Classifier::builder(ClassifierConfig {
            custom_keywords: keywords.clone(),
            ..ClassifierConfig::default()
        })
        .with_heuristics(heuristics)
        .build()
        .unwrap();

        classifier
            .analyze(&CancellationToken::new(), &CommitInfo::new("abc", "introduce x"))
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().as_ref(), Some(&keywords));
    }

    #[tokio::test]
    async fn out_of_range_collaborator_confidence_is_clamped() {
        let mut wild = heuristic(CommitType::Fix, 0.0);
        wild.confidence = 4.2;
        let classifier = Classifier::builder(config(0.7))
            .with_heuristics(StubHeuristics::returning(Some(wild)))
            .build()
            .unwrap();
        let result = classifier
            .analyze(&CancellationToken::new(), &CommitInfo::new("abc", "x"))
            .await
            .unwrap();
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn cancelled_ai_call_is_absorbed() {
        let cancel = CancellationToken::new();
        let classifier = Classifier::builder(config(0.7))
            .with_heuristics(StubHeuristics::returning(Some(heuristic(CommitType::Docs, 0.2))))
            .with_ai_classifier(HangingAi)
            .build()
            .unwrap();

        let canceller = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::task::yield_now().await;
            canceller.cancel();
        });
        let result = classifier
            .analyze(&cancel, &CommitInfo::new("abc", "misc"))
            .await
            .unwrap();
        handle.await.unwrap();
        assert_eq!(result.method, ClassificationMethod::Heuristic);
    }

    #[tokio::test]
    async fn analyze_is_deterministic() {
        let classifier = Classifier::builder(config(0.9))
            .with_heuristics(StubHeuristics::returning(Some(heuristic(CommitType::Fix, 0.5))))
            .build()
            .unwrap();
        let commit = CommitInfo::new("abc", "tweak");
        let cancel = CancellationToken::new();
        let first = classifier.analyze(&cancel, &commit).await.unwrap();
        let second = classifier.analyze(&cancel, &commit).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn analyze_all_folds_stats_in_order() {
        let classifier = Classifier::builder(ClassifierConfig {
            concurrency: 4,
            ..config(0.7)
        })
        .with_heuristics(StubHeuristics::returning(Some(heuristic(CommitType::Fix, 0.5))))
        .build()
        .unwrap();

        let commits = vec![
            CommitInfo::new("h1", "feat: one"),
            CommitInfo::new("h2", "two"),
            CommitInfo::new("h3", "fix: three"),
            CommitInfo::new("h4", "four"),
        ];
        let result = classifier
            .analyze_all(&CancellationToken::new(), &commits)
            .await
            .unwrap();

        assert!(!result.cancelled);
        assert_eq!(result.stats.total_commits, 4);
        assert_eq!(result.classifications.len(), 4);
        assert_eq!(result.stats.method_counts[&ClassificationMethod::Conventional], 2);
        assert_eq!(result.stats.method_counts[&ClassificationMethod::Heuristic], 2);
        assert_eq!(result.stats.low_confidence_commits, ["h2", "h4"]);
        assert!((result.stats.average_confidence - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn analyze_all_stops_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let classifier = Classifier::builder(ClassifierConfig::default())
            .build()
            .unwrap();
        let commits = vec![CommitInfo::new("h1", "feat: one")];

        let result = classifier.analyze_all(&cancel, &commits).await.unwrap();
        assert!(result.cancelled);
        assert!(result.classifications.is_empty());
        assert_eq!(result.stats.average_confidence, 0.0);
    }

    #[test]
    fn build_rejects_bad_config() {
        let err = Classifier::builder(ClassifierConfig {
            min_confidence: 1.5,
            ..ClassifierConfig::default()
        })
        .build()
        .unwrap_err();
        assert_eq!(err, ClassifyError::InvalidMinConfidence(1.5));

        let err = Classifier::builder(ClassifierConfig {
            min_confidence: f64::NAN,
            ..ClassifierConfig::default()
        })
        .build()
        .unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidMinConfidence(v) if v.is_nan()));

        let err = Classifier::builder(ClassifierConfig {
            concurrency: 0,
            ..ClassifierConfig::default()
        })
        .build()
        .unwrap_err();
        assert_eq!(err, ClassifyError::ZeroConcurrency);
    }

    #[test]
    fn normalized_clamps_and_zeroes_nan() {
        let mut c = heuristic(CommitType::Fix, 0.5);
        c.confidence = f64::NAN;
        assert_eq!(c.normalized().confidence, 0.0);
        let mut c = heuristic(CommitType::Fix, 0.5);
        c.confidence = -3.0;
        assert_eq!(c.normalized().confidence, 0.0);
    }

    #[test]
    fn classification_serializes_type_key() {
        let json = serde_json::to_value(heuristic(CommitType::Perf, 0.5)).unwrap();
        assert_eq!(json["type"], "perf");
        assert_eq!(json["method"], "heuristic");
    }
}
