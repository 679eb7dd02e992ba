//! Pluggable analysis capabilities consumed by the [`Classifier`](super::Classifier).
//!
//! None of these are implemented here. Heuristic keyword scoring, per-language
//! AST inspection, and AI completion backends are supplied by the caller and
//! may each be absent.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::CommitClassification;
use crate::commit::CommitInfo;
use crate::conventional::CommitType;

/// User-defined keywords per commit type, handed to the heuristics analyzer as-is.
pub type CustomKeywords = BTreeMap<String, Vec<String>>;

// ──────────────────────────────────────────────
// Heuristics
// ──────────────────────────────────────────────

/// Cheap, synchronous classification from commit text and file paths.
pub trait HeuristicsAnalyzer: Send + Sync {
    /// Classify a commit, or return `None` when there is nothing to go on.
    fn classify(
        &self,
        commit: &CommitInfo,
        keywords: &CustomKeywords,
    ) -> Option<CommitClassification>;
}

// ──────────────────────────────────────────────
// Static analysis
// ──────────────────────────────────────────────

/// Source language of a changed file, as far as AST analysis cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// `.go`
    Go,
    /// `.ts`, `.tsx`, `.js`, `.jsx`
    #[serde(rename = "typescript")]
    TypeScript,
    /// `.py`
    Python,
}

impl Language {
    /// Lowercase tag used in configuration allow-lists.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::TypeScript => "typescript",
            Self::Python => "python",
        }
    }

    /// Language for a path, from its extension.
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        match path.extension()? {
            "go" => Some(Self::Go),
            "ts" | "tsx" | "js" | "jsx" => Some(Self::TypeScript),
            "py" => Some(Self::Python),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an AST analyzer found in one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AstAnalysis {
    /// Exported symbols that are new.
    pub added_exports: Vec<String>,
    /// Exported symbols that disappeared.
    pub removed_exports: Vec<String>,
    /// Exported symbols whose signature changed.
    pub modified_exports: Vec<String>,
    /// Human-readable reasons the change breaks callers.
    pub breaking_changes: Vec<String>,
    /// Whether the change breaks the public API.
    pub is_breaking: bool,
    /// Type the analyzer would give the commit.
    pub suggested_type: Option<CommitType>,
    /// Analyzer confidence in [0, 1].
    pub confidence: f64,
}

/// Failure inside an AST analyzer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AstError {
    /// The analyzer could not process the file.
    #[error("analysis of {path} failed: {message}")]
    Failed {
        /// File being analyzed.
        path: String,
        /// Analyzer message.
        message: String,
    },

    /// The analysis was cancelled.
    #[error("analysis cancelled")]
    Cancelled,
}

/// Per-language static analysis of before/after file content.
pub trait AstAnalyzer: Send + Sync {
    /// Whether this analyzer handles the given path.
    fn supports_file(&self, path: &Utf8Path) -> bool;

    /// Compare the two versions of a file.
    fn analyze(
        &self,
        cancel: &CancellationToken,
        before: &[u8],
        after: &[u8],
        path: &Utf8Path,
    ) -> Result<Option<AstAnalysis>, AstError>;
}

/// AST analyzers keyed by language.
#[derive(Clone, Default)]
pub struct AnalyzerRegistry {
    analyzers: HashMap<Language, Arc<dyn AstAnalyzer>>,
}

impl AnalyzerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the analyzer for a language.
    pub fn register(&mut self, language: Language, analyzer: Arc<dyn AstAnalyzer>) {
        self.analyzers.insert(language, analyzer);
    }

    /// Analyzer for a language, if one is registered.
    pub fn get(&self, language: Language) -> Option<&dyn AstAnalyzer> {
        self.analyzers.get(&language).map(AsRef::as_ref)
    }

    /// Whether no analyzer is registered.
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

impl fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerRegistry")
            .field("languages", &self.analyzers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ──────────────────────────────────────────────
// AI
// ──────────────────────────────────────────────

/// Errors from the AI classification stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AiError {
    /// The backend rejected the request or returned garbage. Not retried.
    #[error("AI backend error: {0}")]
    Backend(String),

    /// A transient failure (timeout, connection reset, 5xx). Retried.
    #[error("transient AI failure: {0}")]
    Transient(String),

    /// Rate limited, locally or by the backend.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// How long to wait before the next attempt.
        retry_after: Duration,
    },

    /// The circuit breaker is open.
    #[error("circuit breaker open")]
    CircuitOpen,

    /// The call was cancelled.
    #[error("AI classification cancelled")]
    Cancelled,

    /// Every retry attempt failed.
    #[error("AI classification failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Message from the final attempt.
        last_error: String,
    },
}

impl AiError {
    /// Whether another attempt could succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited { .. })
    }

    /// Delay requested by the backend, if any.
    pub const fn suggested_backoff(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Result alias for the AI stage.
pub type AiResult<T> = Result<T, AiError>;

/// Boxed future returned by [`AiClassifier::classify`].
pub type AiFuture<'a> =
    Pin<Box<dyn Future<Output = AiResult<Option<CommitClassification>>> + Send + 'a>>;

/// Network-backed classification. The only stage that may suspend.
pub trait AiClassifier: Send + Sync {
    /// Classify a commit. Implementations should stop early when `cancel` fires.
    fn classify<'a>(&'a self, cancel: &'a CancellationToken, commit: &'a CommitInfo)
    -> AiFuture<'a>;
}

impl<T: AiClassifier + ?Sized> AiClassifier for Arc<T> {
    fn classify<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        commit: &'a CommitInfo,
    ) -> AiFuture<'a> {
        (**self).classify(cancel, commit)
    }
}
