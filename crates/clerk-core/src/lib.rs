//! Commit classification and change aggregation for clerk.
//!
//! The crate turns raw commits into typed, confidence-scored classifications
//! and reduces sets of parsed commits into release decisions.
//!
//! # Modules
//!
//! - [`commit`] - Input commit data (message, file diffs, stats)
//! - [`conventional`] - Conventional-commit parsing and formatting
//! - [`release`] - Release type, version bumps, changelog buckets
//! - [`filter`] - Predicate-based commit selection
//! - [`classify`] - The escalation cascade and batch statistics
//! - [`resilience`] - Rate limiting, circuit breaking, retries for AI calls
//! - [`config`] - Configuration loading and management
//! - [`observability`] - JSONL structured logging setup
//! - [`error`] - Configuration error types
//!
//! # Quick Start
//!
//! ```
//! use clerk_core::{ReleaseType, determine_release_type, parse};
//!
//! let commits = [
//!     parse("fix: handle empty input").unwrap(),
//!     parse("feat(api)!: drop v1 endpoints").unwrap(),
//! ];
//! assert_eq!(determine_release_type(&commits), ReleaseType::Major);
//! ```
#![deny(unsafe_code)]

pub mod classify;

pub mod commit;

pub mod config;

pub mod conventional;

pub mod error;

pub mod filter;

pub mod observability;

pub mod release;

pub mod resilience;

pub use classify::{
    AnalysisResult, AnalysisStats, ClassificationMethod, Classifier, ClassifierConfig,
    CommitClassification,
};
pub use commit::{CommitInfo, DiffStats, FileDiff};
pub use config::{Config, ConfigLoader, LogLevel};
pub use conventional::{CommitType, ParseOptions, ParsedCommit, format, parse, parse_with};
pub use error::{ConfigError, ConfigResult};
pub use filter::{CommitFilter, FilterOptions, filter};
pub use release::{CategorizedChanges, ReleaseType, categorize, determine_release_type};
pub use resilience::{ResilienceConfig, ResilientClassifier};

// Re-export so callers can build cancellation tokens and versions without
// extra direct dependencies.
pub use semver;
pub use tokio_util::sync::CancellationToken;
