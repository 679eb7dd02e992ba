//! Release decisions over parsed commits.
//!
//! Reduces a set of [`ParsedCommit`]s to the semver bump they require
//! ([`determine_release_type`]) and groups them for changelog rendering
//! ([`categorize`]).

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conventional::{CommitType, ParsedCommit};

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver: {0}")]
    InvalidSemver(#[from] semver::Error),

    /// The bumped component does not fit in a `u64`.
    #[error("cannot apply a {release} bump to {version}: version component overflows")]
    Overflow {
        /// Version being bumped.
        version: Version,
        /// Requested bump.
        release: ReleaseType,
    },
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Semver bump level required by a set of commits.
///
/// Variants are declared in priority order, so `Ord` agrees with
/// [`priority`](Self::priority).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    /// Nothing to release.
    #[default]
    None,
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl ReleaseType {
    /// Numeric priority: Major=3, Minor=2, Patch=1, None=0.
    pub const fn priority(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Patch => 1,
            Self::Minor => 2,
            Self::Major => 3,
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// Required bump for a set of commits.
///
/// Major if anything is breaking, else Minor for any `feat`, else Patch for
/// any `fix`/`perf`. Any other non-empty set still yields Patch; only an
/// empty set yields [`ReleaseType::None`].
pub fn determine_release_type(commits: &[ParsedCommit]) -> ReleaseType {
    if commits.is_empty() {
        return ReleaseType::None;
    }
    if commits.iter().any(|c| c.breaking) {
        return ReleaseType::Major;
    }
    if commits.iter().any(|c| c.commit_type == CommitType::Feat) {
        return ReleaseType::Minor;
    }
    ReleaseType::Patch
}

/// Highest-priority release type among several decisions.
pub fn max_release_type(types: impl IntoIterator<Item = ReleaseType>) -> ReleaseType {
    types
        .into_iter()
        .max_by_key(|t| t.priority())
        .unwrap_or_default()
}

/// Compute the next version by applying a release type.
///
/// [`ReleaseType::None`] returns the current version unchanged. Fails with
/// [`VersionError::Overflow`] when the bumped component is already `u64::MAX`.
pub fn next_version(current: &Version, release: ReleaseType) -> VersionResult<Version> {
    let bumped = match release {
        ReleaseType::None => Some(current.clone()),
        ReleaseType::Patch => current
            .patch
            .checked_add(1)
            .map(|patch| Version::new(current.major, current.minor, patch)),
        ReleaseType::Minor => current
            .minor
            .checked_add(1)
            .map(|minor| Version::new(current.major, minor, 0)),
        ReleaseType::Major => current
            .major
            .checked_add(1)
            .map(|major| Version::new(major, 0, 0)),
    };
    bumped.ok_or_else(|| VersionError::Overflow {
        version: current.clone(),
        release,
    })
}

/// Parse a version string, stripping an optional `v` prefix.
pub fn parse_version(s: &str) -> VersionResult<Version> {
    let s = s.strip_prefix('v').unwrap_or(s);
    Ok(Version::parse(s)?)
}

// ──────────────────────────────────────────────
// Categorization
// ──────────────────────────────────────────────

/// Commits grouped for changelog rendering.
///
/// Each commit lands in exactly one type bucket. `breaking` is independent of
/// the type buckets, and `all` keeps every commit in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedChanges {
    /// `feat` commits.
    pub features: Vec<ParsedCommit>,
    /// `fix` commits.
    pub fixes: Vec<ParsedCommit>,
    /// `perf` commits.
    pub performance: Vec<ParsedCommit>,
    /// `docs` commits.
    pub documentation: Vec<ParsedCommit>,
    /// `refactor` commits.
    pub refactoring: Vec<ParsedCommit>,
    /// Breaking commits, whatever their type.
    pub breaking: Vec<ParsedCommit>,
    /// Everything else, including non-conventional commits.
    pub other: Vec<ParsedCommit>,
    /// Every commit, in input order.
    pub all: Vec<ParsedCommit>,
}

impl CategorizedChanges {
    /// Number of commits categorized.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Whether no commits were categorized.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Partition commits into changelog buckets in a single pass.
pub fn categorize(commits: &[ParsedCommit]) -> CategorizedChanges {
    let mut changes = CategorizedChanges::default();
    for commit in commits {
        let bucket = match commit.commit_type {
            CommitType::Feat => &mut changes.features,
            CommitType::Fix => &mut changes.fixes,
            CommitType::Perf => &mut changes.performance,
            CommitType::Docs => &mut changes.documentation,
            CommitType::Refactor => &mut changes.refactoring,
            _ => &mut changes.other,
        };
        bucket.push(commit.clone());
        if commit.breaking {
            changes.breaking.push(commit.clone());
        }
        changes.all.push(commit.clone());
    }
    changes
}
