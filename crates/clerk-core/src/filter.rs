//! Predicate-based commit selection.
//!
//! [`FilterOptions`] is the serializable form (it lives in the `[filter]`
//! config section). [`CommitFilter`] compiles the allow/deny lists into sets
//! once, then tests each commit against the AND of all active predicates.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conventional::{CommitType, ParsedCommit};

/// Filter criteria. Empty lists and `None` bounds are inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Keep only these types.
    pub types: Vec<CommitType>,
    /// Keep only commits by these authors.
    pub authors: Vec<String>,
    /// Drop commits by these authors.
    pub exclude_authors: Vec<String>,
    /// Keep only commits with one of these scopes.
    pub scopes: Vec<String>,
    /// Drop commits with one of these scopes.
    pub exclude_scopes: Vec<String>,
    /// Keep commits that do not follow the conventional grammar.
    pub include_non_conventional: bool,
    /// Keep only breaking commits.
    pub only_breaking: bool,
    /// Drop commits dated before this instant.
    pub since: Option<DateTime<Utc>>,
    /// Drop commits dated after this instant.
    pub until: Option<DateTime<Utc>>,
}

/// A [`FilterOptions`] compiled for repeated matching.
#[derive(Debug, Clone)]
pub struct CommitFilter {
    types: HashSet<CommitType>,
    authors: HashSet<String>,
    exclude_authors: HashSet<String>,
    scopes: HashSet<String>,
    exclude_scopes: HashSet<String>,
    include_non_conventional: bool,
    only_breaking: bool,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
}

impl CommitFilter {
    /// Compile filter options.
    pub fn new(options: &FilterOptions) -> Self {
        Self {
            types: options.types.iter().copied().collect(),
            authors: options.authors.iter().cloned().collect(),
            exclude_authors: options.exclude_authors.iter().cloned().collect(),
            scopes: options.scopes.iter().cloned().collect(),
            exclude_scopes: options.exclude_scopes.iter().cloned().collect(),
            include_non_conventional: options.include_non_conventional,
            only_breaking: options.only_breaking,
            since: options.since,
            until: options.until,
        }
    }

    /// Whether a commit passes every active predicate.
    pub fn matches(&self, commit: &ParsedCommit) -> bool {
        if !commit.is_conventional && !self.include_non_conventional {
            return false;
        }
        if self.only_breaking && !commit.breaking {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&commit.commit_type) {
            return false;
        }

        let author = commit.author.as_deref();
        if !self.authors.is_empty() && !author.is_some_and(|a| self.authors.contains(a)) {
            return false;
        }
        if author.is_some_and(|a| self.exclude_authors.contains(a)) {
            return false;
        }

        let scope = commit.scope.as_deref();
        if !self.scopes.is_empty() && !scope.is_some_and(|s| self.scopes.contains(s)) {
            return false;
        }
        if scope.is_some_and(|s| self.exclude_scopes.contains(s)) {
            return false;
        }

        if let Some(since) = self.since
            && !commit.date.is_some_and(|d| d >= since)
        {
            return false;
        }
        if let Some(until) = self.until
            && !commit.date.is_some_and(|d| d <= until)
        {
            return false;
        }

        true
    }

    /// Keep the matching commits, preserving order.
    pub fn apply(&self, commits: &[ParsedCommit]) -> Vec<ParsedCommit> {
        let kept: Vec<ParsedCommit> = commits.iter().filter(|c| self.matches(c)).cloned().collect();
        debug!(total = commits.len(), kept = kept.len(), "filtered commits");
        kept
    }
}

/// Filter commits by the given options.
pub fn filter(commits: &[ParsedCommit], options: &FilterOptions) -> Vec<ParsedCommit> {
    CommitFilter::new(options).apply(commits)
}
