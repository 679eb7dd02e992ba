//! Conventional-commit parsing and rendering.
//!
//! Turns raw commit text into a [`ParsedCommit`]: type, scope, description,
//! body, footer, breaking flag, and issue references. [`format`] renders a
//! parsed commit back into message text.
//!
//! # Grammar
//!
//! The subject line must look like `<type>[(<scope>)][!]: <description>`,
//! where `<type>` is one of the [`CommitType`] vocabulary. Anything else is
//! either rejected (strict mode) or kept as a non-conventional record whose
//! description is the whole subject.
//!
//! # Example
//!
//! ```
//! use clerk_core::conventional::{self, CommitType};
//!
//! let parsed = conventional::parse("feat(auth): add OAuth2 support").unwrap();
//! assert_eq!(parsed.commit_type, CommitType::Feat);
//! assert_eq!(parsed.scope.as_deref(), Some("auth"));
//! assert!(!parsed.breaking);
//! ```

mod footer;
mod references;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

pub use references::{Reference, ReferenceKind};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from conventional-commit parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Strict mode is on and the subject does not follow the grammar.
    #[error("not a conventional commit: {reason} (subject: {subject:?})")]
    Validation {
        /// The offending subject line.
        subject: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A type tag outside the known vocabulary.
    #[error("unknown commit type: {0}")]
    UnknownType(String),
}

/// Result alias for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

// ──────────────────────────────────────────────
// Types
// ──────────────────────────────────────────────

/// Conventional-commit type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    /// A new feature.
    Feat,
    /// A bug fix.
    Fix,
    /// Documentation only.
    Docs,
    /// Formatting, whitespace, and other non-semantic changes.
    Style,
    /// Code change that neither fixes a bug nor adds a feature.
    Refactor,
    /// Performance improvement.
    Perf,
    /// Tests.
    Test,
    /// Build system or dependencies.
    Build,
    /// CI configuration.
    Ci,
    /// Maintenance.
    Chore,
    /// Reverts a previous commit.
    Revert,
    /// Not a recognized type (non-conventional commits).
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl CommitType {
    /// Every known type, in vocabulary order. Excludes [`CommitType::Unknown`].
    pub const ALL: &[Self] = &[
        Self::Feat,
        Self::Fix,
        Self::Docs,
        Self::Style,
        Self::Refactor,
        Self::Perf,
        Self::Test,
        Self::Build,
        Self::Ci,
        Self::Chore,
        Self::Revert,
    ];

    /// The tag as written in a commit subject. Empty for `Unknown`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Docs => "docs",
            Self::Style => "style",
            Self::Refactor => "refactor",
            Self::Perf => "perf",
            Self::Test => "test",
            Self::Build => "build",
            Self::Ci => "ci",
            Self::Chore => "chore",
            Self::Revert => "revert",
            Self::Unknown => "",
        }
    }

    /// Whether this is the empty/unknown tag.
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower.is_empty() {
            return Ok(Self::Unknown);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| ParseError::UnknownType(s.to_string()))
    }
}

/// A commit message broken into its conventional parts.
///
/// Invariant: when `is_conventional` is false, `commit_type` is
/// [`CommitType::Unknown`] and `description` is the raw subject line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommit {
    /// The type tag.
    #[serde(rename = "type")]
    pub commit_type: CommitType,
    /// Optional scope from the parentheses.
    pub scope: Option<String>,
    /// Text after the colon (or the whole subject if non-conventional).
    pub description: String,
    /// Free-form body, if any.
    pub body: Option<String>,
    /// Trailer block, if any.
    pub footer: Option<String>,
    /// Whether the commit signals a breaking change.
    pub breaking: bool,
    /// Text of the `BREAKING CHANGE:` footer, if that is how it was signalled.
    pub breaking_description: Option<String>,
    /// Issue references found in the message, in order of appearance.
    pub references: Vec<Reference>,
    /// Whether the subject matched the conventional grammar.
    pub is_conventional: bool,

    /// Commit hash, when the caller attached one.
    pub hash: Option<String>,
    /// Commit author, when the caller attached one.
    pub author: Option<String>,
    /// Commit timestamp, when the caller attached one.
    pub date: Option<DateTime<Utc>>,
}

impl ParsedCommit {
    /// Attach commit metadata used by [`crate::filter`].
    pub fn with_metadata(
        mut self,
        hash: impl Into<String>,
        author: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        self.hash = Some(hash.into());
        self.author = Some(author.into());
        self.date = Some(date);
        self
    }
}

/// Parsing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Reject messages that do not follow the grammar.
    pub strict_mode: bool,
    /// Extract issue references from the message.
    pub parse_references: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            parse_references: true,
        }
    }
}

// ──────────────────────────────────────────────
// Parsing
// ──────────────────────────────────────────────

#[allow(clippy::expect_used)]
static SUBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<type>feat|fix|docs|style|refactor|perf|test|build|ci|chore|revert)(?:\((?P<scope>[^()\r\n]+)\))?(?P<bang>!)?: +(?P<description>\S.*)$",
    )
    .expect("valid regex")
});

/// Parse a commit message with default options.
pub fn parse(message: &str) -> ParseResult<ParsedCommit> {
    parse_with(message, ParseOptions::default())
}

/// Parse a commit message.
///
/// Fails only in strict mode, when the subject does not match the grammar.
pub fn parse_with(message: &str, options: ParseOptions) -> ParseResult<ParsedCommit> {
    let message = message.trim();
    let (subject, rest) = match message.split_once('\n') {
        Some((subject, rest)) => (subject.trim(), rest.trim()),
        None => (message, ""),
    };
    let (body, footer) = footer::split(rest);
    let references = if options.parse_references {
        references::extract(message)
    } else {
        Vec::new()
    };

    let Some(caps) = SUBJECT_RE.captures(subject) else {
        if options.strict_mode {
            return Err(ParseError::Validation {
                subject: subject.to_string(),
                reason: "expected `<type>[(<scope>)][!]: <description>`".into(),
            });
        }
        trace!(subject, "subject is not conventional");
        return Ok(ParsedCommit {
            description: subject.to_string(),
            body,
            footer,
            references,
            ..ParsedCommit::default()
        });
    };

    let commit_type = caps["type"].parse()?;
    let scope = caps
        .name("scope")
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());
    let bang = caps.name("bang").is_some();

    let (breaking, breaking_description) = if bang {
        (true, None)
    } else {
        match footer.as_deref().and_then(footer::breaking_change) {
            Some(text) => (true, Some(text).filter(|t| !t.is_empty())),
            None => (false, None),
        }
    };

    Ok(ParsedCommit {
        commit_type,
        scope,
        description: caps["description"].trim().to_string(),
        body,
        footer,
        breaking,
        breaking_description,
        references,
        is_conventional: true,
        ..ParsedCommit::default()
    })
}

/// Whether a message is a valid conventional commit.
pub fn is_conventional(message: &str) -> bool {
    parse(message).is_ok_and(|p| p.is_conventional)
}

// ──────────────────────────────────────────────
// Rendering
// ──────────────────────────────────────────────

/// Render a parsed commit back into message text.
///
/// Header, body, and footer are separated by a blank line; missing blocks
/// are skipped.
pub fn format(commit: &ParsedCommit) -> String {
    let mut header = String::new();
    if !commit.commit_type.is_unknown() {
        header.push_str(commit.commit_type.as_str());
        if let Some(scope) = &commit.scope {
            header.push('(');
            header.push_str(scope);
            header.push(')');
        }
        if commit.breaking {
            header.push('!');
        }
        header.push_str(": ");
    }
    header.push_str(&commit.description);

    let mut blocks = vec![header];
    for block in [&commit.body, &commit.footer].into_iter().flatten() {
        if !block.trim().is_empty() {
            blocks.push(block.clone());
        }
    }
    blocks.join("\n\n")
}
