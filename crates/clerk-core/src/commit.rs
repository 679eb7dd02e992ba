//! Commit input model.
//!
//! [`CommitInfo`] is the immutable record handed to the classifier. Fetching
//! it from a repository is the caller's job; this crate never touches git.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// A single commit as seen by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full commit hash.
    pub hash: String,
    /// The complete commit message, subject and body.
    pub message: String,
    /// First line of the message.
    pub subject: String,
    /// Paths touched by the commit, relative to the repository root.
    pub files: Vec<Utf8PathBuf>,
    /// Before/after content for files where it was collected.
    pub file_diffs: Vec<FileDiff>,
    /// Aggregate line statistics.
    pub stats: DiffStats,
    /// Unified diff text, if collected.
    pub diff: Option<String>,
}

impl CommitInfo {
    /// Create a commit from a hash and message, deriving the subject line.
    pub fn new(hash: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let subject = message.lines().next().unwrap_or_default().trim().to_string();
        Self {
            hash: hash.into(),
            message,
            subject,
            ..Self::default()
        }
    }

    /// Attach a file diff, recording its path in [`files`](Self::files) too.
    pub fn with_file_diff(mut self, diff: FileDiff) -> Self {
        if !self.files.contains(&diff.path) {
            self.files.push(diff.path.clone());
        }
        self.file_diffs.push(diff);
        self
    }

    /// Set the aggregate diff statistics.
    pub const fn with_stats(mut self, stats: DiffStats) -> Self {
        self.stats = stats;
        self
    }
}

/// Content of one file on both sides of a commit.
///
/// `before` is `None` for added files, `after` is `None` for deleted ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path of the file, relative to the repository root.
    pub path: Utf8PathBuf,
    /// Content before the commit.
    pub before: Option<Vec<u8>>,
    /// Content after the commit.
    pub after: Option<Vec<u8>>,
}

impl FileDiff {
    /// Create a diff for a modified file.
    pub fn modified(
        path: impl Into<Utf8PathBuf>,
        before: impl Into<Vec<u8>>,
        after: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            path: path.into(),
            before: Some(before.into()),
            after: Some(after.into()),
        }
    }

    /// Create a diff for a newly added file.
    pub fn added(path: impl Into<Utf8PathBuf>, after: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(after.into()),
        }
    }

    /// Content before the commit, empty if the file was added.
    pub fn before_bytes(&self) -> &[u8] {
        self.before.as_deref().unwrap_or_default()
    }

    /// Content after the commit, empty if the file was deleted.
    pub fn after_bytes(&self) -> &[u8] {
        self.after.as_deref().unwrap_or_default()
    }
}

/// Aggregate line statistics for a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    /// Number of files changed.
    pub files_changed: usize,
    /// Lines added.
    pub additions: usize,
    /// Lines removed.
    pub deletions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_derives_subject_from_first_line() {
        let commit = CommitInfo::new("abc123", "  fix: trim input  \n\nlonger body");
        assert_eq!(commit.subject, "fix: trim input");
        assert_eq!(commit.hash, "abc123");
    }

    #[test]
    fn new_with_empty_message() {
        let commit = CommitInfo::new("abc123", "");
        assert!(commit.subject.is_empty());
    }

    #[test]
    fn with_file_diff_records_path_once() {
        let commit = CommitInfo::new("abc", "x")
            .with_file_diff(FileDiff::modified("src/a.go", "a", "b"))
            .with_file_diff(FileDiff::modified("src/a.go", "b", "c"));
        assert_eq!(commit.files.len(), 1);
        assert_eq!(commit.file_diffs.len(), 2);
    }

    #[test]
    fn added_file_has_empty_before() {
        let diff = FileDiff::added("new.py", "def f(): pass");
        assert!(diff.before_bytes().is_empty());
        assert_eq!(diff.after_bytes(), b"def f(): pass");
    }
}
