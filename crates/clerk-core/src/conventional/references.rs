//! Issue reference extraction (`#123`, `GH-123`, `Closes #123`).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a commit relates to the referenced issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// Plain mention.
    Ref,
    /// `close`, `closes`, `closed`.
    Closes,
    /// `fix`, `fixes`, `fixed`.
    Fixes,
    /// `resolve`, `resolves`, `resolved`.
    Resolves,
}

impl ReferenceKind {
    fn from_verb(verb: &str) -> Self {
        let verb = verb.to_ascii_lowercase();
        if verb.starts_with("close") {
            Self::Closes
        } else if verb.starts_with("fix") {
            Self::Fixes
        } else if verb.starts_with("resolve") {
            Self::Resolves
        } else {
            Self::Ref
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ref => write!(f, "ref"),
            Self::Closes => write!(f, "closes"),
            Self::Fixes => write!(f, "fixes"),
            Self::Resolves => write!(f, "resolves"),
        }
    }
}

/// An issue reference found in commit text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Relationship to the issue.
    pub kind: ReferenceKind,
    /// Issue number.
    pub id: u64,
    /// The matched text, verb included when it was attached.
    pub raw: String,
}

#[allow(clippy::expect_used)]
static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(?P<verb>close[sd]?|fix(?:e[sd])?|resolve[sd]?):?[ \t]+)?(?:#|\bGH-)(?P<id>\d+)\b",
    )
    .expect("valid regex")
});

/// What may sit between two references of one list (`#1, #2 and #3`).
#[allow(clippy::expect_used)]
static LIST_GAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ \t]*(?:(?:,|&|\band\b)[ \t]*)*$").expect("valid regex")
});

/// Find every reference in `message`, in order of appearance.
///
/// A verb attached directly to the reference decides its kind. A bare
/// reference continuing a list inherits the kind of the one before it
/// (`Fixes #1, #2 and #3` fixes all three); any other bare reference is a
/// plain [`ReferenceKind::Ref`].
pub(super) fn extract(message: &str) -> Vec<Reference> {
    let mut refs = Vec::new();
    // End offset and kind of the previous reference.
    let mut previous: Option<(usize, ReferenceKind)> = None;

    for caps in REFERENCE_RE.captures_iter(message) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let kind = match (caps.name("verb"), previous) {
            (Some(verb), _) => ReferenceKind::from_verb(verb.as_str()),
            (None, Some((end, kind))) if LIST_GAP_RE.is_match(&message[end..whole.start()]) => {
                kind
            }
            (None, _) => ReferenceKind::Ref,
        };
        previous = Some((whole.end(), kind));

        let Ok(id) = caps["id"].parse() else {
            continue;
        };
        refs.push(Reference {
            kind,
            id,
            raw: whole.as_str().to_string(),
        });
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_hash_reference() {
        let refs = extract("see #12 for context");
        assert_eq!(
            refs,
            vec![Reference {
                kind: ReferenceKind::Ref,
                id: 12,
                raw: "#12".into(),
            }]
        );
    }

    #[test]
    fn verb_attached_reference() {
        let refs = extract("Closes #5");
        assert_eq!(refs[0].kind, ReferenceKind::Closes);
        assert_eq!(refs[0].raw, "Closes #5");
    }

    #[test]
    fn verb_with_colon() {
        let refs = extract("Resolves: GH-77");
        assert_eq!(refs[0].kind, ReferenceKind::Resolves);
        assert_eq!(refs[0].id, 77);
    }

    #[test]
    fn verb_covers_list_on_same_line() {
        let refs = extract("Fixes #1, #2\nsee #3");
        let kinds: Vec<_> = refs.iter().map(|r| (r.id, r.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (1, ReferenceKind::Fixes),
                (2, ReferenceKind::Fixes),
                (3, ReferenceKind::Ref),
            ]
        );
    }

    #[test]
    fn verb_covers_and_separated_list() {
        let kinds: Vec<_> = extract("Fixes #1, #2 and #3 & #4")
            .iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(kinds, vec![ReferenceKind::Fixes; 4]);
    }

    #[test]
    fn commit_type_is_not_a_closing_verb() {
        let refs = extract("fix(ui): align button (#45)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::Ref);
    }

    #[test]
    fn verb_in_prose_does_not_reach_later_reference() {
        assert_eq!(
            extract("feat: resolve merge dialog, see #7")[0].kind,
            ReferenceKind::Ref
        );
        let kinds: Vec<_> = extract("Closes #3, see #4")
            .iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(kinds, vec![ReferenceKind::Closes, ReferenceKind::Ref]);
    }

    #[test]
    fn past_tense_verbs() {
        assert_eq!(extract("fixed #9")[0].kind, ReferenceKind::Fixes);
        assert_eq!(extract("closed #9")[0].kind, ReferenceKind::Closes);
        assert_eq!(extract("resolved #9")[0].kind, ReferenceKind::Resolves);
    }

    #[test]
    fn gh_prefix_is_case_insensitive() {
        let refs = extract("relates to gh-40");
        assert_eq!(refs[0].id, 40);
        assert_eq!(refs[0].kind, ReferenceKind::Ref);
    }

    #[test]
    fn no_references() {
        assert!(extract("chore: bump deps").is_empty());
    }

    #[test]
    fn oversized_number_is_skipped() {
        assert!(extract("#99999999999999999999999").is_empty());
    }

    #[test]
    fn kind_display() {
        assert_eq!(ReferenceKind::Closes.to_string(), "closes");
        assert_eq!(ReferenceKind::Ref.to_string(), "ref");
    }
}
