//! Body/footer splitting.
//!
//! A line scanner with two sections. Lines start in the body; the first line
//! that looks like a trailer moves the scanner into the footer, and it never
//! goes back. Blank lines after that point belong to the footer too.

use std::sync::LazyLock;

use regex::Regex;

/// Case-insensitive prefixes that always start a footer.
const FOOTER_PREFIXES: &[&str] = &[
    "BREAKING CHANGE:",
    "BREAKING-CHANGE:",
    "CLOSES:",
    "FIXES:",
    "RESOLVES:",
    "REFS:",
    "CO-AUTHORED-BY:",
    "SIGNED-OFF-BY:",
    "REVIEWED-BY:",
    "ACKED-BY:",
];

/// Generic trailer shape: `token: value` or `token #value`, no spaces in the token.
#[allow(clippy::expect_used)]
static TRAILER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*(?:: | #)\S").expect("valid regex")
});

#[allow(clippy::expect_used)]
static BREAKING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^BREAKING[ -]CHANGE:[ \t]*(?P<text>.*)$").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Body,
    Footer,
}

/// Split the text after the subject into `(body, footer)`.
///
/// Empty blocks come back as `None`.
pub(super) fn split(text: &str) -> (Option<String>, Option<String>) {
    let mut section = Section::Body;
    let mut body = Vec::new();
    let mut footer = Vec::new();

    for line in text.lines() {
        if section == Section::Body && is_footer_line(line) {
            section = Section::Footer;
        }
        match section {
            Section::Body => body.push(line),
            Section::Footer => footer.push(line),
        }
    }

    (join_block(&body), join_block(&footer))
}

/// Text of the first `BREAKING CHANGE:` line in a footer, trimmed.
pub(super) fn breaking_change(footer: &str) -> Option<String> {
    BREAKING_RE
        .captures(footer)
        .map(|caps| caps["text"].trim().to_string())
}

fn is_footer_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    let upper = line.to_ascii_uppercase();
    FOOTER_PREFIXES.iter().any(|p| upper.starts_with(p)) || TRAILER_RE.is_match(line)
}

fn join_block(lines: &[&str]) -> Option<String> {
    let joined = lines.join("\n");
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
