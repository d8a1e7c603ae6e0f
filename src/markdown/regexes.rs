//! Compiled regular expressions for block and inline parsing.
//!
//! Each accessor uses a `OnceLock` to compile the pattern at most once.

use regex::Regex;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Block-level
// ---------------------------------------------------------------------------

pub(super) fn re_fence_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*```\s*([^`\s]*)\s*$")
            .expect("re_fence_open: pattern is valid and should always compile")
    })
}

pub(super) fn re_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s{0,3}(#{1,6})\s+(\S.*?)\s*$")
            .expect("re_header: pattern is valid and should always compile")
    })
}

pub(super) fn re_unordered_list() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*[-*+]\s+(.*)$")
            .expect("re_unordered_list: pattern is valid and should always compile")
    })
}

pub(super) fn re_ordered_list() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\d{1,9}\.\s+(.*)$")
            .expect("re_ordered_list: pattern is valid and should always compile")
    })
}

// ---------------------------------------------------------------------------
// Inline
// ---------------------------------------------------------------------------

pub(super) fn re_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Targets may hold one level of balanced parentheses: `wiki/Rust_(lang)`.
    RE.get_or_init(|| {
        Regex::new(r"\[([^\]]+)\]\(((?:[^()\s]|\([^()\s]*\))+)\)")
            .expect("re_link: pattern is valid and should always compile")
    })
}

pub(super) fn re_angle_autolink() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<(https?://[^\s<>]+)>")
            .expect("re_angle_autolink: pattern is valid and should always compile")
    })
}

pub(super) fn re_bare_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bhttps?://[^\s<>]+")
            .expect("re_bare_url: pattern is valid and should always compile")
    })
}

pub(super) fn re_www() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bwww\.[a-z0-9-]+\.[^\s<>]+")
            .expect("re_www: pattern is valid and should always compile")
    })
}

pub(super) fn re_inline_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"`([^`]+)`")
            .expect("re_inline_code: pattern is valid and should always compile")
    })
}

pub(super) fn re_bold() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*\*([^*\s](?:[^*]*[^*\s])?)\*\*|__([^_\s](?:[^_]*[^_\s])?)__")
            .expect("re_bold: pattern is valid and should always compile")
    })
}

pub(super) fn re_italic() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Use \b around underscore italic to avoid matching snake_case identifiers.
    RE.get_or_init(|| {
        Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*|\b_([^_\s](?:[^_]*[^_\s])?)_\b")
            .expect("re_italic: pattern is valid and should always compile")
    })
}
