//! Inline formatting: one line of raw text to a sequence of [`TextRun`]s.
//!
//! Formatting is a fixed pipeline of substitution passes. Each pass only
//! looks at `Plain` runs and splits them into plain text plus the runs it
//! recognizes; runs tagged by an earlier pass are never re-scanned. The order
//! is significant:
//!
//! 1. explicit links `[text](url)`
//! 2. angle-bracket autolinks `<https://…>`
//! 3. bare `http(s)://` autolinks
//! 4. bare `www.` autolinks
//! 5. inline code spans
//! 6. bold (`**x**`, `__x__`)
//! 7. italic (`*x*`, `_x_`)
//!
//! No pass can fail: text a pass does not recognize (unterminated markers,
//! links with disallowed schemes) stays in a plain run, so every input
//! character survives either as run text or as a markup wrapper.

use std::ops::Range;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::links::{normalize_url, split_trailing_punctuation};
use super::regexes::{
    re_angle_autolink, re_bare_url, re_bold, re_inline_code, re_italic, re_link, re_www,
};
use crate::config::MarkdownConfig;

// ---------------------------------------------------------------------------
// Run types
// ---------------------------------------------------------------------------

/// Style category of a [`TextRun`]. Independent of who authored the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Plain,
    Bold,
    Italic,
    Code,
    Link,
}

/// A minimal styled unit of inline text.
///
/// `href` is set only for `Link` runs and is always a normalized `http`/`https` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub kind: RunKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl TextRun {
    fn new(kind: RunKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            href: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(RunKind::Plain, text)
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(RunKind::Bold, text)
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self::new(RunKind::Italic, text)
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self::new(RunKind::Code, text)
    }

    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            kind: RunKind::Link,
            text: text.into(),
            href: Some(href.into()),
        }
    }

    pub fn is_plain(&self) -> bool {
        self.kind == RunKind::Plain
    }

    /// Re-wrap this run in markup that parses back to it on its own.
    ///
    /// Links always come back wrapped; [`InlineFormatter::to_markdown`]
    /// restores bare autolinks where the surrounding text allows it.
    pub fn to_markdown(&self) -> String {
        match self.kind {
            RunKind::Plain => self.text.clone(),
            // Underscore forms are the only ones whose content may hold `*`.
            RunKind::Bold if self.text.contains('*') => format!("__{}__", self.text),
            RunKind::Bold => format!("**{}**", self.text),
            RunKind::Italic if self.text.contains('*') => format!("_{}_", self.text),
            RunKind::Italic => format!("*{}*", self.text),
            RunKind::Code => format!("`{}`", self.text),
            RunKind::Link => {
                let href = self.href.as_deref().unwrap_or_default();
                if href == self.text && !self.text.contains(['<', '>']) {
                    format!("<{href}>")
                } else {
                    format!("[{}]({})", self.text, href)
                }
            }
        }
    }
}

/// Concatenate run texts, dropping all styling.
pub fn runs_text(runs: &[TextRun]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// Re-emit a run sequence as inline markup, with default options.
pub fn runs_to_markdown(runs: &[TextRun]) -> String {
    InlineFormatter::default().to_markdown(runs)
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Inline formatter options.
#[derive(Debug, Clone)]
pub struct InlineFormatter {
    autolink_www: bool,
}

impl Default for InlineFormatter {
    fn default() -> Self {
        Self { autolink_www: true }
    }
}

impl InlineFormatter {
    pub fn new(config: &MarkdownConfig) -> Self {
        Self {
            autolink_www: config.autolink_www,
        }
    }

    /// Format one line into runs. Never fails, never drops characters.
    pub fn format_line(&self, line: &str) -> Vec<TextRun> {
        if line.is_empty() {
            return Vec::new();
        }

        let mut runs = vec![TextRun::plain(line)];
        runs = apply_pass(runs, explicit_links);
        runs = apply_pass(runs, angle_autolinks);
        runs = apply_pass(runs, bare_urls);
        if self.autolink_www {
            runs = apply_pass(runs, www_autolinks);
        }
        runs = apply_pass(runs, code_spans);
        runs = apply_pass(runs, bold_spans);
        runs = apply_pass(runs, italic_spans);

        crate::debug_trace!("MARKDOWN", "formatted {:?} into {} runs", line, runs.len());
        runs
    }

    /// Re-emit runs as markup that [`format_line`](Self::format_line) turns
    /// back into the same runs.
    ///
    /// A link is written as its bare text when formatting the line with it
    /// bare still yields `runs`; otherwise it keeps its `<…>` or `[…](…)` form.
    pub fn to_markdown(&self, runs: &[TextRun]) -> String {
        let mut pieces: Vec<String> = runs.iter().map(TextRun::to_markdown).collect();
        for (i, run) in runs.iter().enumerate() {
            if run.kind != RunKind::Link {
                continue;
            }
            let wrapped = std::mem::replace(&mut pieces[i], run.text.clone());
            if self.format_line(&pieces.concat()).as_slice() != runs {
                pieces[i] = wrapped;
            }
        }
        pieces.concat()
    }
}

/// Format a line with default options.
pub fn format_line(line: &str) -> Vec<TextRun> {
    InlineFormatter::default().format_line(line)
}

// ---------------------------------------------------------------------------
// Pass machinery
// ---------------------------------------------------------------------------

/// Run `pass` over every plain run, leaving tagged runs untouched.
fn apply_pass(runs: Vec<TextRun>, pass: fn(&str) -> Vec<TextRun>) -> Vec<TextRun> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        if run.is_plain() {
            out.extend(pass(&run.text));
        } else {
            out.push(run);
        }
    }
    out
}

/// Split `text` around the matches of `re` that `convert` accepts.
///
/// `convert` returns the run for a match together with the byte offset where
/// the consumed source ends (at most the match end; anything after it stays
/// plain). Rejected matches stay in the surrounding plain text.
fn split_matches<F>(text: &str, re: &Regex, mut convert: F) -> Vec<TextRun>
where
    F: FnMut(&Captures<'_>) -> Option<(TextRun, usize)>,
{
    let mut runs = Vec::new();
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() < last {
            continue;
        }
        if let Some((run, end)) = convert(&caps) {
            if whole.start() > last {
                runs.push(TextRun::plain(&text[last..whole.start()]));
            }
            runs.push(run);
            last = end;
        }
    }

    if last < text.len() {
        runs.push(TextRun::plain(&text[last..]));
    }
    runs
}

/// Text of the first capture group that participated in the match.
fn alternative_group<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Byte ranges enclosed in backtick pairs.
fn code_ranges(text: &str) -> Vec<Range<usize>> {
    re_inline_code().find_iter(text).map(|m| m.range()).collect()
}

fn overlaps(ranges: &[Range<usize>], span: &Range<usize>) -> bool {
    ranges
        .iter()
        .any(|r| r.start < span.end && span.start < r.end)
}

/// Build a link run for a bare autolink match, trimming trailing punctuation.
fn autolink_run(
    text: &str,
    whole: regex::Match<'_>,
    protected: &[Range<usize>],
) -> Option<(TextRun, usize)> {
    if overlaps(protected, &whole.range()) {
        return None;
    }
    let (core, _) = split_trailing_punctuation(whole.as_str());
    let href = normalize_url(core)?;
    let end = whole.start() + core.len();
    Some((TextRun::link(&text[whole.start()..end], href), end))
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

fn explicit_links(text: &str) -> Vec<TextRun> {
    split_matches(text, re_link(), |caps| {
        let whole = caps.get(0)?;
        let label = caps.get(1)?.as_str();
        let target = caps.get(2)?.as_str();
        match normalize_url(target) {
            Some(href) => Some((TextRun::link(label, href), whole.end())),
            None => {
                crate::debug_log!("MARKDOWN", "link target {:?} rejected, kept literal", target);
                None
            }
        }
    })
}

fn angle_autolinks(text: &str) -> Vec<TextRun> {
    split_matches(text, re_angle_autolink(), |caps| {
        let whole = caps.get(0)?;
        let target = caps.get(1)?.as_str();
        let href = normalize_url(target)?;
        Some((TextRun::link(target, href), whole.end()))
    })
}

fn bare_urls(text: &str) -> Vec<TextRun> {
    let protected = code_ranges(text);
    split_matches(text, re_bare_url(), |caps| {
        autolink_run(text, caps.get(0)?, &protected)
    })
}

fn www_autolinks(text: &str) -> Vec<TextRun> {
    let protected = code_ranges(text);
    split_matches(text, re_www(), |caps| {
        let whole = caps.get(0)?;
        let preceded_by_host_char = text[..whole.start()]
            .chars()
            .next_back()
            .is_some_and(|c| matches!(c, '@' | '/' | '.' | '-'));
        if preceded_by_host_char {
            return None;
        }
        autolink_run(text, whole, &protected)
    })
}

fn code_spans(text: &str) -> Vec<TextRun> {
    split_matches(text, re_inline_code(), |caps| {
        let whole = caps.get(0)?;
        Some((TextRun::code(caps.get(1)?.as_str()), whole.end()))
    })
}

fn bold_spans(text: &str) -> Vec<TextRun> {
    split_matches(text, re_bold(), |caps| {
        let whole = caps.get(0)?;
        Some((TextRun::bold(alternative_group(caps)?), whole.end()))
    })
}

fn italic_spans(text: &str) -> Vec<TextRun> {
    split_matches(text, re_italic(), |caps| {
        let whole = caps.get(0)?;
        Some((TextRun::italic(alternative_group(caps)?), whole.end()))
    })
}
