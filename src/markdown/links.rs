//! URL normalization and the `http`/`https` allow-list.
//!
//! Every `href` that leaves the inline formatter has passed through
//! [`normalize_url`]; anything it rejects is rendered as literal text.

use url::Url;

/// Characters trimmed from the end of a bare autolink and kept as plain text,
/// so that `see www.example.com.` does not link the final period.
const TRAILING_PUNCTUATION: &str = ".,;:!?)]}'\"*";

/// Normalize and validate a link target.
///
/// - `http://` / `https://` targets are kept as-is.
/// - `www.`-prefixed and bare `domain.tld[/path]` targets get `https://` prepended.
/// - Everything else (other schemes, relative paths, fragments) is rejected.
///
/// Returns the protocol-qualified URL, or `None` when the target must not be
/// rendered as a link.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if lower.starts_with("www.") {
        format!("https://{trimmed}")
    } else if has_scheme(trimmed) {
        return None;
    } else if looks_like_domain(trimmed) {
        format!("https://{trimmed}")
    } else {
        return None;
    };

    let parsed = Url::parse(&candidate).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str().filter(|host| !host.is_empty())?;
    Some(candidate)
}

/// Whether `s` begins with a URI scheme (`name:`), e.g. `ftp:`, `javascript:`.
fn has_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Conservative bare-domain check: `label(.label)+` with an alphabetic TLD,
/// optionally followed by a path, query or fragment.
fn looks_like_domain(s: &str) -> bool {
    let host = s
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    if host.contains('@') || host.contains(':') {
        return false;
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));
    labels_ok && tld_ok
}

/// Split trailing punctuation off a detected autolink, returning `(core, trailing)`.
///
/// A closing `)` is kept when the core contains a matching `(`, so
/// `https://en.wikipedia.org/wiki/Rust_(programming_language)` stays intact.
pub(super) fn split_trailing_punctuation(s: &str) -> (&str, &str) {
    let mut end = s.len();
    while let Some(ch) = s[..end].chars().next_back() {
        if !TRAILING_PUNCTUATION.contains(ch) {
            break;
        }
        if ch == ')' {
            let core = &s[..end];
            if core.matches('(').count() >= core.matches(')').count() {
                break;
            }
        }
        end -= ch.len_utf8();
    }
    (&s[..end], &s[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_and_https_kept() {
        assert_eq!(
            normalize_url("https://example.com/a?b=1").as_deref(),
            Some("https://example.com/a?b=1")
        );
        assert_eq!(
            normalize_url("http://example.com").as_deref(),
            Some("http://example.com")
        );
    }

    #[test]
    fn test_www_and_bare_domain_get_https() {
        assert_eq!(
            normalize_url("www.example.com").as_deref(),
            Some("https://www.example.com")
        );
        assert_eq!(
            normalize_url("careers.example.org/jobs").as_deref(),
            Some("https://careers.example.org/jobs")
        );
    }

    #[test]
    fn test_disallowed_schemes_rejected() {
        assert_eq!(normalize_url("ftp://x"), None);
        assert_eq!(normalize_url("javascript:alert(1)"), None);
        assert_eq!(normalize_url("mailto:someone@example.com"), None);
        assert_eq!(normalize_url("data:text/html,hi"), None);
    }

    #[test]
    fn test_non_urls_rejected() {
        assert_eq!(normalize_url(""), None);
        assert_eq!(normalize_url("notes"), None);
        assert_eq!(normalize_url("/relative/path"), None);
        assert_eq!(normalize_url("#anchor"), None);
        assert_eq!(normalize_url("main.rs1"), None);
        assert_eq!(normalize_url("has space.com"), None);
        assert_eq!(normalize_url("https://"), None);
    }

    #[test]
    fn test_split_trailing_punctuation() {
        assert_eq!(
            split_trailing_punctuation("www.example.com."),
            ("www.example.com", ".")
        );
        assert_eq!(
            split_trailing_punctuation("https://a.io/x)!"),
            ("https://a.io/x", ")!")
        );
        assert_eq!(
            split_trailing_punctuation("https://en.wikipedia.org/wiki/Rust_(lang)"),
            ("https://en.wikipedia.org/wiki/Rust_(lang)", "")
        );
        assert_eq!(split_trailing_punctuation("https://a.io"), ("https://a.io", ""));
    }
}
