//! SVG helpers: hardening, sizing, SVG→PNG conversion and theme colors.
//!
//! Every graphic an engine hands back goes through [`sanitize_svg`] before it
//! reaches a host surface.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::engine::DiagramError;
use crate::config::BubbleTheme;

/// Largest raster edge produced by [`svg_to_png_bytes`].
const MAX_RASTER_EDGE: u32 = 8192;

/// Lazily-loaded system font database for SVG text rendering.
///
/// Loaded once and shared across all `svg_to_png_bytes` calls.
pub(super) static FONTDB: std::sync::LazyLock<Arc<fontdb::Database>> =
    std::sync::LazyLock::new(|| {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        crate::debug_info!("DIAGRAM", "Loaded {} font faces from system", db.len());
        Arc::new(db)
    });

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

fn re_script_element() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*/>|<script\b.*?</script\s*>")
            .expect("re_script_element: pattern is valid and should always compile")
    })
}

fn re_event_attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
            .expect("re_event_attribute: pattern is valid and should always compile")
    })
}

fn re_script_href() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\s+(?:xlink:)?href\s*=\s*(?:"\s*javascript:[^"]*"|'\s*javascript:[^']*')"#)
            .expect("re_script_href: pattern is valid and should always compile")
    })
}

fn re_svg_open_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<svg\b[^>]*>")
            .expect("re_svg_open_tag: pattern is valid and should always compile")
    })
}

fn re_size_attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Leading whitespace keeps `stroke-width` and friends out of the match.
    RE.get_or_init(|| {
        Regex::new(r#"\s(width|height)\s*=\s*(?:"[^"]*"|'[^']*')"#)
            .expect("re_size_attribute: pattern is valid and should always compile")
    })
}

// ---------------------------------------------------------------------------
// Sanitizing
// ---------------------------------------------------------------------------

/// Remove executable content from engine output.
///
/// Strips `<script>` elements, inline `on*=` event handlers and
/// `javascript:` link targets, and repairs malformed `font-family` attributes.
pub fn sanitize_svg(svg: &str) -> String {
    let svg = sanitize_svg_font_family(svg);
    let svg = re_script_element().replace_all(&svg, "");
    let svg = re_event_attribute().replace_all(&svg, "");
    re_script_href().replace_all(&svg, "").into_owned()
}

/// Fix malformed SVG font-family attributes that contain unescaped inner quotes.
///
/// Some renderers emit SVG like:
///   `font-family="Inter, "Segoe UI", sans-serif"`
/// which is invalid XML. We replace inner `"` within attribute values with `'`.
pub(super) fn sanitize_svg_font_family(svg: &str) -> String {
    const ATTR: &str = "font-family=\"";
    let mut result = String::with_capacity(svg.len());
    let mut chars = svg.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        result.push(c);

        if !svg[i..].starts_with(ATTR) {
            continue;
        }
        // Copy the remainder of the attribute name (the 'f' is already pushed).
        for ch in ATTR[1..].chars() {
            chars.next();
            result.push(ch);
        }
        while let Some((_, next_c)) = chars.next() {
            if next_c != '"' {
                result.push(next_c);
                continue;
            }
            match chars.peek() {
                Some(&(_, after)) if after != ' ' && after != '/' && after != '>' => {
                    result.push('\'');
                }
                _ => {
                    result.push('"');
                    break;
                }
            }
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Sizing
// ---------------------------------------------------------------------------

/// Intrinsic size of an SVG document, as resolved by usvg.
pub fn svg_size(svg: &str) -> Option<(f32, f32)> {
    let tree = resvg::usvg::Tree::from_str(svg, &resvg::usvg::Options::default()).ok()?;
    let size = tree.size();
    Some((size.width(), size.height()))
}

/// Copy of `svg` whose root element declares the given `width` and `height`.
///
/// A root without a `viewBox` gets one spanning its original size so the
/// drawing scales instead of being cropped.
pub fn with_root_size(svg: &str, width: f32, height: f32) -> String {
    let Some(open) = re_svg_open_tag().find(svg) else {
        return svg.to_string();
    };
    let tag = open.as_str();
    let stripped = re_size_attribute().replace_all(tag, "");
    let body = stripped.trim_end_matches('>').trim_end_matches('/');
    let self_closing = tag.ends_with("/>");

    let mut new_tag = body.trim_end().to_string();
    if !tag.contains("viewBox")
        && let Some((w, h)) = svg_size(svg)
    {
        new_tag.push_str(&format!(" viewBox=\"0 0 {w} {h}\""));
    }
    new_tag.push_str(&format!(" width=\"{width}\" height=\"{height}\""));
    new_tag.push_str(if self_closing { "/>" } else { ">" });

    let mut out = String::with_capacity(svg.len() + 32);
    out.push_str(&svg[..open.start()]);
    out.push_str(&new_tag);
    out.push_str(&svg[open.end()..]);
    out
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Format an `[r, g, b]` triple as a `#RRGGBB` hex string.
pub fn rgb_to_hex(c: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", c[0], c[1], c[2])
}

/// Build a `mermaid_rs_renderer::Theme` matching a chat bubble.
pub(super) fn mermaid_theme(bubble: &BubbleTheme) -> mermaid_rs_renderer::Theme {
    let text = rgb_to_hex(bubble.text);
    let surface = rgb_to_hex(bubble.code_bg);
    let border = rgb_to_hex(bubble.bullet);
    let line = rgb_to_hex(bubble.heading);

    mermaid_rs_renderer::Theme {
        font_family: "sans-serif".to_string(),
        font_size: 14.0,
        primary_color: surface.clone(),
        primary_text_color: text.clone(),
        primary_border_color: border.clone(),
        line_color: line.clone(),
        secondary_color: rgb_to_hex(bubble.code_block_bg),
        tertiary_color: rgb_to_hex(bubble.link),
        edge_label_background: rgb_to_hex(bubble.background),
        cluster_background: rgb_to_hex(bubble.code_block_bg),
        cluster_border: border.clone(),
        background: rgb_to_hex(bubble.background),
        sequence_actor_fill: surface,
        sequence_actor_border: border,
        sequence_actor_line: line,
        text_color: text.clone(),
        git_commit_label_color: text.clone(),
        git_tag_label_color: text.clone(),
        pie_title_text_color: text.clone(),
        pie_section_text_color: text.clone(),
        pie_legend_text_color: text,
        ..mermaid_rs_renderer::Theme::modern()
    }
}

// ---------------------------------------------------------------------------
// Rasterizing
// ---------------------------------------------------------------------------

/// Convert an SVG string to PNG bytes using resvg.
///
/// `bg` sets the pixmap background color; transparent when `None`.
/// System fonts are loaded lazily via [`FONTDB`] so that `<text>` elements
/// render correctly.
pub fn svg_to_png_bytes(svg: &str, bg: Option<[u8; 3]>) -> Result<Vec<u8>, DiagramError> {
    use image::ImageEncoder;
    use image::codecs::png::PngEncoder;

    let svg = sanitize_svg_font_family(svg);
    let opts = resvg::usvg::Options {
        fontdb: FONTDB.clone(),
        ..Default::default()
    };
    let tree = resvg::usvg::Tree::from_str(&svg, &opts)
        .map_err(|e| DiagramError::InvalidSvg(e.to_string()))?;

    let size = tree.size();
    let width = size.width().ceil() as u32;
    let height = size.height().ceil() as u32;
    if width == 0 || height == 0 || width > MAX_RASTER_EDGE || height > MAX_RASTER_EDGE {
        return Err(DiagramError::InvalidSvg(format!(
            "dimensions out of range: {width}x{height}"
        )));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| DiagramError::InvalidSvg(format!("cannot allocate {width}x{height}")))?;
    if let Some([r, g, b]) = bg {
        pixmap.fill(resvg::tiny_skia::Color::from_rgba8(r, g, b, 255));
    }
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::default(),
        &mut pixmap.as_mut(),
    );

    let mut png_buf = Vec::new();
    PngEncoder::new(&mut png_buf)
        .write_image(
            pixmap.data(),
            width,
            height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| DiagramError::RenderFailed(format!("PNG encoding failed: {e}")))?;

    crate::debug_log!(
        "DIAGRAM",
        "SVG->PNG conversion succeeded: {width}x{height}, {} bytes",
        png_buf.len()
    );
    Ok(png_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str =
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50"><rect width="10" height="10" stroke-width="2"/></svg>"#;

    #[test]
    fn test_sanitize_removes_scripts_and_handlers() {
        let svg = r#"<svg onload="alert(1)"><script>alert(2)</script><a href="javascript:x()"><rect onclick='y()'/></a></svg>"#;
        let clean = sanitize_svg(svg);
        assert!(!clean.contains("script"));
        assert!(!clean.contains("onload"));
        assert!(!clean.contains("onclick"));
        assert!(!clean.contains("javascript:"));
        assert!(clean.contains("<rect/>"));
    }

    #[test]
    fn test_font_family_inner_quotes_repaired() {
        let svg = r#"<text font-family="Inter, "Segoe UI", sans-serif" x="1">t</text>"#;
        assert_eq!(
            sanitize_svg_font_family(svg),
            r#"<text font-family="Inter, 'Segoe UI', sans-serif" x="1">t</text>"#
        );
    }

    #[test]
    fn test_svg_size() {
        assert_eq!(svg_size(SQUARE), Some((100.0, 50.0)));
        assert_eq!(svg_size("not svg"), None);
    }

    #[test]
    fn test_with_root_size_scales_root_only() {
        let scaled = with_root_size(SQUARE, 200.0, 100.0);
        assert!(scaled.contains(r#"width="200" height="100""#));
        assert!(scaled.contains(r#"viewBox="0 0 100 50""#));
        // Child attributes untouched.
        assert!(scaled.contains(r#"<rect width="10" height="10" stroke-width="2"/>"#));
        assert_eq!(svg_size(&scaled), Some((200.0, 100.0)));
    }

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(rgb_to_hex([30, 30, 46]), "#1E1E2E");
    }

    #[test]
    fn test_png_conversion() {
        let png = svg_to_png_bytes(SQUARE, Some([255, 255, 255])).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert!(svg_to_png_bytes("<svg", None).is_err());
    }
}
