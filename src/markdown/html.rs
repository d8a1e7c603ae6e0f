//! HTML serialization of presentation trees.
//!
//! All message text is escaped. Link targets are the already-validated
//! `http`/`https` URLs from the inline formatter. Diagram placeholders keep
//! their stable id and carry whatever the host has attached to them.

use std::fmt::Write as _;

use super::render::{ControlAction, Element, PresentationTree, StyledSegment};
use crate::config::MarkdownConfig;
use crate::diagrams::ContainerRef;
use crate::diagrams::svg_utils::rgb_to_hex;

/// What the host currently shows inside a diagram placeholder.
pub trait PlaceholderContent {
    /// Attached (sanitized) SVG markup.
    fn graphic(&self, container: &ContainerRef) -> Option<String>;
    /// Inline notice shown instead of a graphic.
    fn notice(&self, container: &ContainerRef) -> Option<String>;
}

/// Placeholder content for trees rendered without an adapter: always empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyPlaceholders;

impl PlaceholderContent for EmptyPlaceholders {
    fn graphic(&self, _container: &ContainerRef) -> Option<String> {
        None
    }

    fn notice(&self, _container: &ContainerRef) -> Option<String> {
        None
    }
}

/// Options for [`write_html`].
#[derive(Debug, Clone, Copy)]
pub struct HtmlOptions {
    /// Add `target="_blank"` to links.
    pub link_target_blank: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            link_target_blank: true,
        }
    }
}

impl HtmlOptions {
    pub fn new(config: &MarkdownConfig) -> Self {
        Self {
            link_target_blank: config.link_target_blank,
        }
    }
}

/// Escape HTML special characters for safe embedding in HTML documents.
pub fn html_escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// Serialize one message's presentation tree as an `<article>` element.
pub fn write_html(
    tree: &PresentationTree,
    content: &dyn PlaceholderContent,
    options: &HtmlOptions,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<article class="message {}" style="background:{};color:{}">"#,
        tree.author.css_class(),
        rgb_to_hex(tree.background),
        rgb_to_hex(tree.text_color)
    );
    for element in &tree.elements {
        write_element(&mut out, element, tree.text_color, content, options);
    }
    out.push_str("</article>\n");
    out
}

fn write_element(
    out: &mut String,
    element: &Element,
    text_color: [u8; 3],
    content: &dyn PlaceholderContent,
    options: &HtmlOptions,
) {
    match element {
        Element::Paragraph { color, segments } => {
            let _ = writeln!(
                out,
                r#"<p style="color:{}">{}</p>"#,
                rgb_to_hex(*color),
                segments_html(segments, options)
            );
        }
        Element::Heading {
            level,
            color,
            segments,
        } => {
            let _ = writeln!(
                out,
                r#"<h{level} style="color:{}">{}</h{level}>"#,
                rgb_to_hex(*color),
                segments_html(segments, options)
            );
        }
        Element::List {
            ordered,
            bullet_color,
            items,
        } => {
            let tag = if *ordered { "ol" } else { "ul" };
            // Markers take the list color; item text resets to the bubble color.
            let _ = writeln!(out, r#"<{tag} style="color:{}">"#, rgb_to_hex(*bullet_color));
            for item in items {
                let _ = writeln!(
                    out,
                    r#"<li><span style="color:{}">{}</span></li>"#,
                    rgb_to_hex(text_color),
                    segments_html(item, options)
                );
            }
            let _ = writeln!(out, "</{tag}>");
        }
        Element::CodeBlock {
            language,
            lines,
            foreground,
            background,
        } => {
            let class = language
                .as_deref()
                .map(|lang| format!(r#" class="language-{}""#, html_escape(lang)))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                r#"<pre class="code-block" style="background:{};color:{}"><code{class}>{}</code></pre>"#,
                rgb_to_hex(*background),
                rgb_to_hex(*foreground),
                html_escape(&lines.join("\n"))
            );
        }
        Element::DiagramPlaceholder {
            id,
            container,
            controls,
        } => {
            let graphic = content.graphic(container);
            let _ = writeln!(
                out,
                r#"<figure class="diagram" id="{}" data-processed="{}">"#,
                html_escape(container.host_id()),
                graphic.is_some()
            );
            out.push_str(r#"<div class="diagram-canvas">"#);
            match (graphic, content.notice(container)) {
                (Some(svg), _) => out.push_str(&svg),
                (None, Some(notice)) => {
                    let _ = write!(
                        out,
                        r#"<p class="diagram-notice">{}</p>"#,
                        html_escape(&notice)
                    );
                }
                (None, None) => {
                    out.push_str(r#"<p class="diagram-loading">Rendering diagram…</p>"#);
                }
            }
            out.push_str("</div>\n");
            out.push_str(r#"<div class="diagram-controls">"#);
            for control in controls {
                let action = match control.action {
                    ControlAction::Export => "export",
                    ControlAction::Zoom => "zoom",
                };
                let _ = write!(
                    out,
                    r#"<button type="button" data-action="{action}" data-target="{}">{}</button>"#,
                    html_escape(id.as_str()),
                    html_escape(control.label)
                );
            }
            out.push_str("</div>\n</figure>\n");
        }
        Element::Break => out.push_str("<br>\n"),
    }
}

fn segments_html(segments: &[StyledSegment], options: &HtmlOptions) -> String {
    let mut out = String::new();
    for seg in segments {
        let mut html = html_escape(&seg.text);
        if seg.monospace {
            html = format!("<code{}>{html}</code>", style_attr(seg));
        }
        if seg.bold {
            html = format!("<strong>{html}</strong>");
        }
        if seg.italic {
            html = format!("<em>{html}</em>");
        }
        if let Some(url) = &seg.link_url {
            let target = if options.link_target_blank {
                r#" target="_blank""#
            } else {
                ""
            };
            html = format!(
                r#"<a href="{}"{target} rel="noopener noreferrer"{}>{html}</a>"#,
                html_escape(url),
                style_attr(seg)
            );
        } else if !seg.monospace && seg.fg.is_some() {
            html = format!("<span{}>{html}</span>", style_attr(seg));
        }
        out.push_str(&html);
    }
    out
}

fn style_attr(seg: &StyledSegment) -> String {
    let mut style = String::new();
    if let Some(fg) = seg.fg {
        let _ = write!(style, "color:{};", rgb_to_hex(fg));
    }
    if let Some(bg) = seg.bg {
        let _ = write!(style, "background:{};", rgb_to_hex(bg));
    }
    if style.is_empty() {
        String::new()
    } else {
        format!(r#" style="{style}""#)
    }
}

/// Wrap rendered message articles in a standalone HTML page.
pub fn write_page(title: &str, articles: &[String]) -> String {
    let mut page = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{}</title>
    <style>
        body {{
            background-color: #1e1e2e;
            font-family: 'Inter', 'Segoe UI', sans-serif;
            font-size: 15px;
            max-width: 860px;
            margin: 0 auto;
            padding: 20px;
        }}
        .message {{
            border-radius: 12px;
            padding: 12px 16px;
            margin: 12px 0;
        }}
        .message-user {{
            margin-left: 15%;
        }}
        .message-assistant {{
            margin-right: 15%;
        }}
        .code-block {{
            padding: 8px 12px;
            border-radius: 6px;
            overflow-x: auto;
        }}
        .diagram-canvas {{
            overflow: auto;
        }}
        .timestamp {{
            color: #808080;
            font-size: 10px;
        }}
    </style>
</head>
<body>
"#,
        html_escape(title)
    );
    for article in articles {
        page.push_str(article);
    }
    page.push_str("</body>\n</html>\n");
    page
}
