//! Document renderer and HTML serialization tests.

use std::cell::RefCell;

use super::super::MessageRenderer;
use super::super::blocks::{BlockNode, segment};
use super::super::diagram_id::DiagramId;
use super::super::html::{EmptyPlaceholders, HtmlOptions, PlaceholderContent, html_escape, write_html};
use super::super::render::{
    ControlAction, DetachedPlacements, DocumentRenderer, Element, PlacementSink,
};
use crate::config::{BubbleTheme, ChatRenderConfig, ThemeConfig};
use crate::diagrams::ContainerRef;
use crate::message::Sender;

/// Records every placement registration.
#[derive(Default)]
struct RecordingSink {
    registered: RefCell<Vec<(DiagramId, String)>>,
}

impl PlacementSink for RecordingSink {
    fn register_placement(&self, id: &DiagramId, source: &str, _theme: &BubbleTheme) -> ContainerRef {
        self.registered
            .borrow_mut()
            .push((id.clone(), source.to_string()));
        ContainerRef::for_diagram(id)
    }
}

/// Serves a fixed graphic for one container.
struct OneGraphic {
    container: ContainerRef,
}

impl PlaceholderContent for OneGraphic {
    fn graphic(&self, container: &ContainerRef) -> Option<String> {
        (container == &self.container).then(|| "<svg><rect/></svg>".to_string())
    }

    fn notice(&self, _container: &ContainerRef) -> Option<String> {
        None
    }
}

fn renderer() -> DocumentRenderer {
    DocumentRenderer::new(ThemeConfig::default())
}

const SAMPLE: &str = "# Plan\nSee [guide](https://a.io) and `cargo`\n\n- one\n```rust\nfn main() {}\n```\n```mermaid\ngraph TD; A-->B\n```";

#[test]
fn test_one_element_per_block() {
    let blocks = segment(SAMPLE);
    let tree = renderer().render(&blocks, Sender::Assistant, &DetachedPlacements);
    assert_eq!(tree.elements.len(), blocks.len());

    for (block, element) in blocks.iter().zip(&tree.elements) {
        let matched = matches!(
            (block, element),
            (BlockNode::Paragraph { .. }, Element::Paragraph { .. })
                | (BlockNode::Heading { .. }, Element::Heading { .. })
                | (BlockNode::ListBlock { .. }, Element::List { .. })
                | (BlockNode::CodeBlock { .. }, Element::CodeBlock { .. })
                | (BlockNode::DiagramBlock { .. }, Element::DiagramPlaceholder { .. })
                | (BlockNode::Break, Element::Break)
        );
        assert!(matched, "{block:?} rendered as {element:?}");
    }
}

#[test]
fn test_diagram_block_mounts_placeholder_with_controls() {
    let blocks = segment("```mermaid\ngraph TD; A-->B\n```");
    let BlockNode::DiagramBlock { id, .. } = &blocks[0] else {
        panic!("expected diagram block");
    };
    let sink = RecordingSink::default();
    let tree = renderer().render(&blocks, Sender::User, &sink);

    assert_eq!(
        *sink.registered.borrow(),
        vec![(id.clone(), "graph TD; A-->B".to_string())]
    );
    let Element::DiagramPlaceholder {
        id: placeholder_id,
        container,
        controls,
    } = &tree.elements[0]
    else {
        panic!("expected placeholder");
    };
    assert_eq!(placeholder_id, id);
    assert_eq!(container.host_id(), id.as_str());
    assert_eq!(controls[0].action, ControlAction::Export);
    assert_eq!(controls[1].action, ControlAction::Zoom);
    assert!(controls.iter().all(|c| &c.target == id));
    assert_eq!(tree.diagram_ids(), vec![id]);
}

#[test]
fn test_author_dependent_styling() {
    let blocks = segment(SAMPLE);
    let user = renderer().render(&blocks, Sender::User, &DetachedPlacements);
    let assistant = renderer().render(&blocks, Sender::Assistant, &DetachedPlacements);
    let user_theme = BubbleTheme::user();
    let assistant_theme = BubbleTheme::assistant();

    assert_eq!(user.background, user_theme.background);
    assert_eq!(assistant.background, assistant_theme.background);
    assert_ne!(user.background, assistant.background);

    let colors = |tree: &super::super::render::PresentationTree| {
        let mut paragraph = None;
        let mut bullet = None;
        let mut code_bg = None;
        for element in &tree.elements {
            match element {
                Element::Paragraph { color, .. } => paragraph = Some(*color),
                Element::List { bullet_color, .. } => bullet = Some(*bullet_color),
                Element::CodeBlock { background, .. } => code_bg = Some(*background),
                _ => {}
            }
        }
        (paragraph, bullet, code_bg)
    };
    assert_eq!(
        colors(&user),
        (
            Some(user_theme.text),
            Some(user_theme.bullet),
            Some(user_theme.code_block_bg)
        )
    );
    assert_eq!(
        colors(&assistant),
        (
            Some(assistant_theme.text),
            Some(assistant_theme.bullet),
            Some(assistant_theme.code_block_bg)
        )
    );
}

#[test]
fn test_inline_styles_resolved_from_theme() {
    let renderer = MessageRenderer::default();
    let theme = BubbleTheme::assistant();
    let segments = renderer.format_inline("See [guide](https://a.io) and `cargo`", Sender::Assistant);

    let link = segments.iter().find(|s| s.link_url.is_some()).unwrap();
    assert_eq!(link.text, "guide");
    assert_eq!(link.link_url.as_deref(), Some("https://a.io"));
    assert_eq!(link.fg, Some(theme.link));
    assert!(link.underline);

    let code = segments.iter().find(|s| s.monospace).unwrap();
    assert_eq!(code.text, "cargo");
    assert_eq!(code.bg, Some(theme.code_bg));

    // Same kinds for the user bubble, different colors.
    let user = renderer.format_inline("See [guide](https://a.io) and `cargo`", Sender::User);
    assert_eq!(user.len(), segments.len());
    let user_link = user.iter().find(|s| s.link_url.is_some()).unwrap();
    assert_eq!(user_link.fg, Some(BubbleTheme::user().link));
}

#[test]
fn test_heading_segments_use_heading_color() {
    let blocks = segment("## Next steps");
    let tree = renderer().render(&blocks, Sender::Assistant, &DetachedPlacements);
    let Element::Heading {
        level, segments, ..
    } = &tree.elements[0]
    else {
        panic!("expected heading");
    };
    assert_eq!(*level, 2);
    assert_eq!(segments[0].fg, Some(BubbleTheme::assistant().heading));
    assert!(segments[0].bold);
}

// -- HTML --

#[test]
fn test_html_escape() {
    assert_eq!(
        html_escape(r#"<a href="x">'&'</a>"#),
        "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
    );
}

#[test]
fn test_html_escapes_message_text() {
    let blocks = segment("<script>alert(1)</script> & <b>bold</b>");
    let tree = renderer().render(&blocks, Sender::User, &DetachedPlacements);
    let html = write_html(&tree, &EmptyPlaceholders, &HtmlOptions::default());
    assert!(!html.contains("<script>"));
    assert!(!html.contains("<b>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; &lt;b&gt;bold&lt;/b&gt;"));
    assert!(html.contains(r#"class="message message-user""#));
}

#[test]
fn test_html_links_and_target_option() {
    let blocks = segment("read [the guide](https://a.io/g?x=1&y=2)");
    let tree = renderer().render(&blocks, Sender::Assistant, &DetachedPlacements);

    let html = write_html(&tree, &EmptyPlaceholders, &HtmlOptions::default());
    assert!(html.contains(r#"<a href="https://a.io/g?x=1&amp;y=2" target="_blank" rel="noopener noreferrer""#));

    let html = write_html(
        &tree,
        &EmptyPlaceholders,
        &HtmlOptions {
            link_target_blank: false,
        },
    );
    assert!(!html.contains("target="));
    assert!(html.contains(r#"rel="noopener noreferrer""#));
}

#[test]
fn test_html_placeholder_reflects_fill_state() {
    let blocks = segment("```mermaid\ngraph TD; A-->B\n```");
    let tree = renderer().render(&blocks, Sender::Assistant, &DetachedPlacements);
    let id = tree.diagram_ids()[0].clone();

    let pending = write_html(&tree, &EmptyPlaceholders, &HtmlOptions::default());
    assert!(pending.contains(&format!(r#"id="{id}" data-processed="false""#)));
    assert!(pending.contains(r#"data-action="export""#));
    assert!(pending.contains(r#"data-action="zoom""#));
    assert!(!pending.contains("<svg"));

    let filled = write_html(
        &tree,
        &OneGraphic {
            container: ContainerRef::for_diagram(&id),
        },
        &HtmlOptions::default(),
    );
    assert!(filled.contains(&format!(r#"id="{id}" data-processed="true""#)));
    assert!(filled.contains("<svg><rect/></svg>"));
}

#[test]
fn test_message_renderer_round_trip_with_config() {
    let renderer = MessageRenderer::new(&ChatRenderConfig::default());
    let blocks = renderer.segment("Hello **there**");
    assert_eq!(renderer.to_source(&blocks), "Hello **there**");
    let tree = renderer.render(&blocks, Sender::User, &DetachedPlacements);
    let html = renderer.to_html(&tree, &EmptyPlaceholders);
    assert!(html.contains("<strong>there</strong>"));
}
