//! Document rendering: block nodes to a styled presentation tree.
//!
//! Every [`BlockNode`] variant maps to exactly one [`Element`]. Diagram
//! blocks become placeholders carrying the block id and two controls
//! (export, zoom); each one is announced to a [`PlacementSink`] so the diagram
//! engine adapter can fill it in later. No diagram layout happens here.

use serde::Serialize;

use super::blocks::BlockNode;
use super::diagram_id::DiagramId;
use super::inline::{RunKind, TextRun};
use crate::config::{BubbleTheme, ThemeConfig};
use crate::diagrams::ContainerRef;
use crate::message::Sender;

// ---------------------------------------------------------------------------
// Presentation types
// ---------------------------------------------------------------------------

/// A run of text with resolved colors and attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyledSegment {
    pub text: String,
    /// Foreground color as [r, g, b].
    pub fg: Option<[u8; 3]>,
    /// Background color as [r, g, b].
    pub bg: Option<[u8; 3]>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub monospace: bool,
    /// Sanitized `http`/`https` target for link segments.
    pub link_url: Option<String>,
}

/// What a diagram control does when activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Export,
    Zoom,
}

/// A button mounted next to a diagram placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramControl {
    pub action: ControlAction,
    pub label: &'static str,
    pub target: DiagramId,
}

impl DiagramControl {
    fn for_diagram(id: &DiagramId) -> [DiagramControl; 2] {
        [
            DiagramControl {
                action: ControlAction::Export,
                label: "Export SVG",
                target: id.clone(),
            },
            DiagramControl {
                action: ControlAction::Zoom,
                label: "Zoom",
                target: id.clone(),
            },
        ]
    }
}

/// A presentational element, one per block node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum Element {
    Paragraph {
        color: [u8; 3],
        segments: Vec<StyledSegment>,
    },
    Heading {
        level: u8,
        color: [u8; 3],
        segments: Vec<StyledSegment>,
    },
    List {
        ordered: bool,
        bullet_color: [u8; 3],
        items: Vec<Vec<StyledSegment>>,
    },
    CodeBlock {
        language: Option<String>,
        lines: Vec<String>,
        foreground: [u8; 3],
        background: [u8; 3],
    },
    DiagramPlaceholder {
        id: DiagramId,
        container: ContainerRef,
        controls: [DiagramControl; 2],
    },
    Break,
}

/// Rendered form of one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationTree {
    pub author: Sender,
    pub background: [u8; 3],
    pub text_color: [u8; 3],
    pub elements: Vec<Element>,
}

impl PresentationTree {
    /// Ids of the diagram placeholders, in document order.
    pub fn diagram_ids(&self) -> Vec<&DiagramId> {
        self.elements
            .iter()
            .filter_map(|el| match el {
                Element::DiagramPlaceholder { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }
}

/// Receives one registration per diagram placeholder the renderer mounts.
pub trait PlacementSink {
    /// Register a placement for `id` and return the container it will be drawn
    /// into. `theme` is the bubble of the message that contains the diagram.
    fn register_placement(&self, id: &DiagramId, source: &str, theme: &BubbleTheme) -> ContainerRef;
}

/// Sink that only derives containers; for rendering without diagram fill-in.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedPlacements;

impl PlacementSink for DetachedPlacements {
    fn register_placement(&self, id: &DiagramId, _source: &str, _theme: &BubbleTheme) -> ContainerRef {
        ContainerRef::for_diagram(id)
    }
}

// ---------------------------------------------------------------------------
// Styling
// ---------------------------------------------------------------------------

/// Resolve run kinds to styled segments using a bubble theme.
pub fn style_runs(runs: &[TextRun], theme: &BubbleTheme) -> Vec<StyledSegment> {
    runs.iter()
        .map(|run| {
            let mut seg = StyledSegment {
                text: run.text.clone(),
                ..Default::default()
            };
            match run.kind {
                RunKind::Plain => {}
                RunKind::Bold => seg.bold = true,
                RunKind::Italic => seg.italic = true,
                RunKind::Code => {
                    seg.fg = Some(theme.code_fg);
                    seg.bg = Some(theme.code_bg);
                    seg.monospace = true;
                }
                RunKind::Link => {
                    seg.fg = Some(theme.link);
                    seg.underline = true;
                    seg.link_url = run.href.clone();
                }
            }
            seg
        })
        .collect()
}

// ---------------------------------------------------------------------------
// DocumentRenderer
// ---------------------------------------------------------------------------

/// Maps block nodes to presentation elements with author-dependent styling.
#[derive(Debug, Clone, Default)]
pub struct DocumentRenderer {
    theme: ThemeConfig,
}

impl DocumentRenderer {
    pub fn new(theme: ThemeConfig) -> Self {
        Self { theme }
    }

    /// Bubble theme for a message author.
    pub fn theme_for(&self, author: Sender) -> &BubbleTheme {
        match author {
            Sender::User => &self.theme.user,
            Sender::Assistant => &self.theme.assistant,
        }
    }

    /// Render blocks into a presentation tree, registering every diagram
    /// placeholder with `placements`.
    pub fn render(
        &self,
        blocks: &[BlockNode],
        author: Sender,
        placements: &dyn PlacementSink,
    ) -> PresentationTree {
        let theme = self.theme_for(author);
        let elements = blocks
            .iter()
            .map(|block| self.render_block(block, theme, placements))
            .collect();

        PresentationTree {
            author,
            background: theme.background,
            text_color: theme.text,
            elements,
        }
    }

    fn render_block(
        &self,
        block: &BlockNode,
        theme: &BubbleTheme,
        placements: &dyn PlacementSink,
    ) -> Element {
        match block {
            BlockNode::Paragraph { runs } => Element::Paragraph {
                color: theme.text,
                segments: style_runs(runs, theme),
            },
            BlockNode::Heading { level, runs } => {
                let mut segments = style_runs(runs, theme);
                for seg in &mut segments {
                    // Links keep their own color inside headings.
                    if seg.link_url.is_none() && !seg.monospace {
                        seg.fg = Some(theme.heading);
                    }
                    seg.bold = seg.bold || *level <= 2;
                }
                Element::Heading {
                    level: *level,
                    color: theme.heading,
                    segments,
                }
            }
            BlockNode::ListBlock { ordered, items } => Element::List {
                ordered: *ordered,
                bullet_color: theme.bullet,
                items: items.iter().map(|item| style_runs(item, theme)).collect(),
            },
            BlockNode::CodeBlock { language, lines } => Element::CodeBlock {
                language: language.clone(),
                lines: lines.clone(),
                foreground: theme.text,
                background: theme.code_block_bg,
            },
            BlockNode::DiagramBlock { id, source } => {
                let container = placements.register_placement(id, source, theme);
                crate::debug_log!("MARKDOWN", "mounted placeholder for diagram {}", id);
                Element::DiagramPlaceholder {
                    id: id.clone(),
                    container,
                    controls: DiagramControl::for_diagram(id),
                }
            }
            BlockNode::Break => Element::Break,
        }
    }
}
