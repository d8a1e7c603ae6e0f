//! Block segmentation: a message body to an ordered sequence of [`BlockNode`]s.
//!
//! A single pass over the body's lines drives a three-state machine:
//!
//! - `Normal`: headings, list items, blank lines and paragraphs.
//! - `InCodeFence`: lines are captured verbatim until a closing fence.
//! - `InDiagramFence`: same, for fences tagged with a diagram keyword; the
//!   captured source becomes a [`BlockNode::DiagramBlock`] with a fresh id.
//!
//! List items accumulate until a non-list line ends the run. An unterminated
//! fence is closed at end of input, never discarded.
//!
//! Blank lines: a blank line flushes any pending list and yields a `Break`
//! only when the most recent block is a paragraph, code block or diagram.
//! Blank lines after headings, lists, other breaks, or before any content
//! are absorbed.
//!
//! A heading needs text after its markers: a lone `#` or `## ` line is a
//! paragraph.

use serde::{Deserialize, Serialize};

use super::diagram_id::DiagramId;
use super::inline::{InlineFormatter, TextRun};
use super::regexes::{re_fence_open, re_header, re_ordered_list, re_unordered_list};
use crate::config::MarkdownConfig;

const FENCE: &str = "```";

// ---------------------------------------------------------------------------
// Block node type
// ---------------------------------------------------------------------------

/// A block-level element of a message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockNode {
    Paragraph {
        runs: Vec<TextRun>,
    },
    Heading {
        /// 1..=6
        level: u8,
        runs: Vec<TextRun>,
    },
    ListBlock {
        ordered: bool,
        items: Vec<Vec<TextRun>>,
    },
    CodeBlock {
        language: Option<String>,
        lines: Vec<String>,
    },
    DiagramBlock {
        id: DiagramId,
        /// Fence body, byte-for-byte (lines joined with `\n`).
        source: String,
    },
    Break,
}

impl BlockNode {
    /// Short name used in logs and the `inspect` command.
    pub fn kind_name(&self) -> &'static str {
        match self {
            BlockNode::Paragraph { .. } => "paragraph",
            BlockNode::Heading { .. } => "heading",
            BlockNode::ListBlock { .. } => "list",
            BlockNode::CodeBlock { .. } => "code",
            BlockNode::DiagramBlock { .. } => "diagram",
            BlockNode::Break => "break",
        }
    }

    /// Equality that ignores diagram ids (fresh ids are generated per segmentation).
    pub fn equivalent(&self, other: &BlockNode) -> bool {
        match (self, other) {
            (
                BlockNode::DiagramBlock { source: a, .. },
                BlockNode::DiagramBlock { source: b, .. },
            ) => a == b,
            _ => self == other,
        }
    }
}

// ---------------------------------------------------------------------------
// Segmenter state
// ---------------------------------------------------------------------------

/// Fence state of the segmenter.
#[derive(Debug)]
enum SegmenterState {
    Normal,
    InCodeFence {
        language: Option<String>,
        lines: Vec<String>,
    },
    InDiagramFence {
        lines: Vec<String>,
    },
}

/// Pending list items (not yet formatted).
#[derive(Debug)]
struct ListAccumulator {
    ordered: bool,
    items: Vec<String>,
}

/// Per-call segmentation state.
struct Segmentation<'a> {
    formatter: &'a InlineFormatter,
    config: &'a MarkdownConfig,
    state: SegmenterState,
    list: Option<ListAccumulator>,
    blocks: Vec<BlockNode>,
}

impl<'a> Segmentation<'a> {
    fn new(formatter: &'a InlineFormatter, config: &'a MarkdownConfig) -> Self {
        Self {
            formatter,
            config,
            state: SegmenterState::Normal,
            list: None,
            blocks: Vec::new(),
        }
    }

    fn feed(&mut self, line: &str) {
        if matches!(self.state, SegmenterState::Normal) {
            self.feed_normal(line);
            return;
        }
        if line.trim() == FENCE {
            self.close_fence();
            return;
        }
        if let SegmenterState::InCodeFence { lines, .. } | SegmenterState::InDiagramFence { lines } =
            &mut self.state
        {
            lines.push(line.to_string());
        }
    }

    fn feed_normal(&mut self, line: &str) {
        if let Some(caps) = re_fence_open().captures(line) {
            self.flush_list();
            let tag = caps.get(1).map_or("", |m| m.as_str());
            self.state = if !tag.is_empty() && self.config.is_diagram_language(tag) {
                SegmenterState::InDiagramFence { lines: Vec::new() }
            } else {
                SegmenterState::InCodeFence {
                    language: (!tag.is_empty()).then(|| tag.to_string()),
                    lines: Vec::new(),
                }
            };
            return;
        }

        if line.trim().is_empty() {
            self.flush_list();
            if matches!(
                self.blocks.last(),
                Some(
                    BlockNode::Paragraph { .. }
                        | BlockNode::CodeBlock { .. }
                        | BlockNode::DiagramBlock { .. }
                )
            ) {
                self.blocks.push(BlockNode::Break);
            }
            return;
        }

        if let Some(caps) = re_header().captures(line) {
            self.flush_list();
            let level = caps.get(1).map_or(1, |m| m.as_str().len()) as u8;
            let text = caps.get(2).map_or("", |m| m.as_str());
            self.blocks.push(BlockNode::Heading {
                level,
                runs: self.formatter.format_line(text),
            });
            return;
        }

        if let Some(caps) = re_unordered_list().captures(line) {
            self.push_list_item(false, caps.get(1).map_or("", |m| m.as_str()));
            return;
        }

        if let Some(caps) = re_ordered_list().captures(line) {
            self.push_list_item(true, caps.get(1).map_or("", |m| m.as_str()));
            return;
        }

        self.flush_list();
        self.blocks.push(BlockNode::Paragraph {
            runs: self.formatter.format_line(line),
        });
    }

    fn push_list_item(&mut self, ordered: bool, text: &str) {
        if self.list.as_ref().is_some_and(|list| list.ordered != ordered) {
            self.flush_list();
        }
        self.list
            .get_or_insert_with(|| ListAccumulator {
                ordered,
                items: Vec::new(),
            })
            .items
            .push(text.to_string());
    }

    fn flush_list(&mut self) {
        if let Some(list) = self.list.take() {
            let items = list
                .items
                .iter()
                .map(|item| self.formatter.format_line(item))
                .collect();
            self.blocks.push(BlockNode::ListBlock {
                ordered: list.ordered,
                items,
            });
        }
    }

    fn close_fence(&mut self) {
        match std::mem::replace(&mut self.state, SegmenterState::Normal) {
            SegmenterState::InCodeFence { language, lines } => {
                self.blocks.push(BlockNode::CodeBlock { language, lines });
            }
            SegmenterState::InDiagramFence { lines } => {
                let id = DiagramId::generate();
                crate::debug_log!(
                    "MARKDOWN",
                    "extracted diagram {} ({} source lines)",
                    id,
                    lines.len()
                );
                self.blocks.push(BlockNode::DiagramBlock {
                    id,
                    source: lines.join("\n"),
                });
            }
            SegmenterState::Normal => {}
        }
    }

    fn finish(mut self) -> Vec<BlockNode> {
        if !matches!(self.state, SegmenterState::Normal) {
            crate::debug_log!("MARKDOWN", "unterminated fence closed at end of input");
            self.close_fence();
        }
        self.flush_list();
        self.blocks
    }
}

// ---------------------------------------------------------------------------
// Segmenter
// ---------------------------------------------------------------------------

/// Groups message lines into block nodes.
#[derive(Debug, Clone, Default)]
pub struct BlockSegmenter {
    formatter: InlineFormatter,
    config: MarkdownConfig,
}

impl BlockSegmenter {
    pub fn new(config: &MarkdownConfig) -> Self {
        Self {
            formatter: InlineFormatter::new(config),
            config: config.clone(),
        }
    }

    /// Segment a message body. Synchronous, infallible, and order-preserving.
    pub fn segment(&self, body: &str) -> Vec<BlockNode> {
        let mut segmentation = Segmentation::new(&self.formatter, &self.config);
        for line in body.lines() {
            segmentation.feed(line);
        }
        let blocks = segmentation.finish();
        crate::debug_log!("MARKDOWN", "segmented body into {} blocks", blocks.len());
        blocks
    }

    /// Re-emit blocks as a message body using this segmenter's diagram keyword.
    pub fn to_source(&self, blocks: &[BlockNode]) -> String {
        let keyword = self
            .config
            .diagram_languages
            .first()
            .map_or("mermaid", String::as_str);
        write_source(blocks, keyword, &self.formatter)
    }
}

/// Segment a message body with the default configuration.
pub fn segment(body: &str) -> Vec<BlockNode> {
    BlockSegmenter::default().segment(body)
}

/// Re-emit a block sequence as a message body (diagrams fenced as `mermaid`).
///
/// Segmenting the result yields a sequence equivalent to `blocks`
/// (see [`BlockNode::equivalent`]).
pub fn blocks_to_source(blocks: &[BlockNode]) -> String {
    write_source(blocks, "mermaid", &InlineFormatter::default())
}

fn write_source(blocks: &[BlockNode], diagram_keyword: &str, formatter: &InlineFormatter) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous: Option<&BlockNode> = None;

    for block in blocks {
        // Adjacent lists were separated by an absorbed blank line.
        if matches!(previous, Some(BlockNode::ListBlock { .. }))
            && matches!(block, BlockNode::ListBlock { .. })
        {
            lines.push(String::new());
        }

        match block {
            BlockNode::Paragraph { runs } => lines.push(formatter.to_markdown(runs)),
            BlockNode::Heading { level, runs } => {
                lines.push(format!(
                    "{} {}",
                    "#".repeat(usize::from(*level)),
                    formatter.to_markdown(runs)
                ));
            }
            BlockNode::ListBlock { ordered, items } => {
                for (i, item) in items.iter().enumerate() {
                    let marker = if *ordered {
                        format!("{}.", i + 1)
                    } else {
                        "-".to_string()
                    };
                    lines.push(format!("{marker} {}", formatter.to_markdown(item)));
                }
            }
            BlockNode::CodeBlock { language, lines: code } => {
                lines.push(format!("{FENCE}{}", language.as_deref().unwrap_or_default()));
                lines.extend(code.iter().cloned());
                lines.push(FENCE.to_string());
            }
            BlockNode::DiagramBlock { source, .. } => {
                lines.push(format!("{FENCE}{diagram_keyword}"));
                if !source.is_empty() {
                    lines.push(source.clone());
                }
                lines.push(FENCE.to_string());
            }
            BlockNode::Break => lines.push(String::new()),
        }
        previous = Some(block);
    }

    // The joined text has no final newline, so a closing blank line needs
    // one more empty line to survive `str::lines`.
    if matches!(blocks.last(), Some(BlockNode::Break)) {
        lines.push(String::new());
    }
    lines.join("\n")
}
