//! Chat message markdown: parsing, diagram extraction and document rendering.
//!
//! A message body is processed in two steps. **Segmentation** groups lines
//! into [`BlockNode`]s (paragraphs, headings, lists, fenced code, fenced
//! diagrams, breaks), formatting inline text into [`TextRun`]s as it goes.
//! **Rendering** maps blocks to a [`PresentationTree`] with author-dependent
//! colors and mounts a placeholder for each diagram block.
//!
//! Sub-modules:
//! - [`blocks`] - line-driven block segmentation and source re-emission
//! - [`diagram_id`] - process-unique diagram identifiers
//! - [`html`] - HTML serialization of presentation trees
//! - [`inline`] - the inline formatting pass pipeline
//! - [`links`] - URL normalization and the scheme allow-list
//! - [`regexes`] - compiled regular expressions
//! - [`render`] - block nodes to presentation elements

pub mod blocks;
pub mod diagram_id;
pub mod html;
pub mod inline;
pub mod links;
mod regexes;
pub mod render;

#[cfg(test)]
mod tests;

pub use blocks::{BlockNode, BlockSegmenter, blocks_to_source, segment};
pub use diagram_id::DiagramId;
pub use html::{EmptyPlaceholders, HtmlOptions, PlaceholderContent, write_html, write_page};
pub use inline::{InlineFormatter, RunKind, TextRun, format_line, runs_text, runs_to_markdown};
pub use links::normalize_url;
pub use render::{
    ControlAction, DetachedPlacements, DiagramControl, DocumentRenderer, Element, PlacementSink,
    PresentationTree, StyledSegment, style_runs,
};

use crate::config::ChatRenderConfig;
use crate::message::Sender;

/// Configured segmenter, formatter, renderer and HTML options.
#[derive(Debug, Clone, Default)]
pub struct MessageRenderer {
    segmenter: BlockSegmenter,
    formatter: InlineFormatter,
    document: DocumentRenderer,
    html: HtmlOptions,
}

impl MessageRenderer {
    pub fn new(config: &ChatRenderConfig) -> Self {
        Self {
            segmenter: BlockSegmenter::new(&config.markdown),
            formatter: InlineFormatter::new(&config.markdown),
            document: DocumentRenderer::new(config.theme.clone()),
            html: HtmlOptions::new(&config.markdown),
        }
    }

    pub fn segment(&self, body: &str) -> Vec<BlockNode> {
        self.segmenter.segment(body)
    }

    /// Format one line and style it for `author`.
    pub fn format_inline(&self, line: &str, author: Sender) -> Vec<StyledSegment> {
        let runs = self.formatter.format_line(line);
        style_runs(&runs, self.document.theme_for(author))
    }

    pub fn render(
        &self,
        blocks: &[BlockNode],
        author: Sender,
        placements: &dyn PlacementSink,
    ) -> PresentationTree {
        self.document.render(blocks, author, placements)
    }

    pub fn to_html(&self, tree: &PresentationTree, content: &dyn PlaceholderContent) -> String {
        write_html(tree, content, &self.html)
    }

    pub fn to_source(&self, blocks: &[BlockNode]) -> String {
        self.segmenter.to_source(blocks)
    }
}
