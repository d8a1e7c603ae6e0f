//! Message view lifecycle.
//!
//! A [`MessageView`] is one mounted message: its segmented blocks, its
//! presentation tree and the [`ViewHandle`] that owns its diagram placements.
//! Blocks are segmented once at mount, so diagram ids stay stable across
//! re-renders and a placement is never registered twice.

use chrono::{DateTime, Local, Utc};

use crate::diagrams::{DiagramEngineAdapter, ViewHandle};
use crate::markdown::{BlockNode, MessageRenderer, PlaceholderContent, PresentationTree};
use crate::message::{Message, Sender};

pub struct MessageView {
    sender: Sender,
    timestamp: i64,
    handle: ViewHandle,
    blocks: Vec<BlockNode>,
    tree: PresentationTree,
}

impl MessageView {
    /// Segment and render `message`, registering its diagrams with `adapter`.
    ///
    /// Placements are only queued; call [`DiagramEngineAdapter::process_pending`]
    /// to fill them.
    pub fn mount(
        message: &Message,
        renderer: &MessageRenderer,
        adapter: &DiagramEngineAdapter,
    ) -> Self {
        let handle = ViewHandle::new();
        let blocks = renderer.segment(&message.raw_text);
        let tree = renderer.render(&blocks, message.sender, &adapter.placements_for(&handle));
        crate::debug_log!(
            "VIEW",
            "mounted {:?} message: {} blocks, {} diagrams",
            message.sender,
            blocks.len(),
            tree.diagram_ids().len()
        );
        Self {
            sender: message.sender,
            timestamp: message.timestamp,
            handle,
            blocks,
            tree,
        }
    }

    /// Rebuild the presentation tree from the mounted blocks.
    ///
    /// Already-known diagram ids keep their placement; nothing is re-queued.
    pub fn rerender(&mut self, renderer: &MessageRenderer, adapter: &DiagramEngineAdapter) {
        self.tree = renderer.render(
            &self.blocks,
            self.sender,
            &adapter.placements_for(&self.handle),
        );
    }

    /// Tear the view down. Returns the number of placements dropped.
    pub fn unmount(&self, adapter: &DiagramEngineAdapter) -> usize {
        adapter.unmount_view(&self.handle)
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn handle(&self) -> &ViewHandle {
        &self.handle
    }

    pub fn blocks(&self) -> &[BlockNode] {
        &self.blocks
    }

    pub fn tree(&self) -> &PresentationTree {
        &self.tree
    }

    pub fn is_mounted(&self) -> bool {
        self.handle.is_alive()
    }

    /// Local time label for the message timestamp, e.g. `2024-05-01 14:03`.
    pub fn timestamp_label(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
            .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }

    /// The message article followed by its timestamp.
    pub fn to_html(&self, renderer: &MessageRenderer, content: &dyn PlaceholderContent) -> String {
        let mut html = renderer.to_html(&self.tree, content);
        let label = self.timestamp_label();
        if !label.is_empty() {
            html.push_str(&format!(
                "<time class=\"timestamp {}\">{label}</time>\n",
                self.sender.css_class()
            ));
        }
        html
    }
}

/// Mount every message in order, then fill their diagrams.
pub async fn render_transcript(
    messages: &[Message],
    renderer: &MessageRenderer,
    adapter: &DiagramEngineAdapter,
) -> Vec<MessageView> {
    let views: Vec<MessageView> = messages
        .iter()
        .map(|message| MessageView::mount(message, renderer, adapter))
        .collect();
    let attached = adapter.process_pending().await;
    crate::debug_info!(
        "VIEW",
        "rendered {} messages, attached {} diagrams",
        views.len(),
        attached
    );
    views
}
