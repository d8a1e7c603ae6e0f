//! Per-diagram placement state: rendered graphic, processed flag, drag session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::engine::SvgGraphic;
use super::host::ContainerRef;
use crate::config::BubbleTheme;
use crate::markdown::DiagramId;

/// Liveness token of a mounted message view.
///
/// Cloned into every placement the view registers; asynchronous completions
/// check it before touching a container.
#[derive(Debug, Clone)]
pub struct ViewHandle {
    alive: Arc<AtomicBool>,
}

impl Default for ViewHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewHandle {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Mark the view unmounted. Irreversible.
    pub fn unmount(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Whether two handles belong to the same view.
    pub fn same_view(&self, other: &ViewHandle) -> bool {
        Arc::ptr_eq(&self.alive, &other.alive)
    }
}

/// Pointer-drag panning session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragState {
    pub active: bool,
    pub origin_x: f64,
    pub origin_y: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl DragState {
    /// Start a session at pointer `(x, y)` with the container's current scroll offset.
    pub fn begin(&mut self, x: f64, y: f64, scroll: (f64, f64)) {
        *self = DragState {
            active: true,
            origin_x: x,
            origin_y: y,
            scroll_x: scroll.0,
            scroll_y: scroll.1,
        };
    }

    /// Scroll offset for pointer `(x, y)`, or `None` outside a session.
    pub fn scroll_for(&self, x: f64, y: f64, multiplier: f64) -> Option<(f64, f64)> {
        if !self.active {
            return None;
        }
        Some((
            self.scroll_x - (x - self.origin_x) * multiplier,
            self.scroll_y - (y - self.origin_y) * multiplier,
        ))
    }

    pub fn end(&mut self) {
        self.active = false;
    }
}

/// Live association between a diagram block and its (eventual) graphic.
#[derive(Debug, Clone)]
pub struct DiagramPlacement {
    pub id: DiagramId,
    pub container: ContainerRef,
    pub source: String,
    pub view: ViewHandle,
    /// Bubble of the message that owns the diagram; `None` uses the engine's own theme.
    pub theme: Option<BubbleTheme>,
    /// Set exactly once, when the engine's graphic is attached.
    pub rendered_svg: Option<SvgGraphic>,
    /// Written at most once; a processed placement is never submitted again.
    pub processed: bool,
    /// Queued or in flight.
    pub scheduled: bool,
    pub drag: DragState,
}

impl DiagramPlacement {
    pub fn new(id: DiagramId, container: ContainerRef, source: String, view: ViewHandle) -> Self {
        Self {
            id,
            container,
            source,
            view,
            theme: None,
            rendered_svg: None,
            processed: false,
            scheduled: false,
            drag: DragState::default(),
        }
    }

    /// Eligible for submission to the engine.
    pub fn is_pending(&self) -> bool {
        !self.processed && !self.scheduled && self.view.is_alive()
    }
}
