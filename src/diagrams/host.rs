//! Host surface: the commands the adapter issues against the UI shell.
//!
//! The adapter never touches a toolkit directly. It attaches graphics, shows
//! notices, writes exports, opens the zoom overlay and moves scroll positions
//! through [`HostSurface`]. [`StaticHost`] is the in-memory implementation used
//! by the HTML export and by tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;

use super::engine::{DiagramError, SvgGraphic};
use crate::markdown::{DiagramId, PlaceholderContent};

/// Stable host identifier of a diagram placeholder container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContainerRef(String);

impl ContainerRef {
    /// The container mounted for a diagram block. Shares the diagram's id.
    pub fn for_diagram(id: &DiagramId) -> Self {
        Self(id.as_str().to_string())
    }

    pub fn host_id(&self) -> &str {
        &self.0
    }
}

/// Identifier of an open zoom overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

/// A modal overlay showing an enlarged copy of a diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomOverlay {
    pub id: OverlayId,
    pub diagram: DiagramId,
    /// Cloned SVG with its root size multiplied by the zoom scale.
    pub svg: String,
    pub width: f32,
    pub height: f32,
}

/// Input delivered to an open overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    BackdropClick,
    CloseButton,
    ContentClick,
    Key(String),
}

impl OverlayEvent {
    /// Whether this event dismisses the overlay.
    pub fn closes_overlay(&self) -> bool {
        match self {
            OverlayEvent::BackdropClick | OverlayEvent::CloseButton => true,
            OverlayEvent::Key(key) => key == "Escape",
            OverlayEvent::ContentClick => false,
        }
    }
}

/// Commands against the surrounding UI.
///
/// Implementations must not call back into the adapter; the adapter may hold
/// its own lock while issuing these.
pub trait HostSurface: Send + Sync {
    /// Draw `graphic` inside `container`.
    fn attach_graphic(&self, container: &ContainerRef, graphic: &SvgGraphic);

    /// Show an inline notice inside `container` instead of a graphic.
    fn show_notice(&self, container: &ContainerRef, notice: &str);

    /// Offer `bytes` as a downloadable file named `filename`; returns where it went.
    fn export_graphic(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DiagramError>;

    fn open_overlay(&self, overlay: &ZoomOverlay);
    fn close_overlay(&self, id: OverlayId);

    /// Start delivering key events to `overlay`.
    fn listen_keys(&self, overlay: OverlayId);
    /// Stop delivering key events to `overlay`.
    fn unlisten_keys(&self, overlay: OverlayId);

    /// Current `(x, y)` scroll offset of `container`.
    fn scroll_offset(&self, container: &ContainerRef) -> (f64, f64);
    fn scroll_to(&self, container: &ContainerRef, x: f64, y: f64);
}

// ---------------------------------------------------------------------------
// StaticHost
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StaticHostState {
    graphics: HashMap<ContainerRef, String>,
    attach_counts: HashMap<ContainerRef, usize>,
    notices: HashMap<ContainerRef, String>,
    overlays: Vec<ZoomOverlay>,
    key_listeners: HashSet<OverlayId>,
    scroll: HashMap<ContainerRef, (f64, f64)>,
    exports: Vec<PathBuf>,
}

/// In-memory host that records every command and writes exports to a directory.
pub struct StaticHost {
    export_dir: PathBuf,
    state: Mutex<StaticHostState>,
}

impl StaticHost {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            state: Mutex::new(StaticHostState::default()),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// SVG attached to `container`, if any.
    pub fn graphic(&self, container: &ContainerRef) -> Option<String> {
        self.state.lock().graphics.get(container).cloned()
    }

    /// How many times a graphic was attached to `container`.
    pub fn attach_count(&self, container: &ContainerRef) -> usize {
        self.state
            .lock()
            .attach_counts
            .get(container)
            .copied()
            .unwrap_or(0)
    }

    pub fn notice(&self, container: &ContainerRef) -> Option<String> {
        self.state.lock().notices.get(container).cloned()
    }

    /// Overlays currently open.
    pub fn open_overlays(&self) -> Vec<ZoomOverlay> {
        self.state.lock().overlays.clone()
    }

    pub fn key_listener_count(&self) -> usize {
        self.state.lock().key_listeners.len()
    }

    pub fn exported_files(&self) -> Vec<PathBuf> {
        self.state.lock().exports.clone()
    }
}

impl HostSurface for StaticHost {
    fn attach_graphic(&self, container: &ContainerRef, graphic: &SvgGraphic) {
        let mut state = self.state.lock();
        state.notices.remove(container);
        state
            .graphics
            .insert(container.clone(), graphic.as_str().to_string());
        *state.attach_counts.entry(container.clone()).or_insert(0) += 1;
    }

    fn show_notice(&self, container: &ContainerRef, notice: &str) {
        self.state
            .lock()
            .notices
            .insert(container.clone(), notice.to_string());
    }

    fn export_graphic(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DiagramError> {
        std::fs::create_dir_all(&self.export_dir).map_err(|source| DiagramError::Export {
            path: self.export_dir.clone(),
            source,
        })?;
        let path = self.export_dir.join(filename);
        std::fs::write(&path, bytes).map_err(|source| DiagramError::Export {
            path: path.clone(),
            source,
        })?;
        self.state.lock().exports.push(path.clone());
        Ok(path)
    }

    fn open_overlay(&self, overlay: &ZoomOverlay) {
        self.state.lock().overlays.push(overlay.clone());
    }

    fn close_overlay(&self, id: OverlayId) {
        self.state.lock().overlays.retain(|o| o.id != id);
    }

    fn listen_keys(&self, overlay: OverlayId) {
        self.state.lock().key_listeners.insert(overlay);
    }

    fn unlisten_keys(&self, overlay: OverlayId) {
        self.state.lock().key_listeners.remove(&overlay);
    }

    fn scroll_offset(&self, container: &ContainerRef) -> (f64, f64) {
        self.state
            .lock()
            .scroll
            .get(container)
            .copied()
            .unwrap_or((0.0, 0.0))
    }

    fn scroll_to(&self, container: &ContainerRef, x: f64, y: f64) {
        self.state.lock().scroll.insert(container.clone(), (x, y));
    }
}

impl PlaceholderContent for StaticHost {
    fn graphic(&self, container: &ContainerRef) -> Option<String> {
        StaticHost::graphic(self, container)
    }

    fn notice(&self, container: &ContainerRef) -> Option<String> {
        StaticHost::notice(self, container)
    }
}
