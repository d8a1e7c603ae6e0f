//! The diagram engine adapter: fills diagram placeholders asynchronously.
//!
//! Placements are registered synchronously while a message renders and
//! queued in document order. [`DiagramEngineAdapter::process_pending`] acquires
//! the engine (`Unloaded → Loading → Ready`), submits every queued source,
//! and attaches each graphic as it completes. Completion order is not
//! guaranteed; every completion is checked against the owning view's
//! liveness and the placement's processed flag before the container is touched.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;

use super::engine::{DiagramError, EngineCell, EngineLoader, SvgGraphic};
use super::host::{ContainerRef, HostSurface, OverlayEvent, OverlayId, ZoomOverlay};
use super::placement::{DiagramPlacement, ViewHandle};
use super::svg_utils::{svg_size, svg_to_png_bytes, with_root_size};
use crate::config::{BubbleTheme, DiagramConfig};
use crate::markdown::{DiagramId, PlacementSink};

/// Overlay size used when an SVG does not declare one usable by usvg.
const FALLBACK_OVERLAY_SIZE: (f32, f32) = (800.0, 600.0);

/// Engine acquisition state of one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
    /// The last acquisition failed; the next `process_pending` retries.
    Failed,
}

/// File format for [`DiagramEngineAdapter::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Svg,
    Png,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Svg => "svg",
            ExportFormat::Png => "png",
        }
    }
}

/// Pointer input on a diagram container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
    Leave,
}

struct AdapterState {
    engine: EngineState,
    placements: HashMap<DiagramId, DiagramPlacement>,
    /// Registration (document) order.
    order: Vec<DiagramId>,
    queue: VecDeque<DiagramId>,
    overlay: Option<(OverlayId, DiagramId)>,
    next_overlay: u64,
}

/// Work item handed to an engine task.
struct Submission {
    id: DiagramId,
    container: ContainerRef,
    source: String,
    theme: Option<BubbleTheme>,
}

pub struct DiagramEngineAdapter {
    cell: Arc<EngineCell>,
    loader: Arc<dyn EngineLoader>,
    host: Arc<dyn HostSurface>,
    config: DiagramConfig,
    state: Mutex<AdapterState>,
}

impl DiagramEngineAdapter {
    pub fn new(
        cell: Arc<EngineCell>,
        loader: Arc<dyn EngineLoader>,
        host: Arc<dyn HostSurface>,
        config: DiagramConfig,
    ) -> Self {
        let engine = if cell.get().is_some() {
            EngineState::Ready
        } else {
            EngineState::Unloaded
        };
        Self {
            cell,
            loader,
            host,
            config,
            state: Mutex::new(AdapterState {
                engine,
                placements: HashMap::new(),
                order: Vec::new(),
                queue: VecDeque::new(),
                overlay: None,
                next_overlay: 1,
            }),
        }
    }

    pub fn engine_state(&self) -> EngineState {
        self.state.lock().engine
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a placement for `id`, owned by `view`. Re-registering a known
    /// id returns its existing container and schedules nothing.
    pub fn register(&self, id: &DiagramId, source: &str, view: &ViewHandle) -> ContainerRef {
        self.register_themed(id, source, None, view)
    }

    /// [`register`](Self::register), rendering the diagram in `theme`'s colors.
    pub fn register_themed(
        &self,
        id: &DiagramId,
        source: &str,
        theme: Option<&BubbleTheme>,
        view: &ViewHandle,
    ) -> ContainerRef {
        let mut state = self.state.lock();
        if let Some(existing) = state.placements.get(id) {
            crate::debug_trace!("DIAGRAM", "placement {} already registered", id);
            return existing.container.clone();
        }

        let container = ContainerRef::for_diagram(id);
        let mut placement =
            DiagramPlacement::new(id.clone(), container.clone(), source.to_string(), view.clone());
        placement.theme = theme.cloned();
        placement.scheduled = true;
        state.placements.insert(id.clone(), placement);
        state.order.push(id.clone());
        state.queue.push_back(id.clone());
        crate::debug_log!("DIAGRAM", "queued placement {}", id);
        container
    }

    /// A [`PlacementSink`] that registers placements owned by `view`.
    pub fn placements_for<'a>(&'a self, view: &'a ViewHandle) -> ViewPlacements<'a> {
        ViewPlacements {
            adapter: self,
            view,
        }
    }

    /// Queue every live placement that is neither processed nor in flight,
    /// e.g. after an engine load failure. Returns how many were queued.
    pub fn reschedule_unprocessed(&self) -> usize {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let placements = &state.placements;
        let ids: Vec<DiagramId> = state
            .order
            .iter()
            .filter(|id| placements.get(*id).is_some_and(DiagramPlacement::is_pending))
            .cloned()
            .collect();
        for id in &ids {
            if let Some(placement) = state.placements.get_mut(id) {
                placement.scheduled = true;
            }
            state.queue.push_back(id.clone());
        }
        ids.len()
    }

    // -----------------------------------------------------------------------
    // Fill-in
    // -----------------------------------------------------------------------

    /// Render every queued placement and attach the results.
    ///
    /// Placements registered while this runs are picked up before it returns.
    /// Returns the number of graphics attached.
    pub async fn process_pending(&self) -> usize {
        let mut attached = 0;
        loop {
            let batch = self.take_queued();
            if batch.is_empty() {
                return attached;
            }

            {
                let mut state = self.state.lock();
                if state.engine != EngineState::Ready {
                    state.engine = EngineState::Loading;
                }
            }
            let engine = match self.cell.acquire(Arc::clone(&self.loader)).await {
                Ok(engine) => {
                    self.state.lock().engine = EngineState::Ready;
                    engine
                }
                Err(e) => {
                    crate::debug_error!("DIAGRAM", "Diagram engine failed to load: {e}");
                    self.fail_batch(&batch, &e);
                    return attached;
                }
            };

            // Submitted in document order; completions arrive in any order.
            let mut tasks = JoinSet::new();
            for submission in batch {
                let engine = Arc::clone(&engine);
                tasks.spawn_blocking(move || {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        match &submission.theme {
                            Some(theme) => engine.render_themed(&submission.source, theme),
                            None => engine.render(&submission.source),
                        }
                    }))
                    .unwrap_or_else(|_| {
                        Err(DiagramError::RenderFailed("diagram engine panicked".to_string()))
                    })
                    .and_then(|svg| SvgGraphic::from_engine_output(&svg));
                    (submission.id, submission.container, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((id, container, result)) => {
                        if self.complete(&id, &container, result) {
                            attached += 1;
                        }
                    }
                    Err(e) => crate::debug_error!("DIAGRAM", "render task failed: {e}"),
                }
            }
        }
    }

    fn take_queued(&self) -> Vec<Submission> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut batch = Vec::with_capacity(state.queue.len());
        while let Some(id) = state.queue.pop_front() {
            let Some(placement) = state.placements.get(&id) else {
                continue;
            };
            if placement.processed || !placement.view.is_alive() {
                continue;
            }
            batch.push(Submission {
                id,
                container: placement.container.clone(),
                source: placement.source.clone(),
                theme: placement.theme.clone(),
            });
        }
        batch
    }

    /// Engine unavailable: notify every placement in the batch and leave it
    /// unprocessed so a later attempt can retry.
    fn fail_batch(&self, batch: &[Submission], error: &DiagramError) {
        let mut state = self.state.lock();
        state.engine = EngineState::Failed;
        let notice = format!("Diagram unavailable: {error}");
        for submission in batch {
            let Some(placement) = state.placements.get_mut(&submission.id) else {
                continue;
            };
            placement.scheduled = false;
            if placement.view.is_alive() {
                self.host.show_notice(&submission.container, &notice);
            }
        }
    }

    /// Apply one render result. Returns whether a graphic was attached.
    fn complete(
        &self,
        id: &DiagramId,
        container: &ContainerRef,
        result: Result<SvgGraphic, DiagramError>,
    ) -> bool {
        let mut state = self.state.lock();
        let Some(placement) = state.placements.get_mut(id) else {
            crate::debug_log!("DIAGRAM", "discarding result for removed placement {}", id);
            return false;
        };
        placement.scheduled = false;
        if !placement.view.is_alive() {
            crate::debug_log!("DIAGRAM", "discarding result for unmounted placement {}", id);
            return false;
        }
        if placement.processed {
            crate::debug_trace!("DIAGRAM", "placement {} already processed", id);
            return false;
        }
        placement.processed = true;

        match result {
            Ok(graphic) => {
                self.host.attach_graphic(container, &graphic);
                placement.rendered_svg = Some(graphic);
                crate::debug_log!("DIAGRAM", "attached graphic to {}", id);
                true
            }
            Err(e) => {
                crate::debug_error!("DIAGRAM", "diagram {} failed to render: {e}", id);
                self.host
                    .show_notice(container, &format!("Diagram could not be rendered: {e}"));
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_processed(&self, id: &DiagramId) -> bool {
        self.state
            .lock()
            .placements
            .get(id)
            .is_some_and(|p| p.processed)
    }

    pub fn rendered_svg(&self, id: &DiagramId) -> Option<SvgGraphic> {
        self.state
            .lock()
            .placements
            .get(id)
            .and_then(|p| p.rendered_svg.clone())
    }

    pub fn placement_count(&self) -> usize {
        self.state.lock().placements.len()
    }

    pub fn queued_count(&self) -> usize {
        self.state.lock().queue.len()
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Export the attached graphic of `id`.
    ///
    /// Returns `Ok(None)` when no graphic is attached yet (or the id is unknown).
    pub fn export(
        &self,
        id: &DiagramId,
        format: ExportFormat,
    ) -> Result<Option<PathBuf>, DiagramError> {
        let Some(graphic) = self.rendered_svg(id) else {
            crate::debug_log!("DIAGRAM", "export of {} ignored: no graphic attached", id);
            return Ok(None);
        };

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
        let filename = format!("diagram-{stamp}-{}.{}", id.short(), format.extension());
        let bytes = match format {
            ExportFormat::Svg => graphic.into_string().into_bytes(),
            ExportFormat::Png => svg_to_png_bytes(graphic.as_str(), None)?,
        };
        let path = self.host.export_graphic(&filename, &bytes)?;
        crate::debug_info!("DIAGRAM", "exported {} to {}", id, path.display());
        Ok(Some(path))
    }

    // -----------------------------------------------------------------------
    // Zoom overlay
    // -----------------------------------------------------------------------

    /// Open the zoom overlay for `id`, closing any overlay already open.
    ///
    /// Returns `None` when the diagram has no graphic yet.
    pub fn open_zoom(&self, id: &DiagramId) -> Option<OverlayId> {
        let mut state = self.state.lock();
        let svg = state.placements.get(id)?.rendered_svg.as_ref()?.as_str().to_string();

        if let Some((previous, _)) = state.overlay.take() {
            self.host.unlisten_keys(previous);
            self.host.close_overlay(previous);
        }

        let (width, height) = svg_size(&svg).unwrap_or(FALLBACK_OVERLAY_SIZE);
        let scale = self.config.zoom_scale as f32;
        let (width, height) = (width * scale, height * scale);

        let overlay_id = OverlayId(state.next_overlay);
        state.next_overlay += 1;
        let overlay = ZoomOverlay {
            id: overlay_id,
            diagram: id.clone(),
            svg: with_root_size(&svg, width, height),
            width,
            height,
        };
        self.host.open_overlay(&overlay);
        self.host.listen_keys(overlay_id);
        state.overlay = Some((overlay_id, id.clone()));
        crate::debug_log!("DIAGRAM", "opened zoom overlay for {} ({width}x{height})", id);
        Some(overlay_id)
    }

    /// Deliver an event to an overlay. Returns whether the overlay closed.
    pub fn overlay_event(&self, overlay: OverlayId, event: &OverlayEvent) -> bool {
        if !event.closes_overlay() {
            return false;
        }
        let mut state = self.state.lock();
        if state.overlay.as_ref().map(|(open, _)| *open) != Some(overlay) {
            return false;
        }
        state.overlay = None;
        self.host.unlisten_keys(overlay);
        self.host.close_overlay(overlay);
        true
    }

    pub fn open_overlay(&self) -> Option<OverlayId> {
        self.state.lock().overlay.as_ref().map(|(id, _)| *id)
    }

    // -----------------------------------------------------------------------
    // Drag panning
    // -----------------------------------------------------------------------

    /// Apply pointer input to the drag session of `id`'s container.
    pub fn handle_pointer(&self, id: &DiagramId, event: PointerEvent) {
        let mut state = self.state.lock();
        let Some(placement) = state.placements.get_mut(id) else {
            return;
        };
        match event {
            PointerEvent::Down { x, y } => {
                let scroll = self.host.scroll_offset(&placement.container);
                placement.drag.begin(x, y, scroll);
            }
            PointerEvent::Move { x, y } => {
                if let Some((sx, sy)) =
                    placement.drag.scroll_for(x, y, self.config.drag_multiplier)
                {
                    self.host.scroll_to(&placement.container, sx, sy);
                }
            }
            PointerEvent::Up | PointerEvent::Leave => placement.drag.end(),
        }
    }

    // -----------------------------------------------------------------------
    // Unmount
    // -----------------------------------------------------------------------

    /// Drop every placement owned by `view`. In-flight results for them are
    /// discarded on completion. Returns the number of placements removed.
    pub fn unmount_view(&self, view: &ViewHandle) -> usize {
        view.unmount();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let before = state.placements.len();
        state.placements.retain(|_, p| !p.view.same_view(view));
        let placements = &state.placements;
        state.queue.retain(|id| placements.contains_key(id));
        state.order.retain(|id| placements.contains_key(id));

        let overlay_orphaned = state
            .overlay
            .as_ref()
            .is_some_and(|(_, diagram)| !state.placements.contains_key(diagram));
        if overlay_orphaned && let Some((overlay, _)) = state.overlay.take() {
            self.host.unlisten_keys(overlay);
            self.host.close_overlay(overlay);
        }

        let removed = before - state.placements.len();
        crate::debug_log!("VIEW", "unmounted view, dropped {removed} placements");
        removed
    }
}

/// Registers placements for one mounted view.
pub struct ViewPlacements<'a> {
    adapter: &'a DiagramEngineAdapter,
    view: &'a ViewHandle,
}

impl PlacementSink for ViewPlacements<'_> {
    fn register_placement(&self, id: &DiagramId, source: &str, theme: &BubbleTheme) -> ContainerRef {
        self.adapter.register_themed(id, source, Some(theme), self.view)
    }
}
