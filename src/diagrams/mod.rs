//! Diagram fill-in: engines, the host surface and the adapter that drives them.
//!
//! Sub-modules:
//! - [`engine`]: `DiagramEngine` / `EngineLoader` traits, the lazy `EngineCell`
//!   and the configured loader chain.
//! - [`native`]: in-process mermaid rendering.
//! - [`kroki`]: remote rendering over HTTP.
//! - [`adapter`]: placement registry, queue replay, export, zoom and drag.
//! - [`host`]: `HostSurface` and the in-memory `StaticHost`.
//! - [`placement`]: per-diagram state and view liveness.
//! - [`svg_utils`]: sanitizing, sizing and rasterizing SVG.

pub mod adapter;
pub mod engine;
pub mod host;
pub mod kroki;
pub mod native;
pub mod placement;
pub mod svg_utils;


pub use adapter::{DiagramEngineAdapter, EngineState, ExportFormat, PointerEvent, ViewPlacements};
pub use engine::{
    ChainLoader, DiagramEngine, DiagramError, EngineCell, EngineLoader, SvgGraphic,
    loader_for_config,
};
pub use host::{ContainerRef, HostSurface, OverlayEvent, OverlayId, StaticHost, ZoomOverlay};
pub use kroki::KrokiLoader;
pub use native::NativeMermaidLoader;
pub use placement::{DiagramPlacement, DragState, ViewHandle};
