//! Diagram engine capability and its process-wide lazy cell.
//!
//! An [`EngineLoader`] acquires a [`DiagramEngine`] (possibly slowly: a test
//! render, a network round trip). [`EngineCell`] memoizes the first successful
//! acquisition; callers that arrive while a load is in flight wait on it
//! instead of starting another one. A failed load leaves the cell empty so a
//! later caller can retry.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use tokio::sync::OnceCell;

use super::kroki::KrokiLoader;
use super::native::NativeMermaidLoader;
use super::svg_utils::sanitize_svg;
use crate::config::{BubbleTheme, DEFAULT_KROKI_SERVER, DiagramConfig};

/// Timeout for remote engine requests.
const KROKI_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors raised by diagram engines and the adapter's export path.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    /// The engine could not be acquired (load or health check failed).
    #[error("diagram engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine rejected the diagram source.
    #[error("diagram render failed: {0}")]
    RenderFailed(String),

    /// The engine returned something that is not a usable SVG document.
    #[error("invalid SVG: {0}")]
    InvalidSvg(String),

    /// Writing an exported graphic failed.
    #[error("failed to export diagram to {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Graphic
// ---------------------------------------------------------------------------

/// A sanitized SVG document produced by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgGraphic {
    svg: String,
}

impl SvgGraphic {
    /// Sanitize raw engine output and check that it is an SVG document.
    pub fn from_engine_output(raw: &str) -> Result<Self, DiagramError> {
        let svg = sanitize_svg(raw.trim());
        if !svg.contains("<svg") {
            return Err(DiagramError::InvalidSvg(
                "engine output has no <svg> root".to_string(),
            ));
        }
        Ok(Self { svg })
    }

    pub fn as_str(&self) -> &str {
        &self.svg
    }

    pub fn into_string(self) -> String {
        self.svg
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// An acquired diagram engine. Rendering is blocking and runs off the async path.
pub trait DiagramEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Render diagram source to raw SVG text.
    fn render(&self, source: &str) -> Result<String, DiagramError>;

    /// Render with colors taken from a chat bubble. Engines that cannot be
    /// themed per call fall back to [`DiagramEngine::render`].
    fn render_themed(&self, source: &str, theme: &BubbleTheme) -> Result<String, DiagramError> {
        let _ = theme;
        self.render(source)
    }
}

/// Acquires a [`DiagramEngine`]. Called at most once per successful load.
pub trait EngineLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn DiagramEngine>, DiagramError>;
}

// ---------------------------------------------------------------------------
// Engine cell
// ---------------------------------------------------------------------------

static GLOBAL_ENGINE: LazyLock<Arc<EngineCell>> = LazyLock::new(|| Arc::new(EngineCell::new()));

/// Lazily initialized, write-once engine slot.
#[derive(Default)]
pub struct EngineCell {
    engine: OnceCell<Arc<dyn DiagramEngine>>,
    load_attempts: AtomicUsize,
}

impl EngineCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cell shared by every adapter that does not bring its own.
    pub fn global() -> Arc<EngineCell> {
        Arc::clone(&GLOBAL_ENGINE)
    }

    /// The engine, if one has been acquired.
    pub fn get(&self) -> Option<Arc<dyn DiagramEngine>> {
        self.engine.get().cloned()
    }

    /// Number of times a loader has been invoked on this cell.
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::SeqCst)
    }

    /// Return the engine, loading it with `loader` on first use.
    ///
    /// Concurrent callers queue on the in-flight load. The cell is written
    /// only when the load succeeds.
    pub async fn acquire(
        &self,
        loader: Arc<dyn EngineLoader>,
    ) -> Result<Arc<dyn DiagramEngine>, DiagramError> {
        self.engine
            .get_or_try_init(|| async {
                self.load_attempts.fetch_add(1, Ordering::SeqCst);
                crate::debug_info!("DIAGRAM", "Loading diagram engine");
                let engine = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| {
                        DiagramError::EngineUnavailable(format!("engine loader task failed: {e}"))
                    })??;
                crate::debug_info!("DIAGRAM", "Diagram engine '{}' ready", engine.name());
                Ok::<_, DiagramError>(engine)
            })
            .await
            .cloned()
    }
}

// ---------------------------------------------------------------------------
// Chained engine ("auto")
// ---------------------------------------------------------------------------

/// Tries each loader in order; the resulting engine falls through its
/// members on render failure.
pub struct ChainLoader {
    loaders: Vec<Arc<dyn EngineLoader>>,
}

impl ChainLoader {
    pub fn new(loaders: Vec<Arc<dyn EngineLoader>>) -> Self {
        Self { loaders }
    }
}

impl EngineLoader for ChainLoader {
    fn load(&self) -> Result<Arc<dyn DiagramEngine>, DiagramError> {
        let mut engines = Vec::new();
        let mut last_error = None;
        for loader in &self.loaders {
            match loader.load() {
                Ok(engine) => engines.push(engine),
                Err(e) => {
                    crate::debug_error!("DIAGRAM", "Engine in chain failed to load: {e}");
                    last_error = Some(e);
                }
            }
        }
        if engines.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                DiagramError::EngineUnavailable("no diagram engines configured".to_string())
            }));
        }
        Ok(Arc::new(ChainEngine { engines }))
    }
}

struct ChainEngine {
    engines: Vec<Arc<dyn DiagramEngine>>,
}

impl DiagramEngine for ChainEngine {
    fn name(&self) -> &str {
        "auto"
    }

    fn render(&self, source: &str) -> Result<String, DiagramError> {
        self.first_success(|engine| engine.render(source))
    }

    fn render_themed(&self, source: &str, theme: &BubbleTheme) -> Result<String, DiagramError> {
        self.first_success(|engine| engine.render_themed(source, theme))
    }
}

impl ChainEngine {
    fn first_success(
        &self,
        render: impl Fn(&dyn DiagramEngine) -> Result<String, DiagramError>,
    ) -> Result<String, DiagramError> {
        let mut last_error = None;
        for engine in &self.engines {
            match render(engine.as_ref()) {
                Ok(svg) => return Ok(svg),
                Err(e) => {
                    crate::debug_log!("DIAGRAM", "{} render failed, trying next: {e}", engine.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| DiagramError::EngineUnavailable("empty engine chain".to_string())))
    }
}

/// Build the loader selected by `config.engine`.
///
/// - `"native"`: in-process mermaid renderer only.
/// - `"kroki"`: remote Kroki server (default `https://kroki.io`).
/// - `"auto"` or anything else: native first, then Kroki when a server is configured.
///
/// The engine is shared by every message, so `theme` only colors renders
/// that carry no bubble of their own. Placements registered through a
/// rendered message pass their author's bubble to
/// [`DiagramEngine::render_themed`]; Kroki ignores it.
pub fn loader_for_config(config: &DiagramConfig, theme: &BubbleTheme) -> Arc<dyn EngineLoader> {
    let native = || Arc::new(NativeMermaidLoader::new(theme.clone())) as Arc<dyn EngineLoader>;
    match config.engine() {
        "native" => native(),
        "kroki" => {
            let server = config
                .kroki_server
                .as_deref()
                .unwrap_or(DEFAULT_KROKI_SERVER);
            Arc::new(KrokiLoader::new(server, KROKI_TIMEOUT))
        }
        other => {
            if other != "auto" {
                crate::debug_info!("DIAGRAM", "Unknown engine '{other}', using auto");
            }
            let mut loaders = vec![native()];
            if let Some(server) = config.kroki_server.as_deref() {
                loaders.push(Arc::new(KrokiLoader::new(server, KROKI_TIMEOUT)));
            }
            Arc::new(ChainLoader::new(loaders))
        }
    }
}
