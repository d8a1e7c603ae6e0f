//! Shared integration test helpers for career-chat.
//!
//! Include with `mod common;` at the top of a test file. The
//! `#[allow(dead_code)]` attribute suppresses warnings when only a subset of
//! helpers is used per file.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use career_chat::config::{BubbleTheme, ChatRenderConfig, DiagramConfig};
use career_chat::diagrams::{
    DiagramEngine, DiagramEngineAdapter, DiagramError, EngineCell, EngineLoader, StaticHost,
};
use career_chat::markdown::MessageRenderer;
use tempfile::TempDir;

/// Engine that echoes the source length into a small SVG.
///
/// Sources containing `slow` sleep for 80ms before returning; sources
/// containing `broken` fail. Themed renders put the bubble background in a
/// `fill` attribute.
pub struct EchoEngine {
    pub renders: Arc<AtomicUsize>,
}

impl DiagramEngine for EchoEngine {
    fn name(&self) -> &str {
        "echo"
    }

    fn render(&self, source: &str) -> Result<String, DiagramError> {
        self.render_filled(source, "none")
    }

    fn render_themed(&self, source: &str, theme: &BubbleTheme) -> Result<String, DiagramError> {
        let [r, g, b] = theme.background;
        self.render_filled(source, &format!("rgb({r},{g},{b})"))
    }
}

impl EchoEngine {
    fn render_filled(&self, source: &str, fill: &str) -> Result<String, DiagramError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if source.contains("slow") {
            std::thread::sleep(Duration::from_millis(80));
        }
        if source.contains("broken") {
            return Err(DiagramError::RenderFailed(format!(
                "cannot parse {} bytes",
                source.len()
            )));
        }
        Ok(format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="60" height="30" fill="{fill}"><text>{}</text></svg>"#,
            source.len()
        ))
    }
}

#[derive(Default)]
pub struct EchoLoader {
    pub loads: AtomicUsize,
    pub renders: Arc<AtomicUsize>,
}

impl EngineLoader for EchoLoader {
    fn load(&self) -> Result<Arc<dyn DiagramEngine>, DiagramError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(EchoEngine {
            renders: Arc::clone(&self.renders),
        }))
    }
}

/// An adapter wired to an in-memory host and a fresh engine cell.
///
/// The `TempDir` receives exports and must outlive the test.
pub struct Pipeline {
    pub renderer: MessageRenderer,
    pub adapter: DiagramEngineAdapter,
    pub host: Arc<StaticHost>,
    pub loader: Arc<EchoLoader>,
    pub dir: TempDir,
}

pub fn pipeline() -> Pipeline {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let host = Arc::new(StaticHost::new(dir.path()));
    let loader = Arc::new(EchoLoader::default());
    let adapter = DiagramEngineAdapter::new(
        Arc::new(EngineCell::new()),
        loader.clone(),
        host.clone(),
        DiagramConfig::default(),
    );
    Pipeline {
        renderer: MessageRenderer::new(&ChatRenderConfig::default()),
        adapter,
        host,
        loader,
        dir,
    }
}
