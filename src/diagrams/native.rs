//! In-process mermaid rendering via `mermaid-rs-renderer`.

use std::sync::Arc;

use super::engine::{DiagramEngine, DiagramError, EngineLoader};
use super::svg_utils::mermaid_theme;
use crate::config::BubbleTheme;

/// Source rendered once at load time to prove the renderer works.
const CHECK_SOURCE: &str = "graph TD\n  A --> B";

/// Loads the native mermaid engine themed after a chat bubble.
pub struct NativeMermaidLoader {
    theme: BubbleTheme,
}

impl NativeMermaidLoader {
    pub fn new(theme: BubbleTheme) -> Self {
        Self { theme }
    }
}

impl EngineLoader for NativeMermaidLoader {
    fn load(&self) -> Result<Arc<dyn DiagramEngine>, DiagramError> {
        let engine = NativeMermaidEngine {
            theme: self.theme.clone(),
        };
        engine
            .render(CHECK_SOURCE)
            .map_err(|e| DiagramError::EngineUnavailable(format!("native self-check failed: {e}")))?;
        Ok(Arc::new(engine))
    }
}

/// Renders mermaid source with the default (deterministic) layout.
pub struct NativeMermaidEngine {
    theme: BubbleTheme,
}

impl DiagramEngine for NativeMermaidEngine {
    fn name(&self) -> &str {
        "native"
    }

    fn render(&self, source: &str) -> Result<String, DiagramError> {
        self.render_themed(source, &self.theme)
    }

    fn render_themed(&self, source: &str, theme: &BubbleTheme) -> Result<String, DiagramError> {
        let opts = mermaid_rs_renderer::RenderOptions {
            theme: mermaid_theme(theme),
            layout: mermaid_rs_renderer::LayoutConfig::default(),
        };
        match mermaid_rs_renderer::render_with_options(source, opts) {
            Ok(svg) => {
                crate::debug_log!("DIAGRAM", "Native Mermaid SVG generated ({} bytes)", svg.len());
                Ok(svg)
            }
            Err(e) => Err(DiagramError::RenderFailed(e.to_string())),
        }
    }
}
