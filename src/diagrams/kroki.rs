//! Remote rendering through a Kroki server.
//!
//! Loading checks `GET {server}/health`; rendering POSTs the source as plain
//! text to `{server}/mermaid/svg`.

use std::sync::Arc;
use std::time::Duration;

use super::engine::{DiagramEngine, DiagramError, EngineLoader};

pub struct KrokiLoader {
    server: String,
    timeout: Duration,
}

impl KrokiLoader {
    pub fn new(server: &str, timeout: Duration) -> Self {
        Self {
            server: server.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

impl EngineLoader for KrokiLoader {
    fn load(&self) -> Result<Arc<dyn DiagramEngine>, DiagramError> {
        let agent = crate::http::agent(self.timeout);
        let url = format!("{}/health", self.server);

        // ureq may panic if the TLS provider isn't available at runtime.
        let health = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            agent.get(url.as_str()).call().map(|_| ())
        }))
        .map_err(|_| DiagramError::EngineUnavailable("HTTP client panicked".to_string()))?;
        health.map_err(|e| DiagramError::EngineUnavailable(format!("{url}: {e}")))?;

        crate::debug_info!("DIAGRAM", "Kroki server {} reachable", self.server);
        Ok(Arc::new(KrokiEngine {
            agent,
            server: self.server.clone(),
        }))
    }
}

pub struct KrokiEngine {
    agent: ureq::Agent,
    server: String,
}

impl DiagramEngine for KrokiEngine {
    fn name(&self) -> &str {
        "kroki"
    }

    fn render(&self, source: &str) -> Result<String, DiagramError> {
        let url = format!("{}/mermaid/svg", self.server);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let response = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "text/plain")
                .send(source.as_bytes())?;
            response.into_body().read_to_string()
        }))
        .map_err(|_| DiagramError::RenderFailed("HTTP client panicked".to_string()))?;

        let svg = result.map_err(|e| DiagramError::RenderFailed(format!("{url}: {e}")))?;
        if svg.is_empty() {
            return Err(DiagramError::RenderFailed(format!("{url}: empty response")));
        }
        Ok(svg)
    }
}
