//! Configuration for the message rendering pipeline.
//!
//! Loaded from `<config_dir>/career-chat/config.yaml`. Every field carries a
//! serde default so partial files (or no file at all) produce a complete
//! configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default Kroki server URL when the Kroki engine is selected without a server.
pub const DEFAULT_KROKI_SERVER: &str = "https://kroki.io";

/// Errors raised while loading or saving the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read or written.
    #[error("config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid YAML for [`ChatRenderConfig`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_diagram_languages() -> Vec<String> {
    vec!["mermaid".to_string()]
}

fn default_drag_multiplier() -> f64 {
    1.5
}

fn default_zoom_scale() -> f64 {
    2.0
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Block and inline parsing options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Fence language tags treated as diagram source (compared case-insensitively).
    #[serde(default = "default_diagram_languages")]
    pub diagram_languages: Vec<String>,

    /// Link bare `www.` tokens with an implicit `https://`.
    #[serde(default = "default_true")]
    pub autolink_www: bool,

    /// Open links in a new browsing context when serialized to HTML.
    #[serde(default = "default_true")]
    pub link_target_blank: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            diagram_languages: default_diagram_languages(),
            autolink_www: true,
            link_target_blank: true,
        }
    }
}

impl MarkdownConfig {
    /// Whether a fence language tag is one of the reserved diagram keywords.
    pub fn is_diagram_language(&self, tag: &str) -> bool {
        self.diagram_languages
            .iter()
            .any(|lang| lang.eq_ignore_ascii_case(tag))
    }
}

/// Diagram engine and interaction options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagramConfig {
    /// Rendering engine: "auto" (default: native, then Kroki when a server
    /// is configured), "native" (pure-Rust mermaid only) or "kroki" (HTTP API).
    #[serde(default)]
    pub engine: Option<String>,

    /// Kroki server URL.
    #[serde(default)]
    pub kroki_server: Option<String>,

    /// Scroll distance per pointer pixel while drag-panning a diagram.
    #[serde(default = "default_drag_multiplier")]
    pub drag_multiplier: f64,

    /// Enlargement factor for the zoom overlay.
    #[serde(default = "default_zoom_scale")]
    pub zoom_scale: f64,

    /// Directory exported diagrams are written to.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            engine: None,
            kroki_server: None,
            drag_multiplier: default_drag_multiplier(),
            zoom_scale: default_zoom_scale(),
            export_dir: None,
        }
    }
}

impl DiagramConfig {
    /// The configured engine name, `"auto"` when unset.
    pub fn engine(&self) -> &str {
        self.engine.as_deref().unwrap_or("auto")
    }

    /// Export directory: configured value, else the platform download
    /// directory, else the current directory.
    pub fn resolved_export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn clamp(&mut self) {
        let drag = self.drag_multiplier.clamp(0.1, 10.0);
        if (drag - self.drag_multiplier).abs() > f64::EPSILON || drag.is_nan() {
            crate::debug_info!(
                "CONFIG",
                "drag_multiplier {} out of range, clamped to {}",
                self.drag_multiplier,
                drag
            );
        }
        self.drag_multiplier = if drag.is_nan() {
            default_drag_multiplier()
        } else {
            drag
        };

        let zoom = self.zoom_scale.clamp(1.0, 8.0);
        if (zoom - self.zoom_scale).abs() > f64::EPSILON || zoom.is_nan() {
            crate::debug_info!(
                "CONFIG",
                "zoom_scale {} out of range, clamped to {}",
                self.zoom_scale,
                zoom
            );
        }
        self.zoom_scale = if zoom.is_nan() {
            default_zoom_scale()
        } else {
            zoom
        };
    }
}

/// Colors for one chat bubble (user or assistant), each as `[r, g, b]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BubbleTheme {
    pub background: [u8; 3],
    pub text: [u8; 3],
    pub heading: [u8; 3],
    pub link: [u8; 3],
    pub code_fg: [u8; 3],
    pub code_bg: [u8; 3],
    pub code_block_bg: [u8; 3],
    pub bullet: [u8; 3],
}

impl BubbleTheme {
    /// Assistant bubble: Catppuccin Mocha surface with sapphire links.
    pub fn assistant() -> Self {
        Self {
            background: [49, 50, 68],
            text: [205, 214, 244],
            heading: [137, 220, 235],
            link: [116, 199, 236],
            code_fg: [235, 160, 172],
            code_bg: [69, 71, 90],
            code_block_bg: [30, 30, 46],
            bullet: [148, 226, 213],
        }
    }

    /// User bubble: blue fill with dark text.
    pub fn user() -> Self {
        Self {
            background: [137, 180, 250],
            text: [17, 17, 27],
            heading: [17, 17, 27],
            link: [30, 30, 46],
            code_fg: [17, 17, 27],
            code_bg: [180, 208, 251],
            code_block_bg: [116, 150, 215],
            bullet: [30, 30, 46],
        }
    }
}

/// Per-author bubble themes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "BubbleTheme::user")]
    pub user: BubbleTheme,
    #[serde(default = "BubbleTheme::assistant")]
    pub assistant: BubbleTheme,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            user: BubbleTheme::user(),
            assistant: BubbleTheme::assistant(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Complete rendering configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatRenderConfig {
    #[serde(default)]
    pub markdown: MarkdownConfig,
    #[serde(default)]
    pub diagrams: DiagramConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

impl ChatRenderConfig {
    /// Default config file location: `<config_dir>/career-chat/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("career-chat").join("config.yaml"))
    }

    /// Load configuration from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                crate::debug_info!(
                    "CONFIG",
                    "No config at {}, using defaults",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a YAML string, clamping out-of-range values.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml_ng::Error> {
        // An empty document deserializes as unit, not as a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_yaml_ng::from_str(yaml)?;
        config.diagrams.clamp();
        Ok(config)
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml_ng::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
