//! Process-unique identifiers for diagram blocks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic sequence shared by every segmenter in the process.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Identifier of a diagram block and of the placement rendered for it.
///
/// Doubles as the stable host identifier of the placeholder container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagramId(String);

impl DiagramId {
    /// Generate a fresh id: `diagram-<unix millis>-<sequence>-<random suffix>`.
    ///
    /// The sequence number makes ids unique within the process.
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("diagram-{millis}-{seq:x}-{}", &suffix[..8]))
    }

    /// Wrap an existing identifier (e.g. one read back from a serialized tree).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short tail used in export filenames.
    pub fn short(&self) -> &str {
        self.0.rsplit('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
