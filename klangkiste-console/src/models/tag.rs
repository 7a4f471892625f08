//! Tag records as stored in the registry
//!
//! Shapes are validated at the registry-client boundary; nothing in the core
//! trusts an ambient record shape beyond these types.

use serde::{Deserialize, Serialize};

/// Tag lifecycle status
///
/// Created by claim (`New`, or `Imported` when pulled from a box's local
/// storage); advanced to `Written` when the operator confirms the physical
/// write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagStatus {
    /// Claimed but not yet physically written
    New,
    /// Physical write confirmed by the operator
    Written,
    /// Pulled from a box's local storage with a trusted media binding
    Imported,
}

/// Logical tag entity keyed by `uid`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub uid: String,
    pub status: TagStatus,
    /// Optional display name
    #[serde(default)]
    pub alias: Option<String>,
    /// Free text set at claim time
    #[serde(default)]
    pub label: Option<String>,
    /// Reference to a folder in the external media tree
    #[serde(default)]
    pub media_path: Option<String>,
}

impl Tag {
    /// A tag with a media binding and a confirmed physical presence is
    /// eligible for assignment to a box.
    pub fn is_assignable(&self) -> bool {
        let has_media = self
            .media_path
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false);
        has_media && self.status != TagStatus::New
    }
}

/// Tag entry in a box's own local storage listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxLocalTag {
    pub uid: String,
    pub media_exists: bool,
    #[serde(default)]
    pub files: Vec<String>,
    pub file_count: usize,
    pub total_size: u64,
}
