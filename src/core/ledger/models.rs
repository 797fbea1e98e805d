//! Asset Record Model Definitions
//!
//! Defines the `AssetRecord` persisted per asset and its derivation stage.

use serde::{Deserialize, Serialize};

use crate::core::AssetId;

/// Position of an asset in the derivation chain.
///
/// Transitions are one-directional (`Raw → Trimmed → Edited* → Exported`);
/// `Exported` is terminal. A stage never regresses because derivation
/// always creates a new record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetStage {
    Raw,
    Trimmed,
    Edited,
    Exported,
}

/// Durable metadata record for a stored media asset.
///
/// The byte payload behind `storage_locator` is immutable once published;
/// only `title`, `description`, `tags`, `view_count`, and `completion_sum`
/// may change in place. Everything else is fixed at creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Opaque unique id (ULID), assigned at creation, never reused.
    pub id: AssetId,

    /// Id of the predecessor asset this one was derived from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage: Option<AssetId>,

    /// Position in the derivation chain.
    pub stage: AssetStage,

    /// Opaque reference to the byte payload.
    pub storage_locator: String,

    /// Container format of the payload ("webm", "mp4", "wav", ...).
    pub format: String,

    /// Duration of the media in seconds (>= 0).
    pub duration_sec: f64,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// User-editable display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// User-editable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// User-editable tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Number of share-view renders. Monotonically non-decreasing.
    #[serde(default)]
    pub view_count: u64,

    /// Accumulated per-playback completion fractions, each in [0, 1].
    /// Monotonically non-decreasing.
    #[serde(default)]
    pub completion_sum: f64,
}

impl AssetRecord {
    /// Creates a new root (`Raw`) record with a fresh id.
    pub fn new_raw(storage_locator: String, format: &str, duration_sec: f64) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            lineage: None,
            stage: AssetStage::Raw,
            storage_locator,
            format: format.to_string(),
            duration_sec: duration_sec.max(0.0),
            created_at: chrono::Utc::now().to_rfc3339(),
            title: None,
            description: None,
            tags: Vec::new(),
            view_count: 0,
            completion_sum: 0.0,
        }
    }

    /// Creates a record derived from `source` at an advanced stage.
    ///
    /// Counters start at zero: analytics are per-record, not inherited.
    pub fn derived(
        id: AssetId,
        source: &AssetRecord,
        stage: AssetStage,
        storage_locator: String,
        format: &str,
        duration_sec: f64,
    ) -> Self {
        Self {
            id,
            lineage: Some(source.id.clone()),
            stage,
            storage_locator,
            format: format.to_string(),
            duration_sec: duration_sec.max(0.0),
            created_at: chrono::Utc::now().to_rfc3339(),
            title: None,
            description: None,
            tags: Vec::new(),
            view_count: 0,
            completion_sum: 0.0,
        }
    }

    /// Average playback completion in percent, rounded; 0 when unviewed.
    pub fn average_completion(&self) -> u32 {
        if self.view_count == 0 {
            return 0;
        }
        (100.0 * self.completion_sum / self.view_count as f64).round() as u32
    }
}
