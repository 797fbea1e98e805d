//! Pipeline Stage Model
//!
//! Stage kinds, per-stage parameters, and the per-locator lock map used
//! to keep two in-flight executions from publishing to the same path.
//!
//! The derivation chain per asset is one-directional:
//! `Raw → Trimmed → Edited* → Exported`. Edits chain (an edit may derive
//! from a prior edit), `Exported` is terminal, and every transition
//! creates a new record — bytes are never mutated in place.

mod executor;
pub use executor::*;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::{
    ledger::AssetStage, store::MediaCategory, ArrowSpec, CoreError, CoreResult, Region, TimeWindow,
};

// =============================================================================
// Stage Kinds
// =============================================================================

/// Kind of derivation stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    Trim,
    TextOverlay,
    BlurRegion,
    ArrowAnnotation,
    VoiceoverMerge,
    Export,
}

impl StageKind {
    /// Verifies the source record sits at a valid predecessor stage.
    ///
    /// A wrong predecessor is `NotFound` — from the caller's view the
    /// required input does not exist.
    pub fn check_source_stage(&self, stage: AssetStage) -> CoreResult<()> {
        let ok = match self {
            Self::Trim => stage == AssetStage::Raw,
            Self::TextOverlay
            | Self::BlurRegion
            | Self::ArrowAnnotation
            | Self::VoiceoverMerge
            | Self::Export => matches!(stage, AssetStage::Trimmed | AssetStage::Edited),
        };
        if ok {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!(
                "no {self:?}-eligible asset at stage {stage:?}"
            )))
        }
    }

    /// Stage of the derived record.
    pub fn result_stage(&self) -> AssetStage {
        match self {
            Self::Trim => AssetStage::Trimmed,
            Self::Export => AssetStage::Exported,
            _ => AssetStage::Edited,
        }
    }

    /// Storage category of the derived artifact.
    pub fn output_category(&self) -> MediaCategory {
        match self {
            Self::Trim => MediaCategory::Trimmed,
            Self::Export => MediaCategory::Exports,
            _ => MediaCategory::Edited,
        }
    }

    /// Container format of the derived artifact. Trim stream-copies and
    /// therefore inherits the source container.
    pub fn output_format(&self, source_format: &str) -> String {
        match self {
            Self::Trim => source_format.to_string(),
            Self::TextOverlay | Self::Export => "mp4".to_string(),
            Self::BlurRegion | Self::ArrowAnnotation | Self::VoiceoverMerge => "webm".to_string(),
        }
    }
}

// =============================================================================
// Stage Parameters
// =============================================================================

/// Parameters for one stage execution. The kind is implied by the
/// variant, so a kind/params mismatch is unrepresentable.
#[derive(Clone, Debug, PartialEq)]
pub enum StageParams {
    Trim {
        window: TimeWindow,
    },
    TextOverlay {
        text: String,
        window: TimeWindow,
    },
    BlurRegion {
        region: Region,
        window: Option<TimeWindow>,
    },
    ArrowAnnotation {
        arrow: ArrowSpec,
        window: Option<TimeWindow>,
    },
    VoiceoverMerge {
        /// Locator of the synthesized audio to merge in.
        audio: PathBuf,
    },
    Export,
}

impl StageParams {
    pub fn stage_kind(&self) -> StageKind {
        match self {
            Self::Trim { .. } => StageKind::Trim,
            Self::TextOverlay { .. } => StageKind::TextOverlay,
            Self::BlurRegion { .. } => StageKind::BlurRegion,
            Self::ArrowAnnotation { .. } => StageKind::ArrowAnnotation,
            Self::VoiceoverMerge { .. } => StageKind::VoiceoverMerge,
            Self::Export => StageKind::Export,
        }
    }

    /// Whether building this stage's directive wants the source frame
    /// geometry for validation.
    pub fn needs_frame_bounds(&self) -> bool {
        matches!(self, Self::BlurRegion { .. } | Self::ArrowAnnotation { .. })
    }
}

// =============================================================================
// Locator Locks
// =============================================================================

/// Async lock map keyed by output locator.
///
/// Two in-flight executions that would publish to the same final path
/// serialize here instead of racing the rename.
#[derive(Clone, Default)]
pub struct LocatorLocks {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl LocatorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `locator`, waiting behind any in-flight
    /// execution targeting the same path.
    pub async fn acquire(&self, locator: &PathBuf) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().await;
            // Drop entries nobody is waiting on so the map stays bounded.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(map.entry(locator.clone()).or_default())
        };
        lock.lock_owned().await
    }
}
