//! Pipeline Stage Executor
//!
//! Sequences one derivation stage: resolve the predecessor record, build
//! the directive, execute it under the concurrency bound and deadline,
//! publish the artifact temp-then-rename, and write the derived record
//! to the ledger.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::{LocatorLocks, StageKind, StageParams};
use crate::core::{
    directives,
    ledger::{AssetLedger, AssetRecord},
    store::{MediaStore, ScratchGuard},
    tools::{probe_media, Transformer},
    AssetId, CoreError, CoreResult,
};

/// Executes derivation stages against the ledger and the media store.
pub struct StageExecutor {
    ledger: Arc<AssetLedger>,
    store: MediaStore,
    transformer: Arc<dyn Transformer>,
    /// Bounds concurrently in-flight stage executions (and with them the
    /// external tool processes they spawn).
    permits: Arc<Semaphore>,
    locators: LocatorLocks,
    deadline: Duration,
    overlay_font: PathBuf,
}

impl StageExecutor {
    pub fn new(
        ledger: Arc<AssetLedger>,
        store: MediaStore,
        transformer: Arc<dyn Transformer>,
        permits: Arc<Semaphore>,
        deadline: Duration,
        overlay_font: PathBuf,
    ) -> Self {
        Self {
            ledger,
            store,
            transformer,
            permits,
            locators: LocatorLocks::new(),
            deadline,
            overlay_font,
        }
    }

    /// Shared locator locks, so deterministic locators written outside
    /// the executor (subtitles, voiceover audio) take the same guard.
    pub fn locator_locks(&self) -> LocatorLocks {
        self.locators.clone()
    }

    /// Runs one stage against `source_id` and returns the derived id.
    ///
    /// On any failure the scratch artifact is discarded and the ledger
    /// is left unmodified.
    pub async fn execute(&self, source_id: &str, params: StageParams) -> CoreResult<AssetId> {
        let kind = params.stage_kind();

        // Validation and resolution happen before any side effect.
        let source = self
            .ledger
            .get(source_id)
            .ok_or_else(|| CoreError::NotFound(format!("asset not found: {source_id}")))?;
        kind.check_source_stage(source.stage)?;

        let input = PathBuf::from(&source.storage_locator);
        let new_id: AssetId = ulid::Ulid::new().to_string();
        let format = kind.output_format(&source.format);
        let locator = self
            .store
            .media_path(kind.output_category(), &new_id, &format)?;
        let scratch = self.store.scratch_path(&format);

        // One permit covers every external invocation this stage makes.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CoreError::Internal("executor shut down".to_string()))?;

        let frame = if params.needs_frame_bounds() {
            self.frame_bounds_of(&input).await
        } else {
            None
        };

        let directive = self.build_directive(&params, &input, &scratch, frame)?;

        let _locator_guard = self.locators.acquire(&locator).await;
        let mut scratch_guard = ScratchGuard::new(scratch.clone());

        info!(stage = ?kind, source = source_id, derived = %new_id, "executing stage");
        self.transformer.run(&directive, self.deadline).await?;

        self.store.publish(&scratch, &locator)?;
        scratch_guard.disarm();

        let duration_sec = self.derived_duration(kind, &params, &source, &locator).await;

        let record = AssetRecord::derived(
            new_id.clone(),
            &source,
            kind.result_stage(),
            locator.to_string_lossy().into_owned(),
            &format,
            duration_sec,
        );

        if let Err(e) = self.ledger.create(record).await {
            // Never leave a published artifact dangling without a record.
            let _ = std::fs::remove_file(&locator);
            return Err(e);
        }

        info!(stage = ?kind, derived = %new_id, locator = %locator.display(), "stage published");
        Ok(new_id)
    }

    fn build_directive(
        &self,
        params: &StageParams,
        input: &Path,
        output: &Path,
        frame: Option<(u32, u32)>,
    ) -> CoreResult<directives::TransformationDirective> {
        match params {
            StageParams::Trim { window } => Ok(directives::trim(input, output, window)),
            StageParams::TextOverlay { text, window } => {
                directives::text_overlay(input, output, text, window, &self.overlay_font)
            }
            StageParams::BlurRegion { region, window } => {
                directives::blur_region(input, output, region, window.as_ref(), frame)
            }
            StageParams::ArrowAnnotation { arrow, window } => {
                directives::arrow_annotation(input, output, arrow, window.as_ref(), frame)
            }
            StageParams::VoiceoverMerge { audio } => {
                Ok(directives::voiceover_merge(input, audio, output))
            }
            StageParams::Export => Ok(directives::export_mp4(input, output)),
        }
    }

    /// Frame geometry of the source, when it can be probed. Unknown
    /// bounds skip geometry validation rather than failing the stage.
    async fn frame_bounds_of(&self, input: &Path) -> Option<(u32, u32)> {
        match probe_media(self.transformer.as_ref(), input, self.deadline).await {
            Ok(info) => info.frame_bounds(),
            Err(e) => {
                warn!(input = %input.display(), error = %e, "probe failed; frame bounds unknown");
                None
            }
        }
    }

    /// Duration of the derived artifact.
    ///
    /// Trim is exact from the window. Stages whose output length depends
    /// on the tool (voiceover `-shortest`, export re-encode) probe the
    /// published artifact; other edits inherit the source duration.
    async fn derived_duration(
        &self,
        kind: StageKind,
        params: &StageParams,
        source: &AssetRecord,
        locator: &Path,
    ) -> f64 {
        match (kind, params) {
            (StageKind::Trim, StageParams::Trim { window }) => window.duration(),
            (StageKind::VoiceoverMerge, _) | (StageKind::Export, _) => {
                match probe_media(self.transformer.as_ref(), locator, self.deadline).await {
                    Ok(info) if info.duration_sec > 0.0 => info.duration_sec,
                    Ok(_) => source.duration_sec,
                    Err(e) => {
                        warn!(locator = %locator.display(), error = %e,
                            "probe of published artifact failed; inheriting source duration");
                        source.duration_sec
                    }
                }
            }
            _ => source.duration_sec,
        }
    }
}
