//! Media Service
//!
//! The public operation surface consumed by the (external) API or CLI
//! layer. Composes the ledger, media store, stage executor, transcription
//! pipeline, analytics aggregator, and TTS client behind one facade.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::core::{
    analytics::AnalyticsAggregator,
    captions::TranscriptionPipeline,
    config::PipelineConfig,
    ledger::{AssetLedger, AssetRecord},
    pipeline::{LocatorLocks, StageExecutor, StageKind, StageParams},
    store::{MediaCategory, MediaStore},
    tools::{probe_media, SystemTransformer, ToolPaths, Transformer},
    voiceover::{TtsClient, VoiceProfile},
    ArrowSpec, AssetId, CoreError, CoreResult, Region, TimeWindow,
};

/// Patch applied by `update_metadata`: `Some` replaces a field, `None`
/// leaves it untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// The derivation pipeline's public surface.
pub struct MediaService {
    config: PipelineConfig,
    store: MediaStore,
    ledger: Arc<AssetLedger>,
    transformer: Arc<dyn Transformer>,
    executor: StageExecutor,
    transcription: TranscriptionPipeline,
    analytics: AnalyticsAggregator,
    locators: LocatorLocks,
}

impl MediaService {
    /// Opens the service with detected system tools.
    pub fn open(config: PipelineConfig) -> CoreResult<Self> {
        let transformer = Arc::new(SystemTransformer::new(ToolPaths::detect()?));
        Self::with_transformer(config, transformer)
    }

    /// Opens the service over an explicit transformer (tests, embedders
    /// with managed binaries).
    pub fn with_transformer(
        config: PipelineConfig,
        transformer: Arc<dyn Transformer>,
    ) -> CoreResult<Self> {
        let store = MediaStore::open(&config.media_root)?;
        let ledger = Arc::new(AssetLedger::open(&config.ledger_path())?);
        let permits = Arc::new(Semaphore::new(config.max_concurrent_tools.max(1)));

        let executor = StageExecutor::new(
            Arc::clone(&ledger),
            store.clone(),
            Arc::clone(&transformer),
            Arc::clone(&permits),
            config.tool_deadline(),
            config.overlay_font.clone(),
        );
        let locators = executor.locator_locks();

        let transcription = TranscriptionPipeline::new(
            Arc::clone(&transformer),
            store.clone(),
            config.whisper.clone(),
            Arc::clone(&permits),
            locators.clone(),
            config.tool_deadline(),
        );

        let analytics = AnalyticsAggregator::new(Arc::clone(&ledger));

        Ok(Self {
            config,
            store,
            ledger,
            transformer,
            executor,
            transcription,
            analytics,
            locators,
        })
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Stores captured bytes as a new `Raw` asset and returns its id.
    pub async fn create_raw_asset(&self, bytes: &[u8]) -> CoreResult<AssetId> {
        if bytes.is_empty() {
            return Err(CoreError::Validation("captured payload is empty".to_string()));
        }

        let id: AssetId = ulid::Ulid::new().to_string();
        let locator = self.store.media_path(MediaCategory::Raw, &id, "webm")?;
        self.store.write_bytes(&locator, bytes)?;

        // Probe after the payload is on disk; a record only exists once
        // the duration is known.
        let duration_sec = match probe_media(
            self.transformer.as_ref(),
            &locator,
            self.config.tool_deadline(),
        )
        .await
        {
            Ok(info) => info.duration_sec,
            Err(e) => {
                let _ = std::fs::remove_file(&locator);
                return Err(e);
            }
        };

        let record = AssetRecord {
            id: id.clone(),
            ..AssetRecord::new_raw(locator.to_string_lossy().into_owned(), "webm", duration_sec)
        };
        if let Err(e) = self.ledger.create(record).await {
            let _ = std::fs::remove_file(&locator);
            return Err(e);
        }

        info!(asset = %id, bytes = bytes.len(), "raw asset ingested");
        Ok(id)
    }

    // =========================================================================
    // Derivation Stages
    // =========================================================================

    /// Trims `[start, end)` out of a raw asset.
    pub async fn trim_asset(&self, id: &str, start: f64, end: f64) -> CoreResult<AssetId> {
        let window = TimeWindow::new(start, end)?;
        self.executor.execute(id, StageParams::Trim { window }).await
    }

    /// Burns overlay text into the frame during `[start, end)`.
    pub async fn apply_text_overlay(
        &self,
        id: &str,
        text: &str,
        start: f64,
        end: f64,
    ) -> CoreResult<AssetId> {
        let window = TimeWindow::new(start, end)?;
        self.executor
            .execute(
                id,
                StageParams::TextOverlay {
                    text: text.to_string(),
                    window,
                },
            )
            .await
    }

    /// Blurs a pixel region during `[start, end)`.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_blur(
        &self,
        id: &str,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        start: f64,
        end: f64,
    ) -> CoreResult<AssetId> {
        let region = Region::new(x, y, width, height)?;
        let window = TimeWindow::new(start, end)?;
        self.executor
            .execute(
                id,
                StageParams::BlurRegion {
                    region,
                    window: Some(window),
                },
            )
            .await
    }

    /// Draws an arrow annotation during `[start, end)`.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_arrow(
        &self,
        id: &str,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        start: f64,
        end: f64,
    ) -> CoreResult<AssetId> {
        let arrow = ArrowSpec::new(x1, y1, x2, y2)?;
        let window = TimeWindow::new(start, end)?;
        self.executor
            .execute(
                id,
                StageParams::ArrowAnnotation {
                    arrow,
                    window: Some(window),
                },
            )
            .await
    }

    /// Terminal export to MP4; returns the exported artifact's locator.
    pub async fn export_final(&self, id: &str) -> CoreResult<PathBuf> {
        let exported_id = self.executor.execute(id, StageParams::Export).await?;
        let record = self.ledger.get(&exported_id).ok_or_else(|| {
            CoreError::Internal(format!("exported record vanished: {exported_id}"))
        })?;
        Ok(PathBuf::from(record.storage_locator))
    }

    // =========================================================================
    // Transcription and Voiceover
    // =========================================================================

    /// Generates subtitles for an asset; returns the subtitle locator.
    pub async fn generate_subtitles(&self, id: &str) -> CoreResult<PathBuf> {
        let record = self
            .ledger
            .get(id)
            .ok_or_else(|| CoreError::NotFound(format!("asset not found: {id}")))?;
        self.transcription.generate_subtitles(&record).await
    }

    /// Synthesizes a voiceover for `text` and merges it over the asset's
    /// video. Returns the synthesized audio locator and the derived id.
    pub async fn generate_voiceover(
        &self,
        id: &str,
        text: &str,
        profile: &VoiceProfile,
    ) -> CoreResult<(PathBuf, AssetId)> {
        // Resolve and validate before synthesis; a rejected request makes
        // no external call and leaves nothing behind.
        let record = self
            .ledger
            .get(id)
            .ok_or_else(|| CoreError::NotFound(format!("asset not found: {id}")))?;
        StageKind::VoiceoverMerge.check_source_stage(record.stage)?;

        let tts = TtsClient::from_config(&self.config.tts)?;
        let audio = tts.synthesize(text, profile).await?;

        let audio_locator = self
            .store
            .media_path(MediaCategory::Voiceovers, &record.id, "mp3")?;
        {
            let _guard = self.locators.acquire(&audio_locator).await;
            self.store.write_bytes(&audio_locator, &audio)?;
        }

        let derived = match self
            .executor
            .execute(
                id,
                StageParams::VoiceoverMerge {
                    audio: audio_locator.clone(),
                },
            )
            .await
        {
            Ok(derived) => derived,
            Err(e) => {
                // A failed merge must not leave the synthesized track
                // published either.
                let _ = std::fs::remove_file(&audio_locator);
                return Err(e);
            }
        };

        Ok((audio_locator, derived))
    }

    // =========================================================================
    // Analytics and Metadata
    // =========================================================================

    /// Records playback progress for one viewing session.
    pub async fn record_playback(&self, id: &str, watched_seconds: f64) -> CoreResult<()> {
        self.analytics.on_playback_progress(id, watched_seconds).await
    }

    /// Records one render of the share view.
    pub async fn record_view(&self, id: &str) -> CoreResult<()> {
        self.analytics.on_view_rendered(id).await
    }

    /// Average playback completion in percent.
    pub async fn average_completion(&self, id: &str) -> CoreResult<u32> {
        self.analytics.average_completion(id).await
    }

    /// Applies a metadata patch to an asset.
    pub async fn update_metadata(&self, id: &str, patch: MetadataPatch) -> CoreResult<AssetRecord> {
        if patch == MetadataPatch::default() {
            warn!(asset = id, "empty metadata patch");
        }
        self.ledger
            .update(id, |record| {
                if let Some(title) = &patch.title {
                    record.title = Some(title.clone());
                }
                if let Some(description) = &patch.description {
                    record.description = Some(description.clone());
                }
                if let Some(tags) = &patch.tags {
                    record.tags = tags.clone();
                }
            })
            .await
    }

    #[cfg(test)]
    pub(crate) fn executor_for_tests(&self) -> &StageExecutor {
        &self.executor
    }

    /// Fetches an asset record.
    pub fn get_asset(&self, id: &str) -> Option<AssetRecord> {
        self.ledger.get(id)
    }

    /// Lists all asset records.
    pub fn list_assets(&self) -> Vec<AssetRecord> {
        self.ledger.list()
    }
}
