//! Transcription Adapter
//!
//! Derives subtitles from a stored asset: extract the audio track in the
//! engine's input format, invoke the external speech-to-text engine,
//! render the transcript as SRT, and publish it atomically.

pub mod audio;
pub mod formats;
mod models;
pub mod whisper;

pub use models::*;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::info;

use crate::core::{
    config::WhisperConfig,
    ledger::AssetRecord,
    pipeline::LocatorLocks,
    store::{MediaCategory, MediaStore, ScratchGuard},
    tools::Transformer,
    CoreError, CoreResult,
};

/// Orchestrates audio extraction, engine invocation, and SRT publication.
pub struct TranscriptionPipeline {
    transformer: Arc<dyn Transformer>,
    store: MediaStore,
    config: WhisperConfig,
    /// Shared bound on in-flight external tool processes.
    permits: Arc<Semaphore>,
    locators: LocatorLocks,
    deadline: Duration,
}

impl TranscriptionPipeline {
    pub fn new(
        transformer: Arc<dyn Transformer>,
        store: MediaStore,
        config: WhisperConfig,
        permits: Arc<Semaphore>,
        locators: LocatorLocks,
        deadline: Duration,
    ) -> Self {
        Self {
            transformer,
            store,
            config,
            permits,
            locators,
            deadline,
        }
    }

    /// Generates subtitles for `record` and returns the subtitle locator.
    ///
    /// Concurrent requests for the same asset serialize on the subtitle
    /// locator; the second writer re-derives and atomically replaces the
    /// document rather than interleaving with the first.
    pub async fn generate_subtitles(&self, record: &AssetRecord) -> CoreResult<PathBuf> {
        let input = PathBuf::from(&record.storage_locator);
        let subtitle_locator = self
            .store
            .media_path(MediaCategory::Subtitles, &record.id, "srt")?;
        let audio_locator = self
            .store
            .media_path(MediaCategory::Audio, &record.id, "wav")?;

        let _locator_guard = self.locators.acquire(&subtitle_locator).await;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CoreError::Internal("pipeline shut down".to_string()))?;

        // Extract into scratch; nothing is visible until verified.
        let scratch_audio = self.store.scratch_path("wav");
        let mut audio_guard = ScratchGuard::new(scratch_audio.clone());
        audio::extract_audio_for_transcription(
            self.transformer.as_ref(),
            &input,
            &scratch_audio,
            self.deadline,
        )
        .await?;
        self.store.publish(&scratch_audio, &audio_locator)?;
        audio_guard.disarm();

        let segments = whisper::transcribe(
            self.transformer.as_ref(),
            &audio_locator,
            &self.store.scratch_dir(),
            &self.config,
            self.deadline,
        )
        .await?;

        let srt = formats::to_srt(&segments);
        self.store.write_bytes(&subtitle_locator, srt.as_bytes())?;

        info!(
            asset = %record.id,
            cues = segments.len(),
            locator = %subtitle_locator.display(),
            "subtitles published"
        );
        Ok(subtitle_locator)
    }
}
