//! External Speech-to-Text Invocation
//!
//! Runs the external `whisper` CLI over an extracted audio file and
//! parses the JSON transcript it writes next to the audio.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use super::models::{EngineTranscript, TranscriptSegment};
use crate::core::{config::WhisperConfig, directives, tools::Transformer, CoreError, CoreResult};

/// Transcribes `audio` and returns the ordered segment list.
///
/// The engine writes `<audio stem>.json` into `output_dir`; that file is
/// read, parsed, and removed.
pub async fn transcribe(
    transformer: &dyn Transformer,
    audio: &Path,
    output_dir: &Path,
    config: &WhisperConfig,
    deadline: Duration,
) -> CoreResult<Vec<TranscriptSegment>> {
    let directive =
        directives::transcribe(audio, output_dir, &config.model, &config.language)?;
    transformer.run(&directive, deadline).await?;

    let stem = audio
        .file_stem()
        .ok_or_else(|| CoreError::Validation(format!("audio path has no stem: {}", audio.display())))?;
    let transcript_path = output_dir.join(format!("{}.json", stem.to_string_lossy()));

    let raw = std::fs::read_to_string(&transcript_path).map_err(|e| CoreError::Upstream {
        status: None,
        detail: format!(
            "engine produced no transcript at {}: {e}",
            transcript_path.display()
        ),
    })?;
    // The transcript is consumed; it never counts as a published artifact.
    let _ = std::fs::remove_file(&transcript_path);

    let transcript: EngineTranscript = serde_json::from_str(&raw)?;
    let language = transcript
        .language
        .clone()
        .unwrap_or_else(|| "unknown".to_string());
    let segments = transcript.into_segments();
    info!(
        audio = %audio.display(),
        segments = segments.len(),
        language = %language,
        "transcription complete"
    );
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::directives::{ToolKind, TransformationDirective};
    use crate::core::tools::ToolOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Stub engine: records the directive and writes a canned transcript
    /// where the real engine would.
    struct StubEngine {
        transcript: String,
        seen: Mutex<Vec<TransformationDirective>>,
    }

    #[async_trait]
    impl Transformer for StubEngine {
        async fn run(
            &self,
            directive: &TransformationDirective,
            _deadline: Duration,
        ) -> CoreResult<ToolOutput> {
            self.seen.lock().unwrap().push(directive.clone());

            let dir_flag = directive
                .args
                .iter()
                .position(|a| a == "--output_dir")
                .unwrap();
            let out_dir = Path::new(&directive.args[dir_flag + 1]).to_path_buf();
            let stem = directive.input.file_stem().unwrap().to_string_lossy().to_string();
            std::fs::write(out_dir.join(format!("{stem}.json")), &self.transcript).unwrap();

            Ok(ToolOutput {
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn transcribe_parses_engine_output() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("clip.wav");
        std::fs::write(&audio, b"fake").unwrap();

        let engine = StubEngine {
            transcript: r#"{
                "language": "en",
                "segments": [
                    {"start": 0.0, "end": 1.5, "text": " First."},
                    {"start": 1.5, "end": 3.0, "text": " Second."}
                ]
            }"#
            .to_string(),
            seen: Mutex::new(Vec::new()),
        };

        let segments = transcribe(
            &engine,
            &audio,
            dir.path(),
            &WhisperConfig::default(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].end_sec, 1.5);

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].tool, ToolKind::Whisper);

        // Transcript JSON is consumed, not left behind.
        assert!(!dir.path().join("clip.json").exists());
    }

    #[tokio::test]
    async fn missing_transcript_is_an_upstream_error() {
        struct SilentEngine;

        #[async_trait]
        impl Transformer for SilentEngine {
            async fn run(
                &self,
                _directive: &TransformationDirective,
                _deadline: Duration,
            ) -> CoreResult<ToolOutput> {
                Ok(ToolOutput {
                    exit_code: Some(0),
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
        }

        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("clip.wav");
        std::fs::write(&audio, b"fake").unwrap();

        let err = transcribe(
            &SilentEngine,
            &audio,
            dir.path(),
            &WhisperConfig::default(),
            Duration::from_secs(60),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::Upstream { .. }));
    }
}
