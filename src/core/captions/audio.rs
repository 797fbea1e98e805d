//! Transcription Audio Extraction
//!
//! Produces the mono 16 kHz 16-bit PCM WAV the speech-to-text engine
//! expects, and verifies the extracted header before handing the file
//! on. A wrong sample rate silently degrades transcription quality, so
//! extraction failures must be loud.

use std::path::Path;
use std::time::Duration;

use crate::core::{directives, tools::Transformer, CoreError, CoreResult};

/// Required sample rate for the speech-to-text engine.
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 16_000;

/// Extracts the audio track of `input` into `output` as transcription
/// WAV, then verifies the result.
pub async fn extract_audio_for_transcription(
    transformer: &dyn Transformer,
    input: &Path,
    output: &Path,
    deadline: Duration,
) -> CoreResult<()> {
    let directive = directives::extract_audio(input, output);
    transformer.run(&directive, deadline).await?;
    verify_transcription_wav(output)
}

/// Verifies a WAV header matches the transcription input contract.
pub fn verify_transcription_wav(path: &Path) -> CoreResult<()> {
    let reader = hound::WavReader::open(path).map_err(|e| CoreError::Upstream {
        status: None,
        detail: format!("extracted audio is not readable WAV: {e}"),
    })?;

    let spec = reader.spec();
    if spec.sample_rate != TRANSCRIPTION_SAMPLE_RATE {
        return Err(CoreError::Upstream {
            status: None,
            detail: format!(
                "extracted audio has sample rate {}, expected {}",
                spec.sample_rate, TRANSCRIPTION_SAMPLE_RATE
            ),
        });
    }
    if spec.channels != 1 {
        return Err(CoreError::Upstream {
            status: None,
            detail: format!(
                "extracted audio has {} channels, expected mono",
                spec.channels
            ),
        });
    }
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(CoreError::Upstream {
            status: None,
            detail: "extracted audio is not 16-bit PCM".to_string(),
        });
    }

    Ok(())
}
