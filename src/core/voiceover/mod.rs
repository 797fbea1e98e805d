//! Voiceover Adapter
//!
//! Client for the external text-to-speech network service. Synthesis is
//! an HTTPS POST with a JSON body and a credential header; any non-2xx
//! response surfaces `Upstream` carrying the status code and response
//! body. Merging the synthesized track into a video is the
//! voiceover-merge pipeline stage.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::core::{config::TtsConfig, CoreError, CoreResult};

/// Default voice of the service ("Rachel").
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Default synthesis model.
pub const DEFAULT_MODEL_ID: &str = "eleven_turbo_v2_5";

/// Voice selection and synthesis tuning for one request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceProfile {
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

impl VoiceProfile {
    /// Profile for a specific voice with default tuning.
    pub fn for_voice(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// HTTP client for the text-to-speech service.
pub struct TtsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for TtsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TtsClient {
    /// Builds a client from the TTS config. Fails when no credential is
    /// configured — detected before any request is made.
    pub fn from_config(config: &TtsConfig) -> CoreResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            CoreError::Validation(format!(
                "text-to-speech credential not configured; set {}",
                crate::core::config::TTS_API_KEY_ENV
            ))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn synthesis_url(&self, voice_id: &str) -> String {
        format!("{}/text-to-speech/{}", self.base_url, voice_id)
    }

    /// Synthesizes `text` with `profile`, returning the raw audio bytes.
    pub async fn synthesize(&self, text: &str, profile: &VoiceProfile) -> CoreResult<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(CoreError::Validation(
                "voiceover text is empty".to_string(),
            ));
        }

        let body = SynthesisRequest {
            text,
            model_id: &profile.model_id,
            voice_settings: VoiceSettings {
                stability: profile.stability,
                similarity_boost: profile.similarity_boost,
            },
        };

        debug!(voice = %profile.voice_id, chars = text.len(), "requesting synthesis");
        let response = self
            .http
            .post(self.synthesis_url(&profile.voice_id))
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Upstream {
                status: None,
                detail: format!("text-to-speech request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "text-to-speech request rejected");
            return Err(CoreError::upstream_http(status.as_u16(), &body));
        }

        let bytes = response.bytes().await.map_err(|e| CoreError::Upstream {
            status: None,
            detail: format!("failed to read synthesized audio: {e}"),
        })?;
        Ok(bytes.to_vec())
    }
}
