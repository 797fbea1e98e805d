//! Pipeline Configuration
//!
//! Runtime configuration for the derivation pipeline: media root, ledger
//! location, concurrency bound, tool deadline, and external engine
//! settings. All fields are serde-defaulted so a partial config document
//! deserializes cleanly.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable carrying the TTS credential.
pub const TTS_API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Root directory for all stored media and the ledger document.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Maximum number of concurrently in-flight external tool processes.
    #[serde(default = "default_max_concurrent_tools")]
    pub max_concurrent_tools: usize,

    /// Per-invocation deadline for external tools, in seconds.
    #[serde(default = "default_tool_deadline_secs")]
    pub tool_deadline_secs: u64,

    /// Font file used by the text overlay stage.
    #[serde(default = "default_overlay_font")]
    pub overlay_font: PathBuf,

    /// Speech-to-text engine settings.
    #[serde(default)]
    pub whisper: WhisperConfig,

    /// Text-to-speech service settings.
    #[serde(default)]
    pub tts: TtsConfig,
}

fn default_media_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelsmith")
}

fn default_max_concurrent_tools() -> usize {
    num_cpus::get().max(2)
}

fn default_tool_deadline_secs() -> u64 {
    300
}

fn default_overlay_font() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        PathBuf::from("C:/Windows/Fonts/arial.ttf")
    }
    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/System/Library/Fonts/Helvetica.ttc")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf")
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            media_root: default_media_root(),
            max_concurrent_tools: default_max_concurrent_tools(),
            tool_deadline_secs: default_tool_deadline_secs(),
            overlay_font: default_overlay_font(),
            whisper: WhisperConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Builds a config from defaults plus environment overrides.
    ///
    /// Recognized variables: `REELSMITH_MEDIA_ROOT`,
    /// `REELSMITH_TOOL_DEADLINE_SECS`, `WHISPER_MODEL`,
    /// `ELEVENLABS_API_KEY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("REELSMITH_MEDIA_ROOT") {
            if !root.trim().is_empty() {
                config.media_root = PathBuf::from(root);
            }
        }
        if let Ok(secs) = std::env::var("REELSMITH_TOOL_DEADLINE_SECS") {
            if let Ok(parsed) = secs.trim().parse::<u64>() {
                if parsed > 0 {
                    config.tool_deadline_secs = parsed;
                }
            }
        }
        if let Ok(model) = std::env::var("WHISPER_MODEL") {
            if !model.trim().is_empty() {
                config.whisper.model = model;
            }
        }
        if let Ok(key) = std::env::var(TTS_API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.tts.api_key = Some(key);
            }
        }

        config
    }

    /// Path of the ledger document under the media root.
    pub fn ledger_path(&self) -> PathBuf {
        self.media_root.join("assets.json")
    }

    /// Tool deadline as a `Duration`.
    pub fn tool_deadline(&self) -> Duration {
        Duration::from_secs(self.tool_deadline_secs)
    }
}

/// Speech-to-text engine settings (external `whisper` CLI).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WhisperConfig {
    /// Model size passed to the engine (tiny, base, small, medium, large).
    #[serde(default = "default_whisper_model")]
    pub model: String,

    /// Language hint passed to the engine.
    #[serde(default = "default_whisper_language")]
    pub language: String,
}

fn default_whisper_model() -> String {
    "base".to_string()
}

fn default_whisper_language() -> String {
    "en".to_string()
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model: default_whisper_model(),
            language: default_whisper_language(),
        }
    }
}

/// Text-to-speech service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TtsConfig {
    /// Base URL of the TTS service.
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,

    /// Credential for the service. Never serialized.
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_tts_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_tts_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_tts_timeout_secs() -> u64 {
    120
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: default_tts_base_url(),
            api_key: None,
            timeout_secs: default_tts_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = PipelineConfig::default();
        assert!(config.max_concurrent_tools >= 2);
        assert_eq!(config.tool_deadline_secs, 300);
        assert_eq!(config.whisper.model, "base");
        assert!(config.tts.base_url.starts_with("https://"));
        assert!(config.tts.api_key.is_none());
    }

    #[test]
    fn partial_document_deserializes_with_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"mediaRoot": "/srv/media"}"#).unwrap();
        assert_eq!(config.media_root, PathBuf::from("/srv/media"));
        assert_eq!(config.tool_deadline_secs, 300);
        assert_eq!(config.whisper.language, "en");
    }

    #[test]
    fn api_key_is_never_serialized() {
        let mut config = PipelineConfig::default();
        config.tts.api_key = Some("sk-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn ledger_path_is_under_media_root() {
        let mut config = PipelineConfig::default();
        config.media_root = PathBuf::from("/srv/media");
        assert_eq!(config.ledger_path(), PathBuf::from("/srv/media/assets.json"));
    }
}
