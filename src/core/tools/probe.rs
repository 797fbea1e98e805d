//! Media Probing
//!
//! Runs the probe directive and parses the JSON report into the stream
//! facts the pipeline needs (duration, frame geometry, audio presence).

use std::path::Path;
use std::time::Duration;

use crate::core::{directives, CoreError, CoreResult};

use super::Transformer;

/// Media information extracted by the probe tool.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration_sec: f64,
    /// Container format
    pub format: String,
    /// Video stream info (if present)
    pub video: Option<VideoStreamInfo>,
    /// Audio stream info (if present)
    pub audio: Option<AudioStreamInfo>,
}

/// Video stream information
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
    pub codec: String,
}

/// Audio stream information
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStreamInfo {
    pub sample_rate: u32,
    pub channels: u8,
    pub codec: String,
}

impl MediaInfo {
    /// Frame bounds of the first video stream, when one exists.
    pub fn frame_bounds(&self) -> Option<(u32, u32)> {
        self.video.as_ref().map(|v| (v.width, v.height))
    }
}

/// Probes `input` through the transformer seam.
pub async fn probe_media(
    transformer: &dyn Transformer,
    input: &Path,
    deadline: Duration,
) -> CoreResult<MediaInfo> {
    let directive = directives::probe(input);
    let output = transformer.run(&directive, deadline).await?;
    parse_probe_output(&output.stdout)
}

/// Parses the probe tool's JSON report.
pub fn parse_probe_output(json_str: &str) -> CoreResult<MediaInfo> {
    let json: serde_json::Value = serde_json::from_str(json_str)?;

    let format = json
        .get("format")
        .ok_or_else(|| CoreError::Upstream {
            status: None,
            detail: "probe report missing format section".to_string(),
        })?;

    let duration_sec = format
        .get("duration")
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let format_name = format
        .get("format_name")
        .and_then(|f| f.as_str())
        .unwrap_or("unknown")
        .to_string();

    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .cloned()
        .unwrap_or_default();

    let mut video = None;
    let mut audio = None;

    for stream in streams {
        match stream.get("codec_type").and_then(|c| c.as_str()) {
            Some("video") if video.is_none() => {
                video = Some(VideoStreamInfo {
                    width: stream.get("width").and_then(|w| w.as_u64()).unwrap_or(0) as u32,
                    height: stream.get("height").and_then(|h| h.as_u64()).unwrap_or(0) as u32,
                    codec: stream
                        .get("codec_name")
                        .and_then(|c| c.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                });
            }
            Some("audio") if audio.is_none() => {
                audio = Some(AudioStreamInfo {
                    sample_rate: stream
                        .get("sample_rate")
                        .and_then(|s| s.as_str())
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(44100),
                    channels: stream.get("channels").and_then(|c| c.as_u64()).unwrap_or(2) as u8,
                    codec: stream
                        .get("codec_name")
                        .and_then(|c| c.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                });
            }
            _ => {}
        }
    }

    Ok(MediaInfo {
        duration_sec,
        format: format_name,
        video,
        audio,
    })
}
