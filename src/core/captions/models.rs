//! Transcript Model Definitions

use serde::{Deserialize, Serialize};

/// One transcribed segment, ordered by start time within a transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_sec: f64, end_sec: f64, text: &str) -> Self {
        Self {
            start_sec,
            end_sec,
            text: text.to_string(),
        }
    }
}

/// JSON transcript document produced by the external speech-to-text
/// engine: a segment list plus the detected language.
#[derive(Debug, Deserialize)]
pub struct EngineTranscript {
    #[serde(default)]
    pub segments: Vec<EngineSegment>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Raw segment as the engine writes it.
#[derive(Debug, Deserialize)]
pub struct EngineSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl EngineTranscript {
    /// Converts the engine document into ordered pipeline segments.
    ///
    /// The engine emits segments ordered and non-overlapping by
    /// construction; that is trusted, not enforced here.
    pub fn into_segments(self) -> Vec<TranscriptSegment> {
        self.segments
            .into_iter()
            .map(|s| TranscriptSegment::new(s.start, s.end, &s.text))
            .collect()
    }
}
