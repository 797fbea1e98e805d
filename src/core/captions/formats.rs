//! Subtitle Rendering
//!
//! Pure conversion of transcript segments into SRT text. Cues are
//! numbered sequentially from 1; timestamps are `HH:MM:SS,mmm` with the
//! milliseconds FLOORED from the fractional seconds (not rounded), and a
//! blank line terminates each cue.

use super::models::TranscriptSegment;

/// Renders segments as an SRT document.
pub fn to_srt(segments: &[TranscriptSegment]) -> String {
    let mut output = String::new();

    for (index, segment) in segments.iter().enumerate() {
        output.push_str(&format!("{}\n", index + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(segment.start_sec),
            format_srt_timestamp(segment.end_sec)
        ));
        output.push_str(segment.text.trim());
        output.push_str("\n\n");
    }

    output
}

/// Formats seconds as an SRT timestamp, flooring each component.
fn format_srt_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let hrs = (seconds / 3600.0).floor() as u64;
    let mins = ((seconds % 3600.0) / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let ms = ((seconds % 1.0) * 1000.0).floor() as u64;

    format!("{hrs:02}:{mins:02}:{secs:02},{ms:03}")
}
