//! Per-Stage Directive Builders
//!
//! Pure functions mapping stage parameters into `TransformationDirective`s.
//! No I/O happens here; window validity is enforced by the parameter
//! types, geometry is checked against frame bounds when they are known,
//! and all free-form text is escaped and carried as a single argument.

use std::path::Path;

use super::{escape_drawtext_value, escape_filter_value, ToolKind, TransformationDirective};
use crate::core::{ArrowSpec, CoreError, CoreResult, Region, TimeWindow};

/// Fixed-precision second formatting keeps directives byte-identical for
/// identical inputs.
fn fmt_sec(v: f64) -> String {
    format!("{v:.3}")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn enable_clause(window: Option<&TimeWindow>) -> String {
    match window {
        Some(w) => format!(
            ":enable='between(t,{},{})'",
            fmt_sec(w.start_sec),
            fmt_sec(w.end_sec)
        ),
        None => String::new(),
    }
}

// =============================================================================
// Derivation Stages
// =============================================================================

/// Stream-copy trim of `window` out of `input`.
pub fn trim(input: &Path, output: &Path, window: &TimeWindow) -> TransformationDirective {
    TransformationDirective {
        tool: ToolKind::Ffmpeg,
        args: vec![
            "-y".into(),
            "-i".into(),
            path_arg(input),
            "-ss".into(),
            fmt_sec(window.start_sec),
            "-to".into(),
            fmt_sec(window.end_sec),
            "-c".into(),
            "copy".into(),
            path_arg(output),
        ],
        input: input.to_path_buf(),
        output: Some(output.to_path_buf()),
        window: Some(*window),
    }
}

/// Burns `text` into the frame at a fixed corner position during `window`.
///
/// The text travels inside the `-vf` argument, escaped for the
/// filtergraph grammar — crafted overlay text cannot break out of the
/// filter expression, and nothing is ever shell-interpreted.
pub fn text_overlay(
    input: &Path,
    output: &Path,
    text: &str,
    window: &TimeWindow,
    font: &Path,
) -> CoreResult<TransformationDirective> {
    if text.trim().is_empty() {
        return Err(CoreError::Validation("overlay text is empty".to_string()));
    }

    let filter = format!(
        "format=yuv420p,drawtext=fontfile='{}':text='{}':x=20:y=20{}",
        escape_filter_value(&path_arg(font)),
        escape_drawtext_value(text),
        enable_clause(Some(window)),
    );

    Ok(TransformationDirective {
        tool: ToolKind::Ffmpeg,
        args: vec![
            "-y".into(),
            "-analyzeduration".into(),
            "200M".into(),
            "-probesize".into(),
            "200M".into(),
            "-i".into(),
            path_arg(input),
            "-vf".into(),
            filter,
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-movflags".into(),
            "+faststart".into(),
            "-c:a".into(),
            "aac".into(),
            path_arg(output),
        ],
        input: input.to_path_buf(),
        output: Some(output.to_path_buf()),
        window: Some(*window),
    })
}

/// Blurs `region` by cropping it out, box-blurring, and overlaying it
/// back in place, optionally gated to `window`.
pub fn blur_region(
    input: &Path,
    output: &Path,
    region: &Region,
    window: Option<&TimeWindow>,
    frame: Option<(u32, u32)>,
) -> CoreResult<TransformationDirective> {
    if let Some((w, h)) = frame {
        region.check_within(w, h)?;
    }

    let enable = enable_clause(window);
    let filter = format!(
        "[0:v]crop={w}:{h}:{x}:{y},boxblur=10{enable}[blurred];[0:v][blurred]overlay={x}:{y}{enable}",
        w = region.width,
        h = region.height,
        x = region.x,
        y = region.y,
    );

    Ok(TransformationDirective {
        tool: ToolKind::Ffmpeg,
        args: vec![
            "-y".into(),
            "-i".into(),
            path_arg(input),
            "-filter_complex".into(),
            filter,
            "-c:v".into(),
            "libvpx-vp9".into(),
            "-c:a".into(),
            "copy".into(),
            path_arg(output),
        ],
        input: input.to_path_buf(),
        output: Some(output.to_path_buf()),
        window: window.copied(),
    })
}

/// Draws an arrow annotation as a shaft plus a square head, optionally
/// gated to `window`.
pub fn arrow_annotation(
    input: &Path,
    output: &Path,
    arrow: &ArrowSpec,
    window: Option<&TimeWindow>,
    frame: Option<(u32, u32)>,
) -> CoreResult<TransformationDirective> {
    if let Some((w, h)) = frame {
        arrow.check_within(w, h)?;
    }

    let enable = enable_clause(window);
    let shaft_len = arrow.length().round() as i64;
    let head_x = (arrow.x2 - 10.0).max(0.0).round() as i64;
    let head_y = (arrow.y2 - 10.0).max(0.0).round() as i64;
    let filter = format!(
        "drawbox=x={x1}:y={y1}:w={len}:h=5:color=red@0.8:t=fill{enable},\
         drawbox=x={hx}:y={hy}:w=20:h=20:color=red@0.8:t=fill{enable}",
        x1 = arrow.x1.round() as i64,
        y1 = arrow.y1.round() as i64,
        len = shaft_len,
        hx = head_x,
        hy = head_y,
    );

    Ok(TransformationDirective {
        tool: ToolKind::Ffmpeg,
        args: vec![
            "-y".into(),
            "-i".into(),
            path_arg(input),
            "-vf".into(),
            filter,
            "-c:v".into(),
            "libvpx-vp9".into(),
            "-c:a".into(),
            "copy".into(),
            path_arg(output),
        ],
        input: input.to_path_buf(),
        output: Some(output.to_path_buf()),
        window: window.copied(),
    })
}

/// Terminal re-encode to H.264/AAC MP4.
pub fn export_mp4(input: &Path, output: &Path) -> TransformationDirective {
    TransformationDirective {
        tool: ToolKind::Ffmpeg,
        args: vec![
            "-y".into(),
            "-i".into(),
            path_arg(input),
            "-c:v".into(),
            "libx264".into(),
            "-c:a".into(),
            "aac".into(),
            path_arg(output),
        ],
        input: input.to_path_buf(),
        output: Some(output.to_path_buf()),
        window: None,
    }
}

/// Replaces the audio track of `video` with `audio`.
///
/// The video stream is copied bit-identically; `-shortest` truncates the
/// output to the shorter of the two inputs.
pub fn voiceover_merge(video: &Path, audio: &Path, output: &Path) -> TransformationDirective {
    TransformationDirective {
        tool: ToolKind::Ffmpeg,
        args: vec![
            "-y".into(),
            "-i".into(),
            path_arg(video),
            "-i".into(),
            path_arg(audio),
            "-c:v".into(),
            "copy".into(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-shortest".into(),
            path_arg(output),
        ],
        input: video.to_path_buf(),
        output: Some(output.to_path_buf()),
        window: None,
    }
}

// =============================================================================
// Fixed Adapter Directives
// =============================================================================

/// Extracts the audio track as mono 16 kHz 16-bit PCM WAV, the input
/// format the speech-to-text engine expects.
pub fn extract_audio(input: &Path, output: &Path) -> TransformationDirective {
    TransformationDirective {
        tool: ToolKind::Ffmpeg,
        args: vec![
            "-y".into(),
            "-i".into(),
            path_arg(input),
            "-vn".into(),
            "-acodec".into(),
            "pcm_s16le".into(),
            "-ar".into(),
            "16000".into(),
            "-ac".into(),
            "1".into(),
            path_arg(output),
        ],
        input: input.to_path_buf(),
        output: Some(output.to_path_buf()),
        window: None,
    }
}

/// Probes a media file, printing format and stream info as JSON.
pub fn probe(input: &Path) -> TransformationDirective {
    TransformationDirective {
        tool: ToolKind::Ffprobe,
        args: vec![
            "-v".into(),
            "quiet".into(),
            "-print_format".into(),
            "json".into(),
            "-show_format".into(),
            "-show_streams".into(),
            path_arg(input),
        ],
        input: input.to_path_buf(),
        output: None,
        window: None,
    }
}

/// Runs the external speech-to-text engine over an extracted audio file,
/// writing a JSON transcript into `output_dir`.
pub fn transcribe(
    audio: &Path,
    output_dir: &Path,
    model: &str,
    language: &str,
) -> CoreResult<TransformationDirective> {
    if model.trim().is_empty() || language.trim().is_empty() {
        return Err(CoreError::Validation(
            "transcription model and language must be non-empty".to_string(),
        ));
    }

    Ok(TransformationDirective {
        tool: ToolKind::Whisper,
        args: vec![
            path_arg(audio),
            "--model".into(),
            model.to_string(),
            "--output_format".into(),
            "json".into(),
            "--output_dir".into(),
            path_arg(output_dir),
            "--language".into(),
            language.to_string(),
        ],
        input: audio.to_path_buf(),
        output: None,
        window: None,
    })
}
