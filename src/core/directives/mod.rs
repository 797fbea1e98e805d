//! Transformation Directives
//!
//! A `TransformationDirective` is a fully-specified, validated invocation
//! of an external tool: tool identity plus an ordered argument vector. It
//! is never rendered into a shell string, so user-supplied text can only
//! ever travel as data. Directives are immutable, serializable (safe to
//! log and replay), and built deterministically — identical inputs yield
//! byte-identical directives.

mod builders;
pub use builders::*;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::TimeWindow;

/// Identity of the external tool a directive targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    Ffmpeg,
    Ffprobe,
    Whisper,
}

/// A validated invocation handed to an external transformation tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationDirective {
    /// Tool to invoke.
    pub tool: ToolKind,
    /// Ordered argument vector, passed verbatim — never a shell string.
    pub args: Vec<String>,
    /// Primary input locator.
    pub input: PathBuf,
    /// Output locator, when the tool produces a single artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Optional time window the directive operates on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
}

// =============================================================================
// Filtergraph Escaping
// =============================================================================

/// Escapes a value for embedding in an ffmpeg filtergraph.
///
/// Filtergraphs treat `:` and `,` as separators and `\` as an escape
/// character; quotes delimit values. Windows paths also contain `\` and a
/// drive-letter `:`, so both user text and font paths go through here.
pub(crate) fn escape_filter_value(raw: &str) -> String {
    raw.replace('\\', r"\\")
        .replace(':', r"\:")
        .replace(',', r"\,")
        .replace('\'', r"\'")
}

/// Escapes user text for the `drawtext` filter.
///
/// `drawtext` additionally expands `%{...}` expressions; user-provided
/// text must stay literal.
pub(crate) fn escape_drawtext_value(raw: &str) -> String {
    escape_filter_value(raw).replace('%', r"\%")
}
