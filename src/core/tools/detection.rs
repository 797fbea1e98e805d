//! Tool Detection
//!
//! Locates the external binaries the pipeline invokes. Environment
//! overrides win; otherwise the system `PATH` is scanned.

use std::path::PathBuf;

use crate::core::{CoreError, CoreResult};

/// Resolved locations of the external tools.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub whisper: PathBuf,
}

impl ToolPaths {
    /// Detects all tools from the environment and `PATH`.
    ///
    /// Overrides: `FFMPEG_PATH`, `FFPROBE_PATH`, `WHISPER_PATH`.
    pub fn detect() -> CoreResult<Self> {
        Ok(Self {
            ffmpeg: resolve_binary("ffmpeg", "FFMPEG_PATH")?,
            ffprobe: resolve_binary("ffprobe", "FFPROBE_PATH")?,
            whisper: resolve_binary("whisper", "WHISPER_PATH")?,
        })
    }

    /// Builds tool paths from explicit locations (tests, embedders that
    /// manage their own binaries).
    pub fn with_paths(ffmpeg: PathBuf, ffprobe: PathBuf, whisper: PathBuf) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            whisper,
        }
    }
}

fn binary_file_name(name: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        format!("{name}.exe")
    }
    #[cfg(not(target_os = "windows"))]
    {
        name.to_string()
    }
}

/// Resolves a binary: env override first, then a `PATH` scan.
fn resolve_binary(name: &str, env_var: &str) -> CoreResult<PathBuf> {
    if let Ok(overridden) = std::env::var(env_var) {
        let path = PathBuf::from(overridden.trim());
        if path.is_file() {
            return Ok(path);
        }
        return Err(CoreError::NotFound(format!(
            "{env_var} points at a missing file: {}",
            path.display()
        )));
    }

    let file_name = binary_file_name(name);
    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(CoreError::NotFound(format!(
        "{name} not found in PATH; set {env_var} to its location"
    )))
}
