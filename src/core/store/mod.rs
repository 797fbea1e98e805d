//! Media Store
//!
//! Owns the on-disk layout of stored media and the publication
//! discipline: tools write into a scratch directory and artifacts are
//! renamed into their final locator only after the producing tool
//! reports success. No partially-written artifact is ever visible under
//! a final locator.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::{fs, CoreResult};

/// Storage category an artifact belongs to. Each maps to a directory
/// under the media root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaCategory {
    Raw,
    Trimmed,
    Edited,
    Exports,
    Audio,
    Subtitles,
    Voiceovers,
}

impl MediaCategory {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Trimmed => "trimmed",
            Self::Edited => "edited",
            Self::Exports => "exports",
            Self::Audio => "audio",
            Self::Subtitles => "subtitles",
            Self::Voiceovers => "voiceovers",
        }
    }

    fn all() -> [Self; 7] {
        [
            Self::Raw,
            Self::Trimmed,
            Self::Edited,
            Self::Exports,
            Self::Audio,
            Self::Subtitles,
            Self::Voiceovers,
        ]
    }
}

const SCRATCH_DIR: &str = ".scratch";

/// Filesystem layout rooted at the configured media directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Opens the store, creating the category and scratch directories.
    pub fn open(root: &Path) -> CoreResult<Self> {
        for category in MediaCategory::all() {
            std::fs::create_dir_all(root.join(category.dir_name()))?;
        }
        std::fs::create_dir_all(root.join(SCRATCH_DIR))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final locator for an artifact. The id is validated as a path
    /// component first; ids never carry traversal characters into the
    /// layout.
    pub fn media_path(&self, category: MediaCategory, id: &str, ext: &str) -> CoreResult<PathBuf> {
        fs::validate_path_id_component(id, "assetId")?;
        Ok(self
            .root
            .join(category.dir_name())
            .join(format!("{id}.{ext}")))
    }

    /// Allocates a unique scratch path for a tool to write into.
    pub fn scratch_path(&self, ext: &str) -> PathBuf {
        self.root
            .join(SCRATCH_DIR)
            .join(format!("{}.{ext}", uuid::Uuid::new_v4()))
    }

    /// Scratch directory for tools that produce sibling files
    /// (transcript JSON next to the audio).
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR)
    }

    /// Writes a byte payload directly to its final locator atomically.
    pub fn write_bytes(&self, path: &Path, bytes: &[u8]) -> CoreResult<()> {
        fs::atomic_write_bytes(path, bytes)
    }

    /// Publishes a finished scratch artifact under its final locator.
    pub fn publish(&self, scratch: &Path, locator: &Path) -> CoreResult<()> {
        if let Some(parent) = locator.parent() {
            std::fs::create_dir_all(parent)?;
        }
        fs::atomic_replace(locator, scratch)
    }
}

/// Removes a scratch artifact on drop unless it was published.
///
/// Guards the window between a tool writing its output and the executor
/// renaming it into place; any failure path discards the partial file.
pub struct ScratchGuard {
    path: PathBuf,
    armed: bool,
}

impl ScratchGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Call once the artifact has been renamed away.
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to discard scratch artifact");
            }
        }
    }
}
