//! Input resolution: turn the current file selection into bytes.
//!
//! A submission captures the selection synchronously, at the moment its
//! trigger is accepted, as a [`Selection`]. The bytes are read later, but
//! a `clear` or `select` issued after the trigger no longer changes which
//! file that submission uploads. Nothing is cached between submissions, so
//! clearing the selection after a previous run makes the next trigger
//! behave exactly like "no file chosen".

use crate::error::SubmitError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// One user-selected file, read into memory.
///
/// The bytes are opaque: the image is not decoded or validated here, the
/// service decides what it can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name sent as the multipart part's `filename`.
    pub name: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk.
    pub async fn from_path(path: &Path) -> Result<Self, SubmitError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SubmitError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => SubmitError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => SubmitError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        debug!("Read selected file {} ({} bytes)", path.display(), bytes.len());
        Ok(Self { name, bytes })
    }
}

/// The selection as it was when a trigger was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Nothing chosen.
    Empty,
    /// A path, read when the submission gets to it.
    Path(PathBuf),
    /// Bytes already in memory.
    File(SelectedFile),
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Empty)
    }

    /// Resolve to file content. `Empty` yields `None`.
    pub async fn load(self) -> Result<Option<SelectedFile>, SubmitError> {
        match self {
            Selection::Empty => Ok(None),
            Selection::Path(path) => SelectedFile::from_path(&path).await.map(Some),
            Selection::File(file) => Ok(Some(file)),
        }
    }
}

/// Source of the current zero-or-one file selection.
///
/// Takes the role of the page's file-input element. Implementations must
/// be `Send + Sync`: concurrent submissions query the same provider.
#[async_trait]
pub trait FileProvider: Send + Sync {
    /// Capture the current selection without waiting.
    fn snapshot(&self) -> Selection;

    /// Capture and read the selected file, or `None` if nothing is selected.
    async fn selected(&self) -> Result<Option<SelectedFile>, SubmitError> {
        self.snapshot().load().await
    }
}

/// A shared, mutable file input holding at most one path.
///
/// Cloning shares the underlying slot, so a UI thread can `select` while a
/// dispatcher reads.
#[derive(Debug, Clone, Default)]
pub struct PathSelection {
    slot: Arc<Mutex<Option<PathBuf>>>,
}

impl PathSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `path` already selected.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let s = Self::new();
        s.select(path);
        s
    }

    /// Replace the selection.
    pub fn select(&self, path: impl Into<PathBuf>) {
        *self.lock() = Some(path.into());
    }

    /// Empty the selection.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn current(&self) -> Option<PathBuf> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PathBuf>> {
        // A poisoned slot still holds a valid Option.
        self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl FileProvider for PathSelection {
    fn snapshot(&self) -> Selection {
        self.current().map_or(Selection::Empty, Selection::Path)
    }
}

/// An in-memory selection, mainly for embedding and tests.
impl FileProvider for Option<SelectedFile> {
    fn snapshot(&self) -> Selection {
        self.clone().map_or(Selection::Empty, Selection::File)
    }
}
