//! JSON persistence of a document's version history.
//!
//! The whole history lives in one `version_history.json` file inside the
//! store directory. Writes go to a temporary sibling first and are renamed
//! into place, so a crash mid-write leaves the previous file intact.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use scriptdesk_core::{CoreError, Version, VersionHistory, VersionId};

/// File name of the persisted history inside the store directory.
pub const HISTORY_FILE: &str = "version_history.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("History file is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("History file is inconsistent: {0}")]
    Core(#[from] CoreError),
}

/// On-disk layout of the history file.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    current: Option<VersionId>,
    /// Creation order.
    versions: Vec<Version>,
}

/// Reads and writes the version history of one document.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    /// Load the persisted history; a missing file is an empty history.
    pub async fn load(&self) -> Result<VersionHistory, StoreError> {
        let raw = match tokio::fs::read(self.path()).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(VersionHistory::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: HistoryFile = serde_json::from_slice(&raw)?;
        let history = VersionHistory::from_parts(file.versions, file.current)?;
        tracing::debug!(path = %self.path().display(), versions = history.len(), "History loaded");
        Ok(history)
    }

    /// Persist `history`, replacing any previous file.
    pub async fn save(&self, history: &VersionHistory) -> Result<(), StoreError> {
        let (versions, current) = history.to_parts();
        self.save_parts(versions, current).await
    }

    /// Persist already-extracted parts, for callers that must not hold a
    /// lock on the history across the write.
    pub async fn save_parts(
        &self,
        versions: Vec<Version>,
        current: Option<VersionId>,
    ) -> Result<(), StoreError> {
        let count = versions.len();
        let json = serde_json::to_vec_pretty(&HistoryFile { current, versions })?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(path = %path.display(), versions = count, "History saved");
        Ok(())
    }
}
