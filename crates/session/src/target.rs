//! The [`SaveTarget`] that persists an open document.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scriptdesk_autosave::{SaveError, SaveTarget};
use scriptdesk_core::VersionHistory;

use crate::draft::Draft;
use crate::store::{HistoryStore, StoreError};

/// Description recorded on versions created by a save.
pub const SAVE_DESCRIPTION: &str = "Auto-save";

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl From<StoreError> for SaveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => SaveError::Io(e.to_string()),
            StoreError::Json(e) => SaveError::Serialization(e.to_string()),
            StoreError::Core(e) => SaveError::Failed(e.to_string()),
        }
    }
}

/// Writes the draft to the document file, then snapshots it into the
/// version history and persists the history.
///
/// No version is created when the draft still matches the current version
/// (for example right after a restore), so repeated saves of an unchanged
/// draft do not grow the history. The history file is still rewritten in
/// that case if the in-memory history changed since the last successful
/// write.
pub struct DocumentTarget {
    document_path: PathBuf,
    draft: Arc<Mutex<Draft>>,
    history: Arc<Mutex<VersionHistory>>,
    store: HistoryStore,
    /// The in-memory history differs from the history file.
    history_dirty: AtomicBool,
}

impl DocumentTarget {
    pub fn new(
        document_path: impl Into<PathBuf>,
        draft: Arc<Mutex<Draft>>,
        history: Arc<Mutex<VersionHistory>>,
        store: HistoryStore,
    ) -> Self {
        Self {
            document_path: document_path.into(),
            draft,
            history,
            store,
            history_dirty: AtomicBool::new(false),
        }
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// Record that the history changed outside a save, so the next save
    /// writes it even if no version is created.
    pub fn mark_history_dirty(&self) {
        self.history_dirty.store(true, Ordering::SeqCst);
    }

    pub fn is_history_dirty(&self) -> bool {
        self.history_dirty.load(Ordering::SeqCst)
    }

    /// Write the current history to the store.
    ///
    /// On failure the history stays marked dirty and the next save retries.
    pub async fn persist_history(&self) -> Result<(), StoreError> {
        let (versions, current) = {
            let history = lock(&self.history);
            self.history_dirty.store(false, Ordering::SeqCst);
            history.to_parts()
        };

        if let Err(e) = self.store.save_parts(versions, current).await {
            self.history_dirty.store(true, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }
}

impl SaveTarget for DocumentTarget {
    async fn save(&self) -> Result<(), SaveError> {
        let draft = lock(&self.draft).clone();
        tokio::fs::write(&self.document_path, draft.content.as_bytes()).await?;

        let created = {
            let mut history = lock(&self.history);
            if history.current().is_some_and(|v| draft.matches(v)) {
                None
            } else {
                let version = history.create_version(&draft, SAVE_DESCRIPTION);
                self.history_dirty.store(true, Ordering::SeqCst);
                Some(version)
            }
        };

        if created.is_none() && !self.is_history_dirty() {
            tracing::debug!(path = %self.document_path.display(), "Draft matches current version");
            return Ok(());
        }

        self.persist_history().await?;

        match created {
            Some(version) => tracing::info!(
                version_id = %version.id,
                number = version.number,
                changes = version.changes.len(),
                "Version created"
            ),
            None => tracing::info!(path = %self.store.path().display(), "Pending history written"),
        }
        Ok(())
    }
}
