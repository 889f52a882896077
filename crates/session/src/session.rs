//! An open document: draft buffer, version history, and auto-save.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use uuid::Uuid;

use scriptdesk_autosave::{SaveCoordinator, SaveOutcome, SaveStatus};
use scriptdesk_core::{AlignedDiff, CoreError, Version, VersionDiff, VersionHistory, VersionId};

use crate::config::SessionConfig;
use crate::draft::Draft;
use crate::error::SessionError;
use crate::store::HistoryStore;
use crate::target::{lock, DocumentTarget};

/// One editing session over one document file.
///
/// Edits go through [`edit`](Self::edit), which marks the buffer dirty and
/// lets the coordinator decide when to persist. Every successful save
/// writes the file and appends a version to the history.
pub struct DocumentSession {
    id: Uuid,
    draft: Arc<Mutex<Draft>>,
    history: Arc<Mutex<VersionHistory>>,
    coordinator: SaveCoordinator<DocumentTarget>,
}

impl DocumentSession {
    /// Open the document described by `config`.
    ///
    /// Loads the persisted history, then seeds the draft from the document
    /// file, falling back to the current version's content when the file
    /// does not exist yet.
    pub async fn open(config: SessionConfig) -> Result<Self, SessionError> {
        let id = Uuid::now_v7();
        let store = HistoryStore::new(&config.history_dir);
        let history = store.load().await?;

        let on_disk = match tokio::fs::read_to_string(&config.document_path).await {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let current = history.current();
        let draft = Draft {
            title: current.map_or_else(|| config.title.clone(), |v| v.title.clone()),
            content: on_disk
                .or_else(|| current.map(|v| v.content.clone()))
                .unwrap_or_default(),
            author: config.author.clone(),
        };

        tracing::info!(
            session_id = %id,
            path = %config.document_path.display(),
            versions = history.len(),
            "Document session opened"
        );

        let draft = Arc::new(Mutex::new(draft));
        let history = Arc::new(Mutex::new(history));
        let target = DocumentTarget::new(
            config.document_path.clone(),
            Arc::clone(&draft),
            Arc::clone(&history),
            store,
        );

        Ok(Self {
            id,
            draft,
            history,
            coordinator: SaveCoordinator::new(config.autosave, target),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Start auto-saving, flushing on Ctrl-C.
    pub fn activate(&self) {
        self.coordinator.activate();
    }

    /// Start auto-saving, flushing when `signal` resolves.
    pub fn activate_with_shutdown<S>(&self, signal: S)
    where
        S: Future<Output = ()> + Send + 'static,
    {
        self.coordinator.activate_with_shutdown(signal);
    }

    /// Resolves once a shutdown signal has been handled and any flush it
    /// triggered has finished.
    pub async fn shutdown_complete(&self) {
        self.coordinator.shutdown_complete().await;
    }

    /// Mutate the draft and schedule a save.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Draft) -> R) -> R {
        let result = f(&mut lock(&self.draft));
        self.coordinator.trigger_save();
        result
    }

    pub fn draft(&self) -> Draft {
        lock(&self.draft).clone()
    }

    /// Save now, bypassing the debounce. Failures are returned.
    pub async fn save_now(&self) -> Result<SaveOutcome, SessionError> {
        Ok(self.coordinator.manual_save().await?)
    }

    pub fn status(&self) -> SaveStatus {
        self.coordinator.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.coordinator.subscribe()
    }

    /// Versions, newest first.
    pub fn versions(&self) -> Vec<Version> {
        lock(&self.history).versions()
    }

    pub fn version(&self, id: VersionId) -> Option<Version> {
        lock(&self.history).version(id).cloned()
    }

    pub fn current_version(&self) -> Option<Version> {
        lock(&self.history).current().cloned()
    }

    /// Positional line diff between two versions.
    pub fn compare(&self, from: VersionId, to: VersionId) -> Option<VersionDiff> {
        lock(&self.history).compare_versions(from, to)
    }

    /// LCS-aligned diff between two versions.
    pub fn compare_aligned(&self, from: VersionId, to: VersionId) -> Option<AlignedDiff> {
        lock(&self.history).compare_versions_aligned(from, to)
    }

    /// Make `id` the current version and load it into the draft.
    ///
    /// The restored draft is marked dirty so the document file and the moved
    /// current pointer are written on the next save.
    pub fn restore(&self, id: VersionId) -> Result<Version, SessionError> {
        let version = lock(&self.history)
            .switch_version(id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "version",
                id,
            })?;

        self.coordinator.target().mark_history_dirty();
        self.edit(|draft| draft.apply_version(&version));
        tracing::info!(session_id = %self.id, version_id = %id, "Version restored");
        Ok(version)
    }

    /// Discard every version, in memory and on disk.
    pub async fn clear_history(&self) -> Result<(), SessionError> {
        lock(&self.history).clear();
        self.coordinator.target().persist_history().await?;
        tracing::info!(session_id = %self.id, "Version history cleared");
        Ok(())
    }

    /// Stop auto-saving and flush unsaved changes if configured.
    pub async fn close(self) {
        self.coordinator.deactivate().await;
        tracing::info!(session_id = %self.id, "Document session closed");
    }
}
