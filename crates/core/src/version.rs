//! Version history for one logical document.
//!
//! [`VersionHistory`] owns an ordered map of immutable [`Version`] records
//! keyed by [`VersionId`] plus a separate "current version" pointer. It is
//! constructed per document session; nothing here is process-wide.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::diff::{self, ChangeKind, DiffLine, DiffStats, LineChange};
use crate::error::CoreError;
use crate::types::{Timestamp, VersionId};

// ---------------------------------------------------------------------------
// Snapshot source
// ---------------------------------------------------------------------------

/// Anything that can be snapshotted into a [`Version`].
pub trait DocumentSource {
    fn title(&self) -> &str;
    fn content(&self) -> &str;
    fn author(&self) -> &str;
}

/// Plain owned snapshot of a document's versioned fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub title: String,
    pub content: String,
    pub author: String,
}

impl DocumentSnapshot {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            author: author.into(),
        }
    }
}

impl DocumentSource for DocumentSnapshot {
    fn title(&self) -> &str {
        &self.title
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn author(&self) -> &str {
        &self.author
    }
}

// ---------------------------------------------------------------------------
// Version records
// ---------------------------------------------------------------------------

/// Document field tracked by field-level changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    Title,
    Content,
}

impl ChangedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Content => "content",
        }
    }
}

/// Whole-field difference between a version and its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: ChangedField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// An immutable snapshot of a document at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    /// 1-based position in the history's creation order.
    pub number: u32,
    /// Version that was current when this one was created.
    pub parent_id: Option<VersionId>,
    pub timestamp: Timestamp,
    pub content: String,
    pub title: String,
    pub description: String,
    pub author: String,
    /// Field-level changes against `parent_id`; empty for the first version.
    pub changes: Vec<FieldChange>,
}

/// Positional line diff between two stored versions. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDiff {
    pub before: String,
    pub after: String,
    pub changes: Vec<LineChange>,
}

/// LCS-aligned diff between two stored versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedDiff {
    pub from: VersionId,
    pub to: VersionId,
    pub lines: Vec<DiffLine>,
    pub stats: DiffStats,
}

impl AlignedDiff {
    /// Unified-style rendering labelled with both version ids.
    pub fn to_patch(&self) -> String {
        diff::render_patch(&self.from.to_string(), &self.to.to_string(), &self.lines)
    }
}

/// Compare `title` then `content` of two snapshots, one `Modify` per
/// differing field with whole-field before/after values.
fn field_changes(prev: &Version, next: &dyn DocumentSource) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if prev.title != next.title() {
        changes.push(FieldChange {
            kind: ChangeKind::Modify,
            path: ChangedField::Title,
            before: Some(prev.title.clone()),
            after: Some(next.title().to_string()),
        });
    }

    if prev.content != next.content() {
        changes.push(FieldChange {
            kind: ChangeKind::Modify,
            path: ChangedField::Content,
            before: Some(prev.content.clone()),
            after: Some(next.content().to_string()),
        });
    }

    changes
}

// ---------------------------------------------------------------------------
// VersionHistory
// ---------------------------------------------------------------------------

/// Ordered, keyed collection of versions for one document.
#[derive(Debug, Clone, Default)]
pub struct VersionHistory {
    /// Ids increase with creation, so key order is creation order.
    versions: BTreeMap<VersionId, Version>,
    current: Option<VersionId>,
}

impl VersionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `source` as a new version and make it current.
    ///
    /// When a current version exists the new version records field-level
    /// changes against it (not necessarily against the newest version).
    pub fn create_version(&mut self, source: &dyn DocumentSource, description: &str) -> Version {
        let timestamp = Utc::now();
        let last_id = self.versions.keys().next_back().copied();
        let id = VersionId::next_after(last_id, timestamp);
        let number = self
            .versions
            .values()
            .next_back()
            .map_or(1, |v| v.number + 1);

        let parent = self.current.and_then(|cur| self.versions.get(&cur));
        let changes = parent.map_or_else(Vec::new, |prev| field_changes(prev, source));

        let version = Version {
            id,
            number,
            parent_id: parent.map(|p| p.id),
            timestamp,
            content: source.content().to_string(),
            title: source.title().to_string(),
            description: description.to_string(),
            author: source.author().to_string(),
            changes,
        };

        self.versions.insert(id, version.clone());
        self.current = Some(id);
        version
    }

    /// All versions, newest first by timestamp (ties: newest id first).
    pub fn versions(&self) -> Vec<Version> {
        let mut list: Vec<Version> = self.versions.values().cloned().collect();
        list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        list
    }

    pub fn version(&self, id: VersionId) -> Option<&Version> {
        self.versions.get(&id)
    }

    /// Move the current pointer to `id`.
    ///
    /// Applying the version's content back into an editable buffer is the
    /// caller's job.
    pub fn switch_version(&mut self, id: VersionId) -> Option<&Version> {
        let version = self.versions.get(&id)?;
        self.current = Some(id);
        Some(version)
    }

    /// Positional line diff from `from` to `to`; `None` if either is unknown.
    pub fn compare_versions(&self, from: VersionId, to: VersionId) -> Option<VersionDiff> {
        let from_version = self.versions.get(&from)?;
        let to_version = self.versions.get(&to)?;

        Some(VersionDiff {
            before: from_version.content.clone(),
            after: to_version.content.clone(),
            changes: diff::compute_line_changes(&from_version.content, &to_version.content),
        })
    }

    /// LCS-aligned diff from `from` to `to`; `None` if either is unknown.
    pub fn compare_versions_aligned(&self, from: VersionId, to: VersionId) -> Option<AlignedDiff> {
        let from_version = self.versions.get(&from)?;
        let to_version = self.versions.get(&to)?;

        let lines = diff::compute_aligned_diff(&from_version.content, &to_version.content);
        let stats = DiffStats::from_lines(&lines);
        Some(AlignedDiff {
            from,
            to,
            lines,
            stats,
        })
    }

    /// Discard every version and reset the current pointer.
    pub fn clear(&mut self) {
        self.versions.clear();
        self.current = None;
    }

    pub fn current(&self) -> Option<&Version> {
        self.current.and_then(|id| self.versions.get(&id))
    }

    pub fn current_id(&self) -> Option<VersionId> {
        self.current
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Rebuild a history from persisted versions.
    ///
    /// Versions may arrive in any order. Duplicate ids are a conflict and a
    /// current id absent from `versions` is rejected.
    pub fn from_parts(
        versions: Vec<Version>,
        current: Option<VersionId>,
    ) -> Result<Self, CoreError> {
        let mut map = BTreeMap::new();
        for version in versions {
            let id = version.id;
            if map.insert(id, version).is_some() {
                return Err(CoreError::Conflict(format!("duplicate version id {id}")));
            }
        }

        if let Some(id) = current {
            if !map.contains_key(&id) {
                return Err(CoreError::Validation(format!(
                    "current version {id} is not part of the history"
                )));
            }
        }

        Ok(Self {
            versions: map,
            current,
        })
    }

    /// Versions in creation order plus the current pointer.
    pub fn to_parts(&self) -> (Vec<Version>, Option<VersionId>) {
        (self.versions.values().cloned().collect(), self.current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
