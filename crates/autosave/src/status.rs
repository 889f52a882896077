use serde::Serialize;

use scriptdesk_core::Timestamp;

use crate::target::SaveError;

/// Observable save state exposed to the host UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveStatus {
    /// A save is currently in flight.
    pub is_saving: bool,
    /// Time of the last successful save; construction time until then.
    pub last_save_time: Timestamp,
    /// Edits exist that no successful save has covered yet.
    pub has_unsaved_changes: bool,
    /// Failure of the most recent save attempt, cleared when a new one starts.
    #[serde(serialize_with = "serialize_error")]
    pub save_error: Option<SaveError>,
}

impl SaveStatus {
    pub(crate) fn new(now: Timestamp) -> Self {
        Self {
            is_saving: false,
            last_save_time: now,
            has_unsaved_changes: false,
            save_error: None,
        }
    }
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<SaveError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
