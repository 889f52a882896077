//! Version history and line-level diffing for script drafts.
//!
//! - [`VersionHistory`] keeps the ordered, keyed collection of immutable
//!   [`Version`] snapshots for one document and tracks which one is current.
//! - [`diff`] holds the positional line diff used by
//!   [`VersionHistory::compare_versions`] and the separately named LCS
//!   alignment diff.

pub mod diff;
pub mod error;
pub mod types;
pub mod version;

pub use diff::{ChangeKind, DiffLine, DiffLineType, DiffStats, LineChange};
pub use error::CoreError;
pub use types::{Timestamp, VersionId};
pub use version::{
    AlignedDiff, ChangedField, DocumentSnapshot, DocumentSource, FieldChange, Version,
    VersionDiff, VersionHistory,
};
