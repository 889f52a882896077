//! Line-level diffing between two whole-document texts.
//!
//! Two granularities live here:
//!
//! - [`compute_line_changes`] -- the positional diff behind
//!   [`VersionHistory::compare_versions`](crate::version::VersionHistory::compare_versions).
//!   It walks both texts line by line and never realigns, so a line inserted
//!   near the top reports every following line as modified. Consumers rely
//!   on that exact output; do not swap in a smarter algorithm here.
//! - [`compute_aligned_diff`] -- an LCS alignment that recognises shifted
//!   lines, offered as a separate capability.

use serde::{Deserialize, Serialize};

/// Kind of a change record, shared by field-level and line-level changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Remove,
    Modify,
}

impl ChangeKind {
    /// String representation for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Modify => "modify",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line-level change between two texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// 1-based line number on the side the change refers to: the after side
    /// for `Add`, the before side for `Remove` and `Modify`.
    pub line: usize,
    /// The after line for `Add`/`Modify`, the removed line for `Remove`.
    pub content: String,
}

impl LineChange {
    fn new(kind: ChangeKind, line: usize, content: &str) -> Self {
        Self {
            kind,
            line,
            content: content.to_string(),
        }
    }
}

/// Split on `'\n'` exactly: an empty text is one empty line and a trailing
/// newline produces a trailing empty line.
fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

// ---------------------------------------------------------------------------
// Positional diff
// ---------------------------------------------------------------------------

/// Compare two texts line by line at matching positions.
pub fn compute_line_changes(before: &str, after: &str) -> Vec<LineChange> {
    let before_lines = split_lines(before);
    let after_lines = split_lines(after);
    let mut changes = Vec::new();

    let mut i = 0;
    let mut j = 0;
    while i < before_lines.len() || j < after_lines.len() {
        if i >= before_lines.len() {
            changes.push(LineChange::new(ChangeKind::Add, j + 1, after_lines[j]));
            j += 1;
        } else if j >= after_lines.len() {
            changes.push(LineChange::new(ChangeKind::Remove, i + 1, before_lines[i]));
            i += 1;
        } else {
            if before_lines[i] != after_lines[j] {
                changes.push(LineChange::new(ChangeKind::Modify, i + 1, after_lines[j]));
            }
            i += 1;
            j += 1;
        }
    }

    changes
}

// ---------------------------------------------------------------------------
// Aligned (LCS) diff
// ---------------------------------------------------------------------------

/// The type of a line in an aligned diff result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffLineType {
    Added,
    Removed,
    Unchanged,
}

impl DiffLineType {
    /// Unified-diff prefix character for this line type.
    pub fn prefix(&self) -> char {
        match self {
            Self::Added => '+',
            Self::Removed => '-',
            Self::Unchanged => ' ',
        }
    }
}

/// A single line in an aligned diff result.
///
/// Line numbers are 1-based, numbered like [`LineChange::line`]. A line
/// present on only one side has no number for the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub line_type: DiffLineType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_line: Option<usize>,
}

/// Line counts of an aligned diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl DiffStats {
    pub fn from_lines(lines: &[DiffLine]) -> Self {
        lines.iter().fold(Self::default(), |mut stats, line| {
            match line.line_type {
                DiffLineType::Added => stats.added += 1,
                DiffLineType::Removed => stats.removed += 1,
                DiffLineType::Unchanged => stats.unchanged += 1,
            }
            stats
        })
    }

    /// `true` when the two sides are identical.
    pub fn is_identical(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Align two texts on their longest common subsequence of lines.
///
/// Lines are split exactly as in [`compute_line_changes`]. Where the texts
/// diverge, removed lines are emitted before the added lines replacing them.
pub fn compute_aligned_diff(before: &str, after: &str) -> Vec<DiffLine> {
    let before_lines = split_lines(before);
    let after_lines = split_lines(after);
    let (m, n) = (before_lines.len(), after_lines.len());

    // common[i][j]: LCS length of before_lines[i..] and after_lines[j..].
    let mut common = vec![vec![0usize; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            common[i][j] = if before_lines[i] == after_lines[j] {
                common[i + 1][j + 1] + 1
            } else {
                common[i + 1][j].max(common[i][j + 1])
            };
        }
    }

    let mut lines = Vec::with_capacity(m + n - common[0][0]);
    let (mut i, mut j) = (0, 0);
    while i < m || j < n {
        if i < m && j < n && before_lines[i] == after_lines[j] {
            lines.push(DiffLine {
                line_type: DiffLineType::Unchanged,
                content: before_lines[i].to_string(),
                before_line: Some(i + 1),
                after_line: Some(j + 1),
            });
            i += 1;
            j += 1;
        } else if i < m && (j == n || common[i + 1][j] >= common[i][j + 1]) {
            lines.push(DiffLine {
                line_type: DiffLineType::Removed,
                content: before_lines[i].to_string(),
                before_line: Some(i + 1),
                after_line: None,
            });
            i += 1;
        } else {
            lines.push(DiffLine {
                line_type: DiffLineType::Added,
                content: after_lines[j].to_string(),
                before_line: None,
                after_line: Some(j + 1),
            });
            j += 1;
        }
    }

    lines
}

/// Render an aligned diff as unified-style text.
///
/// Emits `--- from` / `+++ to` headers followed by every line prefixed with
/// `' '`, `'-'` or `'+'`. No hunk headers; the whole document is one hunk.
pub fn render_patch(from_label: &str, to_label: &str, lines: &[DiffLine]) -> String {
    let mut out = format!("--- {from_label}\n+++ {to_label}\n");
    for line in lines {
        out.push(line.line_type.prefix());
        out.push_str(&line.content);
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
