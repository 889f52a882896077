use serde::{Deserialize, Serialize};

use scriptdesk_core::{DocumentSource, Version};

/// The editable buffer of an open document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    pub content: String,
    pub author: String,
}

impl Draft {
    /// Append `line` as a new last line.
    pub fn push_line(&mut self, line: &str) {
        if !self.content.is_empty() {
            self.content.push('\n');
        }
        self.content.push_str(line);
    }

    /// Replace title and content with those of `version`; the author stays.
    pub fn apply_version(&mut self, version: &Version) {
        self.title.clone_from(&version.title);
        self.content.clone_from(&version.content);
    }

    /// `true` when title and content match `version`.
    pub fn matches(&self, version: &Version) -> bool {
        self.title == version.title && self.content == version.content
    }
}

impl DocumentSource for Draft {
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
