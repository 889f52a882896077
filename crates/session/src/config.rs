use std::path::PathBuf;

use scriptdesk_autosave::AutoSaveConfig;

use crate::error::SessionError;

/// Default directory for the persisted version history.
pub const DEFAULT_HISTORY_DIR: &str = "data/versions";

/// Settings for one [`DocumentSession`](crate::DocumentSession).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// File the draft content is written to on every save.
    pub document_path: PathBuf,
    /// Directory holding `version_history.json`.
    pub history_dir: PathBuf,
    /// Title used when the history has no version yet.
    pub title: String,
    /// Author recorded on every version created by this session.
    pub author: String,
    pub autosave: AutoSaveConfig,
}

impl SessionConfig {
    /// Session for `document_path` with every other setting defaulted.
    pub fn new(document_path: impl Into<PathBuf>) -> Self {
        let document_path = document_path.into();
        let title = default_title(&document_path);
        Self {
            document_path,
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
            title,
            author: String::new(),
            autosave: AutoSaveConfig::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var           | Default                     |
    /// |-------------------|-----------------------------|
    /// | `DOCUMENT_PATH`   | required                    |
    /// | `HISTORY_DIR`     | `data/versions`             |
    /// | `DOCUMENT_TITLE`  | file stem of `DOCUMENT_PATH`|
    /// | `DOCUMENT_AUTHOR` | `$USER`, else empty         |
    ///
    /// Auto-save settings come from [`AutoSaveConfig::from_env`].
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SessionError> {
        let document_path = lookup("DOCUMENT_PATH")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| SessionError::Config("DOCUMENT_PATH must be set".into()))?;

        let mut config = Self::new(document_path.trim());

        if let Some(dir) = lookup("HISTORY_DIR").filter(|v| !v.trim().is_empty()) {
            config.history_dir = PathBuf::from(dir.trim());
        }
        if let Some(title) = lookup("DOCUMENT_TITLE").filter(|v| !v.trim().is_empty()) {
            config.title = title;
        }
        config.author = lookup("DOCUMENT_AUTHOR")
            .or_else(|| lookup("USER"))
            .unwrap_or_default();
        config.autosave = AutoSaveConfig::from_lookup(&lookup);

        Ok(config)
    }
}

fn default_title(path: &std::path::Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn document_path_is_required() {
        let result = SessionConfig::from_lookup(lookup_from(&[]));
        assert_matches!(result, Err(SessionError::Config(_)));
    }

    #[test]
    fn defaults_derive_from_document_path() {
        let config =
            SessionConfig::from_lookup(lookup_from(&[("DOCUMENT_PATH", "scripts/manor.txt")]))
                .unwrap();
        assert_eq!(config.document_path, PathBuf::from("scripts/manor.txt"));
        assert_eq!(config.history_dir, PathBuf::from(DEFAULT_HISTORY_DIR));
        assert_eq!(config.title, "manor");
        assert_eq!(config.autosave, AutoSaveConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("DOCUMENT_PATH", "manor.txt"),
            ("HISTORY_DIR", "/tmp/history"),
            ("DOCUMENT_TITLE", "The Last Supper"),
            ("DOCUMENT_AUTHOR", "alice"),
            ("USER", "root"),
            ("AUTOSAVE_DELAY_MS", "500"),
        ]))
        .unwrap();
        assert_eq!(config.history_dir, PathBuf::from("/tmp/history"));
        assert_eq!(config.title, "The Last Supper");
        assert_eq!(config.author, "alice");
        assert_eq!(config.autosave.delay, Duration::from_millis(500));
    }

    #[test]
    fn author_falls_back_to_user() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("DOCUMENT_PATH", "manor.txt"),
            ("USER", "bob"),
        ]))
        .unwrap();
        assert_eq!(config.author, "bob");
    }
}
