use std::time::Duration;

/// Default period between automatic saves.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(30_000);

/// Default quiet period after an edit before saving.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1_000);

/// Timer and lifecycle settings for a [`SaveCoordinator`](crate::SaveCoordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Period of the background save timer (default: 30 s).
    pub interval: Duration,
    /// Debounce delay between the last edit and the save (default: 1 s).
    pub delay: Duration,
    /// Flush unsaved changes when the coordinator is deactivated.
    pub flush_on_deactivate: bool,
    /// Flush unsaved changes when the host signals shutdown.
    pub flush_on_shutdown: bool,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            delay: DEFAULT_DELAY,
            flush_on_deactivate: true,
            flush_on_shutdown: true,
        }
    }
}

impl AutoSaveConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default |
    /// |--------------------------------|---------|
    /// | `AUTOSAVE_INTERVAL_MS`         | `30000` |
    /// | `AUTOSAVE_DELAY_MS`            | `1000`  |
    /// | `AUTOSAVE_FLUSH_ON_DEACTIVATE` | `true`  |
    /// | `AUTOSAVE_FLUSH_ON_SHUTDOWN`   | `true`  |
    ///
    /// Values that fail to parse fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(default)
        };
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| parse_bool(&v))
                .unwrap_or(default)
        };

        Self {
            interval: millis("AUTOSAVE_INTERVAL_MS", defaults.interval),
            delay: millis("AUTOSAVE_DELAY_MS", defaults.delay),
            flush_on_deactivate: flag("AUTOSAVE_FLUSH_ON_DEACTIVATE", defaults.flush_on_deactivate),
            flush_on_shutdown: flag("AUTOSAVE_FLUSH_ON_SHUTDOWN", defaults.flush_on_shutdown),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
