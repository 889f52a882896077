use scriptdesk_autosave::SaveError;
use scriptdesk_core::CoreError;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
