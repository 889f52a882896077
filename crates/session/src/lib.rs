//! `scriptdesk-session` library crate.
//!
//! Wires a [`VersionHistory`](scriptdesk_core::VersionHistory) and a
//! [`SaveCoordinator`](scriptdesk_autosave::SaveCoordinator) around one
//! document file. The terminal editor binary lives in `main.rs`.

pub mod config;
pub mod draft;
pub mod error;
pub mod session;
pub mod store;
pub mod target;

pub use config::SessionConfig;
pub use draft::Draft;
pub use error::SessionError;
pub use session::DocumentSession;
pub use store::{HistoryStore, StoreError};
pub use target::DocumentTarget;
