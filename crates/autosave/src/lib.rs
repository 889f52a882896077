//! Auto-save coordination for an editable document buffer.
//!
//! - [`SaveCoordinator`] decides when to call a host-supplied
//!   [`SaveTarget`]: debounced after edits, on a periodic timer, on
//!   shutdown, on deactivation, and on explicit request.
//! - [`SaveStatus`] is the observable state the host renders, published
//!   through a `tokio::sync::watch` channel.
//! - [`AutoSaveConfig`] carries the timer settings, loadable from the
//!   environment.

pub mod config;
pub mod coordinator;
pub mod status;
pub mod target;
mod timer;

pub use config::AutoSaveConfig;
pub use coordinator::{SaveCoordinator, SaveOutcome, SkipReason};
pub use status::SaveStatus;
pub use target::{save_fn, SaveError, SaveFn, SaveTarget};
