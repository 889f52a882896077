//! The persistence seam between the coordinator and the host.

use std::future::Future;

/// Errors returned by a [`SaveTarget`].
///
/// Cloneable so the last failure can be kept in [`SaveStatus`](crate::SaveStatus).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Save failed: {0}")]
    Failed(String),
}

impl From<std::io::Error> for SaveError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Host-supplied persistence operation.
///
/// The coordinator only cares whether the returned future resolves to `Ok`
/// or `Err`; where the data goes is up to the implementation.
pub trait SaveTarget: Send + Sync + 'static {
    fn save(&self) -> impl Future<Output = Result<(), SaveError>> + Send;
}

/// [`SaveTarget`] backed by an async closure. Build with [`save_fn`].
pub struct SaveFn<F> {
    f: F,
}

/// Wrap `f` so it can be used as a [`SaveTarget`].
///
/// ```rust
/// use scriptdesk_autosave::{save_fn, SaveError};
///
/// let target = save_fn(|| async { Ok::<(), SaveError>(()) });
/// # let _ = target;
/// ```
pub fn save_fn<F, Fut>(f: F) -> SaveFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SaveError>> + Send,
{
    SaveFn { f }
}

impl<F, Fut> SaveTarget for SaveFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SaveError>> + Send,
{
    fn save(&self) -> impl Future<Output = Result<(), SaveError>> + Send {
        (self.f)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_io() {
        let err = SaveError::Io("disk full".to_string());
        assert_eq!(err.to_string(), "I/O error: disk full");
    }

    #[test]
    fn display_failed() {
        let err = SaveError::Failed("server rejected draft".to_string());
        assert_eq!(err.to_string(), "Save failed: server rejected draft");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: SaveError = io.into();
        assert_eq!(err, SaveError::Io("read-only".to_string()));
    }

    #[tokio::test]
    async fn save_fn_invokes_closure() {
        let target = save_fn(|| async { Err::<(), SaveError>(SaveError::Failed("nope".into())) });
        assert_eq!(target.save().await, Err(SaveError::Failed("nope".into())));
    }
}
