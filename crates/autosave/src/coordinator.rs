//! The auto-save state machine.
//!
//! [`SaveCoordinator`] wraps a [`SaveTarget`] and decides when to call it:
//!
//! - [`trigger_save`](SaveCoordinator::trigger_save) after every edit,
//!   debounced so a burst of edits produces one save per quiet period;
//! - a periodic timer started by
//!   [`start_auto_save`](SaveCoordinator::start_auto_save);
//! - [`manual_save`](SaveCoordinator::manual_save) for explicit requests;
//! - a shutdown listener and a final flush installed/run by
//!   [`activate_with_shutdown`](SaveCoordinator::activate_with_shutdown) and
//!   [`deactivate`](SaveCoordinator::deactivate).
//!
//! Every path funnels into one guarded save routine. The guard is an atomic
//! compare-and-swap, so two callers on different worker threads can never
//! run `save()` concurrently. A save skipped because another is in flight is
//! not queued: the edits stay flagged as unsaved and the next debounce or
//! periodic tick picks them up.
//!
//! There is no timeout around `save()`. A target that never resolves keeps
//! `is_saving` set and blocks every later save.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::AutoSaveConfig;
use crate::status::SaveStatus;
use crate::target::{SaveError, SaveTarget};
use crate::timer::TimerHandle;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a save attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// `save()` ran and succeeded.
    Saved,
    /// `save()` was not called.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another save was already in flight.
    InFlight,
    /// Nothing changed since the last successful save.
    NoChanges,
}

/// What caused a save attempt. Only used for logging.
#[derive(Debug, Clone, Copy)]
enum SaveTrigger {
    Debounce,
    Periodic,
    Manual,
    Shutdown,
    Deactivate,
}

impl SaveTrigger {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Debounce => "debounce",
            Self::Periodic => "periodic",
            Self::Manual => "manual",
            Self::Shutdown => "shutdown",
            Self::Deactivate => "deactivate",
        }
    }
}

// ---------------------------------------------------------------------------
// SaveCoordinator
// ---------------------------------------------------------------------------

/// Schedules saves of one document buffer.
///
/// Cheap to clone; all clones drive the same state. Timer tasks only hold a
/// weak reference, so dropping the last clone stops every timer. Methods
/// that start timers must be called from within a Tokio runtime.
pub struct SaveCoordinator<T: SaveTarget> {
    inner: Arc<Inner<T>>,
}

impl<T: SaveTarget> Clone for SaveCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    config: AutoSaveConfig,
    target: T,
    status: watch::Sender<SaveStatus>,
    /// Set while `save()` runs.
    in_flight: AtomicBool,
    /// Bumped by every edit; a save only clears the dirty flag if no edit
    /// arrived while it was running.
    edit_generation: AtomicU64,
    root: CancellationToken,
    /// Cancelled once the shutdown signal has been handled.
    shut_down: CancellationToken,
    timers: Mutex<Timers>,
}

#[derive(Default)]
struct Timers {
    periodic: Option<TimerHandle>,
    debounce: Option<TimerHandle>,
    shutdown: Option<TimerHandle>,
}

impl<T: SaveTarget> SaveCoordinator<T> {
    pub fn new(config: AutoSaveConfig, target: T) -> Self {
        let (status, _) = watch::channel(SaveStatus::new(Utc::now()));
        Self {
            inner: Arc::new(Inner {
                config,
                target,
                status,
                in_flight: AtomicBool::new(false),
                edit_generation: AtomicU64::new(0),
                root: CancellationToken::new(),
                shut_down: CancellationToken::new(),
                timers: Mutex::new(Timers::default()),
            }),
        }
    }

    pub fn config(&self) -> &AutoSaveConfig {
        &self.inner.config
    }

    pub fn target(&self) -> &T {
        &self.inner.target
    }

    /// Current save state.
    pub fn status(&self) -> SaveStatus {
        self.inner.status.borrow().clone()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    /// Record an edit and (re)start the debounce timer.
    pub fn trigger_save(&self) {
        self.inner.edit_generation.fetch_add(1, Ordering::SeqCst);
        self.inner.status.send_if_modified(|s| {
            let changed = !s.has_unsaved_changes;
            s.has_unsaved_changes = true;
            changed
        });

        let weak = Arc::downgrade(&self.inner);
        let timer = TimerHandle::once(&self.inner.root, self.inner.config.delay, move || async move {
            if let Some(inner) = weak.upgrade() {
                let _ = inner.execute_save(SaveTrigger::Debounce).await;
            }
        });

        // Replacing the handle drops, and so cancels, the previous timer.
        self.inner.lock_timers().debounce = Some(timer);
    }

    /// Start the periodic save timer. No-op if it is already running.
    pub fn start_auto_save(&self) {
        let mut timers = self.inner.lock_timers();
        if timers.periodic.as_ref().is_some_and(TimerHandle::is_running) {
            return;
        }

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        timers.periodic = Some(TimerHandle::every(
            &self.inner.root,
            self.inner.config.interval,
            move || {
                let weak = weak.clone();
                async move {
                    match weak.upgrade() {
                        Some(inner) => {
                            let _ = inner.execute_save(SaveTrigger::Periodic).await;
                            true
                        }
                        None => false,
                    }
                }
            },
        ));

        tracing::debug!(
            interval_ms = self.inner.config.interval.as_millis() as u64,
            "Auto-save started"
        );
    }

    /// Cancel the periodic timer and any pending debounce. Idempotent.
    pub fn stop_auto_save(&self) {
        let mut timers = self.inner.lock_timers();
        let periodic = timers.periodic.take();
        let debounce = timers.debounce.take();
        if periodic.is_some() || debounce.is_some() {
            tracing::debug!("Auto-save stopped");
        }
    }

    pub fn is_auto_save_running(&self) -> bool {
        self.inner
            .lock_timers()
            .periodic
            .as_ref()
            .is_some_and(TimerHandle::is_running)
    }

    /// Save immediately, bypassing the debounce.
    ///
    /// Unlike the timer-driven paths, a failure is returned to the caller as
    /// well as recorded in [`SaveStatus::save_error`].
    pub async fn manual_save(&self) -> Result<SaveOutcome, SaveError> {
        self.inner.execute_save(SaveTrigger::Manual).await
    }

    /// [`activate_with_shutdown`](Self::activate_with_shutdown) using Ctrl-C
    /// as the shutdown signal.
    pub fn activate(&self) {
        self.activate_with_shutdown(ctrl_c());
    }

    /// Start auto-saving and listen for `signal`.
    ///
    /// When `signal` resolves, unsaved changes are flushed if
    /// `flush_on_shutdown` is set (after any save already in flight), then
    /// [`shutdown_complete`](Self::shutdown_complete) resolves so the host
    /// can exit. The flush is best effort: the host may tear the runtime
    /// down before it completes.
    pub fn activate_with_shutdown<S>(&self, signal: S)
    where
        S: Future<Output = ()> + Send + 'static,
    {
        self.start_auto_save();

        let weak = Arc::downgrade(&self.inner);
        let listener = TimerHandle::on_signal(&self.inner.root, signal, move || async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.config.flush_on_shutdown {
                let mut rx = inner.status.subscribe();
                let _ = rx.wait_for(|s| !s.is_saving).await;

                let dirty = inner.status.borrow().has_unsaved_changes;
                if dirty {
                    tracing::info!("Shutdown requested with unsaved changes, flushing");
                    let _ = inner.execute_save(SaveTrigger::Shutdown).await;
                }
            }
            inner.shut_down.cancel();
        });

        self.inner.lock_timers().shutdown = Some(listener);
    }

    /// Resolves once the shutdown signal passed to
    /// [`activate_with_shutdown`](Self::activate_with_shutdown) has been
    /// handled, including its flush. Never resolves if no signal fires.
    pub async fn shutdown_complete(&self) {
        self.inner.shut_down.cancelled().await;
    }

    /// Stop all timers, remove the shutdown listener, and flush unsaved
    /// changes if `flush_on_deactivate` is set.
    pub async fn deactivate(&self) {
        self.stop_auto_save();
        if let Some(listener) = self.inner.lock_timers().shutdown.take() {
            listener.cancel();
        }

        let dirty = self.inner.status.borrow().has_unsaved_changes;
        if self.inner.config.flush_on_deactivate && dirty {
            let _ = self.inner.execute_save(SaveTrigger::Deactivate).await;
        }
    }
}

impl<T: SaveTarget> Inner<T> {
    fn lock_timers(&self) -> MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The single guarded save routine every trigger goes through.
    async fn execute_save(&self, trigger: SaveTrigger) -> Result<SaveOutcome, SaveError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(trigger = trigger.as_str(), "Save already in flight, skipping");
            return Ok(SaveOutcome::Skipped(SkipReason::InFlight));
        }
        let _guard = InFlightGuard { inner: self };

        let dirty = self.status.borrow().has_unsaved_changes;
        if !dirty {
            return Ok(SaveOutcome::Skipped(SkipReason::NoChanges));
        }

        let generation = self.edit_generation.load(Ordering::SeqCst);
        let started = Instant::now();
        self.status.send_modify(|s| {
            s.is_saving = true;
            s.save_error = None;
        });

        match self.target.save().await {
            Ok(()) => {
                let now = Utc::now();
                let covered = self.edit_generation.load(Ordering::SeqCst) == generation;
                self.status.send_modify(|s| {
                    s.last_save_time = now;
                    if covered {
                        s.has_unsaved_changes = false;
                    }
                });
                tracing::info!(
                    trigger = trigger.as_str(),
                    covered,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Document saved"
                );
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                tracing::warn!(
                    trigger = trigger.as_str(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Save failed"
                );
                self.status.send_modify(|s| s.save_error = Some(e.clone()));
                Err(e)
            }
        }
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Releases the in-flight flag on every exit path, including cancellation
/// of the save future and panics inside the target.
struct InFlightGuard<'a, T> {
    inner: &'a Inner<T>,
}

impl<T> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        // Release before publishing, so a waiter woken by `is_saving = false`
        // can start the next save.
        self.inner.in_flight.store(false, Ordering::Release);
        self.inner.status.send_if_modified(|s| {
            let changed = s.is_saving;
            s.is_saving = false;
            changed
        });
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C, shutdown flush disabled");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
