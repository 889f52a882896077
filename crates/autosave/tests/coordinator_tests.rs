//! Timer-driven behaviour of the save coordinator, run on Tokio's paused
//! clock so every delay is exact and instantaneous.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::sync::oneshot;

use scriptdesk_autosave::{
    save_fn, AutoSaveConfig, SaveCoordinator, SaveError, SaveOutcome, SaveTarget, SkipReason,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Target that counts calls, optionally sleeps, and optionally fails.
struct CountingTarget {
    calls: Arc<AtomicUsize>,
    latency: Duration,
    fail: bool,
}

impl SaveTarget for CountingTarget {
    async fn save(&self) -> Result<(), SaveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail {
            Err(SaveError::Failed("backend unavailable".into()))
        } else {
            Ok(())
        }
    }
}

fn coordinator(
    config: AutoSaveConfig,
    latency: Duration,
    fail: bool,
) -> (SaveCoordinator<CountingTarget>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let target = CountingTarget {
        calls: Arc::clone(&calls),
        latency,
        fail,
    };
    (SaveCoordinator::new(config, target), calls)
}

fn config(interval_ms: u64, delay_ms: u64) -> AutoSaveConfig {
    AutoSaveConfig {
        interval: Duration::from_millis(interval_ms),
        delay: Duration::from_millis(delay_ms),
        ..AutoSaveConfig::default()
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn debounced_save_fires_after_delay() {
    let (coordinator, calls) = coordinator(config(30_000, 1_000), Duration::ZERO, false);

    coordinator.trigger_save();
    advance(999).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    advance(2).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!coordinator.status().has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_coalesces_into_one_save() {
    let (coordinator, calls) = coordinator(config(30_000, 1_000), Duration::ZERO, false);

    for _ in 0..10 {
        coordinator.trigger_save();
        advance(100).await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    advance(1_000).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    advance(5_000).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_debounce() {
    let (coordinator, calls) = coordinator(config(30_000, 1_000), Duration::ZERO, false);

    coordinator.trigger_save();
    coordinator.stop_auto_save();
    advance(5_000).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(coordinator.status().has_unsaved_changes);
}

// ---------------------------------------------------------------------------
// Periodic timer
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn periodic_timer_saves_only_when_dirty() {
    let (coordinator, calls) = coordinator(config(30_000, 1_000), Duration::ZERO, false);
    coordinator.start_auto_save();

    advance(30_001).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0, "clean buffer must not be saved");

    coordinator.trigger_save();
    coordinator.stop_auto_save();
    coordinator.start_auto_save();
    advance(30_001).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    coordinator.stop_auto_save();
}

#[tokio::test(start_paused = true)]
async fn failed_save_does_not_halt_the_loop() {
    let (coordinator, calls) = coordinator(config(10_000, 1_000), Duration::ZERO, true);
    coordinator.start_auto_save();
    coordinator.trigger_save();

    advance(1_001).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let status = coordinator.status();
    assert!(status.has_unsaved_changes);
    assert_eq!(
        status.save_error,
        Some(SaveError::Failed("backend unavailable".into()))
    );

    advance(10_000).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    advance(10_000).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(coordinator.is_auto_save_running());

    coordinator.stop_auto_save();
}

// ---------------------------------------------------------------------------
// Overlap guard
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn slow_save_is_never_overlapped() {
    let (coordinator, calls) =
        coordinator(config(30_000, 1_000), Duration::from_secs(50), false);
    coordinator.start_auto_save();
    coordinator.trigger_save();

    // Debounce starts the slow save at t=1s.
    advance(1_001).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(coordinator.status().is_saving);

    // Periodic tick at t=30s finds the save still running.
    advance(30_000).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(coordinator.status().is_saving);

    let outcome = coordinator.manual_save().await;
    assert_matches!(outcome, Ok(SaveOutcome::Skipped(SkipReason::InFlight)));

    // The slow save finishes at t=51s.
    advance(20_000).await;
    let status = coordinator.status();
    assert!(!status.is_saving);
    assert!(!status.has_unsaved_changes);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    coordinator.stop_auto_save();
}

#[tokio::test(start_paused = true)]
async fn edit_during_save_stays_unsaved() {
    let (coordinator, calls) =
        coordinator(config(60_000, 1_000), Duration::from_secs(5), false);

    coordinator.trigger_save();
    advance(2_000).await;
    assert!(coordinator.status().is_saving);

    // New edit while the first save is in flight.
    coordinator.trigger_save();
    advance(4_500).await;
    let status = coordinator.status();
    assert!(!status.is_saving);
    assert!(status.has_unsaved_changes);

    // Its own debounce fired at t=3s and was skipped; the next edit picks it up.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    coordinator.trigger_save();
    advance(6_500).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!coordinator.status().has_unsaved_changes);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn shutdown_signal_flushes_unsaved_changes() {
    let (coordinator, calls) = coordinator(config(30_000, 1_000), Duration::ZERO, false);
    let (tx, rx) = oneshot::channel::<()>();
    coordinator.activate_with_shutdown(async move {
        let _ = rx.await;
    });
    assert!(coordinator.is_auto_save_running());

    coordinator.trigger_save();
    let _ = tx.send(());
    advance(10).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!coordinator.status().has_unsaved_changes);
    coordinator.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_flush_disabled_by_config() {
    let config = AutoSaveConfig {
        flush_on_shutdown: false,
        flush_on_deactivate: false,
        ..config(30_000, 1_000)
    };
    let (coordinator, calls) = coordinator(config, Duration::ZERO, false);
    let (tx, rx) = oneshot::channel::<()>();
    coordinator.activate_with_shutdown(async move {
        let _ = rx.await;
    });

    coordinator.trigger_save();
    let _ = tx.send(());
    advance(10).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    coordinator.deactivate().await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(coordinator.status().has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn shutdown_complete_resolves_after_flush() {
    let (coordinator, calls) = coordinator(config(30_000, 1_000), Duration::from_secs(2), false);
    let (tx, rx) = oneshot::channel::<()>();
    coordinator.activate_with_shutdown(async move {
        let _ = rx.await;
    });

    coordinator.trigger_save();
    let _ = tx.send(());
    tokio::time::timeout(Duration::from_secs(10), coordinator.shutdown_complete())
        .await
        .expect("shutdown should complete");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!coordinator.status().has_unsaved_changes);
    coordinator.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_in_flight_save_then_flushes() {
    let (coordinator, calls) = coordinator(config(30_000, 1_000), Duration::from_secs(5), false);
    let (tx, rx) = oneshot::channel::<()>();
    coordinator.activate_with_shutdown(async move {
        let _ = rx.await;
    });

    // First save runs from t=1s to t=6s; the edit at t=2s is not covered.
    coordinator.trigger_save();
    advance(2_000).await;
    assert!(coordinator.status().is_saving);
    coordinator.trigger_save();
    let _ = tx.send(());

    tokio::time::timeout(Duration::from_secs(30), coordinator.shutdown_complete())
        .await
        .expect("shutdown should complete");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!coordinator.status().has_unsaved_changes);
    coordinator.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_completes_without_flush_when_disabled() {
    let config = AutoSaveConfig {
        flush_on_shutdown: false,
        ..config(30_000, 1_000)
    };
    let (coordinator, calls) = coordinator(config, Duration::ZERO, false);
    let (tx, rx) = oneshot::channel::<()>();
    coordinator.activate_with_shutdown(async move {
        let _ = rx.await;
    });

    coordinator.trigger_save();
    let _ = tx.send(());
    tokio::time::timeout(Duration::from_secs(1), coordinator.shutdown_complete())
        .await
        .expect("shutdown should complete");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(coordinator.status().has_unsaved_changes);
    coordinator.stop_auto_save();
}

#[tokio::test(start_paused = true)]
async fn deactivate_stops_timers_and_flushes() {
    let (coordinator, calls) = coordinator(config(30_000, 1_000), Duration::ZERO, false);
    coordinator.activate_with_shutdown(std::future::pending());

    coordinator.trigger_save();
    coordinator.deactivate().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!coordinator.is_auto_save_running());

    coordinator.trigger_save();
    coordinator.stop_auto_save();
    advance(120_000).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_coordinator_stops_periodic_timer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let target = save_fn(move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), SaveError>(())
        }
    });

    let coordinator = SaveCoordinator::new(config(1_000, 100), target);
    coordinator.start_auto_save();
    coordinator.trigger_save();
    drop(coordinator);

    advance(10_000).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_state_changes() {
    let (coordinator, _calls) = coordinator(config(30_000, 1_000), Duration::ZERO, false);
    let mut rx = coordinator.subscribe();

    coordinator.trigger_save();
    rx.changed().await.expect("coordinator alive");
    assert!(rx.borrow_and_update().has_unsaved_changes);

    advance(1_001).await;
    assert!(!rx.borrow().has_unsaved_changes);
}
