//! Integration tests for heartbeat tasks.
//!
//! Every test runs on a paused Tokio clock: sleeping advances virtual
//! time instantly, so "wait 25 seconds" costs nothing and beat counts
//! are exact.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arcade_heartbeat::{HeartbeatConfig, HeartbeatSubject, HeartbeatTask};
use arcade_protocol::{PoolId, SlipToken};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn slip_subject() -> HeartbeatSubject {
    HeartbeatSubject::Slip(SlipToken::new("alice"))
}

/// Spawns a task whose beats always succeed and bump `counter`.
fn counting_task(config: HeartbeatConfig, counter: Arc<AtomicU64>) -> HeartbeatTask {
    HeartbeatTask::spawn(slip_subject(), &config, None::<mpsc::UnboundedSender<_>>, move |_| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        }
    })
}

// =========================================================================
// HeartbeatConfig
// =========================================================================

#[test]
fn test_default_config_is_ten_seconds_delayed() {
    let cfg = HeartbeatConfig::default();
    assert_eq!(cfg.interval, secs(10));
    assert!(!cfg.immediate);
}

#[test]
fn test_validated_clamps_zero_interval() {
    let cfg = HeartbeatConfig::every(Duration::ZERO).validated();
    assert_eq!(cfg.interval, HeartbeatConfig::MIN_INTERVAL);
}

#[test]
fn test_subject_display() {
    assert_eq!(slip_subject().to_string(), "slip:alic…");
    assert_eq!(
        HeartbeatSubject::Pool(PoolId::named("p1")).to_string(),
        "pool:p1"
    );
}

// =========================================================================
// Firing schedule
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_delayed_task_first_beat_after_one_interval() {
    let counter = Arc::new(AtomicU64::new(0));
    let task = counting_task(HeartbeatConfig::default(), Arc::clone(&counter));

    tokio::time::sleep(secs(9)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    tokio::time::sleep(secs(16)).await; // t = 25s
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(task.beats(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_immediate_task_beats_at_start() {
    let counter = Arc::new(AtomicU64::new(0));
    let _task = counting_task(HeartbeatConfig::default().immediate(), Arc::clone(&counter));

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    tokio::time::sleep(secs(24)).await; // t ≈ 25s: beats at 0, 10, 20
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

// =========================================================================
// Cancellation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_future_beats() {
    let counter = Arc::new(AtomicU64::new(0));
    let task = counting_task(HeartbeatConfig::default(), Arc::clone(&counter));

    tokio::time::sleep(secs(15)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    assert!(task.cancel());
    assert!(task.is_cancelled());

    tokio::time::sleep(secs(60)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1, "no beats after cancel");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_twice_is_noop() {
    let counter = Arc::new(AtomicU64::new(0));
    let task = counting_task(HeartbeatConfig::default(), counter);

    assert!(task.cancel(), "first cancel stops the task");
    assert!(!task.cancel(), "second cancel reports nothing to do");
    assert!(task.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels() {
    let counter = Arc::new(AtomicU64::new(0));
    let task = counting_task(HeartbeatConfig::default(), Arc::clone(&counter));
    drop(task);

    tokio::time::sleep(secs(35)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_does_not_abort_in_flight_beat() {
    let finished = Arc::new(AtomicU64::new(0));
    let done = Arc::clone(&finished);
    let task = HeartbeatTask::spawn(
        slip_subject(),
        &HeartbeatConfig::default().immediate(),
        None::<mpsc::UnboundedSender<_>>,
        move |_| {
            let done = Arc::clone(&done);
            async move {
                tokio::time::sleep(secs(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        },
    );

    // The first beat is now sleeping inside its request.
    tokio::time::sleep(secs(2)).await;
    task.cancel();

    tokio::time::sleep(secs(30)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1, "in-flight beat completed");
    assert_eq!(task.beats(), 1, "no new beat started");
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_beat_observes_cancellation() {
    let noticed = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&noticed);
    let task = HeartbeatTask::spawn(
        slip_subject(),
        &HeartbeatConfig::default().immediate(),
        None::<mpsc::UnboundedSender<_>>,
        move |mut cancelled| {
            let seen = Arc::clone(&seen);
            async move {
                if cancelled.wait_for(|c| *c).await.is_ok() {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                Ok::<(), String>(())
            }
        },
    );

    tokio::time::sleep(secs(3)).await;
    assert_eq!(noticed.load(Ordering::SeqCst), 0);
    task.cancel();
    tokio::time::sleep(secs(1)).await;

    assert_eq!(noticed.load(Ordering::SeqCst), 1, "beat saw the flip");
    assert_eq!(task.beats(), 1);
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_failures_are_reported_and_loop_continues() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = HeartbeatTask::spawn(
        slip_subject(),
        &HeartbeatConfig::default(),
        Some(tx),
        |_| async { Err::<(), _>("hypervisor said no".to_owned()) },
    );

    tokio::time::sleep(secs(25)).await;

    let first = rx.try_recv().expect("first failure reported");
    assert_eq!(first.beat, 1);
    assert_eq!(first.subject, slip_subject());
    assert_eq!(first.error, "hypervisor said no");

    let second = rx.try_recv().expect("second failure reported");
    assert_eq!(second.beat, 2);
    assert!(!task.is_cancelled(), "failures don't stop the task");
}

#[tokio::test(start_paused = true)]
async fn test_late_failure_after_cancel_is_dropped() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = HeartbeatTask::spawn(
        HeartbeatSubject::Pool(PoolId::Implicit),
        &HeartbeatConfig::default().immediate(),
        Some(tx),
        |_| async {
            tokio::time::sleep(secs(5)).await;
            Err::<(), _>("pool already settled".to_owned())
        },
    );

    tokio::time::sleep(secs(1)).await;
    task.cancel();
    tokio::time::sleep(secs(30)).await;

    assert!(rx.try_recv().is_err(), "late failure must not surface");
}
