//! Periodic heartbeat tasks for the Arcade SDK.
//!
//! The hypervisor treats a slip or pool that stops heartbeating as
//! abandoned. A [`HeartbeatTask`] is one background Tokio task that calls
//! a beat function on a fixed interval until it is cancelled.
//!
//! # Cancellation
//!
//! [`HeartbeatTask::cancel`] only prevents *future* beats. A beat that is
//! already in flight is never aborted and the caller never waits for it.
//! Cancelling twice is a no-op. Dropping the handle cancels too, so a
//! task can't outlive its owner by accident.
//!
//! Each beat is handed a receiver that flips to `true` on cancellation.
//! A beat that retries should stop starting new attempts once it does.
//!
//! If an in-flight beat fails after its task was cancelled (a "late"
//! heartbeat reaching the hypervisor after settlement), the failure is
//! logged at debug level and dropped.
//!
//! # Integration
//!
//! ```ignore
//! let task = HeartbeatTask::spawn(
//!     HeartbeatSubject::Slip(token.clone()),
//!     &HeartbeatConfig::default(),
//!     Some(failures_tx),
//!     move |cancelled| {
//!         let client = client.clone();
//!         let request = request.clone();
//!         async move { client.call_until(request, cancelled).await.map(drop) }
//!     },
//! );
//! // ... later, on settlement:
//! task.cancel();
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arcade_protocol::{PoolId, SlipToken};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How often a heartbeat fires and whether the first beat is immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between beats. Default: 10 seconds.
    pub interval: Duration,
    /// Fire the first beat as soon as the task starts instead of one
    /// interval later. Pools beat immediately; slips don't, since
    /// activation itself proves liveness.
    pub immediate: bool,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            immediate: false,
        }
    }
}

impl HeartbeatConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

    /// Shortest interval accepted. Tokio's interval panics on zero.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            immediate: false,
        }
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    /// Clamp the interval to [`Self::MIN_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "heartbeat interval too short, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Subjects and failures
// ---------------------------------------------------------------------------

/// What a heartbeat keeps alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeartbeatSubject {
    Slip(SlipToken),
    Pool(PoolId),
}

impl fmt::Display for HeartbeatSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slip(token) => fmt::Display::fmt(token, f),
            Self::Pool(pool) => fmt::Display::fmt(pool, f),
        }
    }
}

/// A beat that failed while its task was still live.
///
/// A failed heartbeat does not change the slip or pool state. It is
/// reported so the hosting process can decide what to do.
#[derive(Debug, Clone)]
pub struct HeartbeatFailure<E> {
    pub subject: HeartbeatSubject,
    /// Which beat failed (starts at 1).
    pub beat: u64,
    pub error: E,
}

/// Where heartbeat failures are delivered.
pub type FailureSender<E> = mpsc::UnboundedSender<HeartbeatFailure<E>>;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Handle to a running heartbeat task.
///
/// Owned by whoever owns the slip or pool; there is never more than one
/// handle per task.
pub struct HeartbeatTask {
    subject: HeartbeatSubject,
    cancel: watch::Sender<bool>,
    beats: Arc<AtomicU64>,
}

impl HeartbeatTask {
    /// Spawns a heartbeat task onto the current Tokio runtime.
    ///
    /// `beat` is called once per interval and its future awaited before
    /// the next tick is considered, so beats of one task never overlap.
    /// It receives the task's cancellation signal.
    pub fn spawn<F, Fut, E>(
        subject: HeartbeatSubject,
        config: &HeartbeatConfig,
        failures: Option<FailureSender<E>>,
        beat: F,
    ) -> Self
    where
        F: Fn(watch::Receiver<bool>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let config = config.validated();
        let (cancel, cancelled) = watch::channel(false);
        let beats = Arc::new(AtomicU64::new(0));

        tokio::spawn(run(
            subject.clone(),
            config,
            cancelled,
            Arc::clone(&beats),
            failures,
            beat,
        ));

        Self {
            subject,
            cancel,
            beats,
        }
    }

    /// Stops future beats. Returns `true` if this call did the stopping,
    /// `false` if the task was already cancelled.
    pub fn cancel(&self) -> bool {
        let was_cancelled = self.cancel.send_replace(true);
        if !was_cancelled {
            debug!(subject = %self.subject, "heartbeat cancelled");
        }
        !was_cancelled
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Number of beats started so far.
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    pub fn subject(&self) -> &HeartbeatSubject {
        &self.subject
    }
}

impl Drop for HeartbeatTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for HeartbeatTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartbeatTask")
            .field("subject", &self.subject)
            .field("cancelled", &self.is_cancelled())
            .field("beats", &self.beats())
            .finish()
    }
}

async fn run<F, Fut, E>(
    subject: HeartbeatSubject,
    config: HeartbeatConfig,
    mut cancelled: watch::Receiver<bool>,
    beats: Arc<AtomicU64>,
    failures: Option<FailureSender<E>>,
    beat: F,
) where
    F: Fn(watch::Receiver<bool>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    let start = if config.immediate {
        Instant::now()
    } else {
        Instant::now() + config.interval
    };
    let mut ticker = time::interval_at(start, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(
        %subject,
        interval_ms = config.interval.as_millis() as u64,
        immediate = config.immediate,
        "heartbeat started"
    );

    loop {
        tokio::select! {
            biased;
            // Only ever changes to `true`; an error means the handle is gone.
            _ = cancelled.changed() => break,
            _ = ticker.tick() => {}
        }

        let n = beats.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(%subject, beat = n, "heartbeat");

        if let Err(error) = beat(cancelled.clone()).await {
            if *cancelled.borrow() {
                debug!(%subject, beat = n, %error, "late heartbeat failed after cancellation, ignoring");
                break;
            }
            warn!(%subject, beat = n, %error, "heartbeat failed");
            if let Some(failures) = &failures {
                let _ = failures.send(HeartbeatFailure {
                    subject: subject.clone(),
                    beat: n,
                    error,
                });
            }
        }
    }

    debug!(%subject, beats = beats.load(Ordering::Relaxed), "heartbeat stopped");
}
