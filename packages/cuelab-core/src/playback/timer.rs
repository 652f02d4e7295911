//! Cancellable auto-advance timer.
//!
//! Each player may carry one single-shot timer that reveals gated page
//! content once the stimulus has been audible long enough. The timer is
//! rearmable, pause captures the remaining time (resume continues from the
//! remainder, not the full duration), and cancellation is idempotent and
//! side-effect-free: cancelling never sends anything.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::runtime::TaskSpawner;

/// Callback invoked on the timer task when the delay elapses.
pub type ElapsedHandler = Arc<dyn Fn() + Send + Sync>;

struct TimerInner {
    /// Time left on the clock while not armed; counts down across pauses.
    remaining: Duration,
    /// When the current arming started, while armed.
    armed_at: Option<Instant>,
    /// Cancels the currently scheduled task, if any.
    token: Option<CancellationToken>,
}

/// Single-shot, rearmable, pausable delay owned by one player.
pub struct AdvanceTimer {
    full: Duration,
    inner: Arc<Mutex<TimerInner>>,
}

impl AdvanceTimer {
    /// Creates a timer with its configured full duration. Not armed yet.
    #[must_use]
    pub fn new(full: Duration) -> Self {
        Self {
            full,
            inner: Arc::new(Mutex::new(TimerInner {
                remaining: full,
                armed_at: None,
                token: None,
            })),
        }
    }

    /// Arms the timer from its full duration, replacing any earlier arming.
    pub fn arm(&self, spawner: &Arc<dyn TaskSpawner>, on_elapsed: ElapsedHandler) {
        self.schedule(spawner, self.full, on_elapsed);
    }

    /// Re-arms the timer from the remainder captured at the last pause.
    ///
    /// A timer that already ran out stays quiet.
    pub fn resume(&self, spawner: &Arc<dyn TaskSpawner>, on_elapsed: ElapsedHandler) {
        let remaining = self.inner.lock().remaining;
        if remaining > Duration::ZERO {
            self.schedule(spawner, remaining, on_elapsed);
        }
    }

    fn schedule(&self, spawner: &Arc<dyn TaskSpawner>, delay: Duration, on_elapsed: ElapsedHandler) {
        let token = CancellationToken::new();
        {
            let mut inner = self.inner.lock();
            if let Some(old) = inner.token.take() {
                old.cancel();
            }
            inner.remaining = delay;
            inner.armed_at = Some(Instant::now());
            inner.token = Some(token.clone());
        }

        let inner = Arc::clone(&self.inner);
        spawner.spawn_task(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    {
                        let mut inner = inner.lock();
                        inner.remaining = Duration::ZERO;
                        inner.armed_at = None;
                        inner.token = None;
                    }
                    on_elapsed();
                }
            }
        });
    }

    /// Stops the clock and captures the remaining time for a later
    /// [`AdvanceTimer::resume`].
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if let Some(armed_at) = inner.armed_at.take() {
            inner.remaining = inner.remaining.saturating_sub(armed_at.elapsed());
        }
        if let Some(token) = inner.token.take() {
            token.cancel();
        }
    }

    /// Cancels any scheduled firing. Idempotent; never fires the handler,
    /// never touches the network. The captured remainder is left as-is.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        inner.armed_at = None;
        if let Some(token) = inner.token.take() {
            token.cancel();
        }
    }

    /// True while a firing is scheduled.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.inner.lock().token.is_some()
    }

    /// Remaining time on the clock (full duration before the first arming).
    #[must_use]
    pub fn remaining(&self) -> Duration {
        let inner = self.inner.lock();
        match inner.armed_at {
            Some(armed_at) => inner.remaining.saturating_sub(armed_at.elapsed()),
            None => inner.remaining,
        }
    }
}
