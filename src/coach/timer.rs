//! Single-shot task countdown
//!
//! [`TimerState`] holds the arithmetic and takes `now` explicitly so it can
//! be driven deterministically. [`CountdownTimer`] wraps it with a
//! cancellable once-per-second tick task and publishes every tick on a
//! `watch` channel for the shell to render.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Tick period of the background task
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Longest countdown accepted; larger proposals are capped to avoid
/// `Instant` overflow
const MAX_COUNTDOWN_MS: u64 = u32::MAX as u64;

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// No deadline set and nothing has expired
    Idle,
    /// Counting down
    Running(Duration),
    /// The last deadline passed
    Expired,
}

impl TimerTick {
    /// Text for the shell: `m:ss` while running, `time's up` after expiry
    pub fn display(&self) -> Option<String> {
        match self {
            Self::Idle => None,
            Self::Running(remaining) => Some(format_remaining(*remaining)),
            Self::Expired => Some("time's up".to_string()),
        }
    }
}

/// Formats remaining time as `minutes:seconds`, seconds zero-padded
///
/// Partial seconds are dropped.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use moti::coach::timer::format_remaining;
///
/// assert_eq!(format_remaining(Duration::from_millis(29_400)), "0:29");
/// assert_eq!(format_remaining(Duration::from_secs(300)), "5:00");
/// ```
pub fn format_remaining(remaining: Duration) -> String {
    let total_ms = remaining.as_millis();
    let minutes = total_ms / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    format!("{}:{:02}", minutes, seconds)
}

fn countdown_length(minutes: f64) -> Duration {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Duration::ZERO;
    }
    let millis = (minutes * 60_000.0).round() as u64;
    Duration::from_millis(millis.min(MAX_COUNTDOWN_MS))
}

/// Countdown arithmetic
///
/// Invariant: at most one deadline; `expired` is set only between a natural
/// expiry and the next `start_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerState {
    deadline: Option<Instant>,
    expired: bool,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `deadline = now + minutes * 60000ms` and clears `expired`
    ///
    /// A non-positive or non-finite `minutes` yields a deadline of `now`,
    /// which expires on the next tick.
    pub fn start_at(&mut self, now: Instant, minutes: f64) {
        self.deadline = Some(now + countdown_length(minutes));
        self.expired = false;
    }

    /// Recomputes remaining time; expires the timer when none is left
    pub fn tick_at(&mut self, now: Instant) -> TimerTick {
        match self.deadline {
            None if self.expired => TimerTick::Expired,
            None => TimerTick::Idle,
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(now);
                if remaining.is_zero() {
                    self.deadline = None;
                    self.expired = true;
                    TimerTick::Expired
                } else {
                    TimerTick::Running(remaining)
                }
            }
        }
    }

    /// Drops the deadline without marking expiry
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }
}

/// State shared between the timer handle and its tick task
struct Shared {
    state: Mutex<TimerState>,
    updates: watch::Sender<TimerTick>,
}

impl Shared {
    fn tick(&self, now: Instant) -> TimerTick {
        let tick = match self.state.lock() {
            Ok(mut state) => state.tick_at(now),
            Err(_) => {
                tracing::error!("Timer state lock poisoned");
                TimerTick::Idle
            }
        };
        self.updates.send_replace(tick);
        tick
    }
}

struct TickTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Countdown with an owned, cancellable tick task
///
/// Starting a new countdown cancels the previous tick task before spawning
/// the next one. Dropping the timer cancels its task.
pub struct CountdownTimer {
    shared: Arc<Shared>,
    task: Mutex<Option<TickTask>>,
}

impl CountdownTimer {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(TimerTick::Idle);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TimerState::new()),
                updates,
            }),
            task: Mutex::new(None),
        }
    }

    /// Receiver that observes every published tick
    pub fn subscribe(&self) -> watch::Receiver<TimerTick> {
        self.shared.updates.subscribe()
    }

    /// Starts or restarts the countdown
    ///
    /// Outside a tokio runtime the deadline is still set but no tick task is
    /// spawned; callers then drive [`CountdownTimer::tick`] themselves.
    pub fn start(&self, minutes: f64) {
        self.cancel_task();

        let now = Instant::now();
        if let Ok(mut state) = self.shared.state.lock() {
            state.start_at(now, minutes);
        }
        self.shared.tick(now);
        tracing::info!("Started task timer: {} minutes", minutes);

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("No async runtime; timer will not tick on its own");
                return;
            }
        };

        let cancel = CancellationToken::new();
        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();
        let join = handle.spawn(async move {
            let mut interval = tokio::time::interval_at(now + TICK_INTERVAL, TICK_INTERVAL);
            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,

                    _ = interval.tick() => {
                        if shared.tick(Instant::now()) == TimerTick::Expired {
                            tracing::info!("Task timer expired");
                            break;
                        }
                    }
                }
            }
        });

        if let Ok(mut task) = self.task.lock() {
            *task = Some(TickTask {
                cancel,
                handle: join,
            });
        }
    }

    /// Recomputes remaining time now and publishes it
    pub fn tick(&self) -> TimerTick {
        self.shared.tick(Instant::now())
    }

    /// Cancels the countdown and its tick task
    pub fn stop(&self) {
        self.cancel_task();
        if let Ok(mut state) = self.shared.state.lock() {
            state.stop();
        }
        self.shared.tick(Instant::now());
    }

    /// Copy of the current state
    pub fn state(&self) -> TimerState {
        self.shared
            .state
            .lock()
            .map(|state| *state)
            .unwrap_or_default()
    }

    /// Latest published tick, without recomputing
    pub fn current(&self) -> TimerTick {
        *self.shared.updates.borrow()
    }

    fn cancel_task(&self) {
        let previous = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(previous) = previous {
            previous.cancel.cancel();
            previous.handle.abort();
        }
    }
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel_task();
    }
}
