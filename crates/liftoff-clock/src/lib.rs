//! Phase-driven timer for the Liftoff round engine.
//!
//! The round lifecycle needs exactly one timer at a time: a 1 Hz
//! interval during the countdown, a fast interval while the multiplier
//! is rising, a one-shot sleep between rounds, and nothing at all when
//! idle. [`PhaseClock`] models that directly — arming a phase replaces
//! whatever timer was running before, so stale ticks from a previous
//! phase are impossible by construction.
//!
//! # Integration
//!
//! The clock is designed to sit inside the engine actor's
//! `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         tick = clock.tick() => { /* advance the round */ }
//!     }
//! }
//! ```
//!
//! When idle, [`PhaseClock::tick`] pends forever; `select!` keeps
//! processing the other branches.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::debug;

/// What fired, as seen by the engine's select loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// One second of countdown elapsed.
    Countdown,
    /// One multiplier step elapsed.
    Multiplier,
    /// The between-rounds delay expired. Fires once, then the clock
    /// is idle.
    IntermissionOver,
}

/// The engine's single timer slot.
///
/// Exactly one variant (and therefore one underlying timer) exists at
/// a time. Transitioning phases means assigning a new value, which
/// drops the previous timer — the deterministic cancellation the
/// lifecycle requires.
pub enum PhaseClock {
    /// No timer armed. `tick()` pends forever.
    Idle,
    /// Per-second countdown ticks.
    Countdown(Interval),
    /// Fast multiplier ticks.
    Running(Interval),
    /// One-shot delay before the next round.
    Intermission(Pin<Box<Sleep>>),
}

impl PhaseClock {
    /// A clock with nothing armed.
    pub fn idle() -> Self {
        Self::Idle
    }

    /// Arms the countdown interval. The first tick fires after one
    /// full `period`, not immediately.
    pub fn countdown(period: Duration) -> Self {
        debug!(period_ms = period.as_millis() as u64, "clock armed: countdown");
        Self::Countdown(delayed_interval(period))
    }

    /// Arms the multiplier interval. The first tick fires after one
    /// full `period`; the engine emits its 1.00 update inline at start.
    pub fn running(period: Duration) -> Self {
        debug!(period_ms = period.as_millis() as u64, "clock armed: running");
        Self::Running(delayed_interval(period))
    }

    /// Arms the one-shot intermission delay.
    pub fn intermission(delay: Duration) -> Self {
        debug!(delay_ms = delay.as_millis() as u64, "clock armed: intermission");
        Self::Intermission(Box::pin(time::sleep(delay)))
    }

    /// Waits for the armed timer to fire.
    ///
    /// Idle clocks pend forever — the future never resolves on its
    /// own, but `tokio::select!` still services other branches. After
    /// an intermission fires the clock returns to idle, so the delay
    /// is strictly one-shot.
    ///
    /// Cancel-safe: dropping the future mid-wait loses no ticks beyond
    /// the interval's own missed-tick policy.
    pub async fn tick(&mut self) -> ClockTick {
        match self {
            Self::Idle => {
                // Never completes — select! handles other branches.
                std::future::pending::<()>().await;
                unreachable!()
            }
            Self::Countdown(interval) => {
                interval.tick().await;
                ClockTick::Countdown
            }
            Self::Running(interval) => {
                interval.tick().await;
                ClockTick::Multiplier
            }
            Self::Intermission(sleep) => {
                sleep.as_mut().await;
                *self = Self::Idle;
                ClockTick::IntermissionOver
            }
        }
    }

    /// Returns `true` if no timer is armed.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// An interval whose first tick fires one period from now, skipping
/// (not bursting) if a tick's work overruns its budget.
fn delayed_interval(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    // A slow store call must not cause a burst of catch-up ticks.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

impl std::fmt::Debug for PhaseClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Countdown(_) => "Countdown",
            Self::Running(_) => "Running",
            Self::Intermission(_) => "Intermission",
        };
        f.write_str(name)
    }
}
