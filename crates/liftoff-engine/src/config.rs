//! Engine configuration.

use std::time::Duration;

use tracing::warn;

/// Timings and draw range for the round lifecycle.
///
/// The defaults reproduce the production pacing: a 20-second countdown
/// ticking once per second, a 3-second hold at 1.00× after start, a
/// fixed climb of 0.1× per second sampled every 100 ms, 1 second
/// between rounds, and crash points drawn uniformly from [1.0, 7.0).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Countdown length in whole seconds (ticks once per second).
    pub countdown_secs: u32,
    /// How long the multiplier holds at 1.00× after the round starts,
    /// so late-binding clients see the start.
    pub grace_period: Duration,
    /// Multiplier growth per second of animation time. Constant across
    /// rounds — only the stopping point differs.
    pub multiplier_rate: f64,
    /// How often the multiplier is recomputed, persisted, and emitted.
    pub tick_period: Duration,
    /// Delay between a round completing and the next countdown.
    pub intermission: Duration,
    /// Inclusive lower bound of the crash-point draw.
    pub min_target: f64,
    /// Exclusive upper bound of the crash-point draw.
    pub max_target: f64,
    /// Overrides the random draw with a fixed crash point. Used by
    /// tests and demos that need a predictable round.
    pub fixed_target: Option<f64>,
    /// Capacity of the broadcast event bus. Slow subscribers lag past
    /// this many buffered events.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 20,
            grace_period: Duration::from_secs(3),
            multiplier_rate: 0.1,
            tick_period: Duration::from_millis(100),
            intermission: Duration::from_secs(1),
            min_target: 1.0,
            max_target: 7.0,
            fixed_target: None,
            event_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Fastest supported multiplier tick.
    pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(10);

    /// Clamp and fix any out-of-range values so the config is safe to
    /// run. Called automatically by the engine at spawn. Rules:
    ///
    /// - `countdown_secs` at least 1.
    /// - `tick_period` at least [`Self::MIN_TICK_PERIOD`].
    /// - `multiplier_rate` must be positive, else the default 0.1.
    /// - `min_target` at least 1.0; `max_target` strictly above it.
    /// - `event_capacity` at least 16.
    pub fn validated(mut self) -> Self {
        if self.countdown_secs == 0 {
            warn!("countdown_secs of 0 — clamping to 1");
            self.countdown_secs = 1;
        }
        if self.tick_period < Self::MIN_TICK_PERIOD {
            warn!(
                tick_ms = self.tick_period.as_millis() as u64,
                "tick_period below minimum — clamping"
            );
            self.tick_period = Self::MIN_TICK_PERIOD;
        }
        if !(self.multiplier_rate > 0.0) || !self.multiplier_rate.is_finite() {
            warn!(rate = self.multiplier_rate, "invalid multiplier_rate — using 0.1");
            self.multiplier_rate = 0.1;
        }
        if self.min_target < 1.0 {
            warn!(min = self.min_target, "min_target below 1.0 — clamping");
            self.min_target = 1.0;
        }
        if self.max_target <= self.min_target {
            warn!(
                min = self.min_target,
                max = self.max_target,
                "empty target range — widening above min"
            );
            self.max_target = self.min_target + 1.0;
        }
        if self.event_capacity < 16 {
            self.event_capacity = 16;
        }
        self
    }
}
