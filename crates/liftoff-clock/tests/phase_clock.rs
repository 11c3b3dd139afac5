//! Integration tests for the phase clock.
//!
//! Uses `tokio::time::pause()` (via `start_paused = true`) so timers
//! resolve deterministically as virtual time auto-advances.

use std::time::Duration;

use liftoff_clock::{ClockTick, PhaseClock};
use tokio::time::timeout;

// Building an intermission registers a sleep, so even this
// constructor check needs a runtime.
#[tokio::test(start_paused = true)]
async fn test_idle_is_idle() {
    let clock = PhaseClock::idle();
    assert!(clock.is_idle());
    let clock = PhaseClock::intermission(Duration::from_secs(1));
    assert!(!clock.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_idle_clock_pends_forever() {
    let mut clock = PhaseClock::idle();
    // The tick future must not resolve, even after a long virtual wait.
    let result = timeout(Duration::from_secs(3600), clock.tick()).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_once_per_period() {
    let mut clock = PhaseClock::countdown(Duration::from_secs(1));

    let start = tokio::time::Instant::now();
    for _ in 0..3 {
        assert_eq!(clock.tick().await, ClockTick::Countdown);
    }
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_is_not_immediate() {
    let mut clock = PhaseClock::running(Duration::from_millis(100));

    // Nothing should fire inside the first period.
    let early = timeout(Duration::from_millis(99), clock.tick()).await;
    assert!(early.is_err());

    assert_eq!(clock.tick().await, ClockTick::Multiplier);
}

#[tokio::test(start_paused = true)]
async fn test_running_ticks_at_fast_rate() {
    let mut clock = PhaseClock::running(Duration::from_millis(100));

    let start = tokio::time::Instant::now();
    for _ in 0..10 {
        assert_eq!(clock.tick().await, ClockTick::Multiplier);
    }
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_intermission_fires_once_then_idles() {
    let mut clock = PhaseClock::intermission(Duration::from_secs(1));

    assert_eq!(clock.tick().await, ClockTick::IntermissionOver);
    assert!(clock.is_idle());

    // A second wait pends forever — no spurious re-fire.
    let again = timeout(Duration::from_secs(60), clock.tick()).await;
    assert!(again.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_rearming_replaces_previous_timer() {
    let mut clock = PhaseClock::countdown(Duration::from_secs(1));
    assert_eq!(clock.tick().await, ClockTick::Countdown);

    // Transitioning phases drops the countdown interval; only
    // multiplier ticks fire afterwards.
    clock = PhaseClock::running(Duration::from_millis(100));
    for _ in 0..5 {
        assert_eq!(clock.tick().await, ClockTick::Multiplier);
    }
}

#[tokio::test(start_paused = true)]
async fn test_tick_is_cancel_safe_in_select() {
    let mut clock = PhaseClock::countdown(Duration::from_secs(1));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<u32>(4);

    tx.send(1).await.unwrap();

    // A command arriving must not consume the pending countdown tick.
    tokio::select! {
        biased;
        Some(n) = rx.recv() => assert_eq!(n, 1),
        _ = clock.tick() => panic!("tick should not fire before its period"),
    }

    let start = tokio::time::Instant::now();
    assert_eq!(clock.tick().await, ClockTick::Countdown);
    assert!(start.elapsed() <= Duration::from_secs(1));
}
