//! Round engine and bet ledger for the Liftoff crash game.
//!
//! The engine is an actor: an isolated Tokio task that owns the one
//! active round, drives its lifecycle on timers, and applies every
//! ledger operation in arrival order. The outside world talks to it
//! through an [`EngineHandle`] (commands with reply channels) and
//! listens on a broadcast event bus.
//!
//! ```text
//! Countdown --(timer hits 0)--> Running
//! Running   --(multiplier reaches target)--> Completed
//! Completed --(intermission)--> Countdown   (new round)
//! ```
//!
//! Because commands and timer ticks are serialized through one task,
//! no two ledger mutations interleave, and no phase transition races
//! another — the at-most-one-active-round invariant holds by
//! construction.
//!
//! # Key types
//!
//! - [`spawn_engine`] — start the actor, get a handle
//! - [`EngineHandle`] — place bets, cash out, snapshot, subscribe
//! - [`EngineConfig`] — timings and the crash-point draw range
//! - [`GameError`] — everything an operation can reject with

mod config;
mod engine;
mod error;
mod ledger;

pub use config::EngineConfig;
pub use engine::{BetReceipt, CashoutReceipt, EngineHandle, spawn_engine};
pub use error::GameError;
