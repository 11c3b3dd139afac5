//! # Liftoff
//!
//! Server-authoritative backend for a multiplayer crash game.
//!
//! Liftoff runs one global round at a time: a betting countdown, a rising
//! multiplier, and a hidden crash point. Players bet during the countdown
//! and race to cash out before the crash. The engine owns all game state
//! inside a single task; callers interact through a cheap-to-clone handle
//! and observe rounds through a broadcast event stream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use liftoff::prelude::*;
//!
//! # async fn run() -> Result<(), LiftoffError> {
//! let store = Arc::new(MemoryStore::new());
//! let handle = spawn_engine(store, EngineConfig::default());
//!
//! let _events = handle.subscribe();
//! let receipt = handle
//!     .place_bet(UserAddress::new("0xabc"), 25.0, Some(2.0))
//!     .await?;
//! println!("bet {} placed", receipt.bet.id);
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::LiftoffError;

pub use liftoff_clock::{ClockTick, PhaseClock};
pub use liftoff_engine::{
    BetReceipt, CashoutReceipt, EngineConfig, EngineHandle, GameError, spawn_engine,
};
pub use liftoff_model::{
    Bet, BetId, BetPhase, EventPayload, GameEvent, GameState, Round, RoundId, RoundPhase, User,
    UserAddress, UserId, round2,
};
pub use liftoff_store::{GameStore, MemoryStore, NewBet, StoreError};

/// One-stop imports for typical callers.
pub mod prelude {
    pub use crate::{
        Bet, BetId, BetPhase, BetReceipt, CashoutReceipt, EngineConfig, EngineHandle,
        EventPayload, GameError, GameEvent, GameState, GameStore, LiftoffError, MemoryStore,
        NewBet, Round, RoundId, RoundPhase, StoreError, User, UserAddress, UserId, round2,
        spawn_engine,
    };
}
