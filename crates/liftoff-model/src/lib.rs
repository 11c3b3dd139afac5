//! Domain types for the Liftoff crash game.
//!
//! Everything that describes *what* the game state is lives here:
//!
//! - Identity newtypes ([`RoundId`], [`BetId`], [`UserId`], [`UserAddress`])
//! - The round and bet state machines ([`RoundPhase`], [`BetPhase`])
//! - The persisted records ([`Round`], [`Bet`], [`User`])
//! - The event envelope the engine broadcasts ([`GameEvent`], [`EventPayload`])
//! - The on-demand snapshot ([`GameState`])
//!
//! This crate has no behavior beyond the phase-transition rules and
//! serialization. The engine crate decides *when* transitions happen;
//! this crate decides *which* transitions are legal.

mod events;
mod types;

pub use events::{EventPayload, GameEvent};
pub use types::{
    Bet, BetId, BetPhase, GameState, Round, RoundId, RoundPhase, User,
    UserAddress, UserId, round2,
};
