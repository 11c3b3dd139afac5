//! Error type for engine and ledger operations.

use liftoff_model::{BetId, RoundId, UserAddress};
use liftoff_store::StoreError;

/// Everything a betting operation can reject with.
///
/// Validation and phase errors reject before any state changes. Store
/// errors mid-operation trigger the ledger's compensation paths first
/// and then surface here. None of these ever crash the engine task —
/// they travel back to the caller on the command's reply channel.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No round exists yet (engine is recovering or just booted).
    #[error("no active round")]
    NoActiveRound,

    /// Bets are only accepted while the round is counting down.
    #[error("bets are closed for round {0}")]
    BetsClosed(RoundId),

    /// Interactive cashout requires the round to be running.
    #[error("round {0} is not running")]
    NotRunning(RoundId),

    /// The stake must be a positive, finite amount.
    #[error("invalid bet amount: {0}")]
    InvalidAmount(f64),

    /// An auto-cashout threshold must be a finite multiplier above 1.0.
    #[error("invalid auto-cashout threshold: {0}")]
    InvalidAutoCashout(f64),

    /// No user row exists for this address.
    #[error("user {0} not found")]
    UserNotFound(UserAddress),

    /// The stake exceeds the user's balance. Nothing was debited.
    #[error("insufficient balance: have {balance}, need {requested}")]
    InsufficientBalance { balance: f64, requested: f64 },

    /// The bet does not exist, is not owned by the caller, belongs to
    /// a different round, or already settled. Deliberately one error —
    /// callers learn nothing about other users' bets.
    #[error("bet {0} not found or not active")]
    BetNotActive(BetId),

    /// The engine task is gone or its command channel is full.
    #[error("engine unavailable")]
    EngineUnavailable,

    /// A store failure that no compensation path could absorb.
    #[error(transparent)]
    Store(#[from] StoreError),
}
