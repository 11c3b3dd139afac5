//! Error type for store operations.

use liftoff_model::{BetId, RoundId};

/// Errors a [`GameStore`](crate::GameStore) implementation can return.
///
/// The conditional-write failures (`InsufficientFunds`, `BetNotActive`)
/// are part of the contract, not incidental: the ledger relies on the
/// store refusing these writes atomically.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No user row exists for the given address.
    #[error("user {0} not found")]
    UserNotFound(String),

    /// No round row exists with this id.
    #[error("round {0} not found")]
    RoundNotFound(RoundId),

    /// No bet row exists with this id.
    #[error("bet {0} not found")]
    BetNotFound(BetId),

    /// A debit was refused because it would overdraw the balance.
    /// The balance is unchanged.
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: f64, requested: f64 },

    /// A conditional phase transition was refused because the bet is
    /// not Active. The bet row is unchanged.
    #[error("bet {0} is not active")]
    BetNotActive(BetId),

    /// The backing store failed (connection, query, corruption).
    #[error("store backend error: {0}")]
    Backend(String),
}
