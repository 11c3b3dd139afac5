//! Unified error type for the Liftoff backend.

use liftoff_engine::GameError;
use liftoff_store::StoreError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `liftoff` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LiftoffError {
    /// A game-level error (round closed, invalid bet, rejected cashout).
    #[error(transparent)]
    Game(#[from] GameError),

    /// A storage-level error (missing record, balance, backend failure).
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftoff_model::BetId;

    #[test]
    fn test_from_game_error() {
        let err = GameError::InvalidAmount(-5.0);
        let liftoff_err: LiftoffError = err.into();
        assert!(matches!(liftoff_err, LiftoffError::Game(_)));
        assert!(liftoff_err.to_string().contains("-5"));
    }

    #[test]
    fn test_from_store_error() {
        let err = StoreError::BetNotFound(BetId(7));
        let liftoff_err: LiftoffError = err.into();
        assert!(matches!(liftoff_err, LiftoffError::Store(_)));
        assert!(liftoff_err.to_string().contains("B-7"));
    }
}
