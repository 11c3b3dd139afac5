//! The `GameStore` trait — the contract every backing store fulfills.

use std::future::Future;

use liftoff_model::{
    Bet, BetId, BetPhase, Round, RoundId, User, UserAddress, UserId,
};

use crate::StoreError;

/// Input for creating a bet row. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewBet {
    pub user_id: UserId,
    pub user_address: UserAddress,
    pub user_name: String,
    pub amount: f64,
    pub auto_cashout: Option<f64>,
    pub round_id: RoundId,
    /// Pending for bets placed during the countdown; the engine flips
    /// them to Active in one pass at round start.
    pub phase: BetPhase,
}

/// Persistence operations the engine and ledger consume.
///
/// All methods are async — every call is I/O against the backing
/// store. Methods are declared in return-position `impl Future + Send`
/// form so the engine actor's task stays spawnable on a multithreaded
/// runtime; implementations can still use plain `async fn`.
/// Implementations must be shareable across tasks (`Send + Sync`), and
/// the conditional operations (`try_debit`, `settle_cashout`,
/// `mark_lost`) must be atomic: check and write under the same guard,
/// or the ledger's money-movement guarantees fall apart.
pub trait GameStore: Send + Sync + 'static {
    // -- Users / balances --

    /// Looks up a user by wallet address.
    fn fetch_user(
        &self,
        address: &UserAddress,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    /// Atomically decrements the user's balance by `amount` if the
    /// balance covers it. Returns the new balance.
    ///
    /// Fails with [`StoreError::InsufficientFunds`] (balance
    /// unchanged) or [`StoreError::UserNotFound`].
    fn try_debit(
        &self,
        address: &UserAddress,
        amount: f64,
    ) -> impl Future<Output = Result<f64, StoreError>> + Send;

    /// Atomically increments the user's balance by `amount`. Returns
    /// the new balance.
    fn credit(
        &self,
        address: &UserAddress,
        amount: f64,
    ) -> impl Future<Output = Result<f64, StoreError>> + Send;

    // -- Rounds --

    /// Inserts a new round row in Countdown phase with the given
    /// target and `current_multiplier = 1.0`. The store assigns the id.
    fn create_round(
        &self,
        target: f64,
    ) -> impl Future<Output = Result<Round, StoreError>> + Send;

    /// Writes the full round row (phase, times, multipliers).
    fn update_round(
        &self,
        round: &Round,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Looks up a round by id.
    fn fetch_round(
        &self,
        id: RoundId,
    ) -> impl Future<Output = Result<Option<Round>, StoreError>> + Send;

    // -- Bets --

    /// Inserts a bet row. The store assigns the id.
    fn create_bet(
        &self,
        bet: NewBet,
    ) -> impl Future<Output = Result<Bet, StoreError>> + Send;

    /// Looks up a bet by id.
    fn fetch_bet(
        &self,
        id: BetId,
    ) -> impl Future<Output = Result<Option<Bet>, StoreError>> + Send;

    /// Flips every Pending bet of the round to Active in one pass.
    /// Returns how many bets were activated.
    fn activate_pending(
        &self,
        round_id: RoundId,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Compare-and-set settlement: Active → CashedOut, recording the
    /// settlement multiplier and payout. Returns the updated bet.
    ///
    /// Fails with [`StoreError::BetNotActive`] if the bet is in any
    /// other phase — this is what makes double cashout impossible.
    fn settle_cashout(
        &self,
        id: BetId,
        multiplier: f64,
        payout: f64,
    ) -> impl Future<Output = Result<Bet, StoreError>> + Send;

    /// Compare-and-set: Active → Lost, no payout. Returns the updated
    /// bet. Fails with [`StoreError::BetNotActive`] if the bet already
    /// settled.
    fn mark_lost(
        &self,
        id: BetId,
    ) -> impl Future<Output = Result<Bet, StoreError>> + Send;

    /// All bets of the round currently in one of `phases`.
    fn bets_for_round(
        &self,
        round_id: RoundId,
        phases: &[BetPhase],
    ) -> impl Future<Output = Result<Vec<Bet>, StoreError>> + Send;

    /// Active bets of the round whose auto-cashout threshold is set
    /// and at or below `multiplier`.
    fn auto_cashout_candidates(
        &self,
        round_id: RoundId,
        multiplier: f64,
    ) -> impl Future<Output = Result<Vec<Bet>, StoreError>> + Send;
}
