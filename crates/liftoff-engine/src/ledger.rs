//! The bet ledger: money movement and bet-phase transitions.
//!
//! Every operation here runs inside the engine actor, so calls are
//! serialized with each other and with phase transitions. Atomicity
//! against anything *outside* the actor comes from the store's
//! conditional writes (`try_debit`, `settle_cashout`).

use std::sync::Arc;

use liftoff_model::{Bet, BetId, BetPhase, Round, UserAddress, round2};
use liftoff_store::{GameStore, NewBet, StoreError};
use tracing::{debug, error};

use crate::GameError;

/// A settled cashout, before the event envelope is built around it.
#[derive(Debug, Clone)]
pub(crate) struct Settlement {
    pub bet: Bet,
    pub payout: f64,
    pub multiplier: f64,
}

pub(crate) struct Ledger<S> {
    store: Arc<S>,
}

impl<S: GameStore> Ledger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validates and records a bet against the given countdown round.
    ///
    /// Checks run in order, first failure wins: amount, auto-cashout
    /// threshold, user existence, balance. The debit and the bet row
    /// are kept consistent: if the insert fails after the debit
    /// succeeded, the debit is refunded before the error surfaces.
    ///
    /// The caller (the engine) has already verified the round phase.
    pub async fn place(
        &self,
        round: &Round,
        address: UserAddress,
        amount: f64,
        auto_cashout: Option<f64>,
    ) -> Result<Bet, GameError> {
        // Validate the rounded value the ledger will actually move: a
        // sub-cent stake rounds to zero and must not become a bet.
        let stake = round2(amount);
        if !stake.is_finite() || stake <= 0.0 {
            return Err(GameError::InvalidAmount(amount));
        }
        if let Some(threshold) = auto_cashout {
            // A threshold at or below 1.0 would settle during the
            // grace period at zero gain.
            if !threshold.is_finite() || threshold <= 1.0 {
                return Err(GameError::InvalidAutoCashout(threshold));
            }
        }

        let user = self
            .store
            .fetch_user(&address)
            .await?
            .ok_or_else(|| GameError::UserNotFound(address.clone()))?;

        let amount = stake;
        let balance = self.store.try_debit(&address, amount).await.map_err(
            |err| match err {
                StoreError::InsufficientFunds { balance, requested } => {
                    GameError::InsufficientBalance { balance, requested }
                }
                StoreError::UserNotFound(_) => GameError::UserNotFound(address.clone()),
                other => other.into(),
            },
        )?;

        let new_bet = NewBet {
            user_id: user.id,
            user_address: address.clone(),
            user_name: user.name,
            amount,
            auto_cashout,
            round_id: round.id,
            phase: BetPhase::Pending,
        };
        match self.store.create_bet(new_bet).await {
            Ok(bet) => {
                debug!(
                    bet_id = %bet.id,
                    round_id = %round.id,
                    address = %address,
                    amount,
                    balance,
                    "bet placed"
                );
                Ok(bet)
            }
            Err(err) => {
                // Compensate: the debit must not survive without a bet row.
                if let Err(refund_err) = self.store.credit(&address, amount).await {
                    error!(
                        address = %address,
                        amount,
                        error = %refund_err,
                        "refund after failed bet insert also failed — balance is short"
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Settles a bet at the given multiplier and credits the payout.
    ///
    /// Used by both entry paths: interactive cashout passes the
    /// round's current multiplier, the auto-cashout sweep passes the
    /// triggering multiplier explicitly (it never re-reads "current").
    ///
    /// The store's compare-and-set makes Active→CashedOut exclusive:
    /// of two settlements racing on one bet, exactly one wins.
    pub async fn cashout(
        &self,
        round: &Round,
        address: &UserAddress,
        bet_id: BetId,
        multiplier: f64,
    ) -> Result<Settlement, GameError> {
        let bet = self
            .store
            .fetch_bet(bet_id)
            .await?
            .ok_or(GameError::BetNotActive(bet_id))?;
        if bet.user_address != *address || bet.round_id != round.id {
            // Ownership and wrong-round failures are indistinguishable
            // from not-found on purpose.
            return Err(GameError::BetNotActive(bet_id));
        }

        let payout = round2(bet.amount * multiplier);
        let bet = self
            .store
            .settle_cashout(bet_id, multiplier, payout)
            .await
            .map_err(|err| match err {
                StoreError::BetNotActive(id) | StoreError::BetNotFound(id) => {
                    GameError::BetNotActive(id)
                }
                other => other.into(),
            })?;

        match self.store.credit(address, payout).await {
            Ok(balance) => {
                debug!(
                    bet_id = %bet_id,
                    address = %address,
                    multiplier,
                    payout,
                    balance,
                    "bet cashed out"
                );
            }
            Err(err) => {
                // The bet row is terminally CashedOut; un-settling it
                // would break phase exclusivity. Surface the failure.
                error!(
                    bet_id = %bet_id,
                    address = %address,
                    payout,
                    error = %err,
                    "payout credit failed after settlement"
                );
                return Err(err.into());
            }
        }

        Ok(Settlement {
            bet,
            payout,
            multiplier,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
