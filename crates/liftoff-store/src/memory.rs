//! In-memory reference store.
//!
//! Backs tests and the demo simulator. All tables live behind a single
//! `tokio::sync::Mutex`, so every operation — including the
//! conditional writes — is trivially atomic with respect to the
//! others. Id assignment uses atomic counters so ids stay unique even
//! across store instances sharing a process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use liftoff_model::{
    Bet, BetId, BetPhase, Round, RoundId, RoundPhase, User, UserAddress,
    UserId, round2,
};
use tokio::sync::Mutex;
use tracing::trace;

use crate::{GameStore, NewBet, StoreError};

static NEXT_ROUND_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_BET_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_USER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct Tables {
    users: HashMap<UserAddress, User>,
    rounds: HashMap<RoundId, Round>,
    bets: HashMap<BetId, Bet>,
}

/// A `GameStore` backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user row with the given starting balance. Returns the
    /// created user. Intended for test and demo setup.
    pub async fn seed_user(
        &self,
        address: impl Into<String>,
        name: impl Into<String>,
        balance: f64,
    ) -> User {
        let user = User {
            id: UserId(NEXT_USER_ID.fetch_add(1, Ordering::Relaxed)),
            address: UserAddress::new(address),
            name: name.into(),
            balance: round2(balance),
        };
        let mut tables = self.tables.lock().await;
        tables.users.insert(user.address.clone(), user.clone());
        user
    }

    /// Current balance of a user, for assertions in tests.
    pub async fn balance_of(
        &self,
        address: &UserAddress,
    ) -> Option<f64> {
        let tables = self.tables.lock().await;
        tables.users.get(address).map(|u| u.balance)
    }
}

impl GameStore for MemoryStore {
    async fn fetch_user(
        &self,
        address: &UserAddress,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.get(address).cloned())
    }

    async fn try_debit(
        &self,
        address: &UserAddress,
        amount: f64,
    ) -> Result<f64, StoreError> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(address)
            .ok_or_else(|| StoreError::UserNotFound(address.0.clone()))?;
        if user.balance < amount {
            return Err(StoreError::InsufficientFunds {
                balance: user.balance,
                requested: amount,
            });
        }
        user.balance = round2(user.balance - amount);
        trace!(address = %address, amount, balance = user.balance, "debited");
        Ok(user.balance)
    }

    async fn credit(
        &self,
        address: &UserAddress,
        amount: f64,
    ) -> Result<f64, StoreError> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(address)
            .ok_or_else(|| StoreError::UserNotFound(address.0.clone()))?;
        user.balance = round2(user.balance + amount);
        trace!(address = %address, amount, balance = user.balance, "credited");
        Ok(user.balance)
    }

    async fn create_round(&self, target: f64) -> Result<Round, StoreError> {
        let round = Round {
            id: RoundId(NEXT_ROUND_ID.fetch_add(1, Ordering::Relaxed)),
            target_multiplier: target,
            current_multiplier: 1.0,
            phase: RoundPhase::Countdown,
            start_time: None,
            end_time: None,
            final_multiplier: None,
        };
        let mut tables = self.tables.lock().await;
        tables.rounds.insert(round.id, round.clone());
        Ok(round)
    }

    async fn update_round(&self, round: &Round) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.rounds.get_mut(&round.id) {
            Some(row) => {
                *row = round.clone();
                Ok(())
            }
            None => Err(StoreError::RoundNotFound(round.id)),
        }
    }

    async fn fetch_round(
        &self,
        id: RoundId,
    ) -> Result<Option<Round>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.rounds.get(&id).cloned())
    }

    async fn create_bet(&self, bet: NewBet) -> Result<Bet, StoreError> {
        let bet = Bet {
            id: BetId(NEXT_BET_ID.fetch_add(1, Ordering::Relaxed)),
            user_id: bet.user_id,
            user_address: bet.user_address,
            user_name: bet.user_name,
            amount: bet.amount,
            auto_cashout: bet.auto_cashout,
            round_id: bet.round_id,
            phase: bet.phase,
            multiplier_at_cashout: None,
            payout: None,
        };
        let mut tables = self.tables.lock().await;
        tables.bets.insert(bet.id, bet.clone());
        Ok(bet)
    }

    async fn fetch_bet(&self, id: BetId) -> Result<Option<Bet>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.bets.get(&id).cloned())
    }

    async fn activate_pending(
        &self,
        round_id: RoundId,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let mut activated = 0;
        for bet in tables.bets.values_mut() {
            if bet.round_id == round_id && bet.phase == BetPhase::Pending {
                bet.phase = BetPhase::Active;
                activated += 1;
            }
        }
        Ok(activated)
    }

    async fn settle_cashout(
        &self,
        id: BetId,
        multiplier: f64,
        payout: f64,
    ) -> Result<Bet, StoreError> {
        let mut tables = self.tables.lock().await;
        let bet = tables
            .bets
            .get_mut(&id)
            .ok_or(StoreError::BetNotFound(id))?;
        if bet.phase != BetPhase::Active {
            return Err(StoreError::BetNotActive(id));
        }
        bet.phase = BetPhase::CashedOut;
        bet.multiplier_at_cashout = Some(multiplier);
        bet.payout = Some(payout);
        Ok(bet.clone())
    }

    async fn mark_lost(&self, id: BetId) -> Result<Bet, StoreError> {
        let mut tables = self.tables.lock().await;
        let bet = tables
            .bets
            .get_mut(&id)
            .ok_or(StoreError::BetNotFound(id))?;
        if bet.phase != BetPhase::Active {
            return Err(StoreError::BetNotActive(id));
        }
        bet.phase = BetPhase::Lost;
        Ok(bet.clone())
    }

    async fn bets_for_round(
        &self,
        round_id: RoundId,
        phases: &[BetPhase],
    ) -> Result<Vec<Bet>, StoreError> {
        let tables = self.tables.lock().await;
        let mut bets: Vec<Bet> = tables
            .bets
            .values()
            .filter(|b| b.round_id == round_id && phases.contains(&b.phase))
            .cloned()
            .collect();
        // Stable order for snapshots.
        bets.sort_by_key(|b| b.id);
        Ok(bets)
    }

    async fn auto_cashout_candidates(
        &self,
        round_id: RoundId,
        multiplier: f64,
    ) -> Result<Vec<Bet>, StoreError> {
        let tables = self.tables.lock().await;
        let mut bets: Vec<Bet> = tables
            .bets
            .values()
            .filter(|b| {
                b.round_id == round_id
                    && b.phase == BetPhase::Active
                    && b.auto_cashout.is_some_and(|t| t <= multiplier)
            })
            .cloned()
            .collect();
        bets.sort_by_key(|b| b.id);
        Ok(bets)
    }
}
