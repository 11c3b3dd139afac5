//! Round lifecycle tests on paused virtual time.
//!
//! `start_paused` makes every timer deterministic: sleeping past a
//! boundary fires exactly the ticks that virtual window contains, so
//! these tests assert exact event sequences.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use liftoff_engine::{EngineConfig, GameError, spawn_engine};
use liftoff_model::{
    Bet, BetId, BetPhase, EventPayload, GameEvent, Round, RoundId, RoundPhase,
    User, UserAddress,
};
use liftoff_store::{GameStore, MemoryStore, NewBet, StoreError};
use tokio::sync::broadcast;
use tokio::time::sleep;

/// Compressed timings: 3 s countdown, 0.5 s grace, then +1.0×/s in
/// 100 ms ticks, 0.5 s intermission. With `fixed_target` 2.0 a round
/// runs create → start at t+3.0 s → crash at t+4.5 s → next round at
/// t+5.0 s.
fn fast_config(target: f64) -> EngineConfig {
    EngineConfig {
        countdown_secs: 3,
        grace_period: Duration::from_millis(500),
        multiplier_rate: 1.0,
        tick_period: Duration::from_millis(100),
        intermission: Duration::from_millis(500),
        fixed_target: Some(target),
        ..EngineConfig::default()
    }
}

fn drain(events: &mut broadcast::Receiver<GameEvent>) -> Vec<EventPayload> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event.payload);
    }
    out
}

fn multipliers_for(events: &[EventPayload], round_id: RoundId) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            EventPayload::MultiplierUpdate { round_id: id, multiplier }
                if *id == round_id =>
            {
                Some(*multiplier)
            }
            _ => None,
        })
        .collect()
}

fn created_rounds(events: &[EventPayload]) -> Vec<&Round> {
    events
        .iter()
        .filter_map(|e| match e {
            EventPayload::RoundCreated(round) => Some(round),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_full_round_event_sequence() {
    let store = Arc::new(MemoryStore::new());
    let handle = spawn_engine(store, fast_config(2.0));
    let mut events = handle.subscribe();

    // Past the crash (t+4.5 s) but before the next round (t+5.0 s).
    sleep(Duration::from_millis(4800)).await;
    let events = drain(&mut events);

    let EventPayload::RoundCreated(round) = &events[0] else {
        panic!("expected RoundCreated first, got {:?}", events[0]);
    };
    assert_eq!(round.phase, RoundPhase::Countdown);
    assert_eq!(round.target_multiplier, 2.0);
    assert_eq!(round.current_multiplier, 1.0);
    assert!(round.start_time.is_none());

    let countdowns: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            EventPayload::Countdown { seconds, is_initial } => {
                assert!(*is_initial, "first boot countdown");
                Some(*seconds)
            }
            _ => None,
        })
        .collect();
    assert_eq!(countdowns, vec![3, 2, 1, 0]);

    let start_idx = events
        .iter()
        .position(|e| matches!(e, EventPayload::GameStart(_)))
        .expect("GameStart emitted");
    let EventPayload::GameStart(started) = &events[start_idx] else {
        unreachable!()
    };
    assert_eq!(started.id, round.id);
    assert_eq!(started.phase, RoundPhase::Running);
    assert!(started.start_time.is_some());

    // 1 immediate + 5 grace ticks + 10 climbing ticks to 2.0.
    let multipliers = multipliers_for(&events, round.id);
    assert_eq!(multipliers.len(), 16);
    assert_eq!(multipliers[0], 1.0);
    assert!(multipliers.windows(2).all(|w| w[0] <= w[1]));
    assert!(multipliers.iter().all(|m| *m <= 2.0));
    assert_eq!(*multipliers.last().unwrap(), 2.0);

    let ends: Vec<_> = events
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match e {
            EventPayload::GameEnd { round_id, final_multiplier } => {
                Some((i, *round_id, *final_multiplier))
            }
            _ => None,
        })
        .collect();
    assert_eq!(ends.len(), 1);
    let (end_idx, end_round, final_multiplier) = ends[0];
    assert_eq!(end_round, round.id);
    assert_eq!(final_multiplier, 2.0);
    assert!(end_idx > start_idx);
    assert_eq!(end_idx, events.len() - 1, "GameEnd closes the round's stream");
}

#[tokio::test(start_paused = true)]
async fn test_multiplier_holds_during_grace() {
    let store = Arc::new(MemoryStore::new());
    let handle = spawn_engine(store, fast_config(2.0));
    let mut events = handle.subscribe();

    sleep(Duration::from_millis(4800)).await;
    let events = drain(&mut events);
    let round_id = created_rounds(&events)[0].id;

    let multipliers = multipliers_for(&events, round_id);
    assert!(multipliers[..6].iter().all(|m| *m == 1.0), "grace holds at 1.00");
    assert_eq!(multipliers[6], 1.1, "first climbing tick after grace");
}

#[tokio::test(start_paused = true)]
async fn test_completed_round_is_persisted() {
    let store = Arc::new(MemoryStore::new());
    let handle = spawn_engine(store.clone(), fast_config(2.0));
    let mut events = handle.subscribe();

    sleep(Duration::from_millis(4800)).await;
    let events = drain(&mut events);
    let round_id = created_rounds(&events)[0].id;

    let round = store
        .fetch_round(round_id)
        .await
        .unwrap()
        .expect("round row exists");
    assert_eq!(round.phase, RoundPhase::Completed);
    assert_eq!(round.final_multiplier, Some(2.0));
    assert_eq!(round.current_multiplier, 2.0);
    assert!(round.end_time.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_next_round_follows_intermission() {
    let store = Arc::new(MemoryStore::new());
    let handle = spawn_engine(store, fast_config(2.0));
    let mut events = handle.subscribe();

    // Crash at t+4.5 s, intermission ends at t+5.0 s.
    sleep(Duration::from_millis(5200)).await;
    let events = drain(&mut events);

    let rounds = created_rounds(&events);
    assert_eq!(rounds.len(), 2);
    assert_ne!(rounds[0].id, rounds[1].id);

    let end_idx = events
        .iter()
        .position(|e| matches!(e, EventPayload::GameEnd { .. }))
        .expect("first round ended");
    let second_created_idx = events
        .iter()
        .rposition(|e| matches!(e, EventPayload::RoundCreated(_)))
        .expect("second round created");
    assert!(second_created_idx > end_idx);

    // Only the boot countdown is flagged initial.
    let late_initials: Vec<bool> = events[second_created_idx..]
        .iter()
        .filter_map(|e| match e {
            EventPayload::Countdown { is_initial, .. } => Some(*is_initial),
            _ => None,
        })
        .collect();
    assert!(!late_initials.is_empty());
    assert!(late_initials.iter().all(|i| !i));
}

#[tokio::test(start_paused = true)]
async fn test_no_multiplier_after_crash() {
    let store = Arc::new(MemoryStore::new());
    let handle = spawn_engine(store, fast_config(2.0));
    let mut events = handle.subscribe();

    // Two full rounds: second crashes at t+9.5 s.
    sleep(Duration::from_millis(9800)).await;
    let events = drain(&mut events);
    assert_eq!(created_rounds(&events).len(), 2);

    for (idx, event) in events.iter().enumerate() {
        if let EventPayload::GameEnd { round_id, .. } = event {
            let stray = events[idx + 1..].iter().any(|e| {
                matches!(
                    e,
                    EventPayload::MultiplierUpdate { round_id: id, .. }
                        if id == round_id
                )
            });
            assert!(!stray, "multiplier update after GameEnd of {round_id}");
        }
    }
}

// ---------------------------------------------------------------------------
// Failure injection
// ---------------------------------------------------------------------------

/// Store wrapper that fails selected operations exactly once.
struct SabotageStore {
    inner: MemoryStore,
    fail_create_round: AtomicBool,
    fail_update_round: AtomicBool,
}

impl SabotageStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_create_round: AtomicBool::new(false),
            fail_update_round: AtomicBool::new(false),
        }
    }

    fn injected() -> StoreError {
        StoreError::Backend("injected failure".into())
    }
}

impl GameStore for SabotageStore {
    async fn fetch_user(
        &self,
        address: &UserAddress,
    ) -> Result<Option<User>, StoreError> {
        self.inner.fetch_user(address).await
    }

    async fn try_debit(
        &self,
        address: &UserAddress,
        amount: f64,
    ) -> Result<f64, StoreError> {
        self.inner.try_debit(address, amount).await
    }

    async fn credit(
        &self,
        address: &UserAddress,
        amount: f64,
    ) -> Result<f64, StoreError> {
        self.inner.credit(address, amount).await
    }

    async fn create_round(&self, target: f64) -> Result<Round, StoreError> {
        if self.fail_create_round.swap(false, Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.create_round(target).await
    }

    async fn update_round(&self, round: &Round) -> Result<(), StoreError> {
        if self.fail_update_round.swap(false, Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.update_round(round).await
    }

    async fn fetch_round(
        &self,
        id: RoundId,
    ) -> Result<Option<Round>, StoreError> {
        self.inner.fetch_round(id).await
    }

    async fn create_bet(&self, bet: NewBet) -> Result<Bet, StoreError> {
        self.inner.create_bet(bet).await
    }

    async fn fetch_bet(&self, id: BetId) -> Result<Option<Bet>, StoreError> {
        self.inner.fetch_bet(id).await
    }

    async fn activate_pending(
        &self,
        round_id: RoundId,
    ) -> Result<u64, StoreError> {
        self.inner.activate_pending(round_id).await
    }

    async fn settle_cashout(
        &self,
        id: BetId,
        multiplier: f64,
        payout: f64,
    ) -> Result<Bet, StoreError> {
        self.inner.settle_cashout(id, multiplier, payout).await
    }

    async fn mark_lost(&self, id: BetId) -> Result<Bet, StoreError> {
        self.inner.mark_lost(id).await
    }

    async fn bets_for_round(
        &self,
        round_id: RoundId,
        phases: &[BetPhase],
    ) -> Result<Vec<Bet>, StoreError> {
        self.inner.bets_for_round(round_id, phases).await
    }

    async fn auto_cashout_candidates(
        &self,
        round_id: RoundId,
        multiplier: f64,
    ) -> Result<Vec<Bet>, StoreError> {
        self.inner.auto_cashout_candidates(round_id, multiplier).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_round_creation_retries_after_intermission() {
    let store = Arc::new(SabotageStore::new());
    store.fail_create_round.store(true, Ordering::SeqCst);
    let handle = spawn_engine(store, fast_config(2.0));
    let mut events = handle.subscribe();

    // First creation fails immediately; while recovering there is no
    // round at all.
    sleep(Duration::from_millis(200)).await;
    let state = handle.game_state().await.unwrap();
    assert!(state.current_round.is_none());

    // Retry lands after one intermission (t+0.5 s).
    sleep(Duration::from_millis(1000)).await;
    let events = drain(&mut events);
    assert_eq!(created_rounds(&events).len(), 1);
    let state = handle.game_state().await.unwrap();
    assert!(state.current_round.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_failed_start_abandons_round_and_recovers() {
    let store = Arc::new(SabotageStore::new());
    store.inner.seed_user("0xA11CE", "alice", 100.0).await;
    store.fail_update_round.store(true, Ordering::SeqCst);
    let handle = spawn_engine(store.clone(), fast_config(2.0));
    let mut events = handle.subscribe();

    // Countdown runs t+0..3 s; the start transition at t+3 s fails and
    // the round is abandoned.
    sleep(Duration::from_millis(3200)).await;
    let err = handle
        .place_bet(UserAddress::new("0xA11CE"), 10.0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NoActiveRound));

    // Fresh round at t+3.5 s; it starts cleanly at t+6.5 s.
    sleep(Duration::from_millis(3800)).await;
    let events = drain(&mut events);

    let rounds = created_rounds(&events);
    assert_eq!(rounds.len(), 2);
    let abandoned = rounds[0].id;
    let recovered = rounds[1].id;
    assert_ne!(abandoned, recovered);

    let started: Vec<RoundId> = events
        .iter()
        .filter_map(|e| match e {
            EventPayload::GameStart(round) => Some(round.id),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![recovered], "abandoned round never starts");
    assert!(multipliers_for(&events, abandoned).is_empty());
}
