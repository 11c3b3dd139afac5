//! The round engine actor: an isolated Tokio task that owns the one
//! active round and everything that happens to it.
//!
//! Commands arrive on an mpsc channel; timers arrive through a
//! [`PhaseClock`] that holds exactly one armed timer at a time. Both
//! feed one `tokio::select!` loop, so every ledger mutation and every
//! phase transition is applied in a single serialized stream and
//! balance updates never interleave.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use liftoff_clock::{ClockTick, PhaseClock};
use liftoff_model::{
    Bet, BetId, BetPhase, EventPayload, GameEvent, GameState, Round,
    RoundId, RoundPhase, UserAddress, round2,
};
use liftoff_store::GameStore;
use rand::Rng;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::ledger::Ledger;
use crate::{EngineConfig, GameError};

/// Command channel size. Bounded so a flood of bets applies
/// backpressure instead of growing memory.
const DEFAULT_CHANNEL_SIZE: usize = 64;

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Reply to a successful bet placement, with the refreshed round
/// aggregates for broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct BetReceipt {
    pub bet: Bet,
    pub total_players: usize,
    pub total_bet_amount: f64,
}

/// Reply to a successful cashout.
#[derive(Debug, Clone, Serialize)]
pub struct CashoutReceipt {
    pub bet: Bet,
    pub payout: f64,
    pub multiplier: f64,
}

// ---------------------------------------------------------------------------
// Commands and handle
// ---------------------------------------------------------------------------

/// Commands sent to the engine actor. The `oneshot::Sender` in each
/// variant is the reply channel the caller waits on.
enum EngineCommand {
    PlaceBet {
        address: UserAddress,
        amount: f64,
        auto_cashout: Option<f64>,
        reply: oneshot::Sender<Result<BetReceipt, GameError>>,
    },
    Cashout {
        address: UserAddress,
        bet_id: BetId,
        reply: oneshot::Sender<Result<CashoutReceipt, GameError>>,
    },
    GetState {
        reply: oneshot::Sender<Result<GameState, GameError>>,
    },
    Shutdown,
}

/// Handle to a running engine actor. Cheap to clone — an
/// `mpsc::Sender` plus the event bus sender.
///
/// This is the entire inbound surface the transport layer gets:
/// `place_bet`, `cashout`, `game_state`, plus `subscribe` for the
/// push-event stream. Authentication (mapping a connection to a user
/// address) is the transport layer's job; the engine trusts the
/// address it is given.
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineCommand>,
    events: broadcast::Sender<GameEvent>,
}

impl EngineHandle {
    /// Places a bet for `address` on the current round.
    ///
    /// Fails unless a round exists and is in its countdown — once the
    /// round is running there are no late entries.
    pub async fn place_bet(
        &self,
        address: UserAddress,
        amount: f64,
        auto_cashout: Option<f64>,
    ) -> Result<BetReceipt, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::PlaceBet {
                address,
                amount,
                auto_cashout,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::EngineUnavailable)?;
        reply_rx.await.map_err(|_| GameError::EngineUnavailable)?
    }

    /// Cashes out an active bet at the round's current multiplier.
    pub async fn cashout(
        &self,
        address: UserAddress,
        bet_id: BetId,
    ) -> Result<CashoutReceipt, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::Cashout {
                address,
                bet_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::EngineUnavailable)?;
        reply_rx.await.map_err(|_| GameError::EngineUnavailable)?
    }

    /// Snapshot of the current round, countdown, and open bets.
    /// Pure read — safe to call at arbitrary frequency.
    pub async fn game_state(&self) -> Result<GameState, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::GetState { reply: reply_tx })
            .await
            .map_err(|_| GameError::EngineUnavailable)?;
        reply_rx.await.map_err(|_| GameError::EngineUnavailable)?
    }

    /// Subscribes to the event bus. Events emitted before this call
    /// are not replayed; pair with [`game_state`](Self::game_state)
    /// for reconciliation.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Tells the engine to stop after the current command or tick.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.sender
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| GameError::EngineUnavailable)
    }
}

/// Spawns the engine actor and returns a handle to it.
///
/// The actor creates its first round immediately (the initial
/// countdown) and then runs rounds back to back until shut down.
pub fn spawn_engine<S: GameStore>(
    store: Arc<S>,
    config: EngineConfig,
) -> EngineHandle {
    let config = config.validated();
    let (cmd_tx, cmd_rx) = mpsc::channel(DEFAULT_CHANNEL_SIZE);
    let (event_tx, _) = broadcast::channel(config.event_capacity);

    let actor = EngineActor {
        ledger: Ledger::new(store.clone()),
        store,
        config,
        round: None,
        countdown: 0,
        is_initial: true,
        running_since: None,
        grace_logged: false,
        clock: PhaseClock::idle(),
        receiver: cmd_rx,
        events: event_tx.clone(),
    };
    tokio::spawn(actor.run());

    EngineHandle {
        sender: cmd_tx,
        events: event_tx,
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct EngineActor<S: GameStore> {
    store: Arc<S>,
    ledger: Ledger<S>,
    config: EngineConfig,
    /// The one current round. `None` only before the first round
    /// exists or after a failed transition abandoned one.
    round: Option<Round>,
    /// Seconds left in the countdown. Engine-local, never persisted.
    countdown: u32,
    /// True until the first round starts running.
    is_initial: bool,
    /// When the round entered Running, for multiplier math.
    running_since: Option<Instant>,
    grace_logged: bool,
    clock: PhaseClock,
    receiver: mpsc::Receiver<EngineCommand>,
    events: broadcast::Sender<GameEvent>,
}

impl<S: GameStore> EngineActor<S> {
    async fn run(mut self) {
        info!("round engine started");
        self.begin_round().await;

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(EngineCommand::Shutdown) | None => {
                        info!("round engine shutting down");
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                },
                tick = self.clock.tick() => self.handle_tick(tick).await,
            }
        }

        info!("round engine stopped");
    }

    async fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::PlaceBet {
                address,
                amount,
                auto_cashout,
                reply,
            } => {
                let result = self.place_bet(address, amount, auto_cashout).await;
                let _ = reply.send(result);
            }
            EngineCommand::Cashout {
                address,
                bet_id,
                reply,
            } => {
                let result = self.interactive_cashout(address, bet_id).await;
                let _ = reply.send(result);
            }
            EngineCommand::GetState { reply } => {
                let _ = reply.send(self.snapshot().await);
            }
            EngineCommand::Shutdown => unreachable!("handled in run()"),
        }
    }

    async fn handle_tick(&mut self, tick: ClockTick) {
        match tick {
            ClockTick::Countdown => self.countdown_tick().await,
            ClockTick::Multiplier => self.multiplier_tick().await,
            ClockTick::IntermissionOver => self.begin_round().await,
        }
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Creates the next round and starts its countdown.
    ///
    /// On a store failure the engine arms the intermission timer and
    /// tries again — it never stalls with no round scheduled.
    async fn begin_round(&mut self) {
        let target = self.draw_target();
        let round = match self.store.create_round(target).await {
            Ok(round) => round,
            Err(err) => {
                error!(error = %err, "failed to create round — retrying after intermission");
                self.round = None;
                self.clock = PhaseClock::intermission(self.config.intermission);
                return;
            }
        };

        info!(round_id = %round.id, target, "round created");
        self.countdown = self.config.countdown_secs;
        self.running_since = None;
        self.emit(EventPayload::RoundCreated(round.clone()));
        self.emit(EventPayload::Countdown {
            seconds: self.countdown,
            is_initial: self.is_initial,
        });
        self.round = Some(round);
        self.clock = PhaseClock::countdown(Duration::from_secs(1));
    }

    async fn countdown_tick(&mut self) {
        self.countdown = self.countdown.saturating_sub(1);
        self.emit(EventPayload::Countdown {
            seconds: self.countdown,
            is_initial: self.is_initial,
        });
        if self.countdown == 0 {
            self.start_round().await;
        }
    }

    /// Countdown reached zero: persist the transition to Running,
    /// activate the round's pending bets, and start the multiplier.
    async fn start_round(&mut self) {
        let Some(round) = self.round.as_mut() else {
            // Countdown without a round means an earlier transition
            // already abandoned it.
            self.clock = PhaseClock::intermission(self.config.intermission);
            return;
        };

        round.phase = RoundPhase::Running;
        round.start_time = Some(now_ms());
        if let Err(err) = self.store.update_round(round).await {
            // The countdown timer that drove this transition is
            // already consumed; abandon the round and recover with a
            // fresh one after the intermission.
            error!(
                round_id = %round.id,
                error = %err,
                "failed to persist round start — abandoning round"
            );
            self.abandon_round();
            return;
        }

        let round = round.clone();
        self.is_initial = false;

        // One pass flips every Pending bet to Active. Bets placed
        // during the countdown's final second are included — commands
        // and ticks are serialized, so no bet can slip between this
        // sweep and the phase change.
        match self.store.activate_pending(round.id).await {
            Ok(activated) => {
                info!(round_id = %round.id, activated, "round started");
            }
            Err(err) => {
                error!(
                    round_id = %round.id,
                    error = %err,
                    "failed to activate pending bets"
                );
            }
        }

        self.emit(EventPayload::GameStart(round.clone()));
        self.running_since = Some(Instant::now());
        self.grace_logged = false;
        self.clock = PhaseClock::running(self.config.tick_period);
        // Clients see the multiplier at 1.00 the instant the round is
        // live, before the first interval tick.
        self.apply_multiplier(1.0).await;
    }

    async fn multiplier_tick(&mut self) {
        let Some(round) = self.round.clone() else {
            return;
        };
        let Some(started) = self.running_since else {
            return;
        };

        let elapsed = started.elapsed();
        if elapsed <= self.config.grace_period {
            // Hold at 1.00× so late-binding clients see the start.
            if !self.grace_logged {
                debug!(round_id = %round.id, "grace period — holding at 1.00");
                self.grace_logged = true;
            }
            self.apply_multiplier(1.0).await;
            return;
        }

        let animation_secs =
            (elapsed - self.config.grace_period).as_secs_f64();
        let value = 1.0 + self.config.multiplier_rate * animation_secs;
        let capped = round2(value.min(round.target_multiplier));
        self.apply_multiplier(capped).await;

        // The uncapped value decides completion, so a crash exactly at
        // the target still ends the round on this tick.
        if value >= round.target_multiplier {
            self.complete_round().await;
        }
    }

    /// Persists and emits a new multiplier value, then runs the
    /// auto-cashout sweep against it.
    ///
    /// A failed persist skips this tick's emit and sweep; the next
    /// tick recomputes from elapsed time, so progression continues.
    async fn apply_multiplier(&mut self, value: f64) {
        let Some(round) = self.round.as_mut() else {
            return;
        };

        let previous = round.current_multiplier;
        round.current_multiplier = value;
        if let Err(err) = self.store.update_round(round).await {
            round.current_multiplier = previous;
            error!(
                round_id = %round.id,
                multiplier = value,
                error = %err,
                "failed to persist multiplier — skipping tick"
            );
            return;
        }

        let round_id = round.id;
        self.emit(EventPayload::MultiplierUpdate {
            round_id,
            multiplier: value,
        });
        self.auto_cashout_sweep(round_id, value).await;
    }

    /// Settles every active bet whose threshold the new multiplier
    /// reached, each independently: one failed settlement is skipped,
    /// not fatal to the rest of the sweep.
    async fn auto_cashout_sweep(&mut self, round_id: RoundId, multiplier: f64) {
        let candidates = match self
            .store
            .auto_cashout_candidates(round_id, multiplier)
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                error!(
                    round_id = %round_id,
                    error = %err,
                    "failed to fetch auto-cashout candidates"
                );
                return;
            }
        };

        let Some(round) = self.round.clone() else {
            return;
        };
        for bet in candidates {
            // Settlement price is the triggering multiplier, not a
            // re-read of "current" — no race with in-flight updates.
            match self
                .ledger
                .cashout(&round, &bet.user_address, bet.id, multiplier)
                .await
            {
                Ok(settlement) => {
                    self.emit(EventPayload::BetCashedOut {
                        bet: settlement.bet,
                        payout: settlement.payout,
                        multiplier: settlement.multiplier,
                    });
                }
                Err(err) => {
                    warn!(
                        bet_id = %bet.id,
                        error = %err,
                        "auto-cashout settlement failed — skipping bet"
                    );
                }
            }
        }
    }

    /// The multiplier reached the target: crash. Persist completion,
    /// sweep the losers, and schedule the next round.
    async fn complete_round(&mut self) {
        let Some(round) = self.round.as_mut() else {
            return;
        };

        let final_multiplier = round.target_multiplier;
        round.phase = RoundPhase::Completed;
        round.end_time = Some(now_ms());
        round.final_multiplier = Some(final_multiplier);
        round.current_multiplier = final_multiplier;
        if let Err(err) = self.store.update_round(round).await {
            // Keep going: the loser sweep and the next round matter
            // more than this row's final fields.
            error!(
                round_id = %round.id,
                error = %err,
                "failed to persist round completion"
            );
        }
        let round_id = round.id;

        // Qualifying auto-cashouts settled on the final tick's sweep;
        // everything still active rode past the crash and lost.
        match self
            .store
            .bets_for_round(round_id, &[BetPhase::Active])
            .await
        {
            Ok(losers) => {
                for bet in &losers {
                    if let Err(err) = self.store.mark_lost(bet.id).await {
                        warn!(bet_id = %bet.id, error = %err, "failed to mark bet lost");
                    }
                }
                info!(
                    round_id = %round_id,
                    final_multiplier,
                    losers = losers.len(),
                    "round completed"
                );
            }
            Err(err) => {
                error!(
                    round_id = %round_id,
                    error = %err,
                    "failed to fetch remaining bets for loser sweep"
                );
            }
        }

        self.emit(EventPayload::GameEnd {
            round_id,
            final_multiplier,
        });
        self.running_since = None;
        self.clock = PhaseClock::intermission(self.config.intermission);
    }

    fn abandon_round(&mut self) {
        self.round = None;
        self.running_since = None;
        self.clock = PhaseClock::intermission(self.config.intermission);
    }

    // -- Ledger entry points ------------------------------------------------

    async fn place_bet(
        &mut self,
        address: UserAddress,
        amount: f64,
        auto_cashout: Option<f64>,
    ) -> Result<BetReceipt, GameError> {
        let round = self.round.as_ref().ok_or(GameError::NoActiveRound)?;
        if !round.phase.accepts_bets() {
            return Err(GameError::BetsClosed(round.id));
        }
        let round = round.clone();

        let bet = self
            .ledger
            .place(&round, address, amount, auto_cashout)
            .await?;
        let (total_players, total_bet_amount) =
            self.round_totals(round.id).await?;

        self.emit(EventPayload::BetPlaced {
            bet: bet.clone(),
            total_players,
            total_bet_amount,
        });
        Ok(BetReceipt {
            bet,
            total_players,
            total_bet_amount,
        })
    }

    async fn interactive_cashout(
        &mut self,
        address: UserAddress,
        bet_id: BetId,
    ) -> Result<CashoutReceipt, GameError> {
        let round = self.round.as_ref().ok_or(GameError::NoActiveRound)?;
        if round.phase != RoundPhase::Running {
            return Err(GameError::NotRunning(round.id));
        }
        let round = round.clone();

        // Interactive path settles at the current value.
        let multiplier = round.current_multiplier;
        let settlement = self
            .ledger
            .cashout(&round, &address, bet_id, multiplier)
            .await?;

        self.emit(EventPayload::BetCashedOut {
            bet: settlement.bet.clone(),
            payout: settlement.payout,
            multiplier: settlement.multiplier,
        });
        Ok(CashoutReceipt {
            bet: settlement.bet,
            payout: settlement.payout,
            multiplier: settlement.multiplier,
        })
    }

    async fn snapshot(&self) -> Result<GameState, GameError> {
        let Some(round) = &self.round else {
            return Ok(GameState::empty());
        };

        let active_bets = self
            .store
            .bets_for_round(round.id, &[BetPhase::Pending, BetPhase::Active])
            .await?;
        let total_bet_amount =
            round2(active_bets.iter().map(|b| b.amount).sum());
        Ok(GameState {
            current_round: Some(round.clone()),
            countdown: self.countdown,
            is_initial_countdown: self.is_initial,
            total_players: active_bets.len(),
            total_bet_amount,
            active_bets,
        })
    }

    async fn round_totals(
        &self,
        round_id: RoundId,
    ) -> Result<(usize, f64), GameError> {
        let open = self
            .store
            .bets_for_round(round_id, &[BetPhase::Pending, BetPhase::Active])
            .await?;
        let total = round2(open.iter().map(|b| b.amount).sum());
        Ok((open.len(), total))
    }

    // -- Helpers ------------------------------------------------------------

    fn draw_target(&self) -> f64 {
        let target = match self.config.fixed_target {
            Some(target) => target.max(self.config.min_target),
            None => rand::rng()
                .random_range(self.config.min_target..self.config.max_target),
        };
        round2(target)
    }

    /// Publishes an event. Send only fails when nobody is subscribed,
    /// which is fine — the snapshot endpoint covers reconciliation.
    fn emit(&self, payload: EventPayload) {
        let _ = self.events.send(GameEvent::now(payload));
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
