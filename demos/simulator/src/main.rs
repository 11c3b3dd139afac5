//! Headless crash-game simulator.
//!
//! Spawns the engine against an in-memory store, seeds a few players,
//! and lets simulated bettors play a handful of rounds: a cautious
//! player who always sets an auto-cashout, a daredevil who cashes out
//! by hand (or fails to), and a spectator who only watches the feed.
//!
//! Run with `RUST_LOG=info cargo run -p simulator`.

use std::sync::Arc;
use std::time::Duration;

use liftoff::prelude::*;
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ROUNDS: usize = 5;

#[tokio::main]
async fn main() -> Result<(), LiftoffError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    store.seed_user("0xCAFE", "cautious", 500.0).await;
    store.seed_user("0xDEAD", "daredevil", 500.0).await;

    let config = EngineConfig {
        countdown_secs: 5,
        intermission: Duration::from_millis(1500),
        ..EngineConfig::default()
    };
    let handle = spawn_engine(store.clone(), config);

    let feed = tokio::spawn(log_feed(handle.subscribe()));
    let cautious = tokio::spawn(cautious_bettor(handle.clone()));
    let daredevil = tokio::spawn(daredevil_bettor(handle.clone()));

    // Let the table run for a fixed number of rounds, then close it.
    let mut events = handle.subscribe();
    let mut finished = 0;
    while finished < ROUNDS {
        if let Ok(event) = events.recv().await
            && let EventPayload::GameEnd {
                round_id,
                final_multiplier,
            } = event.payload
        {
            finished += 1;
            info!(%round_id, final_multiplier, "round {finished}/{ROUNDS} done");
        }
    }

    handle.shutdown().await?;
    cautious.abort();
    daredevil.abort();
    feed.abort();

    for address in ["0xCAFE", "0xDEAD"] {
        let address = UserAddress::new(address);
        if let Some(balance) = store.balance_of(&address).await {
            info!(%address, balance, "final balance");
        }
    }
    Ok(())
}

/// Prints every broadcast event as structured log lines.
async fn log_feed(mut events: tokio::sync::broadcast::Receiver<GameEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match event.payload {
                EventPayload::RoundCreated(round) => {
                    info!(round_id = %round.id, "round created");
                }
                EventPayload::Countdown { seconds, .. } => {
                    info!(seconds, "countdown");
                }
                EventPayload::GameStart(round) => {
                    info!(round_id = %round.id, "liftoff");
                }
                EventPayload::MultiplierUpdate { multiplier, .. } => {
                    info!(multiplier, "climbing");
                }
                EventPayload::GameEnd {
                    round_id,
                    final_multiplier,
                } => {
                    info!(%round_id, final_multiplier, "crashed");
                }
                EventPayload::BetPlaced {
                    bet,
                    total_players,
                    total_bet_amount,
                } => {
                    info!(
                        bet_id = %bet.id,
                        user = %bet.user_address,
                        amount = bet.amount,
                        total_players,
                        total_bet_amount,
                        "bet placed"
                    );
                }
                EventPayload::BetCashedOut {
                    bet,
                    payout,
                    multiplier,
                } => {
                    info!(
                        bet_id = %bet.id,
                        user = %bet.user_address,
                        payout,
                        multiplier,
                        "cashed out"
                    );
                }
            },
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event feed lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Bets on every round with a randomized auto-cashout and lets the
/// engine do the rest.
async fn cautious_bettor(handle: EngineHandle) {
    let address = UserAddress::new("0xCAFE");
    let mut events = handle.subscribe();
    while let Ok(event) = events.recv().await {
        if !matches!(event.payload, EventPayload::RoundCreated(_)) {
            continue;
        }
        let (amount, threshold) = {
            let mut rng = rand::rng();
            (
                rng.random_range(5.0..25.0),
                rng.random_range(1.2..2.5),
            )
        };
        match handle
            .place_bet(address.clone(), round2(amount), Some(round2(threshold)))
            .await
        {
            Ok(receipt) => info!(bet_id = %receipt.bet.id, threshold, "cautious bet in"),
            Err(err) => warn!(%err, "cautious bet rejected"),
        }
    }
}

/// Bets without a safety net and mashes the cashout button once the
/// multiplier clears a per-round target. Sometimes the crash wins.
async fn daredevil_bettor(handle: EngineHandle) {
    let address = UserAddress::new("0xDEAD");
    let mut events = handle.subscribe();
    let mut open_bet: Option<(BetId, f64)> = None;
    while let Ok(event) = events.recv().await {
        match event.payload {
            EventPayload::RoundCreated(_) => {
                let (amount, target) = {
                    let mut rng = rand::rng();
                    (rng.random_range(5.0..50.0), rng.random_range(1.5..5.0))
                };
                match handle.place_bet(address.clone(), round2(amount), None).await {
                    Ok(receipt) => open_bet = Some((receipt.bet.id, target)),
                    Err(err) => warn!(%err, "daredevil bet rejected"),
                }
            }
            EventPayload::MultiplierUpdate { multiplier, .. } => {
                if let Some((bet_id, target)) = open_bet
                    && multiplier >= target
                {
                    open_bet = None;
                    match handle.cashout(address.clone(), bet_id).await {
                        Ok(receipt) => {
                            info!(payout = receipt.payout, "daredevil bailed in time")
                        }
                        Err(err) => warn!(%err, "cashout refused"),
                    }
                }
            }
            EventPayload::GameEnd { .. } => {
                if open_bet.take().is_some() {
                    info!("daredevil rode it into the ground");
                }
            }
            _ => {}
        }
    }
}
