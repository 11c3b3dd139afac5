//! The typed event envelope the engine broadcasts.
//!
//! Every lifecycle and ledger event travels as a [`GameEvent`]. The
//! JSON shape is `{ "type": ..., "data": ..., "timestamp": ... }` —
//! the format the client SDK already consumes, produced here by serde's
//! adjacent tagging plus a flattened envelope.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::types::{Bet, Round, RoundId};

/// The payload of a game event.
///
/// `#[serde(tag = "type", content = "data")]` produces adjacently
/// tagged JSON, e.g.
/// `{ "type": "MULTIPLIER_UPDATE", "data": { "round_id": 3, "multiplier": 1.4 } }`.
/// Variant names are SCREAMING_SNAKE_CASE on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    /// A new round exists and its countdown is about to begin.
    /// Carries the full round snapshot, crash point included.
    RoundCreated(Round),

    /// One countdown tick. `is_initial` is true only during the very
    /// first countdown after boot (clients show different copy).
    Countdown { seconds: u32, is_initial: bool },

    /// The round transitioned to Running; the multiplier is live.
    GameStart(Round),

    /// The live multiplier changed. Strictly non-decreasing within a
    /// round; never emitted after that round's `GameEnd`.
    MultiplierUpdate { round_id: RoundId, multiplier: f64 },

    /// The round crashed at its target.
    GameEnd { round_id: RoundId, final_multiplier: f64 },

    /// A bet was accepted during the countdown. Totals are the
    /// refreshed round aggregates for broadcast.
    BetPlaced {
        bet: Bet,
        total_players: usize,
        total_bet_amount: f64,
    },

    /// A bet settled at `multiplier`, either by the player or by its
    /// auto-cashout threshold.
    BetCashedOut {
        bet: Bet,
        payout: f64,
        multiplier: f64,
    },
}

/// A broadcast event: a payload plus the emission timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Unix milliseconds at emission.
    pub timestamp: u64,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl GameEvent {
    /// Wraps a payload with the current wall-clock timestamp.
    pub fn now(payload: EventPayload) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { timestamp, payload }
    }
}

// =========================================================================
// Tests
// =========================================================================
