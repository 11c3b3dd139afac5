//! Core records and their phase state machines.
//!
//! Multipliers and balances are 2-decimal floats end to end, matching
//! the wire format clients render. [`round2`] is applied at every point
//! a value is persisted or emitted — never compare raw tick math
//! against a stored value without it.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a round (one countdown-to-crash cycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(pub u64);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// A unique identifier for a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BetId(pub u64);

impl fmt::Display for BetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B-{}", self.0)
    }
}

/// A unique identifier for a user row in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A user's external wallet address.
///
/// The engine trusts the address it is given — mapping a connection to
/// an address is the transport layer's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserAddress(pub String);

impl UserAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round to 2 decimal places, the precision of every multiplier and
/// money amount on the wire.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// RoundPhase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a round.
///
/// Transitions are strictly ordered — no skipping phases:
///
/// ```text
/// Countdown → Running → Completed
/// ```
///
/// - **Countdown**: the round exists and is accepting bets. A fixed
///   per-second timer counts down to start.
/// - **Running**: the multiplier is rising. Bets can cash out but no
///   new bets are accepted — this is the fairness boundary of the game.
/// - **Completed**: the multiplier hit the crash point. All remaining
///   active bets have lost.
/// - **Cancelled**: reserved for operational intervention. The engine
///   never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    Countdown,
    Running,
    Completed,
    Cancelled,
}

impl RoundPhase {
    /// Returns `true` if the round is accepting new bets.
    pub fn accepts_bets(&self) -> bool {
        matches!(self, Self::Countdown)
    }

    /// Returns `true` if the round is live (counting down or running).
    /// Exactly one round is active at any time.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Countdown | Self::Running)
    }

    /// Returns `true` if the round has reached a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The next phase in the normal lifecycle, or `None` from a
    /// terminal phase.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Countdown => Some(Self::Running),
            Self::Running => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }

    /// Returns `true` if transitioning to `target` is legal.
    pub fn can_transition_to(self, target: Self) -> bool {
        // Cancellation is allowed from any live phase.
        if target == Self::Cancelled {
            return self.is_active();
        }
        self.next() == Some(target)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Countdown => write!(f, "COUNTDOWN"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ---------------------------------------------------------------------------
// BetPhase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a bet.
///
/// ```text
/// Pending → Active → CashedOut
///                  ↘ Lost
/// ```
///
/// `CashedOut` and `Lost` are terminal and mutually exclusive: a bet
/// that cashed out can never be marked lost and vice versa. `Won`
/// exists in the stored data model but the engine never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetPhase {
    Pending,
    Active,
    CashedOut,
    Lost,
    Won,
}

impl BetPhase {
    /// Returns `true` if the bet is still in play (counts toward the
    /// round's player/stake totals).
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Returns `true` if the bet can be settled (cashed out or lost).
    pub fn is_settleable(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` if the bet has reached a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CashedOut | Self::Lost | Self::Won)
    }

    /// Returns `true` if transitioning to `target` is legal.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Pending, Self::Active) => true,
            (Self::Active, Self::CashedOut | Self::Lost) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BetPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Active => write!(f, "ACTIVE"),
            Self::CashedOut => write!(f, "CASHED_OUT"),
            Self::Lost => write!(f, "LOST"),
            Self::Won => write!(f, "WON"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A round row. Created by the engine at boot and after each
/// completion; mutated by the engine only; never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    /// The crash point, fixed at creation. Drawn uniformly from the
    /// configured range and rounded to 2 decimals. Included in round
    /// snapshots — no fairness scheme hides it; clients may simply
    /// choose not to render it before the crash.
    pub target_multiplier: f64,
    /// The live multiplier. 1.0 at creation, monotonically
    /// non-decreasing while the round is running.
    pub current_multiplier: f64,
    pub phase: RoundPhase,
    /// Unix milliseconds, set when the round starts running.
    pub start_time: Option<u64>,
    /// Unix milliseconds, set at completion.
    pub end_time: Option<u64>,
    /// Copy of `target_multiplier`, set at completion.
    pub final_multiplier: Option<f64>,
}

impl Round {
    /// Returns `true` if this round is the active one (countdown or
    /// running).
    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }
}

/// A bet row. The owning user is denormalized (id, address, display
/// name) so snapshots need no join. `round_id` never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    pub user_address: UserAddress,
    pub user_name: String,
    /// The stake. Always > 0.
    pub amount: f64,
    /// Multiplier at or above which the bet self-settles without
    /// client interaction. `None` means manual cashout only.
    pub auto_cashout: Option<f64>,
    pub round_id: RoundId,
    pub phase: BetPhase,
    /// Settlement price. Set only when the bet cashes out.
    pub multiplier_at_cashout: Option<f64>,
    /// `amount * multiplier_at_cashout`. Set only when the bet cashes out.
    pub payout: Option<f64>,
}

/// A user row as the engine sees it. The balance is owned by the
/// external user store; the ledger only debits and credits it through
/// the store's atomic operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub address: UserAddress,
    pub name: String,
    pub balance: f64,
}

// ---------------------------------------------------------------------------
// GameState snapshot
// ---------------------------------------------------------------------------

/// The on-demand snapshot served to clients as a reconciliation
/// fallback alongside push events.
///
/// Pure data — calling for it has no side effects, so it is safe to
/// request at arbitrary frequency. Field names are camelCase on the
/// wire to match what clients already consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// The current round, or `None` before the first round exists.
    pub current_round: Option<Round>,
    /// Seconds remaining in the countdown. Engine-local; never persisted.
    pub countdown: u32,
    /// Whether this is the very first countdown since boot (affects
    /// client copy only).
    pub is_initial_countdown: bool,
    /// All Pending or Active bets for the current round.
    pub active_bets: Vec<Bet>,
    /// Count of `active_bets`.
    pub total_players: usize,
    /// Sum of `active_bets` amounts.
    pub total_bet_amount: f64,
}

impl GameState {
    /// An empty snapshot for when no round exists yet.
    pub fn empty() -> Self {
        Self {
            current_round: None,
            countdown: 0,
            is_initial_countdown: true,
            active_bets: Vec::new(),
            total_players: 0,
            total_bet_amount: 0.0,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_half_up() {
        assert_eq!(round2(1.006), 1.01);
        assert_eq!(round2(1.004), 1.0);
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round2(6.999), 7.0);
        assert_eq!(round2(1.0), 1.0);
    }

    #[test]
    fn test_round_phase_next_follows_strict_order() {
        assert_eq!(RoundPhase::Countdown.next(), Some(RoundPhase::Running));
        assert_eq!(RoundPhase::Running.next(), Some(RoundPhase::Completed));
        assert_eq!(RoundPhase::Completed.next(), None);
        assert_eq!(RoundPhase::Cancelled.next(), None);
    }

    #[test]
    fn test_round_phase_can_transition_to() {
        assert!(RoundPhase::Countdown.can_transition_to(RoundPhase::Running));
        assert!(!RoundPhase::Countdown.can_transition_to(RoundPhase::Completed));
        assert!(RoundPhase::Running.can_transition_to(RoundPhase::Completed));
        assert!(!RoundPhase::Completed.can_transition_to(RoundPhase::Countdown));
        // Cancellation only from live phases.
        assert!(RoundPhase::Countdown.can_transition_to(RoundPhase::Cancelled));
        assert!(RoundPhase::Running.can_transition_to(RoundPhase::Cancelled));
        assert!(!RoundPhase::Completed.can_transition_to(RoundPhase::Cancelled));
    }

    #[test]
    fn test_round_phase_accepts_bets_only_in_countdown() {
        assert!(RoundPhase::Countdown.accepts_bets());
        assert!(!RoundPhase::Running.accepts_bets());
        assert!(!RoundPhase::Completed.accepts_bets());
        assert!(!RoundPhase::Cancelled.accepts_bets());
    }

    #[test]
    fn test_round_phase_is_active() {
        assert!(RoundPhase::Countdown.is_active());
        assert!(RoundPhase::Running.is_active());
        assert!(!RoundPhase::Completed.is_active());
        assert!(!RoundPhase::Cancelled.is_active());
    }

    #[test]
    fn test_bet_phase_transitions_are_exclusive_and_terminal() {
        assert!(BetPhase::Pending.can_transition_to(BetPhase::Active));
        assert!(BetPhase::Active.can_transition_to(BetPhase::CashedOut));
        assert!(BetPhase::Active.can_transition_to(BetPhase::Lost));
        // Terminal phases never move again.
        assert!(!BetPhase::CashedOut.can_transition_to(BetPhase::Lost));
        assert!(!BetPhase::Lost.can_transition_to(BetPhase::CashedOut));
        assert!(!BetPhase::Pending.can_transition_to(BetPhase::CashedOut));
        assert!(!BetPhase::Pending.can_transition_to(BetPhase::Lost));
    }

    #[test]
    fn test_bet_phase_is_open() {
        assert!(BetPhase::Pending.is_open());
        assert!(BetPhase::Active.is_open());
        assert!(!BetPhase::CashedOut.is_open());
        assert!(!BetPhase::Lost.is_open());
    }

    #[test]
    fn test_phase_serializes_screaming_snake_case() {
        // Clients switch on these exact strings.
        let json = serde_json::to_string(&RoundPhase::Countdown).unwrap();
        assert_eq!(json, "\"COUNTDOWN\"");
        let json = serde_json::to_string(&BetPhase::CashedOut).unwrap();
        assert_eq!(json, "\"CASHED_OUT\"");
    }

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&RoundId(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&BetId(42)).unwrap(), "42");
        let rid: RoundId = serde_json::from_str("7").unwrap();
        assert_eq!(rid, RoundId(7));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(RoundId(3).to_string(), "R-3");
        assert_eq!(BetId(9).to_string(), "B-9");
        assert_eq!(UserId(1).to_string(), "U-1");
        assert_eq!(UserAddress::new("0xabc").to_string(), "0xabc");
    }

    #[test]
    fn test_game_state_serializes_camel_case() {
        let json = serde_json::to_value(GameState::empty()).unwrap();
        assert!(json.get("currentRound").is_some());
        assert!(json.get("isInitialCountdown").is_some());
        assert_eq!(json["totalPlayers"], 0);
        assert_eq!(json["totalBetAmount"], 0.0);
    }
}
