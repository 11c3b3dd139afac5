//! The persistence seam for the Liftoff engine.
//!
//! The engine and ledger never touch a database directly — they consume
//! the [`GameStore`] trait. Any store that satisfies the contract
//! (relational, document, or the bundled [`MemoryStore`]) works.
//!
//! Two operations carry more than plain CRUD semantics, and they are
//! the load-bearing ones:
//!
//! - [`GameStore::try_debit`] — atomic check-and-decrement of a user
//!   balance. Concurrent debits of the same user can never both read
//!   the same balance and lose an update.
//! - [`GameStore::settle_cashout`] — compare-and-set Active→CashedOut.
//!   Of two concurrent cashouts of the same bet, exactly one wins.

mod error;
mod memory;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{GameStore, NewBet};
