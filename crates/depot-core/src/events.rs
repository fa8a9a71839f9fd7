//! Observable events emitted by wallets and forwarders.
//!
//! Field order within each variant matches the published event signatures:
//!
//! | Event | Emitted by | Fields |
//! |---|---|---|
//! | `Deposited` | Wallet, Forwarder | (sender, amount) |
//! | `ForwarderDeposited` | Forwarder | (sender, amount) |
//! | `ForwarderCreated` | Wallet | (forwarder_address) |
//! | `TokensCollected` | Forwarder | (token_address, amount) |
//! | `Transacted` | Wallet | (destination, amount) |
//! | `TransactedToken` | Wallet | (destination, amount, token_address) |
//! | `Collected` | Forwarder | (destination, amount) |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;

/// A single event payload.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum Event {
    Deposited {
        sender: Address,
        amount: u64,
    },
    ForwarderDeposited {
        sender: Address,
        amount: u64,
    },
    ForwarderCreated {
        forwarder_address: Address,
    },
    TokensCollected {
        token_address: Address,
        amount: u64,
    },
    Transacted {
        destination: Address,
        amount: u64,
    },
    TransactedToken {
        destination: Address,
        amount: u64,
        token_address: Address,
    },
    Collected {
        destination: Address,
        amount: u64,
    },
}

impl Event {
    /// Event name as published.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Deposited { .. } => "Deposited",
            Event::ForwarderDeposited { .. } => "ForwarderDeposited",
            Event::ForwarderCreated { .. } => "ForwarderCreated",
            Event::TokensCollected { .. } => "TokensCollected",
            Event::Transacted { .. } => "Transacted",
            Event::TransactedToken { .. } => "TransactedToken",
            Event::Collected { .. } => "Collected",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Deposited { sender, amount } => write!(f, "Deposited({sender}, {amount})"),
            Event::ForwarderDeposited { sender, amount } => {
                write!(f, "ForwarderDeposited({sender}, {amount})")
            }
            Event::ForwarderCreated { forwarder_address } => {
                write!(f, "ForwarderCreated({forwarder_address})")
            }
            Event::TokensCollected {
                token_address,
                amount,
            } => write!(f, "TokensCollected({token_address}, {amount})"),
            Event::Transacted {
                destination,
                amount,
            } => write!(f, "Transacted({destination}, {amount})"),
            Event::TransactedToken {
                destination,
                amount,
                token_address,
            } => write!(f, "TransactedToken({destination}, {amount}, {token_address})"),
            Event::Collected {
                destination,
                amount,
            } => write!(f, "Collected({destination}, {amount})"),
        }
    }
}

/// An event together with the address of the instance that emitted it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub emitter: Address,
    #[serde(flatten)]
    pub event: Event,
}

/// Append-only event log.
///
/// Call frames remember [`len`](EventLog::len) on entry and
/// [`truncate`](EventLog::truncate) back to it when they fail, so events
/// from a reverted frame are never observable.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `event` as emitted by `emitter`.
    pub fn emit(&mut self, emitter: Address, event: Event) {
        self.entries.push(LogEntry { emitter, event });
    }

    /// All entries in emission order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries emitted by `emitter`, in order.
    pub fn by_emitter<'a>(&'a self, emitter: &'a Address) -> impl Iterator<Item = &'a Event> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.emitter == *emitter)
            .map(|e| &e.event)
    }

    /// Entries starting at index `from`.
    pub fn since(&self, from: usize) -> &[LogEntry] {
        &self.entries[from.min(self.entries.len())..]
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry at or after index `len`.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }
}
