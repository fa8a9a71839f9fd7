//! # depot-custody
//! Wallet and forwarder custody state machine for Depot.
//!
//! A [`Wallet`] hands out [`Forwarder`] deposit addresses; forwarders sweep
//! what they receive to their parent. Both run against a [`Host`], which the
//! in-memory [`Chain`] provides together with all-or-nothing call frames,
//! receive hooks for external accounts, and JSON snapshots.

pub mod call;
pub mod chain;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod host;
pub mod shared;
pub mod snapshot;
pub mod wallet;

pub use call::{Call, Outcome, Receipt};
pub use chain::{Chain, ReceiveHook, State, Vm};
pub use config::{CustodyConfig, ForwardPolicy};
pub use error::{ConfigError, CustodyError, ErrorKind, ForwarderError, SnapshotError, WalletError};
pub use forwarder::Forwarder;
pub use host::Host;
pub use shared::SharedChain;
pub use snapshot::Snapshot;
pub use wallet::Wallet;
