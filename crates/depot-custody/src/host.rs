//! The environment a wallet or forwarder runs against.
//!
//! Wallet and forwarder logic never touch ledgers, the event log, or other
//! instances directly. Everything goes through a [`Host`], which the
//! in-memory [`Vm`](crate::chain::Vm) implements and which an adapter for a
//! real ledger could implement as well.

use depot_core::{Address, Event, TokenLedger, ValueTransfer};

use crate::config::CustodyConfig;
use crate::forwarder::Forwarder;

/// Capabilities available to custody instances while they execute.
pub trait Host: ValueTransfer + TokenLedger {
    /// Active configuration.
    fn config(&self) -> &CustodyConfig;

    /// Record `event` as emitted by `emitter`.
    fn emit(&mut self, emitter: Address, event: Event);

    /// Current state of the forwarder at `address`, if one exists.
    fn forwarder(&self, address: &Address) -> Option<Forwarder>;

    /// Persist an updated forwarder.
    fn store_forwarder(&mut self, forwarder: Forwarder);

    /// Deploy a new forwarder whose parent is `deployer`.
    fn spawn_forwarder(&mut self, deployer: &Address) -> Forwarder;
}
