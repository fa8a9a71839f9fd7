//! Scenario and adversarial test suite for Depot custody.
//!
//! The integration tests in this crate drive wallets and forwarders through
//! the in-memory chain, including hostile receivers that reenter it, and
//! check that authority and balance invariants hold throughout.

pub mod helpers;
