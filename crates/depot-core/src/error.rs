//! Error types shared across Depot crates.
use thiserror::Error;

use crate::address::Address;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address length: {0} hex chars, expected 40")] InvalidLength(usize),
    #[error("invalid hex: {0}")] InvalidHex(String),
}

/// Failures reported by the value and token transfer primitives.
///
/// None of these are fatal to the caller: an enclosing operation decides
/// whether to propagate the failure or absorb it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds: have {have}, need {need}")] InsufficientFunds { have: u64, need: u64 },
    #[error("recipient {0} rejected the transfer")] Rejected(Address),
    #[error("out of budget: receive needs {needed}, {available} forwarded")] OutOfBudget { needed: u64, available: u64 },
    #[error("unknown token: {0}")] UnknownToken(Address),
    #[error("token {0} is paused")] TokenPaused(Address),
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: u64, need: u64 },
    #[error("call depth exceeded: {0}")] CallDepthExceeded(usize),
    #[error("balance overflow")] BalanceOverflow,
}
