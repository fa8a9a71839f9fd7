//! Custody error types.
//!
//! Every error aborts the enclosing operation with no state change. Each
//! carries a machine-readable [`ErrorKind`] alongside its human-readable
//! `Display` reason.

use depot_core::{Address, TransferError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable error category.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotOwner,
    NotMainWallet,
    ZeroValueTransfer,
    EmptyBalance,
    EmptyTokenBalance,
    InsufficientBalance,
    InvalidCount,
    ZeroAddress,
    UnknownAccount,
    SelfTransfer,
    ExternalTransferFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors raised by a [`Forwarder`](crate::Forwarder).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForwarderError {
    /// Caller is not the forwarder's current parent.
    #[error("forwarder: caller {caller} is not the main wallet")]
    NotMainWallet { caller: Address },

    #[error("forwarder: zero value transfer")]
    ZeroValueTransfer,

    /// Nothing to sweep.
    #[error("forwarder: empty balance")]
    EmptyBalance,

    #[error("forwarder: empty token balance for {token}")]
    EmptyTokenBalance { token: Address },

    /// A parent must never be the zero address.
    #[error("forwarder: new parent is the zero address")]
    ZeroAddress,

    /// A forwarder cannot be its own parent.
    #[error("forwarder: new parent is the forwarder itself")]
    SelfParent,

    #[error("forwarder: external transfer failed: {0}")]
    ExternalTransferFailed(#[source] TransferError),
}

impl ForwarderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForwarderError::NotMainWallet { .. } => ErrorKind::NotMainWallet,
            ForwarderError::ZeroValueTransfer => ErrorKind::ZeroValueTransfer,
            ForwarderError::EmptyBalance => ErrorKind::EmptyBalance,
            ForwarderError::EmptyTokenBalance { .. } => ErrorKind::EmptyTokenBalance,
            ForwarderError::ZeroAddress => ErrorKind::ZeroAddress,
            ForwarderError::SelfParent => ErrorKind::SelfTransfer,
            ForwarderError::ExternalTransferFailed(_) => ErrorKind::ExternalTransferFailed,
        }
    }
}

/// Errors raised by a [`Wallet`](crate::Wallet).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Caller is not the wallet owner.
    #[error("main wallet: caller {caller} is not the owner")]
    NotOwner { caller: Address },

    #[error("main wallet: zero value transfer")]
    ZeroValueTransfer,

    #[error("main wallet: destination is the wallet itself")]
    SelfTransfer,

    /// Batch size outside `1..=max`.
    #[error("main wallet: invalid forwarder count {requested} (allowed 1..={max})")]
    InvalidCount { requested: u32, max: u32 },

    #[error("main wallet: insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },

    #[error("main wallet: empty token balance for {token}: have {have}, need {need}")]
    EmptyTokenBalance { token: Address, have: u64, need: u64 },

    /// Target address is not a forwarder instance.
    #[error("main wallet: {0} is not a forwarder")]
    UnknownForwarder(Address),

    #[error("main wallet: external transfer failed: {0}")]
    ExternalTransferFailed(#[source] TransferError),

    /// Failure inside a forwarder invoked by the wallet.
    #[error(transparent)]
    Forwarder(#[from] ForwarderError),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::NotOwner { .. } => ErrorKind::NotOwner,
            WalletError::ZeroValueTransfer => ErrorKind::ZeroValueTransfer,
            WalletError::SelfTransfer => ErrorKind::SelfTransfer,
            WalletError::InvalidCount { .. } => ErrorKind::InvalidCount,
            WalletError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            WalletError::EmptyTokenBalance { .. } => ErrorKind::EmptyTokenBalance,
            WalletError::UnknownForwarder(_) => ErrorKind::UnknownAccount,
            WalletError::ExternalTransferFailed(_) => ErrorKind::ExternalTransferFailed,
            WalletError::Forwarder(e) => e.kind(),
        }
    }
}

/// Top-level error returned by the execution environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error(transparent)]
    Forwarder(#[from] ForwarderError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// No wallet or forwarder lives at this address.
    #[error("unknown account: {0}")]
    UnknownAccount(Address),

    /// Deployments and parents require a non-zero address.
    #[error("zero address")]
    ZeroAddress,

    /// A transfer primitive failed outside any wallet or forwarder logic.
    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

impl CustodyError {
    /// Machine-readable category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CustodyError::Forwarder(e) => e.kind(),
            CustodyError::Wallet(e) => e.kind(),
            CustodyError::UnknownAccount(_) => ErrorKind::UnknownAccount,
            CustodyError::ZeroAddress => ErrorKind::ZeroAddress,
            CustodyError::Transfer(TransferError::InsufficientFunds { .. }) => {
                ErrorKind::InsufficientBalance
            }
            CustodyError::Transfer(_) => ErrorKind::ExternalTransferFailed,
        }
    }

    /// Human-readable reason.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// The transfer-primitive view of this error, for callers that only
    /// speak [`TransferError`].
    pub(crate) fn into_transfer_error(self, recipient: Address) -> TransferError {
        match self {
            CustodyError::Transfer(e) => e,
            _ => TransferError::Rejected(recipient),
        }
    }
}

/// Configuration loading and validation failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Snapshot persistence failures.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot config: {0}")]
    Config(#[from] ConfigError),

    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}
