//! Collaborator interfaces consumed by the custody state machine.
//!
//! - [`ValueTransfer`]: moves native currency between accounts
//! - [`TokenLedger`]: fungible-token balances, transfers and allowances
//!
//! Both report failure as a [`TransferError`] value. Callers decide whether a
//! failure aborts their operation or is absorbed; the primitives never panic
//! on ordinary failures.

use crate::address::Address;
use crate::error::TransferError;
use crate::types::Budget;

/// Native-currency transfer primitive.
///
/// A successful transfer debits `from` and credits `to` in one step. The
/// debit happens before any recipient-side logic runs, so an observer
/// reentering during the transfer already sees the reduced source balance.
pub trait ValueTransfer {
    /// Native balance of `account`. Unknown accounts hold zero.
    fn value_balance(&self, account: &Address) -> u64;

    /// Move `amount` from `from` to `to`, forwarding `budget` to the recipient.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InsufficientFunds`] if `from` holds less than `amount`
    /// - [`TransferError::Rejected`] if the recipient refuses receipt
    /// - [`TransferError::OutOfBudget`] if the recipient's receive logic costs
    ///   more than `budget`
    fn transfer_value(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
        budget: Budget,
    ) -> Result<(), TransferError>;
}

/// Fungible-token ledger primitive, one ledger serving many tokens.
pub trait TokenLedger {
    /// Balance of `owner` in `token`.
    fn balance_of(&self, token: &Address, owner: &Address) -> Result<u64, TransferError>;

    /// Caller-initiated transfer of `amount` from `from` to `to`.
    fn transfer_token(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TransferError>;

    /// Set the amount `spender` may pull from `owner`.
    fn approve(
        &mut self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: u64,
    ) -> Result<(), TransferError>;

    /// Remaining amount `spender` may pull from `owner`.
    fn allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
    ) -> Result<u64, TransferError>;

    /// Pull `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TransferError>;
}
