//! In-memory native-currency ledger.
//!
//! [`MemoryLedger`] implements [`ValueTransfer`] over a plain balance map.
//! It can also model simple recipient behaviour for plain accounts: an
//! account may refuse all incoming value, or charge a receive cost that a
//! limited [`Budget`] must cover.
//!
//! Not thread-safe. The custody execution environment owns one ledger and
//! serializes access to it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::address::Address;
use crate::error::TransferError;
use crate::traits::ValueTransfer;
use crate::types::Budget;

/// Balance map with optional per-account receive behaviour.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryLedger {
    balances: BTreeMap<Address, u64>,
    /// Accounts whose receive logic always fails.
    #[serde(default)]
    rejecting: BTreeSet<Address>,
    /// Receive cost per account; absent means free.
    #[serde(default)]
    receive_costs: BTreeMap<Address, u64>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` into `account`.
    pub fn credit(&mut self, account: &Address, amount: u64) -> Result<(), TransferError> {
        let bal = self.balances.entry(*account).or_insert(0);
        *bal = bal.checked_add(amount).ok_or(TransferError::BalanceOverflow)?;
        Ok(())
    }

    /// Overwrite the balance of `account`. Test harness use.
    pub fn set_balance(&mut self, account: &Address, amount: u64) {
        if amount == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(*account, amount);
        }
    }

    /// Make `account` refuse (or accept again) incoming value.
    pub fn reject_incoming(&mut self, account: &Address, reject: bool) {
        if reject {
            self.rejecting.insert(*account);
        } else {
            self.rejecting.remove(account);
        }
    }

    /// Charge `cost` against the forwarded budget whenever `account` receives.
    pub fn set_receive_cost(&mut self, account: &Address, cost: u64) {
        if cost == 0 {
            self.receive_costs.remove(account);
        } else {
            self.receive_costs.insert(*account, cost);
        }
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|v| *v as u128).sum()
    }

    /// Accounts with a non-zero balance.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &u64)> {
        self.balances.iter().filter(|(_, v)| **v > 0)
    }

    fn check_recipient(&self, to: &Address, budget: Budget) -> Result<(), TransferError> {
        if self.rejecting.contains(to) {
            return Err(TransferError::Rejected(*to));
        }
        let cost = self.receive_costs.get(to).copied().unwrap_or(0);
        budget.consume(cost).map(|_| ())
    }
}

impl ValueTransfer for MemoryLedger {
    fn value_balance(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer_value(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
        budget: Budget,
    ) -> Result<(), TransferError> {
        let have = self.value_balance(from);
        if have < amount {
            return Err(TransferError::InsufficientFunds { have, need: amount });
        }
        self.check_recipient(to, budget)?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .value_balance(to)
            .checked_add(amount)
            .ok_or(TransferError::BalanceOverflow)?;

        // Both sides validated; commit.
        self.set_balance(from, have - amount);
        self.set_balance(to, credited);
        Ok(())
    }
}
