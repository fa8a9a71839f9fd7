//! In-memory multi-token ledger.
//!
//! [`MemoryTokenLedger`] stands in for deployed fungible-token contracts.
//! Each token is identified by its contract [`Address`]; balances and
//! allowances are kept per token. A token can be paused, after which every
//! transfer of it reports failure, which is how callers exercise the
//! failed-token-transfer paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::Address;
use crate::error::TransferError;
use crate::traits::TokenLedger;

/// State of one token contract.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenState {
    /// Account that deployed the token and received the initial supply.
    pub issuer: Address,
    /// Whether transfers currently fail.
    #[serde(default)]
    pub paused: bool,
    balances: BTreeMap<Address, u64>,
    /// owner → spender → remaining allowance.
    #[serde(default)]
    allowances: BTreeMap<Address, BTreeMap<Address, u64>>,
}

impl TokenState {
    fn balance(&self, owner: &Address) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn set_balance(&mut self, owner: &Address, amount: u64) {
        if amount == 0 {
            self.balances.remove(owner);
        } else {
            self.balances.insert(*owner, amount);
        }
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn move_balance(&mut self, token: &Address, from: &Address, to: &Address, amount: u64) -> Result<(), TransferError> {
        if self.paused {
            return Err(TransferError::TokenPaused(*token));
        }
        let have = self.balance(from);
        if have < amount {
            return Err(TransferError::InsufficientFunds { have, need: amount });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(TransferError::BalanceOverflow)?;
        self.set_balance(from, have - amount);
        self.set_balance(to, credited);
        Ok(())
    }

    /// Sum of all holder balances.
    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|v| *v as u128).sum()
    }

    /// Holders with a non-zero balance.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &u64)> {
        self.balances.iter()
    }
}

/// Ledger for any number of fungible tokens.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryTokenLedger {
    tokens: BTreeMap<Address, TokenState>,
}

impl MemoryTokenLedger {
    /// Create an empty ledger with no tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` with `supply` units held by `issuer`.
    ///
    /// Re-deploying an existing token address replaces it.
    pub fn deploy(&mut self, token: Address, issuer: Address, supply: u64) {
        let mut state = TokenState {
            issuer,
            ..TokenState::default()
        };
        state.set_balance(&issuer, supply);
        self.tokens.insert(token, state);
    }

    /// Pause or unpause transfers of `token`.
    pub fn set_paused(&mut self, token: &Address, paused: bool) -> Result<(), TransferError> {
        self.token_mut(token)?.paused = paused;
        Ok(())
    }

    /// Whether `token` has been deployed.
    pub fn contains(&self, token: &Address) -> bool {
        self.tokens.contains_key(token)
    }

    /// Look up a token's state.
    pub fn token(&self, token: &Address) -> Result<&TokenState, TransferError> {
        self.tokens.get(token).ok_or(TransferError::UnknownToken(*token))
    }

    /// All deployed tokens.
    pub fn tokens(&self) -> impl Iterator<Item = (&Address, &TokenState)> {
        self.tokens.iter()
    }

    /// Total supply of `token`.
    pub fn total_supply(&self, token: &Address) -> Result<u128, TransferError> {
        Ok(self.token(token)?.total_supply())
    }

    fn token_mut(&mut self, token: &Address) -> Result<&mut TokenState, TransferError> {
        self.tokens
            .get_mut(token)
            .ok_or(TransferError::UnknownToken(*token))
    }
}

impl TokenLedger for MemoryTokenLedger {
    fn balance_of(&self, token: &Address, owner: &Address) -> Result<u64, TransferError> {
        Ok(self.token(token)?.balance(owner))
    }

    fn transfer_token(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.token_mut(token)?.move_balance(token, from, to, amount)
    }

    fn approve(
        &mut self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        let state = self.token_mut(token)?;
        let per_owner = state.allowances.entry(*owner).or_default();
        if amount == 0 {
            per_owner.remove(spender);
        } else {
            per_owner.insert(*spender, amount);
        }
        Ok(())
    }

    fn allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
    ) -> Result<u64, TransferError> {
        Ok(self.token(token)?.allowance(owner, spender))
    }

    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        let state = self.token_mut(token)?;
        let allowed = state.allowance(from, spender);
        if allowed < amount {
            return Err(TransferError::InsufficientAllowance {
                have: allowed,
                need: amount,
            });
        }
        state.move_balance(token, from, to, amount)?;
        let remaining = allowed - amount;
        let per_owner = state.allowances.entry(*from).or_default();
        if remaining == 0 {
            per_owner.remove(spender);
        } else {
            per_owner.insert(*spender, remaining);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    fn ledger_with_token() -> (MemoryTokenLedger, Address) {
        let token = addr(0x70);
        let mut ledger = MemoryTokenLedger::new();
        ledger.deploy(token, addr(2), 1_000_000_000_000_000);
        (ledger, token)
    }

    #[test]
    fn deploy_credits_issuer() {
        let (ledger, token) = ledger_with_token();
        assert_eq!(ledger.balance_of(&token, &addr(2)), Ok(1_000_000_000_000_000));
        assert_eq!(ledger.balance_of(&token, &addr(3)), Ok(0));
        assert_eq!(ledger.token(&token).unwrap().issuer, addr(2));
    }

    #[test]
    fn unknown_token() {
        let ledger = MemoryTokenLedger::new();
        assert_eq!(
            ledger.balance_of(&addr(9), &addr(1)),
            Err(TransferError::UnknownToken(addr(9)))
        );
    }

    #[test]
    fn transfer_and_overdraft() {
        let (mut ledger, token) = ledger_with_token();
        ledger.transfer_token(&token, &addr(2), &addr(3), 50).unwrap();
        assert_eq!(ledger.balance_of(&token, &addr(3)), Ok(50));
        assert_eq!(
            ledger.transfer_token(&token, &addr(3), &addr(4), 51),
            Err(TransferError::InsufficientFunds { have: 50, need: 51 })
        );
        assert_eq!(ledger.balance_of(&token, &addr(4)), Ok(0));
    }

    #[test]
    fn paused_token_fails_transfers() {
        let (mut ledger, token) = ledger_with_token();
        ledger.set_paused(&token, true).unwrap();
        assert_eq!(
            ledger.transfer_token(&token, &addr(2), &addr(3), 1),
            Err(TransferError::TokenPaused(token))
        );
        ledger.set_paused(&token, false).unwrap();
        assert!(ledger.transfer_token(&token, &addr(2), &addr(3), 1).is_ok());
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let (mut ledger, token) = ledger_with_token();
        ledger.approve(&token, &addr(2), &addr(5), 30).unwrap();
        assert_eq!(ledger.allowance(&token, &addr(2), &addr(5)), Ok(30));

        ledger
            .transfer_from(&token, &addr(5), &addr(2), &addr(6), 20)
            .unwrap();
        assert_eq!(ledger.balance_of(&token, &addr(6)), Ok(20));
        assert_eq!(ledger.allowance(&token, &addr(2), &addr(5)), Ok(10));

        assert_eq!(
            ledger.transfer_from(&token, &addr(5), &addr(2), &addr(6), 11),
            Err(TransferError::InsufficientAllowance { have: 10, need: 11 })
        );
    }

    #[test]
    fn failed_transfer_from_keeps_allowance() {
        let (mut ledger, token) = ledger_with_token();
        ledger.approve(&token, &addr(3), &addr(5), 30).unwrap();
        // addr(3) holds nothing.
        assert!(ledger
            .transfer_from(&token, &addr(5), &addr(3), &addr(6), 10)
            .is_err());
        assert_eq!(ledger.allowance(&token, &addr(3), &addr(5)), Ok(30));
    }

    #[test]
    fn supply_is_conserved() {
        let (mut ledger, token) = ledger_with_token();
        let before = ledger.total_supply(&token).unwrap();
        ledger.transfer_token(&token, &addr(2), &addr(3), 12345).unwrap();
        ledger.transfer_token(&token, &addr(3), &addr(4), 345).unwrap();
        assert_eq!(ledger.total_supply(&token).unwrap(), before);
    }
}
