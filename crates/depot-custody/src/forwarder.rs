//! Per-deposit-address forwarder.
//!
//! A [`Forwarder`] owns no funds of its own: everything it receives belongs
//! to its parent. Native currency can be swept to the parent by anyone,
//! since the destination is fixed. Changing the parent and sweeping tokens
//! are restricted to the current parent.
//!
//! Sweeps read the full balance and hand it to the value primitive, which
//! debits the forwarder before any recipient logic runs. A reentrant sweep
//! during the transfer therefore finds an empty balance.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use depot_core::{Address, Budget, Event};

use crate::config::ForwardPolicy;
use crate::error::ForwarderError;
use crate::host::Host;

/// A forwarder instance.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Forwarder {
    address: Address,
    parent: Address,
}

impl Forwarder {
    /// Construct a forwarder at `address`, parented to its deployer.
    pub fn new(address: Address, deployer: Address) -> Self {
        Self {
            address,
            parent: deployer,
        }
    }

    /// This instance's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current parent authority and sweep destination.
    pub fn parent(&self) -> Address {
        self.parent
    }

    /// Succeeds only when `caller` is the current parent.
    pub fn ensure_parent(&self, caller: &Address) -> Result<(), ForwarderError> {
        if *caller != self.parent {
            return Err(ForwarderError::NotMainWallet { caller: *caller });
        }
        Ok(())
    }

    /// Receive logic, run after `amount` has been credited to this instance.
    ///
    /// `budget` is what is left of the forwarded budget after this
    /// instance's own receive cost. Under [`ForwardPolicy::Immediate`] the
    /// whole balance is passed on to the parent with at most the configured
    /// stipend; a failure there leaves the value here and is not an error.
    pub fn on_receive<H: Host + ?Sized>(
        &self,
        host: &mut H,
        sender: &Address,
        amount: u64,
        budget: Budget,
    ) -> Result<(), ForwarderError> {
        if amount == 0 {
            return Err(ForwarderError::ZeroValueTransfer);
        }
        host.emit(self.address, Event::Deposited { sender: *sender, amount });
        host.emit(self.address, Event::ForwarderDeposited { sender: *sender, amount });
        debug!(forwarder = %self.address, %sender, amount, "forwarder: deposit received");

        if host.config().forward_policy == ForwardPolicy::Immediate {
            let balance = host.value_balance(&self.address);
            let stipend = budget.cap(host.config().forward_stipend);
            match host.transfer_value(&self.address, &self.parent, balance, stipend) {
                Ok(()) => {
                    host.emit(
                        self.address,
                        Event::Collected {
                            destination: self.parent,
                            amount: balance,
                        },
                    );
                    debug!(forwarder = %self.address, parent = %self.parent, balance, "forwarder: deposit forwarded");
                }
                Err(e) => {
                    warn!(forwarder = %self.address, parent = %self.parent, error = %e, "forwarder: auto-forward failed, holding deposit");
                }
            }
        }
        Ok(())
    }

    /// Sweep the whole native balance to the parent. Any caller.
    ///
    /// Returns the amount moved.
    pub fn collect<H: Host + ?Sized>(
        &self,
        host: &mut H,
        caller: &Address,
    ) -> Result<u64, ForwarderError> {
        let balance = host.value_balance(&self.address);
        if balance == 0 {
            return Err(ForwarderError::EmptyBalance);
        }
        host.transfer_value(&self.address, &self.parent, balance, Budget::Unlimited)
            .map_err(ForwarderError::ExternalTransferFailed)?;
        host.emit(
            self.address,
            Event::Collected {
                destination: self.parent,
                amount: balance,
            },
        );
        info!(forwarder = %self.address, parent = %self.parent, %caller, amount = balance, "forwarder: collected");
        Ok(balance)
    }

    /// Hand authority to `new_parent`. Parent only.
    ///
    /// Returns the previous parent.
    pub fn change_parent(
        &mut self,
        caller: &Address,
        new_parent: Address,
    ) -> Result<Address, ForwarderError> {
        self.ensure_parent(caller)?;
        if new_parent.is_zero() {
            return Err(ForwarderError::ZeroAddress);
        }
        if new_parent == self.address {
            return Err(ForwarderError::SelfParent);
        }
        let previous = std::mem::replace(&mut self.parent, new_parent);
        info!(forwarder = %self.address, %previous, parent = %new_parent, "forwarder: parent changed");
        Ok(previous)
    }

    /// Sweep the whole balance of `token` to the parent. Parent only.
    ///
    /// Returns the amount moved.
    pub fn collect_tokens<H: Host + ?Sized>(
        &self,
        host: &mut H,
        caller: &Address,
        token: &Address,
    ) -> Result<u64, ForwarderError> {
        self.ensure_parent(caller)?;
        let balance = host
            .balance_of(token, &self.address)
            .map_err(ForwarderError::ExternalTransferFailed)?;
        if balance == 0 {
            return Err(ForwarderError::EmptyTokenBalance { token: *token });
        }
        host.transfer_token(token, &self.address, &self.parent, balance)
            .map_err(ForwarderError::ExternalTransferFailed)?;
        host.emit(
            self.address,
            Event::TokensCollected {
                token_address: *token,
                amount: balance,
            },
        );
        info!(forwarder = %self.address, %token, amount = balance, "forwarder: tokens collected");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;
    use depot_core::{TokenLedger, TransferError, ValueTransfer};

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    const PARENT: u8 = 0x01;
    const STRANGER: u8 = 0x02;
    const ISSUER: u8 = 0x03;
    const TOKEN: u8 = 0x70;

    fn setup() -> (MockHost, Forwarder) {
        let mut host = MockHost::default();
        host.tokens.deploy(addr(TOKEN), addr(ISSUER), 1_000_000_000_000_000);
        let fwd = host.spawn_forwarder(&addr(PARENT));
        (host, fwd)
    }

    #[test]
    fn parent_is_deployer() {
        let (_, fwd) = setup();
        assert_eq!(fwd.parent(), addr(PARENT));
        assert!(!fwd.address().is_zero());
    }

    #[test]
    fn deposit_emits_both_events() {
        let (mut host, fwd) = setup();
        host.ledger.credit(&fwd.address(), 10).unwrap();
        fwd.on_receive(&mut host, &addr(STRANGER), 10, Budget::Unlimited)
            .unwrap();
        let events: Vec<_> = host.log.by_emitter(&fwd.address()).copied().collect();
        assert_eq!(
            events,
            vec![
                Event::Deposited { sender: addr(STRANGER), amount: 10 },
                Event::ForwarderDeposited { sender: addr(STRANGER), amount: 10 },
            ]
        );
        assert_eq!(host.value_balance(&fwd.address()), 10);
    }

    #[test]
    fn zero_deposit_rejected() {
        let (mut host, fwd) = setup();
        assert_eq!(
            fwd.on_receive(&mut host, &addr(STRANGER), 0, Budget::Unlimited),
            Err(ForwarderError::ZeroValueTransfer)
        );
        assert!(host.log.is_empty());
    }

    #[test]
    fn immediate_policy_forwards_to_parent() {
        let (mut host, fwd) = setup();
        host.config = crate::config::CustodyConfig::immediate();
        host.ledger.credit(&fwd.address(), 10).unwrap();
        fwd.on_receive(&mut host, &addr(STRANGER), 10, Budget::Unlimited)
            .unwrap();
        assert_eq!(host.value_balance(&fwd.address()), 0);
        assert_eq!(host.value_balance(&addr(PARENT)), 10);
    }

    #[test]
    fn immediate_policy_holds_when_parent_rejects() {
        let (mut host, fwd) = setup();
        host.config = crate::config::CustodyConfig::immediate();
        host.ledger.reject_incoming(&addr(PARENT), true);
        host.ledger.credit(&fwd.address(), 10).unwrap();
        fwd.on_receive(&mut host, &addr(STRANGER), 10, Budget::Unlimited)
            .unwrap();
        assert_eq!(host.value_balance(&fwd.address()), 10);
        assert_eq!(host.value_balance(&addr(PARENT)), 0);
    }

    #[test]
    fn immediate_policy_holds_when_stipend_too_small() {
        let (mut host, fwd) = setup();
        host.config = crate::config::CustodyConfig::immediate();
        host.ledger.set_receive_cost(&addr(PARENT), host.config.forward_stipend + 1);
        host.ledger.credit(&fwd.address(), 10).unwrap();
        fwd.on_receive(&mut host, &addr(STRANGER), 10, Budget::Unlimited)
            .unwrap();
        assert_eq!(host.value_balance(&fwd.address()), 10);
    }

    #[test]
    fn collect_sweeps_everything_once() {
        let (mut host, fwd) = setup();
        host.ledger.set_balance(&fwd.address(), 16);
        assert_eq!(fwd.collect(&mut host, &addr(STRANGER)), Ok(16));
        assert_eq!(host.value_balance(&fwd.address()), 0);
        assert_eq!(host.value_balance(&addr(PARENT)), 16);
        assert_eq!(
            fwd.collect(&mut host, &addr(STRANGER)),
            Err(ForwarderError::EmptyBalance)
        );
    }

    #[test]
    fn collect_reports_rejecting_parent() {
        let (mut host, fwd) = setup();
        host.ledger.set_balance(&fwd.address(), 5);
        host.ledger.reject_incoming(&addr(PARENT), true);
        assert_eq!(
            fwd.collect(&mut host, &addr(PARENT)),
            Err(ForwarderError::ExternalTransferFailed(TransferError::Rejected(addr(PARENT))))
        );
        assert_eq!(host.value_balance(&fwd.address()), 5);
    }

    #[test]
    fn change_parent_parent_only() {
        let (_, mut fwd) = setup();
        let target: Address = "0xF9d80fe1bb6078D115d1CD16e89f05eA7F14D969".parse().unwrap();
        assert_eq!(
            fwd.change_parent(&addr(STRANGER), target),
            Err(ForwarderError::NotMainWallet { caller: addr(STRANGER) })
        );
        assert_eq!(fwd.parent(), addr(PARENT));

        assert_eq!(fwd.change_parent(&addr(PARENT), target), Ok(addr(PARENT)));
        assert_eq!(fwd.parent(), target);
        // The old parent has lost authority.
        assert!(fwd.change_parent(&addr(PARENT), addr(PARENT)).is_err());
    }

    #[test]
    fn change_parent_rejects_zero() {
        let (_, mut fwd) = setup();
        assert_eq!(
            fwd.change_parent(&addr(PARENT), Address::ZERO),
            Err(ForwarderError::ZeroAddress)
        );
        assert_eq!(fwd.parent(), addr(PARENT));
    }

    #[test]
    fn change_parent_rejects_self() {
        let (_, mut fwd) = setup();
        let me = fwd.address();
        assert_eq!(fwd.change_parent(&addr(PARENT), me), Err(ForwarderError::SelfParent));
        assert_eq!(fwd.parent(), addr(PARENT));
    }

    #[test]
    fn collect_tokens_by_parent() {
        let (mut host, fwd) = setup();
        let token = addr(TOKEN);
        host.tokens
            .transfer_token(&token, &addr(ISSUER), &fwd.address(), 50)
            .unwrap();

        assert_eq!(fwd.collect_tokens(&mut host, &addr(PARENT), &token), Ok(50));
        assert_eq!(host.balance_of(&token, &fwd.address()), Ok(0));
        assert_eq!(host.balance_of(&token, &addr(PARENT)), Ok(50));
        assert_eq!(
            host.log.by_emitter(&fwd.address()).last(),
            Some(&Event::TokensCollected { token_address: token, amount: 50 })
        );
    }

    #[test]
    fn collect_tokens_by_stranger() {
        let (mut host, fwd) = setup();
        let token = addr(TOKEN);
        host.tokens
            .transfer_token(&token, &addr(ISSUER), &fwd.address(), 50)
            .unwrap();
        assert_eq!(
            fwd.collect_tokens(&mut host, &addr(STRANGER), &token),
            Err(ForwarderError::NotMainWallet { caller: addr(STRANGER) })
        );
        assert_eq!(host.balance_of(&token, &fwd.address()), Ok(50));
    }

    #[test]
    fn collect_tokens_empty() {
        let (mut host, fwd) = setup();
        assert_eq!(
            fwd.collect_tokens(&mut host, &addr(PARENT), &addr(TOKEN)),
            Err(ForwarderError::EmptyTokenBalance { token: addr(TOKEN) })
        );
    }

    #[test]
    fn collect_tokens_paused_token() {
        let (mut host, fwd) = setup();
        let token = addr(TOKEN);
        host.tokens
            .transfer_token(&token, &addr(ISSUER), &fwd.address(), 50)
            .unwrap();
        host.tokens.set_paused(&token, true).unwrap();
        assert_eq!(
            fwd.collect_tokens(&mut host, &addr(PARENT), &token),
            Err(ForwarderError::ExternalTransferFailed(TransferError::TokenPaused(token)))
        );
        assert!(host.log.is_empty());
    }
}
