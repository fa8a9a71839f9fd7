//! Owner-controlled root wallet.
//!
//! A [`Wallet`] creates forwarders (anyone may ask it to) and is the
//! default parent of everything it creates. Retargeting a forwarder,
//! pulling tokens out of one, and withdrawing funds are owner-only.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use depot_core::{Address, Budget, Event};

use crate::error::WalletError;
use crate::host::Host;

/// A wallet instance.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Wallet {
    address: Address,
    owner: Address,
    forwarders: Vec<Address>,
}

impl Wallet {
    /// Construct a wallet at `address`, owned by its deployer.
    pub fn new(address: Address, deployer: Address) -> Self {
        Self {
            address,
            owner: deployer,
            forwarders: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Forwarders created by this wallet, oldest first.
    ///
    /// Historical record only: a forwarder listed here may since have been
    /// handed to another parent.
    pub fn forwarders(&self) -> &[Address] {
        &self.forwarders
    }

    /// Succeeds only when `caller` is the owner.
    pub fn ensure_owner(&self, caller: &Address) -> Result<(), WalletError> {
        if *caller != self.owner {
            return Err(WalletError::NotOwner { caller: *caller });
        }
        Ok(())
    }

    /// Receive logic, run after `amount` has been credited to this wallet.
    pub fn on_receive<H: Host + ?Sized>(
        &self,
        host: &mut H,
        sender: &Address,
        amount: u64,
    ) -> Result<(), WalletError> {
        if amount == 0 {
            return Err(WalletError::ZeroValueTransfer);
        }
        host.emit(self.address, Event::Deposited { sender: *sender, amount });
        debug!(wallet = %self.address, %sender, amount, "wallet: deposit received");
        Ok(())
    }

    /// Deploy one forwarder parented to this wallet. Any caller.
    pub fn create_forwarder<H: Host + ?Sized>(&mut self, host: &mut H) -> Address {
        let forwarder = host.spawn_forwarder(&self.address).address();
        self.forwarders.push(forwarder);
        host.emit(
            self.address,
            Event::ForwarderCreated {
                forwarder_address: forwarder,
            },
        );
        debug!(wallet = %self.address, %forwarder, "wallet: forwarder created");
        forwarder
    }

    /// Deploy `count` forwarders in order. Any caller.
    ///
    /// `count` must be in `1..=max_batch`; nothing is created otherwise.
    pub fn create_forwarders<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        count: u32,
    ) -> Result<Vec<Address>, WalletError> {
        let max = host.config().max_batch;
        if count == 0 || count > max {
            return Err(WalletError::InvalidCount {
                requested: count,
                max,
            });
        }
        let mut created = Vec::with_capacity(count as usize);
        for _ in 0..count {
            created.push(self.create_forwarder(host));
        }
        info!(wallet = %self.address, count, "wallet: forwarder batch created");
        Ok(created)
    }

    /// Set the parent of `forwarder` to `new_parent`. Owner only.
    ///
    /// The forwarder sees this wallet as the caller, so the wallet must be
    /// its current parent. Returns the previous parent.
    pub fn change_forwarder_parent<H: Host + ?Sized>(
        &self,
        host: &mut H,
        caller: &Address,
        forwarder: &Address,
        new_parent: Address,
    ) -> Result<Address, WalletError> {
        self.ensure_owner(caller)?;
        let mut target = host
            .forwarder(forwarder)
            .ok_or(WalletError::UnknownForwarder(*forwarder))?;
        let previous = target.change_parent(&self.address, new_parent)?;
        host.store_forwarder(target);
        Ok(previous)
    }

    /// Sweep `token` from `forwarder` into its parent. Owner only.
    pub fn collect_forwarder_tokens<H: Host + ?Sized>(
        &self,
        host: &mut H,
        caller: &Address,
        forwarder: &Address,
        token: &Address,
    ) -> Result<u64, WalletError> {
        self.ensure_owner(caller)?;
        let target = host
            .forwarder(forwarder)
            .ok_or(WalletError::UnknownForwarder(*forwarder))?;
        Ok(target.collect_tokens(host, &self.address, token)?)
    }

    /// Withdraw native currency to `destination`. Owner only.
    pub fn send<H: Host + ?Sized>(
        &self,
        host: &mut H,
        caller: &Address,
        destination: &Address,
        amount: u64,
    ) -> Result<(), WalletError> {
        self.ensure_owner(caller)?;
        if amount == 0 {
            return Err(WalletError::ZeroValueTransfer);
        }
        if *destination == self.address {
            return Err(WalletError::SelfTransfer);
        }
        let have = host.value_balance(&self.address);
        if have < amount {
            return Err(WalletError::InsufficientBalance { have, need: amount });
        }
        host.transfer_value(&self.address, destination, amount, Budget::Unlimited)
            .map_err(WalletError::ExternalTransferFailed)?;
        host.emit(
            self.address,
            Event::Transacted {
                destination: *destination,
                amount,
            },
        );
        info!(wallet = %self.address, %destination, amount, "wallet: sent");
        Ok(())
    }

    /// Withdraw `amount` of `token` to `destination`. Owner only.
    pub fn send_token<H: Host + ?Sized>(
        &self,
        host: &mut H,
        caller: &Address,
        destination: &Address,
        amount: u64,
        token: &Address,
    ) -> Result<(), WalletError> {
        self.ensure_owner(caller)?;
        if amount == 0 {
            return Err(WalletError::ZeroValueTransfer);
        }
        if *destination == self.address {
            return Err(WalletError::SelfTransfer);
        }
        let have = host
            .balance_of(token, &self.address)
            .map_err(WalletError::ExternalTransferFailed)?;
        if have < amount {
            return Err(WalletError::EmptyTokenBalance {
                token: *token,
                have,
                need: amount,
            });
        }
        host.transfer_token(token, &self.address, destination, amount)
            .map_err(WalletError::ExternalTransferFailed)?;
        host.emit(
            self.address,
            Event::TransactedToken {
                destination: *destination,
                amount,
                token_address: *token,
            },
        );
        info!(wallet = %self.address, %destination, %token, amount, "wallet: token sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ForwarderError};
    use crate::host::mock::MockHost;
    use depot_core::{TokenLedger, TransferError, ValueTransfer};

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    const OWNER: u8 = 0x01;
    const STRANGER: u8 = 0x02;
    const ISSUER: u8 = 0x03;
    const WALLET: u8 = 0x10;
    const TOKEN: u8 = 0x70;

    fn setup() -> (MockHost, Wallet) {
        let mut host = MockHost::default();
        host.tokens.deploy(addr(TOKEN), addr(ISSUER), 1_000_000_000_000_000);
        (host, Wallet::new(addr(WALLET), addr(OWNER)))
    }

    #[test]
    fn owner_is_deployer() {
        let (_, wallet) = setup();
        assert_eq!(wallet.owner(), addr(OWNER));
        assert!(wallet.forwarders().is_empty());
    }

    #[test]
    fn deposit_emits_event() {
        let (mut host, wallet) = setup();
        wallet.on_receive(&mut host, &addr(STRANGER), 7).unwrap();
        assert_eq!(
            host.log.by_emitter(&addr(WALLET)).collect::<Vec<_>>(),
            vec![&Event::Deposited { sender: addr(STRANGER), amount: 7 }]
        );
        assert_eq!(
            wallet.on_receive(&mut host, &addr(STRANGER), 0),
            Err(WalletError::ZeroValueTransfer)
        );
    }

    #[test]
    fn create_forwarder_registers_and_parents() {
        let (mut host, mut wallet) = setup();
        let fwd = wallet.create_forwarder(&mut host);
        assert_eq!(wallet.forwarders(), &[fwd]);
        assert_eq!(host.forwarder(&fwd).map(|f| f.parent()), Some(addr(WALLET)));
        assert_eq!(
            host.log.entries().last().map(|e| e.event),
            Some(Event::ForwarderCreated { forwarder_address: fwd })
        );
    }

    #[test]
    fn create_forwarders_in_order() {
        let (mut host, mut wallet) = setup();
        let created = wallet.create_forwarders(&mut host, 3).unwrap();
        assert_eq!(created.len(), 3);
        assert_eq!(wallet.forwarders(), created.as_slice());

        let announced: Vec<Address> = host
            .log
            .by_emitter(&addr(WALLET))
            .filter_map(|e| match e {
                Event::ForwarderCreated { forwarder_address } => Some(*forwarder_address),
                _ => None,
            })
            .collect();
        assert_eq!(announced, created);
    }

    #[test]
    fn create_forwarders_bounds() {
        let (mut host, mut wallet) = setup();
        host.config.max_batch = 4;
        assert_eq!(
            wallet.create_forwarders(&mut host, 0),
            Err(WalletError::InvalidCount { requested: 0, max: 4 })
        );
        assert_eq!(
            wallet.create_forwarders(&mut host, 5).unwrap_err().kind(),
            ErrorKind::InvalidCount
        );
        assert!(wallet.forwarders().is_empty());
        assert!(host.forwarders.is_empty());
        assert_eq!(wallet.create_forwarders(&mut host, 4).unwrap().len(), 4);
    }

    #[test]
    fn change_forwarder_parent_owner_only() {
        let (mut host, mut wallet) = setup();
        let fwd = wallet.create_forwarder(&mut host);

        assert_eq!(
            wallet.change_forwarder_parent(&mut host, &addr(STRANGER), &fwd, addr(0x55)),
            Err(WalletError::NotOwner { caller: addr(STRANGER) })
        );
        assert_eq!(
            wallet.change_forwarder_parent(&mut host, &addr(OWNER), &fwd, addr(0x55)),
            Ok(addr(WALLET))
        );
        assert_eq!(host.forwarder(&fwd).map(|f| f.parent()), Some(addr(0x55)));

        // Authority has moved on; the wallet can no longer retarget it.
        assert_eq!(
            wallet.change_forwarder_parent(&mut host, &addr(OWNER), &fwd, addr(WALLET)),
            Err(WalletError::Forwarder(ForwarderError::NotMainWallet {
                caller: addr(WALLET)
            }))
        );
    }

    #[test]
    fn change_forwarder_parent_unknown_target() {
        let (mut host, wallet) = setup();
        let err = wallet
            .change_forwarder_parent(&mut host, &addr(OWNER), &addr(0x66), addr(0x55))
            .unwrap_err();
        assert_eq!(err, WalletError::UnknownForwarder(addr(0x66)));
        assert_eq!(err.kind(), ErrorKind::UnknownAccount);
    }

    #[test]
    fn collect_forwarder_tokens_into_wallet() {
        let (mut host, mut wallet) = setup();
        let token = addr(TOKEN);
        let fwd = wallet.create_forwarder(&mut host);
        host.tokens.transfer_token(&token, &addr(ISSUER), &fwd, 50).unwrap();

        assert_eq!(
            wallet.collect_forwarder_tokens(&mut host, &addr(STRANGER), &fwd, &token),
            Err(WalletError::NotOwner { caller: addr(STRANGER) })
        );
        assert_eq!(
            wallet.collect_forwarder_tokens(&mut host, &addr(OWNER), &fwd, &token),
            Ok(50)
        );
        assert_eq!(host.balance_of(&token, &addr(WALLET)), Ok(50));
        assert_eq!(
            wallet
                .collect_forwarder_tokens(&mut host, &addr(OWNER), &fwd, &token)
                .unwrap_err()
                .kind(),
            ErrorKind::EmptyTokenBalance
        );
    }

    #[test]
    fn send_checks() {
        let (mut host, wallet) = setup();
        host.ledger.set_balance(&addr(WALLET), 10);

        assert_eq!(
            wallet.send(&mut host, &addr(STRANGER), &addr(0x44), 5),
            Err(WalletError::NotOwner { caller: addr(STRANGER) })
        );
        assert_eq!(
            wallet.send(&mut host, &addr(OWNER), &addr(0x44), 0),
            Err(WalletError::ZeroValueTransfer)
        );
        assert_eq!(
            wallet.send(&mut host, &addr(OWNER), &addr(0x44), 11),
            Err(WalletError::InsufficientBalance { have: 10, need: 11 })
        );
        assert!(host.log.is_empty());

        wallet.send(&mut host, &addr(OWNER), &addr(0x44), 4).unwrap();
        assert_eq!(host.value_balance(&addr(WALLET)), 6);
        assert_eq!(host.value_balance(&addr(0x44)), 4);
        assert_eq!(
            host.log.entries().last().map(|e| e.event),
            Some(Event::Transacted { destination: addr(0x44), amount: 4 })
        );
    }

    #[test]
    fn send_to_rejecting_destination() {
        let (mut host, wallet) = setup();
        host.ledger.set_balance(&addr(WALLET), 10);
        host.ledger.reject_incoming(&addr(0x44), true);
        assert_eq!(
            wallet.send(&mut host, &addr(OWNER), &addr(0x44), 4),
            Err(WalletError::ExternalTransferFailed(TransferError::Rejected(addr(0x44))))
        );
        assert_eq!(host.value_balance(&addr(WALLET)), 10);
    }

    #[test]
    fn send_token_checks() {
        let (mut host, wallet) = setup();
        let token = addr(TOKEN);
        host.tokens.transfer_token(&token, &addr(ISSUER), &addr(WALLET), 10).unwrap();

        assert_eq!(
            wallet.send_token(&mut host, &addr(OWNER), &addr(0x44), 11, &token),
            Err(WalletError::EmptyTokenBalance { token, have: 10, need: 11 })
        );
        assert_eq!(
            wallet.send_token(&mut host, &addr(OWNER), &addr(0x44), 0, &token),
            Err(WalletError::ZeroValueTransfer)
        );
        wallet.send_token(&mut host, &addr(OWNER), &addr(0x44), 10, &token).unwrap();
        assert_eq!(host.balance_of(&token, &addr(0x44)), Ok(10));
        assert_eq!(
            host.log.entries().last().map(|e| e.event),
            Some(Event::TransactedToken {
                destination: addr(0x44),
                amount: 10,
                token_address: token,
            })
        );
    }

    #[test]
    fn send_to_self_is_rejected() {
        let (mut host, wallet) = setup();
        let token = addr(TOKEN);
        host.ledger.set_balance(&addr(WALLET), 10);
        host.tokens.transfer_token(&token, &addr(ISSUER), &addr(WALLET), 10).unwrap();

        assert_eq!(
            wallet.send(&mut host, &addr(OWNER), &addr(WALLET), 4),
            Err(WalletError::SelfTransfer)
        );
        assert_eq!(
            wallet.send_token(&mut host, &addr(OWNER), &addr(WALLET), 4, &token),
            Err(WalletError::SelfTransfer)
        );
        assert!(host.log.is_empty());
    }

    #[test]
    fn send_token_unknown_token() {
        let (mut host, wallet) = setup();
        assert_eq!(
            wallet.send_token(&mut host, &addr(OWNER), &addr(0x44), 1, &addr(0x99)),
            Err(WalletError::ExternalTransferFailed(TransferError::UnknownToken(addr(0x99))))
        );
    }
}
