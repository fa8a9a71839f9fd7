//! In-memory execution environment for wallets and forwarders.
//!
//! [`Chain`] owns every instance, both ledgers, the deployment nonces and
//! the event log. All work happens inside a [`Vm`], a short-lived view of
//! the chain that implements [`Host`] and tracks call depth.
//!
//! Every operation and every nested value transfer runs in a call frame:
//! the state is checkpointed on entry and restored, together with the
//! events emitted since, when the frame fails. A failed operation therefore
//! leaves no trace, while a failed inner transfer that its caller tolerates
//! (an auto-forward, or a hook catching an error) unwinds only itself.
//!
//! External contract accounts are modelled with [`ReceiveHook`]s. A hook
//! runs when value arrives at its address and may reenter the chain through
//! the [`Vm`] it is handed.
//!
//! Not thread-safe; see [`SharedChain`](crate::SharedChain).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use depot_core::{
    Address, Budget, Event, EventLog, MemoryLedger, MemoryTokenLedger, TokenLedger,
    TransferError, ValueTransfer,
};

use crate::config::CustodyConfig;
use crate::error::CustodyError;
use crate::forwarder::Forwarder;
use crate::host::Host;
use crate::wallet::Wallet;

/// Logic attached to an external account, run when it receives value.
///
/// Hook state lives outside the checkpointed chain state and is not rolled
/// back when an enclosing frame fails. While a hook runs it is detached from
/// its address, so value sent back to it in the meantime lands as on a
/// plain account.
pub trait ReceiveHook: Send {
    /// Budget consumed before [`on_receive`](ReceiveHook::on_receive) runs.
    fn receive_cost(&self) -> u64 {
        0
    }

    /// Called after `amount` from `sender` has been credited to `me`.
    /// Returning an error rejects the transfer.
    fn on_receive(
        &mut self,
        vm: &mut Vm<'_>,
        me: &Address,
        sender: &Address,
        amount: u64,
    ) -> Result<(), CustodyError>;
}

/// Checkpointed chain state.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
    ledger: MemoryLedger,
    tokens: MemoryTokenLedger,
    wallets: BTreeMap<Address, Wallet>,
    forwarders: BTreeMap<Address, Forwarder>,
    nonces: BTreeMap<Address, u64>,
}

impl State {
    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn tokens(&self) -> &MemoryTokenLedger {
        &self.tokens
    }

    pub fn wallet(&self, address: &Address) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    pub fn forwarder(&self, address: &Address) -> Option<&Forwarder> {
        self.forwarders.get(address)
    }

    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values()
    }

    pub fn forwarders(&self) -> impl Iterator<Item = &Forwarder> {
        self.forwarders.values()
    }

    /// Next deployment nonce of `deployer`.
    pub fn nonce(&self, deployer: &Address) -> u64 {
        self.nonces.get(deployer).copied().unwrap_or(0)
    }

    fn is_instance(&self, address: &Address) -> bool {
        self.wallets.contains_key(address)
            || self.forwarders.contains_key(address)
            || self.tokens.contains(address)
    }
}

type Hooks = HashMap<Address, Box<dyn ReceiveHook>>;

/// The execution environment.
pub struct Chain {
    config: CustodyConfig,
    state: State,
    log: EventLog,
    hooks: Hooks,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new(CustodyConfig::default())
    }
}

impl Chain {
    /// Create an empty chain.
    pub fn new(config: CustodyConfig) -> Self {
        Self::with_state(config, State::default(), EventLog::new())
    }

    pub(crate) fn with_state(config: CustodyConfig, state: State, log: EventLog) -> Self {
        Self {
            config,
            state,
            log,
            hooks: HashMap::new(),
        }
    }

    pub fn config(&self) -> &CustodyConfig {
        &self.config
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Native balance of `account`.
    pub fn balance(&self, account: &Address) -> u64 {
        self.state.ledger.value_balance(account)
    }

    /// Balance of `owner` in `token`.
    pub fn token_balance(&self, token: &Address, owner: &Address) -> Result<u64, TransferError> {
        self.state.tokens.balance_of(token, owner)
    }

    /// Direct access to the native ledger, for funding accounts and
    /// configuring plain-account behaviour.
    pub fn ledger_mut(&mut self) -> &mut MemoryLedger {
        &mut self.state.ledger
    }

    /// Direct access to the token ledger, e.g. to pause a token.
    pub fn tokens_mut(&mut self) -> &mut MemoryTokenLedger {
        &mut self.state.tokens
    }

    /// Attach `hook` to `address`, replacing any previous hook.
    pub fn register_hook(&mut self, address: Address, hook: impl ReceiveHook + 'static) {
        self.hooks.insert(address, Box::new(hook));
    }

    pub fn remove_hook(&mut self, address: &Address) -> Option<Box<dyn ReceiveHook>> {
        self.hooks.remove(address)
    }

    pub(crate) fn parts(&self) -> (&CustodyConfig, &State, &EventLog) {
        (&self.config, &self.state, &self.log)
    }

    fn vm(&mut self) -> Vm<'_> {
        Vm {
            state: &mut self.state,
            hooks: &mut self.hooks,
            log: &mut self.log,
            config: &self.config,
            depth: 0,
        }
    }

    /// Run `f` as one all-or-nothing call.
    pub fn transact<R>(
        &mut self,
        f: impl FnOnce(&mut Vm<'_>) -> Result<R, CustodyError>,
    ) -> Result<R, CustodyError> {
        self.vm().frame(f)
    }

    pub fn deploy_wallet(&mut self, deployer: &Address) -> Result<Address, CustodyError> {
        self.vm()
            .deploy_wallet(deployer)
            .inspect_err(|e| reverted("deploy_wallet", deployer, e))
    }

    pub fn deploy_forwarder(&mut self, deployer: &Address) -> Result<Address, CustodyError> {
        self.vm()
            .deploy_forwarder(deployer)
            .inspect_err(|e| reverted("deploy_forwarder", deployer, e))
    }

    /// Deploy a token with `supply` units credited to `issuer`.
    pub fn deploy_token(&mut self, issuer: &Address, supply: u64) -> Result<Address, CustodyError> {
        self.vm()
            .deploy_token(issuer, supply)
            .inspect_err(|e| reverted("deploy_token", issuer, e))
    }

    /// Send native currency from `from` to `to`, running any receive logic.
    pub fn deposit(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), CustodyError> {
        self.vm()
            .deposit(from, to, amount)
            .inspect_err(|e| reverted("deposit", from, e))
    }

    pub fn transfer_token(
        &mut self,
        caller: &Address,
        token: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), CustodyError> {
        self.state
            .tokens
            .transfer_token(token, caller, to, amount)
            .map_err(CustodyError::from)
            .inspect_err(|e| reverted("transfer_token", caller, e))?;
        debug!(%token, from = %caller, %to, amount, "chain: token transfer");
        Ok(())
    }

    pub fn approve_token(
        &mut self,
        caller: &Address,
        token: &Address,
        spender: &Address,
        amount: u64,
    ) -> Result<(), CustodyError> {
        self.state
            .tokens
            .approve(token, caller, spender, amount)
            .map_err(CustodyError::from)
            .inspect_err(|e| reverted("approve_token", caller, e))
    }

    pub fn transfer_token_from(
        &mut self,
        caller: &Address,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), CustodyError> {
        self.state
            .tokens
            .transfer_from(token, caller, from, to, amount)
            .map_err(CustodyError::from)
            .inspect_err(|e| reverted("transfer_token_from", caller, e))?;
        debug!(%token, spender = %caller, %from, %to, amount, "chain: token pull transfer");
        Ok(())
    }

    pub fn create_forwarder(&mut self, caller: &Address, wallet: &Address) -> Result<Address, CustodyError> {
        self.vm()
            .create_forwarder(caller, wallet)
            .inspect_err(|e| reverted("create_forwarder", caller, e))
    }

    pub fn create_forwarders(
        &mut self,
        caller: &Address,
        wallet: &Address,
        count: u32,
    ) -> Result<Vec<Address>, CustodyError> {
        self.vm()
            .create_forwarders(caller, wallet, count)
            .inspect_err(|e| reverted("create_forwarders", caller, e))
    }

    pub fn change_forwarder_parent(
        &mut self,
        caller: &Address,
        wallet: &Address,
        forwarder: &Address,
        new_parent: Address,
    ) -> Result<Address, CustodyError> {
        self.vm()
            .change_forwarder_parent(caller, wallet, forwarder, new_parent)
            .inspect_err(|e| reverted("change_forwarder_parent", caller, e))
    }

    pub fn collect_forwarder_tokens(
        &mut self,
        caller: &Address,
        wallet: &Address,
        forwarder: &Address,
        token: &Address,
    ) -> Result<u64, CustodyError> {
        self.vm()
            .collect_forwarder_tokens(caller, wallet, forwarder, token)
            .inspect_err(|e| reverted("collect_forwarder_tokens", caller, e))
    }

    pub fn send(
        &mut self,
        caller: &Address,
        wallet: &Address,
        destination: &Address,
        amount: u64,
    ) -> Result<(), CustodyError> {
        self.vm()
            .send(caller, wallet, destination, amount)
            .inspect_err(|e| reverted("send", caller, e))
    }

    pub fn send_token(
        &mut self,
        caller: &Address,
        wallet: &Address,
        destination: &Address,
        amount: u64,
        token: &Address,
    ) -> Result<(), CustodyError> {
        self.vm()
            .send_token(caller, wallet, destination, amount, token)
            .inspect_err(|e| reverted("send_token", caller, e))
    }

    pub fn collect(&mut self, caller: &Address, forwarder: &Address) -> Result<u64, CustodyError> {
        self.vm()
            .collect(caller, forwarder)
            .inspect_err(|e| reverted("collect", caller, e))
    }

    pub fn change_parent(
        &mut self,
        caller: &Address,
        forwarder: &Address,
        new_parent: Address,
    ) -> Result<Address, CustodyError> {
        self.vm()
            .change_parent(caller, forwarder, new_parent)
            .inspect_err(|e| reverted("change_parent", caller, e))
    }

    pub fn collect_tokens(
        &mut self,
        caller: &Address,
        forwarder: &Address,
        token: &Address,
    ) -> Result<u64, CustodyError> {
        self.vm()
            .collect_tokens(caller, forwarder, token)
            .inspect_err(|e| reverted("collect_tokens", caller, e))
    }
}

pub(crate) fn reverted(op: &'static str, caller: &Address, err: &CustodyError) {
    warn!(op, %caller, kind = %err.kind(), reason = %err, "chain: call reverted");
}

/// A running view of a [`Chain`].
pub struct Vm<'a> {
    state: &'a mut State,
    hooks: &'a mut Hooks,
    log: &'a mut EventLog,
    config: &'a CustodyConfig,
    depth: usize,
}

impl Vm<'_> {
    pub fn state(&self) -> &State {
        &*self.state
    }

    /// Number of frames currently open.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn balance(&self, account: &Address) -> u64 {
        self.state.ledger.value_balance(account)
    }

    pub fn token_balance(&self, token: &Address, owner: &Address) -> Result<u64, TransferError> {
        self.state.tokens.balance_of(token, owner)
    }

    /// Run `f` in a new call frame.
    fn frame<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, CustodyError>,
    ) -> Result<R, CustodyError> {
        if self.depth >= self.config.max_call_depth {
            return Err(TransferError::CallDepthExceeded(self.depth).into());
        }
        let checkpoint = self.state.clone();
        let mark = self.log.len();

        self.depth += 1;
        let result = f(self);
        self.depth -= 1;

        if result.is_err() {
            *self.state = checkpoint;
            self.log.truncate(mark);
        }
        result
    }

    /// Move value and run the recipient's receive logic, as one frame.
    ///
    /// The sender is debited before the recipient runs.
    pub fn call_value(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
        budget: Budget,
    ) -> Result<(), CustodyError> {
        self.frame(|vm| {
            vm.state.ledger.transfer_value(from, to, amount, budget)?;
            vm.dispatch_receive(from, to, amount, budget)
        })
    }

    fn dispatch_receive(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
        budget: Budget,
    ) -> Result<(), CustodyError> {
        if let Some(wallet) = self.state.wallets.get(to).cloned() {
            budget.consume(self.config.wallet_receive_cost)?;
            wallet.on_receive(self, from, amount)?;
            return Ok(());
        }
        if let Some(forwarder) = self.state.forwarders.get(to).copied() {
            let remaining = budget.consume(self.config.forwarder_receive_cost)?;
            forwarder.on_receive(self, from, amount, remaining)?;
            return Ok(());
        }
        if let Some(mut hook) = self.hooks.remove(to) {
            let result = budget
                .consume(hook.receive_cost())
                .map_err(CustodyError::from)
                .and_then(|_| hook.on_receive(self, to, from, amount));
            self.hooks.insert(*to, hook);
            return result;
        }
        Ok(())
    }

    /// Derive the next free instance address for `deployer`.
    fn next_address(&mut self, deployer: &Address) -> Address {
        let mut nonce = self.state.nonce(deployer);
        let address = loop {
            let candidate = Address::derive(deployer, nonce);
            nonce += 1;
            if !self.state.is_instance(&candidate) && !self.hooks.contains_key(&candidate) {
                break candidate;
            }
        };
        self.state.nonces.insert(*deployer, nonce);
        address
    }

    fn wallet_at(&self, address: &Address) -> Result<Wallet, CustodyError> {
        self.state
            .wallets
            .get(address)
            .cloned()
            .ok_or(CustodyError::UnknownAccount(*address))
    }

    fn forwarder_at(&self, address: &Address) -> Result<Forwarder, CustodyError> {
        self.state
            .forwarders
            .get(address)
            .copied()
            .ok_or(CustodyError::UnknownAccount(*address))
    }

    pub fn deploy_wallet(&mut self, deployer: &Address) -> Result<Address, CustodyError> {
        self.frame(|vm| {
            if deployer.is_zero() {
                return Err(CustodyError::ZeroAddress);
            }
            let address = vm.next_address(deployer);
            vm.state.wallets.insert(address, Wallet::new(address, *deployer));
            info!(wallet = %address, owner = %deployer, "chain: wallet deployed");
            Ok(address)
        })
    }

    pub fn deploy_forwarder(&mut self, deployer: &Address) -> Result<Address, CustodyError> {
        self.frame(|vm| {
            if deployer.is_zero() {
                return Err(CustodyError::ZeroAddress);
            }
            Ok(vm.spawn_forwarder(deployer).address())
        })
    }

    pub fn deploy_token(&mut self, issuer: &Address, supply: u64) -> Result<Address, CustodyError> {
        self.frame(|vm| {
            if issuer.is_zero() {
                return Err(CustodyError::ZeroAddress);
            }
            let address = vm.next_address(issuer);
            vm.state.tokens.deploy(address, *issuer, supply);
            debug!(token = %address, %issuer, supply, "chain: token deployed");
            Ok(address)
        })
    }

    /// Test faucet: credit `amount` of native currency to `to`.
    pub fn mint(&mut self, to: &Address, amount: u64) -> Result<(), CustodyError> {
        self.state.ledger.credit(to, amount)?;
        debug!(%to, amount, "chain: minted");
        Ok(())
    }

    pub fn deposit(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), CustodyError> {
        self.call_value(from, to, amount, Budget::Unlimited)
    }

    pub fn create_forwarder(&mut self, caller: &Address, wallet: &Address) -> Result<Address, CustodyError> {
        self.frame(|vm| {
            let mut instance = vm.wallet_at(wallet)?;
            let forwarder = instance.create_forwarder(vm);
            vm.state.wallets.insert(*wallet, instance);
            debug!(%caller, %wallet, %forwarder, "chain: create_forwarder");
            Ok(forwarder)
        })
    }

    pub fn create_forwarders(
        &mut self,
        caller: &Address,
        wallet: &Address,
        count: u32,
    ) -> Result<Vec<Address>, CustodyError> {
        self.frame(|vm| {
            let mut instance = vm.wallet_at(wallet)?;
            let created = instance.create_forwarders(vm, count)?;
            vm.state.wallets.insert(*wallet, instance);
            debug!(%caller, %wallet, count, "chain: create_forwarders");
            Ok(created)
        })
    }

    pub fn change_forwarder_parent(
        &mut self,
        caller: &Address,
        wallet: &Address,
        forwarder: &Address,
        new_parent: Address,
    ) -> Result<Address, CustodyError> {
        self.frame(|vm| {
            let instance = vm.wallet_at(wallet)?;
            Ok(instance.change_forwarder_parent(vm, caller, forwarder, new_parent)?)
        })
    }

    pub fn collect_forwarder_tokens(
        &mut self,
        caller: &Address,
        wallet: &Address,
        forwarder: &Address,
        token: &Address,
    ) -> Result<u64, CustodyError> {
        self.frame(|vm| {
            let instance = vm.wallet_at(wallet)?;
            Ok(instance.collect_forwarder_tokens(vm, caller, forwarder, token)?)
        })
    }

    pub fn send(
        &mut self,
        caller: &Address,
        wallet: &Address,
        destination: &Address,
        amount: u64,
    ) -> Result<(), CustodyError> {
        self.frame(|vm| {
            let instance = vm.wallet_at(wallet)?;
            Ok(instance.send(vm, caller, destination, amount)?)
        })
    }

    pub fn send_token(
        &mut self,
        caller: &Address,
        wallet: &Address,
        destination: &Address,
        amount: u64,
        token: &Address,
    ) -> Result<(), CustodyError> {
        self.frame(|vm| {
            let instance = vm.wallet_at(wallet)?;
            Ok(instance.send_token(vm, caller, destination, amount, token)?)
        })
    }

    pub fn collect(&mut self, caller: &Address, forwarder: &Address) -> Result<u64, CustodyError> {
        self.frame(|vm| {
            let instance = vm.forwarder_at(forwarder)?;
            Ok(instance.collect(vm, caller)?)
        })
    }

    pub fn change_parent(
        &mut self,
        caller: &Address,
        forwarder: &Address,
        new_parent: Address,
    ) -> Result<Address, CustodyError> {
        self.frame(|vm| {
            let mut instance = vm.forwarder_at(forwarder)?;
            let previous = instance.change_parent(caller, new_parent)?;
            vm.state.forwarders.insert(*forwarder, instance);
            Ok(previous)
        })
    }

    pub fn collect_tokens(
        &mut self,
        caller: &Address,
        forwarder: &Address,
        token: &Address,
    ) -> Result<u64, CustodyError> {
        self.frame(|vm| {
            let instance = vm.forwarder_at(forwarder)?;
            Ok(instance.collect_tokens(vm, caller, token)?)
        })
    }
}

impl ValueTransfer for Vm<'_> {
    fn value_balance(&self, account: &Address) -> u64 {
        self.state.ledger.value_balance(account)
    }

    fn transfer_value(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
        budget: Budget,
    ) -> Result<(), TransferError> {
        self.call_value(from, to, amount, budget)
            .map_err(|e| e.into_transfer_error(*to))
    }
}

impl TokenLedger for Vm<'_> {
    fn balance_of(&self, token: &Address, owner: &Address) -> Result<u64, TransferError> {
        self.state.tokens.balance_of(token, owner)
    }

    fn transfer_token(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.state.tokens.transfer_token(token, from, to, amount)
    }

    fn approve(
        &mut self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.state.tokens.approve(token, owner, spender, amount)
    }

    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Result<u64, TransferError> {
        self.state.tokens.allowance(token, owner, spender)
    }

    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.state.tokens.transfer_from(token, spender, from, to, amount)
    }
}

impl Host for Vm<'_> {
    fn config(&self) -> &CustodyConfig {
        self.config
    }

    fn emit(&mut self, emitter: Address, event: Event) {
        self.log.emit(emitter, event);
    }

    fn forwarder(&self, address: &Address) -> Option<Forwarder> {
        self.state.forwarders.get(address).copied()
    }

    fn store_forwarder(&mut self, forwarder: Forwarder) {
        self.state.forwarders.insert(forwarder.address(), forwarder);
    }

    fn spawn_forwarder(&mut self, deployer: &Address) -> Forwarder {
        let address = self.next_address(deployer);
        let forwarder = Forwarder::new(address, *deployer);
        self.state.forwarders.insert(address, forwarder);
        debug!(forwarder = %address, parent = %deployer, "chain: forwarder deployed");
        forwarder
    }
}
