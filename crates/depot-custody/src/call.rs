//! Serializable calls and receipts.
//!
//! [`Call`] names every operation the chain accepts, so that a sequence of
//! calls can be read from a file and replayed. Executing one yields a
//! [`Receipt`] carrying the [`Outcome`] and the events the call emitted.

use serde::{Deserialize, Serialize};

use depot_core::{Address, LogEntry, TokenLedger};

use crate::chain::{reverted, Chain, Vm};
use crate::error::CustodyError;

/// One operation, tagged by `op` in JSON.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Call {
    DeployWallet,
    DeployForwarder,
    DeployToken {
        supply: u64,
    },
    /// Credit native currency out of thin air. Only meaningful in a test
    /// environment.
    Mint {
        to: Address,
        amount: u64,
    },
    Deposit {
        to: Address,
        amount: u64,
    },
    TransferToken {
        token: Address,
        to: Address,
        amount: u64,
    },
    ApproveToken {
        token: Address,
        spender: Address,
        amount: u64,
    },
    TransferTokenFrom {
        token: Address,
        from: Address,
        to: Address,
        amount: u64,
    },
    CreateForwarder {
        wallet: Address,
    },
    CreateForwarders {
        wallet: Address,
        count: u32,
    },
    ChangeForwarderParent {
        wallet: Address,
        forwarder: Address,
        new_parent: Address,
    },
    CollectForwarderTokens {
        wallet: Address,
        forwarder: Address,
        token: Address,
    },
    Send {
        wallet: Address,
        destination: Address,
        amount: u64,
    },
    SendToken {
        wallet: Address,
        destination: Address,
        amount: u64,
        token: Address,
    },
    Collect {
        forwarder: Address,
    },
    ChangeParent {
        forwarder: Address,
        new_parent: Address,
    },
    CollectTokens {
        forwarder: Address,
        token: Address,
    },
}

impl Call {
    /// Operation name, as used in the `op` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Call::DeployWallet => "deploy_wallet",
            Call::DeployForwarder => "deploy_forwarder",
            Call::DeployToken { .. } => "deploy_token",
            Call::Mint { .. } => "mint",
            Call::Deposit { .. } => "deposit",
            Call::TransferToken { .. } => "transfer_token",
            Call::ApproveToken { .. } => "approve_token",
            Call::TransferTokenFrom { .. } => "transfer_token_from",
            Call::CreateForwarder { .. } => "create_forwarder",
            Call::CreateForwarders { .. } => "create_forwarders",
            Call::ChangeForwarderParent { .. } => "change_forwarder_parent",
            Call::CollectForwarderTokens { .. } => "collect_forwarder_tokens",
            Call::Send { .. } => "send",
            Call::SendToken { .. } => "send_token",
            Call::Collect { .. } => "collect",
            Call::ChangeParent { .. } => "change_parent",
            Call::CollectTokens { .. } => "collect_tokens",
        }
    }
}

/// Return value of a successful call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    None,
    Address(Address),
    Addresses(Vec<Address>),
    Amount(u64),
}

/// Result of a successful call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub outcome: Outcome,
    /// Events emitted by the call, in order.
    pub events: Vec<LogEntry>,
}

impl Vm<'_> {
    /// Execute `call` on behalf of `caller`.
    pub fn execute(&mut self, caller: &Address, call: &Call) -> Result<Outcome, CustodyError> {
        let outcome = match call {
            Call::DeployWallet => Outcome::Address(self.deploy_wallet(caller)?),
            Call::DeployForwarder => Outcome::Address(self.deploy_forwarder(caller)?),
            Call::DeployToken { supply } => Outcome::Address(self.deploy_token(caller, *supply)?),
            Call::Mint { to, amount } => {
                self.mint(to, *amount)?;
                Outcome::None
            }
            Call::Deposit { to, amount } => {
                self.deposit(caller, to, *amount)?;
                Outcome::None
            }
            Call::TransferToken { token, to, amount } => {
                self.transfer_token(token, caller, to, *amount)?;
                Outcome::None
            }
            Call::ApproveToken {
                token,
                spender,
                amount,
            } => {
                self.approve(token, caller, spender, *amount)?;
                Outcome::None
            }
            Call::TransferTokenFrom {
                token,
                from,
                to,
                amount,
            } => {
                self.transfer_from(token, caller, from, to, *amount)?;
                Outcome::None
            }
            Call::CreateForwarder { wallet } => {
                Outcome::Address(self.create_forwarder(caller, wallet)?)
            }
            Call::CreateForwarders { wallet, count } => {
                Outcome::Addresses(self.create_forwarders(caller, wallet, *count)?)
            }
            Call::ChangeForwarderParent {
                wallet,
                forwarder,
                new_parent,
            } => Outcome::Address(self.change_forwarder_parent(caller, wallet, forwarder, *new_parent)?),
            Call::CollectForwarderTokens {
                wallet,
                forwarder,
                token,
            } => Outcome::Amount(self.collect_forwarder_tokens(caller, wallet, forwarder, token)?),
            Call::Send {
                wallet,
                destination,
                amount,
            } => {
                self.send(caller, wallet, destination, *amount)?;
                Outcome::None
            }
            Call::SendToken {
                wallet,
                destination,
                amount,
                token,
            } => {
                self.send_token(caller, wallet, destination, *amount, token)?;
                Outcome::None
            }
            Call::Collect { forwarder } => Outcome::Amount(self.collect(caller, forwarder)?),
            Call::ChangeParent {
                forwarder,
                new_parent,
            } => Outcome::Address(self.change_parent(caller, forwarder, *new_parent)?),
            Call::CollectTokens { forwarder, token } => {
                Outcome::Amount(self.collect_tokens(caller, forwarder, token)?)
            }
        };
        Ok(outcome)
    }
}

impl Chain {
    /// Execute `call` on behalf of `caller` as one all-or-nothing call.
    pub fn execute(&mut self, caller: &Address, call: &Call) -> Result<Receipt, CustodyError> {
        let mark = self.log().len();
        let outcome = self
            .transact(|vm| vm.execute(caller, call))
            .inspect_err(|e| reverted(call.name(), caller, e))?;
        Ok(Receipt {
            outcome,
            events: self.log().since(mark).to_vec(),
        })
    }
}
