//! Shared test helpers for scenario and adversarial tests.

use depot_core::{Address, Event};
use depot_custody::{Chain, CustodyConfig};

/// Supply minted to the token issuer in every fixture.
pub const TOKEN_SUPPLY: u64 = 1_000_000_000_000_000;

/// Native funds given to each fixture account.
pub const STARTING_FUNDS: u64 = 1_000_000;

/// Simple account address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address::from_bytes([seed; 20])
}

/// An arbitrary non-zero address that no fixture account uses.
pub fn outsider() -> Address {
    // Checksummed form is accepted; case is ignored.
    "0xF9d80fe1bb6078D115d1CD16e89f05eA7F14D969"
        .parse()
        .expect("valid address literal")
}

/// A chain with a wallet, one forwarder and a token already deployed.
pub struct Fixture {
    pub chain: Chain,
    /// Deployer of `wallet`.
    pub owner: Address,
    /// Funded account with no authority over anything.
    pub stranger: Address,
    /// Deployer and initial holder of `token`.
    pub issuer: Address,
    pub wallet: Address,
    pub forwarder: Address,
    pub token: Address,
}

impl Fixture {
    pub fn new(config: CustodyConfig) -> Self {
        let owner = addr(0x01);
        let stranger = addr(0x02);
        let issuer = addr(0x03);

        let mut chain = Chain::new(config);
        for account in [owner, stranger, issuer] {
            chain
                .ledger_mut()
                .credit(&account, STARTING_FUNDS)
                .expect("fund fixture account");
        }
        let wallet = chain.deploy_wallet(&owner).expect("deploy wallet");
        let forwarder = chain
            .create_forwarder(&owner, &wallet)
            .expect("create forwarder");
        let token = chain
            .deploy_token(&issuer, TOKEN_SUPPLY)
            .expect("deploy token");

        Self {
            chain,
            owner,
            stranger,
            issuer,
            wallet,
            forwarder,
            token,
        }
    }

    /// Move `amount` of the fixture token from the issuer to `to`.
    pub fn give_tokens(&mut self, to: &Address, amount: u64) {
        self.chain
            .transfer_token(&self.issuer, &self.token, to, amount)
            .expect("issuer token transfer");
    }

    /// Fixture-token balance of `owner`.
    pub fn tokens_of(&self, owner: &Address) -> u64 {
        self.chain
            .token_balance(&self.token, owner)
            .expect("fixture token exists")
    }

    /// Events emitted by `emitter`, oldest first.
    pub fn events_from(&self, emitter: &Address) -> Vec<Event> {
        self.chain.log().by_emitter(emitter).copied().collect()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new(CustodyConfig::default())
    }
}
