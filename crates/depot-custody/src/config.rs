//! Custody configuration.
//!
//! [`CustodyConfig`] controls deposit forwarding and the resource bounds of
//! the execution environment. It can be built programmatically (every field
//! has a default) or loaded with [`CustodyConfig::load`] from an optional
//! TOML file, overridden by `DEPOT__*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

use depot_core::constants::{
    DEFAULT_FORWARDER_RECEIVE_COST, DEFAULT_FORWARD_STIPEND, DEFAULT_MAX_BATCH,
    DEFAULT_WALLET_RECEIVE_COST, MAX_CALL_DEPTH,
};

use crate::error::ConfigError;

/// What a forwarder does with value it receives.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForwardPolicy {
    /// Keep the value until someone calls `collect`.
    #[default]
    Hold,
    /// Try to pass the whole balance on to the parent inside the deposit.
    /// If that inner transfer fails the value is held instead.
    Immediate,
}

/// Configuration for a custody execution environment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct CustodyConfig {
    /// Deposit handling on forwarders.
    pub forward_policy: ForwardPolicy,
    /// Budget forwarded with an automatic deposit forward.
    pub forward_stipend: u64,
    /// Budget a wallet's receive logic consumes.
    pub wallet_receive_cost: u64,
    /// Budget a forwarder's receive logic consumes.
    pub forwarder_receive_cost: u64,
    /// Largest `n` accepted by `create_forwarders`.
    pub max_batch: u32,
    /// Deepest nesting of value transfers within one call.
    pub max_call_depth: usize,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            forward_policy: ForwardPolicy::Hold,
            forward_stipend: DEFAULT_FORWARD_STIPEND,
            wallet_receive_cost: DEFAULT_WALLET_RECEIVE_COST,
            forwarder_receive_cost: DEFAULT_FORWARDER_RECEIVE_COST,
            max_batch: DEFAULT_MAX_BATCH,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }
}

impl CustodyConfig {
    /// Preset that forwards deposits immediately.
    pub fn immediate() -> Self {
        Self {
            forward_policy: ForwardPolicy::Immediate,
            ..Self::default()
        }
    }

    /// Load from an optional TOML file, then `DEPOT__*` environment
    /// variables (e.g. `DEPOT__FORWARD_POLICY=immediate`), then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// [`load`](Self::load) reading overrides from `env` instead of the
    /// process environment when given.
    fn load_with_env(
        path: Option<&Path>,
        env: Option<::config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("DEPOT")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: CustodyConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch == 0 {
            return Err(ConfigError::Invalid("max_batch must be at least 1".into()));
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid("max_call_depth must be at least 1".into()));
        }
        Ok(())
    }
}
