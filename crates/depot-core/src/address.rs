//! Account addresses.
//!
//! Every participant in the custody system (externally-owned accounts,
//! wallets, forwarders, token contracts) is identified by a 20-byte
//! [`Address`]. The human-readable form is `0x` followed by 40 lowercase hex
//! characters.
//!
//! Instance addresses are derived deterministically from the deploying
//! account and its deployment nonce (see [`Address::derive`]), so replaying
//! the same sequence of calls always yields the same addresses.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::ADDRESS_DERIVATION_TAG;
use crate::error::AddressError;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The zero address. Never a valid parent or owner.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    /// Create an address from raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Derive the address of an instance deployed by `deployer` at `nonce`.
    ///
    /// `BLAKE3(tag || deployer || nonce_le)` truncated to 20 bytes. Distinct
    /// `(deployer, nonce)` pairs give distinct addresses with overwhelming
    /// probability.
    pub fn derive(deployer: &Address, nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ADDRESS_DERIVATION_TAG);
        hasher.update(deployer.as_bytes());
        hasher.update(&nonce.to_le_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&digest.as_bytes()[..ADDRESS_LEN]);
        Self(out)
    }

    /// Encode as `0x`-prefixed lowercase hex.
    pub fn encode(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Decode from hex, with or without the `0x` prefix. Case-insensitive.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if body.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength(body.len()));
        }
        let bytes = hex::decode(body).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}
