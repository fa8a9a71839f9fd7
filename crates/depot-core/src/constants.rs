//! Protocol constants. All amounts are in the smallest indivisible unit.

/// Domain separation tag for instance address derivation.
pub const ADDRESS_DERIVATION_TAG: &[u8] = b"depot/instance-address/v1";

/// Budget forwarded with an automatic deposit forward.
///
/// Enough to run a wallet's receive logic, not enough for a forwarder that
/// would itself try to forward again.
pub const DEFAULT_FORWARD_STIPEND: u64 = 2_300;

/// Budget consumed by a wallet's receive logic (one event).
pub const DEFAULT_WALLET_RECEIVE_COST: u64 = 1_500;

/// Budget consumed by a forwarder's receive logic (two events).
pub const DEFAULT_FORWARDER_RECEIVE_COST: u64 = 3_000;

/// Upper bound on `n` for a single batch forwarder creation.
pub const DEFAULT_MAX_BATCH: u32 = 256;

/// Maximum nesting of value transfers within one top-level call.
pub const MAX_CALL_DEPTH: usize = 64;
