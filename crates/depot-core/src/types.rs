//! Small value types shared by the ledgers and the custody state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TransferError;

/// Computation budget forwarded to a recipient along with a value transfer.
///
/// Receiving logic has a cost. A transfer made with a limited budget fails
/// with [`TransferError::OutOfBudget`] when the recipient's receive cost is
/// larger than what was forwarded.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    /// Everything the caller has; top-level calls run unlimited.
    #[default]
    Unlimited,
    /// A fixed stipend.
    Limited(u64),
}

impl Budget {
    /// Whether this budget can pay for `cost`.
    pub fn covers(&self, cost: u64) -> bool {
        match self {
            Budget::Unlimited => true,
            Budget::Limited(available) => *available >= cost,
        }
    }

    /// Pay `cost` out of this budget, returning what remains.
    pub fn consume(self, cost: u64) -> Result<Budget, TransferError> {
        match self {
            Budget::Unlimited => Ok(Budget::Unlimited),
            Budget::Limited(available) => available
                .checked_sub(cost)
                .map(Budget::Limited)
                .ok_or(TransferError::OutOfBudget {
                    needed: cost,
                    available,
                }),
        }
    }

    /// Cap this budget at `stipend`.
    pub fn cap(self, stipend: u64) -> Budget {
        match self {
            Budget::Unlimited => Budget::Limited(stipend),
            Budget::Limited(available) => Budget::Limited(available.min(stipend)),
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Budget::Unlimited => f.write_str("unlimited"),
            Budget::Limited(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_covers_everything() {
        assert!(Budget::Unlimited.covers(u64::MAX));
        assert_eq!(Budget::Unlimited.consume(u64::MAX), Ok(Budget::Unlimited));
    }

    #[test]
    fn limited_consume() {
        assert_eq!(Budget::Limited(10).consume(4), Ok(Budget::Limited(6)));
        assert_eq!(
            Budget::Limited(3).consume(4),
            Err(TransferError::OutOfBudget {
                needed: 4,
                available: 3
            })
        );
        assert!(Budget::Limited(4).covers(4));
        assert!(!Budget::Limited(4).covers(5));
    }

    #[test]
    fn cap_never_raises() {
        assert_eq!(Budget::Unlimited.cap(100), Budget::Limited(100));
        assert_eq!(Budget::Limited(50).cap(100), Budget::Limited(50));
        assert_eq!(Budget::Limited(500).cap(100), Budget::Limited(100));
    }

    #[test]
    fn display() {
        assert_eq!(Budget::Unlimited.to_string(), "unlimited");
        assert_eq!(Budget::Limited(2300).to_string(), "2300");
    }
}
