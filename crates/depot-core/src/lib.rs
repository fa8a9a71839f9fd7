//! # depot-core
//! Foundation types and traits for Depot custody: addresses, events,
//! transfer-primitive interfaces, and their in-memory ledgers.

pub mod address;
pub mod constants;
pub mod error;
pub mod events;
pub mod ledger;
pub mod token;
pub mod traits;
pub mod types;

pub use address::Address;
pub use error::{AddressError, TransferError};
pub use events::{Event, EventLog, LogEntry};
pub use ledger::MemoryLedger;
pub use token::MemoryTokenLedger;
pub use traits::{TokenLedger, ValueTransfer};
pub use types::Budget;
