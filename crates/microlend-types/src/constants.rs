//! System-wide constants for the MicroLend ledger.

/// Seconds in one loan-term hour.
pub const SECONDS_PER_HOUR: u64 = 3600;

/// The first loan id ever issued. `0` is reserved for "does not exist".
pub const FIRST_LOAN_ID: u64 = 1;

/// Default buffer size of the broadcast event sink.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Domain separator prefixed to every receipt signing payload.
pub const RECEIPT_DOMAIN: &[u8] = b"microlend:receipt:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ledger name.
pub const LEDGER_NAME: &str = "MicroLend";
