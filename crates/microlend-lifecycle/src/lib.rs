//! # microlend-lifecycle
//!
//! **Lifecycle plane**: loan state machine, collateral conservation, signed
//! event receipts, and the serialized [`LendingService`] tying the planes
//! together.
//!
//! ## Loan Lifecycle
//!
//! ```text
//! request ──→ REQUESTED ──approve──→ APPROVED ──repay──────→ REPAID
//!                                        │
//!                                        └──liquidate (overdue)──→ LIQUIDATED
//! ```
//!
//! Each operation:
//! 1. Checks the caller's role against the `AccessRegistry`
//! 2. Validates state, collateral coverage and deadline
//! 3. Moves value through `ValueCustody` (deposit and repay only)
//! 4. Commits, then publishes a signed [`EventReceipt`](microlend_types::EventReceipt)
//!
//! A rejected operation changes nothing and publishes nothing.

pub mod clock;
pub mod conservation;
pub mod journal;
pub mod loan_book;
pub mod service;
pub mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use conservation::CollateralConservation;
pub use journal::{BroadcastSink, EventSink, MemoryJournal, ReceiptSigner};
pub use loan_book::LoanBook;
pub use service::LendingService;
pub use snapshot::LedgerSnapshot;
