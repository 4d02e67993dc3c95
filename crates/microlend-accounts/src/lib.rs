//! # microlend-accounts
//!
//! **Account plane**: who may act, and how much collateral they have posted.
//!
//! ## Components
//!
//! 1. **AccessRegistry**: the principal, the officer set and the
//!    activated-client set; gates every mutating operation
//! 2. **CollateralLedger**: per-client collateral balances with checked
//!    arithmetic; never negative, never wraps
//! 3. **ValueCustody**: moves native value into custody on deposit and out
//!    to the principal on repayment
//!
//! ## Deposit Flow
//!
//! ```text
//! deposit → amount > 0 → AccessRegistry.require_client()
//!         → checked_add → ValueCustody.receive() → balance committed
//! ```

pub mod access_registry;
pub mod collateral_ledger;
pub mod custody;

pub use access_registry::AccessRegistry;
pub use collateral_ledger::CollateralLedger;
#[cfg(any(test, feature = "test-helpers"))]
pub use custody::RejectingCustody;
pub use custody::{InMemoryCustody, ValueCustody};
