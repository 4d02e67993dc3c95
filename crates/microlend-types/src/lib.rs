//! # microlend-types
//!
//! Shared types, errors, and configuration for the **MicroLend**
//! collateral-backed lending ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Identity`], [`LoanId`], [`ReceiptId`], [`Timestamp`]
//! - **Roles**: [`Role`]
//! - **Loan model**: [`Loan`], [`LoanState`], [`LoanDetail`]
//! - **Client model**: [`ClientRecord`]
//! - **Events**: [`LoanEvent`], [`EventReceipt`]
//! - **Configuration**: [`LedgerConfig`]
//! - **Errors**: [`MicrolendError`] with `ML_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod loan;
pub mod role;

// Re-export all primary types at crate root for ergonomic imports:
//   use microlend_types::{Identity, Loan, LoanState, MicrolendError, ...};

pub use client::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use loan::*;
pub use role::*;

// Constants are accessed via `microlend_types::constants::FOO`
// (not re-exported to avoid name collisions).
