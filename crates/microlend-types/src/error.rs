//! Error types for the MicroLend ledger.
//!
//! All errors use the `ML_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Access / role errors
//! - 2xx: Collateral errors
//! - 3xx: Loan lifecycle errors
//! - 4xx: Custody (value transfer) errors
//! - 6xx: Event journal errors
//! - 8xx: Invariant violations
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Identity, LoanId, Role};

/// Central error enum for all MicroLend operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MicrolendError {
    // =================================================================
    // Access Errors (1xx)
    // =================================================================
    /// The caller does not hold the role the operation requires.
    #[error("ML_ERR_100: Unauthorized: {caller} is not {required}")]
    Unauthorized { caller: Identity, required: Role },

    /// The target identity already holds officer rights.
    #[error("ML_ERR_101: Officer already granted: {0}")]
    AlreadyGranted(Identity),

    /// The target identity is already an activated client.
    #[error("ML_ERR_102: Client already activated: {0}")]
    AlreadyActivated(Identity),

    /// The zero identity cannot be given any role.
    #[error("ML_ERR_103: The zero identity is reserved")]
    ReservedIdentity,

    // =================================================================
    // Collateral Errors (2xx)
    // =================================================================
    /// Deposit amount must be strictly positive.
    #[error("ML_ERR_200: Invalid amount: must be greater than zero")]
    InvalidAmount,

    /// The client's posted collateral does not cover the amount.
    #[error("ML_ERR_201: Insufficient collateral: need {needed}, have {available}")]
    InsufficientCollateral { needed: u64, available: u64 },

    /// Checked arithmetic overflowed or underflowed.
    #[error("ML_ERR_202: Arithmetic overflow")]
    ArithmeticOverflow,

    // =================================================================
    // Loan Lifecycle Errors (3xx)
    // =================================================================
    /// The loan does not exist or has already left the REQUESTED state.
    #[error("ML_ERR_300: Loan {0} does not exist or is already approved")]
    InvalidOrAlreadyApproved(LoanId),

    /// The loan cannot be repaid by this caller in its current state.
    #[error("ML_ERR_301: Loan {0} is not in a repayable state")]
    InvalidRepaymentState(LoanId),

    /// The loan is not approved-and-unpaid, or its deadline has not passed.
    #[error("ML_ERR_302: Liquidation not permitted for loan {0}")]
    LiquidationNotPermitted(LoanId),

    // =================================================================
    // Custody Errors (4xx)
    // =================================================================
    /// Moving native value into or out of ledger custody failed.
    #[error("ML_ERR_400: Custody transfer failed: {reason}")]
    CustodyTransferFailed { reason: String },

    // =================================================================
    // Journal Errors (6xx)
    // =================================================================
    /// An event receipt's hash or signature did not verify.
    #[error("ML_ERR_600: Receipt verification failed: {reason}")]
    ReceiptVerificationFailed { reason: String },

    // =================================================================
    // Invariant Errors (8xx)
    // =================================================================
    /// Collateral conservation invariant violated. Critical safety alert.
    #[error("ML_ERR_800: Collateral invariant violation: {reason}")]
    CollateralInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("ML_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("ML_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("ML_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl MicrolendError {
    /// The `ML_ERR_` code of this error, for structured log fields.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "ML_ERR_100",
            Self::AlreadyGranted(_) => "ML_ERR_101",
            Self::AlreadyActivated(_) => "ML_ERR_102",
            Self::ReservedIdentity => "ML_ERR_103",
            Self::InvalidAmount => "ML_ERR_200",
            Self::InsufficientCollateral { .. } => "ML_ERR_201",
            Self::ArithmeticOverflow => "ML_ERR_202",
            Self::InvalidOrAlreadyApproved(_) => "ML_ERR_300",
            Self::InvalidRepaymentState(_) => "ML_ERR_301",
            Self::LiquidationNotPermitted(_) => "ML_ERR_302",
            Self::CustodyTransferFailed { .. } => "ML_ERR_400",
            Self::ReceiptVerificationFailed { .. } => "ML_ERR_600",
            Self::CollateralInvariantViolation { .. } => "ML_ERR_800",
            Self::Internal(_) => "ML_ERR_900",
            Self::Serialization(_) => "ML_ERR_901",
            Self::Configuration(_) => "ML_ERR_902",
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, MicrolendError>;

impl From<serde_json::Error> for MicrolendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
