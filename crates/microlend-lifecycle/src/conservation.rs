//! Collateral conservation invariant checker.
//!
//! Mathematical invariant that must hold after every committed operation:
//! ```text
//! Σ(client collateral) == Σ(deposits) - Σ(repayments)
//! custody.held          == Σ(client collateral)      (when custody reports it)
//! ```
//!
//! Liquidation moves no value, so it never appears in either sum.

use microlend_types::{MicrolendError, Result};

/// Running totals of value that entered and left the collateral pool.
#[derive(Debug, Clone, Default)]
pub struct CollateralConservation {
    deposited: u128,
    repaid: u128,
}

impl CollateralConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, amount: u64) {
        self.deposited += u128::from(amount);
    }

    pub fn record_repayment(&mut self, amount: u64) {
        self.repaid += u128::from(amount);
    }

    #[must_use]
    pub fn total_deposited(&self) -> u128 {
        self.deposited
    }

    #[must_use]
    pub fn total_repaid(&self) -> u128 {
        self.repaid
    }

    /// Deposits minus repayments.
    ///
    /// # Errors
    /// Returns `CollateralInvariantViolation` if more was repaid than deposited.
    pub fn expected(&self) -> Result<u128> {
        self.deposited.checked_sub(self.repaid).ok_or_else(|| {
            MicrolendError::CollateralInvariantViolation {
                reason: format!(
                    "repaid {} exceeds deposited {}",
                    self.repaid, self.deposited
                ),
            }
        })
    }

    /// Compare the ledger's actual totals with the running sums.
    ///
    /// # Errors
    /// Returns [`MicrolendError::CollateralInvariantViolation`] on any mismatch.
    pub fn verify(&self, total_collateral: u128, custody_held: Option<u64>) -> Result<()> {
        let expected = self.expected()?;
        if total_collateral != expected {
            return Err(MicrolendError::CollateralInvariantViolation {
                reason: format!(
                    "actual collateral {total_collateral} != expected {expected} \
                     (deposited={}, repaid={})",
                    self.deposited, self.repaid
                ),
            });
        }
        if let Some(held) = custody_held {
            if u128::from(held) != total_collateral {
                return Err(MicrolendError::CollateralInvariantViolation {
                    reason: format!("custody holds {held}, ledger records {total_collateral}"),
                });
            }
        }
        Ok(())
    }
}
