//! # Loan: the lifecycle record
//!
//! A loan is immutable after creation except for its state, which only
//! ever moves forward:
//!
//! ```text
//!   ┌───────────┐  approve   ┌──────────┐  repay   ┌────────┐
//!   │ REQUESTED ├───────────▶│ APPROVED ├─────────▶│ REPAID │
//!   └───────────┘            └────┬─────┘          └────────┘
//!                                 │ liquidate (after deadline)
//!                                 ▼
//!                           ┌────────────┐
//!                           │ LIQUIDATED │
//!                           └────────────┘
//! ```
//!
//! REPAID and LIQUIDATED are terminal. There is no path from REQUESTED
//! directly to a terminal state. The older three-flag view
//! (`approved`, `repaid`, `liquidated`) is derived from the state and
//! exposed through [`LoanDetail`].

use serde::{Deserialize, Serialize};

use crate::{Identity, LoanId, MicrolendError, Result, Timestamp, constants};

/// The lifecycle state of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanState {
    /// Requested by the borrower, awaiting an officer.
    Requested,
    /// Approved by an officer; repayable, and liquidatable once overdue.
    Approved,
    /// Repaid by the borrower. **Terminal.**
    Repaid,
    /// Recorded as liquidated after the deadline passed unpaid. **Terminal.**
    Liquidated,
}

impl LoanState {
    /// Can a loan in this state move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Requested, Self::Approved) | (Self::Approved, Self::Repaid | Self::Liquidated)
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Repaid | Self::Liquidated)
    }
}

impl std::fmt::Display for LoanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "REQUESTED"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Repaid => write!(f, "REPAID"),
            Self::Liquidated => write!(f, "LIQUIDATED"),
        }
    }
}

/// A single collateral-backed loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    /// Principal amount in the native currency's smallest unit.
    pub amount: u64,
    pub term_hours: u64,
    pub requested_at: Timestamp,
    /// `requested_at + term_hours * 3600`.
    pub deadline: Timestamp,
    pub borrower: Identity,
    pub state: LoanState,
}

impl Loan {
    /// Create a loan in REQUESTED state.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the deadline does not fit in a `u64`.
    pub fn new(
        id: LoanId,
        borrower: Identity,
        amount: u64,
        term_hours: u64,
        requested_at: Timestamp,
    ) -> Result<Self> {
        let deadline = term_hours
            .checked_mul(constants::SECONDS_PER_HOUR)
            .and_then(|term| requested_at.checked_add(term))
            .ok_or(MicrolendError::ArithmeticOverflow)?;
        Ok(Self {
            id,
            amount,
            term_hours,
            requested_at,
            deadline,
            borrower,
            state: LoanState::Requested,
        })
    }

    #[must_use]
    pub fn term_seconds(&self) -> u64 {
        self.deadline - self.requested_at
    }

    /// Strictly after the deadline.
    #[must_use]
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        now > self.deadline
    }

    /// Approved, unpaid and overdue.
    #[must_use]
    pub fn is_liquidatable(&self, now: Timestamp) -> bool {
        self.state == LoanState::Approved && self.is_overdue(now)
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.state != LoanState::Requested
    }

    #[must_use]
    pub fn is_repaid(&self) -> bool {
        self.state == LoanState::Repaid
    }

    #[must_use]
    pub fn is_liquidated(&self) -> bool {
        self.state == LoanState::Liquidated
    }

    /// REQUESTED → APPROVED.
    ///
    /// # Errors
    /// Returns `InvalidOrAlreadyApproved` from any other state.
    pub fn mark_approved(&mut self) -> Result<()> {
        if !self.state.can_transition_to(LoanState::Approved) {
            return Err(MicrolendError::InvalidOrAlreadyApproved(self.id));
        }
        self.state = LoanState::Approved;
        Ok(())
    }

    /// APPROVED → REPAID.
    ///
    /// # Errors
    /// Returns `InvalidRepaymentState` from any other state.
    pub fn mark_repaid(&mut self) -> Result<()> {
        if !self.state.can_transition_to(LoanState::Repaid) {
            return Err(MicrolendError::InvalidRepaymentState(self.id));
        }
        self.state = LoanState::Repaid;
        Ok(())
    }

    /// APPROVED → LIQUIDATED, only strictly after the deadline.
    ///
    /// # Errors
    /// Returns `LiquidationNotPermitted` if not approved-and-unpaid or not overdue.
    pub fn mark_liquidated(&mut self, now: Timestamp) -> Result<()> {
        if !self.state.can_transition_to(LoanState::Liquidated) || !self.is_overdue(now) {
            return Err(MicrolendError::LiquidationNotPermitted(self.id));
        }
        self.state = LoanState::Liquidated;
        Ok(())
    }

    /// Flat view with the derived three-flag representation.
    #[must_use]
    pub fn detail(&self) -> LoanDetail {
        LoanDetail {
            id: self.id,
            amount: self.amount,
            term_seconds: self.term_seconds(),
            requested_at: self.requested_at,
            deadline: self.deadline,
            borrower: self.borrower,
            approved: self.is_approved(),
            repaid: self.is_repaid(),
            liquidated: self.is_liquidated(),
        }
    }
}

/// Flat, getter-style view of a loan.
///
/// Lookups of unknown ids return `LoanDetail::default()`: every field zero
/// or `false`. Callers treat `id == LoanId::NONE` as "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDetail {
    pub id: LoanId,
    pub amount: u64,
    pub term_seconds: u64,
    pub requested_at: Timestamp,
    pub deadline: Timestamp,
    pub borrower: Identity,
    pub approved: bool,
    pub repaid: bool,
    pub liquidated: bool,
}

impl Default for LoanDetail {
    fn default() -> Self {
        Self {
            id: LoanId::NONE,
            amount: 0,
            term_seconds: 0,
            requested_at: 0,
            deadline: 0,
            borrower: Identity::ZERO,
            approved: false,
            repaid: false,
            liquidated: false,
        }
    }
}

impl LoanDetail {
    /// Whether this is the "not found" value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_loan() -> Loan {
        Loan::new(LoanId(1), Identity::from_index(5), 100, 1, 1_000).unwrap()
    }

    #[test]
    fn new_loan_computes_deadline() {
        let loan = make_loan();
        assert_eq!(loan.state, LoanState::Requested);
        assert_eq!(loan.deadline, 1_000 + 3600);
        assert_eq!(loan.term_seconds(), 3600);
    }

    #[test]
    fn deadline_overflow_rejected() {
        let err = Loan::new(LoanId(1), Identity::from_index(5), 1, u64::MAX, 0).unwrap_err();
        assert!(matches!(err, MicrolendError::ArithmeticOverflow));

        let err = Loan::new(LoanId(1), Identity::from_index(5), 1, 1, u64::MAX - 10).unwrap_err();
        assert!(matches!(err, MicrolendError::ArithmeticOverflow));
    }

    #[test]
    fn state_transitions_valid() {
        assert!(LoanState::Requested.can_transition_to(LoanState::Approved));
        assert!(LoanState::Approved.can_transition_to(LoanState::Repaid));
        assert!(LoanState::Approved.can_transition_to(LoanState::Liquidated));
    }

    #[test]
    fn state_transitions_invalid() {
        assert!(!LoanState::Requested.can_transition_to(LoanState::Repaid));
        assert!(!LoanState::Requested.can_transition_to(LoanState::Liquidated));
        assert!(!LoanState::Approved.can_transition_to(LoanState::Requested));
        assert!(!LoanState::Repaid.can_transition_to(LoanState::Liquidated));
        assert!(!LoanState::Liquidated.can_transition_to(LoanState::Repaid));
        assert!(!LoanState::Liquidated.can_transition_to(LoanState::Approved));
    }

    #[test]
    fn double_approval_blocked() {
        let mut loan = make_loan();
        loan.mark_approved().unwrap();
        let err = loan.mark_approved().unwrap_err();
        assert!(matches!(err, MicrolendError::InvalidOrAlreadyApproved(LoanId(1))));
    }

    #[test]
    fn repay_requires_approval() {
        let mut loan = make_loan();
        let err = loan.mark_repaid().unwrap_err();
        assert!(matches!(err, MicrolendError::InvalidRepaymentState(_)));
        assert_eq!(loan.state, LoanState::Requested);
    }

    #[test]
    fn liquidation_only_strictly_after_deadline() {
        let mut loan = make_loan();
        loan.mark_approved().unwrap();
        assert!(loan.mark_liquidated(loan.deadline).is_err());
        assert_eq!(loan.state, LoanState::Approved);
        loan.mark_liquidated(loan.deadline + 1).unwrap();
        assert_eq!(loan.state, LoanState::Liquidated);
    }

    #[test]
    fn liquidated_loan_cannot_be_repaid_or_reliquidated() {
        let mut loan = make_loan();
        loan.mark_approved().unwrap();
        loan.mark_liquidated(loan.deadline + 1).unwrap();
        assert!(loan.mark_repaid().is_err());
        assert!(loan.mark_liquidated(loan.deadline + 2).is_err());
    }

    #[test]
    fn detail_derives_flags() {
        let mut loan = make_loan();
        let d = loan.detail();
        assert!(!d.approved && !d.repaid && !d.liquidated);

        loan.mark_approved().unwrap();
        loan.mark_repaid().unwrap();
        let d = loan.detail();
        assert!(d.approved && d.repaid && !d.liquidated);
        assert_eq!(d.term_seconds, 3600);
        assert_eq!(d.borrower, Identity::from_index(5));
    }

    #[test]
    fn default_detail_is_not_found() {
        let d = LoanDetail::default();
        assert!(d.is_empty());
        assert!(d.borrower.is_zero());
        assert_eq!(d.amount, 0);
    }
}
