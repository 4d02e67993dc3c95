//! The loan lifecycle state machine.
//!
//! Each operation runs its checks in a fixed order and touches nothing
//! until every check has passed:
//!
//! 1. Role gate (AccessRegistry)
//! 2. Loan existence and state guard
//! 3. Collateral / time guard
//! 4. External value transfer (repayment only)
//! 5. Commit: collateral debit, state transition
//!
//! On success an operation returns the [`LoanEvent`] describing what was
//! committed. Loans are never deleted.

use std::collections::{BTreeMap, HashMap};

use microlend_accounts::{AccessRegistry, CollateralLedger, ValueCustody};
use microlend_types::{
    Identity, Loan, LoanDetail, LoanEvent, LoanId, LoanState, MicrolendError, Result, Timestamp,
    constants,
};

/// Owns every loan ever requested, plus the per-borrower request order.
#[derive(Debug, Clone)]
pub struct LoanBook {
    loans: BTreeMap<LoanId, Loan>,
    /// Loan ids per borrower, in request order.
    by_borrower: HashMap<Identity, Vec<LoanId>>,
    /// The id the next successful request receives.
    next_id: LoanId,
}

impl LoanBook {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loans: BTreeMap::new(),
            by_borrower: HashMap::new(),
            next_id: LoanId(constants::FIRST_LOAN_ID),
        }
    }

    /// Record a new loan request.
    ///
    /// Collateral is checked, not locked. Only a successful request
    /// consumes an id.
    ///
    /// # Errors
    /// - `Unauthorized` if `borrower` is not an activated client
    /// - `InsufficientCollateral` if posted collateral is below `amount`
    /// - `ArithmeticOverflow` if the deadline or the id space overflows
    pub fn request_loan(
        &mut self,
        registry: &AccessRegistry,
        collateral: &CollateralLedger,
        borrower: Identity,
        amount: u64,
        term_hours: u64,
        now: Timestamp,
    ) -> Result<LoanEvent> {
        registry.require_client(borrower)?;
        collateral.ensure_covers(borrower, amount)?;

        let id = self.next_id;
        let following = id.next().ok_or(MicrolendError::ArithmeticOverflow)?;
        let loan = Loan::new(id, borrower, amount, term_hours, now)?;

        self.loans.insert(id, loan);
        self.by_borrower.entry(borrower).or_default().push(id);
        self.next_id = following;

        Ok(LoanEvent::LoanRequested {
            id,
            borrower,
            amount,
            term_hours,
        })
    }

    /// REQUESTED → APPROVED. Moves no collateral.
    ///
    /// # Errors
    /// - `Unauthorized` if `officer` is not an officer
    /// - `InvalidOrAlreadyApproved` if the loan does not exist or is past REQUESTED
    pub fn approve_loan(
        &mut self,
        registry: &AccessRegistry,
        officer: Identity,
        loan_id: LoanId,
    ) -> Result<LoanEvent> {
        registry.require_officer(officer)?;

        let loan = self
            .loans
            .get_mut(&loan_id)
            .filter(|loan| !loan.borrower.is_zero())
            .ok_or(MicrolendError::InvalidOrAlreadyApproved(loan_id))?;
        loan.mark_approved()?;

        Ok(LoanEvent::LoanApproved {
            id: loan.id,
            borrower: loan.borrower,
            amount: loan.amount,
        })
    }

    /// APPROVED → REPAID: debit the borrower's collateral and forward the
    /// loan amount from custody to the principal.
    ///
    /// The transfer happens before the commit, and only after every check
    /// passed; if custody refuses it, balance and state are untouched.
    ///
    /// # Errors
    /// - `Unauthorized` if `borrower` is not an activated client
    /// - `InvalidRepaymentState` if the loan does not exist, belongs to
    ///   someone else, or is not APPROVED
    /// - `InsufficientCollateral` if posted collateral is below the amount
    /// - `CustodyTransferFailed` if the outward transfer fails
    pub fn repay_loan(
        &mut self,
        registry: &AccessRegistry,
        collateral: &mut CollateralLedger,
        custody: &mut dyn ValueCustody,
        borrower: Identity,
        loan_id: LoanId,
    ) -> Result<LoanEvent> {
        registry.require_client(borrower)?;

        let amount = self
            .loans
            .get(&loan_id)
            .filter(|loan| {
                loan.borrower == borrower && loan.state.can_transition_to(LoanState::Repaid)
            })
            .map(|loan| loan.amount)
            .ok_or(MicrolendError::InvalidRepaymentState(loan_id))?;
        collateral.ensure_covers(borrower, amount)?;

        custody.forward(registry.principal(), amount)?;

        collateral.debit(borrower, amount)?;
        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(MicrolendError::InvalidRepaymentState(loan_id))?;
        loan.mark_repaid()?;

        Ok(LoanEvent::LoanRepaid {
            id: loan_id,
            borrower,
            amount,
        })
    }

    /// APPROVED → LIQUIDATED, strictly after the deadline.
    ///
    /// Records the status only: no collateral is debited and no value moves.
    ///
    /// # Errors
    /// - `Unauthorized` if `officer` is not an officer
    /// - `LiquidationNotPermitted` if the loan does not exist, is not
    ///   APPROVED, or `now <= deadline`
    pub fn liquidate_collateral(
        &mut self,
        registry: &AccessRegistry,
        officer: Identity,
        loan_id: LoanId,
        now: Timestamp,
    ) -> Result<LoanEvent> {
        registry.require_officer(officer)?;

        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(MicrolendError::LiquidationNotPermitted(loan_id))?;
        let elapsed_seconds = now
            .checked_sub(loan.requested_at)
            .ok_or(MicrolendError::LiquidationNotPermitted(loan_id))?;
        loan.mark_liquidated(now)?;

        Ok(LoanEvent::CollateralLiquidated {
            id: loan.id,
            borrower: loan.borrower,
            elapsed_seconds,
        })
    }

    /// Getter-style view. Unknown ids yield the all-zero detail.
    #[must_use]
    pub fn loan_detail(&self, loan_id: LoanId) -> LoanDetail {
        self.loans
            .get(&loan_id)
            .map(Loan::detail)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn loan(&self, loan_id: LoanId) -> Option<&Loan> {
        self.loans.get(&loan_id)
    }

    /// All loans in ascending id order.
    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values()
    }

    /// Loan ids of `borrower`, in request order.
    #[must_use]
    pub fn loan_ids(&self, borrower: Identity) -> &[LoanId] {
        self.by_borrower
            .get(&borrower)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn is_liquidatable(&self, loan_id: LoanId, now: Timestamp) -> bool {
        self.loans
            .get(&loan_id)
            .is_some_and(|loan| loan.is_liquidatable(now))
    }

    #[must_use]
    pub fn next_loan_id(&self) -> LoanId {
        self.next_id
    }

    /// Number of loans ever requested.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    /// Number of loans currently in `state`.
    #[must_use]
    pub fn count_in_state(&self, state: LoanState) -> usize {
        self.loans.values().filter(|loan| loan.state == state).count()
    }
}

impl Default for LoanBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use microlend_accounts::{InMemoryCustody, RejectingCustody};

    const T0: Timestamp = 1_700_000_000;

    struct Fixture {
        book: LoanBook,
        registry: AccessRegistry,
        collateral: CollateralLedger,
        custody: InMemoryCustody,
        principal: Identity,
        officer: Identity,
        client: Identity,
    }

    fn setup(deposit: u64) -> Fixture {
        let principal = Identity::from_index(1);
        let officer = Identity::from_index(2);
        let client = Identity::from_index(3);
        let mut registry = AccessRegistry::new(principal).unwrap();
        registry.grant_officer(principal, officer).unwrap();
        registry.activate_client(officer, client).unwrap();
        let mut collateral = CollateralLedger::new();
        collateral.open_account(client);
        let mut custody = InMemoryCustody::new();
        custody.fund(client, 1_000_000).unwrap();
        if deposit > 0 {
            collateral
                .deposit(&registry, &mut custody, client, deposit)
                .unwrap();
        }
        Fixture {
            book: LoanBook::new(),
            registry,
            collateral,
            custody,
            principal,
            officer,
            client,
        }
    }

    impl Fixture {
        fn request(&mut self, amount: u64, term_hours: u64) -> Result<LoanId> {
            let event = self.book.request_loan(
                &self.registry,
                &self.collateral,
                self.client,
                amount,
                term_hours,
                T0,
            )?;
            Ok(event.loan_id().unwrap())
        }

        fn repay(&mut self, loan_id: LoanId) -> Result<LoanEvent> {
            self.book.repay_loan(
                &self.registry,
                &mut self.collateral,
                &mut self.custody,
                self.client,
                loan_id,
            )
        }
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut f = setup(100);
        assert_eq!(f.request(10, 1).unwrap(), LoanId(1));
        assert_eq!(f.request(10, 1).unwrap(), LoanId(2));
        assert_eq!(f.book.next_loan_id(), LoanId(3));
        assert_eq!(f.book.loan_ids(f.client), &[LoanId(1), LoanId(2)]);
    }

    #[test]
    fn failed_request_consumes_no_id() {
        let mut f = setup(100);
        let err = f.request(101, 1).unwrap_err();
        assert!(matches!(
            err,
            MicrolendError::InsufficientCollateral {
                needed: 101,
                available: 100
            }
        ));
        let err = f.request(1, u64::MAX).unwrap_err();
        assert!(matches!(err, MicrolendError::ArithmeticOverflow));
        assert_eq!(f.request(100, 1).unwrap(), LoanId(1));
        assert_eq!(f.book.len(), 1);
    }

    #[test]
    fn request_requires_activated_client() {
        let mut f = setup(100);
        let err = f
            .book
            .request_loan(&f.registry, &f.collateral, f.officer, 1, 1, T0)
            .unwrap_err();
        assert!(matches!(err, MicrolendError::Unauthorized { .. }));
        assert!(f.book.is_empty());
    }

    #[test]
    fn request_records_deadline_and_event() {
        let mut f = setup(100);
        let event = f
            .book
            .request_loan(&f.registry, &f.collateral, f.client, 100, 2, T0)
            .unwrap();
        assert_eq!(
            event,
            LoanEvent::LoanRequested {
                id: LoanId(1),
                borrower: f.client,
                amount: 100,
                term_hours: 2,
            }
        );
        let detail = f.book.loan_detail(LoanId(1));
        assert_eq!(detail.requested_at, T0);
        assert_eq!(detail.deadline, T0 + 7200);
        assert_eq!(detail.term_seconds, 7200);
    }

    #[test]
    fn requests_are_check_only_not_escrowed() {
        let mut f = setup(100);
        f.request(100, 1).unwrap();
        f.request(100, 1).unwrap();
        assert_eq!(f.collateral.balance(f.client), 100);
    }

    #[test]
    fn approve_by_non_officer_leaves_state() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        let err = f.book.approve_loan(&f.registry, f.client, id).unwrap_err();
        assert!(matches!(err, MicrolendError::Unauthorized { .. }));
        assert_eq!(f.book.loan(id).unwrap().state, LoanState::Requested);
    }

    #[test]
    fn approve_twice_fails() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, id).unwrap();
        let err = f.book.approve_loan(&f.registry, f.officer, id).unwrap_err();
        assert!(matches!(err, MicrolendError::InvalidOrAlreadyApproved(i) if i == id));
    }

    #[test]
    fn approve_unknown_loan_fails() {
        let mut f = setup(0);
        for id in [LoanId::NONE, LoanId(7)] {
            let err = f.book.approve_loan(&f.registry, f.principal, id).unwrap_err();
            assert!(matches!(err, MicrolendError::InvalidOrAlreadyApproved(_)));
        }
    }

    #[test]
    fn repay_without_approval_fails() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        let err = f.repay(id).unwrap_err();
        assert!(matches!(err, MicrolendError::InvalidRepaymentState(i) if i == id));
        assert_eq!(f.collateral.balance(f.client), 100);
    }

    #[test]
    fn repay_debits_and_forwards_to_principal() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, id).unwrap();
        let event = f.repay(id).unwrap();
        assert_eq!(
            event,
            LoanEvent::LoanRepaid {
                id,
                borrower: f.client,
                amount: 100
            }
        );
        assert_eq!(f.collateral.balance(f.client), 0);
        assert_eq!(f.custody.external_balance(f.principal), 100);
        assert!(f.book.loan_detail(id).repaid);
    }

    #[test]
    fn repay_twice_fails() {
        let mut f = setup(200);
        let id = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, id).unwrap();
        f.repay(id).unwrap();
        let err = f.repay(id).unwrap_err();
        assert!(matches!(err, MicrolendError::InvalidRepaymentState(_)));
        assert_eq!(f.collateral.balance(f.client), 100);
    }

    #[test]
    fn repay_by_other_client_fails() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, id).unwrap();
        let other = Identity::from_index(4);
        f.registry.activate_client(f.officer, other).unwrap();
        let err = f
            .book
            .repay_loan(&f.registry, &mut f.collateral, &mut f.custody, other, id)
            .unwrap_err();
        assert!(matches!(err, MicrolendError::InvalidRepaymentState(_)));
    }

    #[test]
    fn over_requested_loans_cannot_all_be_repaid() {
        let mut f = setup(100);
        let a = f.request(100, 1).unwrap();
        let b = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, a).unwrap();
        f.book.approve_loan(&f.registry, f.officer, b).unwrap();
        f.repay(a).unwrap();
        let err = f.repay(b).unwrap_err();
        assert!(matches!(err, MicrolendError::InsufficientCollateral { .. }));
        assert_eq!(f.book.loan(b).unwrap().state, LoanState::Approved);
    }

    #[test]
    fn failed_transfer_leaves_balance_and_state() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, id).unwrap();

        let mut custody = RejectingCustody::new(InMemoryCustody::new());
        let err = f
            .book
            .repay_loan(&f.registry, &mut f.collateral, &mut custody, f.client, id)
            .unwrap_err();
        assert!(matches!(err, MicrolendError::CustodyTransferFailed { .. }));
        assert_eq!(f.collateral.balance(f.client), 100);
        assert_eq!(f.book.loan(id).unwrap().state, LoanState::Approved);
    }

    #[test]
    fn liquidation_before_deadline_fails() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, id).unwrap();
        let deadline = f.book.loan(id).unwrap().deadline;
        for now in [T0, deadline] {
            let err = f
                .book
                .liquidate_collateral(&f.registry, f.officer, id, now)
                .unwrap_err();
            assert!(matches!(err, MicrolendError::LiquidationNotPermitted(_)));
        }
        assert!(!f.book.is_liquidatable(id, deadline));
    }

    #[test]
    fn liquidation_after_deadline_records_status_only() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, id).unwrap();
        let now = T0 + 3601;
        assert!(f.book.is_liquidatable(id, now));

        let event = f
            .book
            .liquidate_collateral(&f.registry, f.officer, id, now)
            .unwrap();
        assert_eq!(
            event,
            LoanEvent::CollateralLiquidated {
                id,
                borrower: f.client,
                elapsed_seconds: 3601
            }
        );
        assert!(f.book.loan_detail(id).liquidated);
        assert_eq!(f.collateral.balance(f.client), 100);
        assert_eq!(f.custody.held(), Some(100));
    }

    #[test]
    fn liquidation_requires_approval() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        let err = f
            .book
            .liquidate_collateral(&f.registry, f.officer, id, T0 + 10_000)
            .unwrap_err();
        assert!(matches!(err, MicrolendError::LiquidationNotPermitted(_)));
    }

    #[test]
    fn repaid_loan_cannot_be_liquidated() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, id).unwrap();
        f.repay(id).unwrap();
        let err = f
            .book
            .liquidate_collateral(&f.registry, f.officer, id, T0 + 10_000)
            .unwrap_err();
        assert!(matches!(err, MicrolendError::LiquidationNotPermitted(_)));
    }

    #[test]
    fn liquidated_loan_cannot_be_repaid() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, id).unwrap();
        f.book
            .liquidate_collateral(&f.registry, f.officer, id, T0 + 3601)
            .unwrap();
        let err = f.repay(id).unwrap_err();
        assert!(matches!(err, MicrolendError::InvalidRepaymentState(_)));
        assert_eq!(f.book.count_in_state(LoanState::Liquidated), 1);
    }

    #[test]
    fn non_officer_cannot_liquidate() {
        let mut f = setup(100);
        let id = f.request(100, 1).unwrap();
        f.book.approve_loan(&f.registry, f.officer, id).unwrap();
        let err = f
            .book
            .liquidate_collateral(&f.registry, f.client, id, T0 + 3601)
            .unwrap_err();
        assert!(matches!(err, MicrolendError::Unauthorized { .. }));
    }

    #[test]
    fn unknown_loan_detail_is_zero() {
        let f = setup(0);
        assert_eq!(f.book.loan_detail(LoanId(42)), LoanDetail::default());
        assert!(f.book.loan_ids(f.client).is_empty());
    }
}
