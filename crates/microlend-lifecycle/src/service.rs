//! The lending service: one serialization boundary around the whole ledger.
//!
//! Every mutating operation holds the write lock from its first check to
//! the last published event, so operations are atomic and globally ordered.
//! Queries take the read lock and always see a consistent snapshot: never a
//! balance without the loan state it was committed with.
//!
//! ```text
//! caller → write lock → AccessRegistry gate → CollateralLedger / LoanBook
//!        → ValueCustody (deposit, repay) → commit → sign receipt → sinks
//! ```

use std::sync::Arc;

use microlend_accounts::{AccessRegistry, CollateralLedger, InMemoryCustody, ValueCustody};
use microlend_types::{
    ClientRecord, EventReceipt, Identity, LedgerConfig, Loan, LoanDetail, LoanEvent, LoanId,
    MicrolendError, Result, Timestamp,
};
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::{
    clock::Clock,
    conservation::CollateralConservation,
    journal::{BroadcastSink, EventSink, ReceiptSigner},
    loan_book::LoanBook,
    snapshot::LedgerSnapshot,
};

/// All mutable ledger state. Only ever touched under the service lock.
struct LedgerState<C> {
    registry: AccessRegistry,
    collateral: CollateralLedger,
    loans: LoanBook,
    custody: C,
    conservation: CollateralConservation,
    signer: ReceiptSigner,
}

/// A single long-lived ledger instance.
pub struct LendingService<C: ValueCustody = InMemoryCustody> {
    state: RwLock<LedgerState<C>>,
    clock: Arc<dyn Clock>,
    broadcast: BroadcastSink,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl<C: ValueCustody> LendingService<C> {
    /// Build a service from validated config.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(config: &LedgerConfig, custody: C, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let signer = match config.signing_seed_bytes()? {
            Some(seed) => ReceiptSigner::from_seed(seed),
            None => ReceiptSigner::generate(),
        };
        let registry = AccessRegistry::new(config.principal)?;

        tracing::info!(
            principal = %config.principal,
            issuer = %hex::encode(signer.issuer()),
            "lending service started"
        );

        Ok(Self {
            state: RwLock::new(LedgerState {
                registry,
                collateral: CollateralLedger::new(),
                loans: LoanBook::new(),
                custody,
                conservation: CollateralConservation::new(),
                signer,
            }),
            clock,
            broadcast: BroadcastSink::new(config.event_channel_capacity),
            sinks: Vec::new(),
        })
    }

    /// Attach an additional event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Subscribe to receipts published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventReceipt> {
        self.broadcast.subscribe()
    }

    /// Verifying key that signs this service's receipts.
    #[must_use]
    pub fn issuer(&self) -> [u8; 32] {
        self.state.read().signer.issuer()
    }

    // -----------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------

    pub fn grant_officer(&self, caller: Identity, target: Identity) -> Result<()> {
        let mut state = self.state.write();
        state
            .registry
            .grant_officer(caller, target)
            .inspect_err(|e| log_rejection("grant_officer", caller, e))?;

        tracing::info!(%caller, officer = %target, "officer granted");
        self.publish(&mut state, LoanEvent::OfficerGranted { officer: target });
        Ok(())
    }

    pub fn activate_client(&self, caller: Identity, target: Identity) -> Result<()> {
        let mut state = self.state.write();
        state
            .registry
            .activate_client(caller, target)
            .inspect_err(|e| log_rejection("activate_client", caller, e))?;
        state.collateral.open_account(target);

        tracing::info!(officer = %caller, client = %target, "client activated");
        self.publish(
            &mut state,
            LoanEvent::ClientActivated {
                client: target,
                officer: caller,
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------
    // Collateral
    // -----------------------------------------------------------------

    /// Move `amount` from the client's wallet into custody and credit it.
    /// Returns the new balance.
    pub fn deposit(&self, client: Identity, amount: u64) -> Result<u64> {
        let mut state = self.state.write();
        let LedgerState {
            registry,
            collateral,
            custody,
            conservation,
            ..
        } = &mut *state;
        let new_balance = collateral
            .deposit(registry, custody, client, amount)
            .inspect_err(|e| log_rejection("deposit", client, e))?;
        conservation.record_deposit(amount);

        tracing::info!(%client, amount, new_balance, "collateral deposited");
        self.publish(
            &mut state,
            LoanEvent::CollateralDeposited {
                client,
                amount,
                new_balance,
            },
        );
        Ok(new_balance)
    }

    // -----------------------------------------------------------------
    // Loan lifecycle
    // -----------------------------------------------------------------

    pub fn request_loan(&self, borrower: Identity, amount: u64, term_hours: u64) -> Result<LoanId> {
        let mut state = self.state.write();
        let now = self.clock.now();
        let LedgerState {
            registry,
            collateral,
            loans,
            ..
        } = &mut *state;
        let event = loans
            .request_loan(registry, collateral, borrower, amount, term_hours, now)
            .inspect_err(|e| log_rejection("request_loan", borrower, e))?;
        let id = event.loan_id().ok_or_else(|| {
            MicrolendError::Internal("LoanRequested event without a loan id".into())
        })?;

        tracing::info!(loan = %id, %borrower, amount, term_hours, "loan requested");
        self.publish(&mut state, event);
        Ok(id)
    }

    pub fn approve_loan(&self, officer: Identity, loan_id: LoanId) -> Result<()> {
        let mut state = self.state.write();
        let LedgerState {
            registry, loans, ..
        } = &mut *state;
        let event = loans
            .approve_loan(registry, officer, loan_id)
            .inspect_err(|e| log_rejection("approve_loan", officer, e))?;

        tracing::info!(loan = %loan_id, %officer, "loan approved");
        self.publish(&mut state, event);
        Ok(())
    }

    pub fn repay_loan(&self, borrower: Identity, loan_id: LoanId) -> Result<()> {
        let mut state = self.state.write();
        let LedgerState {
            registry,
            collateral,
            loans,
            custody,
            conservation,
            ..
        } = &mut *state;
        let event = loans
            .repay_loan(registry, collateral, custody, borrower, loan_id)
            .inspect_err(|e| log_rejection("repay_loan", borrower, e))?;
        if let LoanEvent::LoanRepaid { amount, .. } = &event {
            conservation.record_repayment(*amount);
            tracing::info!(
                loan = %loan_id,
                %borrower,
                amount = *amount,
                principal = %registry.principal(),
                "loan repaid"
            );
        }

        self.publish(&mut state, event);
        Ok(())
    }

    pub fn liquidate_collateral(&self, officer: Identity, loan_id: LoanId) -> Result<()> {
        let mut state = self.state.write();
        let now = self.clock.now();
        let LedgerState {
            registry, loans, ..
        } = &mut *state;
        let event = loans
            .liquidate_collateral(registry, officer, loan_id, now)
            .inspect_err(|e| log_rejection("liquidate_collateral", officer, e))?;

        tracing::info!(loan = %loan_id, %officer, "collateral liquidated");
        self.publish(&mut state, event);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    #[must_use]
    pub fn principal(&self) -> Identity {
        self.state.read().registry.principal()
    }

    #[must_use]
    pub fn is_principal(&self, identity: Identity) -> bool {
        self.state.read().registry.is_principal(identity)
    }

    #[must_use]
    pub fn is_officer(&self, identity: Identity) -> bool {
        self.state.read().registry.is_officer(identity)
    }

    #[must_use]
    pub fn is_activated_client(&self, identity: Identity) -> bool {
        self.state.read().registry.is_activated_client(identity)
    }

    #[must_use]
    pub fn collateral_balance(&self, client: Identity) -> u64 {
        self.state.read().collateral.balance(client)
    }

    #[must_use]
    pub fn client(&self, identity: Identity) -> ClientRecord {
        let state = self.state.read();
        client_record(&*state, identity)
    }

    #[must_use]
    pub fn loan_ids(&self, borrower: Identity) -> Vec<LoanId> {
        self.state.read().loans.loan_ids(borrower).to_vec()
    }

    /// Getter-style view; unknown ids yield `LoanDetail::default()`.
    #[must_use]
    pub fn loan_detail(&self, loan_id: LoanId) -> LoanDetail {
        self.state.read().loans.loan_detail(loan_id)
    }

    #[must_use]
    pub fn loan(&self, loan_id: LoanId) -> Option<Loan> {
        self.state.read().loans.loan(loan_id).cloned()
    }

    /// Approved, unpaid and past its deadline right now.
    #[must_use]
    pub fn is_liquidatable(&self, loan_id: LoanId) -> bool {
        let state = self.state.read();
        state.loans.is_liquidatable(loan_id, self.clock.now())
    }

    #[must_use]
    pub fn next_loan_id(&self) -> LoanId {
        self.state.read().loans.next_loan_id()
    }

    /// Read-only access to the custody, e.g. to inspect external wallets.
    pub fn with_custody<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.state.read().custody)
    }

    /// Check `Σ balances == deposited − repaid` and custody agreement.
    pub fn verify_conservation(&self) -> Result<()> {
        let state = self.state.read();
        let result = state
            .conservation
            .verify(state.collateral.total_collateral(), state.custody.held());
        if let Err(e) = &result {
            tracing::error!(code = e.code(), error = %e, "collateral conservation violated");
        }
        result
    }

    /// Export the full queryable state under one read lock.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.read();
        LedgerSnapshot {
            principal: state.registry.principal(),
            officers: state.registry.officers().copied().collect(),
            clients: state
                .registry
                .clients()
                .map(|client| client_record(&*state, *client))
                .collect(),
            loans: state.loans.loans().cloned().collect(),
            taken_at: self.clock.now(),
        }
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Sign and fan out one committed event. Called with the write lock held.
    fn publish(&self, state: &mut LedgerState<C>, event: LoanEvent) {
        let emitted_at: Timestamp = self.clock.now();
        let name = event.name();
        match state.signer.sign(event, emitted_at) {
            Ok(receipt) => {
                tracing::debug!(
                    event = name,
                    sequence = receipt.sequence,
                    hash = %receipt.hash_hex(),
                    "event published"
                );
                self.broadcast.publish(&receipt);
                for sink in &self.sinks {
                    sink.publish(&receipt);
                }
            }
            Err(e) => {
                tracing::error!(event = name, code = e.code(), error = %e, "event receipt not issued");
            }
        }
    }
}

impl<C: ValueCustody> std::fmt::Debug for LendingService<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("LendingService")
            .field("principal", &state.registry.principal())
            .field("clients", &state.registry.client_count())
            .field("loans", &state.loans.len())
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

fn client_record<C>(state: &LedgerState<C>, identity: Identity) -> ClientRecord {
    if !state.registry.is_activated_client(identity) {
        return ClientRecord::unknown(identity);
    }
    ClientRecord {
        identity,
        activated: true,
        collateral_balance: state.collateral.balance(identity),
        loan_ids: state.loans.loan_ids(identity).to_vec(),
    }
}

fn log_rejection(op: &'static str, caller: Identity, err: &MicrolendError) {
    tracing::warn!(op, %caller, code = err.code(), error = %err, "operation rejected");
}
