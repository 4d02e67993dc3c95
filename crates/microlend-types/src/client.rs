//! Client account view.

use serde::{Deserialize, Serialize};

use crate::{Identity, LoanId};

/// Everything the ledger knows about one client.
///
/// Assembled on demand from the access registry (activation), the
/// collateral ledger (balance) and the loan book (loan ids, in request
/// order). An identity that was never activated yields the zero record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub identity: Identity,
    pub activated: bool,
    pub collateral_balance: u64,
    pub loan_ids: Vec<LoanId>,
}

impl ClientRecord {
    /// The record of an identity the ledger has never activated.
    #[must_use]
    pub fn unknown(identity: Identity) -> Self {
        Self {
            identity,
            activated: false,
            collateral_balance: 0,
            loan_ids: Vec::new(),
        }
    }
}
