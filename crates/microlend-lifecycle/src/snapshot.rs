//! Point-in-time export of the queryable ledger state.

use microlend_types::{ClientRecord, Identity, Loan, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Everything an external caller can query, captured under one read lock.
///
/// Collections are in deterministic order (identities and loan ids
/// ascending), so two ledgers in the same state produce the same digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub principal: Identity,
    pub officers: Vec<Identity>,
    pub clients: Vec<ClientRecord>,
    pub loans: Vec<Loan>,
    /// Time the snapshot was taken.
    pub taken_at: u64,
}

impl LedgerSnapshot {
    /// SHA-256 over the canonical JSON, excluding `taken_at`.
    pub fn digest(&self) -> Result<[u8; 32]> {
        let mut hasher = Sha256::new();
        hasher.update(b"microlend:snapshot:v1:");
        hasher.update(serde_json::to_vec(&(
            &self.principal,
            &self.officers,
            &self.clients,
            &self.loans,
        ))?);
        Ok(hasher.finalize().into())
    }

    /// Hex form of [`LedgerSnapshot::digest`].
    pub fn digest_hex(&self) -> Result<String> {
        Ok(hex::encode(self.digest()?))
    }
}
