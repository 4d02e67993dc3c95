//! Ledger events and their signed receipts.
//!
//! Every committed mutation produces a [`LoanEvent`]. The service wraps each
//! one in an [`EventReceipt`] before handing it to the event sinks, so an
//! external indexer can check that a notification really came from the
//! ledger and that it has not skipped any (`sequence` is gapless).

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Identity, LoanId, MicrolendError, ReceiptId, Result, Timestamp, constants};

/// A committed ledger mutation, as seen by indexers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoanEvent {
    OfficerGranted {
        officer: Identity,
    },
    ClientActivated {
        client: Identity,
        officer: Identity,
    },
    CollateralDeposited {
        client: Identity,
        amount: u64,
        new_balance: u64,
    },
    LoanRequested {
        id: LoanId,
        borrower: Identity,
        amount: u64,
        term_hours: u64,
    },
    LoanApproved {
        id: LoanId,
        borrower: Identity,
        amount: u64,
    },
    LoanRepaid {
        id: LoanId,
        borrower: Identity,
        amount: u64,
    },
    CollateralLiquidated {
        id: LoanId,
        borrower: Identity,
        elapsed_seconds: u64,
    },
}

impl LoanEvent {
    /// The loan this event concerns, if any.
    #[must_use]
    pub fn loan_id(&self) -> Option<LoanId> {
        match self {
            Self::LoanRequested { id, .. }
            | Self::LoanApproved { id, .. }
            | Self::LoanRepaid { id, .. }
            | Self::CollateralLiquidated { id, .. } => Some(*id),
            Self::OfficerGranted { .. }
            | Self::ClientActivated { .. }
            | Self::CollateralDeposited { .. } => None,
        }
    }

    /// Stable event name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::OfficerGranted { .. } => "OfficerGranted",
            Self::ClientActivated { .. } => "ClientActivated",
            Self::CollateralDeposited { .. } => "CollateralDeposited",
            Self::LoanRequested { .. } => "LoanRequested",
            Self::LoanApproved { .. } => "LoanApproved",
            Self::LoanRepaid { .. } => "LoanRepaid",
            Self::CollateralLiquidated { .. } => "CollateralLiquidated",
        }
    }
}

/// A signed, sequenced envelope around a [`LoanEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventReceipt {
    pub receipt_id: ReceiptId,
    /// Gapless per-service sequence number, starting at 1.
    pub sequence: u64,
    pub event: LoanEvent,
    /// Ledger time at which the operation committed.
    pub emitted_at: Timestamp,
    /// SHA-256 over [`EventReceipt::signing_payload`].
    pub payload_hash: [u8; 32],
    /// Ed25519 signature over `payload_hash`.
    pub signature: Vec<u8>,
    /// Ed25519 verifying key of the issuing service.
    pub issuer: [u8; 32],
}

impl EventReceipt {
    /// Canonical bytes committed to by the payload hash.
    ///
    /// Format: `"microlend:receipt:v1:" || sequence(8, LE) || emitted_at(8, LE) || json(event)`
    pub fn signing_payload(sequence: u64, emitted_at: Timestamp, event: &LoanEvent) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(192);
        payload.extend_from_slice(constants::RECEIPT_DOMAIN);
        payload.extend_from_slice(&sequence.to_le_bytes());
        payload.extend_from_slice(&emitted_at.to_le_bytes());
        payload.extend_from_slice(&serde_json::to_vec(event)?);
        Ok(payload)
    }

    /// SHA-256 of the canonical payload.
    pub fn hash_payload(sequence: u64, emitted_at: Timestamp, event: &LoanEvent) -> Result<[u8; 32]> {
        let payload = Self::signing_payload(sequence, emitted_at, event)?;
        Ok(Sha256::digest(&payload).into())
    }

    /// Hex form of the payload hash, for logs.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.payload_hash)
    }

    /// Recompute the payload hash and check the issuer's signature over it.
    ///
    /// # Errors
    /// Returns `ReceiptVerificationFailed` on any mismatch.
    pub fn verify(&self) -> Result<()> {
        let expected = Self::hash_payload(self.sequence, self.emitted_at, &self.event)?;
        if expected != self.payload_hash {
            return Err(MicrolendError::ReceiptVerificationFailed {
                reason: format!(
                    "payload hash mismatch at sequence {}: expected {}, got {}",
                    self.sequence,
                    hex::encode(expected),
                    self.hash_hex()
                ),
            });
        }

        let key = VerifyingKey::from_bytes(&self.issuer).map_err(|e| {
            MicrolendError::ReceiptVerificationFailed {
                reason: format!("bad issuer key: {e}"),
            }
        })?;
        let signature = Signature::from_slice(&self.signature).map_err(|e| {
            MicrolendError::ReceiptVerificationFailed {
                reason: format!("malformed signature: {e}"),
            }
        })?;
        key.verify(&self.payload_hash, &signature)
            .map_err(|e| MicrolendError::ReceiptVerificationFailed {
                reason: format!("signature rejected at sequence {}: {e}", self.sequence),
            })
    }
}
