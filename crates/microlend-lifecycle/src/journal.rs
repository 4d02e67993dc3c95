//! Event publication: receipt signing and the sinks indexers consume.
//!
//! Publication is fire-and-forget. A sink never fails the operation that
//! produced the event, and nothing is retried: a lagging broadcast
//! subscriber simply misses receipts and can detect the gap from
//! `sequence`.

use ed25519_dalek::{Signer, SigningKey};
use microlend_types::{EventReceipt, LoanEvent, MicrolendError, ReceiptId, Result, Timestamp};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use tokio::sync::broadcast;

/// Receives every committed event, in commit order.
pub trait EventSink: Send + Sync {
    fn publish(&self, receipt: &EventReceipt);
}

// ---------------------------------------------------------------------------
// ReceiptSigner
// ---------------------------------------------------------------------------

/// Sequences and signs events with the service's ed25519 key.
pub struct ReceiptSigner {
    key: SigningKey,
    /// Sequence number of the next receipt.
    next_sequence: u64,
}

impl ReceiptSigner {
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
            next_sequence: 1,
        }
    }

    /// A signer with a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
            next_sequence: 1,
        }
    }

    /// Verifying key bytes, as carried in every receipt's `issuer`.
    #[must_use]
    pub fn issuer(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    /// Sequence number the next receipt will carry.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Wrap `event` in a signed receipt. The sequence advances only on success.
    pub fn sign(&mut self, event: LoanEvent, emitted_at: Timestamp) -> Result<EventReceipt> {
        let sequence = self.next_sequence;
        let following = sequence
            .checked_add(1)
            .ok_or(MicrolendError::ArithmeticOverflow)?;
        let payload_hash = EventReceipt::hash_payload(sequence, emitted_at, &event)?;
        let signature = self.key.sign(&payload_hash);

        self.next_sequence = following;
        Ok(EventReceipt {
            receipt_id: ReceiptId::new(),
            sequence,
            event,
            emitted_at,
            payload_hash,
            signature: signature.to_bytes().to_vec(),
            issuer: self.issuer(),
        })
    }
}

impl std::fmt::Debug for ReceiptSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptSigner")
            .field("issuer", &hex::encode(self.issuer()))
            .field("next_sequence", &self.next_sequence)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// MemoryJournal
// ---------------------------------------------------------------------------

/// Append-only in-memory journal of every receipt published to it.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    receipts: RwLock<Vec<EventReceipt>>,
}

impl MemoryJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all receipts, oldest first.
    #[must_use]
    pub fn receipts(&self) -> Vec<EventReceipt> {
        self.receipts.read().clone()
    }

    /// Snapshot of the bare events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<LoanEvent> {
        self.receipts
            .read()
            .iter()
            .map(|r| r.event.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receipts.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receipts.read().is_empty()
    }

    /// Verify every receipt and that sequences run 1, 2, 3, … with no gaps.
    ///
    /// # Errors
    /// Returns `ReceiptVerificationFailed` at the first bad receipt.
    pub fn verify_chain(&self) -> Result<()> {
        for (expected, receipt) in (1u64..).zip(self.receipts.read().iter()) {
            if receipt.sequence != expected {
                return Err(MicrolendError::ReceiptVerificationFailed {
                    reason: format!(
                        "sequence gap: expected {expected}, found {}",
                        receipt.sequence
                    ),
                });
            }
            receipt.verify()?;
        }
        Ok(())
    }
}

impl EventSink for MemoryJournal {
    fn publish(&self, receipt: &EventReceipt) {
        self.receipts.write().push(receipt.clone());
    }
}

// ---------------------------------------------------------------------------
// BroadcastSink
// ---------------------------------------------------------------------------

/// Fans receipts out to any number of async subscribers.
#[derive(Debug)]
pub struct BroadcastSink {
    tx: broadcast::Sender<EventReceipt>,
}

impl BroadcastSink {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// New subscriber; sees receipts published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventReceipt> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, receipt: &EventReceipt) {
        if self.tx.send(receipt.clone()).is_err() {
            tracing::trace!(sequence = receipt.sequence, "no event subscribers");
        }
    }
}
