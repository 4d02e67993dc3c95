//! Identifiers used throughout MicroLend.
//!
//! Account identities are 20-byte addresses rendered as `0x`-prefixed hex.
//! Loan ids are dense sequence numbers; receipt ids use UUIDv7 for
//! time-ordered sorting across service restarts.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MicrolendError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// An account address. [`Identity::ZERO`] means "no identity".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(pub [u8; 20]);

impl Identity {
    /// The reserved all-zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Deterministic identity whose low eight bytes hold `index` (big-endian).
    #[must_use]
    pub fn from_index(index: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&index.to_be_bytes());
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// First four bytes as hex, for compact log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Identity {
    type Err = MicrolendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| MicrolendError::Serialization(format!("identity {s}: {e}")))?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|b: Vec<u8>| {
            MicrolendError::Serialization(format!("identity {s}: expected 20 bytes, got {}", b.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Identity {
    type Error = MicrolendError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.to_string()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Identity {
    /// A random non-zero identity. **Tests only.**
    pub fn random() -> Self {
        let mut bytes = rand::random::<[u8; 20]>();
        bytes[19] |= 1;
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// LoanId
// ---------------------------------------------------------------------------

/// Sequential loan identifier. Issued ids start at 1; `0` means "does not exist".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct LoanId(pub u64);

impl LoanId {
    /// The reserved "no loan" id.
    pub const NONE: Self = Self(0);

    #[must_use]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// The id following this one, or `None` on overflow.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loan:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ReceiptId
// ---------------------------------------------------------------------------

/// Globally unique event receipt identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ReceiptId(pub Uuid);

impl ReceiptId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rcpt:{}", self.0)
    }
}

/// Seconds since the UNIX epoch.
pub type Timestamp = u64;
