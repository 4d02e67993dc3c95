//! Configuration for a MicroLend ledger instance.

use serde::{Deserialize, Serialize};

use crate::{Identity, MicrolendError, Result, constants};

/// Configuration for one ledger service instance.
///
/// Loadable from JSON:
///
/// ```json
/// {
///   "principal": "0x00000000000000000000000000000000000000aa",
///   "event_channel_capacity": 256,
///   "signing_seed": null
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The sole administrator; receives every repayment. Immutable.
    pub principal: Identity,
    /// Buffer size of the broadcast event sink.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    /// Hex-encoded 32-byte seed for the receipt signing key.
    /// A fresh random key is generated when absent.
    #[serde(default)]
    pub signing_seed: Option<String>,
}

fn default_event_channel_capacity() -> usize {
    constants::DEFAULT_EVENT_CHANNEL_CAPACITY
}

impl LedgerConfig {
    /// Config with defaults for everything but the principal.
    #[must_use]
    pub fn new(principal: Identity) -> Self {
        Self {
            principal,
            event_channel_capacity: default_event_channel_capacity(),
            signing_seed: None,
        }
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| MicrolendError::Configuration(format!("invalid ledger config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns `Configuration` for a zero principal, a zero channel
    /// capacity, or a malformed signing seed.
    pub fn validate(&self) -> Result<()> {
        if self.principal.is_zero() {
            return Err(MicrolendError::Configuration(
                "principal must not be the zero identity".into(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(MicrolendError::Configuration(
                "event_channel_capacity must be > 0".into(),
            ));
        }
        self.signing_seed_bytes()?;
        Ok(())
    }

    /// The decoded signing seed, if one is configured.
    pub fn signing_seed_bytes(&self) -> Result<Option<[u8; 32]>> {
        let Some(seed) = &self.signing_seed else {
            return Ok(None);
        };
        let bytes = hex::decode(seed)
            .map_err(|e| MicrolendError::Configuration(format!("signing_seed: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            MicrolendError::Configuration(format!("signing_seed: expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Some(bytes))
    }
}
