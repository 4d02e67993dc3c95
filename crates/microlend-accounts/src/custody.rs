//! Native-value custody.
//!
//! The ledger never holds value itself: deposits pull value from the
//! client's external wallet into custody, and repayments push value out of
//! custody to the principal. Both directions are fallible; callers check
//! every ledger precondition first so that a successful transfer is always
//! followed by a successful commit.

use std::collections::HashMap;

use microlend_types::{Identity, MicrolendError, Result};

/// Moves native-currency value into and out of the ledger's custody.
pub trait ValueCustody: Send + Sync {
    /// Pull `amount` from `from`'s external wallet into custody.
    fn receive(&mut self, from: Identity, amount: u64) -> Result<()>;

    /// Push `amount` out of custody to `to`'s external wallet.
    fn forward(&mut self, to: Identity, amount: u64) -> Result<()>;

    /// Value currently held in custody, if this custody can report it.
    fn held(&self) -> Option<u64> {
        None
    }
}

/// In-process custody over simulated external wallets.
#[derive(Debug, Default)]
pub struct InMemoryCustody {
    /// External (off-ledger) wallet balances.
    wallets: HashMap<Identity, u64>,
    /// Value held on behalf of the ledger.
    held: u64,
}

impl InMemoryCustody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an external wallet, e.g. to seed a test client.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the wallet would overflow.
    pub fn fund(&mut self, identity: Identity, amount: u64) -> Result<()> {
        let wallet = self.wallets.entry(identity).or_default();
        *wallet = wallet
            .checked_add(amount)
            .ok_or(MicrolendError::ArithmeticOverflow)?;
        Ok(())
    }

    #[must_use]
    pub fn external_balance(&self, identity: Identity) -> u64 {
        self.wallets.get(&identity).copied().unwrap_or(0)
    }
}

impl ValueCustody for InMemoryCustody {
    fn receive(&mut self, from: Identity, amount: u64) -> Result<()> {
        let available = self.external_balance(from);
        if available < amount {
            return Err(MicrolendError::CustodyTransferFailed {
                reason: format!("wallet {from} holds {available}, needs {amount}"),
            });
        }
        let held = self
            .held
            .checked_add(amount)
            .ok_or(MicrolendError::ArithmeticOverflow)?;

        self.wallets.insert(from, available - amount);
        self.held = held;
        Ok(())
    }

    fn forward(&mut self, to: Identity, amount: u64) -> Result<()> {
        if self.held < amount {
            return Err(MicrolendError::CustodyTransferFailed {
                reason: format!("custody holds {}, cannot forward {amount}", self.held),
            });
        }
        let credited = self
            .external_balance(to)
            .checked_add(amount)
            .ok_or(MicrolendError::ArithmeticOverflow)?;

        self.held -= amount;
        self.wallets.insert(to, credited);
        Ok(())
    }

    fn held(&self) -> Option<u64> {
        Some(self.held)
    }
}

/// Custody whose outward transfers always fail. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default)]
pub struct RejectingCustody {
    inner: InMemoryCustody,
}

#[cfg(any(test, feature = "test-helpers"))]
impl RejectingCustody {
    pub fn new(inner: InMemoryCustody) -> Self {
        Self { inner }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl ValueCustody for RejectingCustody {
    fn receive(&mut self, from: Identity, amount: u64) -> Result<()> {
        self.inner.receive(from, amount)
    }

    fn forward(&mut self, to: Identity, _amount: u64) -> Result<()> {
        Err(MicrolendError::CustodyTransferFailed {
            reason: format!("recipient {to} rejected the transfer"),
        })
    }

    fn held(&self) -> Option<u64> {
        self.inner.held()
    }
}
