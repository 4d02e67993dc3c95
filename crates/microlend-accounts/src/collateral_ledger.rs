//! Per-client collateral accounting.
//!
//! Balances are unsigned and only ever change through [`CollateralLedger::deposit`]
//! and [`CollateralLedger::debit`]. All arithmetic is checked: overflow and
//! underflow are errors, never wraparound. Every mutation is atomic: either
//! the full operation succeeds or the balance is unchanged.

use std::collections::HashMap;

use microlend_types::{Identity, MicrolendError, Result};

use crate::{access_registry::AccessRegistry, custody::ValueCustody};

/// Source of truth for posted collateral.
///
/// Collateral is checked, never escrowed: [`CollateralLedger::reserve`] only
/// reports whether a balance covers an amount. Several outstanding loans may
/// therefore each fit the balance while together exceeding it.
#[derive(Debug, Clone, Default)]
pub struct CollateralLedger {
    balances: HashMap<Identity, u64>,
}

impl CollateralLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a zero-balance account. Called once at client activation.
    pub fn open_account(&mut self, client: Identity) {
        self.balances.entry(client).or_insert(0);
    }

    /// Pull `amount` into custody and credit it to `client`.
    ///
    /// All preconditions are checked before value moves; the balance is
    /// credited only after custody accepted the transfer.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount == 0`
    /// - `Unauthorized` if `client` is not activated
    /// - `ArithmeticOverflow` if the balance would overflow
    /// - `CustodyTransferFailed` if custody refuses the transfer
    pub fn deposit(
        &mut self,
        registry: &AccessRegistry,
        custody: &mut dyn ValueCustody,
        client: Identity,
        amount: u64,
    ) -> Result<u64> {
        if amount == 0 {
            return Err(MicrolendError::InvalidAmount);
        }
        registry.require_client(client)?;

        let new_balance = self
            .balance(client)
            .checked_add(amount)
            .ok_or(MicrolendError::ArithmeticOverflow)?;

        custody.receive(client, amount)?;

        self.balances.insert(client, new_balance);
        tracing::debug!(%client, amount, new_balance, "collateral credited");
        Ok(new_balance)
    }

    /// Does `client`'s posted collateral cover `amount`? Read-only.
    #[must_use]
    pub fn reserve(&self, client: Identity, amount: u64) -> bool {
        self.balance(client) >= amount
    }

    /// Check `reserve` and turn a miss into an error carrying both figures.
    ///
    /// # Errors
    /// Returns `InsufficientCollateral` if the balance is below `amount`.
    pub fn ensure_covers(&self, client: Identity, amount: u64) -> Result<()> {
        if self.reserve(client, amount) {
            Ok(())
        } else {
            Err(MicrolendError::InsufficientCollateral {
                needed: amount,
                available: self.balance(client),
            })
        }
    }

    /// Subtract `amount` from `client`'s balance.
    ///
    /// # Errors
    /// Returns `InsufficientCollateral` if balance < amount.
    pub fn debit(&mut self, client: Identity, amount: u64) -> Result<u64> {
        self.ensure_covers(client, amount)?;
        let balance = self
            .balances
            .get_mut(&client)
            .ok_or(MicrolendError::InsufficientCollateral {
                needed: amount,
                available: 0,
            })?;
        *balance = balance
            .checked_sub(amount)
            .ok_or(MicrolendError::ArithmeticOverflow)?;
        tracing::debug!(%client, amount, new_balance = *balance, "collateral debited");
        Ok(*balance)
    }

    /// Posted collateral of `client`; zero for unknown identities.
    #[must_use]
    pub fn balance(&self, client: Identity) -> u64 {
        self.balances.get(&client).copied().unwrap_or(0)
    }

    /// Sum of every client's posted collateral.
    #[must_use]
    pub fn total_collateral(&self) -> u128 {
        self.balances.values().map(|b| u128::from(*b)).sum()
    }
}
