//! Roles recognised by the access registry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The role an operation requires of its caller.
///
/// Roles are not exclusive and there are no ranks: the principal implicitly
/// holds officer rights, and an officer may also be an activated client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The single administrator, fixed at construction.
    Principal,
    /// Loan officer: activates clients, approves and liquidates loans.
    Officer,
    /// Activated client: deposits collateral, requests and repays loans.
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Principal => write!(f, "PRINCIPAL"),
            Self::Officer => write!(f, "OFFICER"),
            Self::Client => write!(f, "CLIENT"),
        }
    }
}
