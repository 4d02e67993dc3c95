//! Role registry: the principal, the officer set, the activated-client set.
//!
//! Both sets are append-only. There is no revocation; an identity that has
//! been granted or activated keeps that role for the life of the ledger.

use std::collections::BTreeSet;

use microlend_types::{Identity, MicrolendError, Result, Role};

/// Tracks who may do what. Every mutating ledger operation is gated here first.
#[derive(Debug, Clone)]
pub struct AccessRegistry {
    /// Fixed at construction.
    principal: Identity,
    /// Explicitly granted officers. The principal is an officer implicitly
    /// and is never stored here.
    officers: BTreeSet<Identity>,
    clients: BTreeSet<Identity>,
}

impl AccessRegistry {
    /// Create a registry owned by `principal`.
    ///
    /// # Errors
    /// Returns `ReservedIdentity` if `principal` is the zero identity.
    pub fn new(principal: Identity) -> Result<Self> {
        if principal.is_zero() {
            return Err(MicrolendError::ReservedIdentity);
        }
        Ok(Self {
            principal,
            officers: BTreeSet::new(),
            clients: BTreeSet::new(),
        })
    }

    #[must_use]
    pub fn principal(&self) -> Identity {
        self.principal
    }

    #[must_use]
    pub fn is_principal(&self, identity: Identity) -> bool {
        identity == self.principal
    }

    /// The principal always counts as an officer.
    #[must_use]
    pub fn is_officer(&self, identity: Identity) -> bool {
        self.is_principal(identity) || self.officers.contains(&identity)
    }

    #[must_use]
    pub fn is_activated_client(&self, identity: Identity) -> bool {
        self.clients.contains(&identity)
    }

    /// Grant officer rights to `target`. Only the principal may call this.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not the principal
    /// - `ReservedIdentity` if `target` is the zero identity
    /// - `AlreadyGranted` if `target` is already an officer
    pub fn grant_officer(&mut self, caller: Identity, target: Identity) -> Result<()> {
        if !self.is_principal(caller) {
            return Err(MicrolendError::Unauthorized {
                caller,
                required: Role::Principal,
            });
        }
        if target.is_zero() {
            return Err(MicrolendError::ReservedIdentity);
        }
        if self.is_officer(target) {
            return Err(MicrolendError::AlreadyGranted(target));
        }
        self.officers.insert(target);
        Ok(())
    }

    /// Activate `target` as a client. Only officers may call this.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not an officer
    /// - `ReservedIdentity` if `target` is the zero identity
    /// - `AlreadyActivated` if `target` is already an activated client
    pub fn activate_client(&mut self, caller: Identity, target: Identity) -> Result<()> {
        self.require_officer(caller)?;
        if target.is_zero() {
            return Err(MicrolendError::ReservedIdentity);
        }
        if !self.clients.insert(target) {
            return Err(MicrolendError::AlreadyActivated(target));
        }
        Ok(())
    }

    /// Gate for officer-only operations.
    ///
    /// # Errors
    /// Returns `Unauthorized` if `caller` is not an officer.
    pub fn require_officer(&self, caller: Identity) -> Result<()> {
        if self.is_officer(caller) {
            Ok(())
        } else {
            Err(MicrolendError::Unauthorized {
                caller,
                required: Role::Officer,
            })
        }
    }

    /// Gate for client-only operations.
    ///
    /// # Errors
    /// Returns `Unauthorized` if `caller` is not an activated client.
    pub fn require_client(&self, caller: Identity) -> Result<()> {
        if self.is_activated_client(caller) {
            Ok(())
        } else {
            Err(MicrolendError::Unauthorized {
                caller,
                required: Role::Client,
            })
        }
    }

    /// Explicitly granted officers, in identity order (excludes the principal).
    pub fn officers(&self) -> impl Iterator<Item = &Identity> {
        self.officers.iter()
    }

    /// Activated clients, in identity order.
    pub fn clients(&self) -> impl Iterator<Item = &Identity> {
        self.clients.iter()
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AccessRegistry, Identity) {
        let principal = Identity::from_index(1);
        (AccessRegistry::new(principal).unwrap(), principal)
    }

    #[test]
    fn zero_principal_rejected() {
        let err = AccessRegistry::new(Identity::ZERO).unwrap_err();
        assert!(matches!(err, MicrolendError::ReservedIdentity));
    }

    #[test]
    fn principal_is_implicit_officer() {
        let (reg, principal) = setup();
        assert!(reg.is_principal(principal));
        assert!(reg.is_officer(principal));
        assert!(!reg.is_activated_client(principal));
        assert_eq!(reg.officers().count(), 0);
    }

    #[test]
    fn principal_grants_officer() {
        let (mut reg, principal) = setup();
        let officer = Identity::random();
        reg.grant_officer(principal, officer).unwrap();
        assert!(reg.is_officer(officer));
        assert!(!reg.is_principal(officer));
    }

    #[test]
    fn non_principal_cannot_grant() {
        let (mut reg, principal) = setup();
        let officer = Identity::random();
        reg.grant_officer(principal, officer).unwrap();

        let err = reg.grant_officer(officer, Identity::random()).unwrap_err();
        assert!(matches!(
            err,
            MicrolendError::Unauthorized {
                required: Role::Principal,
                ..
            }
        ));
    }

    #[test]
    fn double_grant_fails() {
        let (mut reg, principal) = setup();
        let officer = Identity::random();
        reg.grant_officer(principal, officer).unwrap();
        let err = reg.grant_officer(principal, officer).unwrap_err();
        assert!(matches!(err, MicrolendError::AlreadyGranted(id) if id == officer));

        let err = reg.grant_officer(principal, principal).unwrap_err();
        assert!(matches!(err, MicrolendError::AlreadyGranted(_)));
    }

    #[test]
    fn officer_activates_client() {
        let (mut reg, principal) = setup();
        let officer = Identity::random();
        let client = Identity::random();
        reg.grant_officer(principal, officer).unwrap();
        reg.activate_client(officer, client).unwrap();
        assert!(reg.is_activated_client(client));
        assert_eq!(reg.client_count(), 1);
        assert!(reg.require_client(client).is_ok());
    }

    #[test]
    fn non_officer_cannot_activate() {
        let (mut reg, _) = setup();
        let stranger = Identity::random();
        let err = reg.activate_client(stranger, Identity::random()).unwrap_err();
        assert!(matches!(
            err,
            MicrolendError::Unauthorized {
                required: Role::Officer,
                ..
            }
        ));
        assert_eq!(reg.client_count(), 0);
    }

    #[test]
    fn double_activation_fails() {
        let (mut reg, principal) = setup();
        let client = Identity::random();
        reg.activate_client(principal, client).unwrap();
        let err = reg.activate_client(principal, client).unwrap_err();
        assert!(matches!(err, MicrolendError::AlreadyActivated(id) if id == client));
    }

    #[test]
    fn zero_identity_cannot_be_given_roles() {
        let (mut reg, principal) = setup();
        assert!(matches!(
            reg.grant_officer(principal, Identity::ZERO).unwrap_err(),
            MicrolendError::ReservedIdentity
        ));
        assert!(matches!(
            reg.activate_client(principal, Identity::ZERO).unwrap_err(),
            MicrolendError::ReservedIdentity
        ));
    }
}
