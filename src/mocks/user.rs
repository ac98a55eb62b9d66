//! Mock identity storage.

use crate::error::Result;
use crate::providers::{OidcUserInfo, UserRepository};
use crate::state::{Credential, Identity, TotpSecret, UserId};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    credentials: HashMap<String, Credential>,
    totp_secrets: HashMap<UserId, TotpSecret>,
    oidc_links: HashMap<String, Identity>,
    identities: HashMap<UserId, Identity>,
}

/// In-memory identity storage.
#[derive(Debug, Default)]
pub struct MockUserRepository {
    inner: Mutex<Inner>,
}

impl MockUserRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a local user.
    pub fn add_credential(&self, credential: Credential) {
        let mut inner = self.inner.lock().unwrap();
        inner.identities.insert(
            credential.user_id,
            Identity {
                user_id: credential.user_id,
                email: credential.email.clone(),
                name: None,
            },
        );
        inner
            .credentials
            .insert(credential.email.clone(), credential);
    }

    /// Seed an enrolled (or pending) TOTP secret.
    pub fn add_totp_secret(&self, secret: TotpSecret) {
        self.inner
            .lock()
            .unwrap()
            .totp_secrets
            .insert(secret.user_id, secret);
    }

    /// Seed an existing OIDC subject link.
    pub fn add_oidc_link(&self, subject: &str, identity: Identity) {
        let mut inner = self.inner.lock().unwrap();
        inner.identities.insert(identity.user_id, identity.clone());
        inner.oidc_links.insert(subject.to_string(), identity);
    }

    /// The current TOTP secret for a user, for assertions.
    #[must_use]
    pub fn totp_secret(&self, user_id: UserId) -> Option<TotpSecret> {
        self.inner.lock().unwrap().totp_secrets.get(&user_id).cloned()
    }
}

impl UserRepository for MockUserRepository {
    async fn find_credential_by_email(&self, email: &str) -> Result<Option<Credential>> {
        Ok(self.inner.lock().unwrap().credentials.get(email).cloned())
    }

    async fn find_identity(&self, user_id: UserId) -> Result<Option<Identity>> {
        Ok(self.inner.lock().unwrap().identities.get(&user_id).cloned())
    }

    async fn find_totp_secret(&self, user_id: UserId) -> Result<Option<TotpSecret>> {
        Ok(self.inner.lock().unwrap().totp_secrets.get(&user_id).cloned())
    }

    async fn store_totp_secret(&self, secret: &TotpSecret) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .totp_secrets
            .insert(secret.user_id, secret.clone());
        Ok(())
    }

    async fn enable_totp(&self, user_id: UserId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(secret) = inner.totp_secrets.get_mut(&user_id) {
            secret.enabled = true;
        }
        if let Some(credential) = inner
            .credentials
            .values_mut()
            .find(|c| c.user_id == user_id)
        {
            credential.totp_enabled = true;
        }
        Ok(())
    }

    async fn find_by_oidc_subject(&self, subject: &str) -> Result<Option<Identity>> {
        Ok(self.inner.lock().unwrap().oidc_links.get(subject).cloned())
    }

    async fn link_oidc_identity(&self, info: &OidcUserInfo) -> Result<Identity> {
        let identity = Identity {
            user_id: UserId::new(),
            email: info.email.clone(),
            name: info.name.clone(),
        };

        let mut inner = self.inner.lock().unwrap();
        inner.identities.insert(identity.user_id, identity.clone());
        inner
            .oidc_links
            .insert(info.subject.clone(), identity.clone());

        Ok(identity)
    }
}
