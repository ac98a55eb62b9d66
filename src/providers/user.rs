//! Identity storage trait.

use crate::error::Result;
use crate::providers::OidcUserInfo;
use crate::state::{Credential, Identity, TotpSecret, UserId};

/// Identity storage.
///
/// This trait abstracts over the application's user store (PostgreSQL or
/// similar). The authentication core never writes password hashes through
/// it; account provisioning belongs to the excluded application layer.
pub trait UserRepository: Send + Sync {
    /// Look up a local credential by normalized email.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails. Absence of the user is
    /// `Ok(None)`, not an error; the verifier maps it to
    /// `InvalidCredentials` without distinguishing it from a bad password.
    fn find_credential_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<Credential>>> + Send;

    /// Look up an identity by user ID.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn find_identity(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<Identity>>> + Send;

    /// Fetch the TOTP secret for a user, enrolled or pending.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn find_totp_secret(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<TotpSecret>>> + Send;

    /// Store a pending (unconfirmed) TOTP secret for a user.
    ///
    /// Overwrites any previous pending secret.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn store_totp_secret(
        &self,
        secret: &TotpSecret,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Mark the user's pending TOTP secret as confirmed.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails or no pending secret
    /// exists.
    fn enable_totp(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Look up a local identity by OIDC subject.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn find_by_oidc_subject(
        &self,
        subject: &str,
    ) -> impl std::future::Future<Output = Result<Option<Identity>>> + Send;

    /// Find or create the local identity for an OIDC profile.
    ///
    /// Called on first federated login; subsequent logins resolve via
    /// [`UserRepository::find_by_oidc_subject`].
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn link_oidc_identity(
        &self,
        info: &OidcUserInfo,
    ) -> impl std::future::Future<Output = Result<Identity>> + Send;
}
