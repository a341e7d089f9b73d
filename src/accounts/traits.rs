// Collaborator interfaces injected into the provisioning workflow

use async_trait::async_trait;
use bytes::Bytes;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use super::errors::{CredentialError, StoreError};
use super::types::{CredentialReceipt, SessionIdentity, UserProfile};

/// Email/password identity provider
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait CredentialService: Send + Sync {
    /// Create a credential and start a session for it
    async fn create_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CredentialReceipt, CredentialError>;

    /// Check a password. `Ok(None)` means the pair was rejected.
    async fn verify_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<CredentialReceipt>, CredentialError>;

    /// Identity of the active session, if any
    async fn current_session(&self) -> Option<SessionIdentity>;

    /// End the active session
    async fn end_session(&self) -> Result<(), CredentialError>;

    /// Remove a credential. Only used to undo a credential whose record
    /// could not be created.
    async fn delete_credential(&self, email: &str) -> Result<(), CredentialError>;
}

/// Structured profile records keyed by email
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait UserRecordStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Insert a new record. `Ok(false)` means the store declined it.
    async fn create(&self, profile: &UserProfile) -> Result<bool, StoreError>;
}

/// Image storage keyed by username
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload_profile_image(
        &self,
        username: &str,
        data: Option<Bytes>,
    ) -> Result<bool, StoreError>;

    async fn upload_certificate_image(
        &self,
        username: &str,
        data: Option<Bytes>,
    ) -> Result<bool, StoreError>;
}

/// Process-wide persistent key-value state used as the session cache
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
