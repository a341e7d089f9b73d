// In-memory collaborators. Everything lives in the process and disappears
// with it; call counters make the stores usable as test doubles.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::hashing::{HashStrength, PasswordHashing};
use super::{certificate_image_path, profile_image_path};
use crate::accounts::{
    BlobStore, CredentialError, CredentialReceipt, CredentialService, SessionIdentity,
    SessionStore, StoreError, UserProfile, UserRecordStore,
};

#[derive(Debug, Clone)]
struct StoredCredential {
    uid: String,
    password_hash: String,
}

/// Credential service holding Argon2 hashes in memory, with one active
/// session at a time
#[derive(Debug, Default)]
pub struct InMemoryCredentialService {
    hashing: PasswordHashing,
    credentials: Mutex<HashMap<String, StoredCredential>>,
    session: Mutex<Option<SessionIdentity>>,
    fail_end_session: AtomicBool,
    create_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryCredentialService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hash_strength(strength: HashStrength) -> Self {
        Self {
            hashing: PasswordHashing::new(strength),
            ..Self::default()
        }
    }

    pub async fn has_credential(&self, email: &str) -> bool {
        self.credentials.lock().await.contains_key(email)
    }

    pub fn set_fail_end_session(&self, fail: bool) {
        self.fail_end_session.store(fail, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialService for InMemoryCredentialService {
    async fn create_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CredentialReceipt, CredentialError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let mut credentials = self.credentials.lock().await;
        if credentials.contains_key(email) {
            return Err(CredentialError::AlreadyExists {
                email: email.to_string(),
            });
        }

        let stored = StoredCredential {
            uid: Uuid::new_v4().to_string(),
            password_hash: self.hashing.hash(password)?,
        };
        let receipt = CredentialReceipt {
            uid: stored.uid.clone(),
            email: email.to_string(),
        };
        credentials.insert(email.to_string(), stored);
        drop(credentials);

        *self.session.lock().await = Some(SessionIdentity {
            uid: receipt.uid.clone(),
            email: receipt.email.clone(),
        });
        Ok(receipt)
    }

    async fn verify_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<CredentialReceipt>, CredentialError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);

        let stored = match self.credentials.lock().await.get(email) {
            Some(stored) => stored.clone(),
            None => return Ok(None),
        };
        if !self.hashing.verify(password, &stored.password_hash)? {
            return Ok(None);
        }

        *self.session.lock().await = Some(SessionIdentity {
            uid: stored.uid.clone(),
            email: email.to_string(),
        });
        Ok(Some(CredentialReceipt {
            uid: stored.uid,
            email: email.to_string(),
        }))
    }

    async fn current_session(&self) -> Option<SessionIdentity> {
        self.session.lock().await.clone()
    }

    async fn end_session(&self) -> Result<(), CredentialError> {
        if self.fail_end_session.load(Ordering::SeqCst) {
            return Err(CredentialError::backend("session revocation unavailable"));
        }
        match self.session.lock().await.take() {
            Some(_) => Ok(()),
            None => Err(CredentialError::NoActiveSession),
        }
    }

    async fn delete_credential(&self, email: &str) -> Result<(), CredentialError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if self.credentials.lock().await.remove(email).is_none() {
            return Err(CredentialError::NotFound {
                email: email.to_string(),
            });
        }
        let mut session = self.session.lock().await;
        if session.as_ref().is_some_and(|identity| identity.email == email) {
            *session = None;
        }
        Ok(())
    }
}

/// Profile records keyed by email, with usernames kept unique
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<String, UserProfile>>,
    reject_creates: AtomicBool,
    find_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without going through `create`
    pub async fn insert(&self, profile: UserProfile) {
        self.records
            .lock()
            .await
            .insert(profile.email.clone(), profile);
    }

    pub async fn get(&self, email: &str) -> Option<UserProfile> {
        self.records.lock().await.get(email).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Make every subsequent `create` decline with `Ok(false)`
    pub fn set_reject_creates(&self, reject: bool) {
        self.reject_creates.store(reject, Ordering::SeqCst);
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRecordStore for InMemoryRecordStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, StoreError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().await.get(email).cloned())
    }

    async fn create(&self, profile: &UserProfile) -> Result<bool, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_creates.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let mut records = self.records.lock().await;
        if records.contains_key(&profile.email) {
            return Err(StoreError::Conflict {
                key: profile.email.clone(),
            });
        }
        if records.values().any(|r| r.username == profile.username) {
            return Err(StoreError::Conflict {
                key: profile.username.clone(),
            });
        }
        records.insert(profile.email.clone(), profile.clone());
        Ok(true)
    }
}

/// An uploaded image
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Bytes,
    pub uploaded_at: DateTime<Utc>,
}

/// Upload call as seen by the blob store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobUpload {
    ProfileImage { username: String, has_data: bool },
    CertificateImage { username: String, has_data: bool },
}

/// Image storage keyed by path
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, StoredBlob>>,
    uploads: Mutex<Vec<BlobUpload>>,
    reject_profile_images: AtomicBool,
    reject_certificate_images: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object(&self, path: &str) -> Option<StoredBlob> {
        self.objects.lock().await.get(path).cloned()
    }

    pub async fn uploads(&self) -> Vec<BlobUpload> {
        self.uploads.lock().await.clone()
    }

    pub fn set_reject_profile_images(&self, reject: bool) {
        self.reject_profile_images.store(reject, Ordering::SeqCst);
    }

    pub fn set_reject_certificate_images(&self, reject: bool) {
        self.reject_certificate_images.store(reject, Ordering::SeqCst);
    }

    async fn put(&self, path: String, data: Option<Bytes>) {
        // An absent picture is accepted and stores nothing
        if let Some(data) = data {
            self.objects.lock().await.insert(
                path,
                StoredBlob {
                    data,
                    uploaded_at: Utc::now(),
                },
            );
        }
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload_profile_image(
        &self,
        username: &str,
        data: Option<Bytes>,
    ) -> Result<bool, StoreError> {
        self.uploads.lock().await.push(BlobUpload::ProfileImage {
            username: username.to_string(),
            has_data: data.is_some(),
        });
        if self.reject_profile_images.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.put(profile_image_path(username), data).await;
        Ok(true)
    }

    async fn upload_certificate_image(
        &self,
        username: &str,
        data: Option<Bytes>,
    ) -> Result<bool, StoreError> {
        self.uploads.lock().await.push(BlobUpload::CertificateImage {
            username: username.to_string(),
            has_data: data.is_some(),
        });
        if self.reject_certificate_images.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.put(certificate_image_path(username), data).await;
        Ok(true)
    }
}

/// Session cache living for the process lifetime
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    failing_key: std::sync::Mutex<Option<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.values.lock().await.clone()
    }

    /// Number of `set` calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every `set` of `key` fail until cleared with `None`
    pub fn set_failing_key(&self, key: Option<&str>) {
        let mut failing = self.failing_key.lock().unwrap_or_else(|p| p.into_inner());
        *failing = key.map(str::to_string);
    }

    fn fails_on(&self, key: &str) -> bool {
        let failing = self.failing_key.lock().unwrap_or_else(|p| p.into_inner());
        failing.as_deref() == Some(key)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fails_on(key) {
            return Err(StoreError::backend(format!("session write rejected for {key}")));
        }
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::PlayerType;

    fn profile(username: &str, email: &str) -> UserProfile {
        UserProfile::for_sign_up(username, email, PlayerType::Player, "3.5")
    }

    #[tokio::test]
    async fn credential_lifecycle() {
        let service = InMemoryCredentialService::with_hash_strength(HashStrength::Minimal);

        service.create_credential("a@x.com", "pw").await.unwrap();
        assert!(service.current_session().await.is_some());
        assert!(matches!(
            service.create_credential("a@x.com", "pw").await,
            Err(CredentialError::AlreadyExists { .. })
        ));

        service.end_session().await.unwrap();
        assert!(service.current_session().await.is_none());
        assert!(matches!(
            service.end_session().await,
            Err(CredentialError::NoActiveSession)
        ));

        assert!(service.verify_credential("a@x.com", "nope").await.unwrap().is_none());
        assert!(service.verify_credential("b@x.com", "pw").await.unwrap().is_none());
        let receipt = service.verify_credential("a@x.com", "pw").await.unwrap();
        assert_eq!(receipt.map(|r| r.email), Some("a@x.com".to_string()));
        assert_eq!(service.verify_calls(), 3);

        service.delete_credential("a@x.com").await.unwrap();
        assert!(!service.has_credential("a@x.com").await);
        assert!(service.current_session().await.is_none());
    }

    #[tokio::test]
    async fn record_store_keeps_emails_and_usernames_unique() {
        let store = InMemoryRecordStore::new();
        assert!(store.create(&profile("alice", "a@x.com")).await.unwrap());
        assert!(matches!(
            store.create(&profile("alice", "other@x.com")).await,
            Err(StoreError::Conflict { .. })
        ));
        assert!(matches!(
            store.create(&profile("bob", "a@x.com")).await,
            Err(StoreError::Conflict { .. })
        ));
        assert_eq!(store.len().await, 1);

        store.set_reject_creates(true);
        assert!(!store.create(&profile("carol", "c@x.com")).await.unwrap());
        assert_eq!(store.create_calls(), 4);
    }

    #[tokio::test]
    async fn blob_store_writes_under_username_paths() {
        let store = InMemoryBlobStore::new();
        assert!(store
            .upload_profile_image("alice", Some(Bytes::from_static(b"img")))
            .await
            .unwrap());
        assert!(store.upload_certificate_image("alice", None).await.unwrap());

        let stored = store.object(&profile_image_path("alice")).await.unwrap();
        assert_eq!(stored.data, Bytes::from_static(b"img"));
        assert!(store.object(&certificate_image_path("alice")).await.is_none());
        assert_eq!(store.uploads().await.len(), 2);
    }
}
