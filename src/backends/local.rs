// Directory-backed collaborators used by the command line.
//
// Layout under the data directory:
//   credentials.json   email -> { uid, password_hash }
//   session.json       active credential session
//   records.json       email -> profile
//   markers.json       session markers
//   profile_pictures/<username>/profile.png
//   certificate_pictures/<username>/certificate.png

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::hashing::{HashStrength, PasswordHashing};
use super::{certificate_image_path, is_valid_path_segment, profile_image_path};
use crate::accounts::{
    BlobStore, CredentialError, CredentialReceipt, CredentialService, SessionIdentity,
    SessionStore, StoreError, UserProfile, UserRecordStore,
};
use crate::fs::{FileSystemOperations, StandardFileSystem};

const CREDENTIALS_FILE: &str = "credentials.json";
const SESSION_FILE: &str = "session.json";
const RECORDS_FILE: &str = "records.json";
const MARKERS_FILE: &str = "markers.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    uid: String,
    password_hash: String,
}

/// Credential, record, blob and session storage in one local directory
pub struct LocalBackend {
    root: PathBuf,
    fs: Arc<dyn FileSystemOperations>,
    hashing: PasswordHashing,
    // Serializes read-modify-write cycles on the JSON files
    write_lock: Mutex<()>,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_file_system(root, Arc::new(StandardFileSystem))
    }

    pub fn with_file_system(root: impl Into<PathBuf>, fs: Arc<dyn FileSystemOperations>) -> Self {
        Self {
            root: root.into(),
            fs,
            hashing: PasswordHashing::default(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_hash_strength(mut self, strength: HashStrength) -> Self {
        self.hashing = PasswordHashing::new(strength);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, relative: &str) -> String {
        self.root.join(relative).to_string_lossy().into_owned()
    }

    async fn load<T>(&self, file: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        match self
            .fs
            .read(&self.path_of(file))
            .await
            .map_err(StoreError::backend)?
        {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(T::default()),
        }
    }

    async fn save<T>(&self, file: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let contents = serde_json::to_vec_pretty(value)?;
        self.write_file(file, &contents).await
    }

    async fn write_file(&self, relative: &str, contents: &[u8]) -> Result<(), StoreError> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            self.fs
                .create_dir_all(&parent.to_string_lossy())
                .await
                .map_err(StoreError::backend)?;
        }
        // Write beside the target and rename so readers never see a partial file
        let target = path.to_string_lossy().into_owned();
        let staging = format!("{target}.tmp");
        self.fs
            .write(&staging, contents)
            .await
            .map_err(StoreError::backend)?;
        self.fs
            .rename(&staging, &target)
            .await
            .map_err(StoreError::backend)
    }

    fn check_username(username: &str) -> Result<(), StoreError> {
        if is_valid_path_segment(username) {
            Ok(())
        } else {
            Err(StoreError::InvalidKey {
                key: username.to_string(),
            })
        }
    }

    async fn load_credentials(&self) -> Result<BTreeMap<String, StoredCredential>, CredentialError> {
        self.load(CREDENTIALS_FILE)
            .await
            .map_err(CredentialError::backend)
    }

    async fn save_credentials(
        &self,
        credentials: &BTreeMap<String, StoredCredential>,
    ) -> Result<(), CredentialError> {
        self.save(CREDENTIALS_FILE, credentials)
            .await
            .map_err(CredentialError::backend)
    }

    async fn save_session(&self, session: Option<&SessionIdentity>) -> Result<(), CredentialError> {
        match session {
            Some(identity) => self
                .save(SESSION_FILE, identity)
                .await
                .map_err(CredentialError::backend),
            None => self
                .fs
                .remove_file(&self.path_of(SESSION_FILE))
                .await
                .map_err(CredentialError::backend),
        }
    }

    async fn load_session(&self) -> Result<Option<SessionIdentity>, StoreError> {
        self.load::<Option<SessionIdentity>>(SESSION_FILE).await
    }
}

#[async_trait]
impl CredentialService for LocalBackend {
    async fn create_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CredentialReceipt, CredentialError> {
        let _guard = self.write_lock.lock().await;
        let mut credentials = self.load_credentials().await?;
        if credentials.contains_key(email) {
            return Err(CredentialError::AlreadyExists {
                email: email.to_string(),
            });
        }

        let stored = StoredCredential {
            uid: Uuid::new_v4().to_string(),
            password_hash: self.hashing.hash(password)?,
        };
        let identity = SessionIdentity {
            uid: stored.uid.clone(),
            email: email.to_string(),
        };
        credentials.insert(email.to_string(), stored);
        self.save_credentials(&credentials).await?;
        self.save_session(Some(&identity)).await?;

        debug!(uid = %identity.uid, "Stored new credential");
        Ok(CredentialReceipt {
            uid: identity.uid,
            email: identity.email,
        })
    }

    async fn verify_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<CredentialReceipt>, CredentialError> {
        let _guard = self.write_lock.lock().await;
        let credentials = self.load_credentials().await?;
        let Some(stored) = credentials.get(email) else {
            return Ok(None);
        };
        if !self.hashing.verify(password, &stored.password_hash)? {
            return Ok(None);
        }

        let identity = SessionIdentity {
            uid: stored.uid.clone(),
            email: email.to_string(),
        };
        self.save_session(Some(&identity)).await?;
        Ok(Some(CredentialReceipt {
            uid: identity.uid,
            email: identity.email,
        }))
    }

    async fn current_session(&self) -> Option<SessionIdentity> {
        match self.load_session().await {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "Unreadable session file treated as signed out");
                None
            }
        }
    }

    async fn end_session(&self) -> Result<(), CredentialError> {
        let _guard = self.write_lock.lock().await;
        if self
            .load_session()
            .await
            .map_err(CredentialError::backend)?
            .is_none()
        {
            return Err(CredentialError::NoActiveSession);
        }
        self.save_session(None).await
    }

    async fn delete_credential(&self, email: &str) -> Result<(), CredentialError> {
        let _guard = self.write_lock.lock().await;
        let mut credentials = self.load_credentials().await?;
        if credentials.remove(email).is_none() {
            return Err(CredentialError::NotFound {
                email: email.to_string(),
            });
        }
        self.save_credentials(&credentials).await?;

        let session = self.load_session().await.map_err(CredentialError::backend)?;
        if session.is_some_and(|identity| identity.email == email) {
            self.save_session(None).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserRecordStore for LocalBackend {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, StoreError> {
        let records: BTreeMap<String, UserProfile> = self.load(RECORDS_FILE).await?;
        Ok(records.get(email).cloned())
    }

    async fn create(&self, profile: &UserProfile) -> Result<bool, StoreError> {
        // Usernames become image directories
        Self::check_username(&profile.username)?;
        let _guard = self.write_lock.lock().await;
        let mut records: BTreeMap<String, UserProfile> = self.load(RECORDS_FILE).await?;
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
        self.save(RECORDS_FILE, &records).await?;
        Ok(true)
    }
}

#[async_trait]
impl BlobStore for LocalBackend {
    async fn upload_profile_image(
        &self,
        username: &str,
        data: Option<Bytes>,
    ) -> Result<bool, StoreError> {
        Self::check_username(username)?;
        if let Some(data) = data {
            self.write_file(&profile_image_path(username), &data).await?;
        }
        Ok(true)
    }

    async fn upload_certificate_image(
        &self,
        username: &str,
        data: Option<Bytes>,
    ) -> Result<bool, StoreError> {
        Self::check_username(username)?;
        if let Some(data) = data {
            self.write_file(&certificate_image_path(username), &data)
                .await?;
        }
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for LocalBackend {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut markers: BTreeMap<String, String> = self.load(MARKERS_FILE).await?;
        markers.insert(key.to_string(), value.to_string());
        self.save(MARKERS_FILE, &markers).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let markers: BTreeMap<String, String> = self.load(MARKERS_FILE).await?;
        Ok(markers.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut markers: BTreeMap<String, String> = self.load(MARKERS_FILE).await?;
        if markers.remove(key).is_some() {
            self.save(MARKERS_FILE, &markers).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystemOperations;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn missing_files_read_as_empty() {
        let mut fs = MockFileSystemOperations::new();
        fs.expect_read().returning(|_| Ok(None));

        let backend = LocalBackend::with_file_system("/data", Arc::new(fs));
        assert!(backend.find_by_email("a@x.com").await.unwrap().is_none());
        assert!(backend.get("username").await.unwrap().is_none());
        assert!(backend.current_session().await.is_none());
    }

    #[tokio::test]
    async fn failed_write_surfaces_as_store_error() {
        let mut fs = MockFileSystemOperations::new();
        fs.expect_read().returning(|_| Ok(None));
        fs.expect_create_dir_all().returning(|_| Ok(()));
        fs.expect_write()
            .with(eq("/data/markers.json.tmp"), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("disk full")));
        fs.expect_rename().times(0);

        let backend = LocalBackend::with_file_system("/data", Arc::new(fs));
        let err = backend.set("username", "alice").await.unwrap_err();
        assert!(matches!(err, StoreError::Backend { .. }));
    }

    #[tokio::test]
    async fn saves_are_staged_then_renamed_into_place() {
        let mut fs = MockFileSystemOperations::new();
        let mut seq = mockall::Sequence::new();
        fs.expect_read().returning(|_| Ok(None));
        fs.expect_create_dir_all().returning(|_| Ok(()));
        fs.expect_write()
            .with(eq("/data/records.json.tmp"), mockall::predicate::always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        fs.expect_rename()
            .with(eq("/data/records.json.tmp"), eq("/data/records.json"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let backend = LocalBackend::with_file_system("/data", Arc::new(fs));
        let profile = UserProfile::for_sign_up("alice", "a@x.com", "Player".into(), "3.5");
        assert!(backend.create(&profile).await.unwrap());
    }

    #[tokio::test]
    async fn usernames_that_leave_the_image_directory_are_rejected() {
        // No expectations: any file system call would panic
        let fs = MockFileSystemOperations::new();
        let backend = LocalBackend::with_file_system("/data", Arc::new(fs));

        for username in ["../../escaped", "a/b", "a\\b", "..", "", "tab\tname"] {
            let profile = UserProfile::for_sign_up(username, "a@x.com", "Player".into(), "");
            assert!(
                matches!(
                    backend.create(&profile).await,
                    Err(StoreError::InvalidKey { .. })
                ),
                "{username:?}"
            );
            let upload = backend
                .upload_profile_image(username, Some(Bytes::from_static(b"img")))
                .await;
            assert!(matches!(upload, Err(StoreError::InvalidKey { .. })), "{username:?}");
        }
    }

    #[tokio::test]
    async fn absent_picture_touches_nothing() {
        // No expectations: any file system call would panic
        let fs = MockFileSystemOperations::new();
        let backend = LocalBackend::with_file_system("/data", Arc::new(fs));

        assert!(backend.upload_profile_image("alice", None).await.unwrap());
        assert!(backend.upload_certificate_image("alice", None).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_records_file_is_a_serialization_error() {
        let mut fs = MockFileSystemOperations::new();
        fs.expect_read()
            .with(eq("/data/records.json"))
            .returning(|_| Ok(Some(b"not json".to_vec())));

        let backend = LocalBackend::with_file_system("/data", Arc::new(fs));
        let err = backend.find_by_email("a@x.com").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }
}
