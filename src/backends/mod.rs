// Reference collaborator implementations
//
// `memory` keeps everything in process; `local` persists to a directory
// and backs the command line.

pub mod hashing;
pub mod local;
pub mod memory;

use std::sync::Arc;

use crate::accounts::AccountProvisioningWorkflow;
use crate::config::ProvisioningConfig;

pub use hashing::{HashStrength, PasswordHashing};
pub use local::LocalBackend;
pub use memory::{
    BlobUpload, InMemoryBlobStore, InMemoryCredentialService, InMemoryRecordStore,
    InMemorySessionStore, StoredBlob,
};

/// Whether `username` can name a single directory under a storage root.
///
/// Rejects empty names, `.` and `..`, path separators and control characters.
pub fn is_valid_path_segment(username: &str) -> bool {
    !username.is_empty()
        && username != "."
        && !username.contains("..")
        && !username
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Blob path of a user's profile picture
pub fn profile_image_path(username: &str) -> String {
    format!("profile_pictures/{username}/profile.png")
}

/// Blob path of a coach's certificate picture
pub fn certificate_image_path(username: &str) -> String {
    format!("certificate_pictures/{username}/certificate.png")
}

/// Workflow whose four collaborators are the same local backend
pub fn local_workflow(
    backend: Arc<LocalBackend>,
    settings: ProvisioningConfig,
) -> AccountProvisioningWorkflow {
    AccountProvisioningWorkflow::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        backend,
        settings,
    )
}

/// In-memory collaborators, kept together so tests can inspect them after
/// handing clones to a workflow
#[derive(Clone, Default)]
pub struct InMemoryBackends {
    pub credentials: Arc<InMemoryCredentialService>,
    pub records: Arc<InMemoryRecordStore>,
    pub blobs: Arc<InMemoryBlobStore>,
    pub session: Arc<InMemorySessionStore>,
}

impl InMemoryBackends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hash_strength(strength: HashStrength) -> Self {
        Self {
            credentials: Arc::new(InMemoryCredentialService::with_hash_strength(strength)),
            ..Self::default()
        }
    }

    pub fn workflow(&self, settings: ProvisioningConfig) -> AccountProvisioningWorkflow {
        AccountProvisioningWorkflow::new(
            self.credentials.clone(),
            self.records.clone(),
            self.blobs.clone(),
            self.session.clone(),
            settings,
        )
    }
}
