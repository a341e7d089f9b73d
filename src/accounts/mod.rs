// Account provisioning
//
// Sign-up and sign-in orchestration over injected credential, record,
// blob and session collaborators.

pub mod errors;
pub mod traits;
pub mod types;
pub mod workflow;


pub use errors::{AuthError, CredentialError, StoreError};
pub use traits::{BlobStore, CredentialService, SessionStore, UserRecordStore};
pub use types::{
    session_keys, session_markers, CredentialReceipt, PlayerType, SessionIdentity, SignUpRequest,
    UploadPolicy, UserProfile, TOP_COMMENTS_NOT_APPLICABLE,
};
pub use workflow::{AccountProvisioningWorkflow, SignUpReport};

#[cfg(any(test, feature = "testing"))]
pub use traits::{MockBlobStore, MockCredentialService, MockSessionStore, MockUserRecordStore};
