use thiserror::Error;

/// Errors surfaced to callers of the provisioning workflow. Collaborator
/// detail is logged where it happens and never carried in here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("failed to create new user")]
    NewUserCreation,
    #[error("sign in failed")]
    SignInFailed,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("a credential already exists for {email}")]
    AlreadyExists { email: String },
    #[error("no credential exists for {email}")]
    NotFound { email: String },
    #[error("no active session")]
    NoActiveSession,
    #[error("password hashing failed: {message}")]
    Hashing { message: String },
    #[error("credential backend error: {message}")]
    Backend { message: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists: {key}")]
    Conflict { key: String },
    #[error("not usable as a storage key: {key:?}")]
    InvalidKey { key: String },
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    #[error("store backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            message: err.to_string(),
        }
    }
}

impl CredentialError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        CredentialError::Backend {
            message: err.to_string(),
        }
    }
}
