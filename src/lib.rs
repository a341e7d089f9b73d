// SmoothTennis - account provisioning for tennis players and coaches
// This exposes the core components for testing and integration

pub mod accounts;
pub mod backends;
pub mod cli;
pub mod config;
pub mod fs;
pub mod observability;
pub mod telemetry;

// Re-export key types for easy access
pub use accounts::{
    AccountProvisioningWorkflow, AuthError, BlobStore, CredentialService, PlayerType,
    SessionStore, SignUpRequest, UploadPolicy, UserProfile, UserRecordStore,
};
pub use backends::{InMemoryBackends, LocalBackend};
pub use crate::config::{config, ProvisioningConfig, SmoothTennisConfig};
pub use observability::{provisioning_metrics, OperationTimer, ProvisioningMetrics};
pub use telemetry::{create_provisioning_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
