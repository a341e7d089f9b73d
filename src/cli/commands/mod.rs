use anyhow::Result;
use std::sync::Arc;

use crate::accounts::AccountProvisioningWorkflow;
use crate::backends::{local_workflow, LocalBackend};
use crate::config::SmoothTennisConfig;

pub mod sign_in;
pub mod sign_out;
pub mod sign_up;
pub mod status;

pub use sign_in::SignInCommand;
pub use sign_out::SignOutCommand;
pub use sign_up::SignUpCommand;
pub use status::StatusCommand;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Local backend and workflow built from configuration
pub struct CommandContext {
    pub backend: Arc<LocalBackend>,
    pub workflow: AccountProvisioningWorkflow,
}

impl CommandContext {
    pub fn from_config(config: &SmoothTennisConfig) -> Self {
        let backend = Arc::new(LocalBackend::new(&config.backend.data_dir));
        let workflow = local_workflow(Arc::clone(&backend), config.provisioning.clone());
        Self { backend, workflow }
    }
}
