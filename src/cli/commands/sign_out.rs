use anyhow::Result;

use super::{Command, CommandContext};

pub struct SignOutCommand {
    pub context: CommandContext,
}

impl Command for SignOutCommand {
    async fn execute(&self) -> Result<()> {
        if self.context.workflow.sign_out().await {
            println!("👋 Signed out");
            Ok(())
        } else {
            anyhow::bail!("Sign out failed")
        }
    }
}
