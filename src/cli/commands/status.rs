use anyhow::Result;

use super::{Command, CommandContext};
use crate::accounts::{session_keys, CredentialService, SessionStore};

pub struct StatusCommand {
    pub context: CommandContext,
}

impl Command for StatusCommand {
    async fn execute(&self) -> Result<()> {
        println!("🎾 SMOOTHTENNIS ACCOUNT STATUS");
        println!("=============================");

        match self.context.backend.current_session().await {
            Some(identity) => println!("🟢 Signed in as {}", identity.email),
            None => println!("⚪ Signed out"),
        }

        println!();
        println!("📇 CACHED ACCOUNT FIELDS:");
        for key in session_keys::ALL {
            let value = self.context.backend.get(key).await?;
            println!("   {key}: {}", value.as_deref().unwrap_or("-"));
        }
        Ok(())
    }
}
