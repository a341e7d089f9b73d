use anyhow::Result;

use super::{Command, CommandContext};

pub struct SignInCommand {
    pub context: CommandContext,
    pub email: String,
    pub password: String,
}

impl Command for SignInCommand {
    async fn execute(&self) -> Result<()> {
        let profile = self
            .context
            .workflow
            .sign_in(&self.email, &self.password)
            .await?;

        println!("✅ Signed in as {} ({})", profile.username, profile.player_type);
        if !profile.player_level.is_empty() {
            println!("   🎾 Level {}", profile.player_level);
        }
        Ok(())
    }
}
