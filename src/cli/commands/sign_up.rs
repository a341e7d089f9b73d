use anyhow::{Context, Result};
use bytes::Bytes;

use super::{Command, CommandContext};
use crate::accounts::{PlayerType, SignUpRequest};

pub struct SignUpCommand {
    pub context: CommandContext,
    pub email: String,
    pub username: String,
    pub password: String,
    pub player_type: PlayerType,
    pub player_level: String,
    pub profile_picture: Option<String>,
    pub certificate_picture: Option<String>,
}

impl SignUpCommand {
    async fn read_picture(path: Option<&str>) -> Result<Option<Bytes>> {
        match path {
            Some(path) => {
                let data = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read picture {path}"))?;
                Ok(Some(Bytes::from(data)))
            }
            None => Ok(None),
        }
    }
}

impl Command for SignUpCommand {
    async fn execute(&self) -> Result<()> {
        let mut request = SignUpRequest::new(
            self.email.as_str(),
            self.username.as_str(),
            self.password.as_str(),
            self.player_type.clone(),
        )
        .with_player_level(self.player_level.as_str());
        request.profile_picture = Self::read_picture(self.profile_picture.as_deref()).await?;
        request.certificate_picture =
            Self::read_picture(self.certificate_picture.as_deref()).await?;

        let mut reports = self.context.workflow.sign_up_reports(request);
        let mut created = None;
        let mut failures = 0;
        while let Some(report) = reports.recv().await {
            match report {
                Ok(profile) => created = Some(profile),
                Err(e) => {
                    failures += 1;
                    println!("❌ {e}");
                }
            }
        }

        match created {
            Some(profile) if failures == 0 => {
                println!(
                    "✅ Created {} account '{}' for {}",
                    profile.player_type, profile.username, profile.email
                );
                Ok(())
            }
            Some(profile) => {
                anyhow::bail!(
                    "Account '{}' was created but {failures} upload(s) failed",
                    profile.username
                )
            }
            None => anyhow::bail!("Sign up failed"),
        }
    }
}
