use anyhow::Result;
use clap::Parser;

use smooth_tennis::cli::commands::{
    Command, CommandContext, SignInCommand, SignOutCommand, SignUpCommand, StatusCommand,
};
use smooth_tennis::cli::{Cli, Commands};
use smooth_tennis::observability::provisioning_metrics;
use smooth_tennis::{config, init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config()?.clone();
    if let Some(data_dir) = cli.data_dir {
        config.backend.data_dir = data_dir;
    }
    init_telemetry(&config.observability)?;

    let context = CommandContext::from_config(&config);
    let result = tokio::runtime::Runtime::new()?.block_on(async {
        match cli.command {
            Commands::SignUp {
                email,
                username,
                password,
                player_type,
                player_level,
                profile_picture,
                certificate_picture,
            } => {
                SignUpCommand {
                    context,
                    email,
                    username,
                    password,
                    player_type: player_type.into(),
                    player_level,
                    profile_picture,
                    certificate_picture,
                }
                .execute()
                .await
            }
            Commands::SignIn { email, password } => {
                SignInCommand {
                    context,
                    email,
                    password,
                }
                .execute()
                .await
            }
            Commands::SignOut => SignOutCommand { context }.execute().await,
            Commands::Status => StatusCommand { context }.execute().await,
        }
    });

    if config.observability.metrics_enabled {
        provisioning_metrics().log_stats();
    }
    shutdown_telemetry();
    result
}
