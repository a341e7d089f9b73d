use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "smooth-tennis")]
#[command(about = "Account provisioning for SmoothTennis players and coaches")]
#[command(long_about = "SmoothTennis creates and signs in player and coach accounts, attaching \
                       profile pictures and coach certificates. Start with 'smooth-tennis sign-up'.")]
pub struct Cli {
    /// Directory holding the local account data (overrides configuration)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new player or coach account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Coach, Player, or any other account kind
        #[arg(long, default_value = "Player")]
        player_type: String,
        /// Playing level; ignored for coaches
        #[arg(long, default_value = "")]
        player_level: String,
        /// Path to a profile picture
        #[arg(long)]
        profile_picture: Option<String>,
        /// Path to a coaching certificate picture
        #[arg(long)]
        certificate_picture: Option<String>,
    },
    /// Sign in with email and password
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the active session
    SignOut,
    /// Show whether a session is active and the cached account fields
    Status,
}
