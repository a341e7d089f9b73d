use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::accounts::UploadPolicy;

/// Main configuration structure for SmoothTennis
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SmoothTennisConfig {
    /// Sign-up and sign-in behaviour
    pub provisioning: ProvisioningConfig,
    /// Local backend used by the command line
    pub backend: BackendConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Scheduling and reporting of the sign-up image uploads
    pub upload_policy: UploadPolicy,
    /// Delete the credential when the user record cannot be created
    pub rollback_orphaned_credentials: bool,
    /// Remove cached session markers after a successful sign-out
    pub clear_session_on_sign_out: bool,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            upload_policy: UploadPolicy::Sequential,
            rollback_orphaned_credentials: true,
            clear_session_on_sign_out: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Directory holding credentials, records, images and session state
    pub data_dir: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            data_dir: ".smooth-tennis".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON log lines instead of human readable ones
    pub json_logs: bool,
    /// Log metric counters on exit
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
            metrics_enabled: false,
        }
    }
}

impl SmoothTennisConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (smooth-tennis.toml, .smooth-tennis-rc)
    /// 3. Environment variables (prefixed with SMOOTH_TENNIS__)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("smooth-tennis.toml").exists() {
            builder = builder.add_source(File::with_name("smooth-tennis"));
        }

        if Path::new(".smooth-tennis-rc").exists() {
            builder = builder.add_source(
                File::with_name(".smooth-tennis-rc").format(FileFormat::Toml),
            );
        }

        // Double underscore keeps snake_case keys like upload_policy intact
        builder = builder.add_source(
            Environment::with_prefix("SMOOTH_TENNIS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let smooth_tennis_config: SmoothTennisConfig = config.try_deserialize()?;
        Ok(smooth_tennis_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<SmoothTennisConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = SmoothTennisConfig::load_env_file();
        SmoothTennisConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static SmoothTennisConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_favor_the_safer_provisioning_choices() {
        let config = SmoothTennisConfig::default();
        assert_eq!(config.provisioning.upload_policy, UploadPolicy::Sequential);
        assert!(config.provisioning.rollback_orphaned_credentials);
        assert!(config.provisioning.clear_session_on_sign_out);
        assert_eq!(config.backend.data_dir, ".smooth-tennis");
    }

    #[test]
    fn saved_config_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smooth-tennis.toml");

        let mut config = SmoothTennisConfig::default();
        config.provisioning.upload_policy = UploadPolicy::Independent;
        config.provisioning.rollback_orphaned_credentials = false;
        config.save_to_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("upload_policy = \"independent\""));

        let parsed: SmoothTennisConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.provisioning.upload_policy, UploadPolicy::Independent);
        assert!(!parsed.provisioning.rollback_orphaned_credentials);
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let parsed: SmoothTennisConfig =
            toml::from_str("[provisioning]\nupload_policy = \"concurrent\"\n").unwrap();
        assert_eq!(parsed.provisioning.upload_policy, UploadPolicy::Concurrent);
        assert!(parsed.provisioning.clear_session_on_sign_out);
        assert_eq!(parsed.observability.log_level, "warn");
    }
}
