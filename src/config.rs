use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::migration::target::DEFAULT_INVITATION_NOTES;

/// Configuration file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "aws-account-migration.toml";

/// AWS Organizations never returns more than 20 results per page
pub const MAX_PAGE_SIZE: i32 = 20;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MigrationConfig {
    pub aws: AwsConfig,
    pub invitation: InvitationConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AwsConfig {
    /// Region for the SDK clients; the profile's region when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Attempts per request, first attempt included
    pub max_attempts: u32,
    pub page_size: i32,
    /// Role assumed in each child account to accept its invitation
    pub role_name: String,
    pub role_session_name: String,
    /// Sustained request rate shared by every Organizations client
    pub requests_per_second: u32,
    pub burst_capacity: u32,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: None,
            max_attempts: 3,
            page_size: MAX_PAGE_SIZE,
            role_name: "AwsAccountMigrationAcceptInvitationRole".to_string(),
            role_session_name: "aws-account-migration-example".to_string(),
            requests_per_second: 2,
            burst_capacity: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct InvitationConfig {
    /// Notes attached to every invitation sent
    pub notes: String,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            notes: DEFAULT_INVITATION_NOTES.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// Emit JSON records instead of human-readable lines
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl MigrationConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. `path`, or `aws-account-migration.toml` in the working directory
    /// 3. Environment variables (`AWS_ACCOUNT_MIGRATION_AWS__MAX_ATTEMPTS=5`)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Configuration file {} does not exist", path.display());
                }
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("AWS_ACCOUNT_MIGRATION")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: MigrationConfig = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.aws.max_attempts == 0 {
            bail!("aws.max_attempts must be at least 1");
        }
        if self.aws.page_size < 1 || self.aws.page_size > MAX_PAGE_SIZE {
            bail!(
                "aws.page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                self.aws.page_size
            );
        }
        if self.aws.requests_per_second == 0 {
            bail!("aws.requests_per_second must be at least 1");
        }
        if self.aws.role_name.trim().is_empty() {
            bail!("aws.role_name must not be empty");
        }
        if self.aws.role_session_name.trim().is_empty() {
            bail!("aws.role_session_name must not be empty");
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), toml_content)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::debug!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = MigrationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.aws.page_size, 20);
        assert_eq!(config.aws.max_attempts, 3);
        assert_eq!(
            config.invitation.notes,
            "Invite generated by AWS Account Migration Example Script"
        );
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("migration.toml");
        std::fs::write(&path, "[aws]\nregion = \"eu-west-1\"\nmax_attempts = 5\n").unwrap();

        let config = MigrationConfig::load(Some(&path)).unwrap();
        assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.aws.max_attempts, 5);
        assert_eq!(config.aws.role_name, "AwsAccountMigrationAcceptInvitationRole");
        assert_eq!(config.observability, ObservabilityConfig::default());
    }

    #[test]
    fn oversized_page_is_rejected() {
        let mut config = MigrationConfig::default();
        config.aws.page_size = 50;
        assert!(config.validate().is_err());

        config.aws.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_rate_and_empty_role_are_rejected() {
        let mut config = MigrationConfig::default();
        config.aws.requests_per_second = 0;
        assert!(config.validate().is_err());

        let mut config = MigrationConfig::default();
        config.aws.role_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let error = MigrationConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(error.to_string().contains("does not exist"));
    }
}
