use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_organizations::config::{Builder as OrganizationsConfig, Credentials};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

use super::errors::classify_sdk_error;
use super::organizations::AwsDirectory;
use super::rate_limit::{RateLimitedDirectory, RequestPacer};
use crate::migration::{CredentialBroker, Directory, ProviderError, ScopedCredentials};

/// Assumes the migration role in member accounts using the source
/// organization's management credentials
#[derive(Debug, Clone)]
pub struct StsCredentialBroker {
    sts: aws_sdk_sts::Client,
    sdk_config: SdkConfig,
    role_name: String,
    session_name: String,
    page_size: i32,
    pacer: RequestPacer,
}

impl StsCredentialBroker {
    pub fn new(
        sdk_config: SdkConfig,
        role_name: impl Into<String>,
        session_name: impl Into<String>,
        page_size: i32,
        pacer: RequestPacer,
    ) -> Self {
        Self {
            sts: aws_sdk_sts::Client::new(&sdk_config),
            sdk_config,
            role_name: role_name.into(),
            session_name: session_name.into(),
            page_size,
            pacer,
        }
    }

    pub fn role_arn(&self, account_id: &str) -> String {
        role_arn(account_id, &self.role_name)
    }
}

pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{account_id}:role/{role_name}")
}

#[async_trait]
impl CredentialBroker for StsCredentialBroker {
    async fn assume_role_for_account(
        &self,
        account_id: &str,
    ) -> Result<ScopedCredentials, ProviderError> {
        let role_arn = self.role_arn(account_id);
        info!(account = account_id, role = %role_arn, "Assuming migration role");

        let output = self
            .pacer
            .paced(false, async {
                self.sts
                    .assume_role()
                    .role_arn(&role_arn)
                    .role_session_name(&self.session_name)
                    .send()
                    .await
                    .map_err(classify_sdk_error)
            })
            .await?;

        let credentials = output
            .credentials()
            .ok_or_else(|| ProviderError::invalid_response("AssumeRole returned no credentials"))?;
        let expiration = DateTime::<Utc>::from_timestamp(credentials.expiration().secs(), 0);
        debug!(account = account_id, expiration = ?expiration, "Scoped credentials issued");

        Ok(ScopedCredentials {
            account_id: account_id.to_string(),
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration,
        })
    }

    fn scoped_directory(&self, credentials: ScopedCredentials) -> Arc<dyn Directory> {
        let provider = Credentials::new(
            credentials.access_key_id,
            credentials.secret_access_key,
            Some(credentials.session_token),
            credentials.expiration.map(SystemTime::from),
            "assume-role",
        );
        let config = OrganizationsConfig::from(&self.sdk_config)
            .credentials_provider(provider)
            .build();
        let client = aws_sdk_organizations::Client::from_conf(config);

        Arc::new(RateLimitedDirectory::new(
            Arc::new(AwsDirectory::new(client, self.page_size)),
            self.pacer.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_arn_targets_the_member_account() {
        assert_eq!(
            role_arn("111111111111", "AwsAccountMigrationAcceptInvitationRole"),
            "arn:aws:iam::111111111111:role/AwsAccountMigrationAcceptInvitationRole"
        );
    }
}
