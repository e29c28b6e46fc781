//! Collaborator abstractions for AWS Organizations and STS
//!
//! The migration engine only talks to these traits, so the same sequencing
//! logic runs against the AWS SDK clients in production and against in-memory
//! doubles in tests.

use async_trait::async_trait;
use std::sync::Arc;

use super::errors::ProviderError;
use super::handshake::{Handshake, HandshakeFilter};
use super::types::{Account, Organization, OrganizationalUnit, ScopedCredentials};

/// Organization directory operations, as seen by one set of credentials
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Directory: Send + Sync {
    async fn describe_organization(&self) -> Result<Organization, ProviderError>;

    async fn describe_account(&self, account_id: &str) -> Result<Account, ProviderError>;

    /// Every account in the organization, management account included
    async fn list_accounts(&self) -> Result<Vec<Account>, ProviderError>;

    async fn list_handshakes(
        &self,
        filter: &HandshakeFilter,
    ) -> Result<Vec<Handshake>, ProviderError>;

    /// Invite an account into this organization
    async fn invite_account(
        &self,
        target_account_id: &str,
        notes: &str,
    ) -> Result<Handshake, ProviderError>;

    async fn accept_handshake(&self, handshake_id: &str) -> Result<Handshake, ProviderError>;

    async fn decline_handshake(&self, handshake_id: &str) -> Result<Handshake, ProviderError>;

    async fn remove_account_from_organization(
        &self,
        account_id: &str,
    ) -> Result<(), ProviderError>;

    async fn delete_organization(&self) -> Result<(), ProviderError>;

    async fn describe_organizational_unit(
        &self,
        organizational_unit_id: &str,
    ) -> Result<OrganizationalUnit, ProviderError>;

    /// Root ids of the organization
    async fn list_roots(&self) -> Result<Vec<String>, ProviderError>;

    async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> Result<(), ProviderError>;
}

/// Exchanges an account id for credentials scoped to that account
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    async fn assume_role_for_account(
        &self,
        account_id: &str,
    ) -> Result<ScopedCredentials, ProviderError>;

    /// Build a directory client acting with `credentials`. The caller owns it
    /// and drops it after its follow-up call.
    fn scoped_directory(&self, credentials: ScopedCredentials) -> Arc<dyn Directory>;
}
