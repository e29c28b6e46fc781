//! The organization accounts are migrated out of
//!
//! Drives the acceptance half of the handshake protocol: ordering the
//! invitations, removing each child account from this organization, and
//! dissolving the organization before its management account can leave.

use std::sync::Arc;
use tracing::{info, warn, Instrument, Span};

use super::directory::{CredentialBroker, Directory};
use super::errors::MigrationError;
use super::handshake::{management_last, Handshake};
use super::prompt::Confirmer;
use super::types::{Account, AccountId, Organization};

pub struct SourceOrganization {
    directory: Arc<dyn Directory>,
    broker: Arc<dyn CredentialBroker>,
    organization: Organization,
    management_account: Account,
    child_accounts: Vec<Account>,
    account_was_specified: bool,
    span: Span,
}

impl std::fmt::Debug for SourceOrganization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceOrganization")
            .field("organization", &self.organization)
            .field("management_account", &self.management_account)
            .field("child_accounts", &self.child_accounts)
            .field("account_was_specified", &self.account_was_specified)
            .finish_non_exhaustive()
    }
}

impl SourceOrganization {
    /// Load the organization and its candidate accounts.
    ///
    /// With `selected_account` only that account is a candidate; otherwise every
    /// account except the management account is.
    pub async fn load(
        directory: Arc<dyn Directory>,
        broker: Arc<dyn CredentialBroker>,
        selected_account: Option<&str>,
        span: Span,
    ) -> Result<Self, MigrationError> {
        let loaded = async {
            info!("Retrieving source organization and management account");
            let organization = directory.describe_organization().await?;
            let management_account = directory
                .describe_account(&organization.management_account_id)
                .await?;
            info!(
                organization = %organization.id,
                management_account = %management_account.id,
                "Source organization loaded"
            );

            let child_accounts = match selected_account {
                Some(account_id) => {
                    info!(account = account_id, "Retrieving selected child account");
                    vec![directory.describe_account(account_id).await?]
                }
                None => {
                    info!("Retrieving all child accounts");
                    directory
                        .list_accounts()
                        .await?
                        .into_iter()
                        .filter(|account| account.id != management_account.id)
                        .collect()
                }
            };
            info!(count = child_accounts.len(), "Candidate accounts retrieved");

            Ok::<_, MigrationError>((organization, management_account, child_accounts))
        }
        .instrument(span.clone())
        .await?;

        let (organization, management_account, child_accounts) = loaded;
        Ok(Self {
            directory,
            broker,
            organization,
            management_account,
            child_accounts,
            account_was_specified: selected_account.is_some(),
            span,
        })
    }

    pub fn organization(&self) -> &Organization {
        &self.organization
    }

    pub fn management_account(&self) -> &Account {
        &self.management_account
    }

    pub fn child_accounts(&self) -> &[Account] {
        &self.child_accounts
    }

    /// True when the operator picked a single account to migrate
    pub fn account_was_specified(&self) -> bool {
        self.account_was_specified
    }

    pub fn details(&self) -> String {
        format!(
            "{} - {} - {}",
            self.organization.id, self.management_account.id, self.management_account.email
        )
    }

    pub fn is_management_account(&self, account_id: &str) -> bool {
        account_id == self.management_account.id
    }

    /// Whether an invitation for `account_id` may be acted on by this organization
    pub fn is_member(&self, account_id: &str) -> bool {
        self.is_management_account(account_id)
            || self.child_accounts.iter().any(|account| account.id == account_id)
    }

    pub fn processing_order(
        &self,
        handshakes: Vec<Handshake>,
    ) -> Result<Vec<Handshake>, MigrationError> {
        management_last(handshakes, &self.management_account.id)
    }

    /// Accept every invitation, management account last.
    ///
    /// Returns the ids of the accounts that were migrated, in processing order.
    pub async fn accept(
        &self,
        handshakes: Vec<Handshake>,
        confirmer: &dyn Confirmer,
    ) -> Result<Vec<AccountId>, MigrationError> {
        async move {
            let ordered = self.processing_order(handshakes)?;
            let mut migrated = Vec::with_capacity(ordered.len());

            for handshake in &ordered {
                let account_id = handshake.account_id()?;
                if !self.is_member(account_id) {
                    warn!(
                        handshake = %handshake.id,
                        account = account_id,
                        "Skipping invitation for an account outside organization {}",
                        self.organization.id
                    );
                    continue;
                }

                if let Some(account_id) = self.accept_invitation(handshake, confirmer).await? {
                    migrated.push(account_id);
                }
            }

            info!(count = migrated.len(), "Invitation acceptance finished");
            Ok::<_, MigrationError>(migrated)
        }
        .instrument(self.span.clone())
        .await
    }

    pub async fn accept_invitation(
        &self,
        handshake: &Handshake,
        confirmer: &dyn Confirmer,
    ) -> Result<Option<AccountId>, MigrationError> {
        async {
            let parties = handshake.parties()?;
            let account_id = parties.account.id.as_str();
            let is_management = self.is_management_account(account_id);

            let prompt = format!(
                "Accept invite {} to move account {} to organization {}. Proceed?",
                handshake.id, account_id, parties.organization.id
            );
            if !confirmer.confirm(&prompt)? {
                info!(handshake = %handshake.id, "Declining invitation");
                let declined = if is_management {
                    self.directory.decline_handshake(&handshake.id).await?
                } else {
                    self.account_scoped_directory(account_id)
                        .await?
                        .decline_handshake(&handshake.id)
                        .await?
                };
                self.log_handshake_result(&handshake.id, account_id, &declined);
                return Ok(None);
            }

            let accepted = if is_management {
                if !self.migrate_management_account(handshake, confirmer).await? {
                    warn!(handshake = %handshake.id, "Could not delete organization.");
                    return Ok(None);
                }
                info!(handshake = %handshake.id, "Accepting invitation");
                self.directory.accept_handshake(&handshake.id).await?
            } else {
                let scoped = self.account_scoped_directory(account_id).await?;
                info!(
                    "Removing {} from organization {}",
                    account_id, self.organization.id
                );
                self.directory
                    .remove_account_from_organization(account_id)
                    .await?;
                info!(handshake = %handshake.id, "Accepting invitation");
                scoped.accept_handshake(&handshake.id).await?
            };

            self.log_handshake_result(&handshake.id, account_id, &accepted);
            Ok::<_, MigrationError>(Some(account_id.to_string()))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Delete the organization so its management account can join another.
    ///
    /// Returns false when the operator declines. Deletion failures propagate.
    pub async fn migrate_management_account(
        &self,
        handshake: &Handshake,
        confirmer: &dyn Confirmer,
    ) -> Result<bool, MigrationError> {
        let prompt = format!("Delete AWS organization {}?", self.organization.id);
        if !confirmer.confirm(&prompt)? {
            info!("Skipping deletion of organization.");
            return Ok(false);
        }

        info!(
            handshake = %handshake.id,
            "Deleting organization {}", self.organization.id
        );
        self.directory.delete_organization().await?;
        info!("Organization {} deleted", self.organization.id);
        Ok(true)
    }

    async fn account_scoped_directory(
        &self,
        account_id: &str,
    ) -> Result<Arc<dyn Directory>, MigrationError> {
        let credentials = self
            .broker
            .assume_role_for_account(account_id)
            .await
            .map_err(|source| MigrationError::AssumeRole {
                account_id: account_id.to_string(),
                source,
            })?;
        Ok(self.broker.scoped_directory(credentials))
    }

    fn log_handshake_result(&self, handshake_id: &str, account_id: &str, result: &Handshake) {
        info!(
            handshake = handshake_id,
            account = account_id,
            state = %result.state,
            "Invitation {} for {} from organization {} {}!",
            handshake_id,
            account_id,
            self.organization.id,
            result.state
        );
    }
}
