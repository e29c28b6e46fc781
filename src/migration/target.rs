//! The organization accounts are migrated into
//!
//! Issues invitations, picks up invitations left open by an earlier run, and
//! places accepted accounts in the destination organizational unit.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument, Span};

use super::directory::Directory;
use super::errors::{MigrationError, ProviderError};
use super::handshake::{Handshake, HandshakeFilter};
use super::prompt::Confirmer;
use super::source::SourceOrganization;
use super::types::{Account, AccountId, Organization, OrganizationalUnit};

pub const DEFAULT_INVITATION_NOTES: &str =
    "Invite generated by AWS Account Migration Example Script";

#[derive(Debug, Clone)]
pub struct TargetOptions {
    /// Only keep pending invitations for this account
    pub account: Option<AccountId>,
    /// Organizational unit accepted accounts are moved into
    pub organizational_unit: Option<String>,
    pub invitation_notes: String,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            account: None,
            organizational_unit: None,
            invitation_notes: DEFAULT_INVITATION_NOTES.to_string(),
        }
    }
}

/// Where accepted accounts end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub root_id: String,
    pub destination: OrganizationalUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed,
    Declined,
    NoDestination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPlacement {
    pub account_id: AccountId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlacementReport {
    pub placed: Vec<AccountId>,
    pub declined: Vec<AccountId>,
    pub failed: Vec<FailedPlacement>,
}

impl PlacementReport {
    /// Accounts that joined the organization but are still under the root
    pub fn unplaced(&self) -> impl Iterator<Item = &str> {
        self.declined
            .iter()
            .map(String::as_str)
            .chain(self.failed.iter().map(|f| f.account_id.as_str()))
    }
}

pub struct TargetOrganization {
    directory: Arc<dyn Directory>,
    organization: Organization,
    management_account: Account,
    placement: Option<Placement>,
    invitations: Vec<Handshake>,
    invitation_notes: String,
    span: Span,
}

impl std::fmt::Debug for TargetOrganization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetOrganization")
            .field("organization", &self.organization)
            .field("placement", &self.placement)
            .field("invitations", &self.invitations.len())
            .finish_non_exhaustive()
    }
}

impl TargetOrganization {
    pub async fn load(
        directory: Arc<dyn Directory>,
        options: TargetOptions,
        span: Span,
    ) -> Result<Self, MigrationError> {
        let loaded = async {
            info!("Retrieving target organization and management account");
            let organization = directory.describe_organization().await?;
            let management_account = directory
                .describe_account(&organization.management_account_id)
                .await?;

            let placement = match options.organizational_unit.as_deref() {
                Some(unit_id) => Some(Self::resolve_placement(directory.as_ref(), unit_id).await?),
                None => None,
            };

            info!(
                organization = %organization.id,
                "Retrieving existing invitations for management account {}",
                management_account.id
            );
            let invitations =
                Self::pending_invitations(directory.as_ref(), options.account.as_deref()).await?;
            info!(count = invitations.len(), "Found open invitations");

            Ok::<_, MigrationError>((organization, management_account, placement, invitations))
        }
        .instrument(span.clone())
        .await?;

        let (organization, management_account, placement, invitations) = loaded;
        Ok(Self {
            directory,
            organization,
            management_account,
            placement,
            invitations,
            invitation_notes: options.invitation_notes,
            span,
        })
    }

    async fn resolve_placement(
        directory: &dyn Directory,
        unit_id: &str,
    ) -> Result<Placement, MigrationError> {
        info!("Retrieving OU {}", unit_id);
        let destination = directory.describe_organizational_unit(unit_id).await?;
        info!("Found OU {} - {}", destination.id, destination.name);

        let root_id = directory
            .list_roots()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::invalid_response("organization has no root"))?;
        info!("Found root OU {}", root_id);

        Ok(Placement {
            root_id,
            destination,
        })
    }

    /// OPEN invitations already issued, optionally narrowed to one account.
    ///
    /// Every open invitation must name both parties, whether or not it is
    /// kept, so a malformed one stops the run before anything is changed.
    async fn pending_invitations(
        directory: &dyn Directory,
        account: Option<&str>,
    ) -> Result<Vec<Handshake>, MigrationError> {
        let mut pending = Vec::new();
        for handshake in directory
            .list_handshakes(&HandshakeFilter::invitations())
            .await?
        {
            if !handshake.state.is_open() {
                continue;
            }
            let parties = handshake.parties()?;
            if account.is_some_and(|account_id| parties.account.id != account_id) {
                continue;
            }
            pending.push(handshake);
        }
        Ok(pending)
    }

    pub fn organization(&self) -> &Organization {
        &self.organization
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    /// Invitations issued or discovered so far
    pub fn invitations(&self) -> &[Handshake] {
        &self.invitations
    }

    pub fn details(&self) -> String {
        format!(
            "{} - {} - {}",
            self.organization.id, self.management_account.id, self.management_account.email
        )
    }

    /// Invite every candidate account of `source`.
    ///
    /// The source's management account is invited too unless the operator
    /// selected a single account.
    pub async fn invite(
        &mut self,
        source: &SourceOrganization,
        confirmer: &dyn Confirmer,
    ) -> Result<Vec<Handshake>, MigrationError> {
        let span = self.span.clone();
        async move {
            for account in source.child_accounts() {
                self.send_invitation(account, confirmer).await?;
            }

            if !source.account_was_specified() {
                self.send_invitation(source.management_account(), confirmer)
                    .await?;
            }

            Ok::<_, MigrationError>(self.invitations.clone())
        }
        .instrument(span)
        .await
    }

    /// Invite one account. Returns the new handshake, or `None` when the
    /// operator skipped the account or an open invitation already exists.
    pub async fn send_invitation(
        &mut self,
        account: &Account,
        confirmer: &dyn Confirmer,
    ) -> Result<Option<Handshake>, MigrationError> {
        let prompt = format!(
            "Invite account {} to {}. Proceed?",
            account.id,
            self.details()
        );
        if !confirmer.confirm(&prompt)? {
            info!("Skipping account {}...", account.id);
            return Ok(None);
        }

        info!("Inviting account {}", account.id);
        let invited = self
            .directory
            .invite_account(&account.id, &self.invitation_notes)
            .await;
        match invited {
            Ok(handshake) => {
                debug!(handshake = %handshake.id, state = %handshake.state, "Invitation created");
                self.record_invitation(handshake.clone());
                Ok(Some(handshake))
            }
            Err(error) if error.is_duplicate_handshake() => {
                match self.pending_invitation_for(&account.id) {
                    Some(existing) => warn!(
                        handshake = %existing.id,
                        "Invitation already sent to account {}, reusing it", account.id
                    ),
                    None => warn!("Invitation already sent to account {}...", account.id),
                }
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }

    fn record_invitation(&mut self, handshake: Handshake) {
        if !self.invitations.iter().any(|known| known.id == handshake.id) {
            self.invitations.push(handshake);
        }
    }

    fn pending_invitation_for(&self, account_id: &str) -> Option<&Handshake> {
        self.invitations.iter().find(|handshake| {
            handshake
                .account_party()
                .is_some_and(|party| party.id == account_id)
        })
    }

    /// Move every migrated account into the destination OU.
    ///
    /// Each move is independent: a failed move is recorded in the report and
    /// the remaining accounts are still attempted.
    pub async fn move_accounts(
        &self,
        account_ids: &[AccountId],
        confirmer: &dyn Confirmer,
    ) -> Result<PlacementReport, MigrationError> {
        async {
            let mut report = PlacementReport::default();
            if self.placement.is_none() {
                debug!("No destination OU configured, accounts stay under the root");
                return Ok(report);
            }

            for account_id in account_ids {
                match self.move_account(account_id, confirmer).await {
                    Ok(PlacementOutcome::Placed) => report.placed.push(account_id.clone()),
                    Ok(PlacementOutcome::Declined) => report.declined.push(account_id.clone()),
                    Ok(PlacementOutcome::NoDestination) => {}
                    Err(MigrationError::Provider(error)) => {
                        warn!(account = %account_id, %error, "Could not move account");
                        report.failed.push(FailedPlacement {
                            account_id: account_id.clone(),
                            error: error.to_string(),
                        });
                    }
                    Err(other) => return Err(other),
                }
            }

            Ok::<_, MigrationError>(report)
        }
        .instrument(self.span.clone())
        .await
    }

    pub async fn move_account(
        &self,
        account_id: &str,
        confirmer: &dyn Confirmer,
    ) -> Result<PlacementOutcome, MigrationError> {
        let Some(placement) = &self.placement else {
            return Ok(PlacementOutcome::NoDestination);
        };

        let description = format!(
            "account {} from root OU {} to destination OU {} - {}",
            account_id, placement.root_id, placement.destination.id, placement.destination.name
        );
        if !confirmer.confirm(&format!("Move {description}. Proceed?"))? {
            info!("Leaving account {} under root OU {}", account_id, placement.root_id);
            return Ok(PlacementOutcome::Declined);
        }

        info!("Moving {}", description);
        self.directory
            .move_account(account_id, &placement.root_id, &placement.destination.id)
            .await?;
        Ok(PlacementOutcome::Placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::handshake::{ActionType, HandshakeParty, HandshakeState, PartyType};
    use crate::migration::mocks::{ApiCall, CallJournal, InMemoryDirectory, ScriptedConfirmer};
    use crate::migration::prompt::AutoConfirm;

    fn target_directory(journal: &CallJournal) -> InMemoryDirectory {
        InMemoryDirectory::organization(
            "target",
            journal.clone(),
            Organization {
                id: "o-target".to_string(),
                management_account_id: "999999999999".to_string(),
                management_account_email: "target@example.com".to_string(),
            },
            Account::new("999999999999", "target@example.com", "Target"),
        )
        .with_root("r-root")
        .with_organizational_unit(OrganizationalUnit::new("ou-dest", "Migrated"))
    }

    fn options() -> TargetOptions {
        TargetOptions::default()
    }

    #[tokio::test]
    async fn discovery_keeps_only_open_invitations() {
        let journal = CallJournal::new();
        let mut accepted = Handshake::invitation("h-old", "111111111111", "o-target");
        accepted.state = HandshakeState::Accepted;
        let directory = target_directory(&journal)
            .with_handshake(accepted)
            .with_handshake(Handshake::invitation("h-open", "222222222222", "o-target"));

        let target = TargetOrganization::load(Arc::new(directory), options(), Span::none())
            .await
            .unwrap();

        let ids: Vec<_> = target.invitations().iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["h-open"]);
    }

    #[tokio::test]
    async fn discovery_narrows_to_selected_account() {
        let journal = CallJournal::new();
        let directory = target_directory(&journal)
            .with_handshake(Handshake::invitation("h-1", "111111111111", "o-target"))
            .with_handshake(Handshake::invitation("h-2", "222222222222", "o-target"));

        let target = TargetOrganization::load(
            Arc::new(directory),
            TargetOptions {
                account: Some("222222222222".to_string()),
                ..options()
            },
            Span::none(),
        )
        .await
        .unwrap();

        assert_eq!(target.invitations().len(), 1);
        assert_eq!(target.invitations()[0].id, "h-2");
    }

    #[tokio::test]
    async fn discovery_rejects_invitation_without_account_party() {
        let journal = CallJournal::new();
        let by_email = Handshake {
            id: "h-email".to_string(),
            state: HandshakeState::Open,
            action: Some(ActionType::Invite),
            parties: vec![
                HandshakeParty {
                    id: "someone@example.com".to_string(),
                    party_type: PartyType::Email,
                },
                HandshakeParty::organization("o-target"),
            ],
        };
        let directory = target_directory(&journal)
            .with_handshake(Handshake::invitation("h-1", "111111111111", "o-target"))
            .with_handshake(by_email);

        let result =
            TargetOrganization::load(Arc::new(directory), options(), Span::none()).await;

        assert!(matches!(
            result,
            Err(MigrationError::MalformedHandshake { ref handshake_id, missing: PartyType::Account })
                if handshake_id == "h-email"
        ));
        assert!(journal.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn duplicate_invitation_is_a_warning() {
        let journal = CallJournal::new();
        let directory = target_directory(&journal)
            .with_handshake(Handshake::invitation("h-1", "111111111111", "o-target"));
        let mut target = TargetOrganization::load(Arc::new(directory), options(), Span::none())
            .await
            .unwrap();

        let result = target
            .send_invitation(
                &Account::new("111111111111", "a@example.com", "A"),
                &AutoConfirm,
            )
            .await
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(target.invitations().len(), 1);
        assert_eq!(target.invitations()[0].id, "h-1");
    }

    #[tokio::test]
    async fn other_invitation_errors_propagate() {
        let journal = CallJournal::new();
        let directory = Arc::new(target_directory(&journal));
        directory.fail_on(
            ApiCall::InviteAccount("111111111111".to_string()),
            ProviderError::AccessDenied {
                message: "not allowed".to_string(),
            },
        );
        let mut target = TargetOrganization::load(directory, options(), Span::none())
            .await
            .unwrap();

        let result = target
            .send_invitation(
                &Account::new("111111111111", "a@example.com", "A"),
                &AutoConfirm,
            )
            .await;

        assert!(matches!(
            result,
            Err(MigrationError::Provider(ProviderError::AccessDenied { .. }))
        ));
    }

    #[tokio::test]
    async fn skipped_invitation_makes_no_call() {
        let journal = CallJournal::new();
        let mut target =
            TargetOrganization::load(Arc::new(target_directory(&journal)), options(), Span::none())
                .await
                .unwrap();

        let result = target
            .send_invitation(
                &Account::new("111111111111", "a@example.com", "A"),
                &ScriptedConfirmer::new([false]),
            )
            .await
            .unwrap();

        assert_eq!(result, None);
        assert!(journal.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn placement_is_a_no_op_without_destination() {
        let journal = CallJournal::new();
        let target =
            TargetOrganization::load(Arc::new(target_directory(&journal)), options(), Span::none())
                .await
                .unwrap();

        let report = target
            .move_accounts(
                &["111111111111".to_string(), "222222222222".to_string()],
                &AutoConfirm,
            )
            .await
            .unwrap();

        assert_eq!(report, PlacementReport::default());
        assert!(journal.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn failed_move_does_not_block_the_next_one() {
        let journal = CallJournal::new();
        let directory = Arc::new(target_directory(&journal));
        directory.fail_on(
            ApiCall::MoveAccount {
                account_id: "111111111111".to_string(),
                source_parent_id: "r-root".to_string(),
                destination_parent_id: "ou-dest".to_string(),
            },
            ProviderError::Service {
                code: "ConcurrentModificationException".to_string(),
                message: "busy".to_string(),
            },
        );
        let target = TargetOrganization::load(
            directory,
            TargetOptions {
                organizational_unit: Some("ou-dest".to_string()),
                ..options()
            },
            Span::none(),
        )
        .await
        .unwrap();

        let report = target
            .move_accounts(
                &["111111111111".to_string(), "222222222222".to_string()],
                &AutoConfirm,
            )
            .await
            .unwrap();

        assert_eq!(report.placed, vec!["222222222222".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].account_id, "111111111111");
        assert_eq!(report.unplaced().collect::<Vec<_>>(), vec!["111111111111"]);
    }

    #[tokio::test]
    async fn missing_destination_unit_is_fatal() {
        let journal = CallJournal::new();
        let result = TargetOrganization::load(
            Arc::new(target_directory(&journal)),
            TargetOptions {
                organizational_unit: Some("ou-missing".to_string()),
                ..options()
            },
            Span::none(),
        )
        .await;

        assert!(matches!(
            result,
            Err(MigrationError::Provider(ProviderError::NotFound { .. }))
        ));
    }
}
