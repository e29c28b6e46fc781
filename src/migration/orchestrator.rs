//! Top-level migration run: confirm, invite, accept, place.

use serde::Serialize;
use tracing::{info, warn};

use super::errors::MigrationError;
use super::prompt::Confirmer;
use super::source::SourceOrganization;
use super::target::{PlacementReport, TargetOrganization};
use super::types::AccountId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub source_organization_id: String,
    pub target_organization_id: String,
    /// Invitations issued or found pending in the target organization
    pub invitations: usize,
    /// Accounts that accepted their invitation, in processing order
    pub migrated_accounts: Vec<AccountId>,
    pub placement: PlacementReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Completed(MigrationReport),
    /// The operator declined the run before anything was changed
    Cancelled,
}

impl MigrationOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrationOutcome::Completed(_) => 0,
            MigrationOutcome::Cancelled => 2,
        }
    }
}

pub struct MigrationOrchestrator {
    source: SourceOrganization,
    target: TargetOrganization,
    confirmer: Box<dyn Confirmer>,
}

impl MigrationOrchestrator {
    pub fn new(
        source: SourceOrganization,
        target: TargetOrganization,
        confirmer: Box<dyn Confirmer>,
    ) -> Self {
        Self {
            source,
            target,
            confirmer,
        }
    }

    pub async fn run(mut self) -> Result<MigrationOutcome, MigrationError> {
        let prompt = format!(
            "Migrating accounts from {} to {}. Proceed?",
            self.source.details(),
            self.target.details()
        );
        if !self.confirmer.confirm(&prompt)? {
            info!("Migration canceled by operator");
            return Ok(MigrationOutcome::Cancelled);
        }

        let confirmer = self.confirmer.as_ref();
        let invitations = self.target.invite(&self.source, confirmer).await?;
        info!(count = invitations.len(), "Invitation phase finished");

        let migrated_accounts = self.source.accept(invitations.clone(), confirmer).await?;
        let placement = self
            .target
            .move_accounts(&migrated_accounts, confirmer)
            .await?;

        for account_id in placement.unplaced() {
            warn!(
                account = account_id,
                "Account joined {} but was not moved to the destination OU",
                self.target.organization().id
            );
        }

        Ok(MigrationOutcome::Completed(MigrationReport {
            source_organization_id: self.source.organization().id.clone(),
            target_organization_id: self.target.organization().id.clone(),
            invitations: invitations.len(),
            migrated_accounts,
            placement,
        }))
    }
}
