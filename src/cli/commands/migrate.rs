use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use super::Command;
use crate::aws::{load_profile, AwsDirectory, RateLimitedDirectory, RequestPacer, StsCredentialBroker};
use crate::cli::Cli;
use crate::config::MigrationConfig;
use crate::migration::{
    AutoConfirm, Confirmer, Directory, MigrationOrchestrator, MigrationOutcome,
    SourceOrganization, TargetOptions, TargetOrganization, TerminalConfirmer,
};
use crate::observability::OperationTimer;
use crate::telemetry::organization_span;

pub struct MigrateCommand {
    pub source_profile: String,
    pub target_profile: String,
    pub account: Option<String>,
    pub organizational_unit: Option<String>,
    pub quiet: bool,
    pub config: MigrationConfig,
}

impl MigrateCommand {
    pub fn new(cli: &Cli, config: MigrationConfig) -> Self {
        Self {
            source_profile: cli.source_profile.clone(),
            target_profile: cli.target_profile.clone(),
            account: cli.account.clone(),
            organizational_unit: cli.organizational_unit.clone(),
            quiet: cli.quiet,
            config,
        }
    }

    fn confirmer(&self) -> Box<dyn Confirmer> {
        if self.quiet {
            Box::new(AutoConfirm)
        } else {
            Box::new(TerminalConfirmer::stdio())
        }
    }

    fn organizations_directory(
        &self,
        sdk_config: &aws_config::SdkConfig,
        pacer: &RequestPacer,
    ) -> Arc<dyn Directory> {
        let client = aws_sdk_organizations::Client::new(sdk_config);
        Arc::new(RateLimitedDirectory::new(
            Arc::new(AwsDirectory::new(client, self.config.aws.page_size)),
            pacer.clone(),
        ))
    }
}

impl Command for MigrateCommand {
    type Output = MigrationOutcome;

    async fn execute(self) -> Result<MigrationOutcome> {
        let timer = OperationTimer::new("migration");
        let aws = &self.config.aws;
        let pacer = RequestPacer::new(aws.requests_per_second, aws.burst_capacity);

        let source_sdk = load_profile(&self.source_profile, aws).await;
        let target_sdk = load_profile(&self.target_profile, aws).await;

        let broker = Arc::new(StsCredentialBroker::new(
            source_sdk.clone(),
            aws.role_name.clone(),
            aws.role_session_name.clone(),
            aws.page_size,
            pacer.clone(),
        ));

        let source = SourceOrganization::load(
            self.organizations_directory(&source_sdk, &pacer),
            broker,
            self.account.as_deref(),
            organization_span("source", &self.source_profile),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to load the source organization with profile {}",
                self.source_profile
            )
        })?;

        let target = TargetOrganization::load(
            self.organizations_directory(&target_sdk, &pacer),
            TargetOptions {
                account: self.account.clone(),
                organizational_unit: self.organizational_unit.clone(),
                invitation_notes: self.config.invitation.notes.clone(),
            },
            organization_span("target", &self.target_profile),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to load the target organization with profile {}",
                self.target_profile
            )
        })?;

        let outcome = MigrationOrchestrator::new(source, target, self.confirmer())
            .run()
            .await;

        pacer.metrics().log_stats();
        timer.finish();

        let outcome = outcome.context("Migration stopped")?;
        if let MigrationOutcome::Completed(report) = &outcome {
            info!(
                migrated = report.migrated_accounts.len(),
                placed = report.placement.placed.len(),
                "Migration finished"
            );
        }
        Ok(outcome)
    }
}

/// Print the end-of-run summary to stdout
pub fn print_outcome(outcome: &MigrationOutcome, json: bool) -> Result<()> {
    match outcome {
        MigrationOutcome::Cancelled => {
            eprintln!("Migration canceled");
        }
        MigrationOutcome::Completed(report) if json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        MigrationOutcome::Completed(report) => {
            println!("Migration complete");
            for account_id in &report.migrated_accounts {
                println!("  {account_id}");
            }
            let unplaced: Vec<_> = report.placement.unplaced().collect();
            if !unplaced.is_empty() {
                println!(
                    "Not moved to the destination OU: {}",
                    unplaced.join(", ")
                );
            }
        }
    }
    Ok(())
}
