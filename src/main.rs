use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::Instrument;

use aws_account_migration::cli::commands::migrate::{print_outcome, MigrateCommand};
use aws_account_migration::cli::commands::Command;
use aws_account_migration::cli::Cli;
use aws_account_migration::config::MigrationConfig;
use aws_account_migration::telemetry::{generate_correlation_id, init_telemetry, migration_span};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    MigrationConfig::load_env_file()?;
    let config = MigrationConfig::load(cli.config.as_deref())?;
    init_telemetry(
        &config.observability.log_level,
        config.observability.json_logs,
        cli.verbose,
    )?;

    let correlation_id = generate_correlation_id();
    let command = MigrateCommand::new(&cli, config);

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(
        command
            .execute()
            .instrument(migration_span(&correlation_id)),
    )?;

    print_outcome(&outcome, cli.json)?;
    Ok(ExitCode::from(outcome.exit_code()))
}
