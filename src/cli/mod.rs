use clap::Parser;
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "aws-account-migration")]
#[command(about = "Migrate accounts from one AWS Organization to another")]
#[command(long_about = "Invites the accounts of a SOURCE AWS Organization into a TARGET organization, \
                       accepts each invitation from inside the migrating account, and deletes the source \
                       organization so its management account can follow. Every step asks for confirmation \
                       unless --quiet is given.")]
pub struct Cli {
    /// Profile with admin access to the SOURCE organization's management account
    #[arg(short = 's', long = "source-organization-profile", value_name = "PROFILE")]
    pub source_profile: String,

    /// Profile with admin access to the TARGET organization's management account
    #[arg(short = 't', long = "target-organization-profile", value_name = "PROFILE")]
    pub target_profile: String,

    /// Migrate only this account from the SOURCE organization
    #[arg(short = 'a', long, value_name = "ACCOUNT_ID")]
    pub account: Option<String>,

    /// Move migrated accounts into this organizational unit of the TARGET organization
    #[arg(short = 'o', long, value_name = "OU_ID")]
    pub organizational_unit: Option<String>,

    /// Do not prompt for confirmation
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Configuration file (defaults to ./aws-account-migration.toml when present)
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Print the migration report as JSON
    #[arg(long)]
    pub json: bool,
}
