// AWS Account Migration Library
// Exposes the migration engine, its AWS collaborators and the ambient stack
// for the binary and for integration tests

pub mod aws;
pub mod cli;
pub mod config;
pub mod migration;
pub mod observability;
pub mod telemetry;

// Re-export key types for easy access
pub use aws::{AwsDirectory, RateLimitedDirectory, RequestPacer, StsCredentialBroker};
pub use config::MigrationConfig;
pub use migration::{
    Account, AccountId, AutoConfirm, Confirmer, CredentialBroker, Directory, Handshake,
    MigrationError, MigrationOrchestrator, MigrationOutcome, MigrationReport, Organization,
    OrganizationalUnit, PlacementReport, ProviderError, ScopedCredentials, SourceOrganization,
    TargetOptions, TargetOrganization, TerminalConfirmer,
};
pub use observability::{ApiCallMetrics, ApiCallStats, OperationTimer};
pub use telemetry::{generate_correlation_id, init_telemetry, migration_span, organization_span};
