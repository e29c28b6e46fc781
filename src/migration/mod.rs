//! Account migration engine
//!
//! Moves accounts from a source organization into a target organization via
//! invitation handshakes. The engine is written against the [`Directory`],
//! [`CredentialBroker`] and [`Confirmer`] seams; the AWS-backed implementations
//! live in [`crate::aws`].

pub mod directory;
pub mod errors;
pub mod handshake;
#[cfg(any(test, feature = "testing"))]
pub mod mocks;
pub mod orchestrator;
pub mod prompt;
pub mod source;
pub mod target;
pub mod types;

pub use directory::{CredentialBroker, Directory};
pub use errors::{MigrationError, ProviderError};
pub use handshake::{management_last, Handshake, HandshakeFilter, HandshakeState, PartyType};
pub use orchestrator::{MigrationOrchestrator, MigrationOutcome, MigrationReport};
pub use prompt::{AutoConfirm, Confirmer, TerminalConfirmer};
pub use source::SourceOrganization;
pub use target::{PlacementReport, TargetOptions, TargetOrganization};
pub use types::{Account, AccountId, Organization, OrganizationalUnit, ScopedCredentials};
