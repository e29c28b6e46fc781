use thiserror::Error;

use super::handshake::PartyType;

/// Failures reported by AWS Organizations or STS once the SDK's own retry
/// policy has been exhausted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("An open invitation already exists: {message}")]
    DuplicateHandshake { message: String },
    #[error("Organization still has member accounts or attached policies: {message}")]
    OrganizationNotEmpty { message: String },
    #[error("Access denied: {message}")]
    AccessDenied { message: String },
    #[error("Request throttled: {message}")]
    Throttled { message: String },
    #[error("Resource not found ({code}): {message}")]
    NotFound { code: String, message: String },
    #[error("{code}: {message}")]
    Service { code: String, message: String },
    #[error("Transport error: {message}")]
    Transport { message: String },
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
    #[error("Invalid response from AWS: {message}")]
    InvalidResponse { message: String },
}

impl ProviderError {
    pub fn is_duplicate_handshake(&self) -> bool {
        matches!(self, ProviderError::DuplicateHandshake { .. })
    }

    pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
        ProviderError::InvalidResponse {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Could not assume the migration role in account {account_id}: {source}")]
    AssumeRole {
        account_id: String,
        #[source]
        source: ProviderError,
    },
    #[error("Handshake {handshake_id} has no {missing} party")]
    MalformedHandshake {
        handshake_id: String,
        missing: PartyType,
    },
    #[error("Confirmation prompt failed: {0}")]
    Prompt(#[from] std::io::Error),
}
