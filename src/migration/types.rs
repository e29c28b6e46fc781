//! Organization, account and credential types shared by the migration engine
//! and its collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AccountId = String;

/// An AWS Organization as seen from its management account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub management_account_id: AccountId,
    pub management_account_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub name: String,
}

impl Account {
    pub fn new(id: &str, email: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
}

impl OrganizationalUnit {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Short-lived credentials for acting as a single account.
///
/// Produced by a [`CredentialBroker`](super::directory::CredentialBroker) and
/// consumed by exactly one scoped directory client.
#[derive(Clone, PartialEq, Eq)]
pub struct ScopedCredentials {
    pub account_id: AccountId,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for ScopedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedCredentials")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_credentials_debug_hides_secrets() {
        let credentials = ScopedCredentials {
            account_id: "111111111111".to_string(),
            access_key_id: "ASIAEXAMPLE".to_string(),
            secret_access_key: "very-secret".to_string(),
            session_token: "session-token-value".to_string(),
            expiration: None,
        };

        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("ASIAEXAMPLE"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("session-token-value"));
    }
}
