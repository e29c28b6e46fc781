//! Handshake (invitation) model and the party-resolution and ordering rules
//! the acceptance phase depends on.

use std::fmt;

use super::errors::MigrationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    Requested,
    Open,
    Accepted,
    Declined,
    Canceled,
    Expired,
    /// A state this build does not know about, kept verbatim
    Unknown(String),
}

impl HandshakeState {
    pub fn as_str(&self) -> &str {
        match self {
            HandshakeState::Requested => "REQUESTED",
            HandshakeState::Open => "OPEN",
            HandshakeState::Accepted => "ACCEPTED",
            HandshakeState::Declined => "DECLINED",
            HandshakeState::Canceled => "CANCELED",
            HandshakeState::Expired => "EXPIRED",
            HandshakeState::Unknown(value) => value,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, HandshakeState::Open)
    }
}

impl From<&str> for HandshakeState {
    fn from(value: &str) -> Self {
        match value {
            "REQUESTED" => HandshakeState::Requested,
            "OPEN" => HandshakeState::Open,
            "ACCEPTED" => HandshakeState::Accepted,
            "DECLINED" => HandshakeState::Declined,
            "CANCELED" => HandshakeState::Canceled,
            "EXPIRED" => HandshakeState::Expired,
            other => HandshakeState::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartyType {
    Account,
    Organization,
    Email,
}

impl PartyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyType::Account => "ACCOUNT",
            PartyType::Organization => "ORGANIZATION",
            PartyType::Email => "EMAIL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACCOUNT" => Some(PartyType::Account),
            "ORGANIZATION" => Some(PartyType::Organization),
            "EMAIL" => Some(PartyType::Email),
            _ => None,
        }
    }
}

impl fmt::Display for PartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Invite,
    EnableAllFeatures,
    ApproveAllFeatures,
    AddOrganizationsServiceLinkedRole,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Invite => "INVITE",
            ActionType::EnableAllFeatures => "ENABLE_ALL_FEATURES",
            ActionType::ApproveAllFeatures => "APPROVE_ALL_FEATURES",
            ActionType::AddOrganizationsServiceLinkedRole => {
                "ADD_ORGANIZATIONS_SERVICE_LINKED_ROLE"
            }
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "INVITE" => Some(ActionType::Invite),
            "ENABLE_ALL_FEATURES" => Some(ActionType::EnableAllFeatures),
            "APPROVE_ALL_FEATURES" => Some(ActionType::ApproveAllFeatures),
            "ADD_ORGANIZATIONS_SERVICE_LINKED_ROLE" => {
                Some(ActionType::AddOrganizationsServiceLinkedRole)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeParty {
    pub id: String,
    pub party_type: PartyType,
}

impl HandshakeParty {
    pub fn account(id: &str) -> Self {
        Self {
            id: id.to_string(),
            party_type: PartyType::Account,
        }
    }

    pub fn organization(id: &str) -> Self {
        Self {
            id: id.to_string(),
            party_type: PartyType::Organization,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub id: String,
    pub state: HandshakeState,
    pub action: Option<ActionType>,
    pub parties: Vec<HandshakeParty>,
}

/// The two parties every invitation handshake must carry
#[derive(Debug, Clone, Copy)]
pub struct HandshakeParties<'a> {
    pub account: &'a HandshakeParty,
    pub organization: &'a HandshakeParty,
}

impl Handshake {
    /// An OPEN invitation moving `account_id` into `organization_id`
    pub fn invitation(id: &str, account_id: &str, organization_id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: HandshakeState::Open,
            action: Some(ActionType::Invite),
            parties: vec![
                HandshakeParty::organization(organization_id),
                HandshakeParty::account(account_id),
            ],
        }
    }

    fn party(&self, party_type: PartyType) -> Option<&HandshakeParty> {
        self.parties.iter().find(|p| p.party_type == party_type)
    }

    pub fn account_party(&self) -> Option<&HandshakeParty> {
        self.party(PartyType::Account)
    }

    pub fn organization_party(&self) -> Option<&HandshakeParty> {
        self.party(PartyType::Organization)
    }

    /// Id of the account being moved, or a malformed-handshake error
    pub fn account_id(&self) -> Result<&str, MigrationError> {
        self.account_party()
            .map(|p| p.id.as_str())
            .ok_or_else(|| self.missing(PartyType::Account))
    }

    pub fn parties(&self) -> Result<HandshakeParties<'_>, MigrationError> {
        let account = self
            .account_party()
            .ok_or_else(|| self.missing(PartyType::Account))?;
        let organization = self
            .organization_party()
            .ok_or_else(|| self.missing(PartyType::Organization))?;
        Ok(HandshakeParties {
            account,
            organization,
        })
    }

    fn missing(&self, party_type: PartyType) -> MigrationError {
        MigrationError::MalformedHandshake {
            handshake_id: self.id.clone(),
            missing: party_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeFilter {
    pub action_type: Option<ActionType>,
}

impl HandshakeFilter {
    pub fn invitations() -> Self {
        Self {
            action_type: Some(ActionType::Invite),
        }
    }

    pub fn matches(&self, handshake: &Handshake) -> bool {
        match self.action_type {
            Some(action) => handshake.action == Some(action),
            None => true,
        }
    }
}

/// Orders handshakes so the management account's own invitation comes last.
///
/// Accepting that invitation requires deleting the source organization, after
/// which nothing else can be done on the source side. Stable partition: the
/// other handshakes keep their relative order.
pub fn management_last(
    handshakes: Vec<Handshake>,
    management_account_id: &str,
) -> Result<Vec<Handshake>, MigrationError> {
    let mut members = Vec::with_capacity(handshakes.len());
    let mut management = Vec::new();

    for handshake in handshakes {
        if handshake.account_id()? == management_account_id {
            management.push(handshake);
        } else {
            members.push(handshake);
        }
    }

    members.extend(management);
    Ok(members)
}
