//! In-memory doubles for the organization directory, the credential broker
//! and the operator prompt. No network, no side effects.
//!
//! Every call made against a double is appended to a shared [`CallJournal`],
//! so tests can assert on the order of calls across the source organization,
//! the target organization and account-scoped clients.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::directory::{CredentialBroker, Directory};
use super::errors::{MigrationError, ProviderError};
use super::handshake::{ActionType, Handshake, HandshakeFilter, HandshakeParty, HandshakeState};
use super::prompt::Confirmer;
use super::types::{Account, Organization, OrganizationalUnit, ScopedCredentials};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApiCall {
    DescribeOrganization,
    DescribeAccount(String),
    ListAccounts,
    ListHandshakes,
    InviteAccount(String),
    AcceptHandshake(String),
    DeclineHandshake(String),
    RemoveAccount(String),
    DeleteOrganization,
    DescribeOrganizationalUnit(String),
    ListRoots,
    MoveAccount {
        account_id: String,
        source_parent_id: String,
        destination_parent_id: String,
    },
    AssumeRole(String),
}

impl ApiCall {
    /// Calls that change organization state
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ApiCall::InviteAccount(_)
                | ApiCall::AcceptHandshake(_)
                | ApiCall::DeclineHandshake(_)
                | ApiCall::RemoveAccount(_)
                | ApiCall::DeleteOrganization
                | ApiCall::MoveAccount { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Which client made the call, e.g. `source`, `target` or `account:1111...`
    pub scope: String,
    pub call: ApiCall,
}

#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, scope: &str, call: ApiCall) {
        lock(&self.calls).push(RecordedCall {
            scope: scope.to_string(),
            call,
        });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn mutating_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|recorded| recorded.call.is_mutating())
            .collect()
    }

    /// Index of the first occurrence of `call`
    pub fn position(&self, call: &ApiCall) -> Option<usize> {
        lock(&self.calls)
            .iter()
            .position(|recorded| &recorded.call == call)
    }

    pub fn count(&self, call: &ApiCall) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|recorded| &recorded.call == call)
            .count()
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    organization: Option<Organization>,
    accounts: Vec<Account>,
    handshakes: Vec<Handshake>,
    roots: Vec<String>,
    units: Vec<OrganizationalUnit>,
    moves: Vec<(String, String)>,
    failures: HashMap<ApiCall, ProviderError>,
    next_handshake: usize,
}

/// Organization directory held in memory.
///
/// An organization scope behaves like the management account's client: it
/// refuses to delete the organization while member accounts remain, and it
/// cannot accept another organization's invitation until its own organization
/// is gone. An account scope only acts on handshakes addressed to its account.
#[derive(Debug)]
pub struct InMemoryDirectory {
    scope: String,
    account_id: Option<String>,
    journal: CallJournal,
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn organization(
        scope: &str,
        journal: CallJournal,
        organization: Organization,
        management_account: Account,
    ) -> Self {
        let state = DirectoryState {
            organization: Some(organization),
            accounts: vec![management_account],
            ..DirectoryState::default()
        };
        Self {
            scope: scope.to_string(),
            account_id: None,
            journal,
            state: Mutex::new(state),
        }
    }

    pub fn account_scope(account_id: &str, journal: CallJournal) -> Self {
        Self {
            scope: format!("account:{account_id}"),
            account_id: Some(account_id.to_string()),
            journal,
            state: Mutex::new(DirectoryState::default()),
        }
    }

    pub fn with_account(self, account: Account) -> Self {
        lock(&self.state).accounts.push(account);
        self
    }

    pub fn with_handshake(self, handshake: Handshake) -> Self {
        lock(&self.state).handshakes.push(handshake);
        self
    }

    pub fn with_root(self, root_id: &str) -> Self {
        lock(&self.state).roots.push(root_id.to_string());
        self
    }

    pub fn with_organizational_unit(self, unit: OrganizationalUnit) -> Self {
        lock(&self.state).units.push(unit);
        self
    }

    /// Make `call` fail with `error` every time it is made
    pub fn fail_on(&self, call: ApiCall, error: ProviderError) {
        lock(&self.state).failures.insert(call, error);
    }

    pub fn account_ids(&self) -> Vec<String> {
        lock(&self.state)
            .accounts
            .iter()
            .map(|account| account.id.clone())
            .collect()
    }

    pub fn handshakes(&self) -> Vec<Handshake> {
        lock(&self.state).handshakes.clone()
    }

    pub fn organization_exists(&self) -> bool {
        lock(&self.state).organization.is_some()
    }

    /// `(account, destination)` pairs of every completed move
    pub fn moves(&self) -> Vec<(String, String)> {
        lock(&self.state).moves.clone()
    }

    fn call(&self, call: ApiCall) -> Result<MutexGuard<'_, DirectoryState>, ProviderError> {
        self.journal.record(&self.scope, call.clone());
        let state = lock(&self.state);
        match state.failures.get(&call).cloned() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }

    fn organization_of(state: &DirectoryState) -> Result<&Organization, ProviderError> {
        state
            .organization
            .as_ref()
            .ok_or_else(|| ProviderError::Service {
                code: "AWSOrganizationsNotInUseException".to_string(),
                message: "Your account is not a member of an organization.".to_string(),
            })
    }

    fn settle(&self, handshake_id: &str, state: HandshakeState) -> Result<Handshake, ProviderError> {
        let mut directory = lock(&self.state);

        if let Some(known) = directory
            .handshakes
            .iter_mut()
            .find(|handshake| handshake.id == handshake_id)
        {
            known.state = state;
            return Ok(known.clone());
        }

        if self.account_id.is_none() && directory.organization.is_some() {
            return Err(ProviderError::Service {
                code: "HandshakeConstraintViolationException".to_string(),
                message: "The management account of an organization cannot join another one."
                    .to_string(),
            });
        }

        let mut parties = Vec::new();
        if let Some(account_id) = &self.account_id {
            parties.push(HandshakeParty::account(account_id));
        }
        Ok(Handshake {
            id: handshake_id.to_string(),
            state,
            action: Some(ActionType::Invite),
            parties,
        })
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn describe_organization(&self) -> Result<Organization, ProviderError> {
        let state = self.call(ApiCall::DescribeOrganization)?;
        Self::organization_of(&state).cloned()
    }

    async fn describe_account(&self, account_id: &str) -> Result<Account, ProviderError> {
        let state = self.call(ApiCall::DescribeAccount(account_id.to_string()))?;
        state
            .accounts
            .iter()
            .find(|account| account.id == account_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                code: "AccountNotFoundException".to_string(),
                message: format!("account {account_id} not found"),
            })
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, ProviderError> {
        let state = self.call(ApiCall::ListAccounts)?;
        Ok(state.accounts.clone())
    }

    async fn list_handshakes(
        &self,
        filter: &HandshakeFilter,
    ) -> Result<Vec<Handshake>, ProviderError> {
        let state = self.call(ApiCall::ListHandshakes)?;
        Ok(state
            .handshakes
            .iter()
            .filter(|handshake| filter.matches(handshake))
            .cloned()
            .collect())
    }

    async fn invite_account(
        &self,
        target_account_id: &str,
        _notes: &str,
    ) -> Result<Handshake, ProviderError> {
        let mut state = self.call(ApiCall::InviteAccount(target_account_id.to_string()))?;
        let organization_id = Self::organization_of(&state)?.id.clone();

        let already_open = state.handshakes.iter().any(|handshake| {
            handshake.state.is_open()
                && handshake
                    .account_party()
                    .is_some_and(|party| party.id == target_account_id)
        });
        if already_open {
            return Err(ProviderError::DuplicateHandshake {
                message: format!("an open invitation already exists for {target_account_id}"),
            });
        }

        state.next_handshake += 1;
        let handshake = Handshake::invitation(
            &format!("h-{:04}", state.next_handshake),
            target_account_id,
            &organization_id,
        );
        state.handshakes.push(handshake.clone());
        Ok(handshake)
    }

    async fn accept_handshake(&self, handshake_id: &str) -> Result<Handshake, ProviderError> {
        drop(self.call(ApiCall::AcceptHandshake(handshake_id.to_string()))?);
        self.settle(handshake_id, HandshakeState::Accepted)
    }

    async fn decline_handshake(&self, handshake_id: &str) -> Result<Handshake, ProviderError> {
        drop(self.call(ApiCall::DeclineHandshake(handshake_id.to_string()))?);
        self.settle(handshake_id, HandshakeState::Declined)
    }

    async fn remove_account_from_organization(
        &self,
        account_id: &str,
    ) -> Result<(), ProviderError> {
        let mut state = self.call(ApiCall::RemoveAccount(account_id.to_string()))?;
        if Self::organization_of(&state)?.management_account_id == account_id {
            return Err(ProviderError::Service {
                code: "ConstraintViolationException".to_string(),
                message: "The management account cannot be removed.".to_string(),
            });
        }
        let before = state.accounts.len();
        state.accounts.retain(|account| account.id != account_id);
        if state.accounts.len() == before {
            return Err(ProviderError::NotFound {
                code: "AccountNotFoundException".to_string(),
                message: format!("account {account_id} not found"),
            });
        }
        Ok(())
    }

    async fn delete_organization(&self) -> Result<(), ProviderError> {
        let mut state = self.call(ApiCall::DeleteOrganization)?;
        let management = Self::organization_of(&state)?.management_account_id.clone();
        if state.accounts.iter().any(|account| account.id != management) {
            return Err(ProviderError::OrganizationNotEmpty {
                message: "The organization still has member accounts.".to_string(),
            });
        }
        state.organization = None;
        Ok(())
    }

    async fn describe_organizational_unit(
        &self,
        organizational_unit_id: &str,
    ) -> Result<OrganizationalUnit, ProviderError> {
        let state = self.call(ApiCall::DescribeOrganizationalUnit(
            organizational_unit_id.to_string(),
        ))?;
        state
            .units
            .iter()
            .find(|unit| unit.id == organizational_unit_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                code: "OrganizationalUnitNotFoundException".to_string(),
                message: format!("organizational unit {organizational_unit_id} not found"),
            })
    }

    async fn list_roots(&self) -> Result<Vec<String>, ProviderError> {
        let state = self.call(ApiCall::ListRoots)?;
        Ok(state.roots.clone())
    }

    async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> Result<(), ProviderError> {
        let mut state = self.call(ApiCall::MoveAccount {
            account_id: account_id.to_string(),
            source_parent_id: source_parent_id.to_string(),
            destination_parent_id: destination_parent_id.to_string(),
        })?;
        if !state.roots.iter().any(|root| root == source_parent_id) {
            return Err(ProviderError::NotFound {
                code: "SourceParentNotFoundException".to_string(),
                message: format!("parent {source_parent_id} not found"),
            });
        }
        if !state.units.iter().any(|unit| unit.id == destination_parent_id) {
            return Err(ProviderError::NotFound {
                code: "DestinationParentNotFoundException".to_string(),
                message: format!("parent {destination_parent_id} not found"),
            });
        }
        state
            .moves
            .push((account_id.to_string(), destination_parent_id.to_string()));
        Ok(())
    }
}

/// Hands out fake credentials and in-memory account-scoped directories
#[derive(Debug, Default)]
pub struct StubCredentialBroker {
    journal: CallJournal,
    failures: HashMap<String, ProviderError>,
}

impl StubCredentialBroker {
    pub fn new(journal: CallJournal) -> Self {
        Self {
            journal,
            failures: HashMap::new(),
        }
    }

    pub fn fail_for(mut self, account_id: &str, error: ProviderError) -> Self {
        self.failures.insert(account_id.to_string(), error);
        self
    }
}

#[async_trait]
impl CredentialBroker for StubCredentialBroker {
    async fn assume_role_for_account(
        &self,
        account_id: &str,
    ) -> Result<ScopedCredentials, ProviderError> {
        self.journal
            .record("sts", ApiCall::AssumeRole(account_id.to_string()));
        if let Some(error) = self.failures.get(account_id) {
            return Err(error.clone());
        }
        Ok(ScopedCredentials {
            account_id: account_id.to_string(),
            access_key_id: format!("ASIA{account_id}"),
            secret_access_key: "stub-secret".to_string(),
            session_token: "stub-token".to_string(),
            expiration: None,
        })
    }

    fn scoped_directory(&self, credentials: ScopedCredentials) -> Arc<dyn Directory> {
        Arc::new(InMemoryDirectory::account_scope(
            &credentials.account_id,
            self.journal.clone(),
        ))
    }
}

/// Answers prompts from a script, then "no" once the script runs out
#[derive(Debug, Default)]
pub struct ScriptedConfirmer {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt shown so far
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, message: &str) -> Result<bool, MigrationError> {
        lock(&self.prompts).push(message.to_string());
        Ok(lock(&self.answers).pop_front().unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(journal: &CallJournal) -> InMemoryDirectory {
        InMemoryDirectory::organization(
            "source",
            journal.clone(),
            Organization {
                id: "o-source".to_string(),
                management_account_id: "000000000000".to_string(),
                management_account_email: "root@example.com".to_string(),
            },
            Account::new("000000000000", "root@example.com", "Root"),
        )
        .with_account(Account::new("111111111111", "a@example.com", "A"))
    }

    #[tokio::test]
    async fn organization_with_members_cannot_be_deleted() {
        let journal = CallJournal::new();
        let directory = source(&journal);

        assert!(matches!(
            directory.delete_organization().await,
            Err(ProviderError::OrganizationNotEmpty { .. })
        ));

        directory
            .remove_account_from_organization("111111111111")
            .await
            .unwrap();
        directory.delete_organization().await.unwrap();
        assert!(!directory.organization_exists());
    }

    #[tokio::test]
    async fn management_scope_accepts_only_after_deletion() {
        let journal = CallJournal::new();
        let directory = source(&journal);

        assert!(directory.accept_handshake("h-elsewhere").await.is_err());

        directory
            .remove_account_from_organization("111111111111")
            .await
            .unwrap();
        directory.delete_organization().await.unwrap();
        let accepted = directory.accept_handshake("h-elsewhere").await.unwrap();
        assert_eq!(accepted.state, HandshakeState::Accepted);
    }

    #[tokio::test]
    async fn journal_keeps_call_order_across_scopes() {
        let journal = CallJournal::new();
        let broker = StubCredentialBroker::new(journal.clone());

        let credentials = broker.assume_role_for_account("111111111111").await.unwrap();
        let scoped = broker.scoped_directory(credentials);
        scoped.accept_handshake("h-1").await.unwrap();

        let calls = journal.calls();
        assert_eq!(calls[0].scope, "sts");
        assert_eq!(calls[1].scope, "account:111111111111");
        assert_eq!(journal.mutating_calls().len(), 1);
        assert_eq!(
            journal.position(&ApiCall::AcceptHandshake("h-1".to_string())),
            Some(1)
        );
    }

    #[test]
    fn scripted_confirmer_defaults_to_no() {
        let confirmer = ScriptedConfirmer::new([true]);
        assert!(confirmer.confirm("first").unwrap());
        assert!(!confirmer.confirm("second").unwrap());
        assert_eq!(confirmer.prompts(), vec!["first", "second"]);
    }
}
