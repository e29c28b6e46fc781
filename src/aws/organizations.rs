//! [`Directory`] backed by the AWS Organizations API

use async_trait::async_trait;
use aws_sdk_organizations::types as aws;
use aws_sdk_organizations::Client;
use tracing::debug;

use super::errors::classify_sdk_error;
use crate::migration::handshake::{ActionType, HandshakeParty, HandshakeState, PartyType};
use crate::migration::{
    Account, Directory, Handshake, HandshakeFilter, Organization, OrganizationalUnit,
    ProviderError,
};

#[derive(Debug, Clone)]
pub struct AwsDirectory {
    client: Client,
    page_size: i32,
}

impl AwsDirectory {
    pub fn new(client: Client, page_size: i32) -> Self {
        Self { client, page_size }
    }
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, ProviderError> {
    value.ok_or_else(|| ProviderError::invalid_response(format!("response is missing {what}")))
}

fn organization_from(organization: Option<&aws::Organization>) -> Result<Organization, ProviderError> {
    let organization = organization
        .ok_or_else(|| ProviderError::invalid_response("response has no organization"))?;
    Ok(Organization {
        id: required(organization.id(), "organization id")?.to_string(),
        management_account_id: required(
            organization.master_account_id(),
            "management account id",
        )?
        .to_string(),
        management_account_email: organization
            .master_account_email()
            .unwrap_or_default()
            .to_string(),
    })
}

fn account_from(account: &aws::Account) -> Result<Account, ProviderError> {
    Ok(Account {
        id: required(account.id(), "account id")?.to_string(),
        email: account.email().unwrap_or_default().to_string(),
        name: account.name().unwrap_or_default().to_string(),
    })
}

fn handshake_from(handshake: Option<&aws::Handshake>) -> Result<Handshake, ProviderError> {
    let handshake =
        handshake.ok_or_else(|| ProviderError::invalid_response("response has no handshake"))?;
    let id = required(handshake.id(), "handshake id")?;

    let parties = handshake
        .parties()
        .iter()
        .filter_map(|party| match PartyType::parse(party.r#type().as_str()) {
            Some(party_type) => Some(HandshakeParty {
                id: party.id().to_string(),
                party_type,
            }),
            None => {
                debug!(handshake = id, party_type = party.r#type().as_str(), "Ignoring party");
                None
            }
        })
        .collect();

    Ok(Handshake {
        id: id.to_string(),
        state: handshake
            .state()
            .map(|state| HandshakeState::from(state.as_str()))
            .ok_or_else(|| ProviderError::invalid_response("handshake has no state"))?,
        action: handshake
            .action()
            .and_then(|action| ActionType::parse(action.as_str())),
        parties,
    })
}

fn action_type(action: ActionType) -> aws::ActionType {
    aws::ActionType::from(action.as_str())
}

#[async_trait]
impl Directory for AwsDirectory {
    async fn describe_organization(&self) -> Result<Organization, ProviderError> {
        let output = self
            .client
            .describe_organization()
            .send()
            .await
            .map_err(classify_sdk_error)?;
        organization_from(output.organization())
    }

    async fn describe_account(&self, account_id: &str) -> Result<Account, ProviderError> {
        let output = self
            .client
            .describe_account()
            .account_id(account_id)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        let account = output
            .account()
            .ok_or_else(|| ProviderError::invalid_response("response has no account"))?;
        account_from(account)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, ProviderError> {
        let mut pages = self
            .client
            .list_accounts()
            .max_results(self.page_size)
            .into_paginator()
            .send();

        let mut accounts = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(classify_sdk_error)?;
            for account in page.accounts() {
                accounts.push(account_from(account)?);
            }
        }
        Ok(accounts)
    }

    async fn list_handshakes(
        &self,
        filter: &HandshakeFilter,
    ) -> Result<Vec<Handshake>, ProviderError> {
        let mut request = self
            .client
            .list_handshakes_for_organization()
            .max_results(self.page_size);
        if let Some(action) = filter.action_type {
            request = request.filter(
                aws::HandshakeFilter::builder()
                    .action_type(action_type(action))
                    .build(),
            );
        }

        let mut pages = request.into_paginator().send();
        let mut handshakes = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(classify_sdk_error)?;
            for handshake in page.handshakes() {
                handshakes.push(handshake_from(Some(handshake))?);
            }
        }
        Ok(handshakes)
    }

    async fn invite_account(
        &self,
        target_account_id: &str,
        notes: &str,
    ) -> Result<Handshake, ProviderError> {
        let target = aws::HandshakeParty::builder()
            .id(target_account_id)
            .r#type(aws::HandshakePartyType::Account)
            .build()
            .map_err(|error| ProviderError::InvalidRequest {
                message: error.to_string(),
            })?;

        let output = self
            .client
            .invite_account_to_organization()
            .target(target)
            .notes(notes)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        handshake_from(output.handshake())
    }

    async fn accept_handshake(&self, handshake_id: &str) -> Result<Handshake, ProviderError> {
        let output = self
            .client
            .accept_handshake()
            .handshake_id(handshake_id)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        handshake_from(output.handshake())
    }

    async fn decline_handshake(&self, handshake_id: &str) -> Result<Handshake, ProviderError> {
        let output = self
            .client
            .decline_handshake()
            .handshake_id(handshake_id)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        handshake_from(output.handshake())
    }

    async fn remove_account_from_organization(
        &self,
        account_id: &str,
    ) -> Result<(), ProviderError> {
        self.client
            .remove_account_from_organization()
            .account_id(account_id)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        Ok(())
    }

    async fn delete_organization(&self) -> Result<(), ProviderError> {
        self.client
            .delete_organization()
            .send()
            .await
            .map_err(classify_sdk_error)?;
        Ok(())
    }

    async fn describe_organizational_unit(
        &self,
        organizational_unit_id: &str,
    ) -> Result<OrganizationalUnit, ProviderError> {
        let output = self
            .client
            .describe_organizational_unit()
            .organizational_unit_id(organizational_unit_id)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        let unit = output
            .organizational_unit()
            .ok_or_else(|| ProviderError::invalid_response("response has no organizational unit"))?;
        Ok(OrganizationalUnit {
            id: required(unit.id(), "organizational unit id")?.to_string(),
            name: unit.name().unwrap_or_default().to_string(),
        })
    }

    async fn list_roots(&self) -> Result<Vec<String>, ProviderError> {
        let mut pages = self
            .client
            .list_roots()
            .max_results(self.page_size)
            .into_paginator()
            .send();

        let mut roots = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(classify_sdk_error)?;
            for root in page.roots() {
                roots.push(required(root.id(), "root id")?.to_string());
            }
        }
        Ok(roots)
    }

    async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> Result<(), ProviderError> {
        self.client
            .move_account()
            .account_id(account_id)
            .source_parent_id(source_parent_id)
            .destination_parent_id(destination_parent_id)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        Ok(())
    }
}
