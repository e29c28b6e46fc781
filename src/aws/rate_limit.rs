//! Client-side pacing for AWS Organizations calls
//!
//! Organizations enforces a low account-wide request quota. Every directory
//! client of a run, account-scoped ones included, shares one limiter so the
//! SDK's own retries are rarely needed.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::migration::{
    Account, Directory, Handshake, HandshakeFilter, Organization, OrganizationalUnit,
    ProviderError,
};
use crate::observability::ApiCallMetrics;

#[derive(Debug, Clone)]
pub struct RequestPacer {
    limiter: Arc<DefaultDirectRateLimiter>,
    metrics: Arc<ApiCallMetrics>,
}

impl RequestPacer {
    pub fn new(requests_per_second: u32, burst_capacity: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst_capacity).unwrap_or(rate);
        let quota = Quota::per_second(rate).allow_burst(burst);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            metrics: Arc::new(ApiCallMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<ApiCallMetrics> {
        &self.metrics
    }

    /// Wait for a slot, then count the call
    pub async fn acquire(&self, mutating: bool) {
        self.limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;
        self.metrics.record_call(mutating);
    }

    pub fn observe<T>(&self, result: Result<T, ProviderError>) -> Result<T, ProviderError> {
        if let Err(error) = &result {
            self.metrics.record_error(error);
        }
        result
    }

    /// Run one request in a paced slot, counting it and any error
    pub async fn paced<T, F>(&self, mutating: bool, request: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        self.acquire(mutating).await;
        self.observe(request.await)
    }
}

/// Paces and counts every call made through the wrapped directory
pub struct RateLimitedDirectory {
    inner: Arc<dyn Directory>,
    pacer: RequestPacer,
}

impl RateLimitedDirectory {
    pub fn new(inner: Arc<dyn Directory>, pacer: RequestPacer) -> Self {
        Self { inner, pacer }
    }
}

#[async_trait]
impl Directory for RateLimitedDirectory {
    async fn describe_organization(&self) -> Result<Organization, ProviderError> {
        self.pacer.acquire(false).await;
        self.pacer.observe(self.inner.describe_organization().await)
    }

    async fn describe_account(&self, account_id: &str) -> Result<Account, ProviderError> {
        self.pacer.acquire(false).await;
        self.pacer.observe(self.inner.describe_account(account_id).await)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, ProviderError> {
        self.pacer.acquire(false).await;
        self.pacer.observe(self.inner.list_accounts().await)
    }

    async fn list_handshakes(
        &self,
        filter: &HandshakeFilter,
    ) -> Result<Vec<Handshake>, ProviderError> {
        self.pacer.acquire(false).await;
        self.pacer.observe(self.inner.list_handshakes(filter).await)
    }

    async fn invite_account(
        &self,
        target_account_id: &str,
        notes: &str,
    ) -> Result<Handshake, ProviderError> {
        self.pacer.acquire(true).await;
        self.pacer
            .observe(self.inner.invite_account(target_account_id, notes).await)
    }

    async fn accept_handshake(&self, handshake_id: &str) -> Result<Handshake, ProviderError> {
        self.pacer.acquire(true).await;
        self.pacer.observe(self.inner.accept_handshake(handshake_id).await)
    }

    async fn decline_handshake(&self, handshake_id: &str) -> Result<Handshake, ProviderError> {
        self.pacer.acquire(true).await;
        self.pacer.observe(self.inner.decline_handshake(handshake_id).await)
    }

    async fn remove_account_from_organization(
        &self,
        account_id: &str,
    ) -> Result<(), ProviderError> {
        self.pacer.acquire(true).await;
        self.pacer
            .observe(self.inner.remove_account_from_organization(account_id).await)
    }

    async fn delete_organization(&self) -> Result<(), ProviderError> {
        self.pacer.acquire(true).await;
        self.pacer.observe(self.inner.delete_organization().await)
    }

    async fn describe_organizational_unit(
        &self,
        organizational_unit_id: &str,
    ) -> Result<OrganizationalUnit, ProviderError> {
        self.pacer.acquire(false).await;
        self.pacer.observe(
            self.inner
                .describe_organizational_unit(organizational_unit_id)
                .await,
        )
    }

    async fn list_roots(&self) -> Result<Vec<String>, ProviderError> {
        self.pacer.acquire(false).await;
        self.pacer.observe(self.inner.list_roots().await)
    }

    async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> Result<(), ProviderError> {
        self.pacer.acquire(true).await;
        self.pacer.observe(
            self.inner
                .move_account(account_id, source_parent_id, destination_parent_id)
                .await,
        )
    }
}
