//! HTTP client for the subscription API - one method per endpoint

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    AssignRequest, Customer, CustomerUpdate, DashboardMetrics, Envelope, LoginData, LoginRequest,
    Pack, PackInput, Profile, RegisterRequest, Role, StatusUpdate, Subscription,
    SubscriptionRequest, SubscriptionStatus,
};
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Envelope for endpoints whose payload the client does not inspect
pub type Ack = Envelope<serde_json::Value>;

/// Page request for the admin list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
}

impl PageQuery {
    pub fn first(limit: u32) -> Self {
        Self { page: 1, limit }
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::first(10)
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    resource_prefix: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            resource_prefix: config.resource_prefix.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Copy of this client that sends `Authorization: Bearer <token>`
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn resource_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.resource_prefix, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> ApiResult<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ApiError::Unauthenticated)?;
        Ok(builder.bearer_auth(token))
    }

    /// Send and decode into an envelope. The body is parsed whatever the HTTP
    /// status; `data` is only decoded into `T` for successful envelopes.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<Envelope<T>> {
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let raw: Envelope<serde_json::Value> = serde_json::from_slice(&bytes)?;
        tracing::debug!(%status, success = raw.success, "API response");

        let data = match raw.data {
            Some(value) if raw.success && !value.is_null() => Some(serde_json::from_value(value)?),
            _ => None,
        };

        Ok(Envelope {
            success: raw.success,
            data,
            message: raw.message,
        })
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    pub async fn login(&self, role: Role, email: &str, password: &str) -> ApiResult<Envelope<LoginData>> {
        match role {
            Role::Admin => self.login_admin(email, password).await,
            Role::Customer => self.login_customer(email, password).await,
        }
    }

    pub async fn login_admin(&self, email: &str, password: &str) -> ApiResult<Envelope<LoginData>> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(self.http.post(self.url("/admin/login")).json(&body)).await
    }

    pub async fn login_customer(&self, email: &str, password: &str) -> ApiResult<Envelope<LoginData>> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(self.http.post(self.url("/customer/login")).json(&body)).await
    }

    pub async fn register_customer(&self, request: &RegisterRequest) -> ApiResult<Ack> {
        self.send(self.http.post(self.url("/customer/register")).json(request)).await
    }

    pub async fn customer_profile(&self) -> ApiResult<Envelope<Profile>> {
        let req = self.authorized(self.http.get(self.url("/customer/profile")))?;
        self.send(req).await
    }

    // ------------------------------------------------------------------
    // Packs
    // ------------------------------------------------------------------

    pub async fn create_pack(&self, pack: &PackInput) -> ApiResult<Ack> {
        let req = self.authorized(self.http.post(self.resource_url("/pack")))?;
        self.send(req.json(pack)).await
    }

    pub async fn list_packs(&self) -> ApiResult<Envelope<Vec<Pack>>> {
        let req = self.authorized(self.http.get(self.resource_url("/packs")))?;
        self.send(req).await
    }

    pub async fn update_pack(&self, pack_id: &str, pack: &PackInput) -> ApiResult<Ack> {
        let url = self.resource_url(&format!("/pack/{pack_id}"));
        let req = self.authorized(self.http.put(url))?;
        self.send(req.json(pack)).await
    }

    pub async fn delete_pack(&self, pack_id: &str) -> ApiResult<Ack> {
        let url = self.resource_url(&format!("/pack/{pack_id}"));
        let req = self.authorized(self.http.delete(url))?;
        self.send(req).await
    }

    // ------------------------------------------------------------------
    // Customer self-service
    // ------------------------------------------------------------------

    pub async fn request_subscription(&self, pack_id: &str) -> ApiResult<Ack> {
        let body = SubscriptionRequest {
            pack_id: pack_id.to_string(),
        };
        let req = self.authorized(self.http.post(self.resource_url("/customer/subscription/request")))?;
        self.send(req.json(&body)).await
    }

    pub async fn current_subscription(&self) -> ApiResult<Envelope<Subscription>> {
        let req = self.authorized(self.http.get(self.resource_url("/customer/subscription")))?;
        self.send(req).await
    }

    pub async fn subscription_history(&self) -> ApiResult<Envelope<Vec<Subscription>>> {
        let req = self.authorized(self.http.get(self.resource_url("/customer/subscription/history")))?;
        self.send(req).await
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    pub async fn dashboard_metrics(&self) -> ApiResult<Envelope<DashboardMetrics>> {
        let req = self.authorized(self.http.get(self.resource_url("/admin/dashboard/metrics")))?;
        self.send(req).await
    }

    pub async fn customers(&self, page: PageQuery) -> ApiResult<Envelope<Vec<Customer>>> {
        let req = self.authorized(self.http.get(self.resource_url("/customers")))?;
        let req = req.query(&[("page", page.page), ("limit", page.limit)]);
        self.send(req).await
    }

    pub async fn update_customer(&self, customer_id: &str, update: &CustomerUpdate) -> ApiResult<Ack> {
        let url = self.resource_url(&format!("/customer/{customer_id}"));
        let req = self.authorized(self.http.put(url))?;
        self.send(req.json(update)).await
    }

    pub async fn delete_customer(&self, customer_id: &str) -> ApiResult<Ack> {
        let url = self.resource_url(&format!("/customer/{customer_id}"));
        let req = self.authorized(self.http.delete(url))?;
        self.send(req).await
    }

    /// `status: None` sends an empty status parameter, which the API treats as "any"
    pub async fn subscriptions(
        &self,
        page: PageQuery,
        status: Option<SubscriptionStatus>,
    ) -> ApiResult<Envelope<Vec<Subscription>>> {
        let req = self.authorized(self.http.get(self.resource_url("/subscriptions")))?;
        let req = req.query(&[
            ("page", page.page.to_string()),
            ("limit", page.limit.to_string()),
            ("status", status.map(|s| s.as_str().to_string()).unwrap_or_default()),
        ]);
        self.send(req).await
    }

    pub async fn update_subscription_status(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> ApiResult<Ack> {
        let url = self.resource_url(&format!("/subscription/{subscription_id}/status"));
        let req = self.authorized(self.http.put(url))?;
        self.send(req.json(&StatusUpdate { status })).await
    }

    pub async fn assign_subscription(&self, customer_id: &str, pack_id: &str) -> ApiResult<Ack> {
        let body = AssignRequest {
            customer_id: customer_id.to_string(),
            pack_id: pack_id.to_string(),
        };
        let req = self.authorized(self.http.post(self.resource_url("/subscription/assign")))?;
        self.send(req.json(&body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let config = ApiConfig {
            base_url: "http://api.local/api/".to_string(),
            resource_prefix: "/v1/".to_string(),
            timeout_secs: 5,
        };
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_urls_are_joined_without_double_slashes() {
        let api = client();
        assert_eq!(api.url("/admin/login"), "http://api.local/api/admin/login");
        assert_eq!(api.resource_url("/packs"), "http://api.local/api/v1/packs");
    }

    #[test]
    fn test_with_token_keeps_original_anonymous() {
        let api = client();
        let authed = api.with_token("t-1");
        assert_eq!(authed.token(), Some("t-1"));
        assert!(api.token().is_none());
    }

    #[tokio::test]
    async fn test_authenticated_call_without_token_fails_fast() {
        let api = client();
        let err = api.list_packs().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }
}
