//! HTTP client for the booking backend.
//!
//! Every call except login, registration and the availability probe carries
//! the session token as a bearer credential. The client never reads session
//! storage itself; callers pass the token from
//! [`SessionStore::bearer`](crate::session::SessionStore::bearer).

mod types;

pub use types::*;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::usage::{ApiUsage, UsageResponse};

/// Credential check used by the session store.
#[async_trait]
pub trait AuthBackend: Send + Sync + std::fmt::Debug {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse>;
}

/// Payment calls the checkout gate depends on.
#[async_trait]
pub trait PaymentBackend: Send + Sync + std::fmt::Debug {
    async fn payment_config(&self, token: &str) -> Result<PaymentConfig>;
    async fn create_order(&self, booking_id: &str, token: &str) -> Result<PaymentOrder>;
}

/// HTTP client for the backend API.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    http: reqwest::Client,
}

impl BackendClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The backend base URL (e.g., "http://localhost:8080")
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, http)
    }

    /// Create a new client with a custom reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let base_url = base(Url::parse(base_url.as_ref())?);
        Ok(Self { base_url, http })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Shared reqwest client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the Auth API.
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    /// Access the Profile API.
    pub fn profile(&self) -> ProfileApi<'_> {
        ProfileApi { client: self }
    }

    /// Access the Payments API.
    pub fn payments(&self) -> PaymentsApi<'_> {
        PaymentsApi { client: self }
    }

    /// Access the Reports API.
    pub fn reports(&self) -> ReportsApi<'_> {
        ReportsApi { client: self }
    }

    /// Access the external flight API status endpoints.
    pub fn flight_api(&self) -> FlightApiStatus<'_> {
        FlightApiStatus { client: self }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        endpoint(&self.base_url, path)
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| format!("API Error: {status}"));
        debug!(
            name: "api.response.error",
            status = status.as_u16(),
            message = %message,
            "Backend returned an error"
        );
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// `base_url` with a trailing `/`, so joins keep its path.
pub(crate) fn base(mut base_url: Url) -> Url {
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }
    base_url
}

/// Resolve an absolute API path such as `/auth/login` under `base_url`,
/// keeping any path prefix the base carries.
pub fn endpoint(base_url: &Url, path: &str) -> Result<Url> {
    Ok(base(base_url.clone()).join(path.trim_start_matches('/'))?)
}

/// Pull a human message out of an error body: `message`, then `error`, then
/// the raw text.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(serde_json::Value::String(text)) = map.get(field) {
                return Some(text.clone());
            }
        }
    }
    Some(body.to_string())
}

// =============================================================================
// Auth API
// =============================================================================

/// Auth API client.
#[derive(Debug)]
pub struct AuthApi<'a> {
    client: &'a BackendClient,
}

impl AuthApi<'_> {
    /// Exchange credentials for a token and profile.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let response = self
            .client
            .http
            .post(self.client.url("/auth/login")?)
            .json(request)
            .send()
            .await?;
        BackendClient::handle_response(response).await
    }

    /// Create a customer account.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let response = self
            .client
            .http
            .post(self.client.url("/auth/register")?)
            .json(request)
            .send()
            .await?;
        BackendClient::handle_response(response).await
    }
}

#[async_trait]
impl AuthBackend for BackendClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        self.auth().login(request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        self.auth().register(request).await
    }
}

// =============================================================================
// Profile API
// =============================================================================

/// Profile API client.
#[derive(Debug)]
pub struct ProfileApi<'a> {
    client: &'a BackendClient,
}

impl ProfileApi<'_> {
    pub async fn get(&self, token: &str) -> Result<AccountProfile> {
        let response = self
            .client
            .http
            .get(self.client.url("/user/profile")?)
            .bearer_auth(token)
            .send()
            .await?;
        BackendClient::handle_response(response).await
    }

    pub async fn update(&self, token: &str, update: &ProfileUpdate) -> Result<AccountProfile> {
        let response = self
            .client
            .http
            .put(self.client.url("/user/profile")?)
            .bearer_auth(token)
            .json(update)
            .send()
            .await?;
        BackendClient::handle_response(response).await
    }
}

// =============================================================================
// Payments API
// =============================================================================

/// Payments API client.
#[derive(Debug)]
pub struct PaymentsApi<'a> {
    client: &'a BackendClient,
}

impl PaymentsApi<'_> {
    /// Public key for the checkout widget.
    pub async fn config(&self, token: &str) -> Result<PaymentConfig> {
        let response = self
            .client
            .http
            .get(self.client.url("/api/payments/config")?)
            .bearer_auth(token)
            .send()
            .await?;
        BackendClient::handle_response(response).await
    }

    /// Create a checkout order for a booking.
    pub async fn create_order(&self, booking_id: &str, token: &str) -> Result<PaymentOrder> {
        let response = self
            .client
            .http
            .post(
                self.client
                    .url(&format!("/api/payments/create-order/{booking_id}"))?,
            )
            .bearer_auth(token)
            .send()
            .await?;
        BackendClient::handle_response(response).await
    }

    /// Have the backend check the widget's signature.
    pub async fn verify(
        &self,
        booking_id: &str,
        confirmation: &PaymentConfirmation,
        token: &str,
    ) -> Result<OperationResult> {
        let response = self
            .client
            .http
            .post(self.client.url("/api/payments/verify")?)
            .query(&[
                ("razorpay_order_id", confirmation.razorpay_order_id.as_str()),
                ("razorpay_payment_id", confirmation.razorpay_payment_id.as_str()),
                ("razorpay_signature", confirmation.razorpay_signature.as_str()),
                ("booking_id", booking_id),
            ])
            .bearer_auth(token)
            .send()
            .await?;
        BackendClient::handle_response(response).await
    }

    /// Tell the backend a payment failed so it cancels the booking.
    pub async fn report_failure(&self, booking_id: &str, token: &str) -> Result<OperationResult> {
        let response = self
            .client
            .http
            .put(
                self.client
                    .url(&format!("/api/bookings/{booking_id}/payment-failed"))?,
            )
            .bearer_auth(token)
            .send()
            .await?;
        BackendClient::handle_response(response).await
    }
}

#[async_trait]
impl PaymentBackend for BackendClient {
    async fn payment_config(&self, token: &str) -> Result<PaymentConfig> {
        self.payments().config(token).await
    }

    async fn create_order(&self, booking_id: &str, token: &str) -> Result<PaymentOrder> {
        self.payments().create_order(booking_id, token).await
    }
}

// =============================================================================
// Reports API
// =============================================================================

/// Reports API client. Reports come back as raw document bytes.
#[derive(Debug)]
pub struct ReportsApi<'a> {
    client: &'a BackendClient,
}

impl ReportsApi<'_> {
    pub async fn bookings(&self, token: &str, filter: &BookingReportFilter) -> Result<Vec<u8>> {
        self.download("/api/reports/booking/History", token, filter)
            .await
    }

    pub async fn flights(&self, token: &str, filter: &FlightReportFilter) -> Result<Vec<u8>> {
        self.download("/api/reports/flight/Analytics", token, filter)
            .await
    }

    pub async fn revenue(&self, token: &str, filter: &RevenueReportFilter) -> Result<Vec<u8>> {
        let path = format!("/api/reports/revenue/{}", filter.period.as_str());
        self.download(&path, token, filter).await
    }

    async fn download<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<Vec<u8>> {
        let response = self
            .client
            .http
            .post(self.client.url(path)?)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        let response = BackendClient::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

// =============================================================================
// External flight API status
// =============================================================================

/// Status of the backend's upstream flight data API.
#[derive(Debug)]
pub struct FlightApiStatus<'a> {
    client: &'a BackendClient,
}

impl FlightApiStatus<'_> {
    /// Whether live API mode is on. Any failure reads as "off".
    pub async fn enabled(&self, token: &str) -> bool {
        let result: Result<ApiModeStatus> = async {
            let response = self
                .client
                .http
                .get(self.client.url("/api/flights/api-status")?)
                .bearer_auth(token)
                .send()
                .await?;
            BackendClient::handle_response(response).await
        }
        .await;

        match result {
            Ok(status) => status.enabled,
            Err(err) => {
                debug!(name: "api.mode.unknown", error = %err, "Could not read API mode");
                false
            }
        }
    }

    /// Quota usage this month.
    pub async fn usage(&self, token: &str) -> Result<ApiUsage> {
        let response = self
            .client
            .http
            .get(self.client.url("/api/flights/api-usage")?)
            .bearer_auth(token)
            .send()
            .await?;
        let response = BackendClient::ensure_success(response).await?;
        let body = response.text().await?;
        UsageResponse::from_body(&body).into_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_message_field() {
        assert_eq!(
            error_message(r#"{"message":"Invalid email or password","error":"x"}"#).as_deref(),
            Some("Invalid email or password")
        );
        assert_eq!(
            error_message(r#"{"error":"order failed"}"#).as_deref(),
            Some("order failed")
        );
        assert_eq!(error_message("plain text").as_deref(), Some("plain text"));
        assert_eq!(error_message("  "), None);
    }

    #[test]
    fn test_url_join() {
        let client = BackendClient::new("http://localhost:8080").unwrap();
        assert_eq!(
            client.url("/api/payments/config").unwrap().as_str(),
            "http://localhost:8080/api/payments/config"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        for base_url in [
            "https://api.example.com/booking",
            "https://api.example.com/booking/",
        ] {
            let client = BackendClient::new(base_url).unwrap();
            assert_eq!(
                client.url("/auth/login").unwrap().as_str(),
                "https://api.example.com/booking/auth/login"
            );
            assert_eq!(
                client.url("/api/payments/create-order/42").unwrap().as_str(),
                "https://api.example.com/booking/api/payments/create-order/42"
            );
        }
    }

    #[test]
    fn test_endpoint_rejects_unjoinable_base() {
        let base_url = Url::parse("mailto:ops@example.com").unwrap();
        assert!(matches!(
            endpoint(&base_url, "/auth/login"),
            Err(Error::InvalidUrl(_))
        ));
    }
}
