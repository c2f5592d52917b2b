//! Request and response bodies exchanged with the booking backend.

use serde::{Deserialize, Serialize};

use crate::session::{Role, UserProfile};

// =============================================================================
// Auth
// =============================================================================

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Token plus profile fields returned by login and registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl AuthResponse {
    /// Profile described by this response. Blank names count as absent.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        let non_blank = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        UserProfile {
            id: Some(self.user_id),
            email: self.email.clone(),
            first_name: non_blank(&self.first_name),
            last_name: non_blank(&self.last_name),
            role: self.role,
        }
    }
}

// =============================================================================
// Profile
// =============================================================================

/// Account details from `GET /user/profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountProfile {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Body of `PUT /user/profile`. Only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

// =============================================================================
// Payments
// =============================================================================

/// Public checkout key from `GET /api/payments/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfig {
    pub key_id: String,
}

/// Order handed to the checkout widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub order_id: String,
    /// Amount in the currency's smallest unit.
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub notes: serde_json::Map<String, serde_json::Value>,
}

/// Signed result the checkout widget reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// `{success, message}` reply used by payment verification and failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// Reports
// =============================================================================

/// Booking history report window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReportFilter {
    pub start_date: String,
    pub end_date: String,
}

/// Flight analytics report filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightReportFilter {
    pub origin: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
}

/// Revenue grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RevenuePeriod {
    Daily,
    Monthly,
    Annual,
}

impl RevenuePeriod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Monthly => "MONTHLY",
            Self::Annual => "ANNUAL",
        }
    }
}

/// Revenue report filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReportFilter {
    pub start_date: String,
    pub end_date: String,
    pub period: RevenuePeriod,
}

// =============================================================================
// External flight API status
// =============================================================================

/// Reply of `GET /api/flights/api-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiModeStatus {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_from_backend_json() {
        let body = r#"{
            "token": "t",
            "userId": 7,
            "email": "ana@example.com",
            "role": "ADMIN",
            "firstName": "Ana",
            "lastName": ""
        }"#;
        let response: AuthResponse = serde_json::from_str(body).unwrap();
        let profile = response.profile();
        assert_eq!(profile.id, Some(7));
        assert_eq!(profile.role, Role::Admin);
        assert_eq!(profile.first_name.as_deref(), Some("Ana"));
        assert_eq!(profile.last_name, None);
    }

    #[test]
    fn test_register_request_omits_missing_contact() {
        let req = RegisterRequest {
            email: "a@b.c".into(),
            password: "pw".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["firstName"], "A");
        assert!(json.get("phone").is_none());
    }

    #[test]
    fn test_revenue_filter_wire_shape() {
        let filter = RevenueReportFilter {
            start_date: "2024-01-01".into(),
            end_date: "2024-01-31".into(),
            period: RevenuePeriod::Monthly,
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["period"], "MONTHLY");
        assert_eq!(json["startDate"], "2024-01-01");
    }
}
