//! Readiness of the third-party checkout widget.
//!
//! A charge may start only when the widget script has loaded and the backend
//! has handed out a usable public key. The key is fetched only for an
//! authenticated session.

use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use tracing::{info, warn};
use url::Url;

use crate::api::{PaymentBackend, PaymentOrder};
use crate::error::{Error, Result};
use crate::session::SessionStore;

/// Hosted checkout script.
pub const DEFAULT_SCRIPT_URL: &str = "https://checkout.razorpay.com/v1/checkout.js";

#[derive(Debug, Clone, PartialEq, Eq)]
enum WidgetState {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug)]
struct GateInner {
    widget: WidgetState,
    public_key: Option<String>,
    key_loading: bool,
    key_error: Option<String>,
}

/// Snapshot of the checkout gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReadiness {
    pub widget_ready: bool,
    pub public_key: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl CheckoutReadiness {
    #[must_use]
    pub fn can_charge(&self) -> bool {
        self.widget_ready && self.public_key.is_some()
    }
}

/// Tracks widget load and public key.
#[derive(Debug)]
pub struct CheckoutGate {
    script_url: Url,
    inner: RwLock<GateInner>,
}

impl CheckoutGate {
    #[must_use]
    pub fn new(script_url: Url) -> Self {
        Self {
            script_url,
            inner: RwLock::new(GateInner {
                widget: WidgetState::Loading,
                public_key: None,
                key_loading: false,
                key_error: None,
            }),
        }
    }

    #[must_use]
    pub fn script_url(&self) -> &Url {
        &self.script_url
    }

    fn write(&self) -> RwLockWriteGuard<'_, GateInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mark_widget_loaded(&self) {
        self.write().widget = WidgetState::Ready;
    }

    pub fn mark_widget_failed(&self, reason: impl Into<String>) {
        self.write().widget = WidgetState::Failed(reason.into());
    }

    /// Fetch the widget script and record whether it loaded.
    pub async fn load_widget(&self, http: &reqwest::Client) -> bool {
        let result = http
            .get(self.script_url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match result {
            Ok(_) => {
                info!(name: "checkout.widget.loaded", url = %self.script_url, "Checkout widget loaded");
                self.mark_widget_loaded();
                true
            }
            Err(err) => {
                warn!(name: "checkout.widget.failed", error = %err, "Checkout widget failed to load");
                self.mark_widget_failed("Failed to load checkout script");
                false
            }
        }
    }

    /// Load the public key for the current session.
    ///
    /// Without an authenticated session the key is dropped and nothing is
    /// fetched.
    pub async fn refresh_key(&self, session: &SessionStore, payments: &dyn PaymentBackend) {
        let Some(token) = session.token() else {
            let mut inner = self.write();
            inner.public_key = None;
            inner.key_loading = false;
            return;
        };

        {
            let mut inner = self.write();
            inner.key_loading = true;
            inner.key_error = None;
        }

        let result = payments.payment_config(&token).await;

        let mut inner = self.write();
        inner.key_loading = false;
        match result {
            Ok(config) if !config.key_id.trim().is_empty() => {
                inner.public_key = Some(config.key_id.trim().to_string());
            }
            Ok(_) => {
                inner.public_key = None;
                inner.key_error = Some("Payment system returned an empty key".to_string());
            }
            Err(err) => {
                warn!(name: "checkout.key.failed", error = %err, "Could not load checkout key");
                inner.public_key = None;
                inner.key_error = Some(err.to_string());
            }
        }
    }

    #[must_use]
    pub fn readiness(&self) -> CheckoutReadiness {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let widget_error = match &inner.widget {
            WidgetState::Failed(reason) => Some(reason.clone()),
            _ => None,
        };
        CheckoutReadiness {
            widget_ready: inner.widget == WidgetState::Ready,
            public_key: inner.public_key.clone(),
            loading: inner.key_loading || inner.widget == WidgetState::Loading,
            error: widget_error.or_else(|| inner.key_error.clone()),
        }
    }

    /// Public key, if a charge may start now.
    pub fn ensure_ready(&self) -> Result<String> {
        let readiness = self.readiness();
        if !readiness.widget_ready {
            return Err(Error::CheckoutNotReady(
                readiness
                    .error
                    .unwrap_or_else(|| "checkout widget not loaded".to_string()),
            ));
        }
        readiness.public_key.ok_or_else(|| {
            Error::CheckoutNotReady(
                readiness
                    .error
                    .unwrap_or_else(|| "no checkout key".to_string()),
            )
        })
    }

    /// Create the order a charge runs against. Refuses before the gate is
    /// ready.
    pub async fn begin_charge(
        &self,
        session: &SessionStore,
        payments: &dyn PaymentBackend,
        booking_id: &str,
    ) -> Result<PaymentOrder> {
        self.ensure_ready()?;
        let token = session.bearer()?;
        let order = payments.create_order(booking_id, &token).await?;
        info!(
            name: "checkout.order.created",
            booking_id,
            order_id = %order.order_id,
            "Checkout order created"
        );
        Ok(order)
    }
}
