//! Client-side session layer for the Skybook flight-booking front end.
//!
//! Decides, on the client, whether the caller is signed in and which views
//! they may see. Identity is derived from a stored token plus an idle
//! deadline, and every protected view asks a route guard before rendering.
//!
//! # Modules
//!
//! - [`session`]: session store, token decoding, idle deadline, state machine
//! - [`guard`]: route guards and the route table
//! - [`storage`]: persisted client state (memory or file)
//! - [`api`]: HTTP client for the booking backend
//! - [`status`]: injectable backend availability and sample-data fallback
//! - [`usage`]: upstream flight API quota usage
//! - [`checkout`]: readiness of the checkout widget
//! - [`view`]: dropping responses that outlive their view
//! - [`config`], [`telemetry`], [`error`]

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod api;
pub mod checkout;
pub mod config;
pub mod error;
pub mod guard;
pub mod session;
pub mod status;
pub mod storage;
pub mod telemetry;
pub mod usage;
pub mod view;

use std::sync::Arc;

use url::Url;

use crate::api::BackendClient;
use crate::checkout::CheckoutGate;
use crate::config::AppConfig;
use crate::guard::{GuardSettings, RouteTable};
use crate::session::SessionStore;
use crate::status::{HttpServerStatus, ServerStatus};
use crate::storage::FileStorage;

pub use crate::error::{Error, Result};

/// Everything a front end needs, wired from configuration.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Backend HTTP client.
    pub backend: Arc<BackendClient>,
    /// Session store, backed by the configured file.
    pub session: Arc<SessionStore>,
    /// Backend availability.
    pub status: Arc<dyn ServerStatus>,
    /// Checkout widget readiness.
    pub checkout: Arc<CheckoutGate>,
    /// Route access levels.
    pub routes: Arc<RouteTable>,
    /// Guard paths and grace window.
    pub guards: GuardSettings,
    /// Global configuration.
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let backend = Arc::new(BackendClient::with_timeout(
            &config.backend.base_url,
            config.backend.request_timeout(),
        )?);
        let storage = Arc::new(FileStorage::new(&config.session.storage_path));
        let session = Arc::new(SessionStore::new(
            storage,
            Arc::clone(&backend) as Arc<dyn api::AuthBackend>,
            &config.session.settings(),
        ));
        let status = Arc::new(HttpServerStatus::new(
            backend.base_url(),
            backend.http().clone(),
            config.backend.probe_timeout(),
        )?);
        let checkout = Arc::new(CheckoutGate::new(Url::parse(&config.checkout.script_url)?));

        Ok(Self {
            backend,
            session,
            status,
            checkout,
            routes: Arc::new(RouteTable::default()),
            guards: config.guard.settings(),
            config: Arc::new(config),
        })
    }
}
