//! Backend availability.
//!
//! Views ask a [`ServerStatus`] whether the backend answers before deciding
//! between live data and sample data. The service is injected, never a
//! process-wide flag, so tests swap in [`StaticServerStatus`].

use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::api::endpoint;
use crate::error::{FailureKind, Result};

/// Default probe timeout (2 seconds).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of an availability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
}

impl Availability {
    #[must_use]
    pub fn is_available(self) -> bool {
        self == Availability::Available
    }
}

/// Answers "is the backend reachable".
#[async_trait]
pub trait ServerStatus: Send + Sync + std::fmt::Debug {
    async fn probe(&self) -> Availability;
}

/// Probes a lightweight backend endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpServerStatus {
    http: reqwest::Client,
    probe_url: Url,
    timeout: Duration,
}

impl HttpServerStatus {
    /// Probe `GET {base_url}/api/flights/test`.
    pub fn new(base_url: &Url, http: reqwest::Client, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http,
            probe_url: endpoint(base_url, "/api/flights/test")?,
            timeout,
        })
    }

    #[must_use]
    pub fn probe_url(&self) -> &Url {
        &self.probe_url
    }
}

#[async_trait]
impl ServerStatus for HttpServerStatus {
    async fn probe(&self) -> Availability {
        let result = self
            .http
            .get(self.probe_url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match result {
            Ok(_) => {
                debug!(name: "status.probe.available", url = %self.probe_url, "Backend available");
                Availability::Available
            }
            Err(err) => {
                info!(
                    name: "status.probe.unavailable",
                    url = %self.probe_url,
                    error = %err,
                    "Backend not available"
                );
                Availability::Unavailable
            }
        }
    }
}

/// Fixed answer, switchable at runtime.
#[derive(Debug)]
pub struct StaticServerStatus {
    availability: RwLock<Availability>,
}

impl StaticServerStatus {
    #[must_use]
    pub fn new(availability: Availability) -> Self {
        Self {
            availability: RwLock::new(availability),
        }
    }

    pub fn set(&self, availability: Availability) {
        *self
            .availability
            .write()
            .unwrap_or_else(PoisonError::into_inner) = availability;
    }
}

#[async_trait]
impl ServerStatus for StaticServerStatus {
    async fn probe(&self) -> Availability {
        *self
            .availability
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Banner text shown over sample data.
pub const OFFLINE_BANNER: &str = "Server is unavailable. Showing sample data.";

/// Data for a view, and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Live(T),
    Sample { value: T, banner: String },
}

impl<T> Fetched<T> {
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Fetched::Live(_))
    }

    #[must_use]
    pub fn banner(&self) -> Option<&str> {
        match self {
            Fetched::Live(_) => None,
            Fetched::Sample { banner, .. } => Some(banner),
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Fetched::Live(value) | Fetched::Sample { value, .. } => value,
        }
    }
}

/// Load live data, falling back to `sample` when the backend is unreachable.
///
/// The probe runs first; if it fails, `live` is never called. A live call that
/// fails with a network error also falls back. Any other error is returned.
pub async fn with_fallback<T, F, Fut>(
    status: &dyn ServerStatus,
    live: F,
    sample: impl FnOnce() -> T,
) -> Result<Fetched<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if !status.probe().await.is_available() {
        return Ok(Fetched::Sample {
            value: sample(),
            banner: OFFLINE_BANNER.to_string(),
        });
    }

    match live().await {
        Ok(value) => Ok(Fetched::Live(value)),
        Err(err) if err.kind() == FailureKind::Network => {
            info!(name: "status.fallback.sample", error = %err, "Live call failed, using sample data");
            Ok(Fetched::Sample {
                value: sample(),
                banner: OFFLINE_BANNER.to_string(),
            })
        }
        Err(err) => Err(err),
    }
}
