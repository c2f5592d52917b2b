//! Error types and the failure taxonomy used to pick a recovery.

use thiserror::Error;

/// Crate error type.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the backend.
        message: String,
    },

    /// Session token could not be decoded or verified.
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Persisted client state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend reply did not match any known shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Checkout widget is not loaded or has no public key.
    #[error("Checkout not ready: {0}")]
    CheckoutNotReady(String),

    /// A call needing a session was made without one.
    #[error("Not signed in")]
    NotSignedIn,
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of a failure, deciding how the front end recovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad credentials, expired or invalid token.
    Authentication,
    /// Backend unreachable or timed out.
    Network,
    /// Valid session, insufficient role.
    Authorization,
    /// Anything else.
    Other,
}

/// Recovery action for a failure. None of them end the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// Clear the session and send the user to the given login path.
    ClearSessionAndRedirect(String),
    /// Show a non-fatal banner.
    Banner(String),
    /// Quietly redirect to the given path.
    Redirect(String),
    /// Report the message in place.
    Report(String),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Http(err) if err.is_connect() || err.is_timeout() => FailureKind::Network,
            Self::Http(err) => match err.status().map(|s| s.as_u16()) {
                Some(401) => FailureKind::Authentication,
                Some(403) => FailureKind::Authorization,
                _ => FailureKind::Other,
            },
            Self::Api { status: 401, .. } | Self::Token(_) | Self::NotSignedIn => {
                FailureKind::Authentication
            }
            Self::Api { status: 403, .. } => FailureKind::Authorization,
            _ => FailureKind::Other,
        }
    }

    /// Pick the recovery for this error.
    ///
    /// `login_path` and `default_path` come from the guard configuration.
    #[must_use]
    pub fn recovery(&self, login_path: &str, default_path: &str) -> Recovery {
        match self.kind() {
            FailureKind::Authentication => Recovery::ClearSessionAndRedirect(login_path.to_string()),
            FailureKind::Network => Recovery::Banner(
                "Unable to reach the server. Some features may be unavailable.".to_string(),
            ),
            FailureKind::Authorization => Recovery::Redirect(default_path.to_string()),
            FailureKind::Other => Recovery::Report(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_status_classification() {
        let unauthorized = Error::Api {
            status: 401,
            message: "bad credentials".into(),
        };
        assert_eq!(unauthorized.kind(), FailureKind::Authentication);
        assert_eq!(
            unauthorized.recovery("/login", "/"),
            Recovery::ClearSessionAndRedirect("/login".into())
        );

        let forbidden = Error::Api {
            status: 403,
            message: "admins only".into(),
        };
        assert_eq!(forbidden.kind(), FailureKind::Authorization);
        assert_eq!(forbidden.recovery("/login", "/"), Recovery::Redirect("/".into()));

        let server = Error::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(server.kind(), FailureKind::Other);
        assert!(matches!(server.recovery("/login", "/"), Recovery::Report(m) if m.contains("boom")));
    }

    #[test]
    fn test_missing_session_is_authentication_failure() {
        assert_eq!(Error::NotSignedIn.kind(), FailureKind::Authentication);
    }

    #[tokio::test]
    async fn test_connect_failure_is_network() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{addr}/"))
            .send()
            .await
            .expect_err("listener was dropped");
        let err = Error::from(err);
        assert_eq!(err.kind(), FailureKind::Network);
        assert!(matches!(err.recovery("/login", "/"), Recovery::Banner(_)));
    }
}
