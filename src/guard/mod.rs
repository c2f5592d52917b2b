//! Route guards: may this view render?
//!
//! A guard never waits on the session indefinitely. A [`GuardedView`] reports
//! [`GuardOutcome::Verifying`] while the session is still resolving, but only
//! for a bounded grace window. After that it forces a check and decides.

mod routes;

pub use routes::{Access, RouteTable};

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::session::{Role, SessionState, SessionStore};

/// Login view.
pub const DEFAULT_LOGIN_PATH: &str = "/login";
/// Where an authenticated caller without the right role lands.
pub const DEFAULT_HOME_PATH: &str = "/";
/// Where a successful login lands when no origin was kept.
pub const DEFAULT_POST_LOGIN_PATH: &str = "/flights";
/// Verifying window (300 ms).
pub const DEFAULT_VERIFY_GRACE: TimeDelta = TimeDelta::milliseconds(300);

/// Paths and timing shared by all guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSettings {
    pub login_path: String,
    pub default_path: String,
    pub post_login_path: String,
    pub verify_grace: TimeDelta,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            default_path: DEFAULT_HOME_PATH.to_string(),
            post_login_path: DEFAULT_POST_LOGIN_PATH.to_string(),
            verify_grace: DEFAULT_VERIFY_GRACE,
        }
    }
}

impl GuardSettings {
    /// Where to go after login: the kept origin, else the configured landing.
    #[must_use]
    pub fn post_login_target(&self, from: Option<&str>) -> String {
        from.filter(|f| !f.is_empty() && *f != self.login_path)
            .unwrap_or(self.post_login_path.as_str())
            .to_string()
    }

    /// The guard enforcing `access`, if any.
    #[must_use]
    pub fn guard_for(&self, access: Access) -> Option<Arc<dyn RouteGuard>> {
        match access {
            Access::Public => None,
            Access::Authenticated => Some(Arc::new(AuthenticatedGuard::new(&self.login_path))),
            Access::Role(role) => Some(Arc::new(RoleGuard::new(
                role,
                &self.login_path,
                &self.default_path,
            ))),
        }
    }
}

/// Where to go after login: `from`, or `/flights`.
#[must_use]
pub fn post_login_target(from: Option<&str>) -> String {
    GuardSettings::default().post_login_target(from)
}

/// A redirect decided by a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    /// Originally requested location, for the post-login redirect.
    pub from: Option<String>,
    /// The session existed and ran out.
    pub expired: bool,
}

impl Redirect {
    /// Target including the `expired` marker.
    #[must_use]
    pub fn location(&self) -> String {
        if self.expired {
            format!("{}?expired=true", self.to)
        } else {
            self.to.clone()
        }
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location())?;
        if let Some(from) = &self.from {
            write!(f, " (from {from})")?;
        }
        Ok(())
    }
}

/// What a guarded view should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Render,
    /// Loading indicator.
    Verifying,
    Redirect(Redirect),
}

impl GuardOutcome {
    #[must_use]
    pub fn is_render(&self) -> bool {
        matches!(self, GuardOutcome::Render)
    }
}

/// Decides whether a view may render for the current session.
pub trait RouteGuard: Send + Sync + fmt::Debug {
    /// Decide now. Runs a full session check.
    fn decide(&self, session: &SessionStore, location: &str) -> GuardOutcome;
}

/// Renders only for an authenticated session.
#[derive(Debug, Clone)]
pub struct AuthenticatedGuard {
    login_path: String,
}

impl AuthenticatedGuard {
    #[must_use]
    pub fn new(login_path: &str) -> Self {
        Self {
            login_path: login_path.to_string(),
        }
    }
}

impl Default for AuthenticatedGuard {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_PATH)
    }
}

impl RouteGuard for AuthenticatedGuard {
    fn decide(&self, session: &SessionStore, location: &str) -> GuardOutcome {
        let validity = session.validate();
        if validity.is_valid() {
            return GuardOutcome::Render;
        }
        debug!(
            name: "guard.redirect.login",
            location,
            expired = validity.is_expiry(),
            "Not authenticated"
        );
        GuardOutcome::Redirect(Redirect {
            to: self.login_path.clone(),
            from: Some(location.to_string()),
            expired: validity.is_expiry(),
        })
    }
}

/// Renders only for an authenticated session holding `role`.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    role: Role,
    login_path: String,
    default_path: String,
}

impl RoleGuard {
    #[must_use]
    pub fn new(role: Role, login_path: &str, default_path: &str) -> Self {
        Self {
            role,
            login_path: login_path.to_string(),
            default_path: default_path.to_string(),
        }
    }

    #[must_use]
    pub fn admin() -> Self {
        Self::new(Role::Admin, DEFAULT_LOGIN_PATH, DEFAULT_HOME_PATH)
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }
}

impl RouteGuard for RoleGuard {
    fn decide(&self, session: &SessionStore, location: &str) -> GuardOutcome {
        let validity = session.validate();
        if !validity.is_valid() {
            debug!(name: "guard.redirect.login", location, "Not authenticated");
            return GuardOutcome::Redirect(Redirect {
                to: self.login_path.clone(),
                from: None,
                expired: validity.is_expiry(),
            });
        }

        match session.role() {
            Some(role) if role == self.role => GuardOutcome::Render,
            actual => {
                debug!(
                    name: "guard.redirect.role",
                    location,
                    required = %self.role,
                    actual = ?actual,
                    "Role not permitted"
                );
                GuardOutcome::Redirect(Redirect {
                    to: self.default_path.clone(),
                    from: None,
                    expired: false,
                })
            }
        }
    }
}

/// A view mounted behind a guard.
#[derive(Debug, Clone)]
pub struct GuardedView {
    guard: Arc<dyn RouteGuard>,
    location: String,
    mounted_at: DateTime<Utc>,
    grace: TimeDelta,
}

impl GuardedView {
    /// Mount `location` now, by the session's clock.
    #[must_use]
    pub fn mount(
        guard: Arc<dyn RouteGuard>,
        location: impl Into<String>,
        session: &SessionStore,
        grace: TimeDelta,
    ) -> Self {
        Self {
            guard,
            location: location.into(),
            mounted_at: session.now(),
            grace,
        }
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    fn remaining_grace(&self, session: &SessionStore) -> TimeDelta {
        (self.mounted_at + self.grace - session.now()).max(TimeDelta::zero())
    }

    fn still_resolving(session: &SessionStore) -> bool {
        session.state() == SessionState::Unknown || session.is_pending()
    }

    /// Current outcome. `Verifying` only while the session is resolving and
    /// the grace window is open.
    pub fn poll(&self, session: &SessionStore) -> GuardOutcome {
        if Self::still_resolving(session) && self.remaining_grace(session) > TimeDelta::zero() {
            return GuardOutcome::Verifying;
        }
        self.guard.decide(session, &self.location)
    }

    /// Wait out the remaining grace window if needed, then decide.
    pub async fn resolve(&self, session: &SessionStore) -> GuardOutcome {
        match self.poll(session) {
            GuardOutcome::Verifying => {
                if let Ok(wait) = self.remaining_grace(session).to_std() {
                    tokio::time::sleep(wait).await;
                }
                self.guard.decide(session, &self.location)
            }
            outcome => outcome,
        }
    }
}
