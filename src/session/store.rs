//! The session store: single source of truth for "who is signed in".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::idle::{DEFAULT_IDLE_TIMEOUT, IdleTimer};
use super::profile::{Role, UserProfile};
use super::state::{SessionEvent, SessionState};
use super::token::{TokenClaims, TokenDecoder};
use crate::api::{AuthBackend, AuthResponse, LoginRequest, RegisterRequest};
use crate::error::{Error, Result};
use crate::storage::{ClientStorage, StorageKey};

/// Knobs for a [`SessionStore`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub idle_timeout: TimeDelta,
    /// HMAC secret. When set, token signatures are verified.
    pub token_secret: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            token_secret: None,
        }
    }
}

/// Outcome of a session check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    /// The client signed out on this page load. A token written since then
    /// by someone else is not adopted.
    SignedOut,
    Missing,
    Corrupt,
    TokenExpired,
    IdleExpired,
}

impl Validity {
    #[must_use]
    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }

    /// True when the session existed but ran out.
    #[must_use]
    pub fn is_expiry(self) -> bool {
        matches!(self, Validity::TokenExpired | Validity::IdleExpired)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::SignedOut => "signed_out",
            Self::Missing => "missing",
            Self::Corrupt => "corrupt",
            Self::TokenExpired => "token_expired",
            Self::IdleExpired => "idle_expired",
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    profile: Option<UserProfile>,
}

/// Client-side session lifecycle.
///
/// All methods take `&self`; the store is meant to be shared behind an
/// `Arc` between the view loop and in-flight requests. No lock is held across
/// an `.await`.
#[derive(Debug)]
pub struct SessionStore {
    storage: Arc<dyn ClientStorage>,
    backend: Arc<dyn AuthBackend>,
    clock: Arc<dyn Clock>,
    decoder: TokenDecoder,
    idle: IdleTimer,
    inner: RwLock<Inner>,
    pending: AtomicBool,
}

/// Marks a sign-in as in flight until dropped.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SessionStore {
    pub fn new(
        storage: Arc<dyn ClientStorage>,
        backend: Arc<dyn AuthBackend>,
        settings: &SessionSettings,
    ) -> Self {
        Self {
            storage,
            backend,
            clock: Arc::new(SystemClock),
            decoder: TokenDecoder::from_secret(settings.token_secret.as_deref()),
            idle: IdleTimer::new(settings.idle_timeout),
            inner: RwLock::new(Inner {
                state: SessionState::Unknown,
                profile: None,
            }),
            pending: AtomicBool::new(false),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// Profile loaded on this page load, if any.
    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .profile
            .clone()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile().map(|p| p.role)
    }

    /// True while a login or registration is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Idle deadline currently on record.
    #[must_use]
    pub fn idle_deadline(&self) -> Option<DateTime<Utc>> {
        IdleTimer::deadline(self.storage.as_ref())
    }

    /// Stored token, while authenticated.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        if !self.state().is_authenticated() {
            return None;
        }
        self.storage.get(StorageKey::Token).ok().flatten()
    }

    /// Token for a bearer call.
    pub fn bearer(&self) -> Result<String> {
        self.token().ok_or(Error::NotSignedIn)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Is the caller authenticated right now?
    ///
    /// Repeated calls with nothing changed in between give the same answer.
    pub fn check_auth(&self) -> bool {
        self.validate().is_valid()
    }

    /// [`check_auth`](Self::check_auth) with the reason spelled out.
    ///
    /// Checks, in order: token present, token decodes, token not expired,
    /// idle deadline not reached. Any failure purges every identity entry at
    /// once.
    pub fn validate(&self) -> Validity {
        let mut inner = self.write();
        let now = self.clock.now();

        let claims = match self.inspect(now) {
            Ok(claims) => claims,
            Err(reason) => {
                if reason != Validity::Missing || inner.state != SessionState::Unauthenticated {
                    debug!(
                        name: "session.check.failed",
                        reason = reason.as_str(),
                        "Session check failed"
                    );
                }
                self.purge(&mut inner);
                self.apply(&mut inner, SessionEvent::CheckFailed);
                return reason;
            }
        };

        if inner.state == SessionState::Unauthenticated {
            debug!(
                name: "session.check.ignored",
                "Token present after sign-out on this page load; not adopting it"
            );
            return Validity::SignedOut;
        }

        if inner.profile.is_none() {
            let profile = UserProfile::from_cache(self.storage.as_ref()).unwrap_or_else(|| {
                debug!(
                    name: "session.profile.degraded",
                    "No cached profile, using token claims"
                );
                UserProfile::from_claims(&claims)
            });
            inner.profile = Some(profile);
        }
        self.apply(&mut inner, SessionEvent::CheckPassed);
        Validity::Valid
    }

    /// Sign in with the backend. Never fails past this boundary: any error
    /// clears partial state and yields `false`.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        self.settle_for_sign_in();
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let outcome = {
            let _pending = PendingGuard::enter(&self.pending);
            self.backend.login(&request).await
        };
        self.finish_sign_in("login", outcome)
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, request: &RegisterRequest) -> bool {
        self.settle_for_sign_in();
        let outcome = {
            let _pending = PendingGuard::enter(&self.pending);
            self.backend.register(request).await
        };
        self.finish_sign_in("register", outcome)
    }

    /// Sign out. Clears token, profile cache and idle deadline together.
    pub fn logout(&self) {
        let mut inner = self.write();
        self.purge(&mut inner);
        let event = if inner.state == SessionState::Unknown {
            SessionEvent::CheckFailed
        } else {
            SessionEvent::LoggedOut
        };
        self.apply(&mut inner, event);
        info!(name: "session.logout", "Signed out");
    }

    /// Note user activity: pushes the idle deadline out while authenticated.
    pub fn record_activity(&self) -> bool {
        if !self.state().is_authenticated() {
            return false;
        }
        match self.idle.reset(self.storage.as_ref(), self.clock.now()) {
            Ok(()) => true,
            Err(err) => {
                warn!(name: "session.activity.failed", error = %err, "Could not extend idle deadline");
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn inspect(&self, now: DateTime<Utc>) -> std::result::Result<TokenClaims, Validity> {
        let token = match self.storage.get(StorageKey::Token) {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => return Err(Validity::Missing),
            Err(err) => {
                warn!(name: "session.storage.unreadable", error = %err, "Could not read token");
                return Err(Validity::Missing);
            }
        };

        let claims = self.decoder.decode(&token).map_err(|err| {
            debug!(name: "session.token.corrupt", error = %err, "Token did not decode");
            Validity::Corrupt
        })?;

        if claims.is_expired(now) {
            return Err(Validity::TokenExpired);
        }
        if IdleTimer::is_expired(self.storage.as_ref(), now) {
            return Err(Validity::IdleExpired);
        }
        Ok(claims)
    }

    fn purge(&self, inner: &mut Inner) {
        inner.profile = None;
        if let Err(err) = self.storage.remove_all(&StorageKey::IDENTITY) {
            warn!(name: "session.purge.failed", error = %err, "Could not clear session storage");
        }
    }

    fn apply(&self, inner: &mut Inner, event: SessionEvent) {
        match inner.state.on(event) {
            Some(next) if next != inner.state => {
                info!(
                    name: "session.transition",
                    from = %inner.state,
                    to = %next,
                    event = ?event,
                    "Session state changed"
                );
                inner.state = next;
            }
            Some(_) => {}
            None => warn!(
                name: "session.transition.rejected",
                state = %inner.state,
                event = ?event,
                "Ignoring transition outside the session state machine"
            ),
        }
    }

    /// Bring the state to `Unauthenticated` before a sign-in, going only
    /// through listed transitions.
    fn settle_for_sign_in(&self) {
        if self.state() == SessionState::Unknown {
            self.check_auth();
        }
        if self.state() == SessionState::Authenticated {
            self.logout();
        }
    }

    fn finish_sign_in(&self, operation: &'static str, outcome: Result<AuthResponse>) -> bool {
        match outcome.and_then(|response| self.establish(response)) {
            Ok(profile) => {
                info!(
                    name: "session.signin.succeeded",
                    operation,
                    role = %profile.role,
                    user_id = ?profile.id,
                    "Signed in"
                );
                true
            }
            Err(err) => {
                warn!(
                    name: "session.signin.failed",
                    operation,
                    error = %err,
                    "Sign-in failed"
                );
                let mut inner = self.write();
                self.purge(&mut inner);
                false
            }
        }
    }

    fn establish(&self, response: AuthResponse) -> Result<UserProfile> {
        let now = self.clock.now();
        let claims = self.decoder.decode(&response.token)?;
        if claims.is_expired(now) {
            return Err(Error::Token(ErrorKind::ExpiredSignature.into()));
        }

        let profile = response.profile();
        let mut entries = vec![
            (StorageKey::Token, response.token),
            self.idle.entry(now),
        ];
        entries.extend(profile.cache_entries());

        let mut inner = self.write();
        // Names absent from this response must not survive from an earlier one.
        self.storage.remove_all(&StorageKey::IDENTITY)?;
        self.storage.set_all(&entries)?;
        inner.profile = Some(profile.clone());
        self.apply(&mut inner, SessionEvent::LoggedIn);
        Ok(profile)
    }
}
