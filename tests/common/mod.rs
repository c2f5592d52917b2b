#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tokio::sync::Notify;

use skybook_session::api::{AuthBackend, AuthResponse, LoginRequest, RegisterRequest};
use skybook_session::session::{Clock, ManualClock, Role, SessionSettings, SessionStore, TokenClaims};
use skybook_session::storage::MemoryStorage;
use skybook_session::{Error, Result};

pub const SECRET: &[u8] = b"backend-signing-secret";

pub fn mint(claims: &TokenClaims) -> String {
    encode(&Header::default(), claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

pub fn token(email: &str, role: Option<Role>, expires_at: DateTime<Utc>) -> String {
    token_with_id(email, role, None, expires_at)
}

pub fn token_with_id(
    email: &str,
    role: Option<Role>,
    user_id: Option<i64>,
    expires_at: DateTime<Utc>,
) -> String {
    mint(&TokenClaims {
        sub: email.to_string(),
        email: Some(email.to_string()),
        role,
        user_id,
        iat: Some(expires_at.timestamp() - 3600),
        exp: expires_at.timestamp(),
    })
}

/// A registered account on the fake backend.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// In-process stand-in for the auth endpoints. Issues tokens by the shared
/// clock.
#[derive(Debug)]
pub struct FakeAuth {
    clock: Arc<ManualClock>,
    accounts: Vec<Account>,
    token_lifetime: TimeDelta,
    /// When set, login waits for a notification before answering.
    hold: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
}

impl FakeAuth {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            accounts: vec![
                Account {
                    id: 1,
                    email: "ana@example.com".into(),
                    password: "customer-pw".into(),
                    role: Role::Customer,
                },
                Account {
                    id: 2,
                    email: "root@example.com".into(),
                    password: "admin-pw".into(),
                    role: Role::Admin,
                },
            ],
            token_lifetime: TimeDelta::hours(24),
            hold: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn token_lifetime(mut self, lifetime: TimeDelta) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    pub fn hold_until(mut self, notify: Arc<Notify>) -> Self {
        self.hold = Some(notify);
        self
    }

    fn respond(&self, account: &Account) -> AuthResponse {
        let expires_at = self.clock.now() + self.token_lifetime;
        AuthResponse {
            token: token_with_id(&account.email, Some(account.role), Some(account.id), expires_at),
            user_id: account.id,
            email: account.email.clone(),
            role: account.role,
            first_name: Some("Ana".into()),
            last_name: Some("Silva".into()),
            phone: None,
            address: None,
        }
    }
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.accounts
            .iter()
            .find(|a| a.email == request.email && a.password == request.password)
            .map(|account| self.respond(account))
            .ok_or_else(|| Error::Api {
                status: 401,
                message: "Invalid email or password".into(),
            })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.accounts.iter().any(|a| a.email == request.email) {
            return Err(Error::Api {
                status: 400,
                message: "Email already registered".into(),
            });
        }
        Ok(self.respond(&Account {
            id: 99,
            email: request.email.clone(),
            password: request.password.clone(),
            role: Role::Customer,
        }))
    }
}

/// Session store over memory storage and a manual clock.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub storage: Arc<MemoryStorage>,
    pub auth: Arc<FakeAuth>,
    pub store: SessionStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(SessionSettings::default(), FakeAuth::new)
    }

    pub fn with(settings: SessionSettings, auth: impl FnOnce(Arc<ManualClock>) -> FakeAuth) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let storage = Arc::new(MemoryStorage::new());
        let auth = Arc::new(auth(Arc::clone(&clock)));
        let store = SessionStore::new(
            Arc::clone(&storage) as _,
            Arc::clone(&auth) as _,
            &settings,
        )
        .with_clock(Arc::clone(&clock) as _);
        Self {
            clock,
            storage,
            auth,
            store,
        }
    }

    /// A fresh store over the same storage and clock: a page reload.
    pub fn reload(&self) -> SessionStore {
        self.reload_with(&SessionSettings::default())
    }

    pub fn reload_with(&self, settings: &SessionSettings) -> SessionStore {
        SessionStore::new(
            Arc::clone(&self.storage) as _,
            Arc::clone(&self.auth) as _,
            settings,
        )
        .with_clock(Arc::clone(&self.clock) as _)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_backend(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
