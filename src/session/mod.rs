//! Client-side authentication and session lifecycle.
//!
//! A session is the client's belief that it is signed in. It is derived from
//! the stored token plus an independent idle deadline. Both must be in the
//! future, and when either lapses every cached identity entry is purged
//! together.
//!
//! # Architecture
//!
//! - [`SessionStore`]: owns the state machine and the persisted entries
//! - [`SessionState`]: `Unknown`, `Authenticated` or `Unauthenticated`
//! - [`TokenDecoder`]: reads (and optionally verifies) token claims
//! - [`IdleTimer`]: the `session_timeout` deadline
//! - [`Clock`]: injected time source
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use skybook_session::api::BackendClient;
//! use skybook_session::session::{SessionSettings, SessionStore};
//! use skybook_session::storage::MemoryStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(BackendClient::new("http://localhost:8080")?);
//! let store = SessionStore::new(
//!     Arc::new(MemoryStorage::new()),
//!     backend,
//!     &SessionSettings::default(),
//! );
//!
//! if store.login("ana@example.com", "secret").await {
//!     assert!(store.check_auth());
//! }
//! # Ok(())
//! # }
//! ```

mod clock;
mod idle;
mod profile;
mod state;
mod store;
mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use idle::{DEFAULT_IDLE_TIMEOUT, IdleTimer};
pub use profile::{Role, UnknownRole, UserProfile};
pub use state::{SessionEvent, SessionState};
pub use store::{SessionSettings, SessionStore, Validity};
pub use token::{TokenClaims, TokenDecoder};
