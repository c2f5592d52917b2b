//! Session state machine.

use serde::Serialize;

/// Where the client stands with respect to authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing checked yet on this page load.
    Unknown,
    Authenticated,
    Unauthenticated,
}

/// Something that happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    CheckPassed,
    CheckFailed,
    LoggedIn,
    LoggedOut,
}

impl SessionState {
    /// Next state after `event`, or `None` when the table has no such edge.
    ///
    /// Edges:
    ///
    /// | from | event | to |
    /// |---|---|---|
    /// | Unknown | CheckPassed | Authenticated |
    /// | Unknown | CheckFailed | Unauthenticated |
    /// | Authenticated | LoggedOut | Unauthenticated |
    /// | Authenticated | CheckFailed | Unauthenticated |
    /// | Unauthenticated | LoggedIn | Authenticated |
    ///
    /// Repeating a check that agrees with the current state, or logging out
    /// twice, leaves the state where it is.
    #[must_use]
    pub fn on(self, event: SessionEvent) -> Option<SessionState> {
        use SessionEvent::{CheckFailed, CheckPassed, LoggedIn, LoggedOut};
        use SessionState::{Authenticated, Unauthenticated, Unknown};

        match (self, event) {
            (Unknown | Authenticated, CheckPassed) | (Unauthenticated, LoggedIn) => {
                Some(Authenticated)
            }
            (Unknown | Authenticated | Unauthenticated, CheckFailed)
            | (Authenticated | Unauthenticated, LoggedOut) => Some(Unauthenticated),
            (Unknown, LoggedIn | LoggedOut)
            | (Authenticated, LoggedIn)
            | (Unauthenticated, CheckPassed) => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(self) -> bool {
        self == SessionState::Authenticated
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionEvent::*;
    use SessionState::*;

    #[test]
    fn test_listed_transitions() {
        assert_eq!(Unknown.on(CheckPassed), Some(Authenticated));
        assert_eq!(Unknown.on(CheckFailed), Some(Unauthenticated));
        assert_eq!(Authenticated.on(LoggedOut), Some(Unauthenticated));
        assert_eq!(Authenticated.on(CheckFailed), Some(Unauthenticated));
        assert_eq!(Unauthenticated.on(LoggedIn), Some(Authenticated));
    }

    #[test]
    fn test_unlisted_transitions_are_rejected() {
        assert_eq!(Unknown.on(LoggedIn), None);
        assert_eq!(Unknown.on(LoggedOut), None);
        assert_eq!(Authenticated.on(LoggedIn), None);
        assert_eq!(Unauthenticated.on(CheckPassed), None);
    }

    #[test]
    fn test_nothing_returns_to_unknown() {
        for state in [Unknown, Authenticated, Unauthenticated] {
            for event in [CheckPassed, CheckFailed, LoggedIn, LoggedOut] {
                assert_ne!(state.on(event), Some(Unknown));
            }
        }
    }
}
