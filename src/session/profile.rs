//! Caller identity: role and profile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::token::TokenClaims;
use crate::storage::{ClientStorage, StorageKey};

/// Account role. The backend only issues these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a role string outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Self::Customer),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Signed-in user as the front end sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Backend user id. `None` for a profile rebuilt from token claims.
    pub id: Option<i64>,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
}

impl UserProfile {
    /// Read the cached profile fields.
    ///
    /// Returns `None` unless id, email and role are all present and valid.
    pub fn from_cache(storage: &dyn ClientStorage) -> Option<Self> {
        let read = |key| storage.get(key).ok().flatten().filter(|v| !v.is_empty());

        let id = read(StorageKey::UserId)?.parse().ok()?;
        let email = read(StorageKey::UserEmail)?;
        let role = read(StorageKey::UserRole)?.parse().ok()?;

        Some(Self {
            id: Some(id),
            email,
            first_name: read(StorageKey::UserFirstName),
            last_name: read(StorageKey::UserLastName),
            role,
        })
    }

    /// Degraded profile carrying only what the token says.
    #[must_use]
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email().to_string(),
            first_name: None,
            last_name: None,
            role: claims.role.unwrap_or(Role::Customer),
        }
    }

    /// Storage entries for this profile. Absent names are left out.
    #[must_use]
    pub fn cache_entries(&self) -> Vec<(StorageKey, String)> {
        let mut entries = vec![
            (StorageKey::UserEmail, self.email.clone()),
            (StorageKey::UserRole, self.role.to_string()),
        ];
        if let Some(id) = self.id {
            entries.push((StorageKey::UserId, id.to_string()));
        }
        if let Some(first) = &self.first_name {
            entries.push((StorageKey::UserFirstName, first.clone()));
        }
        if let Some(last) = &self.last_name {
            entries.push((StorageKey::UserLastName, last.clone()));
        }
        entries
    }

    /// "First Last", falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => self.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_role_parsing() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("customer".parse::<Role>(), Ok(Role::Customer));
        assert!("PILOT".parse::<Role>().is_err());
    }

    #[test]
    fn test_cache_requires_id_email_and_role() {
        let storage = MemoryStorage::new();
        storage.set(StorageKey::UserEmail, "ana@example.com").unwrap();
        storage.set(StorageKey::UserRole, "ADMIN").unwrap();
        assert_eq!(UserProfile::from_cache(&storage), None);

        storage.set(StorageKey::UserId, "42").unwrap();
        storage.set(StorageKey::UserFirstName, "Ana").unwrap();
        let profile = UserProfile::from_cache(&storage).unwrap();
        assert_eq!(profile.id, Some(42));
        assert_eq!(profile.role, Role::Admin);
        assert_eq!(profile.first_name.as_deref(), Some("Ana"));
        assert_eq!(profile.last_name, None);
        assert_eq!(profile.display_name(), "Ana");
    }

    #[test]
    fn test_cache_with_unknown_role_is_ignored() {
        let storage = MemoryStorage::new();
        storage.set(StorageKey::UserId, "7").unwrap();
        storage.set(StorageKey::UserEmail, "x@example.com").unwrap();
        storage.set(StorageKey::UserRole, "SUPERUSER").unwrap();
        assert_eq!(UserProfile::from_cache(&storage), None);
    }
}
