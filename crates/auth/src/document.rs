//! Stored and public representations of [`Credentials`].
//!
//! The store document lists every persisted field explicitly and carries a
//! schema version. The public view is a separate type that simply has no
//! field for secrets.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{AggregateRoot, AuthError, AuthResult, CredentialsId};

use crate::{Credentials, Role, Session};

pub const CREDENTIALS_SCHEMA_VERSION: u32 = 1;

/// Store document for one credentials, schema version 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsDocument {
    pub schema_version: u32,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub hashed_password: Option<String>,
    #[serde(default)]
    pub password_reset_code: Option<String>,
    #[serde(default)]
    pub password_must_change: bool,
    pub enabled: bool,
    #[serde(default)]
    pub enable_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disable_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invalid_challenges: u32,
    #[serde(default)]
    pub last_invalid_challenge_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Credentials> for CredentialsDocument {
    fn from(c: &Credentials) -> Self {
        Self {
            schema_version: CREDENTIALS_SCHEMA_VERSION,
            username: c.username.clone(),
            email: c.email.clone(),
            roles: c.roles.clone(),
            group: c.group.clone(),
            tags: c.tags.clone(),
            hashed_password: c.hashed_password.clone(),
            password_reset_code: c.password_reset_code.clone(),
            password_must_change: c.password_must_change,
            enabled: c.enabled,
            enable_after: c.enable_after,
            disable_after: c.disable_after,
            invalid_challenges: c.invalid_challenges,
            last_invalid_challenge_at: c.last_invalid_challenge_at,
            sessions: c.sessions.clone(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl CredentialsDocument {
    /// Rebuild the aggregate stored under `id` at `version`.
    pub fn into_credentials(self, id: CredentialsId, version: u64) -> AuthResult<Credentials> {
        if self.schema_version != CREDENTIALS_SCHEMA_VERSION {
            return Err(AuthError::illegal_argument(format!(
                "credentials document schema version [{}] is not supported",
                self.schema_version
            )));
        }
        for role in &self.roles {
            Role::check_valid(role.as_str())?;
        }

        let mut credentials = Credentials::new(id, self.username);
        credentials.version = version;
        credentials.email = self.email;
        credentials.roles = self.roles;
        credentials.group = self.group;
        credentials.tags = self.tags;
        credentials.hashed_password = self.hashed_password;
        credentials.password_reset_code = self.password_reset_code;
        credentials.password_must_change = self.password_must_change;
        credentials.enabled = self.enabled;
        credentials.enable_after = self.enable_after;
        credentials.disable_after = self.disable_after;
        credentials.invalid_challenges = self.invalid_challenges;
        credentials.last_invalid_challenge_at = self.last_invalid_challenge_at;
        credentials.sessions = self.sessions;
        credentials.created_at = self.created_at;
        credentials.updated_at = self.updated_at;
        Ok(credentials)
    }
}

/// What callers get to see of a credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsView {
    pub id: CredentialsId,
    pub version: u64,
    pub username: String,
    pub email: Option<String>,
    /// Highest-ranked role.
    #[serde(rename = "type")]
    pub kind: Role,
    pub roles: BTreeSet<Role>,
    pub group: String,
    pub tags: BTreeSet<String>,
    pub enabled: bool,
    pub enable_after: Option<DateTime<Utc>>,
    pub disable_after: Option<DateTime<Utc>>,
    pub password_must_change: bool,
    pub invalid_challenges: u32,
    pub last_invalid_challenge_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Credentials> for CredentialsView {
    fn from(c: &Credentials) -> Self {
        Self {
            id: c.id().clone(),
            version: c.version(),
            username: c.username.clone(),
            email: c.email.clone(),
            kind: c.kind(),
            roles: c.roles.clone(),
            group: c.group().to_string(),
            tags: c.tags.clone(),
            enabled: c.enabled,
            enable_after: c.enable_after,
            disable_after: c.disable_after,
            password_must_change: c.password_must_change,
            invalid_challenges: c.invalid_challenges,
            last_invalid_challenge_at: c.last_invalid_challenge_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
