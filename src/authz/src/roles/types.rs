//! Role and client records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, Result};
use crate::scope::ScopeSet;

/// Prefix a scope needs to unlock a role
pub const ASSUME_PREFIX: &str = "assume:";

/// Role record as persisted by the role store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    /// Role identifier; may itself end in `*`
    pub role_id: String,

    /// Scopes granted to anyone who can assume the role
    pub scopes: Vec<String>,

    #[serde(default)]
    pub description: String,

    pub created: DateTime<Utc>,

    pub last_modified: DateTime<Utc>,
}

impl RoleRecord {
    /// Create a new role record stamped with the current time
    pub fn new<I, S>(role_id: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Utc::now();
        Self {
            role_id: role_id.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
            description: String::new(),
            created: now,
            last_modified: now,
        }
    }

    /// Add a description to the role
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Role as held in a resolver snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub role_id: String,
    pub scopes: ScopeSet,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Role {
    /// The scope pattern that assuming this role corresponds to
    pub fn assume_scope(&self) -> String {
        format!("{}{}", ASSUME_PREFIX, self.role_id)
    }
}

impl From<RoleRecord> for Role {
    fn from(record: RoleRecord) -> Self {
        Self {
            role_id: record.role_id,
            scopes: ScopeSet::from_scopes(record.scopes),
            created: record.created,
            last_modified: record.last_modified,
        }
    }
}

/// Client record; the source of a caller's scopes before role expansion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub client_id: String,

    pub scopes: Vec<String>,

    pub expires: DateTime<Utc>,
}

impl ClientRecord {
    pub fn new<I, S>(client_id: impl Into<String>, scopes: I, expires: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client_id: client_id.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
            expires,
        }
    }

    /// Returns true if the client has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Normalized raw scopes of the client
    pub fn scope_set(&self) -> ScopeSet {
        ScopeSet::from_scopes(self.scopes.iter().cloned())
    }

    /// Validate the client record
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(AuthzError::InvalidInput(
                "Client id cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
