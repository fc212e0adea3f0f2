//! Immutable role table snapshots

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::types::{Role, RoleRecord};
use crate::error::{AuthzError, Result};

/// A complete, internally consistent view of the role table
///
/// Snapshots are never mutated after construction. Updates build a new
/// snapshot with a higher version and swap it in wholesale.
#[derive(Debug, Clone)]
pub struct RoleSnapshot {
    version: u64,
    roles: Vec<Role>,
    built_at: DateTime<Utc>,
}

impl RoleSnapshot {
    /// Empty snapshot at version 0
    pub fn empty() -> Self {
        Self {
            version: 0,
            roles: Vec::new(),
            built_at: Utc::now(),
        }
    }

    /// Builds a snapshot from store records
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a role id appears twice.
    pub fn from_records(version: u64, records: Vec<RoleRecord>) -> Result<Self> {
        {
            let mut seen = HashSet::with_capacity(records.len());
            for record in &records {
                if !seen.insert(record.role_id.as_str()) {
                    return Err(AuthzError::InvalidInput(format!(
                        "Duplicate role: {}",
                        record.role_id
                    )));
                }
            }
        }

        let mut roles: Vec<Role> = records.into_iter().map(Role::from).collect();
        roles.sort_by(|a, b| a.role_id.cmp(&b.role_id));

        Ok(Self {
            version,
            roles,
            built_at: Utc::now(),
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Roles sorted by id
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Looks up a role by its exact id
    pub fn get(&self, role_id: &str) -> Option<&Role> {
        self.roles
            .binary_search_by(|r| r.role_id.as_str().cmp(role_id))
            .ok()
            .map(|i| &self.roles[i])
    }
}

impl Default for RoleSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
