//! Role and client storage interface
//!
//! Persistence lives outside this crate. The engine only needs to list the
//! full role and client tables when it rebuilds a snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{AuthzError, Result};
use crate::roles::{ClientRecord, RoleRecord};

/// Source of role and client records
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Every role record
    async fn list_roles(&self) -> Result<Vec<RoleRecord>>;

    /// Every client record
    async fn list_clients(&self) -> Result<Vec<ClientRecord>>;
}

/// In-memory store, used by tests and tooling
#[derive(Debug, Clone, Default)]
pub struct InMemoryScopeStore {
    roles: Arc<RwLock<HashMap<String, RoleRecord>>>,
    clients: Arc<RwLock<HashMap<String, ClientRecord>>>,
}

impl InMemoryScopeStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a role, keeping its original creation time
    pub async fn put_role(&self, mut role: RoleRecord) -> Result<()> {
        if role.role_id.is_empty() {
            return Err(AuthzError::InvalidInput("Role id cannot be empty".to_string()));
        }

        let mut roles = self.roles.write().await;
        if let Some(existing) = roles.get(&role.role_id) {
            role.created = existing.created;
            role.last_modified = Utc::now();
        }
        roles.insert(role.role_id.clone(), role);
        Ok(())
    }

    /// Remove a role; returns true if it existed
    pub async fn delete_role(&self, role_id: &str) -> bool {
        self.roles.write().await.remove(role_id).is_some()
    }

    /// Insert or replace a client
    pub async fn put_client(&self, client: ClientRecord) -> Result<()> {
        client.validate()?;
        self.clients
            .write()
            .await
            .insert(client.client_id.clone(), client);
        Ok(())
    }

    /// Remove a client; returns true if it existed
    pub async fn delete_client(&self, client_id: &str) -> bool {
        self.clients.write().await.remove(client_id).is_some()
    }
}

#[async_trait]
impl ScopeStore for InMemoryScopeStore {
    async fn list_roles(&self) -> Result<Vec<RoleRecord>> {
        let roles = self.roles.read().await;
        Ok(roles.values().cloned().collect())
    }

    async fn list_clients(&self) -> Result<Vec<ClientRecord>> {
        let clients = self.clients.read().await;
        Ok(clients.values().cloned().collect())
    }
}
