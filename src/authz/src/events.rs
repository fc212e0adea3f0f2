//! Role and client change notifications
//!
//! The role store publishes an event whenever a role or client is created,
//! updated or deleted. The listener reloads the affected table off the request
//! path and swaps a complete snapshot in; events carry no payload beyond the
//! id, so ordering between them does not matter.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::engine::ScopeEngine;

/// Change notification from the role store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeEvent {
    #[serde(rename_all = "camelCase")]
    RoleCreated { role_id: String },
    #[serde(rename_all = "camelCase")]
    RoleUpdated { role_id: String },
    #[serde(rename_all = "camelCase")]
    RoleDeleted { role_id: String },
    #[serde(rename_all = "camelCase")]
    ClientCreated { client_id: String },
    #[serde(rename_all = "camelCase")]
    ClientUpdated { client_id: String },
    #[serde(rename_all = "camelCase")]
    ClientDeleted { client_id: String },
}

impl ChangeEvent {
    /// True for role events, false for client events
    pub fn is_role_event(&self) -> bool {
        matches!(
            self,
            Self::RoleCreated { .. } | Self::RoleUpdated { .. } | Self::RoleDeleted { .. }
        )
    }
}

/// Tables a batch of events requires reloading
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Pending {
    roles: bool,
    clients: bool,
}

impl Pending {
    fn add(&mut self, event: &ChangeEvent) {
        if event.is_role_event() {
            self.roles = true;
        } else {
            self.clients = true;
        }
    }
}

/// Spawns the background task that keeps `engine` in sync with the store
///
/// Events already queued when a reload starts are coalesced into it. A failed
/// reload keeps the previous snapshot and is retried on the next event. The
/// task ends once every sender is dropped.
pub fn spawn_listener(
    engine: Arc<ScopeEngine>,
    mut events: mpsc::Receiver<ChangeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("scope change listener started");

        while let Some(first) = events.recv().await {
            let mut pending = Pending::default();
            pending.add(&first);

            let mut coalesced = 0usize;
            while let Ok(event) = events.try_recv() {
                pending.add(&event);
                coalesced += 1;
            }
            debug!(?first, coalesced, "processing change events");

            if pending.roles {
                if let Err(e) = engine.refresh_roles().await {
                    error!(error = %e, "failed to reload roles");
                }
            }
            if pending.clients {
                if let Err(e) = engine.refresh_clients().await {
                    error!(error = %e, "failed to reload clients");
                }
            }
        }

        info!("scope change listener stopped");
    })
}
