//! Scope authorization engine
//!
//! Ties together role expansion, the client table, operation declarations
//! and expression evaluation.
//!
//! ```text
//! client/raw scopes → RoleResolver (closure) ─┐
//!                                             ├→ satisfies / explain_deficit → AuthDecision
//! operation + params → OperationRegistry ─────┘
//! ```

pub mod decision;
pub mod metrics;
pub mod registry;

pub use decision::{AuthDecision, DecisionReason};
pub use metrics::{EngineMetrics, MetricsCollector};
pub use registry::{InstantiatedScopes, OperationRegistry};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{AuthzError, Result};
use crate::expression::{explain_deficit, satisfies, Expression, Params};
use crate::roles::{CacheStats, ClientRecord, RoleResolver};
use crate::scope::ScopeSet;
use crate::store::ScopeStore;

/// Client table snapshot, swapped wholesale like the role table
type ClientTable = Arc<HashMap<String, ClientRecord>>;

/// Main scope engine
///
/// All methods take `&self`; share it behind an `Arc` between request
/// handlers and the change listener.
pub struct ScopeEngine {
    /// Role expansion with closure caching
    resolver: RoleResolver,

    /// Current client table
    clients: RwLock<ClientTable>,

    /// Operation scope declarations
    registry: OperationRegistry,

    /// Role and client source
    store: Arc<dyn ScopeStore>,

    /// Decision counters
    metrics: Option<MetricsCollector>,

    config: EngineConfig,
}

impl ScopeEngine {
    /// Create an engine and load the initial role and client snapshots
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read or its records are inconsistent.
    /// Nothing is served from a partially loaded engine.
    pub async fn new(
        config: EngineConfig,
        store: Arc<dyn ScopeStore>,
        registry: OperationRegistry,
    ) -> Result<Self> {
        let metrics = config.enable_metrics.then(MetricsCollector::new);

        let engine = Self {
            resolver: RoleResolver::with_cache_config(config.closure_cache.clone()),
            clients: RwLock::new(Arc::new(HashMap::new())),
            registry,
            store,
            metrics,
            config,
        };

        engine.refresh().await?;

        info!(
            operations = engine.registry.len(),
            cache = engine.config.closure_cache.enabled,
            metrics = engine.config.enable_metrics,
            "ScopeEngine initialized"
        );

        Ok(engine)
    }

    /// Reload both roles and clients from the store
    pub async fn refresh(&self) -> Result<()> {
        self.refresh_roles().await?;
        self.refresh_clients().await?;
        Ok(())
    }

    /// Reload the role table and swap in a new snapshot
    ///
    /// Returns the version in effect afterwards.
    pub async fn refresh_roles(&self) -> Result<u64> {
        let records = self.store.list_roles().await?;
        let version = self.resolver.replace_roles(records)?;
        self.record_swap();
        Ok(version)
    }

    /// Reload the client table and swap it in
    ///
    /// Returns the number of clients loaded.
    pub async fn refresh_clients(&self) -> Result<usize> {
        let records = self.store.list_clients().await?;

        let mut table = HashMap::with_capacity(records.len());
        for client in records {
            client.validate()?;
            table.insert(client.client_id.clone(), client);
        }
        let count = table.len();

        *self.clients.write() = Arc::new(table);
        self.record_swap();
        info!(clients = count, "installed client snapshot");
        Ok(count)
    }

    /// Closure of `raw` under the current role snapshot
    pub fn expand(&self, raw: &ScopeSet) -> Result<ScopeSet> {
        self.resolver.resolve(raw)
    }

    /// Checks raw caller scopes against a concrete requirement
    ///
    /// # Errors
    ///
    /// Only if role expansion fails; evaluation itself cannot fail.
    pub fn authorize_scopes(&self, raw: &ScopeSet, required: &Expression) -> Result<AuthDecision> {
        let snapshot = self.resolver.snapshot();
        let version = snapshot.version();

        let granted = match self.resolver.resolve_in(&snapshot, raw) {
            Ok(granted) => granted,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_error();
                }
                return Err(e);
            }
        };

        let decision = if satisfies(&granted, required) {
            debug!(%required, "scopes satisfied");
            AuthDecision::allow(version)
        } else {
            let residual = explain_deficit(&granted, required).unwrap_or_else(|| required.clone());
            warn!(missing = %residual, "insufficient scopes");
            AuthDecision::deny(residual, DecisionReason::InsufficientScopes, version)
        };

        self.record_decision(&decision);
        Ok(decision)
    }

    /// Checks raw caller scopes against a registered operation
    ///
    /// Unsupplied template parameters are reported on the decision; their
    /// placeholders stay in the evaluated expression.
    pub fn authorize_operation(
        &self,
        raw: &ScopeSet,
        operation: &str,
        params: &Params,
    ) -> Result<AuthDecision> {
        let instantiated = self.registry.instantiate(operation, params)?;
        let decision = self.authorize_scopes(raw, &instantiated.expression)?;
        Ok(decision.with_unresolved(instantiated.unresolved))
    }

    /// Checks a known client's scopes against a requirement at time `now`
    ///
    /// # Errors
    ///
    /// `ClientNotFound` if the client is not in the current snapshot.
    pub fn authorize_client(
        &self,
        client_id: &str,
        required: &Expression,
        now: DateTime<Utc>,
    ) -> Result<AuthDecision> {
        let client = self
            .client(client_id)
            .ok_or_else(|| AuthzError::ClientNotFound(client_id.to_string()))?;

        if client.is_expired(now) {
            warn!(client_id, expires = %client.expires, "client has expired");
            let decision = AuthDecision::deny(
                required.clone(),
                DecisionReason::ClientExpired,
                self.resolver.snapshot().version(),
            );
            self.record_decision(&decision);
            return Ok(decision);
        }

        self.authorize_scopes(&client.scope_set(), required)
    }

    /// Client record from the current snapshot
    pub fn client(&self, client_id: &str) -> Option<ClientRecord> {
        let table = Arc::clone(&self.clients.read());
        table.get(client_id).cloned()
    }

    /// Role resolver shared with this engine
    pub fn resolver(&self) -> &RoleResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Get engine metrics, including closure cache counters
    pub fn metrics(&self) -> Option<EngineMetrics> {
        let stats = self.resolver.cache_stats();
        self.metrics.as_ref().map(|m| {
            let mut metrics = m.get_metrics();
            metrics.closure_cache_hits = stats.hits as u64;
            metrics.closure_cache_misses = stats.misses as u64;
            metrics
        })
    }

    /// Get closure cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.cache_stats()
    }

    fn record_decision(&self, decision: &AuthDecision) {
        if let Some(metrics) = &self.metrics {
            metrics.record_decision(decision.allowed);
        }
    }

    fn record_swap(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_swap();
        }
    }
}
