//! Role resolver with snapshot swapping and closure caching
//!
//! This module provides the `RoleResolver` for expanding a caller's raw
//! scopes through role grants. It uses:
//!
//! - **Fixed-point closure**: `assume:<roleId>` scopes unlock role scopes
//!   until nothing changes, bounded by `|roles| + 1` iterations
//! - **Snapshot swap**: readers clone an `Arc` to a complete role table;
//!   writers build a new table off to the side and swap the pointer
//! - **DashMap**: for thread-safe closure caching keyed by snapshot version
//!
//! # Example
//!
//! ```rust
//! use taskauth_authz::roles::{RoleRecord, RoleResolver};
//! use taskauth_authz::scope::ScopeSet;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = RoleResolver::new();
//! resolver.replace_roles(vec![
//!     RoleRecord::new("worker", ["queue:claim-work:*", "assume:logger"]),
//!     RoleRecord::new("logger", ["logs:write:*"]),
//! ])?;
//!
//! let closure = resolver.resolve(&ScopeSet::from_scopes(["assume:worker"]))?;
//! assert!(closure.covers("logs:write:app"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::snapshot::RoleSnapshot;
use super::types::{Role, RoleRecord, ASSUME_PREFIX};
use crate::config::CacheConfig;
use crate::error::{AuthzError, Result};
use crate::scope::{overlap, ScopeSet};

/// Checks whether `scope` lets its holder assume `role_id`
///
/// # Examples
///
/// ```
/// use taskauth_authz::roles::grants_role;
///
/// assert!(grants_role("assume:*", "client-id:queue"));
/// assert!(grants_role("as*", "anything"));
/// assert!(!grants_role("queue:*", "task-run-id:*"));
/// assert!(!grants_role("assume:ab*", "ac*"));
/// ```
pub fn grants_role(scope: &str, role_id: &str) -> bool {
    let mut assume = String::with_capacity(ASSUME_PREFIX.len() + role_id.len());
    assume.push_str(ASSUME_PREFIX);
    assume.push_str(role_id);
    overlap(scope, &assume)
}

/// Computes the transitive closure of `initial` over `roles`
///
/// # Errors
///
/// Returns `RoleClosure` if no fixed point is reached within `|roles| + 1`
/// iterations. A consistent role table cannot need more, since every
/// productive iteration activates at least one new role.
pub fn expand_scopes(initial: &ScopeSet, roles: &[Role]) -> Result<ScopeSet> {
    let bound = roles.len() + 1;
    let mut current = initial.clone();

    for iteration in 1..=bound {
        let granted: Vec<&Role> = roles
            .iter()
            .filter(|role| current.iter().any(|scope| grants_role(scope, &role.role_id)))
            .collect();

        let mut next = current.clone();
        for role in &granted {
            next = next.union(&role.scopes);
        }

        if next == current {
            debug!(
                iterations = iteration,
                active_roles = granted.len(),
                scopes = current.len(),
                "role closure reached fixed point"
            );
            return Ok(current);
        }
        current = next;
    }

    error!(roles = roles.len(), "role closure exceeded iteration bound");
    Err(AuthzError::RoleClosure(format!(
        "no fixed point after {} iterations over {} roles",
        bound,
        roles.len()
    )))
}

/// Cache key: snapshot version plus a BLAKE3 digest of the input scopes
type CacheKey = (u64, [u8; 32]);

/// Cached closure with its insertion time
#[derive(Debug, Clone)]
struct CachedClosure {
    scopes: ScopeSet,
    cached_at: Instant,
}

impl CachedClosure {
    fn new(scopes: ScopeSet) -> Self {
        Self {
            scopes,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: std::time::Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// Resolves caller scopes through the current role table
///
/// # Thread Safety
///
/// The resolver is cheap to clone and all clones share state. Snapshots are
/// built outside the lock; readers and the writer share a `parking_lot`
/// lock only for the `Arc` clone or the pointer swap itself. A resolution
/// that started on an older snapshot finishes on it.
#[derive(Clone)]
pub struct RoleResolver {
    /// Current role table
    snapshot: Arc<RwLock<Arc<RoleSnapshot>>>,

    /// Version counter for new snapshots
    next_version: Arc<AtomicU64>,

    /// Closures keyed by (snapshot version, input digest)
    cache: Arc<DashMap<CacheKey, CachedClosure>>,

    /// Hit/miss counters
    stats: Arc<DashMap<&'static str, usize>>,

    config: CacheConfig,
}

impl RoleResolver {
    /// Create a resolver over an empty role table with default cache settings
    pub fn new() -> Self {
        Self::with_cache_config(CacheConfig::default())
    }

    /// Create a resolver with custom cache settings
    pub fn with_cache_config(config: CacheConfig) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Arc::new(RoleSnapshot::empty()))),
            next_version: Arc::new(AtomicU64::new(1)),
            cache: Arc::new(DashMap::new()),
            stats: Arc::new(DashMap::new()),
            config,
        }
    }

    /// The snapshot currently in effect
    pub fn snapshot(&self) -> Arc<RoleSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Builds a new snapshot from `records` and swaps it in
    ///
    /// Returns the version of the installed snapshot. If a concurrent writer
    /// already installed a newer one, that one is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the records are inconsistent; the current
    /// snapshot stays in effect.
    pub fn replace_roles(&self, records: Vec<RoleRecord>) -> Result<u64> {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let snapshot = Arc::new(RoleSnapshot::from_records(version, records)?);
        let roles = snapshot.len();

        {
            let mut current = self.snapshot.write();
            if current.version() > version {
                debug!(version, current = current.version(), "discarding stale role snapshot");
                return Ok(current.version());
            }
            *current = snapshot;
        }

        self.invalidate_cache();
        info!(version, roles, "installed role snapshot");
        Ok(version)
    }

    /// Expands `scopes` through the current snapshot
    ///
    /// # Errors
    ///
    /// Returns `RoleClosure` if the role table does not converge.
    pub fn resolve(&self, scopes: &ScopeSet) -> Result<ScopeSet> {
        self.resolve_in(&self.snapshot(), scopes)
    }

    /// Expands `scopes` through a snapshot the caller already holds
    ///
    /// Lets a caller report the exact snapshot version a result was
    /// computed against.
    pub fn resolve_in(&self, snapshot: &RoleSnapshot, scopes: &ScopeSet) -> Result<ScopeSet> {
        if !self.config.enabled {
            return expand_scopes(scopes, snapshot.roles());
        }

        let version = snapshot.version();
        let key = (version, digest(scopes));

        if let Some(cached) = self.cache.get(&key) {
            if !cached.is_expired(self.config.ttl) {
                self.increment_stat("hits");
                return Ok(cached.scopes.clone());
            }
            drop(cached);
            self.cache.remove(&key);
            self.increment_stat("expirations");
        }
        self.increment_stat("misses");

        let closure = expand_scopes(scopes, snapshot.roles())?;
        self.cache_closure(key, &closure);

        Ok(closure)
    }

    /// Role ids whose `assume:` scope is covered or overlapped by `scopes`
    ///
    /// Useful for operational tooling; the closure itself does not need it.
    pub fn granted_roles(&self, scopes: &ScopeSet) -> Vec<String> {
        self.snapshot()
            .roles()
            .iter()
            .filter(|role| scopes.iter().any(|s| grants_role(s, &role.role_id)))
            .map(|role| role.role_id.clone())
            .collect()
    }

    /// Drops every cached closure
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        let stat = |name: &str| self.stats.get(name).map(|v| *v).unwrap_or(0);
        CacheStats {
            size: self.cache.len(),
            max_size: self.config.capacity,
            ttl_seconds: self.config.ttl.as_secs(),
            hits: stat("hits"),
            misses: stat("misses"),
            expirations: stat("expirations"),
            evictions: stat("evictions"),
        }
    }

    fn cache_closure(&self, key: CacheKey, closure: &ScopeSet) {
        let current = self.snapshot.read().version();
        if key.0 != current {
            // computed on a snapshot that has since been replaced
            return;
        }

        if self.cache.len() >= self.config.capacity {
            self.evict_stale(current);
        }
        if self.cache.len() < self.config.capacity {
            self.cache.insert(key, CachedClosure::new(closure.clone()));
        }
    }

    /// Drops expired entries and entries of replaced snapshots
    fn evict_stale(&self, current: u64) {
        let ttl = self.config.ttl;
        let before = self.cache.len();
        self.cache
            .retain(|(version, _), cached| *version == current && !cached.is_expired(ttl));

        let evicted = before.saturating_sub(self.cache.len());
        if evicted > 0 {
            *self.stats.entry("evictions").or_insert(0) += evicted;
            debug!(evicted, remaining = self.cache.len(), "evicted stale closures");
        }
    }

    fn increment_stat(&self, name: &'static str) {
        *self.stats.entry(name).or_insert(0) += 1;
    }
}

impl Default for RoleResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn digest(scopes: &ScopeSet) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for scope in scopes.iter() {
        hasher.update(&(scope.len() as u64).to_le_bytes());
        hasher.update(scope.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Current cache size
    pub size: usize,
    /// Maximum cache size
    pub max_size: usize,
    /// Cache TTL in seconds
    pub ttl_seconds: u64,
    pub hits: usize,
    pub misses: usize,
    pub expirations: usize,
    /// Entries dropped to make room
    pub evictions: usize,
}

impl CacheStats {
    /// Calculates the cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
