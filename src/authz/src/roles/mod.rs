//! Role-based transitive scope expansion
//!
//! Holding a scope that overlaps `assume:<roleId>` grants the role's own
//! scopes, which may in turn grant further roles. The closure of a caller's
//! scopes is the fixed point of that process.
//!
//! # Features
//!
//! - **Wildcard role ids**: a role id ending in `*` is matched like any
//!   other scope pattern
//! - **Cycle tolerance**: mutually granting roles converge, the closure
//!   simply stops growing
//! - **Snapshot swap**: role table updates never block readers
//! - **Closure cache**: keyed by snapshot version, cleared on every swap

pub mod resolver;
pub mod snapshot;
pub mod types;

#[cfg(test)]
mod tests;

pub use resolver::{expand_scopes, grants_role, CacheStats, RoleResolver};
pub use snapshot::RoleSnapshot;
pub use types::{ClientRecord, Role, RoleRecord, ASSUME_PREFIX};
