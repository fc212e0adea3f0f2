//! # Taskauth Scope Authorization
//!
//! Scope-based authorization core for a task-execution platform.
//!
//! ## Features
//!
//! - **Scope patterns**: literal scopes and `*`-suffixed prefix patterns with
//!   `matches` and `overlap`
//! - **Normalized scope sets** with `union` and `intersection`
//! - **Scope expressions** (`AnyOf`/`AllOf` trees) with `satisfies` and a
//!   minimal "what's missing" explainer
//! - **Templates** with `<param>` substitution, `if` and `for`
//! - **Role expansion** through `assume:<roleId>` grants, computed as a
//!   bounded fixed point over an atomically swapped role snapshot
//!
//! ## Example
//!
//! ```rust
//! use taskauth_authz::expression::{explain_deficit, satisfies, Expression};
//! use taskauth_authz::roles::{RoleRecord, RoleResolver};
//! use taskauth_authz::scope::ScopeSet;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = RoleResolver::new();
//! resolver.replace_roles(vec![RoleRecord::new("ci", ["queue:create-task:proj/*"])])?;
//!
//! let granted = resolver.resolve(&ScopeSet::from_scopes(["assume:ci"]))?;
//! let required = Expression::all_of([
//!     Expression::literal("queue:create-task:proj/build"),
//!     Expression::literal("queue:route:index.proj"),
//! ]);
//!
//! assert!(!satisfies(&granted, &required));
//! assert_eq!(
//!     explain_deficit(&granted, &required),
//!     Some(Expression::literal("queue:route:index.proj"))
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod expression;
pub mod roles;
pub mod scope;
pub mod store;

// Re-export commonly used types
pub use config::{CacheConfig, EngineConfig};
pub use engine::{AuthDecision, DecisionReason, OperationRegistry, ScopeEngine};
pub use error::{AuthzError, Result};
pub use events::{spawn_listener, ChangeEvent};
pub use expression::{explain_deficit, satisfies, validate, Expression, Template};
pub use roles::{ClientRecord, RoleRecord, RoleResolver};
pub use scope::{matches, overlap, ScopeSet};
pub use store::{InMemoryScopeStore, ScopeStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
