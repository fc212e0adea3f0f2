//! Scope-pattern set algebra
//!
//! Scopes are plain strings. A trailing `*` turns a scope into a prefix
//! pattern; everything else is a literal.
//!
//! # Examples
//!
//! ```
//! use taskauth_authz::scope::{overlap, ScopeSet};
//!
//! let granted = ScopeSet::from_scopes(["queue:*", "queue:create-task:aws"]);
//! assert_eq!(granted.as_slice(), ["queue:*"]);
//!
//! assert!(granted.covers("queue:create-task:gcp"));
//! assert!(overlap("queue:*", "queue:create-*"));
//! ```

mod pattern;
mod set;


pub use pattern::{is_pattern, matches, overlap, WILDCARD};
pub use set::{intersection, normalize, union, ScopeSet};

/// A single scope string
pub type Scope = String;
