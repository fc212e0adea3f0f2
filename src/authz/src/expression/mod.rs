//! Boolean scope expressions and their templates
//!
//! - [`Expression`]: `AnyOf` / `AllOf` / literal tree evaluated against a
//!   [`ScopeSet`](crate::scope::ScopeSet)
//! - [`Template`]: expression extended with `if` / `for` nodes and `<param>`
//!   placeholders, expanded once when an operation is declared
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use taskauth_authz::expression::{explain_deficit, satisfies, Expression};
//! use taskauth_authz::scope::ScopeSet;
//!
//! let expr = Expression::from_value(&json!({"AllOf": ["queue:create-task", "queue:route:a"]})).unwrap();
//! let granted = ScopeSet::from_scopes(["queue:create-task"]);
//!
//! assert!(!satisfies(&granted, &expr));
//! assert_eq!(explain_deficit(&granted, &expr), Some(Expression::literal("queue:route:a")));
//! ```

pub mod evaluator;
pub mod template;
pub mod types;
pub mod validate;


pub use evaluator::{explain_deficit, satisfies};
pub use template::{expand, Params, Template};
pub use types::Expression;
pub use validate::{validate, validate_declaration};
