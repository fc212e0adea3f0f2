//! Operation scope declarations
//!
//! Every operation the API layer exposes declares its scope requirement as a
//! template. Declarations are registered once at start-up; a malformed one is
//! a fatal configuration error.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{AuthzError, Result};
use crate::expression::{validate_declaration, Expression, Params, Template};

/// Concrete requirement for one call of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiatedScopes {
    /// Expression to evaluate against the caller's scopes
    pub expression: Expression,

    /// Parameters the template referenced but the call did not supply
    pub unresolved: Vec<String>,
}

impl InstantiatedScopes {
    /// True when every template parameter was supplied
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Registry of operation name to scope template
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Template>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation's scope declaration
    ///
    /// # Errors
    ///
    /// - `InvalidExpression` if the declaration is not an object or is
    ///   malformed ("Scope expressions must be objects" for strings and
    ///   arrays)
    /// - `DuplicateOperation` if the name is already registered
    pub fn register(&mut self, name: impl Into<String>, declaration: &Value) -> Result<()> {
        let name = name.into();

        validate_declaration(declaration).map_err(|e| match e {
            AuthzError::InvalidExpression(msg) => {
                AuthzError::InvalidExpression(format!("{} (operation '{}')", msg, name))
            }
            other => other,
        })?;

        if self.operations.contains_key(&name) {
            return Err(AuthzError::DuplicateOperation(name));
        }

        let template = Template::from_value(declaration)?;
        info!(operation = %name, "registered operation scopes");
        self.operations.insert(name, template);
        Ok(())
    }

    /// Register several declarations at once, failing on the first bad one
    pub fn register_all<'a, I>(&mut self, declarations: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        for (name, declaration) in declarations {
            self.register(name, declaration)?;
        }
        Ok(())
    }

    /// Template registered for `name`
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.operations.get(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Registered operation names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }

    /// Expand an operation's template for one call
    ///
    /// A template that expands to nothing (a false `if` at the root)
    /// requires nothing and yields an empty `AllOf`.
    ///
    /// # Errors
    ///
    /// - `UnknownOperation` if `name` was never registered
    /// - `Template` if a parameter has the wrong type
    pub fn instantiate(&self, name: &str, params: &Params) -> Result<InstantiatedScopes> {
        let template = self
            .operations
            .get(name)
            .ok_or_else(|| AuthzError::UnknownOperation(name.to_string()))?;

        let mut unresolved = Vec::new();
        let expression = template
            .expand(params, &mut unresolved)?
            .unwrap_or_else(|| Expression::AllOf(Vec::new()));

        if !unresolved.is_empty() {
            debug!(operation = name, ?unresolved, "operation scopes not fully specified");
        }

        Ok(InstantiatedScopes {
            expression,
            unresolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_instantiate() {
        let mut registry = OperationRegistry::new();
        registry
            .register(
                "createTask",
                &json!({"AllOf": ["queue:create-task:<taskQueueId>"]}),
            )
            .unwrap();

        let mut params = Params::new();
        params.insert("taskQueueId".to_string(), json!("proj/ci"));

        let scopes = registry.instantiate("createTask", &params).unwrap();
        assert!(scopes.is_complete());
        assert_eq!(
            scopes.expression,
            Expression::all_of([Expression::literal("queue:create-task:proj/ci")])
        );
    }

    #[test]
    fn test_declarations_must_be_objects() {
        let mut registry = OperationRegistry::new();

        for bad in [json!("test:unit"), json!(["test:unit"]), json!([[]])] {
            let err = registry.register("op", &bad).unwrap_err();
            assert!(err.to_string().starts_with("Scope expressions must be objects"));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_malformed_nested_declaration() {
        let mut registry = OperationRegistry::new();
        let err = registry
            .register("op", &json!({"AnyOf": [{"if": "x"}]}))
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidExpression(_)));
    }

    #[test]
    fn test_duplicate_operation() {
        let mut registry = OperationRegistry::new();
        let decl = json!({"AnyOf": ["something"]});
        registry.register("op", &decl).unwrap();
        assert!(matches!(
            registry.register("op", &decl),
            Err(AuthzError::DuplicateOperation(_))
        ));
    }

    #[test]
    fn test_unknown_operation() {
        let registry = OperationRegistry::new();
        assert!(matches!(
            registry.instantiate("nope", &Params::new()),
            Err(AuthzError::UnknownOperation(_))
        ));
    }

    #[test]
    fn test_root_if_false_requires_nothing() {
        let mut registry = OperationRegistry::new();
        registry
            .register("op", &json!({"if": "private", "then": {"AllOf": ["secret"]}}))
            .unwrap();

        let mut params = Params::new();
        params.insert("private".to_string(), json!(false));

        let scopes = registry.instantiate("op", &params).unwrap();
        assert_eq!(scopes.expression, Expression::AllOf(Vec::new()));
    }

    #[test]
    fn test_register_all_and_names() {
        let a = json!({"AnyOf": ["a"]});
        let b = json!({"AllOf": ["b"]});
        let mut registry = OperationRegistry::new();
        registry.register_all([("b", &b), ("a", &a)]).unwrap();
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
        assert!(registry.get("a").is_some());
    }
}
