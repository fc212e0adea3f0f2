//! Scope expression tree

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::error::{AuthzError, Result};

/// Boolean requirement over scopes
///
/// On the wire a bare string is a [`Expression::Literal`]; the other variants
/// are single-key objects, `{"AnyOf": [...]}` and `{"AllOf": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// Satisfied when a granted scope covers this scope
    Literal(String),
    /// Satisfied when at least one child is; never satisfied when empty
    AnyOf(Vec<Expression>),
    /// Satisfied when every child is; always satisfied when empty
    AllOf(Vec<Expression>),
}

impl Expression {
    pub fn literal(scope: impl Into<String>) -> Self {
        Self::Literal(scope.into())
    }

    pub fn any_of<I: IntoIterator<Item = Expression>>(children: I) -> Self {
        Self::AnyOf(children.into_iter().collect())
    }

    pub fn all_of<I: IntoIterator<Item = Expression>>(children: I) -> Self {
        Self::AllOf(children.into_iter().collect())
    }

    /// Parses an expression from its JSON form
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::Literal(s.clone())),
            Value::Object(map) if map.len() == 1 => {
                let (key, inner) = map.iter().next().ok_or_else(|| {
                    AuthzError::InvalidExpression("empty expression object".to_string())
                })?;
                let children = match inner {
                    Value::Array(items) => items
                        .iter()
                        .map(Self::from_value)
                        .collect::<Result<Vec<_>>>()?,
                    _ => {
                        return Err(AuthzError::InvalidExpression(format!(
                            "{} must hold an array of expressions",
                            key
                        )))
                    }
                };
                match key.as_str() {
                    "AnyOf" => Ok(Self::AnyOf(children)),
                    "AllOf" => Ok(Self::AllOf(children)),
                    other => Err(AuthzError::InvalidExpression(format!(
                        "unknown expression key: {}",
                        other
                    ))),
                }
            }
            Value::Object(_) => Err(AuthzError::InvalidExpression(
                "expression objects must have exactly one of AnyOf or AllOf".to_string(),
            )),
            Value::Array(_) => Err(AuthzError::InvalidExpression(
                "Scope expressions must be objects".to_string(),
            )),
            other => Err(AuthzError::InvalidExpression(format!(
                "invalid expression: {}",
                other
            ))),
        }
    }

    /// Renders the expression in its JSON form
    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(s) => Value::String(s.clone()),
            Self::AnyOf(children) => {
                json!({ "AnyOf": children.iter().map(Self::to_value).collect::<Vec<_>>() })
            }
            Self::AllOf(children) => {
                json!({ "AllOf": children.iter().map(Self::to_value).collect::<Vec<_>>() })
            }
        }
    }

    /// Collects every literal scope mentioned in the tree, in order
    pub fn literals(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_literals(&mut out);
        out
    }

    fn collect_literals<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(s) => out.push(s),
            Self::AnyOf(children) | Self::AllOf(children) => {
                for child in children {
                    child.collect_literals(out);
                }
            }
        }
    }
}

impl From<&str> for Expression {
    fn from(scope: &str) -> Self {
        Self::Literal(scope.to_string())
    }
}

impl From<String> for Expression {
    fn from(scope: String) -> Self {
        Self::Literal(scope)
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Human-readable form used in denial messages
///
/// `AllOf` renders as ` and `, `AnyOf` as ` or `, nested groups parenthesized.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn group(
            f: &mut fmt::Formatter<'_>,
            children: &[Expression],
            sep: &str,
            empty: &str,
        ) -> fmt::Result {
            if children.is_empty() {
                return write!(f, "{}", empty);
            }
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, "{}", sep)?;
                }
                match child {
                    Expression::Literal(s) => write!(f, "{}", s)?,
                    nested => write!(f, "({})", nested)?,
                }
            }
            Ok(())
        }

        match self {
            Self::Literal(s) => write!(f, "{}", s),
            Self::AnyOf(children) => group(f, children, " or ", "<nothing>"),
            Self::AllOf(children) => group(f, children, " and ", "<anything>"),
        }
    }
}
