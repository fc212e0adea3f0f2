//! Parameterized expression templates
//!
//! A template is an expression tree that may also contain `if` and `for`
//! nodes and `<name>` placeholders inside literal strings. Operations declare
//! their scope requirement as a template; it is expanded against a parameter
//! map into a plain [`Expression`].

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::types::Expression;
use super::validate::validate;
use crate::error::{AuthzError, Result};

/// Template parameters, keyed by name
pub type Params = HashMap<String, Value>;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"<([^<>]+)>").expect("placeholder regex is valid"))
}

/// Expression template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    /// Literal scope, possibly containing `<name>` placeholders
    Literal(String),
    AnyOf(Vec<Template>),
    AllOf(Vec<Template>),
    /// Includes `then` only when the boolean parameter `param` is true
    If { param: String, then: Box<Template> },
    /// One literal per element of the array parameter `over`, with `<var>`
    /// bound to the element inside `each`
    For {
        var: String,
        over: String,
        each: String,
    },
}

impl Template {
    /// Parses a template from its JSON form
    ///
    /// # Errors
    ///
    /// Returns `InvalidExpression` if the value is not well-formed.
    pub fn from_value(value: &Value) -> Result<Self> {
        if let Value::Array(_) = value {
            return Err(AuthzError::InvalidExpression(
                "Scope expressions must be objects".to_string(),
            ));
        }
        if !validate(value) {
            return Err(AuthzError::InvalidExpression(format!(
                "Invalid scope expression template: {}",
                value
            )));
        }
        Ok(Self::from_valid(value))
    }

    // Only called on values that passed `validate`
    fn from_valid(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let children = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_array)
                .map(|items| items.iter().map(Self::from_valid).collect::<Vec<_>>())
                .unwrap_or_default()
        };

        match value {
            Value::String(s) => Self::Literal(s.clone()),
            _ if value.get("if").is_some() => Self::If {
                param: text("if"),
                then: Box::new(value.get("then").map(Self::from_valid).unwrap_or_else(|| {
                    Self::AllOf(Vec::new())
                })),
            },
            _ if value.get("for").is_some() => Self::For {
                var: text("for"),
                over: text("in"),
                each: text("each"),
            },
            _ if value.get("AnyOf").is_some() => Self::AnyOf(children("AnyOf")),
            _ => Self::AllOf(children("AllOf")),
        }
    }

    /// Expands the template against `params`
    ///
    /// Missing parameters are appended to `missing` rather than failing:
    /// `<name>` for literal placeholders and `if` conditions, the bare array
    /// name for `for` loops. Unresolved placeholders stay in the output.
    /// Returns `Ok(None)` when the whole template contributes nothing, e.g.
    /// a false `if` at the root.
    ///
    /// A `for` node at the root expands to an `AllOf` of its literals.
    ///
    /// # Errors
    ///
    /// Returns a `Template` error when a parameter is present with the wrong
    /// type: a non-boolean `if` condition, a non-string substitution, or a
    /// non-string `for` element.
    pub fn expand(&self, params: &Params, missing: &mut Vec<String>) -> Result<Option<Expression>> {
        let scope = Bindings::root(params);
        match self {
            Self::If { param, then } => {
                if scope.condition(param, missing)? {
                    then.expand(params, missing)
                } else {
                    Ok(None)
                }
            }
            Self::For { .. } => {
                let mut out = Vec::new();
                self.expand_into(&scope, missing, &mut out)?;
                if out.is_empty() && !scope.has_array(self) {
                    return Ok(None);
                }
                Ok(Some(Expression::AllOf(out)))
            }
            _ => {
                let mut out = Vec::with_capacity(1);
                self.expand_into(&scope, missing, &mut out)?;
                Ok(out.pop())
            }
        }
    }

    fn expand_into(
        &self,
        scope: &Bindings<'_>,
        missing: &mut Vec<String>,
        out: &mut Vec<Expression>,
    ) -> Result<()> {
        match self {
            Self::Literal(text) => {
                out.push(Expression::Literal(scope.substitute(text, missing)?));
            }
            Self::AnyOf(children) => {
                let mut expanded = Vec::with_capacity(children.len());
                for child in children {
                    child.expand_into(scope, missing, &mut expanded)?;
                }
                out.push(Expression::AnyOf(expanded));
            }
            Self::AllOf(children) => {
                let mut expanded = Vec::with_capacity(children.len());
                for child in children {
                    child.expand_into(scope, missing, &mut expanded)?;
                }
                out.push(Expression::AllOf(expanded));
            }
            Self::If { param, then } => {
                if scope.condition(param, missing)? {
                    then.expand_into(scope, missing, out)?;
                }
            }
            Self::For { var, over, each } => {
                let Some(items) = scope.array(over) else {
                    record(missing, over.clone());
                    return Ok(());
                };
                for item in items {
                    let Value::String(element) = item else {
                        return Err(AuthzError::Template(format!(
                            "elements of '{}' must be strings, got {}",
                            over, item
                        )));
                    };
                    let inner = scope.bind(var, element);
                    out.push(Expression::Literal(inner.substitute(each, missing)?));
                }
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Free-function form of [`Template::expand`] over a JSON template
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use taskauth_authz::expression::{expand, Expression, Params};
///
/// let mut params = Params::new();
/// params.insert("bar".to_string(), json!(["aaa", "bbb"]));
///
/// let mut missing = Vec::new();
/// let expr = expand(
///     &json!({"AnyOf": [{"for": "foo", "in": "bar", "each": "aa:<foo>"}]}),
///     &params,
///     &mut missing,
/// )
/// .unwrap();
///
/// assert_eq!(
///     expr,
///     Some(Expression::any_of([
///         Expression::literal("aa:aaa"),
///         Expression::literal("aa:bbb"),
///     ]))
/// );
/// assert!(missing.is_empty());
/// ```
pub fn expand(template: &Value, params: &Params, missing: &mut Vec<String>) -> Result<Option<Expression>> {
    Template::from_value(template)?.expand(params, missing)
}

fn record(missing: &mut Vec<String>, name: String) {
    if !missing.contains(&name) {
        missing.push(name);
    }
}

/// Parameter lookup with an optional loop variable layered on top
struct Bindings<'a> {
    params: &'a Params,
    local: Option<(&'a str, &'a str)>,
}

impl<'a> Bindings<'a> {
    fn root(params: &'a Params) -> Self {
        Self { params, local: None }
    }

    fn bind(&self, var: &'a str, value: &'a str) -> Self {
        Self {
            params: self.params,
            local: Some((var, value)),
        }
    }

    fn has_array(&self, template: &Template) -> bool {
        match template {
            Template::For { over, .. } => self.array(over).is_some(),
            _ => false,
        }
    }

    fn array(&self, name: &str) -> Option<&'a Vec<Value>> {
        self.params.get(name).and_then(Value::as_array)
    }

    fn condition(&self, param: &str, missing: &mut Vec<String>) -> Result<bool> {
        match self.params.get(param) {
            None => {
                record(missing, format!("<{}>", param));
                Ok(false)
            }
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(other) => Err(AuthzError::Template(format!(
                "parameter '{}' used in if must be a boolean, got {}",
                param, other
            ))),
        }
    }

    fn substitute(&self, text: &str, missing: &mut Vec<String>) -> Result<String> {
        let mut result = String::with_capacity(text.len());
        let mut last = 0;

        for caps in placeholder_regex().captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            result.push_str(&text[last..whole.start()]);
            last = whole.end();

            match self.lookup(name.as_str()) {
                Some(Value::String(value)) => result.push_str(&value),
                Some(other) => {
                    return Err(AuthzError::Template(format!(
                        "parameter '{}' must be a string, got {}",
                        name.as_str(),
                        other
                    )))
                }
                None => {
                    record(missing, whole.as_str().to_string());
                    result.push_str(whole.as_str());
                }
            }
        }

        result.push_str(&text[last..]);
        Ok(result)
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        match self.local {
            Some((var, value)) if var == name => Some(Value::String(value.to_string())),
            _ => self.params.get(name).cloned(),
        }
    }
}
