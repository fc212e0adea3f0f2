//! # Scope Tool
//!
//! Command-line helper for inspecting scope sets, expressions and role
//! closures. Reads one JSON document on stdin and prints JSON on stdout.
//!
//! ## Commands
//!
//! - `union` / `intersection` - `{"a": [...], "b": [...]}`
//! - `satisfies` / `explain` - `{"scopes": [...], "expression": ...}`
//! - `expand` - `{"template": ..., "params": {...}}`
//! - `validate` - `{"expression": ...}`
//! - `closure` - `{"scopes": [...], "roles": [{"roleId": ..., "scopes": [...]}]}`
//!
//! ## Configuration
//!
//! - `RUST_LOG` - Log level (default: info), logs go to stderr

use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use taskauth_authz::expression::{self, explain_deficit, satisfies, Expression, Params};
use taskauth_authz::roles::{expand_scopes, Role, RoleRecord};
use taskauth_authz::scope::{intersection, union, ScopeSet};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str =
    "usage: scope-tool <union|intersection|satisfies|explain|expand|validate|closure> < input.json";

#[derive(Debug, Deserialize)]
struct PairInput {
    a: Vec<String>,
    b: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EvalInput {
    scopes: Vec<String>,
    expression: Expression,
}

#[derive(Debug, Deserialize)]
struct ExpandInput {
    template: Value,
    #[serde(default)]
    params: Params,
}

#[derive(Debug, Deserialize)]
struct ValidateInput {
    expression: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleInput {
    role_id: String,
    scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClosureInput {
    scopes: Vec<String>,
    roles: Vec<RoleInput>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let command = match std::env::args().nth(1) {
        Some(command) => command,
        None => bail!(USAGE),
    };

    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read stdin")?;
    let input: Value = serde_json::from_str(&raw).context("stdin is not valid JSON")?;

    debug!(command = %command, "running scope-tool v{}", taskauth_authz::VERSION);
    let output = run(&command, input)?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(command: &str, input: Value) -> Result<Value> {
    let output = match command {
        "union" | "intersection" => {
            let PairInput { a, b } = parse(input)?;
            if command == "union" {
                json!(union(&a, &b))
            } else {
                json!(intersection(&a, &b))
            }
        }
        "satisfies" => {
            let EvalInput { scopes, expression } = parse(input)?;
            json!(satisfies(&ScopeSet::from_scopes(scopes), &expression))
        }
        "explain" => {
            let EvalInput { scopes, expression } = parse(input)?;
            json!(explain_deficit(&ScopeSet::from_scopes(scopes), &expression))
        }
        "expand" => {
            let ExpandInput { template, params } = parse(input)?;
            let mut missing = Vec::new();
            let expanded = expression::expand(&template, &params, &mut missing)
                .context("template expansion failed")?;
            json!({ "expression": expanded, "missing": missing })
        }
        "validate" => {
            let ValidateInput { expression } = parse(input)?;
            json!({ "valid": expression::validate(&expression) })
        }
        "closure" => {
            let ClosureInput { scopes, roles } = parse(input)?;
            let roles: Vec<Role> = roles
                .into_iter()
                .map(|r| Role::from(RoleRecord::new(r.role_id, r.scopes)))
                .collect();
            let closure = expand_scopes(&ScopeSet::from_scopes(scopes), &roles)
                .context("role closure failed")?;
            info!(roles = roles.len(), scopes = closure.len(), "computed closure");
            json!(closure)
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    };

    Ok(output)
}

fn parse<T: serde::de::DeserializeOwned>(input: Value) -> Result<T> {
    serde_json::from_value(input).context("input does not match the command's shape")
}
