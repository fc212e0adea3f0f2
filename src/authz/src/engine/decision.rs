//! Authorization decision types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::expression::Expression;

/// Outcome of checking a caller's scopes against a requirement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthDecision {
    /// Unique decision ID
    pub id: String,

    /// Whether the request is allowed
    pub allowed: bool,

    /// Minimal unmet requirement; `None` when allowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Expression>,

    /// Template parameters that were not supplied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,

    /// Reason for the decision
    pub reason: DecisionReason,

    /// Role snapshot the decision was computed against
    pub snapshot_version: u64,

    /// Decision timestamp
    pub timestamp: DateTime<Utc>,
}

impl AuthDecision {
    /// Create an allow decision
    pub fn allow(snapshot_version: u64) -> Self {
        Self::new(true, None, DecisionReason::Satisfied, snapshot_version)
    }

    /// Create a deny decision carrying the residual requirement
    pub fn deny(required: Expression, reason: DecisionReason, snapshot_version: u64) -> Self {
        Self::new(false, Some(required), reason, snapshot_version)
    }

    fn new(
        allowed: bool,
        required: Option<Expression>,
        reason: DecisionReason,
        snapshot_version: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            allowed,
            required,
            unresolved: Vec::new(),
            reason,
            snapshot_version,
            timestamp: Utc::now(),
        }
    }

    /// Attach unresolved template parameters
    pub fn with_unresolved(mut self, unresolved: Vec<String>) -> Self {
        self.unresolved = unresolved;
        self
    }

    /// Body of the 403 response for a denied request
    ///
    /// Built from the residual requirement only; the caller's granted scopes
    /// are never included. Returns `None` for allowed decisions.
    pub fn forbidden_body(&self) -> Option<Value> {
        if self.allowed {
            return None;
        }

        let required = self.required.as_ref()?;
        let message = match self.reason {
            DecisionReason::ClientExpired => "Client has expired".to_string(),
            _ => format!("Insufficient scopes: missing {}", required),
        };

        Some(json!({
            "code": self.reason.code(),
            "message": message,
            "required": required,
        }))
    }
}

/// Reason for authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecisionReason {
    /// Granted scopes satisfy the requirement
    Satisfied,

    /// Granted scopes leave part of the requirement unmet
    InsufficientScopes,

    /// Client credentials are past their expiry
    ClientExpired,
}

impl DecisionReason {
    /// Stable error code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::Satisfied => "Satisfied",
            Self::InsufficientScopes => "InsufficientScopes",
            Self::ClientExpired => "ClientExpired",
        }
    }
}
