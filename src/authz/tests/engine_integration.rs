//! End-to-end tests for the scope engine
//!
//! Covers operation declarations, client lookups, the 403 body, and live
//! role updates through the change listener.

use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use taskauth_authz::engine::{DecisionReason, OperationRegistry, ScopeEngine};
use taskauth_authz::events::{spawn_listener, ChangeEvent};
use taskauth_authz::expression::{Expression, Params};
use taskauth_authz::roles::{ClientRecord, RoleRecord};
use taskauth_authz::scope::ScopeSet;
use taskauth_authz::store::InMemoryScopeStore;
use taskauth_authz::{AuthzError, EngineConfig};
use tokio::sync::mpsc;

fn create_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    registry
        .register(
            "createTask",
            &json!({"AllOf": [
                "queue:create-task:<taskQueueId>",
                {"for": "route", "in": "routes", "each": "queue:route:<route>"},
                {"if": "private", "then": {"AnyOf": ["secrets:get:<secret>", "secrets:*"]}}
            ]}),
        )
        .unwrap();
    registry
        .register("listTasks", &json!({"AnyOf": []}))
        .unwrap();
    registry
}

async fn create_engine(store: &InMemoryScopeStore) -> Arc<ScopeEngine> {
    Arc::new(
        ScopeEngine::new(
            EngineConfig::default(),
            Arc::new(store.clone()),
            create_registry(),
        )
        .await
        .unwrap(),
    )
}

fn create_task_params(private: bool) -> Params {
    let mut params = Params::new();
    params.insert("taskQueueId".to_string(), json!("proj/build"));
    params.insert("routes".to_string(), json!(["index.a", "index.b"]));
    params.insert("private".to_string(), json!(private));
    params.insert("secret".to_string(), json!("deploy"));
    params
}

#[tokio::test]
async fn test_create_task_allowed_through_roles() {
    let store = InMemoryScopeStore::new();
    store
        .put_role(RoleRecord::new(
            "project:proj",
            ["queue:create-task:proj/*", "queue:route:index.*"],
        ))
        .await
        .unwrap();
    let engine = create_engine(&store).await;

    let caller = ScopeSet::from_scopes(["assume:project:proj"]);
    let decision = engine
        .authorize_operation(&caller, "createTask", &create_task_params(false))
        .unwrap();

    assert!(decision.allowed);
    assert!(decision.unresolved.is_empty());
    assert!(decision.forbidden_body().is_none());
}

#[tokio::test]
async fn test_forbidden_body_lists_only_missing() {
    let store = InMemoryScopeStore::new();
    store
        .put_role(RoleRecord::new(
            "project:proj",
            ["queue:create-task:proj/*", "queue:route:index.*"],
        ))
        .await
        .unwrap();
    let engine = create_engine(&store).await;

    let caller = ScopeSet::from_scopes(["assume:project:proj", "unrelated:scope"]);
    let decision = engine
        .authorize_operation(&caller, "createTask", &create_task_params(true))
        .unwrap();

    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::InsufficientScopes);

    let body = decision.forbidden_body().unwrap();
    assert_eq!(
        body["required"],
        json!({"AnyOf": ["secrets:get:deploy", "secrets:*"]})
    );

    let rendered = body.to_string();
    assert!(!rendered.contains("unrelated:scope"));
    assert!(!rendered.contains("assume:project:proj"));
}

#[tokio::test]
async fn test_empty_any_of_is_never_satisfied() {
    let engine = create_engine(&InMemoryScopeStore::new()).await;

    let decision = engine
        .authorize_operation(&ScopeSet::from_scopes(["*"]), "listTasks", &Params::new())
        .unwrap();

    assert!(!decision.allowed);
    assert_eq!(decision.required, Some(Expression::any_of([])));
}

#[tokio::test]
async fn test_wrongly_typed_parameter_is_an_error() {
    let engine = create_engine(&InMemoryScopeStore::new()).await;

    let mut params = create_task_params(false);
    params.insert("private".to_string(), json!("yes"));

    let result = engine.authorize_operation(&ScopeSet::from_scopes(["*"]), "createTask", &params);
    assert!(matches!(result, Err(AuthzError::Template(_))));
}

#[tokio::test]
async fn test_client_scopes_are_expanded() {
    let store = InMemoryScopeStore::new();
    let now = Utc::now();
    store
        .put_role(RoleRecord::new("worker", ["queue:claim-work:proj/*"]))
        .await
        .unwrap();
    store
        .put_client(ClientRecord::new(
            "builder",
            ["assume:worker"],
            now + Duration::days(1),
        ))
        .await
        .unwrap();
    let engine = create_engine(&store).await;

    let decision = engine
        .authorize_client(
            "builder",
            &Expression::literal("queue:claim-work:proj/build"),
            now,
        )
        .unwrap();
    assert!(decision.allowed);

    let later = now + Duration::days(2);
    let decision = engine
        .authorize_client(
            "builder",
            &Expression::literal("queue:claim-work:proj/build"),
            later,
        )
        .unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.forbidden_body().unwrap()["code"], "ClientExpired");
}

#[tokio::test]
async fn test_listener_applies_role_and_client_changes() {
    let store = InMemoryScopeStore::new();
    let engine = create_engine(&store).await;
    let caller = ScopeSet::from_scopes(["assume:deployer"]);
    let required = Expression::literal("secrets:get:deploy");

    assert!(!engine.authorize_scopes(&caller, &required).unwrap().allowed);

    let (tx, rx) = mpsc::channel(8);
    let listener = spawn_listener(Arc::clone(&engine), rx);

    store
        .put_role(RoleRecord::new("deployer", ["secrets:get:*"]))
        .await
        .unwrap();
    store
        .put_client(ClientRecord::new(
            "ci",
            ["assume:deployer"],
            Utc::now() + Duration::hours(1),
        ))
        .await
        .unwrap();

    tx.send(ChangeEvent::RoleCreated {
        role_id: "deployer".to_string(),
    })
    .await
    .unwrap();
    tx.send(ChangeEvent::ClientCreated {
        client_id: "ci".to_string(),
    })
    .await
    .unwrap();
    drop(tx);
    listener.await.unwrap();

    assert!(engine.authorize_scopes(&caller, &required).unwrap().allowed);
    assert!(engine
        .authorize_client("ci", &required, Utc::now())
        .unwrap()
        .allowed);

    let metrics = engine.metrics().unwrap();
    assert_eq!(metrics.allowed_decisions, 2);
    assert_eq!(metrics.denied_decisions, 1);
    assert!(metrics.snapshot_swaps >= 4);
}

#[tokio::test]
async fn test_bad_declaration_is_fatal() {
    let mut registry = OperationRegistry::new();
    let err = registry
        .register("broken", &json!(["queue:create-task"]))
        .unwrap_err();
    assert_eq!(err.to_string(), "Scope expressions must be objects (operation 'broken')");
}
