//! Comprehensive test suite for role expansion
//!
//! Tests cover:
//! - grants_role edge cases
//! - Chained, wildcard and cyclic closures
//! - Snapshot swapping
//! - Closure cache behavior
//! - Concurrent access

use super::*;
use crate::config::CacheConfig;
use crate::scope::ScopeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn roles(records: Vec<RoleRecord>) -> Vec<Role> {
    records.into_iter().map(Role::from).collect()
}

fn set(scopes: &[&str]) -> ScopeSet {
    ScopeSet::from_scopes(scopes.iter().copied())
}

// ============================================================================
// grants_role Tests
// ============================================================================

#[test]
fn test_grants_role_cases() {
    assert!(grants_role("assume:*", "client-id:queue"));
    assert!(grants_role("assume:client-id:queue", "client-id:queue"));
    assert!(grants_role("assume:client-id:*", "client-id:queue"));
    assert!(!grants_role("queue:*", "task-run-id:*"));
    assert!(!grants_role("assume:ab*", "ac*"));
    assert!(!grants_role("assume:client-id:queue", "client-id:other"));
}

#[test]
fn test_grants_role_degenerate_scopes() {
    // broad patterns that happen to cover the "assume:" prefix
    assert!(grants_role("*", "anything"));
    assert!(grants_role("as*", "anything"));
    assert!(grants_role("assume*", "anything"));
    assert!(!grants_role("assume", "anything"));
}

#[test]
fn test_grants_wildcard_role() {
    // a literal assume scope unlocks a role whose id is a pattern
    assert!(grants_role("assume:repo:github.com/org/app", "repo:github.com/org/*"));
    assert!(grants_role("assume:repo:*", "repo:github.com/org/*"));
    assert!(!grants_role("assume:repo:gitlab.com/x", "repo:github.com/*"));
}

// ============================================================================
// Closure Tests
// ============================================================================

#[test]
fn test_no_roles() {
    let initial = set(&["queue:*", "assume:nothing"]);
    assert_eq!(expand_scopes(&initial, &[]).unwrap(), initial);
}

#[test]
fn test_chained_expansion() {
    let table = roles(vec![
        RoleRecord::new("a", ["assume:b", "scope:a"]),
        RoleRecord::new("b", ["assume:c", "scope:b"]),
        RoleRecord::new("c", ["scope:c"]),
        RoleRecord::new("d", ["scope:d"]),
    ]);

    let closure = expand_scopes(&set(&["assume:a"]), &table).unwrap();
    assert_eq!(
        closure,
        set(&["assume:a", "assume:b", "assume:c", "scope:a", "scope:b", "scope:c"])
    );
}

#[test]
fn test_two_cycle_converges() {
    let table = roles(vec![
        RoleRecord::new("roleA", ["assume:roleB", "scope:a"]),
        RoleRecord::new("roleB", ["assume:roleA", "scope:b"]),
    ]);

    let closure = expand_scopes(&set(&["assume:roleA"]), &table).unwrap();
    assert!(closure.covers("scope:a"));
    assert!(closure.covers("scope:b"));
    assert_eq!(closure.len(), 4);
}

#[test]
fn test_self_granting_role() {
    let table = roles(vec![RoleRecord::new("loop", ["assume:loop", "x"])]);
    let closure = expand_scopes(&set(&["assume:loop"]), &table).unwrap();
    assert_eq!(closure, set(&["assume:loop", "x"]));
}

#[test]
fn test_wildcard_assume_grants_every_matching_role() {
    let table = roles(vec![
        RoleRecord::new("project:a:ci", ["a:*"]),
        RoleRecord::new("project:b:ci", ["b:*"]),
        RoleRecord::new("other", ["c:*"]),
    ]);

    let closure = expand_scopes(&set(&["assume:project:*"]), &table).unwrap();
    assert_eq!(closure, set(&["a:*", "assume:project:*", "b:*"]));
}

#[test]
fn test_star_grants_everything_and_normalizes() {
    let table = roles(vec![RoleRecord::new("admin", ["queue:*"])]);
    let closure = expand_scopes(&set(&["*"]), &table).unwrap();
    assert_eq!(closure, set(&["*"]));
}

#[test]
fn test_long_chain_within_bound() {
    // r0 -> r1 -> ... -> r19, the worst case for the iteration bound
    let records: Vec<RoleRecord> = (0..20)
        .map(|i| {
            let next = format!("assume:r{}", i + 1);
            RoleRecord::new(format!("r{}", i), [next, format!("s{}", i)])
        })
        .collect();
    let table = roles(records);

    let closure = expand_scopes(&set(&["assume:r0"]), &table).unwrap();
    assert!(closure.covers("s19"));
    assert!(closure.covers("assume:r20"));
}

// ============================================================================
// Resolver Tests
// ============================================================================

#[test]
fn test_resolver_uses_latest_snapshot() {
    let resolver = RoleResolver::new();
    let caller = set(&["assume:worker"]);

    assert_eq!(resolver.resolve(&caller).unwrap(), caller);

    let v1 = resolver
        .replace_roles(vec![RoleRecord::new("worker", ["queue:claim-work:*"])])
        .unwrap();
    assert!(resolver.resolve(&caller).unwrap().covers("queue:claim-work:x"));

    let v2 = resolver
        .replace_roles(vec![RoleRecord::new("worker", ["queue:status:*"])])
        .unwrap();
    assert!(v2 > v1);

    let closure = resolver.resolve(&caller).unwrap();
    assert!(!closure.covers("queue:claim-work:x"));
    assert!(closure.covers("queue:status:x"));
}

#[test]
fn test_old_snapshot_stays_usable() {
    let resolver = RoleResolver::new();
    resolver
        .replace_roles(vec![RoleRecord::new("r", ["old"])])
        .unwrap();
    let held = resolver.snapshot();

    resolver
        .replace_roles(vec![RoleRecord::new("r", ["new"])])
        .unwrap();

    let closure = expand_scopes(&set(&["assume:r"]), held.roles()).unwrap();
    assert!(closure.covers("old"));
    assert!(resolver.snapshot().version() > held.version());
}

#[test]
fn test_failed_replace_keeps_snapshot() {
    let resolver = RoleResolver::new();
    resolver
        .replace_roles(vec![RoleRecord::new("r", ["x"])])
        .unwrap();
    let before = resolver.snapshot().version();

    let result = resolver.replace_roles(vec![
        RoleRecord::new("dup", ["a"]),
        RoleRecord::new("dup", ["b"]),
    ]);
    assert!(result.is_err());
    assert_eq!(resolver.snapshot().version(), before);
}

#[test]
fn test_granted_roles() {
    let resolver = RoleResolver::new();
    resolver
        .replace_roles(vec![
            RoleRecord::new("a", ["x"]),
            RoleRecord::new("b", ["y"]),
        ])
        .unwrap();
    assert_eq!(resolver.granted_roles(&set(&["assume:a"])), vec!["a".to_string()]);
    assert_eq!(resolver.granted_roles(&set(&["assume:*"])).len(), 2);
}

// ============================================================================
// Cache Tests
// ============================================================================

#[test]
fn test_cache_hits_and_invalidation() {
    let resolver = RoleResolver::new();
    resolver
        .replace_roles(vec![RoleRecord::new("r", ["x"])])
        .unwrap();
    let caller = set(&["assume:r"]);

    resolver.resolve(&caller).unwrap();
    resolver.resolve(&caller).unwrap();

    let stats = resolver.cache_stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);

    resolver
        .replace_roles(vec![RoleRecord::new("r", ["y"])])
        .unwrap();
    assert_eq!(resolver.cache_stats().size, 0);
}

#[test]
fn test_cache_ttl_expiry() {
    let resolver = RoleResolver::with_cache_config(CacheConfig {
        enabled: true,
        capacity: 10,
        ttl: Duration::from_millis(10),
    });
    let caller = set(&["a"]);

    resolver.resolve(&caller).unwrap();
    thread::sleep(Duration::from_millis(30));
    resolver.resolve(&caller).unwrap();

    let stats = resolver.cache_stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.misses, 2);
}

#[test]
fn test_cache_capacity_and_disable() {
    let resolver = RoleResolver::with_cache_config(CacheConfig {
        enabled: true,
        capacity: 1,
        ttl: Duration::from_secs(60),
    });
    resolver.resolve(&set(&["a"])).unwrap();
    resolver.resolve(&set(&["b"])).unwrap();
    assert_eq!(resolver.cache_stats().size, 1);

    let disabled = RoleResolver::with_cache_config(CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    });
    disabled.resolve(&set(&["a"])).unwrap();
    assert_eq!(disabled.cache_stats().size, 0);
}

#[test]
fn test_full_cache_evicts_expired_entries() {
    let resolver = RoleResolver::with_cache_config(CacheConfig {
        enabled: true,
        capacity: 2,
        ttl: Duration::from_millis(10),
    });
    resolver.resolve(&set(&["a"])).unwrap();
    resolver.resolve(&set(&["b"])).unwrap();
    assert_eq!(resolver.cache_stats().size, 2);

    thread::sleep(Duration::from_millis(30));
    for _ in 0..5 {
        resolver.resolve(&set(&["c"])).unwrap();
    }

    let stats = resolver.cache_stats();
    assert_eq!(stats.evictions, 2);
    assert_eq!(stats.size, 1);
    assert_eq!(stats.hits, 4);
    assert_eq!(stats.misses, 3);
}

#[test]
fn test_replaced_snapshot_results_are_not_cached() {
    let resolver = RoleResolver::new();
    resolver
        .replace_roles(vec![RoleRecord::new("r", ["old"])])
        .unwrap();
    let held = resolver.snapshot();

    resolver
        .replace_roles(vec![RoleRecord::new("r", ["new"])])
        .unwrap();

    let closure = resolver.resolve_in(&held, &set(&["assume:r"])).unwrap();
    assert!(closure.covers("old"));
    assert_eq!(resolver.cache_stats().size, 0);

    resolver.resolve(&set(&["assume:r"])).unwrap();
    assert_eq!(resolver.cache_stats().size, 1);
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[test]
fn test_concurrent_resolve_during_swaps() {
    let resolver = Arc::new(RoleResolver::new());
    resolver
        .replace_roles(vec![RoleRecord::new("r", ["v:0"])])
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let resolver = Arc::clone(&resolver);
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                let closure = resolver.resolve(&ScopeSet::from_scopes(["assume:r"])).unwrap();
                // every snapshot grants exactly one v:<n> scope
                assert_eq!(closure.iter().filter(|s| s.starts_with("v:")).count(), 1);
            }
        }));
    }

    for i in 1..50 {
        resolver
            .replace_roles(vec![RoleRecord::new("r", [format!("v:{}", i)])])
            .unwrap();
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(resolver.resolve(&set(&["assume:r"])).unwrap().covers("v:49"));
}
