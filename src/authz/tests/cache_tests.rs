//! Cached engine tests
//!
//! A cache-enabled engine must answer exactly like an uncached one, and
//! only serves stale reads until the matching invalidation.

mod common;

use common::Fixture;
use std::sync::Arc;
use warden_authz::{CacheConfig, CheckRequest, DecisionEngine, EngineConfig};

fn cached_engine(fx: &Fixture) -> DecisionEngine {
    let config = EngineConfig {
        enable_cache: true,
        cache: CacheConfig {
            capacity: 1_000,
            ttl_secs: 300,
        },
        ..Default::default()
    };

    DecisionEngine::new(config, Arc::new(fx.store.clone())).unwrap()
}

async fn fixture() -> Fixture {
    let fx = Fixture::new();
    let reader = fx.role("reader", 1).await;
    let editor = fx.role("editor", 5).await;

    fx.grant(&reader, "doc.view", true).await;
    fx.grant(&editor, "doc.*", true).await;
    fx.grant(&editor, "doc.edit.others", false).await;

    fx.assign("alice", &reader).await;
    fx.assign("bob", &editor).await;
    fx.acl("alice", "doc.edit", "doc", "1", true).await;
    fx
}

#[tokio::test]
async fn test_cached_engine_matches_uncached() {
    let fx = fixture().await;
    let plain = fx.engine();
    let cached = cached_engine(&fx);

    let requests = [
        CheckRequest::new("alice", "doc.view"),
        CheckRequest::new("alice", "doc.edit").on_resource("doc", "1"),
        CheckRequest::new("alice", "doc.edit").on_resource("doc", "2"),
        CheckRequest::new("bob", "doc.edit"),
        CheckRequest::new("bob", "doc.edit").on_resource("doc", "3").owned_by("alice"),
        CheckRequest::new("bob", "doc.edit").on_resource("doc", "3").owned_by("bob"),
        CheckRequest::new("carol", "doc.view"),
    ];

    // Second pass is served from the cache
    for _ in 0..2 {
        for request in &requests {
            assert_eq!(
                plain.check(request).await.unwrap(),
                cached.check(request).await.unwrap(),
                "mismatch for {:?}",
                request
            );
        }
    }

    let stats = cached.cache_stats().unwrap();
    assert!(stats.hits > 0);
    assert!(stats.hit_rate() > 0.0);
}

#[tokio::test]
async fn test_acl_change_visible_after_user_invalidation() {
    let fx = fixture().await;
    let cached = cached_engine(&fx);
    let request = CheckRequest::new("alice", "doc.edit").on_resource("doc", "1");

    assert!(cached.check(&request).await.unwrap());

    let edit = fx.permission("doc.edit").await;
    assert!(fx.store.remove_acl("alice", &edit.id, "doc", "1").await);

    // Stale until invalidated
    assert!(cached.check(&request).await.unwrap());

    cached.cache().unwrap().invalidate_user("alice");
    assert!(!cached.check(&request).await.unwrap());
    assert!(!fx.engine().check(&request).await.unwrap());
}

#[tokio::test]
async fn test_grant_change_visible_after_role_invalidation() {
    let fx = fixture().await;
    let cached = cached_engine(&fx);
    let request = CheckRequest::new("alice", "doc.view");

    assert!(cached.check(&request).await.unwrap());

    let reader = fx.store.role_by_slug("reader").await.unwrap();
    fx.grant(&reader, "doc.view", false).await;
    assert!(cached.check(&request).await.unwrap());

    cached.cache().unwrap().invalidate_role(&reader.id);
    assert!(!cached.check(&request).await.unwrap());
}

#[tokio::test]
async fn test_assignment_change_visible_after_full_invalidation() {
    let fx = fixture().await;
    let cached = cached_engine(&fx);
    let request = CheckRequest::new("carol", "doc.edit");

    assert!(!cached.check(&request).await.unwrap());

    let editor = fx.store.role_by_slug("editor").await.unwrap();
    fx.assign("carol", &editor).await;
    assert!(!cached.check(&request).await.unwrap());

    cached.invalidate_cache();
    assert!(cached.check(&request).await.unwrap());
    assert_eq!(cached.cache_stats().unwrap().hits, 0);
}

#[tokio::test]
async fn test_cache_disabled_by_default() {
    let fx = fixture().await;
    let engine = fx.engine();

    assert!(engine.cache().is_none());
    assert!(engine.cache_stats().is_none());

    // No-op without a cache
    engine.invalidate_cache();
}
