//! Seed document and role diagram tests against a realistic role set

use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use warden_authz::diagram::RoleDiagram;
use warden_authz::seed::SeedData;
use warden_authz::{CheckRequest, DecisionEngine, DecisionStep, InMemoryStore, RoleDepth};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/blog_roles.toml")
}

async fn seeded() -> (InMemoryStore, DecisionEngine) {
    let seed = SeedData::load(fixture_path()).unwrap();
    let store = InMemoryStore::new();
    seed.apply(&store).await.unwrap();

    let engine = DecisionEngine::with_store(Arc::new(store.clone()));
    (store, engine)
}

#[tokio::test]
async fn test_seed_summary() {
    let seed = SeedData::load(fixture_path()).unwrap();
    let summary = seed.apply(&InMemoryStore::new()).await.unwrap();

    assert_eq!(summary.permissions, 11);
    assert_eq!(summary.roles, 5);
    assert_eq!(summary.grants, 9);
    assert_eq!(summary.assignments, 6);
    assert_eq!(summary.user_permissions, 1);
    assert_eq!(summary.acl_entries, 1);
}

#[tokio::test]
async fn test_admin_allowed_everywhere() {
    let (_, engine) = seeded().await;

    let request = CheckRequest::new("ada", "post.delete")
        .on_resource("post", 3)
        .owned_by("otto");
    let explanation = engine.explain(&request).await.unwrap();

    assert!(explanation.allowed);
    assert_eq!(explanation.step, DecisionStep::GlobalWildcard);
}

#[tokio::test]
async fn test_moderator_edits_others_via_wildcards() {
    let (_, engine) = seeded().await;

    let request = CheckRequest::new("mia", "post.edit")
        .on_resource("post", 3)
        .owned_by("otto");
    assert!(engine.check(&request).await.unwrap());
    assert!(engine.check(&CheckRequest::new("mia", "comment.delete")).await.unwrap());
}

#[tokio::test]
async fn test_author_limited_to_own_posts() {
    let (_, engine) = seeded().await;

    let own = CheckRequest::new("otto", "post.edit")
        .on_resource("post", 3)
        .owned_by("otto");
    assert!(engine.check(&own).await.unwrap());

    let foreign = own.clone().owned_by("mia");
    assert!(!engine.check(&foreign).await.unwrap());
}

#[tokio::test]
async fn test_suspension_outweighs_author() {
    let (_, engine) = seeded().await;

    assert!(!engine.check(&CheckRequest::new("sam", "post.create")).await.unwrap());
    assert!(engine.check(&CheckRequest::new("sam", "post.edit")).await.unwrap());
}

#[tokio::test]
async fn test_reader_acl_and_override() {
    let (_, engine) = seeded().await;

    let granted = CheckRequest::new("rita", "post.edit")
        .on_resource("post", 7)
        .owned_by("otto");
    let explanation = engine.explain(&granted).await.unwrap();
    assert!(explanation.allowed);
    assert_eq!(explanation.step, DecisionStep::Acl);

    let other_post = CheckRequest::new("rita", "post.edit")
        .on_resource("post", 8)
        .owned_by("otto");
    assert!(!engine.check(&other_post).await.unwrap());

    let explanation = engine
        .explain(&CheckRequest::new("rita", "user.manage"))
        .await
        .unwrap();
    assert!(explanation.allowed);
    assert_eq!(explanation.step, DecisionStep::UserPermission);
}

#[tokio::test]
async fn test_role_checks_and_effective_permissions() {
    let (_, engine) = seeded().await;

    assert!(engine.has_role("mia", "reader", RoleDepth::Inherited).await.unwrap());
    assert!(!engine.has_role("otto", "reader", RoleDepth::Direct).await.unwrap());
    assert!(engine
        .has_any_role("sam", &["suspended", "admin"], RoleDepth::Direct)
        .await
        .unwrap());

    assert_eq!(
        engine.effective_permissions("otto").await.unwrap(),
        vec!["post.create", "post.delete", "post.edit"]
    );
    assert_eq!(
        engine.effective_permissions("rita").await.unwrap(),
        vec!["post.view", "user.manage"]
    );
}

#[tokio::test]
async fn test_diagram_from_seed() {
    let (store, _) = seeded().await;

    let diagram = RoleDiagram::build(&store).await.unwrap();
    let generated_at = Utc.with_ymd_and_hms(2025, 5, 18, 9, 0, 0).unwrap();
    let doc = diagram.render(generated_at);

    assert!(doc.contains("Generated on: 2025-05-18 09:00:00"));
    assert!(doc.contains("    admin[\"Administrator\"]"));
    assert!(doc.contains("    author --> moderator"));
    assert!(doc.contains("    reader --> author"));
    assert!(doc.contains("    class admin,reader,suspended root"));
    assert!(doc.contains("    class admin,moderator,suspended leaf"));
    assert!(doc.contains("| Moderator | `moderator` | 50 | Edits and removes any post | Author |"));
    assert!(doc.contains("| Reader | `reader` | 1 | N/A | None |"));
}

#[tokio::test]
async fn test_diagram_written_to_disk() {
    let (store, _) = seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("docs/role-hierarchy.md");

    let doc = RoleDiagram::build(&store).await.unwrap().render(Utc::now());
    tokio::fs::create_dir_all(out.parent().unwrap()).await.unwrap();
    tokio::fs::write(&out, &doc).await.unwrap();

    let written = tokio::fs::read_to_string(&out).await.unwrap();
    assert!(written.starts_with("# Role Hierarchy Diagram"));
}
