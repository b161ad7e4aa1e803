//! Integration tests for the organization tree store using in-memory
//! SurrealDB.

use orgward_core::models::organization::Organization;
use orgward_core::repository::{OrganizationRepository, UserRepository};
use orgward_db::repository::{SurrealOrganizationRepository, SurrealUserRepository};
use serde_json::json;
use surrealdb::engine::local::{Db, Mem};
use surrealdb::Surreal;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    orgward_db::run_migrations(&db).await.unwrap();
    db
}

fn org(id: i64, name: &str, path: &str) -> Organization {
    Organization {
        id,
        display_name: name.into(),
        path: path.into(),
        metadata: json!({}),
    }
}

#[tokio::test]
async fn create_and_get_root_organization() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    let root = Organization::new("Acme");
    let created = repo.create(root.clone()).await.unwrap();
    assert_eq!(created.id, root.id);
    assert_eq!(created.path, root.id.to_string());

    let fetched = repo.get_by_id(root.id).await.unwrap();
    assert_eq!(fetched.display_name, "Acme");
    assert_eq!(fetched.path, root.path);
}

#[tokio::test]
async fn subtree_includes_the_node_itself() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    repo.create(org(5, "Root", "5")).await.unwrap();
    repo.create(org(12, "Child", "5.12")).await.unwrap();
    repo.create(org(47, "Grandchild", "5.12.47")).await.unwrap();

    let subtree = repo.list_subtree("5.12").await.unwrap();
    let ids: Vec<i64> = subtree.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![12, 47]);
}

#[tokio::test]
async fn subtree_respects_segment_boundaries() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    repo.create(org(5, "Root", "5")).await.unwrap();
    repo.create(org(47, "Forty-seven", "5.47")).await.unwrap();
    // ID 470 must not be swept up by a "5.47" subtree query.
    repo.create(org(470, "Four-seventy", "5.470")).await.unwrap();

    let subtree = repo.list_subtree("5.47").await.unwrap();
    let ids: Vec<i64> = subtree.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![47]);
}

#[tokio::test]
async fn assign_to_parent_rewrites_only_the_child() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    repo.create(org(1, "Root A", "1")).await.unwrap();
    repo.create(org(2, "Root B", "2")).await.unwrap();
    repo.create(org(3, "Mover", "1.3")).await.unwrap();
    repo.create(org(4, "Deep", "1.3.4")).await.unwrap();

    let moved = repo.assign_to_parent(3, 2).await.unwrap();
    assert!(moved);

    let mover = repo.get_by_id(3).await.unwrap();
    assert_eq!(mover.path, "2.3");

    // Descendants keep their previous paths.
    let deep = repo.get_by_id(4).await.unwrap();
    assert_eq!(deep.path, "1.3.4");
}

#[tokio::test]
async fn assign_to_missing_parent_reports_false() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    repo.create(org(1, "Root", "1")).await.unwrap();

    assert!(!repo.assign_to_parent(1, 999).await.unwrap());
    assert!(!repo.assign_to_parent(999, 1).await.unwrap());

    let unchanged = repo.get_by_id(1).await.unwrap();
    assert_eq!(unchanged.path, "1");
}

#[tokio::test]
async fn metadata_merge_replaces_colliding_keys() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    repo.create(org(1, "Root", "1")).await.unwrap();
    repo.merge_metadata(1, json!({"region": "us-east-1", "team": "core"}))
        .await
        .unwrap();
    repo.merge_metadata(1, json!({"region": "eu-west-1"}))
        .await
        .unwrap();

    let fetched = repo.get_by_id(1).await.unwrap();
    assert_eq!(fetched.metadata["region"], json!("eu-west-1"));
    assert_eq!(fetched.metadata["team"], json!("core"));
}

#[tokio::test]
async fn metadata_resolution_prefers_the_nearest_ancestor() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    repo.create(org(1, "Root", "1")).await.unwrap();
    repo.create(org(2, "Mid", "1.2")).await.unwrap();
    repo.create(org(3, "Leaf", "1.2.3")).await.unwrap();

    repo.merge_metadata(1, json!({"aws_account": "root-acct", "region": "us-east-1"}))
        .await
        .unwrap();
    repo.merge_metadata(2, json!({"aws_account": "mid-acct"}))
        .await
        .unwrap();

    // The leaf defines nothing; the middle node shadows the root.
    let hit = repo
        .resolve_metadata("1.2.3", "aws_account")
        .await
        .unwrap()
        .expect("mid should define the account");
    assert_eq!(hit.organization_id, 2);
    assert_eq!(hit.metadata["aws_account"], json!("mid-acct"));

    // Only the root defines the region; the full root document rides
    // along with the hit.
    let hit = repo
        .resolve_metadata("1.2.3", "region")
        .await
        .unwrap()
        .expect("root should define the region");
    assert_eq!(hit.organization_id, 1);
    assert_eq!(hit.metadata["region"], json!("us-east-1"));
    assert_eq!(hit.metadata["aws_account"], json!("root-acct"));

    let missing = repo.resolve_metadata("1.2.3", "gcp_project").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn list_members_returns_direct_members() {
    let db = setup().await;
    let org_repo = SurrealOrganizationRepository::new(db.clone());
    let user_repo = SurrealUserRepository::new(db);

    org_repo.create(org(1, "Root", "1")).await.unwrap();
    let invite = user_repo.create_with_invite("alice", 1).await.unwrap();

    // Pending invitees are not listed until they activate.
    assert!(org_repo.list_members(1).await.unwrap().is_empty());
    user_repo
        .init_from_invite(invite.invite_code, "static", "alice@idp")
        .await
        .unwrap();

    let members = org_repo.list_members(1).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, invite.user_id);
    assert_eq!(members[0].display_name, "alice");

    assert!(org_repo.list_members(999).await.unwrap().is_empty());
}
