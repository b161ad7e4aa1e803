//! Integration tests for the two-phase audit store and the settings
//! store using in-memory SurrealDB.

use orgward_core::models::audit::{AuditRecord, AuditState};
use orgward_core::models::setting::{keys, Setting};
use orgward_core::repository::{AuditRepository, SettingsRepository};
use orgward_db::repository::{SurrealAuditRepository, SurrealSettingsRepository};
use serde_json::json;
use surrealdb::engine::local::{Db, Mem};
use surrealdb::Surreal;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    orgward_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn audit_record_opens_then_seals() {
    let db = setup().await;
    let repo = SurrealAuditRepository::new(db);

    let mut record = AuditRecord::new("organization.create", "POST");
    record.organization_user_id = 42;
    record.organization_id = 7;

    let opened = repo.open(record).await.unwrap();
    assert_eq!(opened.current_state, AuditState::Open);
    assert_eq!(opened.organization_user_id, 42);
    assert_eq!(opened.human_readable, "");

    repo.seal(opened.id, "created organization 'Acme'", json!({"id": "7"}))
        .await
        .unwrap();

    let sealed = repo.get_by_id(opened.id).await.unwrap();
    assert_eq!(sealed.current_state, AuditState::Sealed);
    assert_eq!(sealed.human_readable, "created organization 'Acme'");
    assert_eq!(sealed.metadata["id"], json!("7"));
}

#[tokio::test]
async fn sealing_twice_keeps_the_first_outcome() {
    let db = setup().await;
    let repo = SurrealAuditRepository::new(db);

    let opened = repo
        .open(AuditRecord::new("user.create", "POST"))
        .await
        .unwrap();

    repo.seal(opened.id, "first outcome", json!({}))
        .await
        .unwrap();
    repo.seal(opened.id, "second outcome", json!({}))
        .await
        .unwrap();

    let sealed = repo.get_by_id(opened.id).await.unwrap();
    assert_eq!(sealed.human_readable, "first outcome");
    assert_eq!(sealed.current_state, AuditState::Sealed);
}

#[tokio::test]
async fn settings_upsert_inserts_and_replaces() {
    let db = setup().await;
    let repo = SurrealSettingsRepository::new(db);

    assert!(repo.get(keys::BOOTSTRAP_ENABLED).await.unwrap().is_none());

    repo.upsert_all(&[
        Setting::new(keys::BOOTSTRAP_ENABLED, "true"),
        Setting::new(keys::SYSTEM_BASE_URL, "https://orgward.example"),
    ])
    .await
    .unwrap();

    let gate = repo.get(keys::BOOTSTRAP_ENABLED).await.unwrap().unwrap();
    assert_eq!(gate.value, "true");

    repo.upsert_all(&[Setting::new(keys::BOOTSTRAP_ENABLED, "false")])
        .await
        .unwrap();

    let gate = repo.get(keys::BOOTSTRAP_ENABLED).await.unwrap().unwrap();
    assert_eq!(gate.value, "false");

    // Untouched keys keep their values.
    let base = repo.get(keys::SYSTEM_BASE_URL).await.unwrap().unwrap();
    assert_eq!(base.value, "https://orgward.example");
}

#[tokio::test]
async fn empty_upsert_is_a_no_op() {
    let db = setup().await;
    let repo = SurrealSettingsRepository::new(db);
    repo.upsert_all(&[]).await.unwrap();
}
