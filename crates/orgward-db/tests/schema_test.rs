//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::engine::local::Mem;
use surrealdb::Surreal;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    orgward_db::run_migrations(&db).await.unwrap();

    // Verify that key tables exist by querying INFO FOR DB.
    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: surrealdb::Value = result.take(0).unwrap();
    let info_str = format!("{:?}", info);

    assert!(
        info_str.contains("organization"),
        "missing organization table"
    );
    assert!(
        info_str.contains("organization_user"),
        "missing organization_user table"
    );
    assert!(
        info_str.contains("organization_membership"),
        "missing organization_membership table"
    );
    assert!(info_str.contains("role"), "missing role table");
    assert!(
        info_str.contains("role_permission"),
        "missing role_permission table"
    );
    assert!(
        info_str.contains("role_assignment"),
        "missing role_assignment table"
    );
    assert!(info_str.contains("setting"), "missing setting table");
    assert!(info_str.contains("audit_log"), "missing audit_log table");
    assert!(
        info_str.contains("registered_resource"),
        "missing registered_resource table"
    );
    assert!(
        info_str.contains("resource_aws_iam"),
        "missing resource_aws_iam table"
    );
    assert!(
        info_str.contains("resource_gcp_service_account"),
        "missing resource_gcp_service_account table"
    );
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    orgward_db::run_migrations(&db).await.unwrap();
    orgward_db::run_migrations(&db).await.unwrap();
}

#[tokio::test]
async fn seeding_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    orgward_db::run_migrations(&db).await.unwrap();
    orgward_db::seed_reference_data(&db).await.unwrap();
    orgward_db::seed_reference_data(&db).await.unwrap();

    let mut result = db
        .query("SELECT count() AS total FROM role GROUP ALL")
        .await
        .unwrap();
    let counts: Vec<serde_json::Value> = result.take(0).unwrap();
    assert_eq!(counts[0]["total"], serde_json::json!(3));
}
