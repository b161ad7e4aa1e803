//! End-to-end flows over in-memory SurrealDB: bootstrap, identity
//! resolution, organization management, and the user lifecycle.

use orgward_core::error::OrgwardError;
use orgward_core::models::role::{ORGANIZATION_ADMIN_ROLE, USER_ADMIN_ROLE};
use orgward_core::models::user::{OrganizationUser, UserState};
use orgward_core::repository::UserRepository;
use orgward_db::repository::{
    SurrealAuditRepository, SurrealOrganizationRepository, SurrealRbacRepository,
    SurrealSettingsRepository, SurrealUserRepository,
};
use orgward_service::token::STATIC_IDP_TYPE;
use orgward_service::{
    IdentityService, OrganizationService, StaticKeyAuthenticator, SystemService, UserService,
};
use serde_json::json;
use surrealdb::engine::local::{Db, Mem};
use surrealdb::Surreal;

type Orgs = OrganizationService<
    SurrealOrganizationRepository<Db>,
    SurrealRbacRepository<Db>,
    SurrealAuditRepository<Db>,
>;
type Users = UserService<
    SurrealUserRepository<Db>,
    SurrealOrganizationRepository<Db>,
    SurrealRbacRepository<Db>,
    SurrealAuditRepository<Db>,
>;
type System = SystemService<
    SurrealOrganizationRepository<Db>,
    SurrealUserRepository<Db>,
    SurrealRbacRepository<Db>,
    SurrealSettingsRepository<Db>,
    SurrealAuditRepository<Db>,
>;
type Identity = IdentityService<StaticKeyAuthenticator, SurrealUserRepository<Db>>;

struct Env {
    db: Surreal<Db>,
    orgs: Orgs,
    users: Users,
    system: System,
    identity: Identity,
    auth: StaticKeyAuthenticator,
}

async fn setup() -> Env {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    orgward_db::run_migrations(&db).await.unwrap();
    orgward_db::seed_reference_data(&db).await.unwrap();

    let auth = StaticKeyAuthenticator::insecure_default();
    Env {
        orgs: OrganizationService::new(
            SurrealOrganizationRepository::new(db.clone()),
            SurrealRbacRepository::new(db.clone()),
            SurrealAuditRepository::new(db.clone()),
        ),
        users: UserService::new(
            SurrealUserRepository::new(db.clone()),
            SurrealOrganizationRepository::new(db.clone()),
            SurrealRbacRepository::new(db.clone()),
            SurrealAuditRepository::new(db.clone()),
        ),
        system: SystemService::new(
            SurrealOrganizationRepository::new(db.clone()),
            SurrealUserRepository::new(db.clone()),
            SurrealRbacRepository::new(db.clone()),
            SurrealSettingsRepository::new(db.clone()),
            SurrealAuditRepository::new(db.clone()),
        ),
        identity: IdentityService::new(
            auth.clone(),
            SurrealUserRepository::new(db.clone()),
        ),
        auth,
        db,
    }
}

/// Bootstrap the system and log the admin in.
async fn bootstrap_admin(env: &Env) -> (OrganizationUser, i64) {
    let output = env.system.bootstrap("Acme", "root-admin").await.unwrap();

    let users = SurrealUserRepository::new(env.db.clone());
    assert!(users
        .init_from_invite(output.invite.invite_code, STATIC_IDP_TYPE, "admin@idp")
        .await
        .unwrap());

    let header = format!("Bearer {}", env.auth.issue("admin@idp").unwrap());
    let admin = env.identity.resolve(Some(&header)).await.unwrap();
    (admin, output.organization.id)
}

#[tokio::test]
async fn bootstrap_is_single_shot() {
    let env = setup().await;

    let output = env.system.bootstrap("Acme", "root-admin").await.unwrap();
    assert_eq!(
        output.organization.path,
        output.organization.id.to_string()
    );

    let second = env.system.bootstrap("Evil Corp", "intruder").await;
    assert!(matches!(second, Err(OrgwardError::BootstrapDisabled)));
}

#[tokio::test]
async fn bootstrap_admin_holds_system_scope() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    assert_eq!(admin.current_state, UserState::Active);
    assert_eq!(admin.organizations, vec![root_id]);
    assert_eq!(admin.system_roles.len(), 1);

    // System scope lets the admin create a fresh root and manage the
    // whole tree below the bootstrap root.
    let new_root = env.orgs.create(&admin, None, "Second Tree").await.unwrap();
    assert_eq!(new_root.path, new_root.id.to_string());

    let child = env
        .orgs
        .create(&admin, Some(root_id), "Engineering")
        .await
        .unwrap();
    assert!(child.path.starts_with(&format!("{root_id}.")));
}

#[tokio::test]
async fn identity_rejects_bad_and_inactive_callers() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    assert!(matches!(
        env.identity.resolve(None).await,
        Err(OrgwardError::Unauthorized)
    ));
    assert!(matches!(
        env.identity.resolve(Some("Bearer not-a-jwt")).await,
        Err(OrgwardError::Unauthorized)
    ));

    // A user that never redeemed an invite has no credential bound.
    let invite = env
        .users
        .create(&admin, root_id, "pending", &[])
        .await
        .unwrap();
    let header = format!("Bearer {}", env.auth.issue("pending@idp").unwrap());
    assert!(env.identity.resolve(Some(&header)).await.is_err());

    // Deactivated users are rejected even with a valid token.
    let users = SurrealUserRepository::new(env.db.clone());
    users
        .init_from_invite(invite.invite_code, STATIC_IDP_TYPE, "pending@idp")
        .await
        .unwrap();
    env.users.deactivate(&admin, invite.user_id).await.unwrap();
    assert!(matches!(
        env.identity.resolve(Some(&header)).await,
        Err(OrgwardError::Unauthorized)
    ));

    // Reactivation restores access.
    env.users.activate(&admin, invite.user_id).await.unwrap();
    let restored = env.identity.resolve(Some(&header)).await.unwrap();
    assert_eq!(restored.id, invite.user_id);
}

#[tokio::test]
async fn org_scoped_admin_cannot_create_roots() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    // Build an org-scoped admin inside the root org, role granted at
    // creation time.
    let invite = env
        .users
        .create(
            &admin,
            root_id,
            "org-admin",
            &[ORGANIZATION_ADMIN_ROLE.to_string()],
        )
        .await
        .unwrap();
    let users = SurrealUserRepository::new(env.db.clone());
    users
        .init_from_invite(invite.invite_code, STATIC_IDP_TYPE, "orgadmin@idp")
        .await
        .unwrap();

    let header = format!("Bearer {}", env.auth.issue("orgadmin@idp").unwrap());
    let org_admin = env.identity.resolve(Some(&header)).await.unwrap();

    // Inside the subtree: allowed.
    let child = env
        .orgs
        .create(&org_admin, Some(root_id), "Engineering")
        .await
        .unwrap();
    // A grandchild works through ancestor inclusion.
    env.orgs
        .create(&org_admin, Some(child.id), "Platform")
        .await
        .unwrap();

    // A new root requires system scope.
    assert!(matches!(
        env.orgs.create(&org_admin, None, "Rogue Tree").await,
        Err(OrgwardError::Unauthorized)
    ));
}

#[tokio::test]
async fn users_cannot_change_their_own_state() {
    let env = setup().await;
    let (admin, _) = bootstrap_admin(&env).await;

    // Self-deactivation is an authorization failure, not a malformed
    // request.
    let result = env.users.deactivate(&admin, admin.id).await;
    assert!(matches!(result, Err(OrgwardError::Unauthorized)));

    // The admin is still active.
    let users = SurrealUserRepository::new(env.db.clone());
    let still = users.get_by_id(admin.id).await.unwrap();
    assert_eq!(still.current_state, UserState::Active);
}

#[tokio::test]
async fn role_assignment_validates_names_before_writing() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    let invite = env
        .users
        .create(&admin, root_id, "alice", &[])
        .await
        .unwrap();

    let result = env
        .users
        .set_roles(
            &admin,
            invite.user_id,
            Some(root_id),
            &[USER_ADMIN_ROLE.to_string(), "Made Up Role".to_string()],
        )
        .await;
    assert!(matches!(result, Err(OrgwardError::Validation { .. })));

    // Nothing was written for the valid half of the request.
    let users = SurrealUserRepository::new(env.db.clone());
    let alice = users.get_by_id(invite.user_id).await.unwrap();
    assert!(alice.user_roles.is_empty());
}

#[tokio::test]
async fn role_assignment_requires_visibility_of_the_target_org() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    // A second tree the assigner is not a member of.
    let other_root = env.orgs.create(&admin, None, "Second Tree").await.unwrap();

    // carol lives in the first tree but holds the assignment
    // permission at the second root, granted by the system admin.
    let invite = env
        .users
        .create(&admin, root_id, "carol", &[])
        .await
        .unwrap();
    let users = SurrealUserRepository::new(env.db.clone());
    users
        .init_from_invite(invite.invite_code, STATIC_IDP_TYPE, "carol@idp")
        .await
        .unwrap();
    env.users
        .set_roles(
            &admin,
            invite.user_id,
            Some(other_root.id),
            &[ORGANIZATION_ADMIN_ROLE.to_string()],
        )
        .await
        .unwrap();
    let header = format!("Bearer {}", env.auth.issue("carol@idp").unwrap());
    let carol = env.identity.resolve(Some(&header)).await.unwrap();

    // Holding the permission inside an unrelated tree is not enough:
    // the target organization must sit in a subtree carol belongs to.
    let target = env
        .users
        .create(&admin, root_id, "dave", &[])
        .await
        .unwrap();
    let result = env
        .users
        .set_roles(
            &carol,
            target.user_id,
            Some(other_root.id),
            &[USER_ADMIN_ROLE.to_string()],
        )
        .await;
    assert!(matches!(result, Err(OrgwardError::Unauthorized)));
}

#[tokio::test]
async fn organization_details_gate_the_member_list() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    let details = env.orgs.details(&admin, root_id).await.unwrap();
    assert_eq!(details.organization.id, root_id);
    let members = details.users.expect("admin should see members");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].display_name, "root-admin");

    // A role-less member sees the node but not the member list, and
    // nothing outside their own subtree.
    let other_root = env.orgs.create(&admin, None, "Second Tree").await.unwrap();
    let invite = env
        .users
        .create(&admin, root_id, "viewer", &[])
        .await
        .unwrap();
    let users = SurrealUserRepository::new(env.db.clone());
    users
        .init_from_invite(invite.invite_code, STATIC_IDP_TYPE, "viewer@idp")
        .await
        .unwrap();
    let header = format!("Bearer {}", env.auth.issue("viewer@idp").unwrap());
    let viewer = env.identity.resolve(Some(&header)).await.unwrap();

    let visible = env.orgs.details(&viewer, root_id).await.unwrap();
    assert!(visible.users.is_none());
    assert!(matches!(
        env.orgs.details(&viewer, other_root.id).await,
        Err(OrgwardError::Unauthorized)
    ));
}

#[tokio::test]
async fn metadata_flows_down_the_tree() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    let child = env
        .orgs
        .create(&admin, Some(root_id), "Engineering")
        .await
        .unwrap();

    env.orgs
        .update_metadata(&admin, root_id, json!({"aws_account": "111122223333"}))
        .await
        .unwrap();

    let resolved = env
        .orgs
        .resolve_metadata(&admin, child.id, "aws_account")
        .await
        .unwrap();
    assert_eq!(resolved, Some(json!("111122223333")));
}

#[tokio::test]
async fn caller_tree_is_rooted_at_first_membership() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    let child = env
        .orgs
        .create(&admin, Some(root_id), "Engineering")
        .await
        .unwrap();
    // A separate root the admin is not a member of.
    env.orgs.create(&admin, None, "Second Tree").await.unwrap();

    let visible = env.orgs.caller_tree(&admin).await.unwrap();
    let ids: Vec<i64> = visible.iter().map(|o| o.id).collect();
    assert!(ids.contains(&root_id));
    assert!(ids.contains(&child.id));
    assert_eq!(ids.len(), 2);
}

#[tokio::test]
async fn user_creation_rejects_unknown_roles_before_writing() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    let result = env
        .users
        .create(&admin, root_id, "bob", &["Made Up Role".to_string()])
        .await;
    assert!(matches!(result, Err(OrgwardError::Validation { .. })));

    // No pending user was left behind.
    let details = env.orgs.details(&admin, root_id).await.unwrap();
    let members = details.users.unwrap();
    assert!(members.iter().all(|m| m.display_name != "bob"));
}

#[tokio::test]
async fn user_profiles_are_readable_by_self_and_admins_only() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    let invite = env
        .users
        .create(&admin, root_id, "alice", &[])
        .await
        .unwrap();
    let users = SurrealUserRepository::new(env.db.clone());
    users
        .init_from_invite(invite.invite_code, STATIC_IDP_TYPE, "alice@idp")
        .await
        .unwrap();
    let header = format!("Bearer {}", env.auth.issue("alice@idp").unwrap());
    let alice = env.identity.resolve(Some(&header)).await.unwrap();

    // Self-read works without any role.
    let own = env.users.get(&alice, alice.id).await.unwrap();
    assert_eq!(own.display_name, "alice");

    // Reading the admin requires user.read, which alice lacks.
    assert!(matches!(
        env.users.get(&alice, admin.id).await,
        Err(OrgwardError::Unauthorized)
    ));

    // The admin reads anyone.
    let read_back = env.users.get(&admin, alice.id).await.unwrap();
    assert_eq!(read_back.id, alice.id);
}

#[tokio::test]
async fn every_guarded_operation_leaves_a_sealed_audit_record() {
    let env = setup().await;
    let (admin, root_id) = bootstrap_admin(&env).await;

    env.orgs
        .create(&admin, Some(root_id), "Engineering")
        .await
        .unwrap();
    // A rejected operation is audited too.
    let _ = env.users.deactivate(&admin, admin.id).await;

    let mut result = env
        .db
        .query("SELECT count() AS total FROM audit_log WHERE current_state = 0 GROUP ALL")
        .await
        .unwrap();
    let open: Vec<serde_json::Value> = result.take(0).unwrap();
    assert!(
        open.is_empty() || open[0]["total"] == json!(0),
        "no audit record may stay open: {open:?}"
    );

    let mut result = env
        .db
        .query("SELECT count() AS total FROM audit_log WHERE current_state = 1 GROUP ALL")
        .await
        .unwrap();
    let sealed: Vec<serde_json::Value> = result.take(0).unwrap();
    assert!(sealed[0]["total"].as_u64().unwrap() >= 3);
}
