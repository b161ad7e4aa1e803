//! Resource provisioning: the registered-resource catalog, request
//! dispatch by internal key, and the per-provider operations with their
//! two-person approval rules.

use orgward_core::error::{OrgwardError, OrgwardResult};
use orgward_core::id;
use orgward_core::models::audit::AuditRecord;
use orgward_core::models::resource::{
    ProvisionRecord, ProvisionState, RegisteredResource, ResourceKind,
};
use orgward_core::models::user::OrganizationUser;
use orgward_core::permissions;
use orgward_core::repository::{
    AuditRepository, OrganizationRepository, RbacRepository, ResourceRepository,
};
use serde_json::json;

use crate::actions::aws_iam::{self, CreateIamUserRequest, IamUserState};
use crate::actions::gcp_service_account::{
    self, CreateServiceAccountKeyRequest, CreateServiceAccountRequest, ServiceAccountKey,
    ServiceAccountState,
};
use crate::access;
use crate::audit::seal_outcome;

/// The verbs the dispatcher routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOperation {
    Create,
    Approve,
    List,
}

pub struct ProvisioningService<O, R, Res, A>
where
    O: OrganizationRepository,
    R: RbacRepository,
    Res: ResourceRepository,
    A: AuditRepository,
{
    organizations: O,
    rbac: R,
    resources: Res,
    audits: A,
}

impl<O, R, Res, A> ProvisioningService<O, R, Res, A>
where
    O: OrganizationRepository,
    R: RbacRepository,
    Res: ResourceRepository,
    A: AuditRepository,
{
    pub fn new(organizations: O, rbac: R, resources: Res, audits: A) -> Self {
        Self {
            organizations,
            rbac,
            resources,
            audits,
        }
    }

    /// The catalog of provisionable resource types, for authenticated
    /// callers.
    pub async fn list_registered(
        &self,
        _actor: &OrganizationUser,
    ) -> OrgwardResult<Vec<RegisteredResource>> {
        self.resources.list_registered().await
    }

    /// Route a provisioning request to the provider identified by
    /// `internal_key`. Unknown keys and unsupported verbs are NotFound;
    /// a disabled catalog entry is a precondition failure.
    pub async fn dispatch(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        internal_key: &str,
        operation: ResourceOperation,
        payload: serde_json::Value,
    ) -> OrgwardResult<serde_json::Value> {
        let method = match operation {
            ResourceOperation::Create => "POST",
            ResourceOperation::Approve => "PUT",
            ResourceOperation::List => "GET",
        };
        let mut record = AuditRecord::new(internal_key, method);
        record.organization_user_id = actor.id;
        record.organization_id = organization_id;
        let record = self.audits.open(record).await?;

        let outcome = self
            .dispatch_inner(actor, organization_id, internal_key, operation, payload)
            .await;

        let (text, meta) = match &outcome {
            Ok(_) => (
                format!("{internal_key} {method} succeeded"),
                json!({"internal_key": internal_key}),
            ),
            Err(e) => (format!("{internal_key} {method} rejected: {e}"), json!({})),
        };
        seal_outcome(&self.audits, record.id, &text, meta, &outcome).await?;
        outcome
    }

    async fn dispatch_inner(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        internal_key: &str,
        operation: ResourceOperation,
        payload: serde_json::Value,
    ) -> OrgwardResult<serde_json::Value> {
        self.require_enabled(internal_key).await?;

        match (internal_key, operation) {
            ("aws.iam.user", ResourceOperation::Create) => {
                let request: CreateIamUserRequest = parse_payload(payload)?;
                let record = self
                    .aws_iam_create(actor, organization_id, request)
                    .await?;
                serialize_record(record)
            }
            ("aws.iam.user", ResourceOperation::Approve) => {
                let request: ApproveRequest = parse_payload(payload)?;
                let record = self.aws_iam_approve(actor, request.id).await?;
                serialize_record(record)
            }
            ("gcp.serviceaccount", ResourceOperation::Create) => {
                let request: CreateServiceAccountRequest = parse_payload(payload)?;
                let record = self
                    .gcp_service_account_create(actor, organization_id, request)
                    .await?;
                serialize_record(record)
            }
            ("gcp.serviceaccount", ResourceOperation::List) => {
                let records = self
                    .gcp_service_account_list(actor, organization_id)
                    .await?;
                serde_json::to_value(records)
                    .map_err(|e| OrgwardError::Internal(e.to_string()))
            }
            ("gcp.serviceaccount.keys", ResourceOperation::Create) => {
                let request: CreateServiceAccountKeyRequest = parse_payload(payload)?;
                let key = self
                    .gcp_service_account_key_create(actor, organization_id, request)
                    .await?;
                serde_json::to_value(key)
                    .map_err(|e| OrgwardError::Internal(e.to_string()))
            }
            ("gcp.serviceaccount.keys", ResourceOperation::List) => {
                let request: CreateServiceAccountKeyRequest = parse_payload(payload)?;
                let keys = self
                    .gcp_service_account_key_list(actor, organization_id, &request.email)
                    .await?;
                serde_json::to_value(keys)
                    .map_err(|e| OrgwardError::Internal(e.to_string()))
            }
            _ => Err(OrgwardError::NotFound {
                entity: "resource operation".into(),
                id: internal_key.to_string(),
            }),
        }
    }

    /// Provision a pending IAM user. The caller needs the AWS create
    /// permission at the organization; the record starts unapproved.
    pub async fn aws_iam_create(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        request: CreateIamUserRequest,
    ) -> OrgwardResult<ProvisionRecord> {
        aws_iam::validate_user_name(&request.user_name)?;

        let organization = self.organizations.get_by_id(organization_id).await?;
        if !access::holds_permission(
            &self.rbac,
            actor.id,
            &organization.path,
            permissions::AWS_IAM_USER_CREATE,
        )
        .await?
        {
            return Err(OrgwardError::Unauthorized);
        }

        let aws_account = self
            .required_tenant_value(&organization.path, "aws_account")
            .await?;

        let state = IamUserState {
            current_state: ProvisionState::CreatedNotApproved,
            created_by: actor.id,
            organization_id,
            aws_account,
            request: request.clone(),
        };

        let record = ProvisionRecord {
            id: id::next_id(),
            external_ref: request.user_name,
            state: serde_json::to_value(&state)
                .map_err(|e| OrgwardError::Internal(e.to_string()))?,
        };

        self.resources
            .create_record(ResourceKind::AwsIamUser, record.clone())
            .await?;

        Ok(record)
    }

    /// Approve a pending IAM user. The approver needs the create
    /// permission at the organization the record was made for, and must
    /// be a different user than the maker; approval is terminal.
    pub async fn aws_iam_approve(
        &self,
        actor: &OrganizationUser,
        record_id: i64,
    ) -> OrgwardResult<ProvisionRecord> {
        let record = self
            .resources
            .get_record(ResourceKind::AwsIamUser, record_id)
            .await?
            .ok_or_else(|| OrgwardError::NotFound {
                entity: "resource_aws_iam".into(),
                id: record_id.to_string(),
            })?;

        let mut state: IamUserState = serde_json::from_value(record.state.clone())
            .map_err(|e| OrgwardError::Internal(e.to_string()))?;

        // The permission is evaluated against the owning organization,
        // not against whatever organization the caller addressed.
        let owning = self.organizations.get_by_id(state.organization_id).await?;
        if !access::holds_permission(
            &self.rbac,
            actor.id,
            &owning.path,
            permissions::AWS_IAM_USER_CREATE,
        )
        .await?
        {
            return Err(OrgwardError::Unauthorized);
        }

        // Maker and checker must differ.
        if state.created_by == actor.id {
            return Err(OrgwardError::Unauthorized);
        }

        state.current_state = ProvisionState::Approved;
        let state_value = serde_json::to_value(&state)
            .map_err(|e| OrgwardError::Internal(e.to_string()))?;
        self.resources
            .update_record_state(ResourceKind::AwsIamUser, record_id, state_value.clone())
            .await?;

        Ok(ProvisionRecord {
            state: state_value,
            ..record
        })
    }

    /// Provision a service account in the project configured on the
    /// organization tree. No approval step for this provider.
    pub async fn gcp_service_account_create(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        request: CreateServiceAccountRequest,
    ) -> OrgwardResult<ProvisionRecord> {
        gcp_service_account::validate_account_id(&request.account_id)?;

        let organization = self.organizations.get_by_id(organization_id).await?;
        if !access::holds_permission(
            &self.rbac,
            actor.id,
            &organization.path,
            permissions::GCP_SERVICE_ACCOUNT_WRITE,
        )
        .await?
        {
            return Err(OrgwardError::Unauthorized);
        }

        let project = self
            .required_tenant_value(&organization.path, "gcp_project")
            .await?;

        let state = ServiceAccountState {
            created_by: actor.id,
            organization_id,
            project: project.clone(),
            request: request.clone(),
            keys: Vec::new(),
        };

        let record = ProvisionRecord {
            id: id::next_id(),
            external_ref: gcp_service_account::service_account_email(
                &request.account_id,
                &project,
            ),
            state: serde_json::to_value(&state)
                .map_err(|e| OrgwardError::Internal(e.to_string()))?,
        };

        self.resources
            .create_record(ResourceKind::GcpServiceAccount, record.clone())
            .await?;

        Ok(record)
    }

    /// List provisioned service accounts belonging to the
    /// organization's project, for callers with the GCP read permission
    /// there. Records of other tenants are never returned.
    pub async fn gcp_service_account_list(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
    ) -> OrgwardResult<Vec<ProvisionRecord>> {
        let organization = self.organizations.get_by_id(organization_id).await?;
        if !access::holds_permission(
            &self.rbac,
            actor.id,
            &organization.path,
            permissions::GCP_SERVICE_ACCOUNT_READ,
        )
        .await?
        {
            return Err(OrgwardError::Unauthorized);
        }

        let project = self
            .required_tenant_value(&organization.path, "gcp_project")
            .await?;

        let records = self
            .resources
            .list_records(ResourceKind::GcpServiceAccount)
            .await?;
        let mut owned = Vec::new();
        for record in records {
            let state: ServiceAccountState = serde_json::from_value(record.state.clone())
                .map_err(|e| OrgwardError::Internal(e.to_string()))?;
            if state.project == project {
                owned.push(record);
            }
        }
        Ok(owned)
    }

    /// Mint a key for an existing service account and persist it on the
    /// record's state. The account must belong to the organization's
    /// project.
    pub async fn gcp_service_account_key_create(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        request: CreateServiceAccountKeyRequest,
    ) -> OrgwardResult<ServiceAccountKey> {
        let organization = self.organizations.get_by_id(organization_id).await?;
        if !access::holds_permission(
            &self.rbac,
            actor.id,
            &organization.path,
            permissions::GCP_SERVICE_ACCOUNT_WRITE,
        )
        .await?
        {
            return Err(OrgwardError::Unauthorized);
        }

        let project = self
            .required_tenant_value(&organization.path, "gcp_project")
            .await?;

        let (record, mut state) = self.owned_account(&request.email, &project).await?;

        let key = ServiceAccountKey {
            name: gcp_service_account::key_name(&project, &request.email, id::next_id()),
        };
        state.keys.push(key.clone());

        let state_value = serde_json::to_value(&state)
            .map_err(|e| OrgwardError::Internal(e.to_string()))?;
        self.resources
            .update_record_state(ResourceKind::GcpServiceAccount, record.id, state_value)
            .await?;

        Ok(key)
    }

    /// The names of the keys held by one of the organization's service
    /// accounts.
    pub async fn gcp_service_account_key_list(
        &self,
        actor: &OrganizationUser,
        organization_id: i64,
        email: &str,
    ) -> OrgwardResult<Vec<String>> {
        let organization = self.organizations.get_by_id(organization_id).await?;
        if !access::holds_permission(
            &self.rbac,
            actor.id,
            &organization.path,
            permissions::GCP_SERVICE_ACCOUNT_READ,
        )
        .await?
        {
            return Err(OrgwardError::Unauthorized);
        }

        let project = self
            .required_tenant_value(&organization.path, "gcp_project")
            .await?;

        let (_, state) = self.owned_account(email, &project).await?;
        Ok(state.keys.into_iter().map(|k| k.name).collect())
    }

    /// Load a service-account record by email and check it belongs to
    /// the given project. Accounts of other tenants read as missing.
    async fn owned_account(
        &self,
        email: &str,
        project: &str,
    ) -> OrgwardResult<(ProvisionRecord, ServiceAccountState)> {
        let not_found = || OrgwardError::NotFound {
            entity: "resource_gcp_service_account".into(),
            id: email.to_string(),
        };

        let record = self
            .resources
            .get_record_by_ref(ResourceKind::GcpServiceAccount, email)
            .await?
            .ok_or_else(not_found)?;
        let state: ServiceAccountState = serde_json::from_value(record.state.clone())
            .map_err(|e| OrgwardError::Internal(e.to_string()))?;
        if state.project != project {
            return Err(not_found());
        }
        Ok((record, state))
    }

    /// Resolve a provider identifier through metadata inheritance; a
    /// tree that configures nothing for `key` fails the precondition.
    async fn required_tenant_value(&self, path: &str, key: &str) -> OrgwardResult<String> {
        self.organizations
            .resolve_metadata(path, key)
            .await?
            .and_then(|hit| {
                hit.metadata
                    .get(key)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                OrgwardError::precondition(format!(
                    "no {key} configured anywhere in the organization tree",
                ))
            })
    }

    async fn require_enabled(&self, internal_key: &str) -> OrgwardResult<()> {
        let catalog = self.resources.list_registered().await?;
        let entry = catalog
            .iter()
            .find(|r| r.internal_key == internal_key)
            .ok_or_else(|| OrgwardError::NotFound {
                entity: "registered_resource".into(),
                id: internal_key.to_string(),
            })?;
        if !entry.enabled {
            return Err(OrgwardError::precondition(format!(
                "resource '{internal_key}' is disabled",
            )));
        }
        Ok(())
    }
}

#[derive(Debug, serde::Deserialize)]
struct ApproveRequest {
    #[serde(with = "orgward_core::models::i64_string")]
    id: i64,
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: serde_json::Value) -> OrgwardResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| OrgwardError::validation(format!("invalid request payload: {e}")))
}

fn serialize_record(record: ProvisionRecord) -> OrgwardResult<serde_json::Value> {
    serde_json::to_value(record).map_err(|e| OrgwardError::Internal(e.to_string()))
}
