//! HTTP client for the internal platform backend. One client implements
//! every domain service trait; backend error codes are translated back into
//! the domain error enums the handlers match on.

use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use service_core::error::AppError;

use crate::config::BackendConfig;
use crate::metadata::Metadata;
use crate::services::*;

pub struct CoreClient {
    http: Client,
    base_url: String,
}

/// Error body the backend returns alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    code: String,
}

/// A failed backend call: either a coded domain error or a transport-level
/// failure.
#[derive(Debug)]
enum BackendFailure {
    Code { code: String, message: String },
    Transport(anyhow::Error),
}

impl BackendFailure {
    fn into_internal(self) -> anyhow::Error {
        match self {
            BackendFailure::Code { code, message } => {
                anyhow!("backend error {code}: {message}")
            }
            BackendFailure::Transport(err) => err,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: bool,
}

impl CoreClient {
    pub fn new(config: &BackendConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::ConfigError(anyhow!("backend client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendFailure> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendFailure::Transport(anyhow!("backend request failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| BackendFailure::Transport(anyhow!("backend response decode: {e}")));
        }
        let body = response
            .json::<BackendErrorBody>()
            .await
            .unwrap_or_else(|_| BackendErrorBody {
                error: status.to_string(),
                code: String::new(),
            });
        if body.code.is_empty() && status == StatusCode::UNAUTHORIZED {
            return Err(BackendFailure::Code {
                code: "unauthenticated".to_string(),
                message: body.error,
            });
        }
        Err(BackendFailure::Code {
            code: body.code,
            message: body.error,
        })
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), BackendFailure> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendFailure::Transport(anyhow!("backend request failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response
            .json::<BackendErrorBody>()
            .await
            .unwrap_or_else(|_| BackendErrorBody {
                error: status.to_string(),
                code: String::new(),
            });
        Err(BackendFailure::Code {
            code: body.code,
            message: body.error,
        })
    }
}

// ============================================================================
// Error code translation
// ============================================================================

fn org_error(failure: BackendFailure) -> OrganizationError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => OrganizationError::NotExist,
            "invalid_uuid" => OrganizationError::InvalidUuid,
            "invalid_detail" => OrganizationError::InvalidDetail,
            "conflict" => OrganizationError::Conflict,
            "invalid_email" => OrganizationError::InvalidEmail,
            "disabled" => OrganizationError::Disabled,
            _ => OrganizationError::Internal(failure.into_internal()),
        },
        transport => OrganizationError::Internal(transport.into_internal()),
    }
}

fn user_error(failure: BackendFailure) -> UserError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => UserError::NotExist,
            "invalid_uuid" => UserError::InvalidUuid,
            "invalid_email" => UserError::InvalidEmail,
            "invalid_detail" => UserError::InvalidDetail,
            "conflict" => UserError::Conflict,
            "disabled" => UserError::Disabled,
            _ => UserError::Internal(failure.into_internal()),
        },
        transport => UserError::Internal(transport.into_internal()),
    }
}

fn domain_error(failure: BackendFailure) -> DomainError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => DomainError::NotExist,
            "duplicate_key" => DomainError::DuplicateKey,
            "invalid_domain" => DomainError::InvalidDomain,
            "txt_record_not_found" => DomainError::TxtRecordNotFound,
            "domains_mismatch" => DomainError::DomainsMismatch,
            _ => DomainError::Internal(failure.into_internal()),
        },
        transport => DomainError::Internal(transport.into_internal()),
    }
}

fn invitation_error(failure: BackendFailure) -> InvitationError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => InvitationError::NotFound,
            "already_member" => InvitationError::AlreadyMember,
            "expired" => InvitationError::Expired,
            _ => InvitationError::Internal(failure.into_internal()),
        },
        transport => InvitationError::Internal(transport.into_internal()),
    }
}

fn service_user_error(failure: BackendFailure) -> ServiceUserError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => ServiceUserError::NotExist,
            "cred_not_found" => ServiceUserError::CredNotExist,
            "disabled" => ServiceUserError::Disabled,
            "invalid_id" => ServiceUserError::InvalidId,
            _ => ServiceUserError::Internal(failure.into_internal()),
        },
        transport => ServiceUserError::Internal(transport.into_internal()),
    }
}

fn metaschema_error(failure: BackendFailure) -> MetaSchemaError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => MetaSchemaError::NotExist,
            "invalid_id" => MetaSchemaError::InvalidId,
            "invalid_detail" => MetaSchemaError::InvalidDetail,
            "conflict" => MetaSchemaError::Conflict,
            "metadata_mismatch" => MetaSchemaError::MetadataMismatch,
            _ => MetaSchemaError::Internal(failure.into_internal()),
        },
        transport => MetaSchemaError::Internal(transport.into_internal()),
    }
}

fn permission_error(failure: BackendFailure) -> PermissionError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => PermissionError::NotExist,
            "invalid_id" => PermissionError::InvalidId,
            "invalid_detail" => PermissionError::InvalidDetail,
            _ => PermissionError::Internal(failure.into_internal()),
        },
        transport => PermissionError::Internal(transport.into_internal()),
    }
}

fn relation_error(failure: BackendFailure) -> RelationError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => RelationError::NotExist,
            "invalid_detail" => RelationError::InvalidDetail,
            _ => RelationError::Internal(failure.into_internal()),
        },
        transport => RelationError::Internal(transport.into_internal()),
    }
}

fn resource_error(failure: BackendFailure) -> ResourceError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => ResourceError::NotExist,
            "invalid_detail" => ResourceError::InvalidDetail,
            "invalid_namespace" => ResourceError::InvalidNamespace,
            _ => ResourceError::Internal(failure.into_internal()),
        },
        transport => ResourceError::Internal(transport.into_internal()),
    }
}

fn policy_error(failure: BackendFailure) -> PolicyError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => PolicyError::NotExist,
            "invalid_detail" => PolicyError::InvalidDetail,
            _ => PolicyError::Internal(failure.into_internal()),
        },
        transport => PolicyError::Internal(transport.into_internal()),
    }
}

fn project_error(failure: BackendFailure) -> ProjectError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => ProjectError::NotExist,
            "invalid_detail" => ProjectError::InvalidDetail,
            _ => ProjectError::Internal(failure.into_internal()),
        },
        transport => ProjectError::Internal(transport.into_internal()),
    }
}

fn authn_error(failure: BackendFailure) -> AuthnError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "unauthenticated" | "not_found" => AuthnError::Unauthenticated,
            "disabled" => AuthnError::Disabled,
            _ => AuthnError::Internal(failure.into_internal()),
        },
        transport => AuthnError::Internal(transport.into_internal()),
    }
}

fn pat_error(failure: BackendFailure) -> PatError {
    match failure {
        BackendFailure::Code { ref code, .. } => match code.as_str() {
            "not_found" => PatError::NotFound,
            _ => PatError::Internal(failure.into_internal()),
        },
        transport => PatError::Internal(transport.into_internal()),
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

#[async_trait]
impl OrganizationService for CoreClient {
    async fn get(&self, id_or_name: &str) -> Result<Organization, OrganizationError> {
        self.send(self.http.get(self.url(&format!("/internal/organizations/{id_or_name}"))))
            .await
            .map_err(org_error)
    }

    async fn get_raw(&self, id_or_name: &str) -> Result<Organization, OrganizationError> {
        self.send(
            self.http
                .get(self.url(&format!("/internal/organizations/{id_or_name}")))
                .query(&[("include_disabled", "true")]),
        )
        .await
        .map_err(org_error)
    }

    async fn create(&self, org: Organization) -> Result<Organization, OrganizationError> {
        self.send(self.http.post(self.url("/internal/organizations")).json(&org))
            .await
            .map_err(org_error)
    }

    async fn update(&self, org: Organization) -> Result<Organization, OrganizationError> {
        self.send(
            self.http
                .put(self.url(&format!("/internal/organizations/{}", org.id)))
                .json(&org),
        )
        .await
        .map_err(org_error)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Organization>, OrganizationError> {
        self.send(
            self.http
                .get(self.url("/internal/organizations"))
                .query(&[("user_id", user_id)]),
        )
        .await
        .map_err(org_error)
    }

    async fn list(
        &self,
        state: Option<OrgState>,
    ) -> Result<Vec<Organization>, OrganizationError> {
        let mut request = self.http.get(self.url("/internal/organizations"));
        if let Some(state) = state {
            let state = match state {
                OrgState::Enabled => "enabled",
                OrgState::Disabled => "disabled",
            };
            request = request.query(&[("state", state)]);
        }
        self.send(request).await.map_err(org_error)
    }

    async fn enable(&self, id: &str) -> Result<(), OrganizationError> {
        self.send_empty(self.http.post(self.url(&format!("/internal/organizations/{id}/enable"))))
            .await
            .map_err(org_error)
    }

    async fn disable(&self, id: &str) -> Result<(), OrganizationError> {
        self.send_empty(
            self.http
                .post(self.url(&format!("/internal/organizations/{id}/disable"))),
        )
        .await
        .map_err(org_error)
    }

    async fn add_users(
        &self,
        org_id: &str,
        user_ids: &[String],
    ) -> Result<(), OrganizationError> {
        self.send_empty(
            self.http
                .post(self.url(&format!("/internal/organizations/{org_id}/users")))
                .json(&serde_json::json!({ "user_ids": user_ids })),
        )
        .await
        .map_err(org_error)
    }

    async fn remove_user(&self, org_id: &str, user_id: &str) -> Result<(), OrganizationError> {
        self.send_empty(
            self.http
                .delete(self.url(&format!("/internal/organizations/{org_id}/users/{user_id}"))),
        )
        .await
        .map_err(org_error)
    }
}

#[async_trait]
impl UserService for CoreClient {
    async fn get_by_id(&self, id: &str) -> Result<User, UserError> {
        self.send(self.http.get(self.url(&format!("/internal/users/{id}"))))
            .await
            .map_err(user_error)
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<User>, UserError> {
        self.send(
            self.http
                .post(self.url("/internal/users/lookup"))
                .json(&serde_json::json!({ "ids": ids })),
        )
        .await
        .map_err(user_error)
    }

    async fn create(&self, user: User) -> Result<User, UserError> {
        self.send(self.http.post(self.url("/internal/users")).json(&user))
            .await
            .map_err(user_error)
    }

    async fn update(&self, user: User) -> Result<User, UserError> {
        self.send(
            self.http
                .put(self.url(&format!("/internal/users/{}", user.id)))
                .json(&user),
        )
        .await
        .map_err(user_error)
    }

    async fn list(
        &self,
        keyword: Option<&str>,
        state: Option<&str>,
    ) -> Result<Vec<User>, UserError> {
        let mut request = self.http.get(self.url("/internal/users"));
        if let Some(keyword) = keyword {
            request = request.query(&[("keyword", keyword)]);
        }
        if let Some(state) = state {
            request = request.query(&[("state", state)]);
        }
        self.send(request).await.map_err(user_error)
    }

    async fn list_by_org(
        &self,
        org_id: &str,
        permission_filter: &str,
    ) -> Result<Vec<User>, UserError> {
        self.send(
            self.http
                .get(self.url(&format!("/internal/organizations/{org_id}/users")))
                .query(&[("permission", permission_filter)]),
        )
        .await
        .map_err(user_error)
    }

    async fn enable(&self, id: &str) -> Result<(), UserError> {
        self.send_empty(self.http.post(self.url(&format!("/internal/users/{id}/enable"))))
            .await
            .map_err(user_error)
    }

    async fn disable(&self, id: &str) -> Result<(), UserError> {
        self.send_empty(self.http.post(self.url(&format!("/internal/users/{id}/disable"))))
            .await
            .map_err(user_error)
    }

    async fn delete(&self, id: &str) -> Result<(), UserError> {
        self.send_empty(self.http.delete(self.url(&format!("/internal/users/{id}"))))
            .await
            .map_err(user_error)
    }

    async fn is_sudo(&self, id: &str, permission: &str) -> Result<bool, UserError> {
        let body: StatusBody = self
            .send(
                self.http
                    .get(self.url(&format!("/internal/users/{id}/sudo")))
                    .query(&[("permission", permission)]),
            )
            .await
            .map_err(user_error)?;
        Ok(body.status)
    }

    async fn sudo(&self, id: &str, relation: &str) -> Result<(), UserError> {
        self.send_empty(
            self.http
                .post(self.url(&format!("/internal/users/{id}/sudo")))
                .json(&serde_json::json!({ "relation": relation })),
        )
        .await
        .map_err(user_error)
    }

    async fn unsudo(&self, id: &str) -> Result<(), UserError> {
        self.send_empty(self.http.delete(self.url(&format!("/internal/users/{id}/sudo"))))
            .await
            .map_err(user_error)
    }
}

#[async_trait]
impl DomainService for CoreClient {
    async fn get(&self, id: &str) -> Result<Domain, DomainError> {
        self.send(self.http.get(self.url(&format!("/internal/domains/{id}"))))
            .await
            .map_err(domain_error)
    }

    async fn create(&self, domain: Domain) -> Result<Domain, DomainError> {
        self.send(self.http.post(self.url("/internal/domains")).json(&domain))
            .await
            .map_err(domain_error)
    }

    async fn list(&self, filter: DomainFilter) -> Result<Vec<Domain>, DomainError> {
        let mut request = self.http.get(self.url("/internal/domains"));
        if let Some(org_id) = filter.org_id {
            request = request.query(&[("org_id", org_id)]);
        }
        if let Some(state) = filter.state {
            let state = match state {
                DomainState::Pending => "pending",
                DomainState::Verified => "verified",
            };
            request = request.query(&[("state", state)]);
        }
        if let Some(name) = filter.name {
            request = request.query(&[("name", name)]);
        }
        self.send(request).await.map_err(domain_error)
    }

    async fn delete(&self, id: &str) -> Result<(), DomainError> {
        self.send_empty(self.http.delete(self.url(&format!("/internal/domains/{id}"))))
            .await
            .map_err(domain_error)
    }

    async fn verify_domain(&self, id: &str) -> Result<Domain, DomainError> {
        self.send(self.http.post(self.url(&format!("/internal/domains/{id}/verify"))))
            .await
            .map_err(domain_error)
    }

    async fn join(&self, org_id: &str, user_id: &str) -> Result<(), DomainError> {
        self.send_empty(
            self.http
                .post(self.url(&format!("/internal/organizations/{org_id}/join")))
                .json(&serde_json::json!({ "user_id": user_id })),
        )
        .await
        .map_err(domain_error)
    }
}

#[async_trait]
impl InvitationService for CoreClient {
    async fn get(&self, id: Uuid) -> Result<Invitation, InvitationError> {
        self.send(self.http.get(self.url(&format!("/internal/invitations/{id}"))))
            .await
            .map_err(invitation_error)
    }

    async fn create(&self, invitation: Invitation) -> Result<Invitation, InvitationError> {
        self.send(self.http.post(self.url("/internal/invitations")).json(&invitation))
            .await
            .map_err(invitation_error)
    }

    async fn list(&self, filter: InvitationFilter) -> Result<Vec<Invitation>, InvitationError> {
        let mut request = self.http.get(self.url("/internal/invitations"));
        if let Some(org_id) = filter.org_id {
            request = request.query(&[("org_id", org_id)]);
        }
        if let Some(user_id) = filter.user_id {
            request = request.query(&[("user_id", user_id)]);
        }
        self.send(request).await.map_err(invitation_error)
    }

    async fn accept(&self, id: Uuid) -> Result<(), InvitationError> {
        self.send_empty(self.http.post(self.url(&format!("/internal/invitations/{id}/accept"))))
            .await
            .map_err(invitation_error)
    }

    async fn delete(&self, id: Uuid) -> Result<(), InvitationError> {
        self.send_empty(self.http.delete(self.url(&format!("/internal/invitations/{id}"))))
            .await
            .map_err(invitation_error)
    }
}

#[async_trait]
impl ServiceUserService for CoreClient {
    async fn get(&self, id: &str) -> Result<ServiceUser, ServiceUserError> {
        self.send(self.http.get(self.url(&format!("/internal/serviceusers/{id}"))))
            .await
            .map_err(service_user_error)
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<ServiceUser>, ServiceUserError> {
        self.send(
            self.http
                .post(self.url("/internal/serviceusers/lookup"))
                .json(&serde_json::json!({ "ids": ids })),
        )
        .await
        .map_err(service_user_error)
    }

    async fn create(&self, service_user: ServiceUser) -> Result<ServiceUser, ServiceUserError> {
        self.send(self.http.post(self.url("/internal/serviceusers")).json(&service_user))
            .await
            .map_err(service_user_error)
    }

    async fn list(
        &self,
        filter: ServiceUserFilter,
    ) -> Result<Vec<ServiceUser>, ServiceUserError> {
        let mut request = self.http.get(self.url("/internal/serviceusers"));
        if let Some(org_id) = filter.org_id {
            request = request.query(&[("org_id", org_id)]);
        }
        if let Some(state) = filter.state {
            request = request.query(&[("state", state)]);
        }
        self.send(request).await.map_err(service_user_error)
    }

    async fn list_by_org(&self, org_id: &str) -> Result<Vec<ServiceUser>, ServiceUserError> {
        self.send(
            self.http
                .get(self.url("/internal/serviceusers"))
                .query(&[("org_id", org_id)]),
        )
        .await
        .map_err(service_user_error)
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceUserError> {
        self.send_empty(self.http.delete(self.url(&format!("/internal/serviceusers/{id}"))))
            .await
            .map_err(service_user_error)
    }

    async fn create_secret(
        &self,
        service_user_id: &str,
        title: &str,
    ) -> Result<SecretCredential, ServiceUserError> {
        self.send(
            self.http
                .post(self.url(&format!("/internal/serviceusers/{service_user_id}/secrets")))
                .json(&serde_json::json!({ "title": title })),
        )
        .await
        .map_err(service_user_error)
    }

    async fn list_secret(
        &self,
        service_user_id: &str,
    ) -> Result<Vec<SecretCredential>, ServiceUserError> {
        self.send(
            self.http
                .get(self.url(&format!("/internal/serviceusers/{service_user_id}/secrets"))),
        )
        .await
        .map_err(service_user_error)
    }

    async fn delete_secret(
        &self,
        service_user_id: &str,
        secret_id: Uuid,
    ) -> Result<(), ServiceUserError> {
        self.send_empty(self.http.delete(self.url(&format!(
            "/internal/serviceusers/{service_user_id}/secrets/{secret_id}"
        ))))
        .await
        .map_err(service_user_error)
    }

    async fn create_token(
        &self,
        service_user_id: &str,
        title: &str,
    ) -> Result<ServiceUserToken, ServiceUserError> {
        self.send(
            self.http
                .post(self.url(&format!("/internal/serviceusers/{service_user_id}/tokens")))
                .json(&serde_json::json!({ "title": title })),
        )
        .await
        .map_err(service_user_error)
    }

    async fn list_token(
        &self,
        service_user_id: &str,
    ) -> Result<Vec<ServiceUserToken>, ServiceUserError> {
        self.send(
            self.http
                .get(self.url(&format!("/internal/serviceusers/{service_user_id}/tokens"))),
        )
        .await
        .map_err(service_user_error)
    }

    async fn delete_token(
        &self,
        service_user_id: &str,
        token_id: Uuid,
    ) -> Result<(), ServiceUserError> {
        self.send_empty(self.http.delete(self.url(&format!(
            "/internal/serviceusers/{service_user_id}/tokens/{token_id}"
        ))))
        .await
        .map_err(service_user_error)
    }

    async fn list_owned_projects(
        &self,
        service_user_id: &str,
    ) -> Result<Vec<String>, ServiceUserError> {
        self.send(
            self.http
                .get(self.url(&format!("/internal/serviceusers/{service_user_id}/project-ids"))),
        )
        .await
        .map_err(service_user_error)
    }

    async fn is_sudo(&self, id: &str, permission: &str) -> Result<bool, ServiceUserError> {
        let body: StatusBody = self
            .send(
                self.http
                    .get(self.url(&format!("/internal/serviceusers/{id}/sudo")))
                    .query(&[("permission", permission)]),
            )
            .await
            .map_err(service_user_error)?;
        Ok(body.status)
    }

    async fn sudo(&self, id: &str, relation: &str) -> Result<(), ServiceUserError> {
        self.send_empty(
            self.http
                .post(self.url(&format!("/internal/serviceusers/{id}/sudo")))
                .json(&serde_json::json!({ "relation": relation })),
        )
        .await
        .map_err(service_user_error)
    }

    async fn unsudo(&self, id: &str) -> Result<(), ServiceUserError> {
        self.send_empty(
            self.http
                .delete(self.url(&format!("/internal/serviceusers/{id}/sudo"))),
        )
        .await
        .map_err(service_user_error)
    }
}

#[async_trait]
impl MetaSchemaService for CoreClient {
    async fn get(&self, id: &str) -> Result<MetaSchema, MetaSchemaError> {
        self.send(self.http.get(self.url(&format!("/internal/metaschemas/{id}"))))
            .await
            .map_err(metaschema_error)
    }

    async fn create(&self, schema: MetaSchema) -> Result<MetaSchema, MetaSchemaError> {
        self.send(self.http.post(self.url("/internal/metaschemas")).json(&schema))
            .await
            .map_err(metaschema_error)
    }

    async fn list(&self) -> Result<Vec<MetaSchema>, MetaSchemaError> {
        self.send(self.http.get(self.url("/internal/metaschemas")))
            .await
            .map_err(metaschema_error)
    }

    async fn update(&self, id: &str, schema: MetaSchema) -> Result<MetaSchema, MetaSchemaError> {
        self.send(
            self.http
                .put(self.url(&format!("/internal/metaschemas/{id}")))
                .json(&schema),
        )
        .await
        .map_err(metaschema_error)
    }

    async fn delete(&self, id: &str) -> Result<(), MetaSchemaError> {
        self.send_empty(self.http.delete(self.url(&format!("/internal/metaschemas/{id}"))))
            .await
            .map_err(metaschema_error)
    }

    async fn validate(&self, metadata: &Metadata, name: &str) -> Result<(), MetaSchemaError> {
        self.send_empty(
            self.http
                .post(self.url(&format!("/internal/metaschemas/{name}/validate")))
                .json(metadata),
        )
        .await
        .map_err(metaschema_error)
    }
}

#[async_trait]
impl PermissionService for CoreClient {
    async fn get(&self, id_or_slug: &str) -> Result<Permission, PermissionError> {
        self.send(
            self.http
                .get(self.url("/internal/permissions/resolve"))
                .query(&[("ref", id_or_slug)]),
        )
        .await
        .map_err(permission_error)
    }
}

#[async_trait]
impl RelationService for CoreClient {
    async fn list_relations(
        &self,
        object: Object,
        subject_namespace: &str,
        relation_name: &str,
    ) -> Result<Vec<Relation>, RelationError> {
        self.send(self.http.get(self.url("/internal/relations")).query(&[
            ("object_id", object.id.as_str()),
            ("object_namespace", object.namespace.as_str()),
            ("subject_namespace", subject_namespace),
            ("relation", relation_name),
        ]))
        .await
        .map_err(relation_error)
    }
}

#[async_trait]
impl ResourceService for CoreClient {
    async fn check_authz(&self, check: Check) -> Result<bool, ResourceError> {
        let body: StatusBody = self
            .send(self.http.post(self.url("/internal/check")).json(&check))
            .await
            .map_err(resource_error)?;
        Ok(body.status)
    }

    async fn batch_check(&self, checks: Vec<Check>) -> Result<Vec<CheckPair>, ResourceError> {
        self.send(
            self.http
                .post(self.url("/internal/batchcheck"))
                .json(&serde_json::json!({ "checks": checks })),
        )
        .await
        .map_err(resource_error)
    }
}

#[async_trait]
impl PolicyService for CoreClient {
    async fn list_roles(&self, org_id: &str, user_id: &str) -> Result<Vec<Role>, PolicyError> {
        self.send(self.http.get(self.url("/internal/roles")).query(&[
            ("org_id", org_id),
            ("user_id", user_id),
        ]))
        .await
        .map_err(policy_error)
    }
}

#[async_trait]
impl ProjectService for CoreClient {
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Project>, ProjectError> {
        self.send(
            self.http
                .post(self.url("/internal/projects/lookup"))
                .json(&serde_json::json!({ "ids": ids })),
        )
        .await
        .map_err(project_error)
    }
}

#[async_trait]
impl AuthnService for CoreClient {
    async fn get_principal(&self, token: &str) -> Result<Principal, AuthnError> {
        self.send(
            self.http
                .get(self.url("/internal/principal"))
                .bearer_auth(token),
        )
        .await
        .map_err(authn_error)
    }
}

#[async_trait]
impl UserPatService for CoreClient {
    async fn create(&self, pat: PatCreate) -> Result<PersonalAccessToken, PatError> {
        self.send(
            self.http
                .post(self.url(&format!("/internal/users/{}/tokens", pat.user_id)))
                .json(&serde_json::json!({
                    "org_id": pat.org_id,
                    "title": pat.title,
                    "expires_at": pat.expires_at,
                })),
        )
        .await
        .map_err(pat_error)
    }

    async fn list(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Vec<PersonalAccessToken>, PatError> {
        self.send(
            self.http
                .get(self.url(&format!("/internal/users/{user_id}/tokens")))
                .query(&[("org_id", org_id)]),
        )
        .await
        .map_err(pat_error)
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<(), PatError> {
        self.send_empty(
            self.http
                .delete(self.url(&format!("/internal/users/{user_id}/tokens/{id}"))),
        )
        .await
        .map_err(pat_error)
    }
}
