//! Service user handlers: lifecycle, client-secret and static-token
//! credentials, and project access listings. Credential plaintext is
//! returned only by the create endpoints.

use anyhow::anyhow;
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use service_core::error::AppError;

use crate::handlers::authz;
use crate::handlers::org::resolve_org;
use crate::metadata::{self, Metadata};
use crate::schema;
use crate::services::{
    Check, Object, Principal, Project, SecretCredential, ServiceUser, ServiceUserError,
    ServiceUserFilter, ServiceUserToken, Subject,
};
use crate::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateServiceUserRequest {
    pub org_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
pub struct ListServiceUsersQuery {
    pub org_id: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListServiceUsersResponse {
    pub serviceusers: Vec<ServiceUser>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCredentialRequest {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ListSecretsResponse {
    pub secrets: Vec<SecretCredential>,
}

#[derive(Debug, Serialize)]
pub struct ListTokensResponse {
    pub tokens: Vec<ServiceUserToken>,
}

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    /// Comma-separated permission names to resolve per project.
    #[serde(default)]
    pub with_permissions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessPair {
    pub project_id: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ListServiceUserProjectsResponse {
    pub projects: Vec<Project>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub access_pairs: Vec<AccessPair>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1beta1/serviceusers?org_id=…
pub async fn list_service_users(
    State(state): State<AppState>,
    Query(query): Query<ListServiceUsersQuery>,
) -> Result<Json<ListServiceUsersResponse>, AppError> {
    let org = resolve_org(&state, &query.org_id).await?;
    let serviceusers = state
        .service_user_service
        .list(ServiceUserFilter {
            org_id: Some(org.id),
            state: query.state,
        })
        .await
        .map_err(map_service_user_error)?;
    Ok(Json(ListServiceUsersResponse { serviceusers }))
}

/// POST /v1beta1/serviceusers
pub async fn create_service_user(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<CreateServiceUserRequest>,
) -> Result<(StatusCode, Json<ServiceUser>), AppError> {
    let org = resolve_org(&state, &body.org_id).await?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: org.id.clone(),
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::SERVICE_USER_MANAGE_PERMISSION,
    )
    .await?;

    let created = state
        .service_user_service
        .create(ServiceUser {
            id: String::new(),
            org_id: org.id,
            title: body.title,
            metadata: metadata::build(body.metadata),
            state: String::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        })
        .await
        .map_err(map_service_user_error)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /v1beta1/serviceusers/:id
pub async fn get_service_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceUser>, AppError> {
    let su = state
        .service_user_service
        .get(&id)
        .await
        .map_err(map_service_user_error)?;
    Ok(Json(su))
}

/// DELETE /v1beta1/serviceusers/:id
pub async fn delete_service_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<Value>, AppError> {
    let su = state
        .service_user_service
        .get(&id)
        .await
        .map_err(map_service_user_error)?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: su.org_id.clone(),
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::SERVICE_USER_MANAGE_PERMISSION,
    )
    .await?;
    state
        .service_user_service
        .delete(&id)
        .await
        .map_err(map_service_user_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// POST /v1beta1/serviceusers/:id/secrets
pub async fn create_service_user_secret(
    State(state): State<AppState>,
    Path(id): Path<String>,
    principal: Principal,
    Json(body): Json<CreateCredentialRequest>,
) -> Result<(StatusCode, Json<SecretCredential>), AppError> {
    authorize_manage(&state, &principal, &id).await?;
    let secret = state
        .service_user_service
        .create_secret(&id, &body.title)
        .await
        .map_err(map_service_user_error)?;
    Ok((StatusCode::CREATED, Json(secret)))
}

/// GET /v1beta1/serviceusers/:id/secrets
pub async fn list_service_user_secrets(
    State(state): State<AppState>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<ListSecretsResponse>, AppError> {
    authorize_manage(&state, &principal, &id).await?;
    let mut secrets = state
        .service_user_service
        .list_secret(&id)
        .await
        .map_err(map_service_user_error)?;
    for secret in &mut secrets {
        secret.secret_value.clear();
    }
    Ok(Json(ListSecretsResponse { secrets }))
}

/// DELETE /v1beta1/serviceusers/:id/secrets/:secret_id
pub async fn delete_service_user_secret(
    State(state): State<AppState>,
    Path((id, secret_id)): Path<(String, Uuid)>,
    principal: Principal,
) -> Result<Json<Value>, AppError> {
    authorize_manage(&state, &principal, &id).await?;
    state
        .service_user_service
        .delete_secret(&id, secret_id)
        .await
        .map_err(map_service_user_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// POST /v1beta1/serviceusers/:id/tokens
pub async fn create_service_user_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
    principal: Principal,
    Json(body): Json<CreateCredentialRequest>,
) -> Result<(StatusCode, Json<ServiceUserToken>), AppError> {
    authorize_manage(&state, &principal, &id).await?;
    let token = state
        .service_user_service
        .create_token(&id, &body.title)
        .await
        .map_err(map_service_user_error)?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// GET /v1beta1/serviceusers/:id/tokens
pub async fn list_service_user_tokens(
    State(state): State<AppState>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<ListTokensResponse>, AppError> {
    authorize_manage(&state, &principal, &id).await?;
    let mut tokens = state
        .service_user_service
        .list_token(&id)
        .await
        .map_err(map_service_user_error)?;
    for token in &mut tokens {
        token.token.clear();
    }
    Ok(Json(ListTokensResponse { tokens }))
}

/// DELETE /v1beta1/serviceusers/:id/tokens/:token_id
pub async fn delete_service_user_token(
    State(state): State<AppState>,
    Path((id, token_id)): Path<(String, Uuid)>,
    principal: Principal,
) -> Result<Json<Value>, AppError> {
    authorize_manage(&state, &principal, &id).await?;
    state
        .service_user_service
        .delete_token(&id, token_id)
        .await
        .map_err(map_service_user_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// GET /v1beta1/serviceusers/:id/projects
pub async fn list_service_user_projects(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<ListServiceUserProjectsResponse>, AppError> {
    let project_ids = state
        .service_user_service
        .list_owned_projects(&id)
        .await
        .map_err(map_service_user_error)?;
    let projects = if project_ids.is_empty() {
        Vec::new()
    } else {
        state
            .project_service
            .get_by_ids(&project_ids)
            .await
            .map_err(|err| AppError::InternalError(anyhow!(err)))?
    };

    let mut access_pairs = Vec::new();
    if let Some(raw) = query.with_permissions.as_deref().filter(|s| !s.is_empty()) {
        let permissions: Vec<&str> = raw.split(',').map(str::trim).collect();
        for project in &projects {
            let mut checks = Vec::with_capacity(permissions.len());
            for permission in &permissions {
                let resolved =
                    authz::get_permission_name(&state, schema::PROJECT_NAMESPACE, permission)
                        .await?;
                checks.push(Check {
                    object: Object {
                        id: project.id.clone(),
                        namespace: schema::PROJECT_NAMESPACE.to_string(),
                    },
                    subject: Subject {
                        id: id.clone(),
                        namespace: schema::SERVICE_USER_PRINCIPAL.to_string(),
                        sub_relation: String::new(),
                    },
                    permission: resolved,
                });
            }
            let results = state
                .resource_service
                .batch_check(checks)
                .await
                .map_err(authz::map_resource_error)?;
            let granted: Vec<String> = permissions
                .iter()
                .zip(results)
                .filter(|(_, pair)| pair.status)
                .map(|(permission, _)| permission.to_string())
                .collect();
            access_pairs.push(AccessPair {
                project_id: project.id.clone(),
                permissions: granted,
            });
        }
    }

    Ok(Json(ListServiceUserProjectsResponse {
        projects,
        access_pairs,
    }))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Credential operations require the management permission on the service
/// user's own org.
async fn authorize_manage(
    state: &AppState,
    principal: &Principal,
    service_user_id: &str,
) -> Result<(), AppError> {
    let su = state
        .service_user_service
        .get(service_user_id)
        .await
        .map_err(map_service_user_error)?;
    authz::is_authorized(
        state,
        principal,
        Object {
            id: su.org_id,
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::SERVICE_USER_MANAGE_PERMISSION,
    )
    .await
}

pub fn map_service_user_error(err: ServiceUserError) -> AppError {
    match err {
        ServiceUserError::NotExist | ServiceUserError::CredNotExist => {
            AppError::NotFound(anyhow!(err))
        }
        ServiceUserError::Disabled => AppError::NotFound(anyhow!(err)),
        ServiceUserError::InvalidId => AppError::BadRequest(anyhow!(err)),
        ServiceUserError::Internal(e) => AppError::InternalError(e),
    }
}
