//! Organization handlers: lifecycle, membership and role listings.

use anyhow::anyhow;
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use service_core::error::AppError;
use service_core::pagination::{PageParams, Pagination};

use crate::handlers::authz;
use crate::handlers::user::UserResponse;
use crate::metadata::{self, Metadata};
use crate::schema;
use crate::services::{
    MetaSchemaError, Object, OrgState, Organization, OrganizationError, PolicyError,
};
use crate::AppState;

const ORG_METASCHEMA: &str = "organization";

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct OrganizationRequestBody {
    #[validate(length(min = 2, message = "name must be at least 2 characters"))]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub id: String,
    pub name: String,
    pub title: String,
    pub avatar: String,
    pub metadata: Metadata,
    pub state: OrgState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            title: org.title,
            avatar: org.avatar,
            metadata: org.metadata,
            state: org.state,
            created_at: org.created_at,
            updated_at: org.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListOrganizationsQuery {
    #[serde(default)]
    pub state: Option<OrgState>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub page: PageParams,
}

#[derive(Debug, Serialize)]
pub struct ListOrganizationsResponse {
    pub organizations: Vec<OrganizationResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrgUsersQuery {
    #[serde(default)]
    pub permission_filter: Option<String>,
    #[serde(default)]
    pub with_roles: bool,
}

/// Roles one member holds inside the org.
#[derive(Debug, Serialize)]
pub struct RolePair {
    pub user_id: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ListOrgUsersResponse {
    pub users: Vec<UserResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub role_pairs: Vec<RolePair>,
}

#[derive(Debug, Deserialize)]
pub struct AddOrgUsersRequest {
    pub user_ids: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1beta1/organizations
#[utoipa::path(
    get,
    path = "/v1beta1/organizations",
    responses(
        (status = 200, description = "Organizations matching the filters")
    ),
    tag = "Organization"
)]
pub async fn list_organizations(
    State(state): State<AppState>,
    Query(query): Query<ListOrganizationsQuery>,
) -> Result<Json<ListOrganizationsResponse>, AppError> {
    let orgs = match query.user_id.as_deref() {
        Some(user_id) if !user_id.is_empty() => {
            let mut orgs = state
                .org_service
                .list_by_user(user_id)
                .await
                .map_err(map_org_error)?;
            // both filters apply when given together
            if let Some(wanted) = query.state {
                orgs.retain(|org| org.state == wanted);
            }
            orgs
        }
        _ => state
            .org_service
            .list(query.state)
            .await
            .map_err(map_org_error)?,
    };

    let page = Pagination::from(query.page);
    let organizations = orgs
        .into_iter()
        .skip(page.offset())
        .take(page.page_size as usize)
        .map(OrganizationResponse::from)
        .collect();
    Ok(Json(ListOrganizationsResponse { organizations }))
}

/// POST /v1beta1/organizations
#[utoipa::path(
    post,
    path = "/v1beta1/organizations",
    responses(
        (status = 201, description = "Organization created"),
        (status = 409, description = "Conflicting organization exists")
    ),
    tag = "Organization"
)]
pub async fn create_organization(
    State(state): State<AppState>,
    Json(body): Json<OrganizationRequestBody>,
) -> Result<(StatusCode, Json<OrganizationResponse>), AppError> {
    body.validate()?;

    let meta = metadata::build(body.metadata);
    state
        .metaschema_service
        .validate(&meta, ORG_METASCHEMA)
        .await
        .map_err(map_metaschema_validation_error)?;

    let org = state
        .org_service
        .create(Organization {
            id: String::new(),
            name: body.name,
            title: body.title,
            avatar: body.avatar,
            metadata: meta,
            state: OrgState::Enabled,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .map_err(|err| match err {
            OrganizationError::InvalidEmail => AppError::Unauthenticated(anyhow!(err)),
            OrganizationError::InvalidDetail => AppError::BadRequest(anyhow!(err)),
            OrganizationError::Conflict => AppError::Conflict(anyhow!(err)),
            other => map_org_error(other),
        })?;

    Ok((StatusCode::CREATED, Json(OrganizationResponse::from(org))))
}

/// GET /v1beta1/organizations/:id
///
/// The path segment may be the org UUID or its unique name. Disabled orgs
/// still resolve here; only org-scoped sub-resources hide them.
#[utoipa::path(
    get,
    path = "/v1beta1/organizations/{id}",
    responses(
        (status = 200, description = "Organization details"),
        (status = 404, description = "Organization not found")
    ),
    tag = "Organization"
)]
pub async fn get_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrganizationResponse>, AppError> {
    let org = state
        .org_service
        .get_raw(&id)
        .await
        .map_err(map_org_error)?;
    Ok(Json(OrganizationResponse::from(org)))
}

/// PUT /v1beta1/organizations/:id
///
/// A non-UUID path segment is treated as the org name.
#[utoipa::path(
    put,
    path = "/v1beta1/organizations/{id}",
    responses(
        (status = 200, description = "Organization updated"),
        (status = 403, description = "Caller lacks the update permission")
    ),
    tag = "Organization"
)]
pub async fn update_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    principal: crate::services::Principal,
    Json(body): Json<OrganizationRequestBody>,
) -> Result<Json<OrganizationResponse>, AppError> {
    // a blank name keeps the stored one, so only validate supplied names
    if !body.name.is_empty() {
        body.validate()?;
    }

    let existing = resolve_org(&state, &id).await?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: existing.id.clone(),
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::UPDATE_PERMISSION,
    )
    .await?;

    let meta = metadata::build(body.metadata);
    state
        .metaschema_service
        .validate(&meta, ORG_METASCHEMA)
        .await
        .map_err(map_metaschema_validation_error)?;

    let updated = state
        .org_service
        .update(Organization {
            id: existing.id,
            name: if body.name.is_empty() {
                existing.name
            } else {
                body.name
            },
            title: body.title,
            avatar: body.avatar,
            metadata: meta,
            state: existing.state,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        })
        .await
        .map_err(|err| match err {
            OrganizationError::InvalidDetail => AppError::BadRequest(anyhow!(err)),
            OrganizationError::Conflict => AppError::Conflict(anyhow!(err)),
            other => map_org_error(other),
        })?;

    Ok(Json(OrganizationResponse::from(updated)))
}

/// POST /v1beta1/organizations/:id/enable
pub async fn enable_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    principal: crate::services::Principal,
) -> Result<Json<Value>, AppError> {
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: id.clone(),
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::UPDATE_PERMISSION,
    )
    .await?;
    state.org_service.enable(&id).await.map_err(map_org_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// POST /v1beta1/organizations/:id/disable
pub async fn disable_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    principal: crate::services::Principal,
) -> Result<Json<Value>, AppError> {
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: id.clone(),
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::DELETE_PERMISSION,
    )
    .await?;
    state
        .org_service
        .disable(&id)
        .await
        .map_err(map_org_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// GET /v1beta1/organizations/:id/users
pub async fn list_organization_users(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListOrgUsersQuery>,
) -> Result<Json<ListOrgUsersResponse>, AppError> {
    let org = resolve_org(&state, &id).await?;

    let permission = query
        .permission_filter
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or(schema::MEMBERSHIP_PERMISSION);

    let users = state
        .user_service
        .list_by_org(&org.id, permission)
        .await
        .map_err(|err| AppError::InternalError(anyhow!(err)))?;

    let mut role_pairs = Vec::new();
    if query.with_roles {
        for user in &users {
            let roles = state
                .policy_service
                .list_roles(&org.id, &user.id)
                .await
                .map_err(|err| match err {
                    PolicyError::InvalidDetail => AppError::BadRequest(anyhow!(err)),
                    other => AppError::InternalError(anyhow!(other)),
                })?;
            role_pairs.push(RolePair {
                user_id: user.id.clone(),
                roles: roles.into_iter().map(|r| r.name).collect(),
            });
        }
    }

    Ok(Json(ListOrgUsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        role_pairs,
    }))
}

/// GET /v1beta1/organizations/:id/admins
pub async fn list_organization_admins(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ListOrgUsersResponse>, AppError> {
    let org = resolve_org(&state, &id).await?;
    let users = state
        .user_service
        .list_by_org(&org.id, schema::UPDATE_PERMISSION)
        .await
        .map_err(|err| AppError::InternalError(anyhow!(err)))?;
    Ok(Json(ListOrgUsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        role_pairs: Vec::new(),
    }))
}

/// GET /v1beta1/organizations/:id/serviceusers
pub async fn list_organization_service_users(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let org = resolve_org(&state, &id).await?;
    let service_users = state
        .service_user_service
        .list_by_org(&org.id)
        .await
        .map_err(|err| AppError::InternalError(anyhow!(err)))?;
    Ok(Json(serde_json::json!({ "serviceusers": service_users })))
}

/// POST /v1beta1/organizations/:id/users
pub async fn add_organization_users(
    State(state): State<AppState>,
    Path(id): Path<String>,
    principal: crate::services::Principal,
    Json(body): Json<AddOrgUsersRequest>,
) -> Result<Json<Value>, AppError> {
    if body.user_ids.is_empty() {
        return Err(AppError::BadRequest(anyhow!("user_ids must not be empty")));
    }
    let org = resolve_org(&state, &id).await?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: org.id.clone(),
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::UPDATE_PERMISSION,
    )
    .await?;
    state
        .org_service
        .add_users(&org.id, &body.user_ids)
        .await
        .map_err(map_org_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// DELETE /v1beta1/organizations/:id/users/:user_id
pub async fn remove_organization_user(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
    principal: crate::services::Principal,
) -> Result<Json<Value>, AppError> {
    let org = resolve_org(&state, &id).await?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: org.id.clone(),
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::UPDATE_PERMISSION,
    )
    .await?;
    state
        .org_service
        .remove_user(&org.id, &user_id)
        .await
        .map_err(map_org_error)?;
    Ok(Json(Value::Object(Default::default())))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolve an org for an org-scoped operation. Disabled and missing orgs
/// both surface as 404 so callers cannot probe for disabled tenants.
pub async fn resolve_org(state: &AppState, id_or_name: &str) -> Result<Organization, AppError> {
    state.org_service.get(id_or_name).await.map_err(|err| match err {
        OrganizationError::Disabled => AppError::NotFound(anyhow!(
            "org is disabled. Please contact your administrator to enable it"
        )),
        other => map_org_error(other),
    })
}

pub fn map_org_error(err: OrganizationError) -> AppError {
    match err {
        OrganizationError::NotExist => AppError::NotFound(anyhow!(err)),
        OrganizationError::Disabled => AppError::NotFound(anyhow!(err)),
        OrganizationError::InvalidUuid => AppError::BadRequest(anyhow!(err)),
        OrganizationError::InvalidDetail => AppError::BadRequest(anyhow!(err)),
        OrganizationError::InvalidEmail => AppError::BadRequest(anyhow!(err)),
        OrganizationError::Conflict => AppError::Conflict(anyhow!(err)),
        OrganizationError::Internal(e) => AppError::InternalError(e),
    }
}

pub fn map_metaschema_validation_error(err: MetaSchemaError) -> AppError {
    match err {
        MetaSchemaError::MetadataMismatch => AppError::BadRequest(anyhow!(err)),
        MetaSchemaError::Internal(e) => AppError::InternalError(e),
        other => AppError::BadRequest(anyhow!(other)),
    }
}
