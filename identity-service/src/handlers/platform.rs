//! Platform administration handlers. Every route here requires a superuser
//! principal.

use anyhow::anyhow;
use axum::extract::{Json, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use service_core::error::AppError;
use service_core::pagination::{PageParams, Pagination};

use crate::handlers::authz;
use crate::handlers::org::{map_org_error, OrganizationResponse};
use crate::handlers::user::{map_user_error, UserResponse};
use crate::schema;
use crate::services::{
    Object, OrgState, Principal, RelationError, ServiceUser, ServiceUserFilter,
};
use crate::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AdminListUsersQuery {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(flatten)]
    pub page: PageParams,
}

#[derive(Debug, Serialize)]
pub struct AdminListUsersResponse {
    pub users: Vec<UserResponse>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct AdminListOrganizationsQuery {
    #[serde(default)]
    pub state: Option<OrgState>,
    #[serde(flatten)]
    pub page: PageParams,
}

#[derive(Debug, Serialize)]
pub struct AdminListOrganizationsResponse {
    pub organizations: Vec<OrganizationResponse>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct AdminListServiceUsersQuery {
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminListServiceUsersResponse {
    pub serviceusers: Vec<ServiceUser>,
    pub count: usize,
}

/// Exactly one of `user_id` and `serviceuser_id` must be set.
#[derive(Debug, Deserialize)]
pub struct PlatformUserRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub serviceuser_id: Option<String>,
    #[serde(default)]
    pub relation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListPlatformUsersResponse {
    pub users: Vec<UserResponse>,
    pub serviceusers: Vec<ServiceUser>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1beta1/admin/users
pub async fn admin_list_users(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<AdminListUsersQuery>,
) -> Result<Json<AdminListUsersResponse>, AppError> {
    authz::require_superuser(&state, &principal).await?;
    let users = state
        .user_service
        .list(query.keyword.as_deref(), query.state.as_deref())
        .await
        .map_err(map_user_error)?;
    let count = users.len();

    let page = Pagination::from(query.page);
    let users = users
        .into_iter()
        .skip(page.offset())
        .take(page.page_size as usize)
        .map(UserResponse::from)
        .collect();
    Ok(Json(AdminListUsersResponse { users, count }))
}

/// GET /v1beta1/admin/organizations
pub async fn admin_list_organizations(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<AdminListOrganizationsQuery>,
) -> Result<Json<AdminListOrganizationsResponse>, AppError> {
    authz::require_superuser(&state, &principal).await?;
    let orgs = state
        .org_service
        .list(query.state)
        .await
        .map_err(map_org_error)?;
    let count = orgs.len();

    let page = Pagination::from(query.page);
    let organizations = orgs
        .into_iter()
        .skip(page.offset())
        .take(page.page_size as usize)
        .map(OrganizationResponse::from)
        .collect();
    Ok(Json(AdminListOrganizationsResponse {
        organizations,
        count,
    }))
}

/// GET /v1beta1/admin/serviceusers
pub async fn admin_list_service_users(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<AdminListServiceUsersQuery>,
) -> Result<Json<AdminListServiceUsersResponse>, AppError> {
    authz::require_superuser(&state, &principal).await?;
    let serviceusers = state
        .service_user_service
        .list(ServiceUserFilter {
            org_id: query.org_id,
            state: query.state,
        })
        .await
        .map_err(|err| AppError::InternalError(anyhow!(err)))?;
    let count = serviceusers.len();
    Ok(Json(AdminListServiceUsersResponse {
        serviceusers,
        count,
    }))
}

/// POST /v1beta1/admin/platform/users
///
/// Grant a platform relation (`admin` or `member`) to a user or service
/// user.
pub async fn add_platform_user(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<PlatformUserRequest>,
) -> Result<Json<Value>, AppError> {
    authz::require_superuser(&state, &principal).await?;

    let relation = body.relation.as_deref().unwrap_or_default();
    if !schema::is_platform_relation(relation) {
        return Err(AppError::BadRequest(anyhow!(
            "relation must be admin or member"
        )));
    }

    match platform_target(&body)? {
        PlatformTarget::User(id) => state
            .user_service
            .sudo(&id, relation)
            .await
            .map_err(map_user_error)?,
        PlatformTarget::ServiceUser(id) => state
            .service_user_service
            .sudo(&id, relation)
            .await
            .map_err(map_service_user_sudo_error)?,
    }
    Ok(Json(Value::Object(Default::default())))
}

/// GET /v1beta1/admin/platform/users
pub async fn list_platform_users(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ListPlatformUsersResponse>, AppError> {
    authz::require_superuser(&state, &principal).await?;

    let platform = Object {
        id: schema::PLATFORM_ID.to_string(),
        namespace: schema::PLATFORM_NAMESPACE.to_string(),
    };

    let mut users = Vec::new();
    let mut serviceusers = Vec::new();
    for relation_name in [schema::PLATFORM_ADMIN_RELATION, schema::PLATFORM_MEMBER_RELATION] {
        let user_relations = state
            .relation_service
            .list_relations(platform.clone(), schema::USER_PRINCIPAL, relation_name)
            .await
            .map_err(map_relation_error)?;
        let ids: Vec<String> = user_relations.into_iter().map(|r| r.subject.id).collect();
        if !ids.is_empty() {
            for user in state
                .user_service
                .get_by_ids(&ids)
                .await
                .map_err(map_user_error)?
            {
                let mut response = UserResponse::from(user);
                response
                    .metadata
                    .insert("relation".to_string(), Value::String(relation_name.into()));
                users.push(response);
            }
        }

        let su_relations = state
            .relation_service
            .list_relations(
                platform.clone(),
                schema::SERVICE_USER_PRINCIPAL,
                relation_name,
            )
            .await
            .map_err(map_relation_error)?;
        let ids: Vec<String> = su_relations.into_iter().map(|r| r.subject.id).collect();
        if !ids.is_empty() {
            for mut su in state
                .service_user_service
                .get_by_ids(&ids)
                .await
                .map_err(map_service_user_sudo_error)?
            {
                su.metadata
                    .insert("relation".to_string(), Value::String(relation_name.into()));
                serviceusers.push(su);
            }
        }
    }

    Ok(Json(ListPlatformUsersResponse {
        users,
        serviceusers,
    }))
}

/// DELETE /v1beta1/admin/platform/users
pub async fn remove_platform_user(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<PlatformUserRequest>,
) -> Result<Json<Value>, AppError> {
    authz::require_superuser(&state, &principal).await?;

    match platform_target(&body)? {
        PlatformTarget::User(id) => state
            .user_service
            .unsudo(&id)
            .await
            .map_err(map_user_error)?,
        PlatformTarget::ServiceUser(id) => state
            .service_user_service
            .unsudo(&id)
            .await
            .map_err(map_service_user_sudo_error)?,
    }
    Ok(Json(Value::Object(Default::default())))
}

// ============================================================================
// Helper Functions
// ============================================================================

enum PlatformTarget {
    User(String),
    ServiceUser(String),
}

fn platform_target(body: &PlatformUserRequest) -> Result<PlatformTarget, AppError> {
    let user_id = body.user_id.as_deref().filter(|s| !s.is_empty());
    let su_id = body.serviceuser_id.as_deref().filter(|s| !s.is_empty());
    match (user_id, su_id) {
        (Some(id), None) => Ok(PlatformTarget::User(id.to_string())),
        (None, Some(id)) => Ok(PlatformTarget::ServiceUser(id.to_string())),
        _ => Err(AppError::BadRequest(anyhow!(
            "exactly one of user_id and serviceuser_id is required"
        ))),
    }
}

fn map_relation_error(err: RelationError) -> AppError {
    match err {
        RelationError::NotExist => AppError::NotFound(anyhow!(err)),
        RelationError::InvalidDetail => AppError::BadRequest(anyhow!(err)),
        RelationError::Internal(e) => AppError::InternalError(e),
    }
}

fn map_service_user_sudo_error(err: crate::services::ServiceUserError) -> AppError {
    use crate::services::ServiceUserError;
    match err {
        ServiceUserError::NotExist | ServiceUserError::CredNotExist => {
            AppError::NotFound(anyhow!(err))
        }
        ServiceUserError::InvalidId => AppError::BadRequest(anyhow!(err)),
        ServiceUserError::Disabled => AppError::NotFound(anyhow!(err)),
        ServiceUserError::Internal(e) => AppError::InternalError(e),
    }
}
