//! User directory handlers, including the `/self` principal routes.

use anyhow::anyhow;
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::ValidateEmail;

use service_core::error::AppError;
use service_core::pagination::{PageParams, Pagination};

use crate::metadata::{self, Metadata};
use crate::services::{Principal, PrincipalType, ServiceUser, User, UserError};
use crate::AppState;

use super::org::map_metaschema_validation_error;

const USER_METASCHEMA: &str = "user";

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UserRequestBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub title: String,
    pub email: String,
    pub avatar: String,
    pub metadata: Metadata,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            title: user.title,
            email: user.email,
            avatar: user.avatar,
            metadata: user.metadata,
            state: user.state,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(flatten)]
    pub page: PageParams,
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serviceuser: Option<ServiceUser>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1beta1/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, AppError> {
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
    Ok(Json(ListUsersResponse { users, count }))
}

/// POST /v1beta1/users
///
/// A blank email falls back to the caller's own email; a blank name is
/// derived from the email.
pub async fn create_user(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<UserRequestBody>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let email = if body.email.is_empty() {
        principal
            .user
            .as_ref()
            .map(|u| u.email.clone())
            .unwrap_or_default()
    } else {
        body.email
    };
    if !email.validate_email() {
        return Err(AppError::BadRequest(anyhow!("email is invalid")));
    }

    let name = if body.name.is_empty() {
        derive_name_from_email(&email)
    } else {
        body.name
    };

    let meta = metadata::build(body.metadata);
    state
        .metaschema_service
        .validate(&meta, USER_METASCHEMA)
        .await
        .map_err(map_metaschema_validation_error)?;

    let user = state
        .user_service
        .create(User {
            id: String::new(),
            name,
            title: body.title,
            email: email.to_lowercase(),
            avatar: body.avatar,
            metadata: meta,
            state: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .map_err(|err| match err {
            UserError::Conflict => AppError::Conflict(anyhow!(err)),
            UserError::InvalidEmail | UserError::InvalidDetail => {
                AppError::BadRequest(anyhow!(err))
            }
            other => map_user_error(other),
        })?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /v1beta1/users/:id
///
/// Accepts a UUID, unique name or email.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .user_service
        .get_by_id(&id)
        .await
        .map_err(map_user_error)?;
    Ok(Json(UserResponse::from(user)))
}

/// PUT /v1beta1/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UserRequestBody>,
) -> Result<Json<UserResponse>, AppError> {
    let existing = state
        .user_service
        .get_by_id(&id)
        .await
        .map_err(map_user_error)?;

    let meta = metadata::build(body.metadata);
    state
        .metaschema_service
        .validate(&meta, USER_METASCHEMA)
        .await
        .map_err(map_metaschema_validation_error)?;

    let updated = state
        .user_service
        .update(User {
            id: existing.id,
            name: if body.name.is_empty() {
                existing.name
            } else {
                body.name
            },
            title: body.title,
            // email is the login identity and cannot be changed here
            email: existing.email,
            avatar: body.avatar,
            metadata: meta,
            state: existing.state,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        })
        .await
        .map_err(|err| match err {
            UserError::Conflict => AppError::Conflict(anyhow!(err)),
            UserError::InvalidDetail => AppError::BadRequest(anyhow!(err)),
            other => map_user_error(other),
        })?;

    Ok(Json(UserResponse::from(updated)))
}

/// DELETE /v1beta1/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.user_service.delete(&id).await.map_err(map_user_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// POST /v1beta1/users/:id/enable
pub async fn enable_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.user_service.enable(&id).await.map_err(map_user_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// POST /v1beta1/users/:id/disable
pub async fn disable_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.user_service.disable(&id).await.map_err(map_user_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// GET /v1beta1/users/self
pub async fn get_current_user(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<CurrentUserResponse>, AppError> {
    match principal.principal_type {
        PrincipalType::User => {
            let user = match principal.user {
                Some(user) => user,
                None => state
                    .user_service
                    .get_by_id(&principal.id)
                    .await
                    .map_err(map_user_error)?,
            };
            Ok(Json(CurrentUserResponse {
                user: Some(UserResponse::from(user)),
                serviceuser: None,
            }))
        }
        PrincipalType::ServiceUser => Ok(Json(CurrentUserResponse {
            user: None,
            serviceuser: principal.service_user,
        })),
    }
}

/// PUT /v1beta1/users/self
pub async fn update_current_user(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<UserRequestBody>,
) -> Result<Json<UserResponse>, AppError> {
    if principal.principal_type != PrincipalType::User {
        return Err(super::authz::forbidden());
    }
    let result =
        update_user(State(state), Path(principal.id), Json(body)).await?;
    Ok(result)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Slugified local part of the email, used when no name was provided.
fn derive_name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

pub fn map_user_error(err: UserError) -> AppError {
    match err {
        UserError::NotExist => AppError::NotFound(anyhow!(err)),
        UserError::Disabled => AppError::NotFound(anyhow!(
            "user is disabled. Please contact your administrator to enable it"
        )),
        UserError::InvalidUuid => AppError::BadRequest(anyhow!(err)),
        UserError::InvalidEmail => AppError::BadRequest(anyhow!(err)),
        UserError::InvalidDetail => AppError::BadRequest(anyhow!(err)),
        UserError::Conflict => AppError::Conflict(anyhow!(err)),
        UserError::Internal(e) => AppError::InternalError(e),
    }
}
