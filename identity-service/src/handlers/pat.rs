//! Personal access token handlers for the current user. Issuance policy
//! (feature flag, expiry bounds, per-org cap) is enforced here before the
//! token service is called; the plaintext token value is returned exactly
//! once, in the creation response.

use anyhow::anyhow;
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use service_core::error::AppError;

use crate::handlers::authz;
use crate::services::{PatCreate, PatError, PersonalAccessToken, Principal, PrincipalType};
use crate::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub org_id: String,
    #[serde(default)]
    pub title: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: Uuid,
    pub user_id: String,
    pub org_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TokenResponse {
    fn from_pat(pat: PersonalAccessToken, include_value: bool) -> Self {
        Self {
            id: pat.id,
            user_id: pat.user_id,
            org_id: pat.org_id,
            title: pat.title,
            token: if include_value { pat.token } else { String::new() },
            expires_at: pat.expires_at,
            created_at: pat.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListTokensQuery {
    pub org_id: String,
}

#[derive(Debug, Serialize)]
pub struct ListTokensResponse {
    pub tokens: Vec<TokenResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1beta1/users/self/tokens
pub async fn create_token(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<CreateTokenRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    if principal.principal_type != PrincipalType::User {
        return Err(authz::forbidden());
    }
    if body.org_id.is_empty() {
        return Err(AppError::BadRequest(anyhow!("org_id is required")));
    }

    let now = Utc::now();
    if body.expires_at <= now {
        return Err(AppError::BadRequest(anyhow!(
            "token expiry must be in the future"
        )));
    }
    let max_lifetime = Duration::hours(i64::from(state.config.pat.max_token_lifetime_hours));
    if body.expires_at - now > max_lifetime {
        return Err(AppError::BadRequest(anyhow!(
            "token expiry exceeds the maximum allowed lifetime"
        )));
    }
    if !state.config.pat.enabled {
        return Err(AppError::FailedPrecondition(anyhow!(
            "personal access tokens are disabled"
        )));
    }

    let existing = state
        .pat_service
        .list(&principal.id, &body.org_id)
        .await
        .map_err(map_pat_error)?;
    if existing.len() >= state.config.pat.max_tokens_per_user_per_org as usize {
        return Err(AppError::TooManyRequests(
            "token limit reached for the org".to_string(),
        ));
    }

    let pat = state
        .pat_service
        .create(PatCreate {
            user_id: principal.id.clone(),
            org_id: body.org_id,
            title: body.title,
            expires_at: body.expires_at,
        })
        .await
        .map_err(map_pat_error)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse::from_pat(pat, true)),
    ))
}

/// GET /v1beta1/users/self/tokens?org_id=…
pub async fn list_tokens(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListTokensQuery>,
) -> Result<Json<ListTokensResponse>, AppError> {
    if principal.principal_type != PrincipalType::User {
        return Err(authz::forbidden());
    }
    if query.org_id.is_empty() {
        return Err(AppError::BadRequest(anyhow!("org_id is required")));
    }
    let tokens = state
        .pat_service
        .list(&principal.id, &query.org_id)
        .await
        .map_err(map_pat_error)?;
    Ok(Json(ListTokensResponse {
        tokens: tokens
            .into_iter()
            .map(|pat| TokenResponse::from_pat(pat, false))
            .collect(),
    }))
}

/// DELETE /v1beta1/users/self/tokens/:id
pub async fn delete_token(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if principal.principal_type != PrincipalType::User {
        return Err(authz::forbidden());
    }
    state
        .pat_service
        .delete(&principal.id, id)
        .await
        .map_err(map_pat_error)?;
    Ok(Json(Value::Object(Default::default())))
}

// ============================================================================
// Helper Functions
// ============================================================================

fn map_pat_error(err: PatError) -> AppError {
    match err {
        PatError::NotFound => AppError::NotFound(anyhow!(err)),
        PatError::Internal(e) => AppError::InternalError(e),
    }
}
