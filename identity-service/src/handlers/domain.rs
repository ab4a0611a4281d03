//! Org email-domain handlers. Domains are issued pending with a TXT token,
//! verified against DNS by the downstream service, and verified domains let
//! matching users join the org directly.

use anyhow::anyhow;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use service_core::error::AppError;

use crate::handlers::authz;
use crate::handlers::org::resolve_org;
use crate::schema;
use crate::services::{Domain, DomainError, DomainFilter, DomainState, Object, Principal};
use crate::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    pub domain: String,
}

#[derive(Debug, Serialize)]
pub struct DomainResponse {
    pub id: String,
    pub name: String,
    pub org_id: String,
    pub token: String,
    pub state: DomainState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Domain> for DomainResponse {
    fn from(domain: Domain) -> Self {
        Self {
            id: domain.id,
            name: domain.name,
            org_id: domain.org_id,
            token: domain.token,
            state: domain.state,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListDomainsResponse {
    pub domains: Vec<DomainResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1beta1/organizations/:org_id/domains
pub async fn create_domain(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    principal: Principal,
    Json(body): Json<CreateDomainRequest>,
) -> Result<(StatusCode, Json<DomainResponse>), AppError> {
    if body.domain.is_empty() {
        return Err(AppError::BadRequest(anyhow!("domain must not be empty")));
    }
    let org = resolve_org(&state, &org_id).await?;
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

    let domain = state
        .domain_service
        .create(Domain {
            id: String::new(),
            name: body.domain,
            org_id: org.id,
            token: String::new(),
            state: DomainState::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .map_err(|err| match err {
            DomainError::DuplicateKey => AppError::Conflict(anyhow!(err)),
            DomainError::InvalidDomain => AppError::BadRequest(anyhow!(err)),
            other => map_domain_error(other),
        })?;

    Ok((StatusCode::CREATED, Json(DomainResponse::from(domain))))
}

/// GET /v1beta1/organizations/:org_id/domains
pub async fn list_domains(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<ListDomainsResponse>, AppError> {
    let org = resolve_org(&state, &org_id).await?;
    let domains = state
        .domain_service
        .list(DomainFilter {
            org_id: Some(org.id),
            ..Default::default()
        })
        .await
        .map_err(map_domain_error)?;
    Ok(Json(ListDomainsResponse {
        domains: domains.into_iter().map(DomainResponse::from).collect(),
    }))
}

/// GET /v1beta1/organizations/:org_id/domains/:id
pub async fn get_domain(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(String, String)>,
) -> Result<Json<DomainResponse>, AppError> {
    resolve_org(&state, &org_id).await?;
    let domain = state.domain_service.get(&id).await.map_err(map_domain_error)?;
    Ok(Json(DomainResponse::from(domain)))
}

/// DELETE /v1beta1/organizations/:org_id/domains/:id
pub async fn delete_domain(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(String, String)>,
    principal: Principal,
) -> Result<Json<Value>, AppError> {
    let org = resolve_org(&state, &org_id).await?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: org.id,
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::UPDATE_PERMISSION,
    )
    .await?;
    state
        .domain_service
        .delete(&id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// POST /v1beta1/organizations/:org_id/domains/:id/verify
pub async fn verify_domain(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(String, String)>,
    principal: Principal,
) -> Result<Json<DomainResponse>, AppError> {
    let org = resolve_org(&state, &org_id).await?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: org.id,
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::UPDATE_PERMISSION,
    )
    .await?;
    let domain = state
        .domain_service
        .verify_domain(&id)
        .await
        .map_err(|err| match err {
            DomainError::TxtRecordNotFound => AppError::NotFound(anyhow!(err)),
            DomainError::InvalidDomain => AppError::NotFound(anyhow!(err)),
            other => map_domain_error(other),
        })?;
    Ok(Json(DomainResponse::from(domain)))
}

/// POST /v1beta1/organizations/:org_id/join
///
/// Attaches the caller to the org when their email domain matches one of
/// the org's verified domains.
pub async fn join_organization(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    principal: Principal,
) -> Result<Json<Value>, AppError> {
    let org = resolve_org(&state, &org_id).await?;
    state
        .domain_service
        .join(&org.id, &principal.id)
        .await
        .map_err(|err| match err {
            DomainError::DomainsMismatch => AppError::BadRequest(anyhow!(err)),
            other => map_domain_error(other),
        })?;
    Ok(Json(Value::Object(Default::default())))
}

// ============================================================================
// Helper Functions
// ============================================================================

pub fn map_domain_error(err: DomainError) -> AppError {
    match err {
        DomainError::NotExist => AppError::NotFound(anyhow!(err)),
        DomainError::TxtRecordNotFound => AppError::NotFound(anyhow!(err)),
        DomainError::DuplicateKey => AppError::Conflict(anyhow!(err)),
        DomainError::InvalidDomain => AppError::BadRequest(anyhow!(err)),
        DomainError::DomainsMismatch => AppError::BadRequest(anyhow!(err)),
        DomainError::Internal(e) => AppError::InternalError(e),
    }
}
