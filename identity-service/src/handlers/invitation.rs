//! Organization invitation handlers. Reading, accepting and deleting an
//! invitation authorizes against the invitation object itself, which lets
//! the invitee act on it through the email fallback before holding any
//! membership in the org.

use anyhow::anyhow;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::ValidateEmail;

use service_core::error::AppError;

use crate::handlers::authz;
use crate::handlers::org::{map_org_error, resolve_org, OrganizationResponse};
use crate::metadata::Metadata;
use crate::schema;
use crate::services::{
    Invitation, InvitationError, InvitationFilter, Object, Principal, PrincipalType,
};
use crate::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    /// Invitee emails. The whole request is rejected if any entry is not a
    /// valid email.
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub role_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub user_id: String,
    pub org_id: String,
    pub group_ids: Vec<String>,
    pub role_ids: Vec<String>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Invitation> for InvitationResponse {
    fn from(invitation: Invitation) -> Self {
        Self {
            id: invitation.id,
            user_id: invitation.user_email_id,
            org_id: invitation.org_id,
            group_ids: invitation.group_ids,
            role_ids: invitation.role_ids,
            metadata: invitation.metadata,
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListInvitationsResponse {
    pub invitations: Vec<InvitationResponse>,
}

#[derive(Debug, Serialize)]
pub struct ListCurrentUserInvitationsResponse {
    pub invitations: Vec<InvitationResponse>,
    pub orgs: Vec<OrganizationResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1beta1/organizations/:org_id/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    principal: Principal,
    Json(body): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<ListInvitationsResponse>), AppError> {
    if body.user_ids.is_empty() {
        return Err(AppError::BadRequest(anyhow!("user_ids must not be empty")));
    }
    for email in &body.user_ids {
        if !email.validate_email() {
            return Err(AppError::BadRequest(anyhow!(
                "invalid email in user_ids: {email}"
            )));
        }
    }

    let org = resolve_org(&state, &org_id).await?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: org.id.clone(),
            namespace: schema::ORGANIZATION_NAMESPACE.to_string(),
        },
        schema::INVITATION_CREATE_PERMISSION,
    )
    .await?;

    let mut invitations = Vec::with_capacity(body.user_ids.len());
    for email in &body.user_ids {
        let created = state
            .invitation_service
            .create(Invitation {
                id: Uuid::nil(),
                user_email_id: schema::user_email_slug(email),
                org_id: org.id.clone(),
                group_ids: body.group_ids.clone(),
                role_ids: body.role_ids.clone(),
                metadata: Metadata::new(),
                created_at: Utc::now(),
                expires_at: Utc::now(),
            })
            .await
            .map_err(map_invitation_error)?;
        invitations.push(InvitationResponse::from(created));
    }

    Ok((
        StatusCode::CREATED,
        Json(ListInvitationsResponse { invitations }),
    ))
}

/// GET /v1beta1/organizations/:org_id/invitations
pub async fn list_invitations(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<ListInvitationsResponse>, AppError> {
    let org = resolve_org(&state, &org_id).await?;
    let invitations = state
        .invitation_service
        .list(InvitationFilter {
            org_id: Some(org.id),
            user_id: None,
        })
        .await
        .map_err(map_invitation_error)?;
    Ok(Json(ListInvitationsResponse {
        invitations: invitations.into_iter().map(InvitationResponse::from).collect(),
    }))
}

/// GET /v1beta1/organizations/:org_id/invitations/:id
pub async fn get_invitation(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(String, Uuid)>,
    principal: Principal,
) -> Result<Json<InvitationResponse>, AppError> {
    resolve_org(&state, &org_id).await?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: id.to_string(),
            namespace: schema::INVITATION_NAMESPACE.to_string(),
        },
        schema::GET_PERMISSION,
    )
    .await?;
    let invitation = state
        .invitation_service
        .get(id)
        .await
        .map_err(map_invitation_error)?;
    Ok(Json(InvitationResponse::from(invitation)))
}

/// POST /v1beta1/organizations/:org_id/invitations/:id/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(String, Uuid)>,
    principal: Principal,
) -> Result<Json<Value>, AppError> {
    resolve_org(&state, &org_id).await?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: id.to_string(),
            namespace: schema::INVITATION_NAMESPACE.to_string(),
        },
        schema::ACCEPT_PERMISSION,
    )
    .await?;
    state
        .invitation_service
        .accept(id)
        .await
        .map_err(map_invitation_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// DELETE /v1beta1/organizations/:org_id/invitations/:id
pub async fn delete_invitation(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(String, Uuid)>,
    principal: Principal,
) -> Result<Json<Value>, AppError> {
    resolve_org(&state, &org_id).await?;
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: id.to_string(),
            namespace: schema::INVITATION_NAMESPACE.to_string(),
        },
        schema::DELETE_PERMISSION,
    )
    .await?;
    state
        .invitation_service
        .delete(id)
        .await
        .map_err(map_invitation_error)?;
    Ok(Json(Value::Object(Default::default())))
}

/// GET /v1beta1/users/self/invitations
///
/// Pending invitations addressed to the caller's email, with the inviting
/// organizations resolved alongside.
pub async fn list_current_user_invitations(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ListCurrentUserInvitationsResponse>, AppError> {
    if principal.principal_type != PrincipalType::User {
        return Err(authz::forbidden());
    }
    let email = principal
        .user
        .as_ref()
        .map(|u| u.email.clone())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow!("principal has no email")))?;

    let invitations = state
        .invitation_service
        .list(InvitationFilter {
            org_id: None,
            user_id: Some(schema::user_email_slug(&email)),
        })
        .await
        .map_err(map_invitation_error)?;

    let mut orgs = Vec::new();
    for invitation in &invitations {
        let org = state
            .org_service
            .get_raw(&invitation.org_id)
            .await
            .map_err(map_org_error)?;
        orgs.push(OrganizationResponse::from(org));
    }

    Ok(Json(ListCurrentUserInvitationsResponse {
        invitations: invitations.into_iter().map(InvitationResponse::from).collect(),
        orgs,
    }))
}

// ============================================================================
// Helper Functions
// ============================================================================

pub fn map_invitation_error(err: InvitationError) -> AppError {
    match err {
        InvitationError::NotFound => AppError::NotFound(anyhow!(err)),
        InvitationError::AlreadyMember => AppError::Conflict(anyhow!(err)),
        InvitationError::Expired => AppError::BadRequest(anyhow!(err)),
        InvitationError::Internal(e) => AppError::InternalError(e),
    }
}
