//! Permission check handlers. A denied check is a successful response with
//! `status: false`; transport errors are reserved for malformed requests
//! and downstream failures.

use anyhow::anyhow;
use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use service_core::error::AppError;

use crate::handlers::authz;
use crate::schema;
use crate::services::{Check, Object, Principal, Subject};
use crate::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequestBody {
    pub permission: String,
    /// `namespace:id` reference. Namespace aliases (`org`, `project`, …)
    /// are accepted.
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub object_id: String,
    #[serde(default)]
    pub object_namespace: String,
}

#[derive(Debug, Deserialize)]
pub struct FederatedCheckRequest {
    /// `namespace:id` reference to the subject acting on the resource.
    pub subject: String,
    pub resource: String,
    pub permission: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchCheckRequest {
    pub bodies: Vec<CheckRequestBody>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub status: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchCheckPair {
    pub body: CheckBodyEcho,
    pub status: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckBodyEcho {
    pub permission: String,
    pub resource: String,
}

#[derive(Debug, Serialize)]
pub struct BatchCheckResponse {
    pub pairs: Vec<BatchCheckPair>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1beta1/check
#[utoipa::path(
    post,
    path = "/v1beta1/check",
    responses(
        (status = 200, description = "Check verdict; a denial is status=false, not an error")
    ),
    tag = "Permission"
)]
pub async fn check_resource_permission(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<CheckRequestBody>,
) -> Result<Json<CheckResponse>, AppError> {
    let object = parse_object(&body)?;
    let permission = authz::get_permission_name(&state, &object.namespace, &body.permission).await?;

    if authz::is_superuser(&state, &principal).await? {
        return Ok(Json(CheckResponse { status: true }));
    }

    let status = state
        .resource_service
        .check_authz(Check {
            object: object.clone(),
            subject: principal_subject(&principal),
            permission: permission.clone(),
        })
        .await
        .map_err(authz::map_resource_error)?;

    info!(
        principal = %principal.id,
        object = %schema::join_namespace_and_resource_id(&object.namespace, &object.id),
        permission = %permission,
        status,
        "permission checked"
    );
    Ok(Json(CheckResponse { status }))
}

/// POST /v1beta1/check/federated
///
/// Check on behalf of an explicit subject. Restricted to callers holding
/// the platform check permission.
pub async fn check_federated_resource_permission(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<FederatedCheckRequest>,
) -> Result<Json<CheckResponse>, AppError> {
    authz::is_authorized(
        &state,
        &principal,
        Object {
            id: schema::PLATFORM_ID.to_string(),
            namespace: schema::PLATFORM_NAMESPACE.to_string(),
        },
        "check",
    )
    .await?;

    let (subject_ns, subject_id) = schema::split_namespace_and_resource_id(&body.subject)
        .ok_or_else(|| AppError::BadRequest(anyhow!("subject must be in namespace:id form")))?;
    let (object_ns, object_id) = schema::split_namespace_and_resource_id(&body.resource)
        .ok_or_else(|| AppError::BadRequest(anyhow!("resource must be in namespace:id form")))?;

    let object = Object {
        id: object_id.to_string(),
        namespace: schema::parse_namespace_alias(object_ns),
    };
    let permission = authz::get_permission_name(&state, &object.namespace, &body.permission).await?;

    let status = state
        .resource_service
        .check_authz(Check {
            object: object.clone(),
            subject: Subject {
                id: subject_id.to_string(),
                namespace: schema::parse_namespace_alias(subject_ns),
                sub_relation: String::new(),
            },
            permission: permission.clone(),
        })
        .await
        .map_err(authz::map_resource_error)?;

    info!(
        subject = %body.subject,
        object = %schema::join_namespace_and_resource_id(&object.namespace, &object.id),
        permission = %permission,
        status,
        "federated permission checked"
    );
    Ok(Json(CheckResponse { status }))
}

/// POST /v1beta1/batchcheck
#[utoipa::path(
    post,
    path = "/v1beta1/batchcheck",
    responses(
        (status = 200, description = "Per-check verdicts in request order")
    ),
    tag = "Permission"
)]
pub async fn batch_check_permission(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<BatchCheckRequest>,
) -> Result<Json<BatchCheckResponse>, AppError> {
    if body.bodies.is_empty() {
        return Err(AppError::BadRequest(anyhow!("bodies must not be empty")));
    }

    let sudo = authz::is_superuser(&state, &principal).await?;
    let subject = principal_subject(&principal);

    let mut checks = Vec::with_capacity(body.bodies.len());
    let mut echoes = Vec::with_capacity(body.bodies.len());
    for entry in &body.bodies {
        let object = parse_object(entry)?;
        let permission =
            authz::get_permission_name(&state, &object.namespace, &entry.permission).await?;
        echoes.push(CheckBodyEcho {
            permission: entry.permission.clone(),
            resource: schema::join_namespace_and_resource_id(&object.namespace, &object.id),
        });
        checks.push(Check {
            object,
            subject: subject.clone(),
            permission,
        });
    }

    let pairs = if sudo {
        echoes
            .into_iter()
            .map(|body| BatchCheckPair { body, status: true })
            .collect()
    } else {
        let results = state
            .resource_service
            .batch_check(checks)
            .await
            .map_err(authz::map_resource_error)?;
        echoes
            .into_iter()
            .zip(results)
            .map(|(body, pair)| BatchCheckPair {
                body,
                status: pair.status,
            })
            .collect()
    };

    Ok(Json(BatchCheckResponse { pairs }))
}

// ============================================================================
// Helper Functions
// ============================================================================

fn principal_subject(principal: &Principal) -> Subject {
    Subject {
        id: principal.id.clone(),
        namespace: principal.principal_type.namespace().to_string(),
        sub_relation: String::new(),
    }
}

fn parse_object(body: &CheckRequestBody) -> Result<Object, AppError> {
    if !body.resource.is_empty() {
        let (ns, id) = schema::split_namespace_and_resource_id(&body.resource)
            .ok_or_else(|| AppError::BadRequest(anyhow!("resource must be in namespace:id form")))?;
        return Ok(Object {
            id: id.to_string(),
            namespace: schema::parse_namespace_alias(ns),
        });
    }
    if body.object_id.is_empty() || body.object_namespace.is_empty() {
        return Err(AppError::BadRequest(anyhow!(
            "either resource or object_id and object_namespace are required"
        )));
    }
    Ok(Object {
        id: body.object_id.clone(),
        namespace: schema::parse_namespace_alias(&body.object_namespace),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_reference() {
        let body = CheckRequestBody {
            permission: "get".into(),
            resource: "org:acme".into(),
            object_id: String::new(),
            object_namespace: String::new(),
        };
        let object = parse_object(&body).unwrap();
        assert_eq!(object.namespace, schema::ORGANIZATION_NAMESPACE);
        assert_eq!(object.id, "acme");
    }

    #[test]
    fn falls_back_to_split_fields() {
        let body = CheckRequestBody {
            permission: "get".into(),
            resource: String::new(),
            object_id: "p1".into(),
            object_namespace: "project".into(),
        };
        let object = parse_object(&body).unwrap();
        assert_eq!(object.namespace, schema::PROJECT_NAMESPACE);
        assert_eq!(object.id, "p1");
    }

    #[test]
    fn rejects_missing_object() {
        let body = CheckRequestBody {
            permission: "get".into(),
            resource: String::new(),
            object_id: String::new(),
            object_namespace: String::new(),
        };
        assert!(parse_object(&body).is_err());
    }
}
