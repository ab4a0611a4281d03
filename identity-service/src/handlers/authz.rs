//! Authorization guards shared by the handlers. Superusers bypass every
//! object-level check; everyone else goes through the relation store.

use anyhow::anyhow;
use service_core::error::AppError;

use crate::schema;
use crate::services::{
    Check, Object, PermissionError, Principal, PrincipalType, ResourceError, Subject,
};
use crate::AppState;

/// Whether the principal holds the platform-wide superuser permission.
pub async fn is_superuser(state: &AppState, principal: &Principal) -> Result<bool, AppError> {
    let sudo = match principal.principal_type {
        PrincipalType::User => state
            .user_service
            .is_sudo(&principal.id, schema::PLATFORM_SUDO_PERMISSION)
            .await
            .map_err(|err| AppError::InternalError(anyhow!(err)))?,
        PrincipalType::ServiceUser => state
            .service_user_service
            .is_sudo(&principal.id, schema::PLATFORM_SUDO_PERMISSION)
            .await
            .map_err(|err| AppError::InternalError(anyhow!(err)))?,
    };
    Ok(sudo)
}

/// Reject with 403 unless the principal is a superuser.
pub async fn require_superuser(state: &AppState, principal: &Principal) -> Result<(), AppError> {
    if is_superuser(state, principal).await? {
        Ok(())
    } else {
        Err(forbidden())
    }
}

pub fn forbidden() -> AppError {
    AppError::Forbidden(anyhow!("you are not authorized to perform this action"))
}

/// Resolve the permission name to check against an object namespace.
/// Platform permissions are used as-is. Permissions registered under the
/// object's own namespace resolve to their bare name, permissions from a
/// different namespace to their fully qualified slug.
pub async fn get_permission_name(
    state: &AppState,
    object_namespace: &str,
    permission: &str,
) -> Result<String, AppError> {
    if object_namespace == schema::PLATFORM_NAMESPACE || schema::is_platform_permission(permission)
    {
        return Ok(permission.to_string());
    }
    let lookup = if permission.contains(':') {
        permission.to_string()
    } else {
        format!("{object_namespace}:{permission}")
    };
    let perm = state
        .permission_service
        .get(&lookup)
        .await
        .map_err(|err| match err {
            PermissionError::NotExist => AppError::NotFound(anyhow!("permission is not valid")),
            PermissionError::InvalidId | PermissionError::InvalidDetail => {
                AppError::BadRequest(anyhow!(err))
            }
            PermissionError::Internal(e) => AppError::InternalError(e),
        })?;
    if perm.namespace_id == object_namespace {
        Ok(perm.name)
    } else {
        Ok(perm.slug())
    }
}

/// Check that the principal may act on the object with the permission.
/// Superusers always pass. For invitation objects a denied check is retried
/// with the invitee email as subject, so invitees can see and accept their
/// own invitations before they hold any membership.
pub async fn is_authorized(
    state: &AppState,
    principal: &Principal,
    object: Object,
    permission: &str,
) -> Result<(), AppError> {
    if is_superuser(state, principal).await? {
        return Ok(());
    }

    let subject = Subject {
        id: principal.id.clone(),
        namespace: principal.principal_type.namespace().to_string(),
        sub_relation: String::new(),
    };
    let allowed = state
        .resource_service
        .check_authz(Check {
            object: object.clone(),
            subject,
            permission: permission.to_string(),
        })
        .await
        .map_err(map_resource_error)?;
    if allowed {
        return Ok(());
    }

    if object.namespace == schema::INVITATION_NAMESPACE {
        if let Some(email) = principal.user.as_ref().map(|u| u.email.as_str()) {
            if !email.is_empty() {
                let fallback = state
                    .resource_service
                    .check_authz(Check {
                        object,
                        subject: Subject {
                            id: schema::user_email_slug(email),
                            namespace: schema::USER_PRINCIPAL.to_string(),
                            sub_relation: String::new(),
                        },
                        permission: permission.to_string(),
                    })
                    .await
                    .map_err(map_resource_error)?;
                if fallback {
                    return Ok(());
                }
            }
        }
    }

    Err(forbidden())
}

pub fn map_resource_error(err: ResourceError) -> AppError {
    match err {
        ResourceError::InvalidDetail | ResourceError::InvalidNamespace => {
            AppError::BadRequest(anyhow!(err))
        }
        ResourceError::NotExist => AppError::NotFound(anyhow!(err)),
        ResourceError::Internal(e) => AppError::InternalError(e),
    }
}
