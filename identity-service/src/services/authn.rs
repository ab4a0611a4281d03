use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::service_user::ServiceUser;
use super::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalType {
    User,
    ServiceUser,
}

impl PrincipalType {
    pub fn namespace(&self) -> &'static str {
        match self {
            PrincipalType::User => crate::schema::USER_PRINCIPAL,
            PrincipalType::ServiceUser => crate::schema::SERVICE_USER_PRINCIPAL,
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(rename = "type")]
    pub principal_type: PrincipalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_user: Option<ServiceUser>,
}

#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("authenticated principal is disabled")]
    Disabled,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Resolves bearer credentials into a principal.
#[async_trait]
pub trait AuthnService: Send + Sync {
    async fn get_principal(&self, token: &str) -> Result<Principal, AuthnError>;
}
