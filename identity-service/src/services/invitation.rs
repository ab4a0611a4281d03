use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::metadata::Metadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    /// Invitee email, always stored lowercased.
    pub user_email_id: String,
    pub org_id: String,
    #[serde(default)]
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub role_ids: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct InvitationFilter {
    pub org_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("invitation not found")]
    NotFound,
    #[error("user is already a member of the org")]
    AlreadyMember,
    #[error("invitation has expired")]
    Expired,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Email invitations into an organization, accepted by the invitee.
#[async_trait]
pub trait InvitationService: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Invitation, InvitationError>;

    async fn create(&self, invitation: Invitation) -> Result<Invitation, InvitationError>;

    async fn list(&self, filter: InvitationFilter) -> Result<Vec<Invitation>, InvitationError>;

    /// Attach the invitee to the org, its groups and roles, then delete
    /// the invitation.
    async fn accept(&self, id: Uuid) -> Result<(), InvitationError>;

    async fn delete(&self, id: Uuid) -> Result<(), InvitationError>;
}
