use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::relation::{Object, Subject};

/// A single authorization question: may `subject` act on `object` with
/// `permission`. A check with an empty subject id is evaluated against the
/// current principal by the downstream service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
    pub object: Object,
    #[serde(default)]
    pub subject: Subject,
    pub permission: String,
}

/// One entry of a batch check and its verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckPair {
    #[serde(flatten)]
    pub check: Check,
    pub status: bool,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource doesn't exist")]
    NotExist,
    #[error("resource detail is not valid")]
    InvalidDetail,
    #[error("namespace or permission is not valid")]
    InvalidNamespace,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Authorization checks against the relation store.
#[async_trait]
pub trait ResourceService: Send + Sync {
    /// Evaluate one check. A denial is `Ok(false)`, never an error.
    async fn check_authz(&self, check: Check) -> Result<bool, ResourceError>;

    /// Evaluate several checks in one round trip, preserving order.
    async fn batch_check(&self, checks: Vec<Check>) -> Result<Vec<CheckPair>, ResourceError>;
}
