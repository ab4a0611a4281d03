//! Free-form metadata attached to organizations, users, invitations and
//! service users. Payloads are JSON objects validated against a named
//! metaschema before they reach the downstream services.

use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

/// Normalize an optional request payload into a metadata map.
pub fn build(raw: Option<Metadata>) -> Metadata {
    raw.unwrap_or_default()
}
