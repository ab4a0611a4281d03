//! Well-known namespaces, permissions and relations of the platform
//! authorization schema. These mirror the names the downstream relation
//! store is bootstrapped with.

pub const ORGANIZATION_NAMESPACE: &str = "app/organization";
pub const PROJECT_NAMESPACE: &str = "app/project";
pub const USER_PRINCIPAL: &str = "app/user";
pub const SERVICE_USER_PRINCIPAL: &str = "app/serviceuser";
pub const INVITATION_NAMESPACE: &str = "app/invitation";
pub const PLATFORM_NAMESPACE: &str = "app/platform";

/// Singleton object id of the platform itself.
pub const PLATFORM_ID: &str = "platform";

pub const GET_PERMISSION: &str = "get";
pub const UPDATE_PERMISSION: &str = "update";
pub const DELETE_PERMISSION: &str = "delete";
pub const MEMBERSHIP_PERMISSION: &str = "membership";
pub const INVITATION_CREATE_PERMISSION: &str = "invitationcreate";
pub const ACCEPT_PERMISSION: &str = "accept";
pub const SERVICE_USER_MANAGE_PERMISSION: &str = "serviceusermanage";
pub const PLATFORM_SUDO_PERMISSION: &str = "superuser";

pub const PLATFORM_ADMIN_RELATION: &str = "admin";
pub const PLATFORM_MEMBER_RELATION: &str = "member";

/// Permissions that exist directly on the platform namespace and never go
/// through permission-name resolution.
pub fn is_platform_permission(name: &str) -> bool {
    matches!(name, "superuser" | "check" | "all_actions")
}

pub fn is_platform_relation(name: &str) -> bool {
    matches!(name, PLATFORM_ADMIN_RELATION | PLATFORM_MEMBER_RELATION)
}

/// Split a `namespace:id` resource reference. The namespace itself may
/// contain a slash (`app/organization:abc`).
pub fn split_namespace_and_resource_id(resource: &str) -> Option<(&str, &str)> {
    let (ns, id) = resource.rsplit_once(':')?;
    if ns.is_empty() || id.is_empty() {
        return None;
    }
    Some((ns, id))
}

pub fn join_namespace_and_resource_id(namespace: &str, id: &str) -> String {
    format!("{namespace}:{id}")
}

/// Short namespace aliases accepted on the wire.
pub fn parse_namespace_alias(ns: &str) -> String {
    match ns {
        "org" | "organization" => ORGANIZATION_NAMESPACE.to_string(),
        "project" => PROJECT_NAMESPACE.to_string(),
        "user" => USER_PRINCIPAL.to_string(),
        "serviceuser" => SERVICE_USER_PRINCIPAL.to_string(),
        _ => ns.to_string(),
    }
}

/// Lowercased local-part slug used as the email-keyed subject id in
/// invitation relations.
pub fn user_email_slug(email: &str) -> String {
    email.trim().to_lowercase()
}
