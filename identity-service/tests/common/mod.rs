//! Shared test harness: an in-memory stub backend implementing every domain
//! service trait, plus helpers for driving the router with `oneshot`.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use identity_service::config::{
    BackendConfig, Environment, IdentityConfig, PatConfig, SecurityConfig,
};
use identity_service::metadata::Metadata;
use identity_service::schema;
use identity_service::services::*;
use identity_service::{build_router, AppState};

// ============================================================================
// Stub backend
// ============================================================================

#[derive(Default)]
pub struct StubBackend {
    pub orgs: Mutex<Vec<Organization>>,
    pub users: Mutex<Vec<User>>,
    pub members: Mutex<HashMap<String, Vec<String>>>,
    pub domains: Mutex<Vec<Domain>>,
    pub txt_missing: Mutex<HashSet<String>>,
    pub invitations: Mutex<Vec<Invitation>>,
    pub service_users: Mutex<Vec<ServiceUser>>,
    pub secrets: Mutex<Vec<(String, SecretCredential)>>,
    pub su_tokens: Mutex<Vec<(String, ServiceUserToken)>>,
    pub metaschemas: Mutex<Vec<MetaSchema>>,
    pub permissions: Mutex<Vec<Permission>>,
    pub relations: Mutex<Vec<Relation>>,
    pub allowed: Mutex<HashSet<(String, String, String)>>,
    pub roles: Mutex<Vec<(String, String, Role)>>,
    pub projects: Mutex<Vec<Project>>,
    pub owned_projects: Mutex<HashMap<String, Vec<String>>>,
    pub pats: Mutex<Vec<PersonalAccessToken>>,
    pub principals: Mutex<HashMap<String, Principal>>,
    pub disabled_tokens: Mutex<HashSet<String>>,
    pub superusers: Mutex<HashSet<String>>,
}

impl StubBackend {
    pub fn new() -> Arc<Self> {
        let stub = Self::default();
        // permissions the authorizer resolves during tests
        {
            let mut permissions = stub.permissions.lock().unwrap();
            for name in [
                "get",
                "update",
                "delete",
                "membership",
                "invitationcreate",
                "serviceusermanage",
            ] {
                permissions.push(permission(schema::ORGANIZATION_NAMESPACE, name));
            }
            for name in ["get", "delete", "accept"] {
                permissions.push(permission(schema::INVITATION_NAMESPACE, name));
            }
            for name in ["get", "update", "delete"] {
                permissions.push(permission(schema::PROJECT_NAMESPACE, name));
            }
        }
        Arc::new(stub)
    }

    pub fn seed_org(&self, id: &str, name: &str, state: OrgState) -> Organization {
        let org = Organization {
            id: id.to_string(),
            name: name.to_string(),
            title: String::new(),
            avatar: String::new(),
            metadata: Metadata::new(),
            state,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.orgs.lock().unwrap().push(org.clone());
        org
    }

    pub fn seed_user(&self, id: &str, name: &str, email: &str) -> User {
        let user = User {
            id: id.to_string(),
            name: name.to_string(),
            title: String::new(),
            email: email.to_string(),
            avatar: String::new(),
            metadata: Metadata::new(),
            state: "enabled".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn seed_service_user(&self, id: &str, org_id: &str) -> ServiceUser {
        let su = ServiceUser {
            id: id.to_string(),
            org_id: org_id.to_string(),
            title: String::new(),
            metadata: Metadata::new(),
            state: "enabled".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.service_users.lock().unwrap().push(su.clone());
        su
    }

    pub fn add_member(&self, org_id: &str, user_id: &str) {
        self.members
            .lock()
            .unwrap()
            .entry(org_id.to_string())
            .or_default()
            .push(user_id.to_string());
    }

    pub fn token_for_user(&self, token: &str, user: &User) {
        self.principals.lock().unwrap().insert(
            token.to_string(),
            Principal {
                id: user.id.clone(),
                principal_type: PrincipalType::User,
                user: Some(user.clone()),
                service_user: None,
            },
        );
    }

    pub fn token_for_service_user(&self, token: &str, su: &ServiceUser) {
        self.principals.lock().unwrap().insert(
            token.to_string(),
            Principal {
                id: su.id.clone(),
                principal_type: PrincipalType::ServiceUser,
                user: None,
                service_user: Some(su.clone()),
            },
        );
    }

    pub fn make_superuser(&self, principal_id: &str) {
        self.superusers
            .lock()
            .unwrap()
            .insert(principal_id.to_string());
    }

    pub fn allow(
        &self,
        subject_ns: &str,
        subject_id: &str,
        object_ns: &str,
        object_id: &str,
        permission: &str,
    ) {
        self.allowed.lock().unwrap().insert((
            format!("{subject_ns}:{subject_id}"),
            format!("{object_ns}:{object_id}"),
            permission.to_string(),
        ));
    }

    fn is_member(&self, org_id: &str, user_id: &str) -> bool {
        self.members
            .lock()
            .unwrap()
            .get(org_id)
            .map(|ids| ids.iter().any(|id| id == user_id))
            .unwrap_or(false)
    }
}

fn permission(namespace: &str, name: &str) -> Permission {
    Permission {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        namespace_id: namespace.to_string(),
        metadata: Metadata::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

#[async_trait]
impl OrganizationService for StubBackend {
    async fn get(&self, id_or_name: &str) -> Result<Organization, OrganizationError> {
        let org = self
            .orgs
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id_or_name || o.name == id_or_name)
            .cloned()
            .ok_or(OrganizationError::NotExist)?;
        if org.state == OrgState::Disabled {
            return Err(OrganizationError::Disabled);
        }
        Ok(org)
    }

    async fn get_raw(&self, id_or_name: &str) -> Result<Organization, OrganizationError> {
        self.orgs
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id_or_name || o.name == id_or_name)
            .cloned()
            .ok_or(OrganizationError::NotExist)
    }

    async fn create(&self, mut org: Organization) -> Result<Organization, OrganizationError> {
        let mut orgs = self.orgs.lock().unwrap();
        if orgs.iter().any(|o| o.name == org.name) {
            return Err(OrganizationError::Conflict);
        }
        org.id = Uuid::new_v4().to_string();
        orgs.push(org.clone());
        Ok(org)
    }

    async fn update(&self, org: Organization) -> Result<Organization, OrganizationError> {
        let mut orgs = self.orgs.lock().unwrap();
        if orgs
            .iter()
            .any(|o| o.name == org.name && o.id != org.id)
        {
            return Err(OrganizationError::Conflict);
        }
        let existing = orgs
            .iter_mut()
            .find(|o| o.id == org.id)
            .ok_or(OrganizationError::NotExist)?;
        *existing = org.clone();
        Ok(org)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Organization>, OrganizationError> {
        let members = self.members.lock().unwrap();
        Ok(self
            .orgs
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.state == OrgState::Enabled)
            .filter(|o| {
                members
                    .get(&o.id)
                    .map(|ids| ids.iter().any(|id| id == user_id))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        state: Option<OrgState>,
    ) -> Result<Vec<Organization>, OrganizationError> {
        Ok(self
            .orgs
            .lock()
            .unwrap()
            .iter()
            .filter(|o| state.map(|s| o.state == s).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn enable(&self, id: &str) -> Result<(), OrganizationError> {
        let mut orgs = self.orgs.lock().unwrap();
        let org = orgs
            .iter_mut()
            .find(|o| o.id == id || o.name == id)
            .ok_or(OrganizationError::NotExist)?;
        org.state = OrgState::Enabled;
        Ok(())
    }

    async fn disable(&self, id: &str) -> Result<(), OrganizationError> {
        let mut orgs = self.orgs.lock().unwrap();
        let org = orgs
            .iter_mut()
            .find(|o| o.id == id || o.name == id)
            .ok_or(OrganizationError::NotExist)?;
        org.state = OrgState::Disabled;
        Ok(())
    }

    async fn add_users(
        &self,
        org_id: &str,
        user_ids: &[String],
    ) -> Result<(), OrganizationError> {
        let mut members = self.members.lock().unwrap();
        members
            .entry(org_id.to_string())
            .or_default()
            .extend(user_ids.iter().cloned());
        Ok(())
    }

    async fn remove_user(&self, org_id: &str, user_id: &str) -> Result<(), OrganizationError> {
        let mut members = self.members.lock().unwrap();
        if let Some(ids) = members.get_mut(org_id) {
            ids.retain(|id| id != user_id);
        }
        Ok(())
    }
}

#[async_trait]
impl UserService for StubBackend {
    async fn get_by_id(&self, id: &str) -> Result<User, UserError> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id || u.name == id || u.email == id)
            .cloned()
            .ok_or(UserError::NotExist)
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<User>, UserError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn create(&self, mut user: User) -> Result<User, UserError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(UserError::Conflict);
        }
        user.id = Uuid::new_v4().to_string();
        user.state = "enabled".to_string();
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.lock().unwrap();
        let existing = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(UserError::NotExist)?;
        *existing = user.clone();
        Ok(user)
    }

    async fn list(
        &self,
        keyword: Option<&str>,
        state: Option<&str>,
    ) -> Result<Vec<User>, UserError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| keyword.map(|k| u.email.contains(k) || u.name.contains(k)).unwrap_or(true))
            .filter(|u| state.map(|s| u.state == s).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn list_by_org(
        &self,
        org_id: &str,
        _permission_filter: &str,
    ) -> Result<Vec<User>, UserError> {
        let ids = self
            .members
            .lock()
            .unwrap()
            .get(org_id)
            .cloned()
            .unwrap_or_default();
        UserService::get_by_ids(self, &ids).await
    }

    async fn enable(&self, id: &str) -> Result<(), UserError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(UserError::NotExist)?;
        user.state = "enabled".to_string();
        Ok(())
    }

    async fn disable(&self, id: &str) -> Result<(), UserError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(UserError::NotExist)?;
        user.state = "disabled".to_string();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), UserError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(UserError::NotExist);
        }
        Ok(())
    }

    async fn is_sudo(&self, id: &str, _permission: &str) -> Result<bool, UserError> {
        Ok(self.superusers.lock().unwrap().contains(id))
    }

    async fn sudo(&self, id: &str, _relation: &str) -> Result<(), UserError> {
        if !self.users.lock().unwrap().iter().any(|u| u.id == id) {
            return Err(UserError::NotExist);
        }
        self.superusers.lock().unwrap().insert(id.to_string());
        Ok(())
    }

    async fn unsudo(&self, id: &str) -> Result<(), UserError> {
        self.superusers.lock().unwrap().remove(id);
        Ok(())
    }
}

#[async_trait]
impl DomainService for StubBackend {
    async fn get(&self, id: &str) -> Result<Domain, DomainError> {
        self.domains
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or(DomainError::NotExist)
    }

    async fn create(&self, mut domain: Domain) -> Result<Domain, DomainError> {
        let mut domains = self.domains.lock().unwrap();
        if domains
            .iter()
            .any(|d| d.name == domain.name && d.org_id == domain.org_id)
        {
            return Err(DomainError::DuplicateKey);
        }
        domain.id = Uuid::new_v4().to_string();
        domain.token = format!("_domain-challenge={}", Uuid::new_v4());
        domains.push(domain.clone());
        Ok(domain)
    }

    async fn list(&self, filter: DomainFilter) -> Result<Vec<Domain>, DomainError> {
        Ok(self
            .domains
            .lock()
            .unwrap()
            .iter()
            .filter(|d| filter.org_id.as_deref().map(|o| d.org_id == o).unwrap_or(true))
            .filter(|d| filter.state.map(|s| d.state == s).unwrap_or(true))
            .filter(|d| filter.name.as_deref().map(|n| d.name == n).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let mut domains = self.domains.lock().unwrap();
        let before = domains.len();
        domains.retain(|d| d.id != id);
        if domains.len() == before {
            return Err(DomainError::NotExist);
        }
        Ok(())
    }

    async fn verify_domain(&self, id: &str) -> Result<Domain, DomainError> {
        if self.txt_missing.lock().unwrap().contains(id) {
            return Err(DomainError::TxtRecordNotFound);
        }
        let mut domains = self.domains.lock().unwrap();
        let domain = domains
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(DomainError::NotExist)?;
        domain.state = DomainState::Verified;
        Ok(domain.clone())
    }

    async fn join(&self, org_id: &str, user_id: &str) -> Result<(), DomainError> {
        let email_domain = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .and_then(|u| u.email.split('@').nth(1).map(str::to_string))
            .ok_or_else(|| DomainError::Internal(anyhow!("user missing")))?;
        let matches = self.domains.lock().unwrap().iter().any(|d| {
            d.org_id == org_id && d.state == DomainState::Verified && d.name == email_domain
        });
        if !matches {
            return Err(DomainError::DomainsMismatch);
        }
        self.add_member(org_id, user_id);
        Ok(())
    }
}

#[async_trait]
impl InvitationService for StubBackend {
    async fn get(&self, id: Uuid) -> Result<Invitation, InvitationError> {
        self.invitations
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(InvitationError::NotFound)
    }

    async fn create(&self, mut invitation: Invitation) -> Result<Invitation, InvitationError> {
        invitation.id = Uuid::new_v4();
        invitation.expires_at = Utc::now() + Duration::days(7);
        self.invitations.lock().unwrap().push(invitation.clone());
        Ok(invitation)
    }

    async fn list(&self, filter: InvitationFilter) -> Result<Vec<Invitation>, InvitationError> {
        Ok(self
            .invitations
            .lock()
            .unwrap()
            .iter()
            .filter(|i| filter.org_id.as_deref().map(|o| i.org_id == o).unwrap_or(true))
            .filter(|i| {
                filter
                    .user_id
                    .as_deref()
                    .map(|u| i.user_email_id == u)
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn accept(&self, id: Uuid) -> Result<(), InvitationError> {
        let invitation = InvitationService::get(self, id).await?;
        if invitation.expires_at < Utc::now() {
            return Err(InvitationError::Expired);
        }
        let user_id = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == invitation.user_email_id)
            .map(|u| u.id.clone())
            .ok_or(InvitationError::NotFound)?;
        if self.is_member(&invitation.org_id, &user_id) {
            return Err(InvitationError::AlreadyMember);
        }
        self.add_member(&invitation.org_id, &user_id);
        self.invitations.lock().unwrap().retain(|i| i.id != id);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), InvitationError> {
        let mut invitations = self.invitations.lock().unwrap();
        let before = invitations.len();
        invitations.retain(|i| i.id != id);
        if invitations.len() == before {
            return Err(InvitationError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceUserService for StubBackend {
    async fn get(&self, id: &str) -> Result<ServiceUser, ServiceUserError> {
        self.service_users
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(ServiceUserError::NotExist)
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<ServiceUser>, ServiceUserError> {
        Ok(self
            .service_users
            .lock()
            .unwrap()
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        mut service_user: ServiceUser,
    ) -> Result<ServiceUser, ServiceUserError> {
        service_user.id = Uuid::new_v4().to_string();
        service_user.state = "enabled".to_string();
        self.service_users.lock().unwrap().push(service_user.clone());
        Ok(service_user)
    }

    async fn list(
        &self,
        filter: ServiceUserFilter,
    ) -> Result<Vec<ServiceUser>, ServiceUserError> {
        Ok(self
            .service_users
            .lock()
            .unwrap()
            .iter()
            .filter(|s| filter.org_id.as_deref().map(|o| s.org_id == o).unwrap_or(true))
            .filter(|s| filter.state.as_deref().map(|st| s.state == st).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn list_by_org(&self, org_id: &str) -> Result<Vec<ServiceUser>, ServiceUserError> {
        ServiceUserService::list(
            self,
            ServiceUserFilter {
                org_id: Some(org_id.to_string()),
                state: None,
            },
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceUserError> {
        let mut sus = self.service_users.lock().unwrap();
        let before = sus.len();
        sus.retain(|s| s.id != id);
        if sus.len() == before {
            return Err(ServiceUserError::NotExist);
        }
        Ok(())
    }

    async fn create_secret(
        &self,
        service_user_id: &str,
        title: &str,
    ) -> Result<SecretCredential, ServiceUserError> {
        ServiceUserService::get(self, service_user_id).await?;
        let secret = SecretCredential {
            id: Uuid::new_v4(),
            title: title.to_string(),
            secret_value: format!("secret-{}", Uuid::new_v4()),
            created_at: Utc::now(),
        };
        self.secrets
            .lock()
            .unwrap()
            .push((service_user_id.to_string(), secret.clone()));
        Ok(secret)
    }

    async fn list_secret(
        &self,
        service_user_id: &str,
    ) -> Result<Vec<SecretCredential>, ServiceUserError> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| owner == service_user_id)
            .map(|(_, secret)| secret.clone())
            .collect())
    }

    async fn delete_secret(
        &self,
        service_user_id: &str,
        secret_id: Uuid,
    ) -> Result<(), ServiceUserError> {
        let mut secrets = self.secrets.lock().unwrap();
        let before = secrets.len();
        secrets.retain(|(owner, secret)| !(owner == service_user_id && secret.id == secret_id));
        if secrets.len() == before {
            return Err(ServiceUserError::CredNotExist);
        }
        Ok(())
    }

    async fn create_token(
        &self,
        service_user_id: &str,
        title: &str,
    ) -> Result<ServiceUserToken, ServiceUserError> {
        ServiceUserService::get(self, service_user_id).await?;
        let token = ServiceUserToken {
            id: Uuid::new_v4(),
            title: title.to_string(),
            token: format!("token-{}", Uuid::new_v4()),
            created_at: Utc::now(),
        };
        self.su_tokens
            .lock()
            .unwrap()
            .push((service_user_id.to_string(), token.clone()));
        Ok(token)
    }

    async fn list_token(
        &self,
        service_user_id: &str,
    ) -> Result<Vec<ServiceUserToken>, ServiceUserError> {
        Ok(self
            .su_tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| owner == service_user_id)
            .map(|(_, token)| token.clone())
            .collect())
    }

    async fn delete_token(
        &self,
        service_user_id: &str,
        token_id: Uuid,
    ) -> Result<(), ServiceUserError> {
        let mut tokens = self.su_tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|(owner, token)| !(owner == service_user_id && token.id == token_id));
        if tokens.len() == before {
            return Err(ServiceUserError::CredNotExist);
        }
        Ok(())
    }

    async fn list_owned_projects(
        &self,
        service_user_id: &str,
    ) -> Result<Vec<String>, ServiceUserError> {
        Ok(self
            .owned_projects
            .lock()
            .unwrap()
            .get(service_user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn is_sudo(&self, id: &str, _permission: &str) -> Result<bool, ServiceUserError> {
        Ok(self.superusers.lock().unwrap().contains(id))
    }

    async fn sudo(&self, id: &str, _relation: &str) -> Result<(), ServiceUserError> {
        if !self.service_users.lock().unwrap().iter().any(|s| s.id == id) {
            return Err(ServiceUserError::NotExist);
        }
        self.superusers.lock().unwrap().insert(id.to_string());
        Ok(())
    }

    async fn unsudo(&self, id: &str) -> Result<(), ServiceUserError> {
        self.superusers.lock().unwrap().remove(id);
        Ok(())
    }
}

#[async_trait]
impl MetaSchemaService for StubBackend {
    async fn get(&self, id: &str) -> Result<MetaSchema, MetaSchemaError> {
        self.metaschemas
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(MetaSchemaError::NotExist)
    }

    async fn create(&self, mut schema: MetaSchema) -> Result<MetaSchema, MetaSchemaError> {
        let mut schemas = self.metaschemas.lock().unwrap();
        if schemas.iter().any(|m| m.name == schema.name) {
            return Err(MetaSchemaError::Conflict);
        }
        schema.id = Uuid::new_v4().to_string();
        schemas.push(schema.clone());
        Ok(schema)
    }

    async fn list(&self) -> Result<Vec<MetaSchema>, MetaSchemaError> {
        Ok(self.metaschemas.lock().unwrap().clone())
    }

    async fn update(&self, id: &str, schema: MetaSchema) -> Result<MetaSchema, MetaSchemaError> {
        let mut schemas = self.metaschemas.lock().unwrap();
        let existing = schemas
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(MetaSchemaError::NotExist)?;
        existing.name = schema.name;
        existing.schema = schema.schema;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), MetaSchemaError> {
        let mut schemas = self.metaschemas.lock().unwrap();
        let before = schemas.len();
        schemas.retain(|m| m.id != id);
        if schemas.len() == before {
            return Err(MetaSchemaError::NotExist);
        }
        Ok(())
    }

    async fn validate(&self, metadata: &Metadata, _name: &str) -> Result<(), MetaSchemaError> {
        // test hook: a "forbidden" key fails schema validation
        if metadata.contains_key("forbidden") {
            return Err(MetaSchemaError::MetadataMismatch);
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionService for StubBackend {
    async fn get(&self, id_or_slug: &str) -> Result<Permission, PermissionError> {
        self.permissions
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id_or_slug || p.slug() == id_or_slug)
            .cloned()
            .ok_or(PermissionError::NotExist)
    }
}

#[async_trait]
impl RelationService for StubBackend {
    async fn list_relations(
        &self,
        object: Object,
        subject_namespace: &str,
        relation_name: &str,
    ) -> Result<Vec<Relation>, RelationError> {
        Ok(self
            .relations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.object.id == object.id
                    && r.object.namespace == object.namespace
                    && r.subject.namespace == subject_namespace
                    && r.relation_name == relation_name
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResourceService for StubBackend {
    async fn check_authz(&self, check: Check) -> Result<bool, ResourceError> {
        Ok(self.allowed.lock().unwrap().contains(&(
            format!("{}:{}", check.subject.namespace, check.subject.id),
            format!("{}:{}", check.object.namespace, check.object.id),
            check.permission.clone(),
        )))
    }

    async fn batch_check(&self, checks: Vec<Check>) -> Result<Vec<CheckPair>, ResourceError> {
        let mut pairs = Vec::with_capacity(checks.len());
        for check in checks {
            let status = ResourceService::check_authz(self, check.clone()).await?;
            pairs.push(CheckPair { check, status });
        }
        Ok(pairs)
    }
}

#[async_trait]
impl PolicyService for StubBackend {
    async fn list_roles(&self, org_id: &str, user_id: &str) -> Result<Vec<Role>, PolicyError> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .iter()
            .filter(|(org, user, _)| org == org_id && user == user_id)
            .map(|(_, _, role)| role.clone())
            .collect())
    }
}

#[async_trait]
impl ProjectService for StubBackend {
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Project>, ProjectError> {
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuthnService for StubBackend {
    async fn get_principal(&self, token: &str) -> Result<Principal, AuthnError> {
        if self.disabled_tokens.lock().unwrap().contains(token) {
            return Err(AuthnError::Disabled);
        }
        self.principals
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(AuthnError::Unauthenticated)
    }
}

#[async_trait]
impl UserPatService for StubBackend {
    async fn create(&self, pat: PatCreate) -> Result<PersonalAccessToken, PatError> {
        let token = PersonalAccessToken {
            id: Uuid::new_v4(),
            user_id: pat.user_id,
            org_id: pat.org_id,
            title: pat.title,
            token: format!("idp_{}", Uuid::new_v4().simple()),
            expires_at: pat.expires_at,
            created_at: Utc::now(),
        };
        self.pats.lock().unwrap().push(token.clone());
        Ok(token)
    }

    async fn list(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Vec<PersonalAccessToken>, PatError> {
        Ok(self
            .pats
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id && p.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<(), PatError> {
        let mut pats = self.pats.lock().unwrap();
        let before = pats.len();
        pats.retain(|p| !(p.user_id == user_id && p.id == id));
        if pats.len() == before {
            return Err(PatError::NotFound);
        }
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn test_config() -> IdentityConfig {
    IdentityConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "identity-service".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        backend: BackendConfig {
            base_url: "http://127.0.0.1:0".to_string(),
            timeout_seconds: 1,
        },
        security: SecurityConfig::default(),
        pat: PatConfig::default(),
    }
}

pub struct TestHarness {
    pub stub: Arc<StubBackend>,
    pub app: Router,
}

pub fn harness() -> TestHarness {
    harness_with_config(test_config())
}

pub fn harness_with_config(config: IdentityConfig) -> TestHarness {
    let stub = StubBackend::new();
    let state = AppState {
        config,
        org_service: stub.clone(),
        user_service: stub.clone(),
        domain_service: stub.clone(),
        invitation_service: stub.clone(),
        service_user_service: stub.clone(),
        metaschema_service: stub.clone(),
        permission_service: stub.clone(),
        relation_service: stub.clone(),
        resource_service: stub.clone(),
        policy_service: stub.clone(),
        project_service: stub.clone(),
        authn_service: stub.clone(),
        pat_service: stub.clone(),
    };
    let app = build_router(state);
    TestHarness { stub, app }
}

pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    request(app, Method::GET, uri, token, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    request(app, Method::POST, uri, token, Some(body)).await
}

pub async fn put(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    request(app, Method::PUT, uri, token, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    request(app, Method::DELETE, uri, token, None).await
}
