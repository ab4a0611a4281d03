//! Downstream domain service interfaces.
//!
//! Every module defines the domain types, the error enum and the
//! `async_trait` interface for one external collaborator. The adapter layer
//! never implements domain logic itself; handlers sequence calls on these
//! traits and translate their errors into transport status codes.

pub mod authn;
pub mod domain;
pub mod invitation;
pub mod metaschema;
pub mod organization;
pub mod permission;
pub mod policy;
pub mod project;
pub mod relation;
pub mod resource;
pub mod service_user;
pub mod user;
pub mod user_pat;

pub use authn::{AuthnError, AuthnService, Principal, PrincipalType};
pub use domain::{Domain, DomainError, DomainFilter, DomainService, DomainState};
pub use invitation::{Invitation, InvitationError, InvitationFilter, InvitationService};
pub use metaschema::{MetaSchema, MetaSchemaError, MetaSchemaService};
pub use organization::{OrgState, Organization, OrganizationError, OrganizationService};
pub use permission::{Permission, PermissionError, PermissionService};
pub use policy::{PolicyError, PolicyService, Role};
pub use project::{Project, ProjectError, ProjectService};
pub use relation::{Object, Relation, RelationError, RelationService, Subject};
pub use resource::{Check, CheckPair, ResourceError, ResourceService};
pub use service_user::{
    SecretCredential, ServiceUser, ServiceUserError, ServiceUserFilter, ServiceUserService,
    ServiceUserToken,
};
pub use user::{User, UserError, UserService};
pub use user_pat::{PatCreate, PatError, PersonalAccessToken, UserPatService};
