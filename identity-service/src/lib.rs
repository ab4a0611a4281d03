pub mod clients;
pub mod config;
pub mod handlers;
pub mod metadata;
pub mod middleware;
pub mod schema;
pub mod services;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::request_id::request_id_middleware;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::IdentityConfig;
use crate::services::{
    AuthnService, DomainService, InvitationService, MetaSchemaService, OrganizationService,
    PermissionService, PolicyService, ProjectService, RelationService, ResourceService,
    ServiceUserService, UserPatService, UserService,
};
use service_core::error::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::org::list_organizations,
        handlers::org::create_organization,
        handlers::org::get_organization,
        handlers::org::update_organization,
        handlers::check::check_resource_permission,
        handlers::check::batch_check_permission,
    ),
    tags(
        (name = "Organization", description = "Organization lifecycle and membership"),
        (name = "Permission", description = "Authorization checks"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: IdentityConfig,
    pub org_service: Arc<dyn OrganizationService>,
    pub user_service: Arc<dyn UserService>,
    pub domain_service: Arc<dyn DomainService>,
    pub invitation_service: Arc<dyn InvitationService>,
    pub service_user_service: Arc<dyn ServiceUserService>,
    pub metaschema_service: Arc<dyn MetaSchemaService>,
    pub permission_service: Arc<dyn PermissionService>,
    pub relation_service: Arc<dyn RelationService>,
    pub resource_service: Arc<dyn ResourceService>,
    pub policy_service: Arc<dyn PolicyService>,
    pub project_service: Arc<dyn ProjectService>,
    pub authn_service: Arc<dyn AuthnService>,
    pub pat_service: Arc<dyn UserPatService>,
}

pub fn build_router(state: AppState) -> Router {
    let org_routes = Router::new()
        .route(
            "/v1beta1/organizations",
            get(handlers::org::list_organizations).post(handlers::org::create_organization),
        )
        .route(
            "/v1beta1/organizations/:id",
            get(handlers::org::get_organization).put(handlers::org::update_organization),
        )
        .route(
            "/v1beta1/organizations/:id/enable",
            post(handlers::org::enable_organization),
        )
        .route(
            "/v1beta1/organizations/:id/disable",
            post(handlers::org::disable_organization),
        )
        .route(
            "/v1beta1/organizations/:id/users",
            get(handlers::org::list_organization_users).post(handlers::org::add_organization_users),
        )
        .route(
            "/v1beta1/organizations/:id/users/:user_id",
            delete(handlers::org::remove_organization_user),
        )
        .route(
            "/v1beta1/organizations/:id/admins",
            get(handlers::org::list_organization_admins),
        )
        .route(
            "/v1beta1/organizations/:id/serviceusers",
            get(handlers::org::list_organization_service_users),
        );

    let domain_routes = Router::new()
        .route(
            "/v1beta1/organizations/:id/domains",
            get(handlers::domain::list_domains).post(handlers::domain::create_domain),
        )
        .route(
            "/v1beta1/organizations/:id/domains/:domain_id",
            get(handlers::domain::get_domain).delete(handlers::domain::delete_domain),
        )
        .route(
            "/v1beta1/organizations/:id/domains/:domain_id/verify",
            post(handlers::domain::verify_domain),
        )
        .route(
            "/v1beta1/organizations/:id/join",
            post(handlers::domain::join_organization),
        );

    let invitation_routes = Router::new()
        .route(
            "/v1beta1/organizations/:id/invitations",
            get(handlers::invitation::list_invitations).post(handlers::invitation::create_invitation),
        )
        .route(
            "/v1beta1/organizations/:id/invitations/:invitation_id",
            get(handlers::invitation::get_invitation).delete(handlers::invitation::delete_invitation),
        )
        .route(
            "/v1beta1/organizations/:id/invitations/:invitation_id/accept",
            post(handlers::invitation::accept_invitation),
        );

    let user_routes = Router::new()
        .route(
            "/v1beta1/users",
            get(handlers::user::list_users).post(handlers::user::create_user),
        )
        .route(
            "/v1beta1/users/self",
            get(handlers::user::get_current_user).put(handlers::user::update_current_user),
        )
        .route(
            "/v1beta1/users/self/invitations",
            get(handlers::invitation::list_current_user_invitations),
        )
        .route(
            "/v1beta1/users/self/tokens",
            get(handlers::pat::list_tokens).post(handlers::pat::create_token),
        )
        .route(
            "/v1beta1/users/self/tokens/:id",
            delete(handlers::pat::delete_token),
        )
        .route(
            "/v1beta1/users/:id",
            get(handlers::user::get_user)
                .put(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        .route("/v1beta1/users/:id/enable", post(handlers::user::enable_user))
        .route(
            "/v1beta1/users/:id/disable",
            post(handlers::user::disable_user),
        );

    let check_routes = Router::new()
        .route(
            "/v1beta1/check",
            post(handlers::check::check_resource_permission),
        )
        .route(
            "/v1beta1/check/federated",
            post(handlers::check::check_federated_resource_permission),
        )
        .route(
            "/v1beta1/batchcheck",
            post(handlers::check::batch_check_permission),
        );

    let service_user_routes = Router::new()
        .route(
            "/v1beta1/serviceusers",
            get(handlers::service_user::list_service_users)
                .post(handlers::service_user::create_service_user),
        )
        .route(
            "/v1beta1/serviceusers/:id",
            get(handlers::service_user::get_service_user)
                .delete(handlers::service_user::delete_service_user),
        )
        .route(
            "/v1beta1/serviceusers/:id/secrets",
            get(handlers::service_user::list_service_user_secrets)
                .post(handlers::service_user::create_service_user_secret),
        )
        .route(
            "/v1beta1/serviceusers/:id/secrets/:secret_id",
            delete(handlers::service_user::delete_service_user_secret),
        )
        .route(
            "/v1beta1/serviceusers/:id/tokens",
            get(handlers::service_user::list_service_user_tokens)
                .post(handlers::service_user::create_service_user_token),
        )
        .route(
            "/v1beta1/serviceusers/:id/tokens/:token_id",
            delete(handlers::service_user::delete_service_user_token),
        )
        .route(
            "/v1beta1/serviceusers/:id/projects",
            get(handlers::service_user::list_service_user_projects),
        );

    let admin_routes = Router::new()
        .route("/v1beta1/admin/users", get(handlers::platform::admin_list_users))
        .route(
            "/v1beta1/admin/organizations",
            get(handlers::platform::admin_list_organizations),
        )
        .route(
            "/v1beta1/admin/serviceusers",
            get(handlers::platform::admin_list_service_users),
        )
        .route(
            "/v1beta1/admin/platform/users",
            get(handlers::platform::list_platform_users)
                .post(handlers::platform::add_platform_user)
                .delete(handlers::platform::remove_platform_user),
        );

    let metaschema_routes = Router::new()
        .route(
            "/v1beta1/meta/schemas",
            get(handlers::metaschema::list_metaschemas).post(handlers::metaschema::create_metaschema),
        )
        .route(
            "/v1beta1/meta/schemas/:id",
            get(handlers::metaschema::get_metaschema)
                .put(handlers::metaschema::update_metaschema)
                .delete(handlers::metaschema::delete_metaschema),
        );

    let allowed_origins: Vec<HeaderValue> = state
        .config
        .security
        .allowed_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().unwrap_or_else(|e| {
                tracing::error!("Invalid CORS origin '{}': {}. Using fallback.", origin, e);
                HeaderValue::from_static("*")
            })
        })
        .collect();

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(org_routes)
        .merge(domain_routes)
        .merge(invitation_routes)
        .merge(user_routes)
        .merge(check_routes)
        .merge(service_user_routes)
        .merge(admin_routes)
        .merge(metaschema_routes)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<service_core::middleware::request_id::RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        )
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
    })))
}
