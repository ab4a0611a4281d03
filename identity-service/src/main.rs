use std::net::SocketAddr;
use std::sync::Arc;

use identity_service::{build_router, clients::CoreClient, config::IdentityConfig, AppState};
use service_core::observability::logging::init_tracing;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = IdentityConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity service"
    );

    // One backend client serves every domain service interface
    let backend = Arc::new(CoreClient::new(&config.backend)?);
    tracing::info!(base_url = %config.backend.base_url, "Backend client initialized");

    let state = AppState {
        config: config.clone(),
        org_service: backend.clone(),
        user_service: backend.clone(),
        domain_service: backend.clone(),
        invitation_service: backend.clone(),
        service_user_service: backend.clone(),
        metaschema_service: backend.clone(),
        permission_service: backend.clone(),
        relation_service: backend.clone(),
        resource_service: backend.clone(),
        policy_service: backend.clone(),
        project_service: backend.clone(),
        authn_service: backend.clone(),
        pat_service: backend,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
