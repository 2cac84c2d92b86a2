//! HTTP control plane for ephemeral per-reference deployments.
//!
//! | Method | Path                 | Auth   | Rate limit            |
//! |--------|----------------------|--------|-----------------------|
//! | POST   | `/deployments/:ref`  | Bearer | global                |
//! | DELETE | `/deployments/:ref`  | Bearer | global + delete       |
//! | GET    | `/status`            | none   | none                  |

mod auth;
mod config;
mod error;
mod rate_limit;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::HeaderMap,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use deploy_runtime::{DeploymentService, Reference, INVALID_REFERENCE_MESSAGE};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use auth::{AuthGuard, AUTH_FAILURE_DELAY};
pub use config::{RateLimits, ServerConfig};
pub use error::ServerError;
pub use rate_limit::{RateLimit, RateLimiter, RouteLimiter};

const CREATE_ROUTE: &str = "create";
const DELETE_ROUTE: &str = "delete";

#[derive(Debug, Serialize, Deserialize)]
pub struct DeploymentCreated {
    pub message: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeploymentDeleted {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<DeploymentService>,
    auth: AuthGuard,
}

pub fn create_app(service: DeploymentService, config: ServerConfig) -> Router {
    let auth = AuthGuard::new(config.secret.as_deref());
    if !auth.is_configured() {
        warn!("No shared secret configured, every deployment request will be rejected");
    }

    let limiter = Arc::new(
        RateLimiter::new(config.rate_limits.global)
            .with_route_limits(DELETE_ROUTE, config.rate_limits.delete),
    );
    let limited = |route| {
        middleware::from_fn_with_state(
            RouteLimiter {
                limiter: limiter.clone(),
                route,
            },
            rate_limit::enforce,
        )
    };

    let state = AppState {
        service: Arc::new(service),
        auth,
    };

    Router::new()
        .route(
            "/deployments/:reference",
            post(create_or_update_deployment)
                .route_layer(limited(CREATE_ROUTE))
                .merge(delete(delete_deployment).route_layer(limited(DELETE_ROUTE))),
        )
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;
    serve(listener, app).await
}

/// Serve `app` on an already bound listener until a shutdown signal arrives.
pub async fn serve(listener: TcpListener, app: Router) -> Result<(), ServerError> {
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::ServerError(e.to_string()))?;
    info!("Starting deployment server on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ServerError::ServerError(e.to_string()))?;

    info!("Deployment server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK".to_string(),
    })
}

/// Undecodable path segments are reported like any other invalid reference,
/// after authentication has run.
fn parse_reference(path: Result<Path<String>, PathRejection>) -> Result<Reference, ServerError> {
    let Path(raw) = path.map_err(|rejection| {
        error!(error = %rejection, "Invalid reference format");
        ServerError::InvalidReference(INVALID_REFERENCE_MESSAGE.to_string())
    })?;
    Ok(Reference::parse(&raw)?)
}

async fn create_or_update_deployment(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<DeploymentCreated>, ServerError> {
    state.auth.authorize(&headers).await?;
    let reference = parse_reference(path)?;

    let deployment = state.service.create_or_update(&reference).await?;

    Ok(Json(DeploymentCreated {
        message: format!("Deployment created/updated for {}", reference),
        url: deployment.url(),
    }))
}

async fn delete_deployment(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<DeploymentDeleted>, ServerError> {
    state.auth.authorize(&headers).await?;
    let reference = parse_reference(path)?;

    state.service.delete(&reference).await?;

    Ok(Json(DeploymentDeleted {
        message: format!("Deployment deleted for {}", reference),
    }))
}
