use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    InvalidReference(String),
    #[error("Too Many Requests")]
    RateLimited { retry_after: Duration },
    #[error("Deployment error: {0}")]
    Deployment(deploy_runtime::Error),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl From<deploy_runtime::Error> for ServerError {
    fn from(err: deploy_runtime::Error) -> Self {
        match err {
            deploy_runtime::Error::InvalidReference(message) => ServerError::InvalidReference(message),
            other => ServerError::Deployment(other),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::InvalidReference(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            ServerError::Deployment(_) | ServerError::ServerError(_) => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        if let ServerError::RateLimited { retry_after } = self {
            let seconds = retry_after.as_secs_f64().ceil().max(1.0) as u64;
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}
