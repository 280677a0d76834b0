//! API handlers for the KORMARC REST endpoints

pub mod health;
pub mod openapi;
pub mod publishers;
pub mod records;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, AppState};

/// Guard for registry writes; open when no admin token is configured
pub struct AdminToken;

#[async_trait]
impl FromRequestParts<AppState> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.server.admin_token.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(AdminToken);
        };

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        if token != expected {
            return Err(AppError::Authentication("Invalid admin token".to_string()));
        }
        Ok(AdminToken)
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Conversion
        .route("/records", post(records::convert_batch))
        .route("/records/mrk", post(records::export_mrk))
        .route("/records/:isbn", get(records::convert_one))
        // Publisher location
        .route("/publishers/location", get(publishers::locate))
        // Registry tables
        .route("/publishers", get(publishers::list_publishers))
        .route("/publishers", post(publishers::create_publisher))
        .route("/publishers/:id", delete(publishers::delete_publisher))
        .route("/regions", get(publishers::list_regions))
        .route("/regions", post(publishers::create_region))
        .route("/regions/:id", delete(publishers::delete_region))
        .route("/imprints", get(publishers::list_imprints))
        .route("/imprints", post(publishers::create_imprint))
        .route("/imprints/:id", delete(publishers::delete_imprint))
        .route("/registry/import", post(publishers::import_registry))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
