//! Health check endpoint.

use actix_web::{HttpResponse, web};
use quota_shared::dto::HealthResponse;

use crate::state::AppState;

/// Health check endpoint - returns server status and the stores in use.
///
/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        bucket_store: state.backends.bucket_store.to_string(),
        policy_store: state.backends.policy_store.to_string(),
    };

    HttpResponse::Ok().json(response)
}
