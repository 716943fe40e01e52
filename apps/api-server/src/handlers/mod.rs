//! HTTP handlers and route configuration.

mod demo;
mod health;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/health", web::get().to(health::health_check))
        // Behind the quota gate with the default prefix
        .route("/v1/secure", web::get().to(demo::secure))
        // Never gated
        .route("/v2/open", web::get().to(demo::open));
}
