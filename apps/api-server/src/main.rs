//! # Quota Gate API Server
//!
//! The main entry point for the Actix-web HTTP server. Every request passes the quota gate
//! before reaching a handler.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::RateLimitMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    // Load configuration
    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Quota Gate API Server on {}:{}",
        config.host,
        config.port
    );

    // Build application state
    let state = AppState::new(&config).await?;

    // Periodic coarse invalidation of the policy cache
    let sweep_period = config.rate_limit.cache_sweep_interval;
    #[cfg(feature = "scheduler")]
    let sweeper = background::start_policy_sweep(
        state.policies.clone(),
        sweep_period,
        background::scheduler::SchedulerConfig::from_env(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to start policy cache sweep: {e:?}"))?;
    #[cfg(not(feature = "scheduler"))]
    let sweeper = background::start_policy_sweep(state.policies.clone(), sweep_period);

    // Start HTTP server
    let gate = state.gate.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(RateLimitMiddleware::new(gate.clone()))
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    sweeper.stop().await?;

    Ok(())
}
