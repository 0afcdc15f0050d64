use std::sync::{Arc, Mutex};

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use worklane::config::AppConfig;
use worklane::db;
use worklane::handlers;
use worklane::services::provider::stripe::StripeProvider;
use worklane::services::status::AdvancePolicy;
use worklane::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    if config.stripe_secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY not set; intent creation will fail for card/upi");
    }
    if config.stripe_webhook_secret.is_empty() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; webhook signatures will not be verified");
    }
    let provider = StripeProvider::new(config.stripe_secret_key.clone());

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        policy: AdvancePolicy::default(),
        provider: Box::new(provider),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/v1/bookings", post(handlers::bookings::create))
        .route(
            "/v1/bookings/available",
            get(handlers::bookings::available_jobs),
        )
        .route(
            "/v1/bookings/worker-jobs",
            get(handlers::bookings::worker_jobs),
        )
        .route(
            "/v1/bookings/customer/:customer_id",
            get(handlers::bookings::customer_bookings),
        )
        .route("/v1/bookings/:id", get(handlers::bookings::get_booking))
        .route("/v1/bookings/:id/track", get(handlers::bookings::track))
        .route(
            "/v1/bookings/:id/status",
            patch(handlers::bookings::update_status),
        )
        .route("/v1/payments/intent", post(handlers::payments::create_intent))
        .route("/v1/payments/webhook", post(handlers::payments::webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
