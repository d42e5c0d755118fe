//! Smart Ajo server binary.
//!
//! Loads configuration from the environment, connects to Postgres, wires
//! the Paystack gateway and JWT auth into the payment router, and serves.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use smart_ajo::adapters::auth::JwtAuthProvider;
use smart_ajo::adapters::http::payment::{payment_router, PaymentAppState};
use smart_ajo::adapters::paystack::{PaystackConfig, PaystackGateway};
use smart_ajo::adapters::postgres::{PostgresGroupStore, PostgresPaymentRepository};
use smart_ajo::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "starting smart-ajo"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await?;
    tracing::info!("database pool connected");

    let gateway_config = PaystackConfig::new(config.payment.secret_key.expose_secret())
        .with_base_url(config.payment.api_base_url.clone())
        .with_timeout(Duration::from_secs(config.payment.verify_timeout_secs));
    let gateway = PaystackGateway::new(gateway_config)?;

    let state = PaymentAppState {
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        groups: Arc::new(PostgresGroupStore::new(pool)),
        gateway: Arc::new(gateway),
        auth: Arc::new(JwtAuthProvider::new(&config.auth.jwt_secret)),
        webhook_secret: config.payment.secret_key.expose_secret().to_string(),
    };

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", payment_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
