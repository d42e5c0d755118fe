//! Axum router configuration for payment endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    handle_paystack_webhook, initiate_payment, verify_payment, PaymentAppState,
};

/// Payment API routes (require authentication, except verify which makes
/// its own auth decision after persisting the confirmation).
///
/// - `POST /` - Initiate a payment, minting its reference
/// - `GET /verify/:reference` - Verify a payment after checkout
pub fn payment_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/", post(initiate_payment))
        .route("/verify/:reference", get(verify_payment))
}

/// Webhook routes: no bearer auth, authenticated by signature.
///
/// - `POST /paystack` - Handle Paystack webhook events
pub fn webhook_routes() -> Router<PaymentAppState> {
    Router::new().route("/paystack", post(handle_paystack_webhook))
}

/// Complete payment module router, suitable for nesting under `/api`.
pub fn payment_router() -> Router<PaymentAppState> {
    Router::new()
        .nest("/payments", payment_routes())
        .nest("/webhooks", webhook_routes())
}
