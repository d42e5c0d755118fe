//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to the application layer. Error
//! classification is centralized in `PaymentApiError`; raw store or network
//! errors never leak to clients unclassified.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::payment::{
    InitiatePaymentHandler, MembershipActivator, PaystackWebhookHandler, VerifyPaymentHandler,
    WebhookOutcome,
};
use crate::domain::foundation::UserId;
use crate::domain::payment::{
    ActivationError, InitiateError, PaymentReference, PaystackWebhookVerifier, VerificationError,
    WebhookError,
};
use crate::ports::{AuthError, AuthProvider, GroupStore, PaymentGateway, PaymentRepository};

use super::dto::{
    ErrorResponse, InitiatePaymentRequest, InitiatePaymentResponse, VerifyPaymentResponse,
    WebhookAckResponse,
};

/// Header carrying the Paystack webhook signature.
const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct PaymentAppState {
    pub payments: Arc<dyn PaymentRepository>,
    pub groups: Arc<dyn GroupStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub auth: Arc<dyn AuthProvider>,
    /// Secret for webhook signature verification (the Paystack secret key).
    pub webhook_secret: String,
}

impl PaymentAppState {
    fn activator(&self) -> Arc<MembershipActivator> {
        Arc::new(MembershipActivator::new(self.groups.clone()))
    }

    pub fn initiate_handler(&self) -> InitiatePaymentHandler {
        InitiatePaymentHandler::new(self.payments.clone(), self.groups.clone())
    }

    pub fn verify_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(self.payments.clone(), self.gateway.clone(), self.activator())
    }

    pub fn webhook_handler(&self) -> PaystackWebhookHandler {
        PaystackWebhookHandler::new(
            PaystackWebhookVerifier::new(self.webhook_secret.clone()),
            self.payments.clone(),
            self.activator(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Extractors
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection for `AuthenticatedUser` extraction.
pub struct AuthenticationRequired(AuthError);

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let (code, message) = match self.0 {
            AuthError::Expired => ("SESSION_EXPIRED", "Session expired, sign in again"),
            AuthError::InvalidToken(_) => ("AUTHENTICATION_REQUIRED", "Authentication is required"),
        };
        let error = ErrorResponse::new(code, message);
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

fn bearer_token(parts: &axum::http::request::Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

impl axum::extract::FromRequestParts<PaymentAppState> for AuthenticatedUser {
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        state: &'life1 PaymentAppState,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = bearer_token(parts).ok_or(AuthenticationRequired(
                AuthError::InvalidToken("missing bearer token".to_string()),
            ))?;
            let user_id = state
                .auth
                .authenticate(token)
                .await
                .map_err(AuthenticationRequired)?;
            Ok(AuthenticatedUser { user_id })
        })
    }
}

/// Best-effort user context: never rejects.
///
/// The verification endpoint uses this so a gateway confirmation is fetched
/// and persisted even when the caller's session died during checkout; the
/// auth decision is made afterwards, inside the application layer.
#[derive(Debug, Clone)]
pub struct MaybeAuthenticated(pub Option<UserId>);

impl axum::extract::FromRequestParts<PaymentAppState> for MaybeAuthenticated {
    type Rejection = std::convert::Infallible;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        state: &'life1 PaymentAppState,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = match bearer_token(parts) {
                Some(token) => state.auth.authenticate(token).await.ok(),
                None => None,
            };
            Ok(MaybeAuthenticated(user_id))
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments - Initiate a payment and mint its reference.
pub async fn initiate_payment(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let handler = state.initiate_handler();
    let initiated = handler
        .initiate(user.user_id, request.purpose, request.amount, &request.currency)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InitiatePaymentResponse::from(initiated)),
    ))
}

/// GET /api/payments/verify/{reference} - Verify a payment after checkout.
pub async fn verify_payment(
    State(state): State<PaymentAppState>,
    MaybeAuthenticated(caller): MaybeAuthenticated,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let reference =
        PaymentReference::parse(&reference).map_err(|_| PaymentApiError::MalformedReference)?;

    let handler = state.verify_handler();
    let outcome = handler.verify(&reference, caller).await?;

    Ok(Json(VerifyPaymentResponse::from(outcome)))
}

/// POST /api/webhooks/paystack - Handle Paystack webhook events.
///
/// Every authenticated event answers 200 whether or not it changed anything;
/// only signature and parse failures are rejected.
pub async fn handle_paystack_webhook(
    State(state): State<PaymentAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    let signature = headers
        .get(PAYSTACK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(PaymentApiError::Webhook(WebhookError::InvalidSignature))?;

    let handler = state.webhook_handler();
    let outcome = handler.handle(&body, signature).await?;

    if let WebhookOutcome::Flagged { reason } = &outcome {
        tracing::warn!(reason = %reason, "webhook event flagged for review");
    }

    Ok((StatusCode::OK, Json(WebhookAckResponse { status: "ok" })))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error converting application errors to HTTP responses.
pub enum PaymentApiError {
    MalformedReference,
    Initiate(InitiateError),
    Verification(VerificationError),
    Webhook(WebhookError),
}

impl From<InitiateError> for PaymentApiError {
    fn from(err: InitiateError) -> Self {
        Self::Initiate(err)
    }
}

impl From<VerificationError> for PaymentApiError {
    fn from(err: VerificationError) -> Self {
        Self::Verification(err)
    }
}

impl From<WebhookError> for PaymentApiError {
    fn from(err: WebhookError) -> Self {
        Self::Webhook(err)
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            PaymentApiError::MalformedReference => (
                StatusCode::BAD_REQUEST,
                "INVALID_REFERENCE",
                "Malformed payment reference".to_string(),
            ),

            PaymentApiError::Initiate(err) => match err {
                InitiateError::InvalidAmount(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_AMOUNT", err.to_string())
                }
                InitiateError::UnauthorizedPurpose(_) => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string())
                }
                InitiateError::GroupNotFound(_) => {
                    (StatusCode::NOT_FOUND, "GROUP_NOT_FOUND", err.to_string())
                }
                InitiateError::Store(_) => internal(),
            },

            PaymentApiError::Verification(err) => match err {
                VerificationError::Unauthenticated(_) => (
                    StatusCode::UNAUTHORIZED,
                    "AUTHENTICATION_REQUIRED",
                    err.to_string(),
                ),
                VerificationError::RecordNotFound(_) => {
                    (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND", err.to_string())
                }
                VerificationError::VerificationFailed(_) => (
                    StatusCode::PAYMENT_REQUIRED,
                    "VERIFICATION_FAILED",
                    err.to_string(),
                ),
                VerificationError::GatewayUnreachable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "GATEWAY_UNREACHABLE",
                    "Payment gateway unreachable, retry shortly".to_string(),
                ),
                VerificationError::AmountMismatch { .. } => (
                    StatusCode::CONFLICT,
                    "AMOUNT_MISMATCH",
                    "Confirmed amount does not match this payment".to_string(),
                ),
                VerificationError::ActivationFailed(activation) => match activation {
                    ActivationError::GroupFull { .. } => (
                        StatusCode::CONFLICT,
                        "GROUP_FULL",
                        "Payment confirmed but the group is full; contact support".to_string(),
                    ),
                    ActivationError::SlotConflict { .. } => (
                        StatusCode::CONFLICT,
                        "SLOT_CONFLICT",
                        activation.to_string(),
                    ),
                    ActivationError::ContributionAlreadyPaid { .. } => (
                        StatusCode::CONFLICT,
                        "CONTRIBUTION_ALREADY_PAID",
                        activation.to_string(),
                    ),
                    ActivationError::MembershipNotFound { .. }
                    | ActivationError::ContributionNotFound { .. } => (
                        StatusCode::CONFLICT,
                        "ACTIVATION_FAILED",
                        activation.to_string(),
                    ),
                    ActivationError::Store(_) => internal(),
                },
                VerificationError::Store(_) => internal(),
            },

            PaymentApiError::Webhook(err) => match err {
                WebhookError::InvalidSignature => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_WEBHOOK_SIGNATURE",
                    "Webhook signature verification failed".to_string(),
                ),
                WebhookError::Parse(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", err.to_string())
                }
                // 5xx so the gateway redelivers after a store hiccup.
                WebhookError::Store(_) => internal(),
            },
        };

        if status.is_server_error() {
            tracing::error!(code, "request failed");
        }

        let body = ErrorResponse::new(code, message);
        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "Internal error".to_string(),
    )
}
