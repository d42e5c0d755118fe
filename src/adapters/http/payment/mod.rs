//! Payment HTTP module: routes, handlers, DTOs.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, MaybeAuthenticated, PaymentAppState};
pub use routes::{payment_router, payment_routes, webhook_routes};
