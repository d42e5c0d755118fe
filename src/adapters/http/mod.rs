//! HTTP adapters: Axum routers and handlers.

pub mod payment;
