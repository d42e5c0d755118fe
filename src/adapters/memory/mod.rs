//! In-memory adapters backing the test suite and local development.
//!
//! Semantics mirror the Postgres adapters: the same conditional outcomes,
//! enforced by a mutex instead of row locks and unique constraints.

mod auth;
mod gateway;
mod group_store;
mod payment_repository;

pub use auth::MockAuthProvider;
pub use gateway::MockPaymentGateway;
pub use group_store::InMemoryGroupStore;
pub use payment_repository::InMemoryPaymentRepository;
