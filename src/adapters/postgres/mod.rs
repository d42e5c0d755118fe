//! PostgreSQL adapters behind the repository and store ports.

mod group_store;
mod payment_repository;

pub use group_store::PostgresGroupStore;
pub use payment_repository::PostgresPaymentRepository;
