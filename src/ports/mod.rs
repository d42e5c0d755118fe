//! Ports: the trait seams between the application core and the outside
//! world (gateway, datastore, auth).

mod auth_provider;
mod group_store;
mod payment_gateway;
mod payment_repository;

pub use auth_provider::{AuthError, AuthProvider};
pub use group_store::{ContributionUpdate, DepositUpdate, GroupStore, SlotClaim};
pub use payment_gateway::{GatewayError, GatewayStatus, GatewayTransaction, PaymentGateway};
pub use payment_repository::{PaymentRepository, SettlementDetails};
