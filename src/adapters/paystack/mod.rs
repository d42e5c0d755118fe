//! Paystack adapter: the REST gateway behind the `PaymentGateway` port.

mod gateway;

pub use gateway::{PaystackConfig, PaystackGateway};
