//! Payment use cases: initiation, the shared activation core, synchronous
//! verification, and webhook processing.

mod activate_membership;
mod handle_paystack_webhook;
mod initiate_payment;
mod verify_payment;

pub use activate_membership::{Activation, MembershipActivator};
pub use handle_paystack_webhook::{PaystackWebhookHandler, WebhookOutcome};
pub use initiate_payment::{InitiatePaymentHandler, InitiatedPayment};
pub use verify_payment::{VerificationOutcome, VerifyPaymentHandler};
