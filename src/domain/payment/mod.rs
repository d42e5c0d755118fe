//! Payment domain: records, purposes, gateway events, and signature
//! verification.

mod errors;
mod paystack_event;
mod purpose;
mod record;
mod reference;
mod webhook_verifier;

pub use errors::{ActivationError, InitiateError, VerificationError, WebhookError};
pub use paystack_event::{
    PaystackAuthorization, PaystackChargeData, PaystackEvent, PaystackEventType,
};
pub use purpose::{CheckoutMetadata, MetadataError, PaymentPurpose};
pub use record::{PaymentRecord, PaymentStatus};
pub use reference::{InvalidReference, PaymentReference};
pub use webhook_verifier::PaystackWebhookVerifier;
