//! Paystack webhook signature verification.
//!
//! Paystack signs the raw request body with HMAC-SHA512 using the account
//! secret and sends the hex digest in the `x-paystack-signature` header.
//! Verification happens over the unparsed bytes, before any JSON parsing or
//! database access, with a constant-time comparison.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;
use super::paystack_event::PaystackEvent;

type HmacSha512 = Hmac<Sha512>;

/// Verifier for Paystack webhook signatures.
pub struct PaystackWebhookVerifier {
    /// The shared secret (the Paystack secret key).
    secret: String,
}

impl PaystackWebhookVerifier {
    /// Creates a new verifier with the given secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies the signature over the raw body and parses the event.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` - header missing a valid hex digest, or the
    ///   digest does not match the body
    /// - `Parse` - body is not a well-formed Paystack event
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaystackEvent, WebhookError> {
        // 1. Decode the provided digest. A header that is not hex cannot
        //    match any signature, so it is treated as an invalid signature
        //    rather than a parse failure.
        let provided =
            hex::decode(signature_header.trim()).map_err(|_| WebhookError::InvalidSignature)?;

        // 2. Compute the expected digest over the raw, unparsed body.
        let expected = self.compute_signature(payload);

        // 3. Constant-time comparison.
        if !constant_time_compare(&expected, &provided) {
            return Err(WebhookError::InvalidSignature);
        }

        // 4. Only now touch the payload contents.
        let event: PaystackEvent =
            serde_json::from_slice(payload).map_err(|e| WebhookError::Parse(e.to_string()))?;

        Ok(event)
    }

    /// Computes the HMAC-SHA512 digest of the payload.
    fn compute_signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha512::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the
/// expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "sk_test_webhook_secret_12345";

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn charge_success_body(reference: &str) -> String {
        format!(
            r#"{{"event":"charge.success","data":{{"reference":"{}","status":"success","amount":12000,"currency":"NGN"}}}}"#,
            reference
        )
    }

    #[test]
    fn verify_valid_signature() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let body = charge_success_body("ajo_0123456789abcdef0123456789abcdef");
        let signature = sign(TEST_SECRET, body.as_bytes());

        let event = verifier
            .verify_and_parse(body.as_bytes(), &signature)
            .unwrap();

        assert_eq!(event.event, "charge.success");
        assert_eq!(event.data.amount, 12000);
    }

    #[test]
    fn verify_wrong_secret_fails() {
        let verifier = PaystackWebhookVerifier::new("sk_test_other_secret");
        let body = charge_success_body("ajo_0123456789abcdef0123456789abcdef");
        let signature = sign(TEST_SECRET, body.as_bytes());

        let result = verifier.verify_and_parse(body.as_bytes(), &signature);

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_tampered_payload_fails() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let original = charge_success_body("ajo_0123456789abcdef0123456789abcdef");
        let tampered = original.replace("12000", "120000");
        let signature = sign(TEST_SECRET, original.as_bytes());

        let result = verifier.verify_and_parse(tampered.as_bytes(), &signature);

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_non_hex_header_fails_as_invalid_signature() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let body = charge_success_body("ajo_0123456789abcdef0123456789abcdef");

        let result = verifier.verify_and_parse(body.as_bytes(), "not hex at all");

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_truncated_digest_fails() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let body = charge_success_body("ajo_0123456789abcdef0123456789abcdef");
        let signature = sign(TEST_SECRET, body.as_bytes());

        let result = verifier.verify_and_parse(body.as_bytes(), &signature[..64]);

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_invalid_json_with_valid_signature_is_parse_error() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let body = b"not valid json";
        let signature = sign(TEST_SECRET, body);

        let result = verifier.verify_and_parse(body, &signature);

        assert!(matches!(result, Err(WebhookError::Parse(_))));
    }

    #[test]
    fn header_whitespace_is_tolerated() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let body = charge_success_body("ajo_0123456789abcdef0123456789abcdef");
        let signature = format!("  {}  ", sign(TEST_SECRET, body.as_bytes()));

        assert!(verifier.verify_and_parse(body.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn constant_time_compare_basics() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
        assert!(constant_time_compare(&[], &[]));
    }
}
