//! Programmable payment gateway for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::payment::PaymentReference;
use crate::ports::{GatewayError, GatewayStatus, GatewayTransaction, PaymentGateway};

#[derive(Clone)]
enum Scripted {
    Transaction(GatewayTransaction),
    Unreachable(String),
}

/// Gateway double with per-reference scripted responses.
///
/// Unscripted references verify as `Failed`, the safe default for a
/// transaction the gateway has never heard of.
#[derive(Default)]
pub struct MockPaymentGateway {
    responses: Mutex<HashMap<PaymentReference, Scripted>>,
    calls: AtomicUsize,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a full transaction response for a reference.
    pub fn respond_success(&self, reference: &PaymentReference, transaction: GatewayTransaction) {
        self.lock()
            .insert(reference.clone(), Scripted::Transaction(transaction));
    }

    /// Scripts a bare status response with zeroed enrichment.
    pub fn respond_status(&self, reference: &PaymentReference, status: GatewayStatus) {
        self.lock().insert(
            reference.clone(),
            Scripted::Transaction(GatewayTransaction {
                status,
                amount: 0,
                currency: "NGN".to_string(),
                paid_at: None,
                channel: None,
                fees: None,
                authorization_code: None,
                metadata: serde_json::Value::Null,
            }),
        );
    }

    /// Scripts a transport failure for a reference.
    pub fn respond_unreachable(&self, reference: &PaymentReference, detail: &str) {
        self.lock()
            .insert(reference.clone(), Scripted::Unreachable(detail.to_string()));
    }

    /// Number of verification calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PaymentReference, Scripted>> {
        match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn verify_transaction(
        &self,
        reference: &PaymentReference,
    ) -> Result<GatewayTransaction, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let responses = self.lock();
        match responses.get(reference) {
            Some(Scripted::Transaction(transaction)) => Ok(transaction.clone()),
            Some(Scripted::Unreachable(detail)) => Err(GatewayError::Unreachable(detail.clone())),
            None => Ok(GatewayTransaction {
                status: GatewayStatus::Failed,
                amount: 0,
                currency: "NGN".to_string(),
                paid_at: None,
                channel: None,
                fees: None,
                authorization_code: None,
                metadata: serde_json::Value::Null,
            }),
        }
    }
}
