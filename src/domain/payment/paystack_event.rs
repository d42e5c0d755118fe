//! Paystack webhook event types.
//!
//! Defines the structures for parsing Paystack webhook payloads. Only fields
//! relevant to our processing are captured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paystack webhook event (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaystackEvent {
    /// Event name (e.g., "charge.success").
    pub event: String,

    /// The charge that triggered the event.
    pub data: PaystackChargeData,
}

/// Charge payload carried by `charge.*` events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaystackChargeData {
    /// The transaction reference assigned at initiation.
    pub reference: String,

    /// Gateway-reported status string ("success", "failed", "abandoned").
    #[serde(default)]
    pub status: String,

    /// Settled amount in the minor currency unit. Defaulted because events
    /// we only acknowledge (transfers etc.) carry different data shapes.
    #[serde(default)]
    pub amount: i64,

    #[serde(default)]
    pub currency: String,

    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub channel: Option<String>,

    #[serde(default)]
    pub fees: Option<i64>,

    #[serde(default)]
    pub authorization: Option<PaystackAuthorization>,

    /// Echo of the checkout metadata supplied at initiation.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Card authorization details attached to a settled charge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaystackAuthorization {
    #[serde(default)]
    pub authorization_code: Option<String>,
}

/// Known Paystack event types that carry business meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaystackEventType {
    /// A charge settled successfully.
    ChargeSuccess,
    /// A charge failed terminally.
    ChargeFailed,
    /// Anything else; acknowledged and ignored.
    Unknown,
}

impl PaystackEventType {
    /// Parse event type from its wire name.
    pub fn parse(s: &str) -> Self {
        match s {
            "charge.success" => Self::ChargeSuccess,
            "charge.failed" => Self::ChargeFailed,
            _ => Self::Unknown,
        }
    }

    /// Convert to the Paystack event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChargeSuccess => "charge.success",
            Self::ChargeFailed => "charge.failed",
            Self::Unknown => "unknown",
        }
    }
}

impl PaystackEvent {
    /// Parse the event name into a known enum variant.
    pub fn parsed_type(&self) -> PaystackEventType {
        PaystackEventType::parse(&self.event)
    }
}

impl PaystackChargeData {
    /// Parses the wire reference into our reference format, if it is one of
    /// ours. Events for foreign references are acknowledged, not processed.
    pub fn parsed_reference(&self) -> Option<super::reference::PaymentReference> {
        super::reference::PaymentReference::parse(&self.reference).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_charge_success_event() {
        let payload = json!({
            "event": "charge.success",
            "data": {
                "reference": "ajo_0123456789abcdef0123456789abcdef",
                "status": "success",
                "amount": 12000,
                "currency": "NGN",
                "paid_at": "2024-01-01T00:00:00Z",
                "channel": "card",
                "fees": 180,
                "authorization": { "authorization_code": "AUTH_abc123" },
                "metadata": { "purpose": "group_join" }
            }
        });

        let event: PaystackEvent = serde_json::from_value(payload).unwrap();

        assert_eq!(event.parsed_type(), PaystackEventType::ChargeSuccess);
        assert_eq!(event.data.amount, 12000);
        assert_eq!(event.data.currency, "NGN");
        assert_eq!(event.data.channel.as_deref(), Some("card"));
        assert_eq!(
            event
                .data
                .authorization
                .unwrap()
                .authorization_code
                .as_deref(),
            Some("AUTH_abc123")
        );
    }

    #[test]
    fn deserialize_minimal_event() {
        let payload = json!({
            "event": "charge.failed",
            "data": {
                "reference": "ajo_0123456789abcdef0123456789abcdef",
                "status": "failed",
                "amount": 5000,
                "currency": "NGN"
            }
        });

        let event: PaystackEvent = serde_json::from_value(payload).unwrap();

        assert_eq!(event.parsed_type(), PaystackEventType::ChargeFailed);
        assert!(event.data.paid_at.is_none());
        assert!(event.data.metadata.is_null());
    }

    #[test]
    fn unknown_event_names_map_to_unknown() {
        assert_eq!(
            PaystackEventType::parse("transfer.success"),
            PaystackEventType::Unknown
        );
        assert_eq!(
            PaystackEventType::parse("subscription.create"),
            PaystackEventType::Unknown
        );
    }

    #[test]
    fn event_type_name_roundtrip() {
        for event_type in [PaystackEventType::ChargeSuccess, PaystackEventType::ChargeFailed] {
            assert_eq!(PaystackEventType::parse(event_type.as_str()), event_type);
        }
    }
}
