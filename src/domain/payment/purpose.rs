//! Payment purpose and checkout metadata.
//!
//! The purpose travels to Paystack as free-form checkout metadata and comes
//! back on both confirmation channels. Field names here are a hard external
//! contract between what the initiator writes and what verification reads
//! back, so the metadata is parsed through one dedicated struct rather than
//! by indexing into JSON in business logic.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GroupId, UserId};

/// What a payment pays for. Tagged with snake_case variants on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "purpose", rename_all = "snake_case")]
pub enum PaymentPurpose {
    /// Security deposit + first contribution when founding a group.
    GroupCreation {
        group_id: GroupId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preferred_slot: Option<u32>,
    },

    /// Security deposit + first contribution when joining a group.
    GroupJoin {
        group_id: GroupId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preferred_slot: Option<u32>,
    },

    /// One cycle's due amount for an existing member.
    Contribution { group_id: GroupId, cycle_number: u32 },

    /// Standalone security deposit outside the join flow.
    SecurityDeposit { group_id: GroupId },
}

impl PaymentPurpose {
    /// Returns the group this payment targets.
    pub fn group_id(&self) -> GroupId {
        match self {
            PaymentPurpose::GroupCreation { group_id, .. }
            | PaymentPurpose::GroupJoin { group_id, .. }
            | PaymentPurpose::Contribution { group_id, .. }
            | PaymentPurpose::SecurityDeposit { group_id } => *group_id,
        }
    }

    /// Preferred payout slot, for the purposes that carry one.
    pub fn preferred_slot(&self) -> Option<u32> {
        match self {
            PaymentPurpose::GroupCreation { preferred_slot, .. }
            | PaymentPurpose::GroupJoin { preferred_slot, .. } => *preferred_slot,
            _ => None,
        }
    }

    /// True for the purposes that create a membership when processed.
    pub fn creates_membership(&self) -> bool {
        matches!(
            self,
            PaymentPurpose::GroupCreation { .. } | PaymentPurpose::GroupJoin { .. }
        )
    }
}

/// The metadata object attached to a Paystack checkout.
///
/// Written verbatim by the initiator; read back by the verification service
/// and the webhook receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub user_id: UserId,
    #[serde(flatten)]
    pub purpose: PaymentPurpose,
}

impl CheckoutMetadata {
    pub fn new(user_id: UserId, purpose: PaymentPurpose) -> Self {
        Self { user_id, purpose }
    }

    /// Serializes to the JSON value handed to the gateway at initiation.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("checkout metadata is always serializable")
    }

    /// Parses gateway-echoed metadata, validating field presence and naming.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, MetadataError> {
        serde_json::from_value(value.clone()).map_err(|e| MetadataError(e.to_string()))
    }
}

/// Error for metadata that does not match the checkout contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid checkout metadata: {0}")]
pub struct MetadataError(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_join_metadata_uses_snake_case_field_names() {
        let metadata = CheckoutMetadata::new(
            UserId::new(),
            PaymentPurpose::GroupJoin {
                group_id: GroupId::new(),
                preferred_slot: Some(2),
            },
        );

        let value = metadata.to_value();

        assert_eq!(value["purpose"], "group_join");
        assert!(value.get("group_id").is_some());
        assert!(value.get("user_id").is_some());
        assert_eq!(value["preferred_slot"], 2);
    }

    #[test]
    fn initiator_written_metadata_parses_back_identically() {
        // Whatever the initiator writes, the confirmation channels must
        // read back without loss.
        let cases = [
            PaymentPurpose::GroupCreation {
                group_id: GroupId::new(),
                preferred_slot: Some(1),
            },
            PaymentPurpose::GroupJoin {
                group_id: GroupId::new(),
                preferred_slot: None,
            },
            PaymentPurpose::Contribution {
                group_id: GroupId::new(),
                cycle_number: 4,
            },
            PaymentPurpose::SecurityDeposit {
                group_id: GroupId::new(),
            },
        ];

        for purpose in cases {
            let written = CheckoutMetadata::new(UserId::new(), purpose);
            let read = CheckoutMetadata::from_value(&written.to_value()).unwrap();
            assert_eq!(written, read);
        }
    }

    #[test]
    fn camel_case_field_names_are_rejected() {
        // The field-name-mismatch class of bug: camelCase metadata must not
        // silently activate anything.
        let value = json!({
            "userId": UserId::new(),
            "purpose": "group_join",
            "groupId": GroupId::new(),
            "preferredSlot": 2
        });

        assert!(CheckoutMetadata::from_value(&value).is_err());
    }

    #[test]
    fn missing_cycle_number_fails_for_contribution() {
        let value = json!({
            "user_id": UserId::new(),
            "purpose": "contribution",
            "group_id": GroupId::new()
        });

        assert!(CheckoutMetadata::from_value(&value).is_err());
    }

    #[test]
    fn unknown_purpose_tag_is_rejected() {
        let value = json!({
            "user_id": UserId::new(),
            "purpose": "withdrawal",
            "group_id": GroupId::new()
        });

        assert!(CheckoutMetadata::from_value(&value).is_err());
    }

    #[test]
    fn preferred_slot_is_optional() {
        let value = json!({
            "user_id": UserId::new(),
            "purpose": "group_creation",
            "group_id": GroupId::new()
        });

        let metadata = CheckoutMetadata::from_value(&value).unwrap();
        assert_eq!(metadata.purpose.preferred_slot(), None);
    }

    #[test]
    fn extra_fields_are_tolerated() {
        // Gateways append their own keys to metadata; ignore them.
        let value = json!({
            "user_id": UserId::new(),
            "purpose": "security_deposit",
            "group_id": GroupId::new(),
            "referrer": "https://app.smartajo.example"
        });

        assert!(CheckoutMetadata::from_value(&value).is_ok());
    }
}
