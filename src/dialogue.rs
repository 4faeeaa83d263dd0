//! Conversation state for the storefront dialogue.
//!
//! Each variant carries exactly the fields its step needs. On disk a state is
//! split into a stable string tag and a JSON scratch object, so rows written
//! by older builds keep loading as long as the tags stay the same.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{OrderLine, OrderType};

const TAG_FIELD: &str = "state_tag";

/// Represents where a user is in a multi-step flow
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state_tag")]
pub enum DialogueState {
    #[default]
    #[serde(rename = "")]
    Idle,
    #[serde(rename = "waiting_quantity")]
    WaitingQuantity { product_id: i64 },
    #[serde(rename = "waiting_message")]
    WaitingMessage,
    #[serde(rename = "waiting_message_for_quick_order")]
    WaitingMessageForQuickOrder { order_id: i64, product_name: String },
    #[serde(rename = "waiting_phone_for_quick_order")]
    WaitingPhoneForQuickOrder { product_id: i64 },
    #[serde(rename = "full_order_name")]
    FullOrderName,
    #[serde(rename = "full_order_phone")]
    FullOrderPhone { user_name: String },
    #[serde(rename = "full_order_city")]
    FullOrderCity { user_name: String, phone: String },
    #[serde(rename = "full_order_np")]
    FullOrderNp {
        user_name: String,
        phone: String,
        city: String,
    },
    #[serde(rename = "full_order_confirm")]
    FullOrderConfirm {
        user_name: String,
        phone: String,
        city: String,
        np_department: String,
        items: Vec<OrderLine>,
        total: f64,
        order_type: OrderType,
    },
}

#[derive(Debug, Error)]
pub enum SessionDecodeError {
    #[error("unknown state tag or malformed scratch for '{tag}': {source}")]
    Malformed {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("state could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DialogueState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DialogueState::Idle)
    }

    /// Persisted tag, `""` for idle
    pub fn tag(&self) -> &'static str {
        match self {
            DialogueState::Idle => "",
            DialogueState::WaitingQuantity { .. } => "waiting_quantity",
            DialogueState::WaitingMessage => "waiting_message",
            DialogueState::WaitingMessageForQuickOrder { .. } => "waiting_message_for_quick_order",
            DialogueState::WaitingPhoneForQuickOrder { .. } => "waiting_phone_for_quick_order",
            DialogueState::FullOrderName => "full_order_name",
            DialogueState::FullOrderPhone { .. } => "full_order_phone",
            DialogueState::FullOrderCity { .. } => "full_order_city",
            DialogueState::FullOrderNp { .. } => "full_order_np",
            DialogueState::FullOrderConfirm { .. } => "full_order_confirm",
        }
    }

    /// Split into `(state_tag, scratch)` for storage
    pub fn to_parts(&self) -> Result<(String, Value), SessionDecodeError> {
        let mut scratch = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        scratch.remove(TAG_FIELD);
        Ok((self.tag().to_string(), Value::Object(scratch)))
    }

    /// Rebuild a state from its stored tag and scratch object
    pub fn from_parts(tag: &str, scratch: &Value) -> Result<Self, SessionDecodeError> {
        let mut map = match scratch {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        map.insert(TAG_FIELD.to_string(), Value::String(tag.to_string()));
        serde_json::from_value(Value::Object(map)).map_err(|source| {
            SessionDecodeError::Malformed {
                tag: tag.to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_idle_has_empty_tag_and_scratch() {
        let (tag, scratch) = DialogueState::Idle.to_parts().unwrap();
        assert_eq!(tag, "");
        assert_eq!(scratch, json!({}));
    }

    #[test]
    fn test_scratch_holds_only_state_fields() {
        let state = DialogueState::WaitingMessageForQuickOrder {
            order_id: 7,
            product_name: "Мед гречаний".to_string(),
        };
        let (tag, scratch) = state.to_parts().unwrap();
        assert_eq!(tag, "waiting_message_for_quick_order");
        assert_eq!(scratch, json!({"order_id": 7, "product_name": "Мед гречаний"}));
        assert_eq!(DialogueState::from_parts(&tag, &scratch).unwrap(), state);
    }

    #[test]
    fn test_confirm_state_encoding() {
        let state = DialogueState::FullOrderConfirm {
            user_name: "Іван".to_string(),
            phone: "+380932599103".to_string(),
            city: "Київ".to_string(),
            np_department: "5".to_string(),
            items: vec![OrderLine {
                product_id: 1,
                product_name: "Мед".to_string(),
                quantity: 2.0,
                unit_price: 250.0,
            }],
            total: 500.0,
            order_type: OrderType::Regular,
        };
        let (tag, scratch) = state.to_parts().unwrap();
        assert_eq!(tag, "full_order_confirm");
        assert_eq!(scratch["order_type"], json!("regular"));
        assert_eq!(DialogueState::from_parts(&tag, &scratch).unwrap(), state);
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert!(DialogueState::from_parts("waiting_for_godot", &json!({})).is_err());
    }

    #[test]
    fn test_missing_scratch_field_is_rejected() {
        assert!(DialogueState::from_parts("waiting_quantity", &json!({})).is_err());
    }

    #[test]
    fn test_tag_matches_serde_name() {
        let state = DialogueState::FullOrderCity {
            user_name: "a".to_string(),
            phone: "b".to_string(),
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value[TAG_FIELD], json!(state.tag()));
    }
}
