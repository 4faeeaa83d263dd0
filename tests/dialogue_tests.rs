use anyhow::Result;
use serde_json::json;

use storefront::dialogue::{DialogueState, SessionDecodeError};
use storefront::models::{OrderLine, OrderType};

/// Scratch written for each state carries exactly the keys that state needs
#[tokio::test]
async fn test_scratch_keys_per_state() -> Result<()> {
    let cases = vec![
        (DialogueState::Idle, vec![]),
        (DialogueState::WaitingQuantity { product_id: 1 }, vec!["product_id"]),
        (DialogueState::WaitingMessage, vec![]),
        (
            DialogueState::WaitingMessageForQuickOrder {
                order_id: 3,
                product_name: "Мед".to_string(),
            },
            vec!["order_id", "product_name"],
        ),
        (
            DialogueState::WaitingPhoneForQuickOrder { product_id: 2 },
            vec!["product_id"],
        ),
        (DialogueState::FullOrderName, vec![]),
        (
            DialogueState::FullOrderCity {
                user_name: "Ivanov Ivan".to_string(),
                phone: "+380932599103".to_string(),
            },
            vec!["phone", "user_name"],
        ),
    ];

    for (state, expected) in cases {
        let (tag, scratch) = state.to_parts()?;
        let mut keys: Vec<&str> = scratch
            .as_object()
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort();
        assert_eq!(keys, expected, "{tag}");
        assert_eq!(DialogueState::from_parts(&tag, &scratch)?, state);
    }
    Ok(())
}

/// A pending order survives a restart with its line snapshot intact
#[tokio::test]
async fn test_confirm_state_round_trip() -> Result<()> {
    let state = DialogueState::FullOrderConfirm {
        user_name: "Ivanov Ivan".to_string(),
        phone: "+380932599103".to_string(),
        city: "Kyiv".to_string(),
        np_department: "Depot 5".to_string(),
        items: vec![OrderLine {
            product_id: 3,
            product_name: "Мед гречаний".to_string(),
            quantity: 1.0,
            unit_price: 290.0,
        }],
        total: 290.0,
        order_type: OrderType::Regular,
    };
    let (tag, scratch) = state.to_parts()?;
    assert_eq!(tag, "full_order_confirm");
    assert_eq!(scratch["order_type"], json!("regular"));
    assert_eq!(scratch["items"][0]["product_name"], json!("Мед гречаний"));

    // scratch goes to TEXT and back
    let stored = serde_json::to_string(&scratch)?;
    let restored = DialogueState::from_parts(&tag, &serde_json::from_str(&stored)?)?;
    assert_eq!(restored, state);
    Ok(())
}

#[tokio::test]
async fn test_unknown_tag_and_bad_scratch_are_rejected() -> Result<()> {
    let err = DialogueState::from_parts("waiting_for_godot", &json!({})).unwrap_err();
    assert!(matches!(err, SessionDecodeError::Malformed { ref tag, .. } if tag == "waiting_for_godot"));

    assert!(DialogueState::from_parts("waiting_quantity", &json!({})).is_err());
    assert!(DialogueState::from_parts("full_order_phone", &json!({"user_name": 5})).is_err());
    Ok(())
}

#[tokio::test]
async fn test_non_object_scratch_is_treated_as_empty() -> Result<()> {
    assert_eq!(
        DialogueState::from_parts("", &json!(null))?,
        DialogueState::Idle
    );
    assert_eq!(
        DialogueState::from_parts("waiting_message", &json!("garbage"))?,
        DialogueState::WaitingMessage
    );
    Ok(())
}
