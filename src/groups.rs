//! Convenience calls that route to a single endpoint
//!
//! Input is validated locally so a malformed call never reaches the network.

use crate::api::client::ApiClient;
use crate::error::{has_error_marker, Error, Result};
use crate::resource::Resource;
use serde_json::{json, Map, Value};

/// Resource key -> body key of the tag creation request
const TAGGABLE: &[(&str, &str)] = &[
    ("instances", "linodes"),
    ("domains", "domains"),
    ("volumes", "volumes"),
    ("nodebalancers", "nodebalancers"),
];

/// Card fields the payment endpoint requires
const CARD_FIELDS: &[&str] = &["card_number", "expiry_month", "expiry_year", "cvv"];

/// Create a tag and apply it to `entities`
pub async fn create_tag(client: &ApiClient, label: &str, entities: &[Resource]) -> Result<Resource> {
    let label = label.trim();
    if label.is_empty() {
        return Err(Error::InvalidInput("tag label cannot be empty".to_string()));
    }

    let mut body = Map::new();
    body.insert("label".to_string(), Value::String(label.to_string()));

    for entity in entities {
        let Some((_, key)) = TAGGABLE.iter().find(|(kind, _)| *kind == entity.kind()) else {
            return Err(Error::InvalidInput(format!(
                "{} {} cannot be tagged",
                entity.def().display_name,
                entity.id()
            )));
        };
        let ids = body
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(ids) = ids {
            ids.push(entity.id().clone());
        }
    }

    client.create("tags", &Value::Object(body)).await
}

/// Add a credit card to the account; `false` when the API signals a soft failure
pub async fn add_payment_card(client: &ApiClient, card: &Value, is_default: bool) -> Result<bool> {
    let Some(fields) = card.as_object() else {
        return Err(Error::InvalidInput("card must be a JSON object".to_string()));
    };

    let missing: Vec<&str> = CARD_FIELDS
        .iter()
        .copied()
        .filter(|name| fields.get(*name).map_or(true, Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "card is missing {}",
            missing.join(", ")
        )));
    }

    let body = json!({
        "type": "credit_card",
        "is_default": is_default,
        "data": card,
    });

    tracing::info!("Adding payment card (default: {})", is_default);
    let response = client.post("/account/payment-methods", &body).await?;
    Ok(!has_error_marker(&response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn offline_client() -> ApiClient {
        ApiClient::new(&ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_tag_rejects_empty_label() {
        let client = offline_client();
        let result = create_tag(&client, "  ", &[]).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_tag_rejects_untaggable_entity() {
        let client = offline_client();
        let region = client.resource("regions", "us-east").unwrap();
        let result = create_tag(&client, "prod", &[region]).await;
        assert!(matches!(result, Err(Error::InvalidInput(msg)) if msg.contains("cannot be tagged")));
    }

    #[tokio::test]
    async fn test_payment_card_lists_missing_fields() {
        let client = offline_client();
        let card = json!({"card_number": "4111111111111111", "expiry_month": 12});
        match add_payment_card(&client, &card, true).await {
            Err(Error::InvalidInput(msg)) => {
                assert!(msg.contains("expiry_year"));
                assert!(msg.contains("cvv"));
                assert!(!msg.contains("card_number"));
            },
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_payment_card_must_be_object() {
        let client = offline_client();
        let result = add_payment_card(&client, &json!("4111"), false).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
