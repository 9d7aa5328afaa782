//! Property-based tests using proptest
//!
//! These tests verify filter composition, control-key handling and the
//! populate/serialize round trip using randomized inputs.

use lapi::{ApiClient, ClientConfig, Field, Filter, FilterError};
use proptest::prelude::*;
use serde_json::{json, Value};

fn offline_client() -> ApiClient {
    ApiClient::new(&ClientConfig::default()).expect("client should build")
}

/// Scalar JSON values as they appear in filters and payloads
fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 _-]{0,24}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

/// Equality filters on distinct generated field names
fn arb_clauses() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::vec(("[a-z][a-z_]{0,12}", arb_scalar()), 1..12)
}

fn clause(name: &str, value: &Value) -> Filter {
    Field::new(name)
        .eq(value.clone())
        .expect("filterable field")
}

proptest! {
    /// Left-nested `and` chains flatten into one list in insertion order
    #[test]
    fn test_and_chain_flattens(clauses in arb_clauses()) {
        let mut iter = clauses.iter();
        let (name, value) = iter.next().unwrap();
        let mut filter = clause(name, value);
        for (name, value) in iter {
            filter = filter.and(clause(name, value)).unwrap();
        }

        let json = filter.to_json();
        if clauses.len() == 1 {
            prop_assert!(json.get("+and").is_none());
            prop_assert_eq!(json.get(&clauses[0].0), Some(&clauses[0].1));
        } else {
            let list = json["+and"].as_array().expect("+and list");
            prop_assert_eq!(list.len(), clauses.len());
            for (item, (name, value)) in list.iter().zip(&clauses) {
                let mut expected = serde_json::Map::new();
                expected.insert(name.clone(), value.clone());
                prop_assert_eq!(item, &Value::Object(expected));
            }
        }
    }

    /// Right-nested `and` flattens to the same shape as left-nested
    #[test]
    fn test_and_is_associative_on_the_wire(a in arb_scalar(), b in arb_scalar(), c in arb_scalar()) {
        let left = clause("a", &a)
            .and(clause("b", &b)).unwrap()
            .and(clause("c", &c)).unwrap();
        let right = clause("a", &a)
            .and(clause("b", &b).and(clause("c", &c)).unwrap())
            .unwrap();
        prop_assert_eq!(left.to_json(), right.to_json());
    }

    /// `or` inside `and` stays nested
    #[test]
    fn test_or_nests_inside_and(a in arb_scalar(), b in arb_scalar(), c in arb_scalar()) {
        let either = clause("a", &a).or(clause("b", &b)).unwrap();
        let filter = either.and(clause("c", &c)).unwrap();
        let json = filter.to_json();

        let list = json["+and"].as_array().unwrap();
        prop_assert_eq!(list.len(), 2);
        prop_assert_eq!(list[0]["+or"].as_array().map(Vec::len), Some(2));
    }

    /// Control keys stay at the top level no matter how clauses combine
    #[test]
    fn test_control_keys_at_top_level(clauses in arb_clauses(), limit in 0i64..500, desc in any::<bool>()) {
        let mut filter = Filter::new();
        for (name, value) in &clauses {
            filter = filter.and(clause(name, value)).unwrap();
        }
        let filter = filter
            .order_by(&Field::new("created"), desc)
            .unwrap()
            .limit(limit)
            .unwrap();

        let json = filter.to_json();
        prop_assert_eq!(&json["+order_by"], &json!("created"));
        prop_assert_eq!(&json["+order"], &json!(if desc { "desc" } else { "asc" }));
        prop_assert_eq!(&json["+limit"], &json!(limit));
        if let Some(list) = json.get("+and").and_then(Value::as_array) {
            prop_assert!(list.iter().all(|c| c.get("+limit").is_none()));
        }
    }

    /// Negative limits are rejected
    #[test]
    fn test_negative_limit_rejected(n in i64::MIN..0) {
        prop_assert_eq!(Filter::new().limit(n), Err(FilterError::InvalidLimit(n)));
    }

    /// Non-filterable fields never produce a filter
    #[test]
    fn test_non_filterable_rejected(name in "[a-z]{1,10}", value in arb_scalar()) {
        let field = Field::non_filterable(name.clone());
        prop_assert_eq!(field.eq(value), Err(FilterError::NotFilterable(name)));
    }

    /// Populating from a payload and serializing reproduces the mutable fields
    #[test]
    fn test_update_body_round_trip(
        label in "[a-z][a-z0-9-]{0,30}",
        group in "[a-z]{0,10}",
        watchdog in any::<bool>(),
        tags in prop::collection::vec("[a-z]{1,8}", 0..4),
        cpu in 0i64..100,
    ) {
        let client = offline_client();
        let payload = json!({
            "id": 1,
            "label": label,
            "group": group,
            "status": "running",
            "region": "us-east",
            "watchdog_enabled": watchdog,
            "tags": tags,
            "alerts": {"cpu": cpu, "io": 10000}
        });

        let instance = client
            .construct("instances", json!(1), None, Some(&payload))
            .unwrap();
        let body = instance.to_update_body();

        prop_assert_eq!(body, json!({
            "label": label,
            "group": group,
            "watchdog_enabled": watchdog,
            "tags": tags,
            "alerts": {"cpu": cpu, "io": 10000}
        }));
    }
}
