//! Dot-accessible wrappers over nested JSON
//!
//! Response members that are not first-class resources (an instance's `specs`,
//! `alerts`, `ipv4` lists and so on) are kept as [`MappedObject`]s.

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One value inside a [`MappedObject`]
#[derive(Debug, Clone, PartialEq)]
pub enum MappedValue {
    Scalar(Value),
    Object(MappedObject),
    List(Vec<MappedValue>),
}

impl MappedValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => MappedValue::Object(MappedObject::from_map(map)),
            Value::Array(items) => MappedValue::List(items.iter().map(Self::from_json).collect()),
            other => MappedValue::Scalar(other.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            MappedValue::Scalar(v) => v.clone(),
            MappedValue::Object(obj) => obj.to_json(),
            MappedValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MappedValue::Scalar(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MappedValue::Scalar(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MappedValue::Scalar(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&MappedObject> {
        match self {
            MappedValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[MappedValue]> {
        match self {
            MappedValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Nested JSON object with key and dotted-path access
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedObject {
    entries: BTreeMap<String, MappedValue>,
}

impl MappedObject {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            entries: map
                .iter()
                .map(|(k, v)| (k.clone(), MappedValue::from_json(v)))
                .collect(),
        }
    }

    /// Wrap a JSON value; `None` unless it is an object
    pub fn from_json(value: &Value) -> Option<Self> {
        value.as_object().map(Self::from_map)
    }

    pub fn get(&self, key: &str) -> Option<&MappedValue> {
        self.entries.get(key)
    }

    /// Look up a dotted path such as `specs.disk` or `ipv4.0.address`;
    /// numeric segments index into lists
    pub fn path(&self, path: &str) -> Option<&MappedValue> {
        let mut parts = path.split('.');
        let mut current = self.entries.get(parts.next()?)?;

        for part in parts {
            current = match current {
                MappedValue::Object(obj) => obj.entries.get(part)?,
                MappedValue::List(items) => items.get(part.parse::<usize>().ok()?)?,
                MappedValue::Scalar(_) => return None,
            };
        }

        Some(current)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Back to plain JSON
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Deserialize into a typed schema
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.to_json())
    }
}

impl Serialize for MappedObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn sample() -> MappedObject {
        MappedObject::from_json(&json!({
            "specs": {"disk": 81920, "memory": 4096, "vcpus": 2},
            "ipv4": [
                {"address": "192.0.2.1", "public": true},
                {"address": "10.0.0.1", "public": false}
            ],
            "tags": ["web", "prod"],
            "label": "linode123"
        }))
        .unwrap()
    }

    #[test]
    fn test_key_access() {
        let obj = sample();
        assert_eq!(obj.get("label").and_then(|v| v.as_str()), Some("linode123"));
        assert!(obj.get("missing").is_none());
        assert_eq!(obj.len(), 4);
    }

    #[test]
    fn test_dotted_path() {
        let obj = sample();
        assert_eq!(obj.path("specs.memory").and_then(|v| v.as_i64()), Some(4096));
        assert_eq!(
            obj.path("ipv4.1.address").and_then(|v| v.as_str()),
            Some("10.0.0.1")
        );
        assert_eq!(obj.path("ipv4.0.public").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(obj.path("tags.1").and_then(|v| v.as_str()), Some("prod"));
        assert!(obj.path("ipv4.9.address").is_none());
        assert!(obj.path("label.inner").is_none());
        assert!(obj.path("specs.nope").is_none());
    }

    #[test]
    fn test_lists_of_objects_are_wrapped() {
        let obj = sample();
        let ips = obj.get("ipv4").and_then(|v| v.as_list()).unwrap();
        assert!(ips[0].as_object().is_some());
    }

    #[test]
    fn test_to_json_preserves_content() {
        let raw = json!({"a": {"b": [1, {"c": null}]}, "d": "e"});
        let obj = MappedObject::from_json(&raw).unwrap();
        assert_eq!(obj.to_json(), raw);
        assert_eq!(serde_json::to_value(&obj).unwrap(), raw);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(MappedObject::from_json(&json!([1, 2])).is_none());
        assert!(MappedObject::from_json(&json!("x")).is_none());
    }

    #[test]
    fn test_deserialize_into_schema() {
        #[derive(Deserialize)]
        struct Specs {
            disk: u64,
            vcpus: u32,
        }

        let specs: Specs = sample()
            .get("specs")
            .and_then(|v| v.as_object())
            .unwrap()
            .deserialize()
            .unwrap();
        assert_eq!(specs.disk, 81920);
        assert_eq!(specs.vcpus, 2);
    }
}
