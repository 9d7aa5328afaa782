//! Typed JSON schemas
//!
//! A [`JsonObject`] is a serde struct for a payload shape the API documents but
//! which is not an addressable resource. Inclusion rules on serialization:
//!
//! - `Nullable<T>` fields marked `#[serde(default, skip_serializing_if = "Nullable::is_omitted")]`
//!   are left out until set, and send an explicit `null` when set to [`Nullable::Null`].
//! - Plain `Option<T>` fields without a skip attribute are always included.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Tri-state field: omitted, explicit null, or a value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Nullable<T> {
    #[default]
    Omitted,
    Null,
    Value(T),
}

impl<T> Nullable<T> {
    pub fn is_omitted(&self) -> bool {
        matches!(self, Nullable::Omitted)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Nullable::Null)
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Nullable::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Nullable::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<T> for Nullable<T> {
    fn from(value: T) -> Self {
        Nullable::Value(value)
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Nullable::Value(v) => v.serialize(serializer),
            Nullable::Omitted | Nullable::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nullable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // A missing key never reaches here; `#[serde(default)]` yields Omitted.
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Nullable::Value(v),
            None => Nullable::Null,
        })
    }
}

/// Declared payload schema
pub trait JsonObject: Serialize + DeserializeOwned {
    fn from_json(json: &Value) -> Result<Self> {
        Ok(serde_json::from_value(json.clone())?)
    }

    fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Hardware allotment of an instance type (`specs`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpecs {
    pub disk: u64,
    pub memory: u64,
    pub vcpus: u32,
    #[serde(default)]
    pub transfer: u64,
    #[serde(default)]
    pub gpus: u32,
}

impl JsonObject for InstanceSpecs {}

/// Alert thresholds of an instance (`alerts`); unset thresholds are not sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceAlerts {
    #[serde(default, skip_serializing_if = "Nullable::is_omitted")]
    pub cpu: Nullable<u32>,
    #[serde(default, skip_serializing_if = "Nullable::is_omitted")]
    pub io: Nullable<u32>,
    #[serde(default, skip_serializing_if = "Nullable::is_omitted")]
    pub network_in: Nullable<u32>,
    #[serde(default, skip_serializing_if = "Nullable::is_omitted")]
    pub network_out: Nullable<u32>,
    #[serde(default, skip_serializing_if = "Nullable::is_omitted")]
    pub transfer_quota: Nullable<u32>,
}

impl JsonObject for InstanceAlerts {}

/// Network interface of a config profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigInterface {
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Nullable::is_omitted")]
    pub label: Nullable<String>,
    #[serde(default, skip_serializing_if = "Nullable::is_omitted")]
    pub ipam_address: Nullable<String>,
    /// Always sent, `null` when unset
    #[serde(default)]
    pub primary: Option<bool>,
}

impl JsonObject for ConfigInterface {}

impl ConfigInterface {
    pub fn public() -> Self {
        Self {
            purpose: "public".to_string(),
            label: Nullable::Omitted,
            ipam_address: Nullable::Omitted,
            primary: None,
        }
    }

    pub fn vlan(label: &str, ipam_address: Option<&str>) -> Self {
        Self {
            purpose: "vlan".to_string(),
            label: Nullable::Value(label.to_string()),
            ipam_address: match ipam_address {
                Some(addr) => Nullable::Value(addr.to_string()),
                None => Nullable::Null,
            },
            primary: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_omitted_fields_are_skipped() {
        let alerts = InstanceAlerts {
            cpu: Nullable::Value(90),
            ..Default::default()
        };
        assert_eq!(alerts.to_json().unwrap(), json!({"cpu": 90}));
    }

    #[test]
    fn test_explicit_null_is_sent() {
        let alerts = InstanceAlerts {
            io: Nullable::Null,
            ..Default::default()
        };
        assert_eq!(alerts.to_json().unwrap(), json!({"io": null}));
    }

    #[test]
    fn test_always_included_option() {
        let iface = ConfigInterface::public();
        assert_eq!(
            iface.to_json().unwrap(),
            json!({"purpose": "public", "primary": null})
        );

        let vlan = ConfigInterface::vlan("backend", None);
        assert_eq!(
            vlan.to_json().unwrap(),
            json!({
                "purpose": "vlan",
                "label": "backend",
                "ipam_address": null,
                "primary": null
            })
        );
    }

    #[test]
    fn test_deserialize_distinguishes_missing_and_null() {
        let alerts = InstanceAlerts::from_json(&json!({"cpu": null, "io": 5})).unwrap();
        assert!(alerts.cpu.is_null());
        assert_eq!(alerts.io.as_ref(), Some(&5));
        assert!(alerts.network_in.is_omitted());
    }

    #[test]
    fn test_specs_from_json() {
        let specs = InstanceSpecs::from_json(&json!({
            "disk": 25600, "memory": 1024, "vcpus": 1, "transfer": 1000
        }))
        .unwrap();
        assert_eq!(specs.memory, 1024);
        assert_eq!(specs.gpus, 0);
    }
}
