//! Field values held by a [`Resource`]

use super::object::Resource;
use crate::mapped::MappedObject;
use chrono::NaiveDateTime;
use serde_json::Value;

/// Wire format of datetime fields (UTC implied)
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Value of one resource field
#[derive(Debug, Clone, Default)]
pub enum FieldValue {
    /// Not populated yet
    #[default]
    Unset,
    Scalar(Value),
    DateTime(NaiveDateTime),
    Mapped(MappedObject),
    List(Vec<FieldValue>),
    Resource(Box<Resource>),
    Resources(Vec<Resource>),
}

impl FieldValue {
    pub fn is_unset(&self) -> bool {
        matches!(self, FieldValue::Unset)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Scalar(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_datetime(&self) -> Option<&NaiveDateTime> {
        match self {
            FieldValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_mapped(&self) -> Option<&MappedObject> {
        match self {
            FieldValue::Mapped(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            FieldValue::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_resources(&self) -> Option<&[Resource]> {
        match self {
            FieldValue::Resources(items) => Some(items),
            _ => None,
        }
    }

    /// Plain JSON for request bodies: related resources become their id,
    /// datetimes go back to the wire format, unset becomes null
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Unset => Value::Null,
            FieldValue::Scalar(v) => v.clone(),
            FieldValue::DateTime(dt) => Value::String(dt.format(DATE_FORMAT).to_string()),
            FieldValue::Mapped(obj) => obj.to_json(),
            FieldValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            FieldValue::Resource(r) => r.id().clone(),
            FieldValue::Resources(items) => {
                Value::Array(items.iter().map(|r| r.id().clone()).collect())
            },
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => FieldValue::Mapped(MappedObject::from_map(&map)),
            Value::Array(items) => FieldValue::List(items.into_iter().map(Self::from).collect()),
            other => FieldValue::Scalar(other),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Scalar(Value::String(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Scalar(Value::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Scalar(Value::Bool(value))
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<MappedObject> for FieldValue {
    fn from(value: MappedObject) -> Self {
        FieldValue::Mapped(value)
    }
}

impl From<Resource> for FieldValue {
    fn from(value: Resource) -> Self {
        FieldValue::Resource(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_wraps_objects_and_lists() {
        let v = FieldValue::from(json!({"a": 1}));
        assert!(v.as_mapped().is_some());

        let v = FieldValue::from(json!([{"a": 1}, 2]));
        let items = v.as_list().unwrap();
        assert!(items[0].as_mapped().is_some());
        assert_eq!(items[1].as_i64(), Some(2));
    }

    #[test]
    fn test_datetime_goes_back_to_wire_format() {
        let dt = NaiveDateTime::parse_from_str("2018-01-01T00:01:01", DATE_FORMAT).unwrap();
        assert_eq!(FieldValue::from(dt).to_json(), json!("2018-01-01T00:01:01"));
    }

    #[test]
    fn test_unset_and_null() {
        assert!(FieldValue::default().is_unset());
        assert!(FieldValue::from(Value::Null).is_null());
        assert_eq!(FieldValue::Unset.to_json(), Value::Null);
    }
}
