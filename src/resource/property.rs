//! Property metadata
//!
//! Each resource type declares its fields once, as data; the descriptors are
//! shared by every instance of the type.

use crate::error::{Error, Result};
use crate::filter::Field;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Flags for one declared field
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropertyDescriptor {
    /// Part of the resource's identity; set at construction, never refreshed
    pub identifier: bool,
    /// May be changed locally and sent on save
    pub mutable: bool,
    /// Stale after the refresh window even when populated
    pub volatile: bool,
    /// Nested resource (or list of resources) of this type
    pub relationship: Option<String>,
    /// Child collection listed under this resource
    pub derived_class: Option<String>,
    /// Wire value is a `%Y-%m-%dT%H:%M:%S` timestamp
    pub datetime: bool,
    /// Accepted in `X-Filter`
    pub filterable: bool,
    /// Raw id of a resource of this type, exposed without the `_id` suffix
    pub id_relationship: Option<String>,
    /// Wire value is the slug id of a resource of this type
    pub slug_relationship: Option<String>,
    /// Sent as `null` on save when null locally
    pub nullable: bool,
}

/// What a field holds, derived from its descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind<'a> {
    Plain,
    Relationship(&'a str),
    DerivedCollection(&'a str),
    SlugRelationship(&'a str),
    IdRelationship(&'a str),
}

impl PropertyDescriptor {
    pub fn kind(&self) -> PropertyKind<'_> {
        if let Some(t) = &self.relationship {
            PropertyKind::Relationship(t)
        } else if let Some(t) = &self.derived_class {
            PropertyKind::DerivedCollection(t)
        } else if let Some(t) = &self.slug_relationship {
            PropertyKind::SlugRelationship(t)
        } else if let Some(t) = &self.id_relationship {
            PropertyKind::IdRelationship(t)
        } else {
            PropertyKind::Plain
        }
    }

    pub fn is_derived(&self) -> bool {
        self.derived_class.is_some()
    }

    /// Every type this descriptor points at
    pub fn related_types(&self) -> impl Iterator<Item = &str> {
        [
            &self.relationship,
            &self.derived_class,
            &self.slug_relationship,
            &self.id_relationship,
        ]
        .into_iter()
        .filter_map(|t| t.as_deref())
    }

    fn validate(&self, name: &str) -> std::result::Result<(), String> {
        if self.related_types().count() > 1 {
            return Err(format!("'{}' declares more than one relationship", name));
        }
        if self.identifier && (self.mutable || self.volatile || self.is_derived()) {
            return Err(format!(
                "identifier '{}' cannot be mutable, volatile or derived",
                name
            ));
        }
        if self.id_relationship.is_some() && !name.ends_with("_id") {
            return Err(format!("id relationship '{}' must end in _id", name));
        }
        Ok(())
    }
}

/// Definition of one resource type
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    /// Registry key, e.g. `instances`
    #[serde(skip)]
    pub key: String,
    pub display_name: String,
    /// Item endpoint with `{id}` and any parent placeholders
    pub endpoint: String,
    /// Parent placeholder names in endpoint order; empty for top-level types
    #[serde(default)]
    pub parent_ids: Vec<String>,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDescriptor>,
}

fn default_id_field() -> String {
    "id".to_string()
}

impl ResourceDef {
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    pub fn is_derived(&self) -> bool {
        !self.parent_ids.is_empty()
    }

    /// Endpoint of the collection this type lives in (item endpoint without `/{id}`)
    pub fn collection_endpoint(&self) -> &str {
        self.endpoint
            .strip_suffix("/{id}")
            .unwrap_or(&self.endpoint)
    }

    pub fn mutable_properties(&self) -> impl Iterator<Item = (&str, &PropertyDescriptor)> {
        self.properties
            .iter()
            .filter(|(_, p)| p.mutable)
            .map(|(k, p)| (k.as_str(), p))
    }

    /// Filter handles for this type's fields
    pub fn fields(&self) -> Fields<'_> {
        Fields { def: self }
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if !self.endpoint.ends_with("/{id}") {
            return Err(format!("{}: endpoint must end in /{{id}}", self.key));
        }
        for parent in &self.parent_ids {
            if !self.endpoint.contains(&format!("{{{}}}", parent)) {
                return Err(format!(
                    "{}: endpoint does not contain {{{}}}",
                    self.key, parent
                ));
            }
        }
        match self.properties.get(&self.id_field) {
            Some(p) if p.identifier => {},
            _ => {
                return Err(format!(
                    "{}: id field '{}' must be a declared identifier",
                    self.key, self.id_field
                ))
            },
        }
        for (name, prop) in &self.properties {
            prop.validate(name)
                .map_err(|e| format!("{}: {}", self.key, e))?;
        }
        Ok(())
    }
}

/// Per-type namespace of filter handles
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    def: &'a ResourceDef,
}

impl<'a> Fields<'a> {
    /// Handle for a declared field; non-filterable fields yield a handle whose
    /// comparisons fail
    pub fn get(&self, name: &str) -> Result<Field> {
        let prop = self.def.property(name).ok_or_else(|| Error::UnknownField {
            kind: self.def.key.clone(),
            field: name.to_string(),
        })?;

        Ok(if prop.filterable {
            Field::new(name)
        } else {
            Field::non_filterable(name)
        })
    }

    pub fn filterable(&self) -> impl Iterator<Item = Field> + 'a {
        self.def
            .properties
            .iter()
            .filter(|(_, p)| p.filterable)
            .map(|(name, _)| Field::new(name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn disk_def() -> ResourceDef {
        let mut def: ResourceDef = serde_json::from_value(json!({
            "display_name": "Disk",
            "endpoint": "/instances/{linode_id}/disks/{id}",
            "parent_ids": ["linode_id"],
            "properties": {
                "id": {"identifier": true, "filterable": true},
                "label": {"mutable": true, "filterable": true},
                "status": {"volatile": true},
                "created": {"datetime": true}
            }
        }))
        .unwrap();
        def.key = "disks".to_string();
        def
    }

    #[test]
    fn test_definition_loads() {
        let def = disk_def();
        assert!(def.validate().is_ok());
        assert!(def.is_derived());
        assert_eq!(def.collection_endpoint(), "/instances/{linode_id}/disks");
        let mutable: Vec<_> = def.mutable_properties().map(|(k, _)| k).collect();
        assert_eq!(mutable, vec!["label"]);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let result = serde_json::from_value::<PropertyDescriptor>(json!({"mutabel": true}));
        assert!(result.is_err());
    }

    #[test]
    fn test_one_relationship_per_field() {
        let prop = PropertyDescriptor {
            relationship: Some("instances".into()),
            slug_relationship: Some("regions".into()),
            ..Default::default()
        };
        assert!(prop.validate("thing").is_err());
    }

    #[test]
    fn test_identifier_cannot_be_mutable() {
        let prop = PropertyDescriptor {
            identifier: true,
            mutable: true,
            ..Default::default()
        };
        assert!(prop.validate("id").is_err());
    }

    #[test]
    fn test_missing_parent_placeholder() {
        let mut def = disk_def();
        def.endpoint = "/disks/{id}".to_string();
        assert!(def.validate().unwrap_err().contains("{linode_id}"));
    }

    #[test]
    fn test_kind() {
        let prop = PropertyDescriptor {
            derived_class: Some("disks".into()),
            ..Default::default()
        };
        assert_eq!(prop.kind(), PropertyKind::DerivedCollection("disks"));
        assert_eq!(PropertyDescriptor::default().kind(), PropertyKind::Plain);
    }

    #[test]
    fn test_fields_namespace() {
        let def = disk_def();
        let fields = def.fields();

        let label = fields.get("label").unwrap();
        assert!(label.is_filterable());

        let status = fields.get("status").unwrap();
        assert!(status.eq("ready").is_err());

        assert!(matches!(
            fields.get("nope"),
            Err(Error::UnknownField { .. })
        ));

        let names: Vec<String> = fields.filterable().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["id", "label"]);
    }
}
