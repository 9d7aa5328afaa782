//! Resource Registry - Load resource definitions from JSON
//!
//! Resource types are declared as data in embedded JSON files. The registry is
//! built once, validated, and handed to the client behind an `Arc`.

use super::object::Resource;
use super::property::ResourceDef;
use crate::error::{Error, Result};
use crate::mapped::MappedObject;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/compute.json"),
    include_str!("../resources/storage.json"),
    include_str!("../resources/networking.json"),
    include_str!("../resources/dns.json"),
    include_str!("../resources/lke.json"),
    include_str!("../resources/account.json"),
];

/// Root structure of resources/*.json
#[derive(Debug, Deserialize)]
struct RegistryFile {
    /// Entity discriminant (`type` key of an entity payload) -> resource key
    #[serde(default)]
    entity_types: HashMap<String, String>,
    #[serde(default)]
    resources: HashMap<String, ResourceDef>,
}

/// Payload resolved by its `type` discriminant
#[derive(Debug, Clone)]
pub enum TaggedEntity {
    Resource(Resource),
    /// Discriminant without a registered type; the payload is kept as-is
    Unknown { tag: String, payload: MappedObject },
}

impl TaggedEntity {
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            TaggedEntity::Resource(r) => Some(r),
            TaggedEntity::Unknown { .. } => None,
        }
    }
}

/// Validated set of resource definitions
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, Arc<ResourceDef>>,
    entity_types: HashMap<String, String>,
}

impl ResourceRegistry {
    /// Registry of the definitions shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_sources(RESOURCE_FILES)
    }

    /// Build from one or more JSON documents; keys must not repeat across them
    pub fn from_sources(sources: &[&str]) -> Result<Self> {
        let mut registry = Self::default();

        for content in sources {
            let partial: RegistryFile = serde_json::from_str(content)
                .map_err(|e| Error::Registry(format!("failed to parse definitions: {}", e)))?;

            for (key, mut def) in partial.resources {
                if registry.resources.contains_key(&key) {
                    return Err(Error::Registry(format!("duplicate resource type '{}'", key)));
                }
                def.key = key.clone();
                registry.resources.insert(key, Arc::new(def));
            }
            registry.entity_types.extend(partial.entity_types);
        }

        registry.validate()?;
        tracing::debug!(
            "Loaded {} resource types, {} entity discriminants",
            registry.resources.len(),
            registry.entity_types.len()
        );

        Ok(registry)
    }

    fn validate(&self) -> Result<()> {
        for def in self.resources.values() {
            def.validate().map_err(Error::Registry)?;

            for (name, prop) in &def.properties {
                for target in prop.related_types() {
                    let target_def = self.resources.get(target).ok_or_else(|| {
                        Error::Registry(format!(
                            "{}.{} refers to unknown type '{}'",
                            def.key, name, target
                        ))
                    })?;

                    // Children are listed with this resource's ids as parents
                    let expected_parents = if prop.is_derived() {
                        def.parent_ids.len() + 1
                    } else {
                        0
                    };
                    if target_def.parent_ids.len() != expected_parents {
                        return Err(Error::Registry(format!(
                            "{}.{}: '{}' needs {} parent id(s), has {}",
                            def.key,
                            name,
                            target,
                            expected_parents,
                            target_def.parent_ids.len()
                        )));
                    }
                }
            }
        }

        for (tag, key) in &self.entity_types {
            match self.resources.get(key) {
                Some(def) if !def.is_derived() => {},
                Some(_) => {
                    return Err(Error::Registry(format!(
                        "entity type '{}' maps to derived type '{}'",
                        tag, key
                    )))
                },
                None => {
                    return Err(Error::Registry(format!(
                        "entity type '{}' maps to unknown type '{}'",
                        tag, key
                    )))
                },
            }
        }

        Ok(())
    }

    /// Get a resource definition by key
    pub fn get(&self, key: &str) -> Result<&Arc<ResourceDef>> {
        self.resources
            .get(key)
            .ok_or_else(|| Error::UnknownType(key.to_string()))
    }

    /// Get all resource keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.resources.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    /// Resource type registered for an entity discriminant
    pub fn entity_type(&self, tag: &str) -> Option<&Arc<ResourceDef>> {
        self.entity_types
            .get(tag)
            .and_then(|key| self.resources.get(key))
    }
}
