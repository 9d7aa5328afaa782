//! Resource objects
//!
//! A [`Resource`] is one remote entity. It is created either from an identifier
//! alone, in which case it fetches itself the first time server-backed state is
//! read, or from an identifier and a payload, in which case it is populated
//! immediately.
//!
//! ```ignore
//! let mut instance = client.resource("instances", 123)?;
//! let label = instance.get("label").await?;      // GET /instances/123
//! instance.set("label", "web-1")?;
//! instance.save().await?;                        // PUT /instances/123
//! ```

use super::derived::{self, ParentId};
use super::property::{PropertyDescriptor, PropertyKind, ResourceDef};
use super::registry::TaggedEntity;
use super::value::{FieldValue, DATE_FORMAT};
use crate::api::client::ApiClient;
use crate::error::{has_error_marker, Error, Result};
use crate::json_object::JsonObject;
use crate::mapped::MappedObject;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

static UNSET: FieldValue = FieldValue::Unset;

/// One remote entity with lazily populated fields
#[derive(Clone)]
pub struct Resource {
    client: ApiClient,
    def: Arc<ResourceDef>,
    id: Value,
    parent: Option<ParentId>,
    fields: BTreeMap<String, FieldValue>,
    populated: bool,
    last_updated: Option<DateTime<Utc>>,
    raw: Option<Value>,
    changed: BTreeSet<String>,
}

impl Resource {
    /// Identifier-only resource; nothing is fetched until a field is read
    pub(crate) fn new(
        client: ApiClient,
        def: Arc<ResourceDef>,
        id: Value,
        parent: Option<ParentId>,
    ) -> Result<Self> {
        derived::check_parent(&def, parent.as_ref())?;

        let mut fields = BTreeMap::new();
        fields.insert(def.id_field.clone(), FieldValue::Scalar(id.clone()));

        Ok(Self {
            client,
            def,
            id,
            parent,
            fields,
            populated: false,
            last_updated: None,
            raw: None,
            changed: BTreeSet::new(),
        })
    }

    /// Resource populated from `payload` right away
    pub(crate) fn with_payload(
        client: ApiClient,
        def: Arc<ResourceDef>,
        id: Value,
        parent: Option<ParentId>,
        payload: &Value,
    ) -> Result<Self> {
        let mut resource = Self::new(client, def, id, parent)?;
        resource.set_identifiers(payload);
        resource.populate(payload)?;
        Ok(resource)
    }

    /// Resource whose id is read from the payload itself
    pub(crate) fn from_payload(
        client: ApiClient,
        def: Arc<ResourceDef>,
        parent: Option<ParentId>,
        payload: &Value,
    ) -> Result<Self> {
        let id = payload
            .get(&def.id_field)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| {
                Error::unexpected(
                    format!("{} payload has no '{}'", def.display_name, def.id_field),
                    payload,
                )
            })?;
        Self::with_payload(client, def, id, parent, payload)
    }

    /// Identifier fields besides the primary id are taken once, at construction
    fn set_identifiers(&mut self, payload: &Value) {
        for (name, prop) in &self.def.properties {
            if !prop.identifier || *name == self.def.id_field {
                continue;
            }
            if let Some(value) = payload.get(name) {
                self.fields
                    .insert(name.clone(), FieldValue::Scalar(value.clone()));
            }
        }
    }

    pub fn id(&self) -> &Value {
        &self.id
    }

    /// Registry key of this resource's type
    pub fn kind(&self) -> &str {
        &self.def.key
    }

    pub fn def(&self) -> &ResourceDef {
        &self.def
    }

    pub fn parent_id(&self) -> Option<&ParentId> {
        self.parent.as_ref()
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Payload of the last population
    pub fn raw_json(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    /// Fields set locally since the last population or save
    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    /// Same type and identity
    pub fn same_resource(&self, other: &Resource) -> bool {
        self.def.key == other.def.key && self.id == other.id && self.parent == other.parent
    }

    /// Item endpoint, e.g. `/instances/123/disks/1`
    pub fn endpoint(&self) -> Result<String> {
        derived::format_endpoint(
            &self.def.endpoint,
            &self.def,
            Some(&self.id),
            self.parent.as_ref(),
        )
    }

    /// Declared property for `name`; `linode` resolves to `linode_id` when
    /// that is an id relationship
    fn descriptor(&self, name: &str) -> Result<PropertyDescriptor> {
        if let Some(prop) = self.def.property(name) {
            return Ok(prop.clone());
        }
        match self.def.property(&format!("{}_id", name)) {
            Some(prop) if prop.id_relationship.is_some() => Ok(prop.clone()),
            _ => Err(Error::UnknownField {
                kind: self.def.display_name.clone(),
                field: name.to_string(),
            }),
        }
    }

    /// Current value without any network call
    pub fn peek(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&UNSET)
    }

    /// Read a field, fetching first when local state cannot answer
    pub async fn get(&mut self, name: &str) -> Result<&FieldValue> {
        let prop = self.descriptor(name)?;

        if !prop.identifier {
            if let Some(child) = &prop.derived_class {
                let children = self.load_children(child).await?;
                self.fields
                    .insert(name.to_string(), FieldValue::Resources(children));
            } else if self.needs_fetch(name, &prop) {
                self.fetch().await?;
            }
        }

        Ok(self.peek(name))
    }

    /// Read a field into a typed schema
    pub async fn get_as<T: JsonObject>(&mut self, name: &str) -> Result<T> {
        let value = self.get(name).await?.to_json();
        T::from_json(&value)
    }

    /// Resolve a `{"type": ..., "id": ...}` field through the registry
    pub async fn tagged_entity(&mut self, name: &str) -> Result<TaggedEntity> {
        let value = self.get(name).await?.to_json();
        self.client.resolve_entity(&value)
    }

    fn needs_fetch(&self, name: &str, prop: &PropertyDescriptor) -> bool {
        let unset = self.peek(name).is_unset();
        (unset && !self.populated) || (prop.volatile && self.is_stale())
    }

    fn is_stale(&self) -> bool {
        let Some(last) = self.last_updated else {
            return true;
        };
        match (Utc::now() - last).to_std() {
            Ok(elapsed) => elapsed > self.client.volatile_refresh(),
            // clock went backwards
            Err(_) => false,
        }
    }

    async fn load_children(&self, child: &str) -> Result<Vec<Resource>> {
        let parent = match &self.parent {
            Some(parent) => parent.child(&self.id),
            None => ParentId::new(self.id.clone()),
        };
        self.client
            .list_derived(child, parent, None)
            .await?
            .collect_all()
            .await
    }

    async fn fetch(&mut self) -> Result<()> {
        let path = self.endpoint()?;
        let json = self.client.get(&path, None).await?;
        self.populate(&json)
    }

    /// Fetch now, regardless of local state
    pub async fn refresh(&mut self) -> Result<()> {
        self.fetch().await
    }

    /// Fill fields from a payload
    pub fn populate(&mut self, payload: &Value) -> Result<()> {
        let Some(obj) = payload.as_object() else {
            return Err(Error::unexpected(
                format!("{} payload is not an object", self.def.display_name),
                payload,
            ));
        };

        let def = Arc::clone(&self.def);
        for (key, value) in obj {
            let Some(prop) = def.property(key) else {
                continue;
            };
            if prop.identifier {
                continue;
            }

            let field = match prop.kind() {
                PropertyKind::Relationship(target) if !value.is_null() => {
                    let existing = self.fields.remove(key);
                    self.relate(existing, target, value)?
                },
                PropertyKind::SlugRelationship(target) if !value.is_null() => {
                    let related = self.client.construct(target, value.clone(), None, None)?;
                    FieldValue::from(related)
                },
                PropertyKind::IdRelationship(target) => {
                    if let Some(alias) = key.strip_suffix("_id") {
                        let related = if value.is_null() {
                            FieldValue::Scalar(Value::Null)
                        } else {
                            let existing = self.fields.remove(alias);
                            self.relate(existing, target, value)?
                        };
                        self.fields.insert(alias.to_string(), related);
                    }
                    FieldValue::Scalar(value.clone())
                },
                // always re-resolved on access
                PropertyKind::DerivedCollection(_) => continue,
                _ => plain_value(key, prop, value),
            };

            self.fields.insert(key.clone(), field);
        }

        self.populated = true;
        self.last_updated = Some(Utc::now());
        self.raw = Some(payload.clone());
        self.changed.clear();
        Ok(())
    }

    /// Build related resources, reusing ones already held under this field
    fn relate(
        &self,
        existing: Option<FieldValue>,
        target: &str,
        value: &Value,
    ) -> Result<FieldValue> {
        let def = Arc::clone(self.client.registry().get(target)?);

        match value {
            Value::Array(items) => {
                let mut previous = match existing {
                    Some(FieldValue::Resources(list)) => list,
                    _ => Vec::new(),
                };
                let mut related = Vec::with_capacity(items.len());
                for item in items {
                    let Some(id) = related_id(&def, item) else {
                        tracing::warn!(
                            "{} entry in {} has no '{}', skipping",
                            def.display_name,
                            self.def.key,
                            def.id_field
                        );
                        continue;
                    };
                    let reused = previous
                        .iter()
                        .position(|r| r.id == id)
                        .map(|i| previous.swap_remove(i));
                    related.push(self.relate_one(reused, &def, id, item)?);
                }
                Ok(FieldValue::Resources(related))
            },
            _ => {
                let id = related_id(&def, value).ok_or_else(|| {
                    Error::unexpected(
                        format!("{} reference has no '{}'", def.display_name, def.id_field),
                        value,
                    )
                })?;
                let reused = match existing {
                    Some(FieldValue::Resource(r)) if r.id == id => Some(*r),
                    _ => None,
                };
                Ok(FieldValue::from(self.relate_one(reused, &def, id, value)?))
            },
        }
    }

    fn relate_one(
        &self,
        reused: Option<Resource>,
        def: &Arc<ResourceDef>,
        id: Value,
        payload: &Value,
    ) -> Result<Resource> {
        let mut resource = match reused {
            Some(r) => r,
            None => Resource::new(self.client.clone(), Arc::clone(def), id, None)?,
        };

        // a bare `{"id": n}` reference carries nothing to populate
        let has_content = payload
            .as_object()
            .is_some_and(|obj| obj.keys().any(|k| *k != def.id_field));
        if has_content {
            resource.populate(payload)?;
        }
        Ok(resource)
    }

    /// Change a mutable field locally
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let prop = self.def.property(name).ok_or_else(|| Error::UnknownField {
            kind: self.def.display_name.clone(),
            field: name.to_string(),
        })?;
        if !prop.mutable {
            return Err(Error::ImmutableField {
                kind: self.def.display_name.clone(),
                field: name.to_string(),
            });
        }

        self.fields.insert(name.to_string(), value.into());
        self.changed.insert(name.to_string());
        Ok(())
    }

    /// Body of an update request: every mutable field that holds a value
    pub fn to_update_body(&self) -> Value {
        let mut body = Map::new();

        for (name, prop) in self.def.mutable_properties() {
            let value = self.peek(name);
            if value.is_unset() || (value.is_null() && !prop.nullable) {
                continue;
            }
            body.insert(name.to_string(), value.to_json());
        }

        Value::Object(body)
    }

    /// Send mutable fields to the API; `Ok(false)` on a soft failure
    pub async fn save(&mut self) -> Result<bool> {
        let path = self.endpoint()?;
        let body = self.to_update_body();

        tracing::info!("Saving {} {}", self.def.display_name, self.id);
        let response = self.client.put(&path, &body).await?;

        if has_error_marker(&response) {
            tracing::warn!("Save of {} {} was rejected", self.def.display_name, self.id);
            return Ok(false);
        }

        self.changed.clear();
        Ok(true)
    }

    /// Delete remotely and drop local state; `Ok(false)` on a soft failure
    pub async fn delete(&mut self) -> Result<bool> {
        let path = self.endpoint()?;

        tracing::info!("Deleting {} {}", self.def.display_name, self.id);
        let response = self.client.delete(&path).await?;

        if has_error_marker(&response) {
            tracing::warn!("Delete of {} {} was rejected", self.def.display_name, self.id);
            return Ok(false);
        }

        self.invalidate();
        Ok(true)
    }

    /// Forget everything but the identifiers; the next read fetches again
    pub fn invalidate(&mut self) {
        let def = Arc::clone(&self.def);
        self.fields
            .retain(|name, _| def.property(name).is_some_and(|p| p.identifier));
        self.populated = false;
        self.last_updated = None;
        self.raw = None;
        self.changed.clear();
    }

    #[cfg(test)]
    fn backdate(&mut self, by: std::time::Duration) {
        if let Some(last) = self.last_updated {
            self.last_updated = Some(last - chrono::Duration::from_std(by).unwrap());
        }
    }
}

fn related_id(def: &ResourceDef, value: &Value) -> Option<Value> {
    match value {
        Value::Object(obj) => obj.get(&def.id_field).filter(|v| !v.is_null()).cloned(),
        Value::Null | Value::Array(_) => None,
        scalar => Some(scalar.clone()),
    }
}

fn plain_value(key: &str, prop: &PropertyDescriptor, value: &Value) -> FieldValue {
    match value {
        Value::Object(map) => FieldValue::Mapped(MappedObject::from_map(map)),
        Value::Array(_) => FieldValue::from(value.clone()),
        Value::String(s) if prop.datetime => match NaiveDateTime::parse_from_str(s, DATE_FORMAT) {
            Ok(dt) => FieldValue::DateTime(dt),
            Err(e) => {
                tracing::warn!(
                    "Field '{}' has unexpected datetime format '{}' ({}), keeping raw value",
                    key,
                    s,
                    e
                );
                FieldValue::Scalar(value.clone())
            },
        },
        other => FieldValue::Scalar(other.clone()),
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("kind", &self.def.key)
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("populated", &self.populated)
            .field("fields", &self.fields)
            .finish()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.def.display_name, self.id)
    }
}
