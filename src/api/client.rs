//! API Client
//!
//! Main client for the REST API, combining configuration, the HTTP layer and
//! the resource registry.

use super::http::ApiHttpClient;
use super::pagination::PaginatedList;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::mapped::MappedObject;
use crate::resource::derived::format_endpoint;
use crate::resource::{ParentId, Resource, ResourceDef, ResourceRegistry, TaggedEntity};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Main API client
#[derive(Clone)]
pub struct ApiClient {
    http: ApiHttpClient,
    base_url: String,
    token: Option<String>,
    registry: Arc<ResourceRegistry>,
    page_size: u32,
    volatile_refresh: Duration,
}

impl ApiClient {
    /// Create a client with the built-in resource definitions
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_registry(config, Arc::new(ResourceRegistry::builtin()?))
    }

    /// Create a client sharing an existing registry
    pub fn with_registry(config: &ClientConfig, registry: Arc<ResourceRegistry>) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            Error::Config(format!("invalid base_url '{}': {}", config.base_url, e))
        })?;

        Ok(Self {
            http: ApiHttpClient::new(&config.user_agent)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            registry,
            page_size: config.page_size.max(1),
            volatile_refresh: config.volatile_refresh(),
        })
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn volatile_refresh(&self) -> Duration {
        self.volatile_refresh
    }

    /// Absolute URL for an API path such as `/instances/123`
    pub fn url(&self, path: &str) -> Result<Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| Error::InvalidInput(format!("bad path '{}': {}", path, e)))
    }

    // =========================================================================
    // Raw calls
    // =========================================================================

    /// GET a path, with an optional filter
    pub async fn get(&self, path: &str, filter: Option<&Filter>) -> Result<Value> {
        let header = filter.filter(|f| !f.is_empty()).map(Filter::to_header);
        self.http
            .get(self.url(path)?, self.token.as_deref(), header.as_deref())
            .await
    }

    /// GET one page (1-based) of a list endpoint
    pub async fn get_page(&self, path: &str, page: usize, filter: Option<&Filter>) -> Result<Value> {
        let mut url = self.url(path)?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &self.page_size.to_string());

        let header = filter.filter(|f| !f.is_empty()).map(Filter::to_header);
        self.http
            .get(url, self.token.as_deref(), header.as_deref())
            .await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.http
            .post(self.url(path)?, self.token.as_deref(), body)
            .await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.http
            .put(self.url(path)?, self.token.as_deref(), body)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.http.delete(self.url(path)?, self.token.as_deref()).await
    }

    // =========================================================================
    // Resources
    // =========================================================================

    fn def(&self, kind: &str) -> Result<Arc<ResourceDef>> {
        self.registry.get(kind).map(Arc::clone)
    }

    /// Build a resource: lazy without a payload, populated with one
    pub fn construct(
        &self,
        kind: &str,
        id: Value,
        parent: Option<ParentId>,
        payload: Option<&Value>,
    ) -> Result<Resource> {
        let def = self.def(kind)?;
        match payload {
            Some(payload) => Resource::with_payload(self.clone(), def, id, parent, payload),
            None => Resource::new(self.clone(), def, id, parent),
        }
    }

    /// Lazy handle on a top-level resource
    pub fn resource(&self, kind: &str, id: impl Into<Value>) -> Result<Resource> {
        self.construct(kind, id.into(), None, None)
    }

    /// Lazy handle on a derived resource
    pub fn derived(
        &self,
        kind: &str,
        id: impl Into<Value>,
        parent: impl Into<ParentId>,
    ) -> Result<Resource> {
        self.construct(kind, id.into(), Some(parent.into()), None)
    }

    /// Fetch a top-level resource now
    pub async fn load(&self, kind: &str, id: impl Into<Value>) -> Result<Resource> {
        let mut resource = self.resource(kind, id)?;
        resource.refresh().await?;
        Ok(resource)
    }

    /// Fetch a derived resource now
    pub async fn load_derived(
        &self,
        kind: &str,
        id: impl Into<Value>,
        parent: impl Into<ParentId>,
    ) -> Result<Resource> {
        let mut resource = self.derived(kind, id, parent)?;
        resource.refresh().await?;
        Ok(resource)
    }

    /// List a top-level collection
    pub async fn list(&self, kind: &str, filter: Option<&Filter>) -> Result<PaginatedList> {
        self.list_in(kind, None, filter).await
    }

    /// List the children of `parent`
    pub async fn list_derived(
        &self,
        kind: &str,
        parent: impl Into<ParentId>,
        filter: Option<&Filter>,
    ) -> Result<PaginatedList> {
        self.list_in(kind, Some(parent.into()), filter).await
    }

    async fn list_in(
        &self,
        kind: &str,
        parent: Option<ParentId>,
        filter: Option<&Filter>,
    ) -> Result<PaginatedList> {
        let def = self.def(kind)?;
        let path = format_endpoint(def.collection_endpoint(), &def, None, parent.as_ref())?;
        PaginatedList::fetch(self.clone(), def, path, parent, filter.cloned()).await
    }

    /// Create a top-level resource
    pub async fn create(&self, kind: &str, body: &Value) -> Result<Resource> {
        self.create_in(kind, None, body).await
    }

    /// Create a child of `parent`
    pub async fn create_derived(
        &self,
        kind: &str,
        parent: impl Into<ParentId>,
        body: &Value,
    ) -> Result<Resource> {
        self.create_in(kind, Some(parent.into()), body).await
    }

    async fn create_in(&self, kind: &str, parent: Option<ParentId>, body: &Value) -> Result<Resource> {
        let def = self.def(kind)?;
        let path = format_endpoint(def.collection_endpoint(), &def, None, parent.as_ref())?;

        tracing::info!("Creating {} at {}", def.display_name, path);
        let response = self.post(&path, body).await?;

        if response.get(&def.id_field).map_or(true, Value::is_null) {
            return Err(Error::unexpected(
                format!("unexpected response creating {}", def.display_name),
                &response,
            ));
        }
        Resource::from_payload(self.clone(), def, parent, &response)
    }

    /// Resolve a `{"type": ..., "id": ...}` payload to a resource
    pub fn resolve_entity(&self, payload: &Value) -> Result<TaggedEntity> {
        let Some(obj) = MappedObject::from_json(payload) else {
            return Err(Error::unexpected("entity is not an object", payload));
        };
        let tag = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::unexpected("entity has no 'type'", payload))?;

        let Some(def) = self.registry.entity_type(tag) else {
            tracing::warn!("Unknown entity type '{}'", tag);
            return Ok(TaggedEntity::Unknown {
                tag: tag.to_string(),
                payload: obj,
            });
        };

        let id = payload
            .get(&def.id_field)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| Error::unexpected("entity has no id", payload))?;
        let resource = Resource::new(self.clone(), Arc::clone(def), id, None)?;
        Ok(TaggedEntity::Resource(resource))
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Security: never print the token
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> ApiClient {
        ApiClient::new(&ClientConfig {
            base_url: "https://api.example.com/v4/".to_string(),
            token: Some("secret".to_string()),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_building() {
        let c = client();
        assert_eq!(
            c.url("/instances/123").unwrap().as_str(),
            "https://api.example.com/v4/instances/123"
        );
        assert_eq!(
            c.url("regions").unwrap().as_str(),
            "https://api.example.com/v4/regions"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let printed = format!("{:?}", client());
        assert!(!printed.contains("secret"));
        assert!(printed.contains("authenticated: true"));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ApiClient::new(&ClientConfig {
            base_url: "::nope".to_string(),
            ..ClientConfig::default()
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_derived_needs_parent() {
        let c = client();
        assert!(matches!(
            c.resource("disks", 1),
            Err(Error::InvalidInput(_))
        ));
        assert!(c.derived("disks", 1, 123).is_ok());
        assert!(matches!(
            c.derived("instances", 1, 123),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(c.resource("spaceships", 1), Err(Error::UnknownType(_))));
    }

    #[test]
    fn test_resolve_entity() {
        let c = client();

        let entity = c
            .resolve_entity(&json!({"id": 123, "type": "linode", "label": "web"}))
            .unwrap();
        let resource = entity.as_resource().unwrap();
        assert_eq!(resource.kind(), "instances");
        assert_eq!(resource.id(), &json!(123));

        match c
            .resolve_entity(&json!({"id": 9, "type": "stackscript"}))
            .unwrap()
        {
            TaggedEntity::Unknown { tag, payload } => {
                assert_eq!(tag, "stackscript");
                assert_eq!(payload.get("id").and_then(|v| v.as_i64()), Some(9));
            },
            other => panic!("expected unknown entity, got {:?}", other),
        }

        assert!(matches!(
            c.resolve_entity(&json!({"id": 1})),
            Err(Error::UnexpectedResponse { .. })
        ));
    }
}
