//! lapi - client library for a Linode-style cloud REST API
//!
//! Remote entities are [`Resource`]s whose fields populate themselves on first
//! read. Resource types are declared as data in a [`ResourceRegistry`], lists
//! come back as [`PaginatedList`]s, and server-side filters are built with
//! [`Field`] and [`Filter`].
//!
//! ```ignore
//! use lapi::{ApiClient, ClientConfig};
//!
//! let client = ApiClient::new(&ClientConfig::load()?)?;
//! let fields = client.registry().get("instances")?.fields();
//! let filter = fields.get("region")?.eq("us-east")?;
//! let mut list = client.list("instances", Some(&filter)).await?;
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod filter;
pub mod groups;
pub mod json_object;
pub mod mapped;
pub mod resource;

pub use api::client::ApiClient;
pub use api::pagination::PaginatedList;
pub use config::ClientConfig;
pub use error::{format_api_error, ApiError, Error, Result};
pub use filter::{Field, Filter, FilterError, Order};
pub use json_object::{JsonObject, Nullable};
pub use mapped::{MappedObject, MappedValue};
pub use resource::{FieldValue, ParentId, Resource, ResourceDef, ResourceRegistry, TaggedEntity};
