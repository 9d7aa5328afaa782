//! Resource abstraction layer
//!
//! Resource types are declared as data and loaded into a [`ResourceRegistry`];
//! instances of them are [`Resource`]s that populate themselves on demand.
//!
//! # Architecture
//!
//! - [`property`] - Per-field metadata and resource type definitions
//! - [`registry`] - Loads and validates definitions from embedded JSON
//! - [`object`] - The lazy population engine
//! - [`derived`] - Parent ids and endpoint formatting for nested resources
//! - [`value`] - Field values
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `compute.json` - Instances, disks, configs, types, images, regions
//! - `storage.json` - Volumes
//! - `networking.json` - Node balancers, their configs and nodes, firewalls
//! - `dns.json` - Domains and records
//! - `lke.json` - Kubernetes clusters and node pools
//! - `account.json` - Events, tags, entity discriminants

pub mod derived;
pub mod object;
pub mod property;
pub mod registry;
pub mod value;

pub use derived::ParentId;
pub use object::Resource;
pub use property::{Fields, PropertyDescriptor, PropertyKind, ResourceDef};
pub use registry::{ResourceRegistry, TaggedEntity};
pub use value::{FieldValue, DATE_FORMAT};
