//! API interaction module
//!
//! This module provides the transport side of the crate: the HTTP wrapper, the
//! client that resources call back into, and paginated list handling.
//!
//! # Module Structure
//!
//! - [`client`] - Main API client for making requests and building resources
//! - [`http`] - HTTP utilities for REST API calls
//! - [`pagination`] - Lazily fetched paginated lists
//!
//! # Example
//!
//! ```ignore
//! use lapi::{ApiClient, ClientConfig};
//!
//! async fn example() -> lapi::Result<()> {
//!     let client = ApiClient::new(&ClientConfig::load()?)?;
//!     let mut instances = client.list("instances", None).await?;
//!     let first = instances.first().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod pagination;
