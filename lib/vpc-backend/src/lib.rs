//! Backend networking controller client
pub mod client;
pub mod error;
pub mod rest;
pub mod search;

#[cfg(any(test, feature = "testing"))]
pub use client::MockBackendClient;
pub use client::BackendClient;
pub use error::{BackendError, Result};
pub use rest::{RestClient, RestConfig};
pub use search::{search_all, SearchQuery};
