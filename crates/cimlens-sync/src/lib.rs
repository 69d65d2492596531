//! Sync layer: HTTP transport to the CIMLens analysis backend.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ApiClient, ClientError};
