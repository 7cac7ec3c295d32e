//! Remote Catalog Client
//!
//! Read-only access to the upstream catalog: one list endpoint per
//! resource, cursor pagination, ETag revalidation and bounded retries.

pub mod client;
pub mod endpoints;
pub mod paginate;
pub mod retry;

pub use client::{ClientConfig, HttpClient};
pub use endpoints::{CatalogApi, CatalogFilters, HealthStatus, HttpCatalogApi, ListParams, Page};
pub use paginate::Paginator;
pub use retry::RetryPolicy;
