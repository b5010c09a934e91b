//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - axum webhook endpoint
//! - `postgres` - sqlx organization store
//! - `storage` - in-memory organization store

pub mod http;
pub mod postgres;
pub mod storage;

pub use http::{webhook_router, HttpLimits, WebhookAppState};
pub use postgres::PostgresOrganizationStore;
pub use storage::InMemoryOrganizationStore;
