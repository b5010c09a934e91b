//! PostgreSQL adapters - Database implementations for store ports.
//!
//! - `PostgresOrganizationStore` - Organizations and their subscription columns

mod organization_store;

pub use organization_store::PostgresOrganizationStore;
