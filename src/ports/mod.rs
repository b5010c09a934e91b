//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `OrganizationStore` - Keyed organization records and their subscription

mod organization_store;

pub use organization_store::{AppliedChange, OrganizationStore};
