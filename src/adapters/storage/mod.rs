//! Storage Adapters
//!
//! In-process implementation of the OrganizationStore port.
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::InMemoryOrganizationStore;
//!
//! let store = InMemoryOrganizationStore::new();
//! store.seed([Organization::new(id, "Acme")]).await;
//! ```

mod in_memory_organization_store;

pub use in_memory_organization_store::InMemoryOrganizationStore;
