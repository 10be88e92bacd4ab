//! Praxis Storage Layer
//!
//! Ports for the two kinds of storage the tenancy context depends on:
//!
//! - **Directory ports**: read-only row lookups against the backing data
//!   store (admin identities, clinics)
//! - **Selection store**: durable key/value entry remembering the last
//!   clinic the admin selected
//!
//! # Adapters
//!
//! - **In-memory**: `MemoryDirectory`, `MemorySelectionStore` (testing, development)
//! - **File**: `FileSelectionStore` (JSON file surviving restarts)
//! - **REST**: see `praxis-connectors`
//!
//! # Usage
//!
//! ```rust
//! use praxis_store::{MemorySelectionStore, SelectionStore, SELECTED_CLINIC_KEY};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemorySelectionStore::new();
//!     store.set(SELECTED_CLINIC_KEY, "c1").await.unwrap();
//!
//!     let selected = store.get(SELECTED_CLINIC_KEY).await.unwrap();
//!     assert_eq!(selected.as_deref(), Some("c1"));
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod file;
mod memory;
mod repository;

// Re-exports
pub use error::StoreError;
pub use file::FileSelectionStore;
pub use memory::{MemoryDirectory, MemorySelectionStore};
pub use repository::{
    AdminDirectory, ClinicDirectory, ClinicRecord, SelectionStore, SELECTED_CLINIC_KEY,
};
