//! # record-store
//!
//! Storage for versioned records. Records are persisted as
//! [`VersionedRecord`](record_upgrade::VersionedRecord) envelopes and brought
//! to the current schema version when they are loaded.
//!
//! ## Quick Start
//!
//! ```
//! use record_store::{MemoryStore, StateStore};
//!
//! let mut store = MemoryStore::new();
//! store.put("human_donor", "IGVFDO000AAA", b"{}").unwrap();
//! let data = store.get("human_donor", "IGVFDO000AAA").unwrap();
//! assert_eq!(data.as_deref(), Some(b"{}".as_slice()));
//! ```

mod db;
mod memory;
mod traits;

pub use db::{DbError, Loaded, RecordDb, RecordDbBuilder, StoreContext, UpgradeReport};
pub use memory::MemoryStore;
pub use traits::StateStore;
