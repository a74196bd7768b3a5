//! # record-upgrade
//!
//! Brings a persisted record from the schema version it was written under to
//! the current schema version of its type, one small step at a time.
//!
//! ## How It Works
//!
//! 1. Every stored record carries its **type name** and **schema version**
//!    beside its properties (see [`VersionedRecord`]).
//! 2. Step functions are registered per `(type name, source version)` in a
//!    [`StepRegistry`]. One step may be registered for several types.
//! 3. When a record is loaded behind the current version, the [`Upgrader`]
//!    walks `v → v+1 → … → current`, applying exactly one step per version.
//! 4. The caller decides whether to serve the upgraded record or write it back.
//!
//! ## Key Concepts
//!
//! - **Linear chain**: versions are dense; a missing step is a hard error,
//!   never a silent skip.
//! - **Deterministic**: the same record, range and context always produce the
//!   same result.
//! - **Read-only context**: steps may look up related records through an
//!   [`UpgradeContext`] but never write or trigger further upgrades.
//! - **Explicit registry**: no global state; registries are built once at
//!   startup and handed to the [`Upgrader`].
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use record_upgrade::{transform, FnStep, NoContext, Record, StepRegistry, Upgrader};
//! use serde_json::json;
//!
//! let mut registry = StepRegistry::new();
//! registry
//!     .register(
//!         "sensor",
//!         1,
//!         Arc::new(FnStep::new("sensor_1_2", |rec, _ctx| {
//!             transform::rename_field(rec, "temp", "temperature");
//!             Ok(())
//!         })),
//!     )
//!     .unwrap();
//!
//! let upgrader = Upgrader::new(registry);
//! let record: Record = json!({"temp": 22.5}).as_object().cloned().unwrap();
//! let upgraded = upgrader.upgrade("sensor", &record, 1, 2, &NoContext).unwrap();
//!
//! assert_eq!(upgraded.version, 2);
//! assert_eq!(upgraded.applied_count(), 1);
//! assert_eq!(upgraded.record["temperature"], json!(22.5));
//! ```

mod catalog;
mod engine;
mod envelope;
mod error;
mod record;
mod registry;
mod step;
pub mod transform;

pub use catalog::{
    validate_catalog, CatalogError, CatalogIssue, SchemaCatalog, SchemaEntry, UpgradeConfig,
};
pub use engine::{AppliedStep, Upgraded, Upgrader};
pub use envelope::{EnvelopeError, VersionedRecord, LEGACY_VERSION_FIELD};
pub use error::{ContextError, StepError, UpgradeError};
pub use record::{get_array, get_str, kind_of, Record};
pub use registry::{RegisteredStep, StepRegistry};
pub use step::{FnStep, MapContext, NoContext, NoopStep, UpgradeContext, UpgradeStep};

// Re-export the step annotation when the `macros` feature is enabled.
#[cfg(feature = "macros")]
pub use record_upgrade_macros::upgrade_step;
