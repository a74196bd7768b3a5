//! # donor-upgrades
//!
//! Upgrade steps for donor records.
//!
//! Two record types share most of their history:
//!
//! | Type | Current version |
//! |------|-----------------|
//! | `human_donor` | [`HUMAN_DONOR_VERSION`] |
//! | `rodent_donor` | [`RODENT_DONOR_VERSION`] |
//!
//! Transitions both types went through are declared once in `shared` and
//! registered under each type's own version numbers.
//!
//! # Example
//!
//! ```
//! use donor_upgrades::{catalog, registry};
//! use record_upgrade::{NoContext, Record, Upgrader};
//! use serde_json::json;
//!
//! let upgrader = Upgrader::new(registry().unwrap());
//! let v3: Record = json!({"ethnicity": ["Caucasian"], "sex": "male"})
//!     .as_object()
//!     .cloned()
//!     .unwrap();
//!
//! let out = upgrader
//!     .upgrade_to_current("human_donor", &v3, 3, &catalog(), &NoContext)
//!     .unwrap();
//! assert_eq!(out.record["ethnicities"], json!(["White"]));
//! assert_eq!(out.record["gender"], json!("Male"));
//! ```

mod human;
mod rodent;
mod shared;
pub mod vocab;

use record_upgrade::{SchemaCatalog, StepRegistry, UpgradeError};

/// Record type name of human donors.
pub const HUMAN_DONOR: &str = "human_donor";
/// Record type name of rodent donors.
pub const RODENT_DONOR: &str = "rodent_donor";

/// Current schema version of `human_donor`.
pub const HUMAN_DONOR_VERSION: u32 = 21;
/// Current schema version of `rodent_donor`.
pub const RODENT_DONOR_VERSION: u32 = 13;

/// Release timestamp given to published records that predate the field.
pub const BACKFILLED_RELEASE_TIMESTAMP: &str = "2024-03-06T12:34:56Z";

/// Separator between fragments of the free-text `notes` field.
pub const NOTE_SEPARATOR: &str = "  ";

/// Build a registry holding every donor step.
pub fn registry() -> Result<StepRegistry, UpgradeError> {
    let mut registry = StepRegistry::new();
    shared::register(&mut registry)?;
    human::register(&mut registry)?;
    rodent::register(&mut registry)?;
    Ok(registry)
}

/// Current and oldest supported versions of the donor types.
pub fn catalog() -> SchemaCatalog {
    SchemaCatalog::new()
        .with_schema(HUMAN_DONOR, HUMAN_DONOR_VERSION, 1)
        .with_schema(RODENT_DONOR, RODENT_DONOR_VERSION, 1)
}
