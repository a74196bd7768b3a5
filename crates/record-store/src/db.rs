//! High-level record database with upgrade on load.
//!
//! `RecordDb` wraps a storage backend. Records are written as
//! [`VersionedRecord`] envelopes stamped with the current schema version of
//! their type; records found behind that version are upgraded when read.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use record_store::{MemoryStore, RecordDb};
//! use record_upgrade::{transform, FnStep, Record, SchemaCatalog, StepRegistry, Upgrader};
//!
//! let mut registry = StepRegistry::new();
//! registry
//!     .register("sensor", 1, Arc::new(FnStep::new("sensor_1_2", |rec, _ctx| {
//!         transform::rename_field(rec, "temp", "temperature");
//!         Ok(())
//!     })))
//!     .unwrap();
//!
//! let catalog = SchemaCatalog::new().with_schema("sensor", 2, 1);
//! let mut db = RecordDb::builder(MemoryStore::new(), Upgrader::new(registry), catalog).build();
//!
//! let mut rec = Record::new();
//! rec.insert("temperature".into(), 22.5.into());
//! db.save("sensor", "s1", &rec).unwrap();
//!
//! let loaded = db.load("sensor", "s1").unwrap().unwrap();
//! assert_eq!(loaded.stored_version, 2);
//! assert!(loaded.applied.is_empty());
//! ```

use std::fmt;

use record_upgrade::{
    AppliedStep, ContextError, EnvelopeError, Record, SchemaCatalog, UpgradeConfig,
    UpgradeContext, UpgradeError, Upgrader, VersionedRecord,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::traits::StateStore;

/// Error type for `RecordDb` operations.
#[derive(Debug, Error)]
pub enum DbError<E: fmt::Debug + fmt::Display> {
    /// Error from the underlying storage backend.
    #[error("store error: {0}")]
    Store(E),
    /// Stored bytes are not a valid envelope.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// Upgrading the stored record failed.
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),
    /// The catalog has no entry for the type.
    #[error("unknown record type `{0}`")]
    UnknownType(String),
    /// The envelope under a type's namespace names a different type.
    #[error("stored record is of type `{found}`, expected `{expected}`")]
    TypeMismatch { expected: String, found: String },
    /// The stored version is older than the oldest the catalog still supports.
    #[error("{type_name} v{version} is older than the oldest supported version {min_version}")]
    Unsupported {
        type_name: String,
        version: u32,
        min_version: u32,
    },
}

/// A loaded record, shaped for the current version of its type.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// The record properties.
    pub record: Record,
    /// Version the record was stored at before this load.
    pub stored_version: u32,
    /// Version the record is now at.
    pub version: u32,
    /// Steps applied during this load, empty when it was already current.
    pub applied: Vec<AppliedStep>,
}

impl Loaded {
    /// Whether this load upgraded the record.
    pub fn was_upgraded(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Outcome of [`RecordDb::upgrade_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeReport {
    /// Records read.
    pub scanned: usize,
    /// Records that were behind and have been rewritten.
    pub upgraded: usize,
}

/// Resolves `"/{type}/{key}"` references against a store.
///
/// Referenced records are returned as stored, without upgrading them, so a
/// step never triggers a nested upgrade.
pub struct StoreContext<'a, S: StateStore> {
    store: &'a S,
}

impl<'a, S: StateStore> StoreContext<'a, S> {
    /// Create a context reading from `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: StateStore> UpgradeContext for StoreContext<'_, S> {
    fn resolve(&self, reference: &str) -> Result<Option<Record>, ContextError> {
        let path = reference.trim_matches('/');
        let Some((type_name, key)) = path.split_once('/') else {
            return Err(ContextError::Unavailable(format!(
                "`{reference}` is not a `/type/key` reference"
            )));
        };
        let raw = self
            .store
            .get(type_name, key)
            .map_err(|e| ContextError::Backend(e.to_string()))?;
        match raw {
            Some(data) => {
                let envelope = VersionedRecord::from_bytes(&data)
                    .map_err(|e| ContextError::Backend(e.to_string()))?;
                Ok(Some(envelope.properties))
            }
            None => Ok(None),
        }
    }
}

/// Record database with upgrade on load.
///
/// Wraps any [`StateStore`] backend; the record type name is used as the
/// storage namespace.
pub struct RecordDb<S: StateStore> {
    store: S,
    upgrader: Upgrader,
    catalog: SchemaCatalog,
    config: UpgradeConfig,
}

/// Builder for constructing a `RecordDb`.
pub struct RecordDbBuilder<S: StateStore> {
    store: S,
    upgrader: Upgrader,
    catalog: SchemaCatalog,
    config: UpgradeConfig,
}

impl<S: StateStore> RecordDbBuilder<S> {
    /// Override the configuration taken from the catalog.
    pub fn config(mut self, config: UpgradeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set whether upgraded records are written back when loaded.
    pub fn write_back_on_read(mut self, enabled: bool) -> Self {
        self.config.write_back_on_read = enabled;
        self
    }

    /// Build the `RecordDb`.
    pub fn build(self) -> RecordDb<S> {
        RecordDb {
            store: self.store,
            upgrader: self.upgrader,
            catalog: self.catalog,
            config: self.config,
        }
    }
}

impl<S: StateStore> RecordDb<S> {
    /// Create a builder. The configuration defaults to the catalog's
    /// `[upgrade]` section.
    pub fn builder(store: S, upgrader: Upgrader, catalog: SchemaCatalog) -> RecordDbBuilder<S> {
        let config = catalog.upgrade.clone();
        RecordDbBuilder {
            store,
            upgrader,
            catalog,
            config,
        }
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a mutable reference to the underlying store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The upgrader used on load.
    pub fn upgrader(&self) -> &Upgrader {
        &self.upgrader
    }

    /// The schema catalog.
    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// The active configuration.
    pub fn config(&self) -> &UpgradeConfig {
        &self.config
    }

    fn current_version(&self, type_name: &str) -> Result<u32, DbError<S::Error>> {
        self.catalog
            .current_version(type_name)
            .ok_or_else(|| DbError::UnknownType(type_name.to_string()))
    }

    /// Save a record at the current version of its type.
    ///
    /// Returns the version the record was stamped with.
    pub fn save(
        &mut self,
        type_name: &str,
        key: &str,
        record: &Record,
    ) -> Result<u32, DbError<S::Error>> {
        let version = self.current_version(type_name)?;
        let envelope = VersionedRecord::new(type_name, version, record.clone());
        self.put_envelope(key, &envelope)?;
        Ok(version)
    }

    /// Store an envelope as-is, at whatever version it declares.
    pub fn put_envelope(
        &mut self,
        key: &str,
        envelope: &VersionedRecord,
    ) -> Result<(), DbError<S::Error>> {
        let bytes = envelope.to_bytes()?;
        self.store
            .put(&envelope.type_name, key, &bytes)
            .map_err(DbError::Store)
    }

    /// Load a record, upgrading it to the current version of its type.
    ///
    /// When the stored record is behind and `write_back_on_read` is set, the
    /// upgraded envelope replaces the stored one in a single `put`.
    pub fn load(&mut self, type_name: &str, key: &str) -> Result<Option<Loaded>, DbError<S::Error>> {
        let write_back = self.config.write_back_on_read;
        self.load_inner(type_name, key, write_back)
    }

    fn load_inner(
        &mut self,
        type_name: &str,
        key: &str,
        write_back: bool,
    ) -> Result<Option<Loaded>, DbError<S::Error>> {
        let raw = match self.store.get(type_name, key).map_err(DbError::Store)? {
            Some(data) => data,
            None => return Ok(None),
        };
        let envelope = VersionedRecord::from_bytes(&raw)?;
        if envelope.type_name != type_name {
            return Err(DbError::TypeMismatch {
                expected: type_name.to_string(),
                found: envelope.type_name,
            });
        }

        let current = self.current_version(type_name)?;
        let stored_version = envelope.schema_version;
        if stored_version == current {
            return Ok(Some(Loaded {
                record: envelope.properties,
                stored_version,
                version: current,
                applied: Vec::new(),
            }));
        }
        if let Some(min_version) = self.catalog.min_version(type_name) {
            if stored_version < min_version {
                return Err(DbError::Unsupported {
                    type_name: type_name.to_string(),
                    version: stored_version,
                    min_version,
                });
            }
        }

        let ctx = StoreContext::new(&self.store);
        let upgraded = self.upgrader.upgrade(
            type_name,
            &envelope.properties,
            stored_version,
            current,
            &ctx,
        )?;

        if write_back {
            let updated = VersionedRecord::new(type_name, upgraded.version, upgraded.record.clone());
            self.put_envelope(key, &updated)?;
            info!(
                type_name,
                key,
                from = stored_version,
                to = upgraded.version,
                "wrote back upgraded record"
            );
        } else {
            debug!(type_name, key, "upgraded record served without write-back");
        }

        Ok(Some(Loaded {
            record: upgraded.record,
            stored_version,
            version: upgraded.version,
            applied: upgraded.applied,
        }))
    }

    /// Upgrade every stored record of a type and write the results back,
    /// regardless of `write_back_on_read`.
    ///
    /// Stops at the first failure; records rewritten before it stay rewritten.
    pub fn upgrade_all(&mut self, type_name: &str) -> Result<UpgradeReport, DbError<S::Error>> {
        let keys = self.list_keys(type_name)?;
        let mut report = UpgradeReport::default();
        for key in &keys {
            if let Some(loaded) = self.load_inner(type_name, key, true)? {
                report.scanned += 1;
                if loaded.was_upgraded() {
                    report.upgraded += 1;
                }
            }
        }
        info!(
            type_name,
            scanned = report.scanned,
            upgraded = report.upgraded,
            "batch upgrade finished"
        );
        Ok(report)
    }

    /// Read the stored version of a record without upgrading it.
    pub fn stored_version(
        &self,
        type_name: &str,
        key: &str,
    ) -> Result<Option<u32>, DbError<S::Error>> {
        match self.store.get(type_name, key).map_err(DbError::Store)? {
            Some(data) => Ok(Some(VersionedRecord::peek_version(&data)?)),
            None => Ok(None),
        }
    }

    /// Delete a record.
    pub fn delete(&mut self, type_name: &str, key: &str) -> Result<(), DbError<S::Error>> {
        self.store.delete(type_name, key).map_err(DbError::Store)
    }

    /// List the keys stored for a type.
    pub fn list_keys(&self, type_name: &str) -> Result<Vec<String>, DbError<S::Error>> {
        self.store.list_keys(type_name).map_err(DbError::Store)
    }

    /// Check if a record exists.
    pub fn exists(&self, type_name: &str, key: &str) -> Result<bool, DbError<S::Error>> {
        self.store.exists(type_name, key).map_err(DbError::Store)
    }
}
