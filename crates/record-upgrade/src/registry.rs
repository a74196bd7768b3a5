use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::UpgradeError;
use crate::step::UpgradeStep;

/// One registered transition, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredStep {
    /// Version the step upgrades from.
    pub source_version: u32,
    /// Version the step produces (always `source_version + 1`).
    pub target_version: u32,
    /// Name of the step.
    pub name: String,
}

/// Maps `(type name, source version)` to exactly one step.
///
/// The same step may be registered under several keys (aliasing), which is
/// how a transition shared by sibling record types is expressed. There is no
/// fallback between types: every `(type, version)` pair is registered on its
/// own.
///
/// Registration happens once, before any upgrade runs. After that the
/// registry is only read, so it can be shared freely between threads.
#[derive(Default, Clone)]
pub struct StepRegistry {
    steps: BTreeMap<String, BTreeMap<u32, Arc<dyn UpgradeStep>>>,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `step` as the transition `type_name` v`source_version` → v`source_version + 1`.
    ///
    /// Registering the same step (same name and same body) again under the
    /// same key is a no-op. Anything else under an occupied key is rejected,
    /// including a different body that reuses the name.
    pub fn register(
        &mut self,
        type_name: &str,
        source_version: u32,
        step: Arc<dyn UpgradeStep>,
    ) -> Result<(), UpgradeError> {
        if self.check_slot(type_name, source_version, step.as_ref())? {
            debug!(
                type_name,
                version = source_version,
                step = step.name(),
                "upgrade step already registered"
            );
            return Ok(());
        }
        debug!(
            type_name,
            version = source_version,
            step = step.name(),
            "registered upgrade step"
        );
        self.steps
            .entry(type_name.to_string())
            .or_default()
            .insert(source_version, step);
        Ok(())
    }

    /// Register one step under several `(type name, source version)` keys.
    ///
    /// Every key is checked before any is inserted, so a collision leaves the
    /// registry unchanged.
    pub fn register_alias(
        &mut self,
        step: Arc<dyn UpgradeStep>,
        targets: &[(&str, u32)],
    ) -> Result<(), UpgradeError> {
        for (type_name, source_version) in targets {
            self.check_slot(type_name, *source_version, step.as_ref())?;
        }
        for (type_name, source_version) in targets {
            self.register(type_name, *source_version, Arc::clone(&step))?;
        }
        Ok(())
    }

    /// Returns `Ok(true)` when the slot already holds this very step.
    fn check_slot(
        &self,
        type_name: &str,
        source_version: u32,
        step: &dyn UpgradeStep,
    ) -> Result<bool, UpgradeError> {
        // The target version must fit in a u32 too.
        if source_version == 0 || source_version == u32::MAX {
            return Err(UpgradeError::InvalidVersionRange {
                type_name: type_name.to_string(),
                from: source_version,
                to: source_version.wrapping_add(1),
            });
        }
        match self.lookup(type_name, source_version) {
            Some(existing)
                if existing.name() == step.name() && existing.body_id() == step.body_id() =>
            {
                Ok(true)
            }
            Some(existing) => {
                warn!(
                    type_name,
                    version = source_version,
                    existing = existing.name(),
                    incoming = step.name(),
                    "conflicting upgrade step registration"
                );
                Err(UpgradeError::DuplicateStep {
                    type_name: type_name.to_string(),
                    version: source_version,
                    existing: existing.name().to_string(),
                    incoming: step.name().to_string(),
                })
            }
            None => Ok(false),
        }
    }

    /// The step that upgrades `type_name` from `source_version`, if any.
    pub fn lookup(&self, type_name: &str, source_version: u32) -> Option<&dyn UpgradeStep> {
        self.steps
            .get(type_name)
            .and_then(|by_version| by_version.get(&source_version))
            .map(|step| step.as_ref())
    }

    /// All steps registered for `type_name`, ordered by source version.
    pub fn registered_steps(&self, type_name: &str) -> Vec<RegisteredStep> {
        self.steps
            .get(type_name)
            .map(|by_version| {
                by_version
                    .iter()
                    .map(|(version, step)| RegisteredStep {
                        source_version: *version,
                        target_version: version + 1,
                        name: step.name().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Type names with at least one registered step, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        self.steps.keys().map(String::as_str).collect()
    }

    /// Total number of `(type, version)` registrations.
    pub fn len(&self) -> usize {
        self.steps.values().map(BTreeMap::len).sum()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every step from `from_version` up to `to_version` exists.
    pub fn validate_chain(
        &self,
        type_name: &str,
        from_version: u32,
        to_version: u32,
    ) -> Result<(), UpgradeError> {
        if from_version == 0 || from_version > to_version {
            return Err(UpgradeError::InvalidVersionRange {
                type_name: type_name.to_string(),
                from: from_version,
                to: to_version,
            });
        }
        for version in from_version..to_version {
            if self.lookup(type_name, version).is_none() {
                return Err(UpgradeError::MissingStep {
                    type_name: type_name.to_string(),
                    version,
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (type_name, by_version) in &self.steps {
            let versions: Vec<u32> = by_version.keys().copied().collect();
            map.entry(type_name, &versions);
        }
        map.finish()
    }
}
