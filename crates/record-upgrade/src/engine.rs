use tracing::{debug, info, warn};

use crate::catalog::SchemaCatalog;
use crate::error::UpgradeError;
use crate::record::Record;
use crate::registry::StepRegistry;
use crate::step::UpgradeContext;

/// One step applied during an upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedStep {
    /// Version the step upgraded from.
    pub source_version: u32,
    /// Name of the step.
    pub name: String,
}

/// Result of a successful upgrade.
#[derive(Debug, Clone, PartialEq)]
pub struct Upgraded {
    /// The record, shaped for `version`.
    pub record: Record,
    /// The version the record is now at (the requested target).
    pub version: u32,
    /// Steps applied, in the order they ran.
    pub applied: Vec<AppliedStep>,
}

impl Upgraded {
    /// Number of steps applied.
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// Whether the record changed version at all.
    pub fn is_upgraded(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Runs chains of registered steps.
///
/// Data at version N that needs to reach version M (N < M) runs the steps
/// registered for N, N+1, …, M-1 in sequence, each exactly once. A missing
/// step anywhere on that path aborts the upgrade before it is reached.
///
/// The upgrader never persists anything and holds no per-call state, so one
/// instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct Upgrader {
    registry: StepRegistry,
}

impl Upgrader {
    /// Create an upgrader over a fully built registry.
    pub fn new(registry: StepRegistry) -> Self {
        Self { registry }
    }

    /// The registry this upgrader walks.
    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Whether a record stored at `stored_version` is behind `current_version`.
    pub fn needs_upgrade(&self, stored_version: u32, current_version: u32) -> bool {
        stored_version < current_version
    }

    /// Upgrade `record` of type `type_name` from `from_version` to `to_version`.
    ///
    /// The caller's record is never modified; steps operate on a private copy.
    /// Equal bounds return the record unchanged with no steps applied.
    pub fn upgrade(
        &self,
        type_name: &str,
        record: &Record,
        from_version: u32,
        to_version: u32,
        ctx: &dyn UpgradeContext,
    ) -> Result<Upgraded, UpgradeError> {
        if from_version == 0 || to_version == 0 || from_version > to_version {
            return Err(UpgradeError::InvalidVersionRange {
                type_name: type_name.to_string(),
                from: from_version,
                to: to_version,
            });
        }

        let mut current = record.clone();
        let mut applied = Vec::new();
        let mut version = from_version;

        while version < to_version {
            let step = self.registry.lookup(type_name, version).ok_or_else(|| {
                warn!(type_name, version, to_version, "upgrade chain has a gap");
                UpgradeError::MissingStep {
                    type_name: type_name.to_string(),
                    version,
                }
            })?;

            current = step.apply(current, ctx).map_err(|source| {
                warn!(type_name, version, step = step.name(), error = %source, "upgrade step failed");
                UpgradeError::StepFailed {
                    type_name: type_name.to_string(),
                    version,
                    step: step.name().to_string(),
                    source,
                }
            })?;

            debug!(
                type_name,
                from = version,
                to = version + 1,
                step = step.name(),
                "applied upgrade step"
            );
            applied.push(AppliedStep {
                source_version: version,
                name: step.name().to_string(),
            });
            version += 1;
        }

        if !applied.is_empty() {
            info!(
                type_name,
                from = from_version,
                to = to_version,
                steps = applied.len(),
                "record upgraded"
            );
        }

        Ok(Upgraded {
            record: current,
            version,
            applied,
        })
    }

    /// Upgrade to the current version `catalog` declares for `type_name`.
    pub fn upgrade_to_current(
        &self,
        type_name: &str,
        record: &Record,
        from_version: u32,
        catalog: &SchemaCatalog,
        ctx: &dyn UpgradeContext,
    ) -> Result<Upgraded, UpgradeError> {
        let to_version = catalog
            .current_version(type_name)
            .ok_or_else(|| UpgradeError::UnknownType(type_name.to_string()))?;
        self.upgrade(type_name, record, from_version, to_version, ctx)
    }
}
