use std::any::TypeId;
use std::collections::BTreeMap;

use crate::error::{ContextError, StepError};
use crate::record::Record;

/// A single transformation from one schema version to the next.
///
/// The version a step upgrades *from* is the key it is registered under, not
/// a property of the step, so one step can serve several record types at
/// different version numbers.
///
/// Steps must be **deterministic and pure**: the same input record and the
/// same context snapshot must always produce the same output.
pub trait UpgradeStep: Send + Sync + 'static {
    /// Name of the step, used in logs and errors.
    fn name(&self) -> &str;

    /// Identifies the step body. Two registrations are the same step only
    /// when both the name and the body match.
    #[doc(hidden)]
    fn body_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// Transform a record shaped for version `v` into one shaped for `v + 1`.
    fn apply(&self, record: Record, ctx: &dyn UpgradeContext) -> Result<Record, StepError>;
}

/// Read-only external lookups available to step functions.
///
/// Implementations may block (e.g. fetch from a store); a failure surfaces as
/// a [`StepError::Context`] on the step that asked.
pub trait UpgradeContext {
    /// Resolve a reference (such as `"/human_donor/IGVFDO000AAA"`) to the
    /// properties of the referenced record, as stored.
    fn resolve(&self, reference: &str) -> Result<Option<Record>, ContextError>;
}

/// A context that resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl UpgradeContext for NoContext {
    fn resolve(&self, _reference: &str) -> Result<Option<Record>, ContextError> {
        Ok(None)
    }
}

/// A context backed by an in-memory reference table.
#[derive(Debug, Clone, Default)]
pub struct MapContext {
    records: BTreeMap<String, Record>,
}

impl MapContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolvable record.
    pub fn with_record(mut self, reference: impl Into<String>, record: Record) -> Self {
        self.insert(reference, record);
        self
    }

    /// Add a resolvable record.
    pub fn insert(&mut self, reference: impl Into<String>, record: Record) {
        self.records.insert(reference.into(), record);
    }

    /// Number of resolvable references.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no reference resolves.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl UpgradeContext for MapContext {
    fn resolve(&self, reference: &str) -> Result<Option<Record>, ContextError> {
        Ok(self.records.get(reference).cloned())
    }
}

/// Adapts a named function that edits its own working copy of the record.
///
/// # Example
///
/// ```
/// use record_upgrade::{transform, FnStep, NoContext, Record, UpgradeStep};
/// use serde_json::json;
///
/// let step = FnStep::new("drop_legacy", |rec, _ctx| {
///     transform::remove_field(rec, "legacy");
///     Ok(())
/// });
///
/// let rec: Record = json!({"legacy": 1, "kept": 2}).as_object().cloned().unwrap();
/// let out = step.apply(rec, &NoContext).unwrap();
/// assert!(!out.contains_key("legacy"));
/// assert_eq!(step.name(), "drop_legacy");
/// ```
pub struct FnStep<F> {
    name: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&mut Record, &dyn UpgradeContext) -> Result<(), StepError> + Send + Sync,
{
    /// Wrap `func` under the given step name.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> UpgradeStep for FnStep<F>
where
    F: Fn(&mut Record, &dyn UpgradeContext) -> Result<(), StepError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, mut record: Record, ctx: &dyn UpgradeContext) -> Result<Record, StepError> {
        (self.func)(&mut record, ctx)?;
        Ok(record)
    }
}

/// A step that only advances the version counter.
///
/// Used when a schema change affects computed or default behaviour but not
/// the stored shape.
#[derive(Debug, Clone)]
pub struct NoopStep {
    name: String,
}

impl NoopStep {
    /// Create a no-op step with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl UpgradeStep for NoopStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, record: Record, _ctx: &dyn UpgradeContext) -> Result<Record, StepError> {
        Ok(record)
    }
}
