use thiserror::Error;

/// Failure of a read-only lookup made through an [`UpgradeContext`](crate::UpgradeContext).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContextError {
    /// The lookup source cannot be reached right now.
    #[error("lookup unavailable: {0}")]
    Unavailable(String),
    /// The lookup source answered with an error.
    #[error("lookup backend error: {0}")]
    Backend(String),
}

/// Failure inside a single step function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    /// A field is present but not of the kind this version's shape requires.
    #[error("field `{field}` expected {expected}, found {found}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    /// An auxiliary-context lookup failed.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// Any other violation of the step's input shape.
    #[error("{0}")]
    Invalid(String),
}

/// Error from registering steps or running an upgrade.
///
/// Every variant aborts the whole call; there is no partial success.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpgradeError {
    /// Two different steps claim the same `(type, source version)`.
    #[error("duplicate upgrade step for {type_name} v{version}: `{existing}` already registered, refusing `{incoming}`")]
    DuplicateStep {
        type_name: String,
        version: u32,
        existing: String,
        incoming: String,
    },
    /// The walk needs a step that was never registered.
    #[error("no upgrade step registered for {type_name} v{version}")]
    MissingStep { type_name: String, version: u32 },
    /// The requested range runs backwards or includes version 0.
    #[error("invalid version range for {type_name}: v{from} to v{to}")]
    InvalidVersionRange {
        type_name: String,
        from: u32,
        to: u32,
    },
    /// A step function failed; the offending step is attached.
    #[error("upgrade step `{step}` failed for {type_name} v{version}: {source}")]
    StepFailed {
        type_name: String,
        version: u32,
        step: String,
        #[source]
        source: StepError,
    },
    /// The schema catalog has no entry for this type.
    #[error("unknown record type `{0}`")]
    UnknownType(String),
}

impl UpgradeError {
    /// The record type the error is attributed to.
    pub fn type_name(&self) -> &str {
        match self {
            Self::DuplicateStep { type_name, .. }
            | Self::MissingStep { type_name, .. }
            | Self::InvalidVersionRange { type_name, .. }
            | Self::StepFailed { type_name, .. } => type_name,
            Self::UnknownType(type_name) => type_name,
        }
    }

    /// The version the walk was stuck at, when there is one.
    pub fn version(&self) -> Option<u32> {
        match self {
            Self::DuplicateStep { version, .. }
            | Self::MissingStep { version, .. }
            | Self::StepFailed { version, .. } => Some(*version),
            Self::InvalidVersionRange { from, .. } => Some(*from),
            Self::UnknownType(_) => None,
        }
    }

    /// Whether this error comes from building a registry rather than from an upgrade.
    pub fn is_registration_error(&self) -> bool {
        matches!(self, Self::DuplicateStep { .. })
    }
}
