use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::record::{kind_of, Record};

/// Property name under which legacy records keep their version inline.
pub const LEGACY_VERSION_FIELD: &str = "schema_version";

/// A persisted record: type name and schema version beside the properties.
///
/// Serialized form:
/// ```text
/// {"type": "human_donor", "schema_version": 12, "properties": {...}}
/// ```
///
/// # Example
///
/// ```
/// use record_upgrade::{Record, VersionedRecord};
///
/// let envelope = VersionedRecord::new("human_donor", 12, Record::new());
/// let bytes = envelope.to_bytes().unwrap();
///
/// assert_eq!(VersionedRecord::peek_version(&bytes).unwrap(), 12);
/// assert_eq!(VersionedRecord::from_bytes(&bytes).unwrap(), envelope);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    /// Record type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Schema version the properties are shaped for.
    pub schema_version: u32,
    /// The record itself.
    pub properties: Record,
}

/// Error reading a versioned record.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Bytes are not a well-formed envelope.
    #[error("malformed record envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Versions start at 1.
    #[error("record envelope declares schema version 0")]
    ZeroVersion,
    /// A legacy record has no usable inline version.
    #[error("legacy record has no usable `schema_version`: {0}")]
    LegacyVersion(String),
}

#[derive(Deserialize)]
struct VersionOnly {
    schema_version: u32,
}

impl VersionedRecord {
    /// Create a new envelope.
    pub fn new(type_name: impl Into<String>, schema_version: u32, properties: Record) -> Self {
        Self {
            type_name: type_name.into(),
            schema_version,
            properties,
        }
    }

    /// Serialize the envelope to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse an envelope from JSON bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, EnvelopeError> {
        let envelope: Self = serde_json::from_slice(data)?;
        if envelope.schema_version == 0 {
            return Err(EnvelopeError::ZeroVersion);
        }
        Ok(envelope)
    }

    /// Read the version without keeping the properties.
    pub fn peek_version(data: &[u8]) -> Result<u32, EnvelopeError> {
        let VersionOnly { schema_version } = serde_json::from_slice(data)?;
        if schema_version == 0 {
            return Err(EnvelopeError::ZeroVersion);
        }
        Ok(schema_version)
    }

    /// Wrap a legacy record that keeps `schema_version` among its properties.
    ///
    /// The inline version (a string such as `"12"` or an integer) is lifted
    /// into the envelope and removed from the properties.
    pub fn from_legacy(
        type_name: impl Into<String>,
        mut properties: Record,
    ) -> Result<Self, EnvelopeError> {
        let version = match properties.remove(LEGACY_VERSION_FIELD) {
            Some(Value::String(s)) => s.trim().parse::<u32>().map_err(|_| {
                EnvelopeError::LegacyVersion(format!("`{s}` is not a version number"))
            })?,
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    EnvelopeError::LegacyVersion(format!("`{n}` is not a version number"))
                })?,
            Some(other) => {
                return Err(EnvelopeError::LegacyVersion(format!(
                    "expected string or number, found {}",
                    kind_of(&other)
                )))
            }
            None => return Err(EnvelopeError::LegacyVersion("field is missing".into())),
        };
        if version == 0 {
            return Err(EnvelopeError::ZeroVersion);
        }
        Ok(Self::new(type_name, version, properties))
    }

    /// The legacy inline form: properties with `schema_version` as a string.
    pub fn into_legacy(self) -> Record {
        let mut properties = self.properties;
        properties.insert(
            LEGACY_VERSION_FIELD.to_string(),
            Value::String(self.schema_version.to_string()),
        );
        properties
    }
}
