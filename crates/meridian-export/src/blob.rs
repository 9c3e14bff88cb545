//! Persisted mapping blob.
//!
//! One blob exists per source diagram and mapping mode:
//!
//! ```json
//! {
//!   "version": 1,
//!   "sourceRef": "/assets/meridians-front.svg",
//!   "updatedAt": "2026-01-01T12:00:00.000Z",
//!   "mode": "principal",
//!   "categories": { "LU": ["s0", "s2"], "LI": [] }
//! }
//! ```
//!
//! [`decode`] is the only place a stored value's shape is trusted. It
//! checks `version` before anything else, drops category keys that are
//! not exact codes (`"LU"`, never `"lu"`) along with non-string
//! entries, and rejects the blob outright on a version, source, or mode
//! mismatch. There is no migration: a different version means the
//! mapping starts over.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use meridian_core::{Category, Mapping, MappingMode, SegmentId};

/// Current blob schema version.
pub const BLOB_VERSION: u32 = 1;

/// Serialized form of a [`Mapping`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingBlob {
    /// Schema version, [`BLOB_VERSION`] when written by this crate.
    pub version: u32,
    /// Path of the SVG the mapping was made against.
    pub source_ref: String,
    /// ISO-8601 write time. Informational only.
    pub updated_at: String,
    /// Mapping space.
    pub mode: MappingMode,
    /// Category code -> segment identifiers.
    pub categories: BTreeMap<Category, Vec<SegmentId>>,
}

/// Loosely-typed blob as read back from storage.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlob {
    version: u64,
    source_ref: String,
    mode: MappingMode,
    #[serde(default)]
    categories: BTreeMap<String, Vec<serde_json::Value>>,
}

/// Why a stored or imported blob was rejected.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Not JSON, or missing/mistyped required fields.
    #[error("malformed mapping JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Written by an incompatible schema version.
    #[error("mapping version {found} is not supported (expected {expected})")]
    VersionMismatch {
        /// Version found in the blob.
        found: u64,
        /// Version this build understands.
        expected: u32,
    },

    /// Made against a different diagram.
    #[error("mapping was made for {found:?}, not {expected:?}")]
    SourceMismatch {
        /// `sourceRef` found in the blob.
        found: String,
        /// The currently loaded diagram.
        expected: String,
    },

    /// Belongs to a different mapping space.
    #[error("mapping is for {found} channels, not {expected}")]
    ModeMismatch {
        /// Mode found in the blob.
        found: MappingMode,
        /// The current mode.
        expected: MappingMode,
    },
}

/// Format a timestamp the way the blob stores it (UTC, millisecond
/// precision, `Z` suffix).
#[must_use]
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl MappingBlob {
    /// Snapshot `mapping` for `source_ref`.
    #[must_use]
    pub fn new(mapping: &Mapping, source_ref: &str, updated_at: DateTime<Utc>) -> Self {
        Self {
            version: BLOB_VERSION,
            source_ref: source_ref.to_string(),
            updated_at: timestamp(updated_at),
            mode: mapping.mode(),
            categories: mapping.iter().map(|(c, ids)| (c, ids.to_vec())).collect(),
        }
    }

    /// Rebuild the in-memory mapping.
    #[must_use]
    pub fn into_mapping(self) -> Mapping {
        Mapping::from_entries(self.mode, self.categories)
    }
}

/// Serialize `mapping` as a pretty-printed blob.
///
/// # Errors
///
/// Returns [`BlobError::Json`] if serialization fails.
pub fn encode(
    mapping: &Mapping,
    source_ref: &str,
    updated_at: DateTime<Utc>,
) -> Result<String, BlobError> {
    Ok(serde_json::to_string_pretty(&MappingBlob::new(
        mapping, source_ref, updated_at,
    ))?)
}

/// Parse and validate a blob for `source_ref` in `mode`.
///
/// The returned mapping has only its shape validated; membership is
/// enforced by the reconciler once a classification is available.
///
/// # Errors
///
/// Returns the first [`BlobError`] that applies, checking that the text
/// is JSON, then the version, then the rest of the shape, then source,
/// then mode.
///
/// # Examples
///
/// ```
/// use meridian_core::{Category, MappingMode};
/// use meridian_export::decode;
///
/// let text = r#"{"version":1,"sourceRef":"a.svg","updatedAt":"","mode":"governing",
///               "categories":{"DU":["s1",7,"s2"],"XX":["s3"]}}"#;
/// let mapping = decode(text, "a.svg", MappingMode::Governing).unwrap();
/// assert_eq!(mapping.get(Category::Du).len(), 2);
/// assert!(decode(text, "b.svg", MappingMode::Governing).is_err());
/// ```
pub fn decode(text: &str, source_ref: &str, mode: MappingMode) -> Result<Mapping, BlobError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    // Another version may use another shape, so look at it first.
    if let Some(found) = value.get("version").and_then(serde_json::Value::as_u64)
        && found != u64::from(BLOB_VERSION)
    {
        return Err(BlobError::VersionMismatch {
            found,
            expected: BLOB_VERSION,
        });
    }
    let raw: RawBlob = serde_json::from_value(value)?;
    if raw.source_ref != source_ref {
        return Err(BlobError::SourceMismatch {
            found: raw.source_ref,
            expected: source_ref.to_string(),
        });
    }
    if raw.mode != mode {
        return Err(BlobError::ModeMismatch {
            found: raw.mode,
            expected: mode,
        });
    }

    let entries = raw.categories.into_iter().filter_map(|(code, values)| {
        let Some(category) = Category::ALL.into_iter().find(|c| c.code() == code) else {
            tracing::debug!(%code, "dropping unknown category from stored mapping");
            return None;
        };
        let ids = values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(SegmentId::new(s)),
                _ => None,
            })
            .collect();
        Some((category, ids))
    });
    Ok(Mapping::from_entries(mode, entries))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    fn sample() -> Mapping {
        Mapping::empty(MappingMode::Principal)
            .toggle(Category::Lung, &SegmentId::from_index(0))
            .toggle(Category::Lung, &SegmentId::from_index(2))
            .toggle(Category::Liver, &SegmentId::from_index(5))
    }

    #[test]
    fn encode_writes_schema_fields() {
        let text = encode(&sample(), "front.svg", at()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["sourceRef"], "front.svg");
        assert_eq!(value["updatedAt"], "2026-03-01T09:30:00.000Z");
        assert_eq!(value["mode"], "principal");
        assert_eq!(value["categories"]["LU"], serde_json::json!(["s0", "s2"]));
        assert_eq!(value["categories"]["HT"], serde_json::json!([]));
    }

    #[test]
    fn decode_accepts_what_encode_writes() {
        let text = encode(&sample(), "front.svg", at()).unwrap();
        let decoded = decode(&text, "front.svg", MappingMode::Principal).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn decode_rejects_version_mismatch() {
        let text = r#"{"version":2,"sourceRef":"a.svg","updatedAt":"","mode":"principal","categories":{}}"#;
        let err = decode(text, "a.svg", MappingMode::Principal).unwrap_err();
        assert!(matches!(err, BlobError::VersionMismatch { found: 2, expected: 1 }));
    }

    #[test]
    fn other_version_is_reported_before_its_shape() {
        // A later schema with fields this version doesn't know.
        let text = r#"{"version":2,"diagram":{"path":"a.svg"},"categories":[["LU","s0"]]}"#;
        let err = decode(text, "a.svg", MappingMode::Principal).unwrap_err();
        assert!(matches!(err, BlobError::VersionMismatch { found: 2, expected: 1 }));
    }

    #[test]
    fn category_keys_are_case_sensitive() {
        let text = r#"{"version":1,"sourceRef":"a.svg","updatedAt":"","mode":"principal",
                       "categories":{"LU":["s0"],"lu":["s7"],"Ht":["s3"]}}"#;
        let m = decode(text, "a.svg", MappingMode::Principal).unwrap();
        assert_eq!(m.get(Category::Lung), [SegmentId::from_index(0)]);
        assert!(m.get(Category::Heart).is_empty());
        assert_eq!(m.total(), 1);
    }

    #[test]
    fn decode_rejects_source_mismatch() {
        let text = encode(&sample(), "front.svg", at()).unwrap();
        let err = decode(&text, "back.svg", MappingMode::Principal).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"mapping was made for "front.svg", not "back.svg""#
        );
    }

    #[test]
    fn decode_rejects_mode_mismatch() {
        let text = encode(&sample(), "front.svg", at()).unwrap();
        let err = decode(&text, "front.svg", MappingMode::Extraordinary).unwrap_err();
        assert!(matches!(err, BlobError::ModeMismatch { .. }));
    }

    #[test]
    fn decode_rejects_malformed_json() {
        for text in ["", "{", "[]", r#"{"version":"1"}"#, r#"{"version":1,"sourceRef":"a.svg"}"#] {
            let err = decode(text, "a.svg", MappingMode::Principal).unwrap_err();
            assert!(matches!(err, BlobError::Json(_)), "{text}");
        }
    }

    #[test]
    fn decode_drops_foreign_mode_categories() {
        let text = r#"{"version":1,"sourceRef":"a.svg","updatedAt":"","mode":"governing",
                       "categories":{"REN":["s0"],"LU":["s1"]}}"#;
        let m = decode(text, "a.svg", MappingMode::Governing).unwrap();
        assert_eq!(m.get(Category::Ren), [SegmentId::from_index(0)]);
        assert_eq!(m.total(), 1);
    }

    #[test]
    fn decode_tolerates_missing_categories_object() {
        let text = r#"{"version":1,"sourceRef":"a.svg","mode":"principal"}"#;
        let m = decode(text, "a.svg", MappingMode::Principal).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn blob_round_trips_through_into_mapping() {
        let blob = MappingBlob::new(&sample(), "front.svg", at());
        assert_eq!(blob.version, BLOB_VERSION);
        assert_eq!(blob.into_mapping(), sample());
    }
}
