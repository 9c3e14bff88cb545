//! Mapping persistence over a key/value backend.
//!
//! Each `(source, mode)` pair owns one key. [`load`] never fails: a
//! missing, unreadable, or invalid blob falls back to an empty mapping,
//! so the operator can always keep working. [`save`] reports backend
//! failures and leaves the decision about surfacing them to the caller.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use meridian_core::{Mapping, MappingMode};

use crate::blob::{self, BlobError};

/// Prefix of every storage key.
const KEY_PREFIX: &str = "meridian";

/// Errors from a [`KeyValueStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem or other I/O failure.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The mapping could not be serialized.
    #[error(transparent)]
    Serialize(#[from] BlobError),
}

/// Minimal string key/value storage.
///
/// `set` must replace the value atomically: a reader never observes a
/// partially written value.
pub trait KeyValueStore {
    /// Read the value for `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store, used by tests and one-shot runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage key for `source_ref` in `mode`.
///
/// ```
/// use meridian_core::MappingMode;
/// use meridian_export::storage_key;
///
/// assert_eq!(
///     storage_key("assets/front.svg", MappingMode::Governing),
///     "meridian:governing:assets/front.svg"
/// );
/// ```
#[must_use]
pub fn storage_key(source_ref: &str, mode: MappingMode) -> String {
    format!("{KEY_PREFIX}:{}:{source_ref}", mode.key())
}

/// Load the stored mapping for `source_ref` in `mode`.
///
/// Falls back to an empty mapping when nothing is stored, the backend
/// fails, or the blob is malformed or belongs elsewhere.
pub fn load(store: &impl KeyValueStore, source_ref: &str, mode: MappingMode) -> Mapping {
    let key = storage_key(source_ref, mode);
    let text = match store.get(&key) {
        Ok(Some(text)) => text,
        Ok(None) => {
            tracing::debug!(%key, "no stored mapping");
            return Mapping::empty(mode);
        }
        Err(e) => {
            tracing::warn!(%key, error = %e, "failed to read stored mapping");
            return Mapping::empty(mode);
        }
    };
    blob::decode(&text, source_ref, mode).unwrap_or_else(|e| {
        tracing::warn!(%key, error = %e, "discarding stored mapping");
        Mapping::empty(mode)
    })
}

/// Persist `mapping` for `source_ref` under its mode's key.
///
/// # Errors
///
/// Returns [`StoreError`] if encoding or the backend write fails.
pub fn save(
    store: &mut impl KeyValueStore,
    source_ref: &str,
    mapping: &Mapping,
    updated_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let key = storage_key(source_ref, mapping.mode());
    let text = blob::encode(mapping, source_ref, updated_at)?;
    store.set(&key, &text)?;
    tracing::debug!(%key, segments = mapping.total(), "saved mapping");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use meridian_core::{Category, SegmentId};

    use super::*;

    /// Backend that fails every call.
    struct Broken;

    impl KeyValueStore for Broken {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    fn sample() -> Mapping {
        Mapping::empty(MappingMode::Principal).toggle(Category::Heart, &SegmentId::from_index(3))
    }

    #[test]
    fn save_then_load() {
        let mut store = MemoryStore::new();
        save(&mut store, "front.svg", &sample(), Utc::now()).unwrap();
        assert_eq!(load(&store, "front.svg", MappingMode::Principal), sample());
    }

    #[test]
    fn modes_use_separate_keys() {
        let mut store = MemoryStore::new();
        save(&mut store, "front.svg", &sample(), Utc::now()).unwrap();
        let other = load(&store, "front.svg", MappingMode::Governing);
        assert_eq!(other, Mapping::empty(MappingMode::Governing));
    }

    #[test]
    fn missing_key_loads_empty() {
        let store = MemoryStore::new();
        assert!(load(&store, "front.svg", MappingMode::Principal).is_empty());
    }

    #[test]
    fn corrupt_blob_loads_empty() {
        let mut store = MemoryStore::new();
        store
            .set(&storage_key("front.svg", MappingMode::Principal), "{not json")
            .unwrap();
        assert!(load(&store, "front.svg", MappingMode::Principal).is_empty());
    }

    #[test]
    fn blob_for_other_source_loads_empty() {
        let mut store = MemoryStore::new();
        let text = blob::encode(&sample(), "back.svg", Utc::now()).unwrap();
        store
            .set(&storage_key("front.svg", MappingMode::Principal), &text)
            .unwrap();
        assert!(load(&store, "front.svg", MappingMode::Principal).is_empty());
    }

    #[test]
    fn backend_failures() {
        assert!(load(&Broken, "front.svg", MappingMode::Principal).is_empty());
        let err = save(&mut Broken, "front.svg", &sample(), Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
