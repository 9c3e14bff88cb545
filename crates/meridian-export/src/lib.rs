//! meridian-export: Pure format serializers (sans-IO)
//!
//! Converts classification and mapping state into the formats other
//! components consume: the versioned JSON blob persisted per diagram
//! and mode, and SVG markup annotated with segment identifiers and
//! click targets for the viewer.

pub mod annotate;
pub mod blob;
pub mod store;

pub use annotate::{Annotated, annotate};
pub use blob::{BLOB_VERSION, BlobError, MappingBlob, decode, encode};
pub use store::{KeyValueStore, MemoryStore, StoreError, load, save, storage_key};
