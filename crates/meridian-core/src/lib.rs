//! meridian-core: Pure segment classification and mapping engine (sans-IO).
//!
//! Turns raw SVG markup into a mapping-ready set of line segments through:
//! parse -> candidate traversal -> style resolution -> eligibility ->
//! neutral-color filtering. Mappings between segment identifiers and
//! channel categories are then edited with toggle semantics, repaired
//! by the reconciler, or drafted by the color-bucketing auto-mapper.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! strings and returns structured data. Persistence formats live in
//! `meridian-export`; filesystem interaction lives in `meridian-io`.

pub mod auto_map;
pub mod category;
pub mod classify;
pub mod color;
pub mod geometry;
pub mod mapping;
pub mod reconcile;
pub mod types;

pub use auto_map::{AutoMapError, MIN_COLOR_BUCKETS, auto_map_by_color};
pub use category::{Category, MappingMode, UnknownCategory, UnknownMode};
pub use classify::{HIT_TARGET_ATTR, SEGMENT_ATTR, classify};
pub use mapping::Mapping;
pub use reconcile::{Reconciled, reconcile};
pub use types::{
    Classification, ClassifierConfig, ClassifyError, Rejection, Segment, SegmentId, SegmentTag,
};
