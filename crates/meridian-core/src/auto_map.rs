//! First-draft mapping by stroke color.
//!
//! Color-coded diagrams usually draw each channel in its own color, so
//! grouping mappable segments by exact stroke string and ranking the
//! groups by size gives the operator something to correct rather than
//! starting from an empty mapping. Labels are assigned by rank, not by
//! meaning, and colors that differ only by rounding are different
//! buckets.

use std::collections::HashMap;

use crate::category::{Category, MappingMode};
use crate::color;
use crate::mapping::Mapping;
use crate::types::{Segment, SegmentId};

/// Fewest non-neutral color buckets for the diagram to count as
/// color-coded by category.
pub const MIN_COLOR_BUCKETS: usize = 8;

/// Errors from [`auto_map_by_color`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutoMapError {
    /// Too few distinct stroke colors to draft a mapping.
    #[error(
        "found {found} distinct stroke colors, need at least {required}; \
         this diagram does not appear to be color-coded by channel, map it manually"
    )]
    TooFewBuckets {
        /// Qualifying buckets found.
        found: usize,
        /// Minimum required.
        required: usize,
    },

    /// The mode is not color-coded one color per category.
    #[error("auto-map is only available for principal channels, not {0}")]
    UnsupportedMode(MappingMode),
}

/// Draft a principal-channel mapping from stroke colors.
///
/// Noise segments are ignored. Buckets are ranked by descending size,
/// ties broken by which color appears first in traversal order; the
/// *i*-th bucket goes to the *i*-th category of `mode`. Extra buckets
/// beyond the category count are dropped.
///
/// # Errors
///
/// Returns [`AutoMapError::UnsupportedMode`] for auxiliary modes and
/// [`AutoMapError::TooFewBuckets`] when fewer than
/// [`MIN_COLOR_BUCKETS`] qualifying colors exist.
pub fn auto_map_by_color(
    segments: &[Segment],
    mode: MappingMode,
    neutral_threshold: u8,
) -> Result<Mapping, AutoMapError> {
    if !mode.supports_auto_map() {
        return Err(AutoMapError::UnsupportedMode(mode));
    }

    // stroke -> (first traversal position, members)
    let mut buckets: HashMap<&str, (usize, Vec<SegmentId>)> = HashMap::new();
    for (position, segment) in segments.iter().filter(|s| !s.is_noise()).enumerate() {
        buckets
            .entry(segment.stroke.as_str())
            .or_insert_with(|| (position, Vec::new()))
            .1
            .push(segment.id.clone());
    }

    let mut ranked: Vec<(usize, Vec<SegmentId>)> = buckets
        .into_iter()
        .filter(|(stroke, _)| !color::is_neutral(stroke, neutral_threshold))
        .map(|(_, bucket)| bucket)
        .collect();

    if ranked.len() < MIN_COLOR_BUCKETS {
        tracing::info!(found = ranked.len(), "too few color buckets for auto-map");
        return Err(AutoMapError::TooFewBuckets {
            found: ranked.len(),
            required: MIN_COLOR_BUCKETS,
        });
    }

    ranked.sort_by(|(pos_a, a), (pos_b, b)| b.len().cmp(&a.len()).then(pos_a.cmp(pos_b)));

    let categories: &[Category] = mode.categories();
    let entries = categories
        .iter()
        .copied()
        .zip(ranked.into_iter().map(|(_, ids)| ids));
    Ok(Mapping::from_entries(mode, entries))
}
