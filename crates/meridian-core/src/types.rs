//! Shared types for the meridian classification engine.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Positional identifier of a classified segment (`"s" + index`).
///
/// Identifiers are only meaningful for the SVG payload they were
/// produced from: any edit to the source diagram renumbers every
/// candidate element that follows it in document order.
///
/// The inner string is unvalidated so that identifiers read back from a
/// persisted mapping can be carried until the reconciler rejects them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(String);

impl SegmentId {
    /// Prefix every well-formed identifier starts with.
    pub const PREFIX: &'static str = "s";

    /// Identifier for the candidate element at `index` in traversal order.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(format!("{}{index}", Self::PREFIX))
    }

    /// Wrap an arbitrary string without validation.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Traversal index encoded in the identifier, if well-formed.
    ///
    /// # Examples
    ///
    /// ```
    /// use meridian_core::SegmentId;
    ///
    /// assert_eq!(SegmentId::new("s12").index(), Some(12));
    /// assert_eq!(SegmentId::new("seg12").index(), None);
    /// assert_eq!(SegmentId::new("s").index(), None);
    /// ```
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        let digits = self.0.strip_prefix(Self::PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Returns `true` if the identifier has the `s<digits>` form.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.index().is_some()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SegmentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for SegmentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Which candidate element a segment was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentTag {
    /// `<path>`
    Path,
    /// `<polyline>`
    Polyline,
    /// `<line>`
    Line,
}

impl SegmentTag {
    /// Map an element's local name to a candidate tag.
    ///
    /// Circles and rects are point markers, not line segments, and are
    /// never candidates.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "path" => Some(Self::Path),
            "polyline" => Some(Self::Polyline),
            "line" => Some(Self::Line),
            _ => None,
        }
    }

    /// The element's local name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Polyline => "polyline",
            Self::Line => "line",
        }
    }
}

/// Why a candidate element was classified as noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rejection {
    /// Stroke is empty or `none`.
    NoStroke,
    /// Fill is painted, so the element is a shape rather than a line.
    Filled,
    /// Stroke width is zero, negative, unparseable, or above the bound.
    StrokeWidth,
    /// Measured length is non-finite or below the minimum.
    TooShort,
    /// Structurally a segment, but the stroke color is neutral.
    NeutralColor,
}

impl Rejection {
    /// Returns `true` for rejections raised by the eligibility predicate
    /// (everything except [`Rejection::NeutralColor`]).
    #[must_use]
    pub const fn is_structural(self) -> bool {
        !matches!(self, Self::NeutralColor)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoStroke => "no stroke",
            Self::Filled => "filled shape",
            Self::StrokeWidth => "stroke width out of range",
            Self::TooShort => "too short",
            Self::NeutralColor => "neutral color",
        })
    }
}

/// One classified candidate element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Positional identifier.
    pub id: SegmentId,
    /// Source element kind.
    pub tag: SegmentTag,
    /// Normalized stroke paint (lowercase, no whitespace). May be empty.
    pub stroke: String,
    /// Resolved stroke width in pixels.
    pub stroke_width: f64,
    /// Measured length, when the geometry could be measured.
    pub length: Option<f64>,
    /// `Some` when the segment is noise.
    pub rejection: Option<Rejection>,
    /// SipHash of the element's drawing data and stroke.
    ///
    /// Survives renumbering, but is not used as identity.
    pub fingerprint: u64,
}

impl Segment {
    /// Returns `true` if the segment can never be mapped.
    #[must_use]
    pub const fn is_noise(&self) -> bool {
        self.rejection.is_some()
    }

    /// Returns `true` if the segment passed the eligibility predicate.
    ///
    /// Eligible segments get a hit target even when their color is
    /// neutral, so the operator can see them without tagging them.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.rejection.is_none_or(|r| !r.is_structural())
    }
}

/// Result of one classification pass, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    segments: Vec<Segment>,
}

impl Classification {
    /// Wrap an ordered list of segments.
    #[must_use]
    pub const fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// All segments in traversal order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Look up a segment by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Segment> {
        // Identifiers are positional, so the index is a direct lookup.
        let index = SegmentId::new(id).index()?;
        self.segments.get(index).filter(|s| s.id.as_str() == id)
    }

    /// Every identifier produced by this pass, noise or not.
    #[must_use]
    pub fn known(&self) -> HashSet<SegmentId> {
        self.segments.iter().map(|s| s.id.clone()).collect()
    }

    /// Identifiers of noise segments.
    #[must_use]
    pub fn noise(&self) -> HashSet<SegmentId> {
        self.segments
            .iter()
            .filter(|s| s.is_noise())
            .map(|s| s.id.clone())
            .collect()
    }

    /// Segments that may appear in a mapping.
    pub fn mappable(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| !s.is_noise())
    }

    /// Number of classified candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if no candidate elements were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Tuning parameters for the segment classifier.
///
/// Two presets cover the diagrams seen in practice: [`LOOSE`](Self::LOOSE)
/// for sparse diagrams with thick strokes and [`STRICT`](Self::STRICT)
/// for dense, high-confidence diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Largest stroke width (pixels) still considered a line.
    pub max_stroke_width: f64,

    /// Shortest measurable length still considered a line.
    pub min_length: f64,

    /// Channel spread (`max(r,g,b) - min(r,g,b)`) below which a stroke
    /// counts as neutral.
    pub neutral_threshold: u8,

    /// Minimum stroke width of the transparent click target appended
    /// after each eligible segment.
    pub hit_target_width: f64,
}

impl ClassifierConfig {
    /// Default upper bound on stroke width.
    pub const DEFAULT_MAX_STROKE_WIDTH: f64 = 20.0;
    /// Default minimum measurable length.
    pub const DEFAULT_MIN_LENGTH: f64 = 10.0;
    /// Default neutral channel spread.
    pub const DEFAULT_NEUTRAL_THRESHOLD: u8 = 20;
    /// Default hit target stroke width.
    pub const DEFAULT_HIT_TARGET_WIDTH: f64 = 14.0;

    /// Preset for sparse diagrams.
    pub const LOOSE: Self = Self {
        max_stroke_width: 20.0,
        min_length: 10.0,
        neutral_threshold: 18,
        hit_target_width: Self::DEFAULT_HIT_TARGET_WIDTH,
    };

    /// Preset for dense diagrams.
    pub const STRICT: Self = Self {
        max_stroke_width: 6.0,
        min_length: 12.0,
        neutral_threshold: 22,
        hit_target_width: Self::DEFAULT_HIT_TARGET_WIDTH,
    };
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_stroke_width: Self::DEFAULT_MAX_STROKE_WIDTH,
            min_length: Self::DEFAULT_MIN_LENGTH,
            neutral_threshold: Self::DEFAULT_NEUTRAL_THRESHOLD,
            hit_target_width: Self::DEFAULT_HIT_TARGET_WIDTH,
        }
    }
}

/// Errors that can occur while classifying an SVG payload.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// The payload is not well-formed XML.
    #[error("failed to parse SVG: {0}")]
    Parse(#[from] roxmltree::Error),

    /// The document element is not `<svg>`.
    #[error("document root is <{0}>, expected <svg>")]
    MissingRoot(String),
}
