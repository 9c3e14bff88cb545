//! Segment classification: decide which drawn elements are meridian
//! segments and assign each a positional identifier.
//!
//! Candidates are `<path>`, `<polyline>` and `<line>` elements in
//! document order. Every candidate is *known* and numbered; only those
//! passing the eligibility predicate with a non-neutral stroke are
//! mappable. Hit targets appended by the annotator (marked with
//! [`HIT_TARGET_ATTR`]) are never candidates, so classifying an
//! annotated document yields the same identifiers as the raw one.

use std::hash::Hasher;

use roxmltree::{Document, Node, ParsingOptions};
use siphasher::sip::SipHasher13;

use crate::color;
use crate::geometry;
use crate::types::{
    Classification, ClassifierConfig, ClassifyError, Rejection, Segment, SegmentId, SegmentTag,
};

/// Attribute carrying a segment's identifier on the original element.
pub const SEGMENT_ATTR: &str = "data-seg";

/// Attribute marking a transparent hit-target duplicate.
pub const HIT_TARGET_ATTR: &str = "data-hit";

/// Fill values that still count as an unfilled line.
const UNFILLED: [&str; 3] = ["", "none", "transparent"];

/// Parse SVG text into a document tree.
///
/// DTDs are allowed since exported diagrams commonly carry an SVG 1.1
/// doctype.
///
/// # Errors
///
/// Returns [`ClassifyError::Parse`] if the text is not well-formed XML
/// and [`ClassifyError::MissingRoot`] if the root element is not `<svg>`.
pub fn parse_document(svg_text: &str) -> Result<Document<'_>, ClassifyError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(svg_text, options)?;
    let root = doc.root_element().tag_name().name();
    if root != "svg" {
        return Err(ClassifyError::MissingRoot(root.to_string()));
    }
    Ok(doc)
}

/// Candidate elements of `doc` in document order, excluding hit targets.
pub fn candidates<'a, 'input>(
    doc: &'a Document<'input>,
) -> impl Iterator<Item = (SegmentTag, Node<'a, 'input>)> {
    doc.descendants()
        .filter(|n| n.is_element() && !n.has_attribute(HIT_TARGET_ATTR))
        .filter_map(|n| SegmentTag::from_name(n.tag_name().name()).map(|tag| (tag, n)))
}

/// Classify every candidate element in `svg_text`.
///
/// # Errors
///
/// See [`parse_document`].
///
/// # Examples
///
/// ```
/// use meridian_core::{ClassifierConfig, Rejection, classify};
///
/// let svg = r##"<svg xmlns="http://www.w3.org/2000/svg">
///   <path d="M0,0 L50,0" stroke="#e11" fill="none"/>
///   <circle cx="5" cy="5" r="2" stroke="#e11"/>
///   <line x1="0" y1="0" x2="2" y2="0" stroke="#e11"/>
/// </svg>"##;
/// let c = classify(svg, &ClassifierConfig::default()).unwrap();
/// assert_eq!(c.len(), 2);
/// assert!(!c.segments()[0].is_noise());
/// assert_eq!(c.segments()[1].rejection, Some(Rejection::TooShort));
/// ```
pub fn classify(svg_text: &str, config: &ClassifierConfig) -> Result<Classification, ClassifyError> {
    let doc = parse_document(svg_text)?;
    Ok(classify_document(&doc, config))
}

/// Classify an already-parsed document.
#[must_use]
pub fn classify_document(doc: &Document<'_>, config: &ClassifierConfig) -> Classification {
    let segments: Vec<Segment> = candidates(doc)
        .enumerate()
        .map(|(index, (tag, node))| classify_element(SegmentId::from_index(index), tag, node, config))
        .collect();

    let classification = Classification::new(segments);
    tracing::debug!(
        candidates = classification.len(),
        mappable = classification.mappable().count(),
        "classified svg"
    );
    classification
}

/// Resolve an inherited presentation property: the element's own
/// declaration, else the nearest ancestor's. `inherit` defers upward.
fn resolved(node: Node<'_, '_>, property: &str) -> Option<String> {
    node.ancestors()
        .filter(Node::is_element)
        .filter_map(|n| color::declared_property(n.attribute(property), n.attribute("style"), property))
        .find(|value| value != "inherit")
}

/// Measured length of the element, `None` when not measurable.
fn measure(tag: SegmentTag, node: Node<'_, '_>) -> Option<f64> {
    match tag {
        SegmentTag::Path => geometry::path_length(node.attribute("d")?),
        SegmentTag::Polyline => geometry::polyline_length(node.attribute("points")?),
        SegmentTag::Line => geometry::line_length(
            node.attribute("x1"),
            node.attribute("y1"),
            node.attribute("x2"),
            node.attribute("y2"),
        ),
    }
}

/// Drawing data that identifies an element's shape independent of its
/// position in the document.
#[must_use]
pub fn geometry_attributes(tag: SegmentTag) -> &'static [&'static str] {
    match tag {
        SegmentTag::Path => &["d"],
        SegmentTag::Polyline => &["points"],
        SegmentTag::Line => &["x1", "y1", "x2", "y2"],
    }
}

fn fingerprint(tag: SegmentTag, node: Node<'_, '_>, stroke: &str) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write(tag.name().as_bytes());
    for name in geometry_attributes(tag) {
        hasher.write_u8(0);
        hasher.write(node.attribute(*name).unwrap_or_default().as_bytes());
    }
    hasher.write_u8(0);
    hasher.write(stroke.as_bytes());
    hasher.finish()
}

/// Eligibility predicate, short-circuiting in a fixed order: stroke,
/// fill, stroke width, length.
fn looks_like_segment(
    stroke: &str,
    fill: &str,
    stroke_width: Option<f64>,
    length: Option<f64>,
    config: &ClassifierConfig,
) -> Result<(), Rejection> {
    if stroke.is_empty() || stroke == "none" {
        return Err(Rejection::NoStroke);
    }
    if !UNFILLED.contains(&fill) {
        return Err(Rejection::Filled);
    }
    match stroke_width {
        Some(w) if w.is_finite() && w > 0.0 && w <= config.max_stroke_width => {}
        _ => return Err(Rejection::StrokeWidth),
    }
    if let Some(len) = length
        && (!len.is_finite() || len < config.min_length)
    {
        return Err(Rejection::TooShort);
    }
    Ok(())
}

fn classify_element(
    id: SegmentId,
    tag: SegmentTag,
    node: Node<'_, '_>,
    config: &ClassifierConfig,
) -> Segment {
    let stroke = resolved(node, "stroke").unwrap_or_default();
    let fill = resolved(node, "fill").unwrap_or_default();
    // SVG's initial stroke-width is 1.
    let stroke_width = resolved(node, "stroke-width").map_or(Some(1.0), |w| geometry::parse_length(&w));
    let length = measure(tag, node);

    let rejection = looks_like_segment(&stroke, &fill, stroke_width, length, config)
        .err()
        .or_else(|| {
            color::is_neutral(&stroke, config.neutral_threshold).then_some(Rejection::NeutralColor)
        });

    Segment {
        id,
        tag,
        fingerprint: fingerprint(tag, node, &stroke),
        stroke,
        stroke_width: stroke_width.unwrap_or(0.0),
        length,
        rejection,
    }
}
