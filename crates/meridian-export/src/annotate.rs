//! Source annotation for interactive display.
//!
//! Rewrites the SVG text so a viewer can map clicks back to segments:
//!
//! - every candidate element gets `data-seg="sN"` right after its tag
//!   name;
//! - every eligible segment is followed by a transparent duplicate of
//!   its geometry, marked `data-hit="sN"`, with a stroke wide enough to
//!   be easy to click.
//!
//! Edits are spliced into the original text by byte offset, so
//! everything the annotator doesn't touch (comments, doctype,
//! formatting, unknown elements) survives verbatim. Identifiers and hit
//! targets left by an earlier run are rewritten from the current
//! classification, so annotating an edited diagram renumbers it and
//! annotating an unedited one is a no-op.

use std::ops::Range;

use svg::node::Node;
use svg::node::element::Element;

use meridian_core::classify::{candidates, classify_document, geometry_attributes, parse_document};
use meridian_core::{
    Classification, ClassifierConfig, ClassifyError, HIT_TARGET_ATTR, SEGMENT_ATTR, Segment,
    SegmentTag,
};

/// Output of [`annotate`].
#[derive(Debug, Clone)]
pub struct Annotated {
    /// Classification of the input document.
    pub classification: Classification,
    /// The annotated SVG text.
    pub svg: String,
}

/// Replace the bytes in `range` with `text`. An empty range inserts.
type Edit = (Range<usize>, String);

/// Classify `svg_text` and return it with identifier attributes and hit
/// targets spliced in.
///
/// # Errors
///
/// Returns [`ClassifyError`] if the text is not an SVG document.
///
/// # Examples
///
/// ```
/// use meridian_core::ClassifierConfig;
/// use meridian_export::annotate;
///
/// let svg = r##"<svg xmlns="http://www.w3.org/2000/svg"><path d="M0,0 L50,0" stroke="#e11"/></svg>"##;
/// let out = annotate(svg, &ClassifierConfig::default()).unwrap();
/// assert!(out.svg.contains(r#"<path data-seg="s0" d="M0,0 L50,0""#));
/// assert!(out.svg.contains(r#"data-hit="s0""#));
/// ```
pub fn annotate(svg_text: &str, config: &ClassifierConfig) -> Result<Annotated, ClassifyError> {
    let doc = parse_document(svg_text)?;
    let classification = classify_document(&doc, config);

    // Old hit targets are dropped and rebuilt below.
    let mut edits: Vec<Edit> = doc
        .descendants()
        .filter(|n| n.is_element() && n.has_attribute(HIT_TARGET_ATTR))
        .map(|n| (n.range(), String::new()))
        .collect();
    let stale_hits = edits.len();

    for ((tag, node), segment) in candidates(&doc).zip(classification.segments()) {
        let range = node.range();
        let name_end = tag_name_end(svg_text, range.start);
        let qualified_name = &svg_text[range.start + 1..name_end];

        match node.attributes().find(|a| a.name() == SEGMENT_ATTR) {
            None => edits.push((
                name_end..name_end,
                format!(r#" {SEGMENT_ATTR}="{}""#, segment.id),
            )),
            Some(existing) if existing.value() != segment.id.as_str() => {
                tracing::debug!(
                    existing = existing.value(),
                    id = %segment.id,
                    "renumbering segment"
                );
                edits.push((existing.range_value(), segment.id.to_string()));
            }
            Some(_) => {}
        }

        if segment.is_eligible() {
            let hit = hit_target(qualified_name, tag, node, segment, config);
            edits.push((range.end..range.end, hit.to_string()));
        }
    }

    tracing::debug!(edits = edits.len(), stale_hits, "annotated svg");
    Ok(Annotated {
        svg: splice(svg_text, edits),
        classification,
    })
}

/// Byte offset just past the qualified tag name of the element whose
/// `<` is at `start`.
fn tag_name_end(text: &str, start: usize) -> usize {
    let name_start = start + 1;
    text[name_start..]
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .map_or(text.len(), |offset| name_start + offset)
}

/// Transparent, widened copy of a segment's geometry.
fn hit_target(
    name: &str,
    tag: SegmentTag,
    node: roxmltree::Node<'_, '_>,
    segment: &Segment,
    config: &ClassifierConfig,
) -> Element {
    let mut element = Element::new(name);
    element.assign(HIT_TARGET_ATTR, segment.id.as_str());
    for attr in geometry_attributes(tag).iter().chain(&["transform"]) {
        if let Some(value) = node.attribute(*attr) {
            element.assign(*attr, value);
        }
    }
    element.assign("stroke", "transparent");
    element.assign("fill", "none");
    element.assign(
        "stroke-width",
        config.hit_target_width.max(segment.stroke_width),
    );
    element.assign("pointer-events", "stroke");
    element
}

/// Apply edits to `text`. Insertions sort before a replacement starting
/// at the same offset; edits with equal ranges keep their relative
/// order. An edit overlapping an earlier one is skipped.
fn splice(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|(range, _)| (range.start, range.end));
    let extra: usize = edits.iter().map(|(_, s)| s.len()).sum();
    let mut out = String::with_capacity(text.len() + extra);
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor {
            tracing::debug!(?range, "skipping overlapping edit");
            continue;
        }
        out.push_str(&text[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}
