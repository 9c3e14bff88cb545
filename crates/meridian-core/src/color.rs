//! Stroke color parsing and neutral-color heuristics.
//!
//! Meridian diagrams draw channels in saturated colors and everything
//! else (body outline, labels, leader lines) in black or gray. A stroke
//! is *neutral* when its RGB channels are nearly equal. Colors in
//! formats this module does not understand are never neutral, so a
//! parse failure can only ever keep a segment mappable, never hide it.

/// An sRGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// `max(r, g, b) - min(r, g, b)`.
    #[must_use]
    pub fn spread(self) -> u8 {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        max - min
    }
}

/// Lowercase and strip all whitespace.
///
/// # Examples
///
/// ```
/// use meridian_core::color::normalize;
///
/// assert_eq!(normalize(" RGB(255, 0, 0) "), "rgb(255,0,0)");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Find `property` in an inline `style` declaration list.
///
/// Later declarations win, matching CSS cascade order within one
/// `style` attribute. Any `!important` suffix is dropped.
#[must_use]
pub fn style_property<'a>(style: &'a str, property: &str) -> Option<&'a str> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case(property))
        .map(|(_, value)| {
            let value = value.trim();
            value
                .strip_suffix("!important")
                .map_or(value, str::trim_end)
        })
        .next_back()
}

/// Read a presentation property from an element's attribute, falling
/// back to its inline `style`.
#[must_use]
pub fn declared_property(attribute: Option<&str>, style: Option<&str>, property: &str) -> Option<String> {
    attribute
        .or_else(|| style.and_then(|s| style_property(s, property)))
        .map(normalize)
}

/// Read an element's stroke paint: the `stroke` attribute, then the
/// `stroke:` declaration in `style`, else the empty string.
///
/// # Examples
///
/// ```
/// use meridian_core::color::parse_stroke;
///
/// assert_eq!(parse_stroke(Some("#FF0000"), None), "#ff0000");
/// assert_eq!(parse_stroke(None, Some("fill:none; stroke: Blue")), "blue");
/// assert_eq!(parse_stroke(None, None), "");
/// ```
#[must_use]
pub fn parse_stroke(attribute: Option<&str>, style: Option<&str>) -> String {
    declared_property(attribute, style, "stroke").unwrap_or_default()
}

/// Decompose a normalized color into RGB.
///
/// Understands `black`, `#rgb`, `#rrggbb`, `rgb(r,g,b)` and
/// `rgba(r,g,b,a)`. Channel values outside 0..=255 are clamped.
#[must_use]
pub fn parse_rgb(color: &str) -> Option<Rgb> {
    if color == "black" {
        return Some(Rgb { r: 0, g: 0, b: 0 });
    }
    if let Some(hex) = color.strip_prefix('#') {
        return parse_hex(hex);
    }
    let args = color
        .strip_prefix("rgba(")
        .or_else(|| color.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let mut channels = args.split(',').map(parse_channel);
    let rgb = Rgb {
        r: channels.next()??,
        g: channels.next()??,
        b: channels.next()??,
    };
    // Optional alpha is accepted but ignored; more arguments are not.
    match (channels.next(), channels.next()) {
        (None | Some(_), None) => Some(rgb),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok();
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgb {
            r: nibble(0)? * 17,
            g: nibble(1)? * 17,
            b: nibble(2)? * 17,
        }),
        6 => Some(Rgb {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
        }),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_channel(raw: &str) -> Option<u8> {
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, 255.0) as u8)
}

/// Returns `true` if `color` carries no category information.
///
/// Empty, black, and near-gray strokes are neutral. `color` should
/// already be normalized (see [`normalize`]).
///
/// # Examples
///
/// ```
/// use meridian_core::color::is_neutral;
///
/// assert!(is_neutral("#000000", 20));
/// assert!(is_neutral("rgb(10,10,14)", 20));
/// assert!(!is_neutral("rgb(255,0,0)", 20));
/// assert!(!is_neutral("hsl(0,0%,50%)", 20));
/// ```
#[must_use]
pub fn is_neutral(color: &str, threshold: u8) -> bool {
    if color.is_empty() || matches!(color, "black" | "#000" | "#000000") {
        return true;
    }
    parse_rgb(color).is_some_and(|rgb| rgb.spread() < threshold)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const THRESHOLD: u8 = 20;

    // --- normalize / style parsing ---

    #[test]
    fn style_property_finds_declaration() {
        let style = "fill:none;stroke:#F00;stroke-width:2";
        assert_eq!(style_property(style, "stroke"), Some("#F00"));
        assert_eq!(style_property(style, "stroke-width"), Some("2"));
        assert_eq!(style_property(style, "opacity"), None);
    }

    #[test]
    fn style_property_last_declaration_wins() {
        assert_eq!(style_property("stroke:red;stroke:blue", "stroke"), Some("blue"));
    }

    #[test]
    fn style_property_drops_important() {
        assert_eq!(style_property("stroke: red !important", "stroke"), Some("red"));
    }

    #[test]
    fn parse_stroke_prefers_attribute() {
        assert_eq!(parse_stroke(Some("red"), Some("stroke:blue")), "red");
    }

    #[test]
    fn parse_stroke_normalizes_style_value() {
        assert_eq!(parse_stroke(None, Some("stroke: RGB( 1, 2, 3 )")), "rgb(1,2,3)");
    }

    // --- parse_rgb ---

    #[test]
    fn parse_rgb_short_hex() {
        assert_eq!(parse_rgb("#f80"), Some(Rgb { r: 255, g: 136, b: 0 }));
    }

    #[test]
    fn parse_rgb_long_hex() {
        assert_eq!(parse_rgb("#0a0b0c"), Some(Rgb { r: 10, g: 11, b: 12 }));
    }

    #[test]
    fn parse_rgb_functional() {
        assert_eq!(parse_rgb("rgb(1,2,3)"), Some(Rgb { r: 1, g: 2, b: 3 }));
        assert_eq!(parse_rgb("rgba(1,2,3,0.5)"), Some(Rgb { r: 1, g: 2, b: 3 }));
    }

    #[test]
    fn parse_rgb_rejects_unknown_formats() {
        for color in ["red", "hsl(0,100%,50%)", "#12", "#12345", "#ggg", "rgb(1,2)", "rgb(1,2,3,4,5)", "url(#g)"] {
            assert_eq!(parse_rgb(color), None, "{color}");
        }
    }

    // --- is_neutral ---

    #[test]
    fn black_spellings_are_neutral() {
        for color in ["black", "#000", "#000000", ""] {
            assert!(is_neutral(color, THRESHOLD), "{color}");
        }
    }

    #[test]
    fn near_gray_is_neutral() {
        assert!(is_neutral("rgb(10,10,14)", THRESHOLD));
        assert!(is_neutral("#808080", THRESHOLD));
        assert!(is_neutral("#ccc", THRESHOLD));
    }

    #[test]
    fn saturated_is_not_neutral() {
        assert!(!is_neutral("rgb(255,0,0)", THRESHOLD));
        assert!(!is_neutral("#00ff00", THRESHOLD));
    }

    #[test]
    fn threshold_is_exclusive() {
        // spread == threshold is colored.
        assert!(!is_neutral("rgb(100,100,120)", 20));
        assert!(is_neutral("rgb(100,100,119)", 20));
    }

    #[test]
    fn unparseable_is_never_neutral() {
        assert!(!is_neutral("gray", THRESHOLD));
        assert!(!is_neutral("hsl(0,0%,50%)", THRESHOLD));
        assert!(!is_neutral("currentcolor", THRESHOLD));
    }
}
