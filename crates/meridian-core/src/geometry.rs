//! Length measurement for candidate line elements.
//!
//! Mirrors what a renderer's `getTotalLength()` would report closely
//! enough to discard degenerate fragments: straight pieces are exact,
//! Bezier curves and elliptical arcs are flattened into
//! [`CURVE_STEPS`] chords. Any unparseable geometry is reported as
//! unmeasurable (`None`) rather than as zero length.

use std::f64::consts::TAU;

use geo::line_measures::Distance;
use geo::{Coord, Euclidean, Point};
use svg::node::element::path::{Command, Data, Position};

/// Chords per curve or arc when flattening.
pub const CURVE_STEPS: u32 = 16;

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Euclidean.distance(&Point::from(a), &Point::from(b))
}

/// Parse a length attribute, accepting an optional `px` suffix.
#[must_use]
pub fn parse_length(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    raw.strip_suffix("px").unwrap_or(raw).trim().parse().ok()
}

/// Length of a `<line>` from its (possibly absent) coordinates.
///
/// Absent coordinates default to zero, as in SVG.
#[must_use]
pub fn line_length(x1: Option<&str>, y1: Option<&str>, x2: Option<&str>, y2: Option<&str>) -> Option<f64> {
    let coord = |v: Option<&str>| v.map_or(Some(0.0), parse_length);
    let a = Coord { x: coord(x1)?, y: coord(y1)? };
    let b = Coord { x: coord(x2)?, y: coord(y2)? };
    Some(distance(a, b))
}

/// Length of a `<polyline>` from its `points` attribute.
///
/// # Examples
///
/// ```
/// use meridian_core::geometry::polyline_length;
///
/// assert_eq!(polyline_length("0,0 3,4 3,10"), Some(11.0));
/// assert_eq!(polyline_length("0,0 oops"), None);
/// ```
#[must_use]
pub fn polyline_length(points: &str) -> Option<f64> {
    let numbers = points
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    // An odd trailing coordinate is ignored, as renderers do.
    let coords: Vec<Coord<f64>> = numbers
        .chunks_exact(2)
        .map(|pair| Coord { x: pair[0], y: pair[1] })
        .collect();
    Some(coords.windows(2).map(|w| distance(w[0], w[1])).sum())
}

/// Length of a `<path>` from its `d` attribute.
///
/// # Examples
///
/// ```
/// use meridian_core::geometry::path_length;
///
/// assert_eq!(path_length("M0,0 L30,40"), Some(50.0));
/// assert_eq!(path_length("M0,0 h10 v10 z").map(f64::round), Some(34.0));
/// ```
#[must_use]
pub fn path_length(d: &str) -> Option<f64> {
    let data = Data::parse(d).ok()?;
    let mut pen = Pen::default();
    for command in data.iter() {
        pen.apply(command)?;
    }
    Some(pen.length)
}

/// Which kind of control point the previous command left behind, for
/// the smooth (`S`/`T`) shorthand reflections.
#[derive(Clone, Copy)]
enum LastControl {
    None,
    Cubic(Coord<f64>),
    Quadratic(Coord<f64>),
}

struct Pen {
    current: Coord<f64>,
    subpath_start: Coord<f64>,
    last_control: LastControl,
    length: f64,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            current: Coord { x: 0.0, y: 0.0 },
            subpath_start: Coord { x: 0.0, y: 0.0 },
            last_control: LastControl::None,
            length: 0.0,
        }
    }
}

impl Pen {
    fn point(&self, position: Position, x: f32, y: f32) -> Coord<f64> {
        let (x, y) = (f64::from(x), f64::from(y));
        match position {
            Position::Absolute => Coord { x, y },
            Position::Relative => Coord {
                x: self.current.x + x,
                y: self.current.y + y,
            },
        }
    }

    fn line_to(&mut self, to: Coord<f64>) {
        self.length += distance(self.current, to);
        self.current = to;
    }

    fn flatten(&mut self, to: Coord<f64>, at: impl Fn(f64) -> Coord<f64>) {
        let mut previous = self.current;
        for step in 1..=CURVE_STEPS {
            let p = if step == CURVE_STEPS {
                to
            } else {
                at(f64::from(step) / f64::from(CURVE_STEPS))
            };
            self.length += distance(previous, p);
            previous = p;
        }
        self.current = to;
    }

    fn reflected(&self, wanted: fn(LastControl) -> Option<Coord<f64>>) -> Coord<f64> {
        wanted(self.last_control).map_or(self.current, |c| Coord {
            x: 2.0f64.mul_add(self.current.x, -c.x),
            y: 2.0f64.mul_add(self.current.y, -c.y),
        })
    }

    /// Returns `None` when the parameter count does not fit the command.
    fn apply(&mut self, command: &Command) -> Option<()> {
        let mut control = LastControl::None;
        match command {
            Command::Move(pos, params) => {
                let mut pairs = pairs(params, 2)?.into_iter();
                if let Some(first) = pairs.next() {
                    self.current = self.point(*pos, first[0], first[1]);
                    self.subpath_start = self.current;
                }
                for p in pairs {
                    let to = self.point(*pos, p[0], p[1]);
                    self.line_to(to);
                }
            }
            Command::Line(pos, params) => {
                for p in pairs(params, 2)? {
                    let to = self.point(*pos, p[0], p[1]);
                    self.line_to(to);
                }
            }
            Command::HorizontalLine(pos, params) => {
                for x in params.iter().map(|v| f64::from(*v)) {
                    let to = match pos {
                        Position::Absolute => Coord { x, y: self.current.y },
                        Position::Relative => Coord { x: self.current.x + x, y: self.current.y },
                    };
                    self.line_to(to);
                }
            }
            Command::VerticalLine(pos, params) => {
                for y in params.iter().map(|v| f64::from(*v)) {
                    let to = match pos {
                        Position::Absolute => Coord { x: self.current.x, y },
                        Position::Relative => Coord { x: self.current.x, y: self.current.y + y },
                    };
                    self.line_to(to);
                }
            }
            Command::CubicCurve(pos, params) => {
                for p in pairs(params, 6)? {
                    let c1 = self.point(*pos, p[0], p[1]);
                    let c2 = self.point(*pos, p[2], p[3]);
                    let to = self.point(*pos, p[4], p[5]);
                    self.cubic(c1, c2, to);
                    control = LastControl::Cubic(c2);
                    self.last_control = control;
                }
            }
            Command::SmoothCubicCurve(pos, params) => {
                for p in pairs(params, 4)? {
                    let c1 = self.reflected(|c| match c {
                        LastControl::Cubic(c) => Some(c),
                        _ => None,
                    });
                    let c2 = self.point(*pos, p[0], p[1]);
                    let to = self.point(*pos, p[2], p[3]);
                    self.cubic(c1, c2, to);
                    control = LastControl::Cubic(c2);
                    self.last_control = control;
                }
            }
            Command::QuadraticCurve(pos, params) => {
                for p in pairs(params, 4)? {
                    let c = self.point(*pos, p[0], p[1]);
                    let to = self.point(*pos, p[2], p[3]);
                    self.quadratic(c, to);
                    control = LastControl::Quadratic(c);
                    self.last_control = control;
                }
            }
            Command::SmoothQuadraticCurve(pos, params) => {
                for p in pairs(params, 2)? {
                    let c = self.reflected(|c| match c {
                        LastControl::Quadratic(c) => Some(c),
                        _ => None,
                    });
                    let to = self.point(*pos, p[0], p[1]);
                    self.quadratic(c, to);
                    control = LastControl::Quadratic(c);
                    self.last_control = control;
                }
            }
            Command::EllipticalArc(pos, params) => {
                for p in pairs(params, 7)? {
                    let to = self.point(*pos, p[5], p[6]);
                    let arc = Arc {
                        rx: f64::from(p[0]),
                        ry: f64::from(p[1]),
                        rotation: f64::from(p[2]).to_radians(),
                        large_arc: p[3] != 0.0,
                        sweep: p[4] != 0.0,
                    };
                    self.arc(&arc, to);
                }
            }
            Command::Close => {
                let start = self.subpath_start;
                self.line_to(start);
            }
        }
        self.last_control = control;
        Some(())
    }

    fn cubic(&mut self, c1: Coord<f64>, c2: Coord<f64>, to: Coord<f64>) {
        let p0 = self.current;
        self.flatten(to, |t| {
            let mt = 1.0 - t;
            let (a, b, c, d) = (mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t);
            Coord {
                x: a * p0.x + b * c1.x + c * c2.x + d * to.x,
                y: a * p0.y + b * c1.y + c * c2.y + d * to.y,
            }
        });
    }

    fn quadratic(&mut self, c: Coord<f64>, to: Coord<f64>) {
        let p0 = self.current;
        self.flatten(to, |t| {
            let mt = 1.0 - t;
            let (a, b, d) = (mt * mt, 2.0 * mt * t, t * t);
            Coord {
                x: a * p0.x + b * c.x + d * to.x,
                y: a * p0.y + b * c.y + d * to.y,
            }
        });
    }

    fn arc(&mut self, arc: &Arc, to: Coord<f64>) {
        match arc.center_parameterization(self.current, to) {
            Some(center) => self.flatten(to, |t| center.at(t)),
            // Coincident endpoints draw nothing; zero radii draw a line.
            None if self.current == to => {}
            None => self.line_to(to),
        }
    }
}

/// Split a parameter list into groups of `n`, failing on a remainder.
fn pairs(params: &[f32], n: usize) -> Option<Vec<&[f32]>> {
    if params.len() % n != 0 {
        return None;
    }
    Some(params.chunks_exact(n).collect())
}

/// Elliptical arc in endpoint parameterization.
struct Arc {
    rx: f64,
    ry: f64,
    rotation: f64,
    large_arc: bool,
    sweep: bool,
}

/// Elliptical arc in center parameterization.
struct CenteredArc {
    center: Coord<f64>,
    rx: f64,
    ry: f64,
    cos_phi: f64,
    sin_phi: f64,
    start_angle: f64,
    sweep_angle: f64,
}

impl CenteredArc {
    fn at(&self, t: f64) -> Coord<f64> {
        let theta = self.sweep_angle.mul_add(t, self.start_angle);
        let (x, y) = (self.rx * theta.cos(), self.ry * theta.sin());
        Coord {
            x: self.center.x + x * self.cos_phi - y * self.sin_phi,
            y: self.center.y + x * self.sin_phi + y * self.cos_phi,
        }
    }
}

fn angle_between(u: (f64, f64), v: (f64, f64)) -> f64 {
    (u.0 * v.1 - u.1 * v.0).atan2(u.0 * v.0 + u.1 * v.1)
}

impl Arc {
    /// Endpoint-to-center conversion (SVG 1.1 appendix F.6.5), with
    /// out-of-range radii scaled up. `None` for degenerate arcs.
    fn center_parameterization(&self, from: Coord<f64>, to: Coord<f64>) -> Option<CenteredArc> {
        let (mut rx, mut ry) = (self.rx.abs(), self.ry.abs());
        if from == to || rx == 0.0 || ry == 0.0 {
            return None;
        }
        let (sin_phi, cos_phi) = self.rotation.sin_cos();
        let dx = (from.x - to.x) / 2.0;
        let dy = (from.y - to.y) / 2.0;
        let x1 = cos_phi * dx + sin_phi * dy;
        let y1 = -sin_phi * dx + cos_phi * dy;

        let lambda = (x1 * x1) / (rx * rx) + (y1 * y1) / (ry * ry);
        if lambda > 1.0 {
            rx *= lambda.sqrt();
            ry *= lambda.sqrt();
        }

        let numerator = (rx * ry).powi(2) - (rx * y1).powi(2) - (ry * x1).powi(2);
        let denominator = (rx * y1).powi(2) + (ry * x1).powi(2);
        let mut coef = (numerator / denominator).max(0.0).sqrt();
        if self.large_arc == self.sweep {
            coef = -coef;
        }
        let cx1 = coef * rx * y1 / ry;
        let cy1 = -coef * ry * x1 / rx;

        let center = Coord {
            x: cos_phi * cx1 - sin_phi * cy1 + (from.x + to.x) / 2.0,
            y: sin_phi * cx1 + cos_phi * cy1 + (from.y + to.y) / 2.0,
        };
        let u = ((x1 - cx1) / rx, (y1 - cy1) / ry);
        let v = ((-x1 - cx1) / rx, (-y1 - cy1) / ry);
        let start_angle = angle_between((1.0, 0.0), u);
        let mut sweep_angle = angle_between(u, v);
        if !self.sweep && sweep_angle > 0.0 {
            sweep_angle -= TAU;
        } else if self.sweep && sweep_angle < 0.0 {
            sweep_angle += TAU;
        }

        Some(CenteredArc {
            center,
            rx,
            ry,
            cos_phi,
            sin_phi,
            start_angle,
            sweep_angle,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    fn assert_close(actual: Option<f64>, expected: f64, tolerance: f64) {
        let actual = actual.unwrap();
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} +/- {tolerance}, got {actual}"
        );
    }

    #[test]
    fn parse_length_accepts_px() {
        assert_eq!(parse_length("2.5px"), Some(2.5));
        assert_eq!(parse_length(" 3 "), Some(3.0));
        assert_eq!(parse_length("1em"), None);
    }

    #[test]
    fn line_defaults_missing_coordinates_to_zero() {
        assert_close(line_length(None, None, Some("3"), Some("4")), 5.0, 1e-9);
        assert_eq!(line_length(Some("x"), None, None, None), None);
    }

    #[test]
    fn polyline_ignores_odd_trailing_coordinate() {
        assert_close(polyline_length("0 0 10 0 10"), 10.0, 1e-9);
    }

    #[test]
    fn polyline_single_point_is_zero() {
        assert_close(polyline_length("5,5"), 0.0, 1e-9);
    }

    #[test]
    fn path_relative_lines() {
        assert_close(path_length("m10,10 l3,4 l0,-4"), 9.0, 1e-6);
    }

    #[test]
    fn path_implicit_lineto_after_move() {
        assert_close(path_length("M0,0 10,0 10,10"), 20.0, 1e-6);
    }

    #[test]
    fn path_close_returns_to_subpath_start() {
        assert_close(path_length("M0,0 H10 V10 H0 Z"), 40.0, 1e-6);
    }

    #[test]
    fn path_straight_cubic_matches_chord() {
        assert_close(path_length("M0,0 C10,0 20,0 30,0"), 30.0, 1e-6);
    }

    #[test]
    fn path_smooth_cubic_reflects_previous_control() {
        // Two collinear straight cubics.
        assert_close(path_length("M0,0 C5,0 10,0 15,0 S25,0 30,0"), 30.0, 1e-6);
    }

    #[test]
    fn path_quadratic_and_smooth_quadratic() {
        assert_close(path_length("M0,0 Q5,0 10,0 T20,0"), 20.0, 1e-6);
    }

    #[test]
    fn path_semicircle_arc() {
        // Radius 10 semicircle: length pi * 10.
        assert_close(path_length("M0,0 A10,10 0 0 1 20,0"), PI * 10.0, 0.1);
    }

    #[test]
    fn path_arc_radii_scaled_up_when_too_small() {
        // Radius 1 cannot span 20 units; scaled to 10 (semicircle).
        assert_close(path_length("M0,0 A1,1 0 0 1 20,0"), PI * 10.0, 0.1);
    }

    #[test]
    fn path_zero_radius_arc_is_straight() {
        assert_close(path_length("M0,0 A0,5 0 0 1 20,0"), 20.0, 1e-6);
    }

    #[test]
    fn path_unparseable_is_unmeasurable() {
        assert_eq!(path_length("not a path"), None);
        // Arc with a missing endpoint coordinate.
        assert_eq!(path_length("M0,0 A10,10 0 0 1 20"), None);
    }

    #[test]
    fn path_move_only_is_zero() {
        assert_close(path_length("M5,5"), 0.0, 1e-9);
    }
}
