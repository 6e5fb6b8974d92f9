//! Cubic bezier connector paths, sibling curve offsets and arc-length sampling.

use crate::geom::{self, Point};
use crate::model::{Connection, PairKey};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Horizontal iff `|dx| > |dy|`; ties resolve to vertical.
pub fn dominant_axis(p1: Point, p2: Point) -> Axis {
    if (p2.x - p1.x).abs() > (p2.y - p1.y).abs() {
        Axis::Horizontal
    } else {
        Axis::Vertical
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicPath {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicPath {
    /// Single-bend connector between two anchors, bent by `curve` perpendicular to the
    /// dominant axis.
    pub fn between(p1: Point, p2: Point, curve: f64) -> Self {
        let (control1, control2) = match dominant_axis(p1, p2) {
            Axis::Horizontal => {
                let mid_x = p1.x + (p2.x - p1.x) / 2.0;
                (
                    geom::point(mid_x, p1.y + curve),
                    geom::point(mid_x, p2.y + curve),
                )
            }
            Axis::Vertical => {
                let mid_y = p1.y + (p2.y - p1.y) / 2.0;
                (
                    geom::point(p1.x + curve, mid_y),
                    geom::point(p2.x + curve, mid_y),
                )
            }
        };
        Self {
            start: p1,
            control1,
            control2,
            end: p2,
        }
    }

    pub fn sample(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        geom::point(
            a * self.start.x + b * self.control1.x + c * self.control2.x + d * self.end.x,
            a * self.start.y + b * self.control1.y + c * self.control2.y + d * self.end.y,
        )
    }

    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            control1: self.control2,
            control2: self.control1,
            end: self.start,
        }
    }

    /// SVG path data: `M x y C x y, x y, x y`.
    pub fn to_svg_d(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str("M ");
        push_pair(&mut out, self.start);
        out.push_str(" C ");
        push_pair(&mut out, self.control1);
        out.push_str(", ");
        push_pair(&mut out, self.control2);
        out.push_str(", ");
        push_pair(&mut out, self.end);
        out
    }

    /// Minimum distance from `p` to the curve, measured against its flattened polyline.
    ///
    /// `samples` is a lower bound on the segment count; long curves get one segment per
    /// [`FLATTEN_STEP`] units of control-polygon length so straight runs stay exact.
    pub fn distance_to(&self, p: Point, samples: usize) -> f64 {
        let hull = geom::distance(self.start, self.control1)
            + geom::distance(self.control1, self.control2)
            + geom::distance(self.control2, self.end);
        let by_length = if hull.is_finite() {
            (hull / FLATTEN_STEP).ceil() as usize
        } else {
            0
        };
        let n = samples.max(by_length).clamp(1, MAX_FLATTEN_SEGMENTS);

        let mut best = f64::INFINITY;
        let mut prev = self.start;
        for i in 1..=n {
            let next = self.sample(i as f64 / n as f64);
            best = best.min(segment_distance(p, prev, next));
            prev = next;
        }
        best
    }
}

/// Local units per flattened segment used by [`CubicPath::distance_to`].
const FLATTEN_STEP: f64 = 8.0;
const MAX_FLATTEN_SEGMENTS: usize = 4096;

/// Distance from `p` to the segment `a..b`.
fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.square_length();
    if len2 == 0.0 {
        return geom::distance(p, a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    geom::distance(p, a + ab * t)
}

fn push_num(out: &mut String, v: f64) {
    use std::fmt::Write;
    let v = if v == 0.0 || !v.is_finite() { 0.0 } else { v };
    let _ = write!(out, "{v}");
}

fn push_pair(out: &mut String, p: Point) {
    push_num(out, p.x);
    out.push(' ');
    push_num(out, p.y);
}

/// Derived curve offsets, indexed by connection declaration index.
///
/// Connections with an explicit `curve` keep it. The rest are grouped by unordered endpoint pair
/// (only connections accepted by `include` take part); member `k` of a group of `n` gets
/// `spacing * (k - (n - 1) / 2)` in declaration order. Excluded connections get `0.0`.
pub fn curve_offsets(
    connections: &[Connection],
    spacing: f64,
    include: impl Fn(&Connection) -> bool,
) -> Vec<f64> {
    let mut out = vec![0.0; connections.len()];
    let mut groups: FxHashMap<PairKey, Vec<usize>> = FxHashMap::default();
    let mut order: Vec<PairKey> = Vec::new();

    for (i, c) in connections.iter().enumerate() {
        if !include(c) {
            continue;
        }
        if let Some(curve) = c.curve {
            out[i] = curve;
            continue;
        }
        let key = c.pair_key();
        let members = groups.entry(key.clone()).or_default();
        if members.is_empty() {
            order.push(key);
        }
        members.push(i);
    }

    for key in &order {
        let Some(members) = groups.get(key) else {
            continue;
        };
        let mid = (members.len() as f64 - 1.0) / 2.0;
        for (k, &i) in members.iter().enumerate() {
            out[i] = spacing * (k as f64 - mid);
        }
    }
    out
}

/// Cumulative length lookup for distance-along-curve sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcLengthTable {
    /// `(t, cumulative length at t)`, monotone in both components.
    samples: Vec<(f64, f64)>,
}

impl ArcLengthTable {
    pub fn new(path: &CubicPath, segments: usize) -> Self {
        let n = segments.max(1);
        let mut samples = Vec::with_capacity(n + 1);
        let mut prev = path.start;
        let mut acc = 0.0;
        samples.push((0.0, 0.0));
        for i in 1..=n {
            let t = i as f64 / n as f64;
            let p = path.sample(t);
            acc += geom::distance(prev, p);
            samples.push((t, acc));
            prev = p;
        }
        Self { samples }
    }

    pub fn total_length(&self) -> f64 {
        self.samples.last().map(|s| s.1).unwrap_or(0.0)
    }

    /// Curve parameter at arc length `s`, clamped to the curve.
    pub fn t_at_length(&self, s: f64) -> f64 {
        let total = self.total_length();
        if !(total > 0.0) || !s.is_finite() {
            return if s.is_finite() && s > 0.0 { 1.0 } else { 0.0 };
        }
        let s = s.clamp(0.0, total);
        let idx = self.samples.partition_point(|&(_, len)| len < s);
        if idx == 0 {
            return 0.0;
        }
        let (t1, l1) = self.samples[idx.min(self.samples.len() - 1)];
        let (t0, l0) = self.samples[idx - 1];
        let span = l1 - l0;
        if span <= 0.0 {
            return t1;
        }
        t0 + (t1 - t0) * ((s - l0) / span)
    }

    pub fn point_at_length(&self, path: &CubicPath, s: f64) -> Point {
        path.sample(self.t_at_length(s))
    }
}
