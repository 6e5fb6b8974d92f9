//! Resolved connector geometry for a whole diagram.
//!
//! The scene holds one [`ResolvedConnection`] per renderable connection. Dangling connections
//! (an endpoint names no node) are omitted. Curve offsets are fixed at build time; anchors and
//! control points are recomputed when a node moves.

use crate::anchor;
use crate::geom::PointOut;
use crate::layers::LayerFilter;
use crate::model::{Connection, Diagram};
use crate::path::{self, ArcLengthTable, Axis, CubicPath};
use serde::Serialize;

pub const DASH_ARRAY: &str = "8,4";

/// Minimum polyline segments used when hit-testing a pointer against a connector.
const HIT_SAMPLES: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConnection {
    pub index: usize,
    pub from: String,
    pub to: String,
    pub curve: f64,
    pub axis: Axis,
    pub path: CubicPath,
    pub arc: ArcLengthTable,
    pub color: String,
}

impl ResolvedConnection {
    pub fn total_length(&self) -> f64 {
        self.arc.total_length()
    }

    pub fn point_at_length(&self, s: f64) -> crate::geom::Point {
        self.arc.point_at_length(&self.path, s)
    }
}

/// Path descriptor handed to a rendering layer. The hit-test path shares `d` with the visual
/// path and differs only in stroke width.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathDescriptor {
    pub index: usize,
    pub from: String,
    pub to: String,
    pub layer: String,
    pub tags: Vec<String>,
    pub start: PointOut,
    pub control1: PointOut,
    pub control2: PointOut,
    pub end: PointOut,
    pub d: String,
    pub color: String,
    pub dash_array: Option<&'static str>,
    pub marker_id: String,
    pub hit_width: f64,
    pub visible: bool,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Scene {
    offsets: Vec<f64>,
    resolved: Vec<Option<ResolvedConnection>>,
    arc_samples: usize,
    hit_width: f64,
}

impl Scene {
    pub fn build(diagram: &Diagram) -> Self {
        let settings = diagram.settings();
        let offsets = path::curve_offsets(diagram.connections(), settings.curve_spacing, |c| {
            diagram.is_resolvable(c)
        });
        let mut scene = Self {
            offsets,
            resolved: Vec::with_capacity(diagram.connections().len()),
            arc_samples: settings.arc_samples,
            hit_width: settings.hit_width,
        };
        for c in diagram.connections() {
            let r = scene.resolve(diagram, c);
            if r.is_none() {
                tracing::debug!(
                    connection = c.index,
                    from = %c.from,
                    to = %c.to,
                    "connection references a missing node; skipped"
                );
            }
            scene.resolved.push(r);
        }
        scene
    }

    fn resolve(&self, diagram: &Diagram, c: &Connection) -> Option<ResolvedConnection> {
        let a = diagram.node(&c.from)?;
        let b = diagram.node(&c.to)?;
        let p1 = anchor::edge_point(a, anchor::center(b));
        let p2 = anchor::edge_point(b, anchor::center(a));
        let curve = self.offsets.get(c.index).copied().unwrap_or(0.0);
        let path = CubicPath::between(p1, p2, curve);
        Some(ResolvedConnection {
            index: c.index,
            from: c.from.clone(),
            to: c.to.clone(),
            curve,
            axis: path::dominant_axis(p1, p2),
            arc: ArcLengthTable::new(&path, self.arc_samples),
            path,
            color: diagram.connection_color(c).to_string(),
        })
    }

    /// Re-resolves every connection touching `node_id`. Returns the affected indices.
    pub fn refresh_node(&mut self, diagram: &Diagram, node_id: &str) -> Vec<usize> {
        let mut touched = Vec::new();
        for c in diagram.connections() {
            if !c.touches(node_id) {
                continue;
            }
            let r = self.resolve(diagram, c);
            if let Some(slot) = self.resolved.get_mut(c.index) {
                *slot = r;
                touched.push(c.index);
            }
        }
        touched
    }

    pub fn get(&self, index: usize) -> Option<&ResolvedConnection> {
        self.resolved.get(index).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedConnection> {
        self.resolved.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn curve_offset(&self, index: usize) -> Option<f64> {
        self.offsets.get(index).copied()
    }

    pub fn hit_width(&self) -> f64 {
        self.hit_width
    }

    /// First resolved connection (declaration order) joining `{a, b}`.
    pub fn find_between(&self, a: &str, b: &str) -> Option<&ResolvedConnection> {
        self.iter()
            .find(|r| (r.from == a && r.to == b) || (r.from == b && r.to == a))
    }

    /// Topmost visible connector whose hit path contains `p` (later declarations win).
    pub fn hit_test(
        &self,
        diagram: &Diagram,
        filter: &LayerFilter,
        p: crate::geom::Point,
    ) -> Option<usize> {
        let reach = self.hit_width / 2.0;
        self.resolved
            .iter()
            .rev()
            .flatten()
            .find(|r| {
                diagram
                    .connection(r.index)
                    .is_some_and(|c| filter.is_visible(c))
                    && r.path.distance_to(p, HIT_SAMPLES) <= reach
            })
            .map(|r| r.index)
    }

    pub fn descriptors(&self, diagram: &Diagram, filter: &LayerFilter) -> Vec<PathDescriptor> {
        self.iter()
            .filter_map(|r| {
                let c = diagram.connection(r.index)?;
                Some(PathDescriptor {
                    index: r.index,
                    from: r.from.clone(),
                    to: r.to.clone(),
                    layer: c.layer.clone(),
                    tags: c.tags().map(str::to_string).collect(),
                    start: r.path.start.into(),
                    control1: r.path.control1.into(),
                    control2: r.path.control2.into(),
                    end: r.path.end.into(),
                    d: r.path.to_svg_d(),
                    color: r.color.clone(),
                    dash_array: c.dash.then_some(DASH_ARRAY),
                    marker_id: format!("m-{}", c.layer),
                    hit_width: self.hit_width,
                    visible: filter.is_visible(c),
                    label: c.label.clone(),
                })
            })
            .collect()
    }
}
