//! Node rectangle centers and boundary ("edge point") intersection.

use crate::geom::{self, Point, Rect};
use crate::model::Node;

pub fn center(node: &Node) -> Point {
    rect_center(&node.rect())
}

pub fn rect_center(r: &Rect) -> Point {
    geom::point(
        r.origin.x + r.size.width / 2.0,
        r.origin.y + r.size.height / 2.0,
    )
}

/// Point where the ray from `node`'s center toward `toward` leaves the node rectangle.
pub fn edge_point(node: &Node, toward: Point) -> Point {
    rect_edge_point(&node.rect(), toward)
}

/// Ray/rectangle boundary intersection from the rectangle center.
///
/// Returns the center itself when `toward` coincides with it. An axis with zero delta never
/// binds: its scale factor is treated as infinite.
pub fn rect_edge_point(r: &Rect, toward: Point) -> Point {
    let c = rect_center(r);
    let dx = toward.x - c.x;
    let dy = toward.y - c.y;
    if dx == 0.0 && dy == 0.0 {
        return c;
    }

    let hw = r.size.width / 2.0;
    let hh = r.size.height / 2.0;
    let tx = if dx == 0.0 {
        f64::INFINITY
    } else {
        hw / dx.abs()
    };
    let ty = if dy == 0.0 {
        f64::INFINITY
    } else {
        hh / dy.abs()
    };
    let t = tx.min(ty);
    if !t.is_finite() {
        return c;
    }
    geom::point(c.x + dx * t, c.y + dy * t)
}

/// Inclusive containment test (points on the border count as inside).
pub fn contains(node: &Node, p: Point) -> bool {
    let r = node.rect();
    p.x >= r.min_x() && p.x <= r.max_x() && p.y >= r.min_y() && p.y <= r.max_y()
}
