use archmap_core::anchor::{rect_center, rect_edge_point};
use archmap_core::geom;
use archmap_core::path::curve_offsets;
use archmap_core::viewport::{MAX_SCALE, MIN_SCALE};
use archmap_core::{Connection, Layer, LayerFilter, Viewport};
use proptest::prelude::*;

fn conn(index: usize, from: &str, to: &str, layer: &str, wan: bool) -> Connection {
    Connection {
        index,
        from: from.to_string(),
        to: to.to_string(),
        layer: layer.to_string(),
        wan,
        curve: None,
        color: None,
        dash: false,
        label: String::new(),
        detail: String::new(),
    }
}

const LAYER_IDS: [&str; 4] = ["sip", "rtp", "sql", "wan"];

fn layers() -> Vec<Layer> {
    LAYER_IDS
        .iter()
        .map(|id| Layer {
            id: id.to_string(),
            label: id.to_string(),
            color: "#fff".to_string(),
            active: false,
            group: None,
        })
        .collect()
}

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

proptest! {
    #[test]
    fn sibling_offsets_are_symmetric_and_increasing(n in 2usize..12, spacing in 1.0f64..80.0) {
        let conns: Vec<Connection> = (0..n)
            .map(|i| if i % 2 == 0 { conn(i, "a", "b", "x", false) } else { conn(i, "b", "a", "x", false) })
            .collect();
        let offs = curve_offsets(&conns, spacing, |_| true);
        for (k, off) in offs.iter().enumerate() {
            let expected = spacing * (k as f64 - (n as f64 - 1.0) / 2.0);
            prop_assert!(near(*off, expected));
        }
        for w in offs.windows(2) {
            prop_assert!(w[1] > w[0]);
        }
        for k in 0..n {
            prop_assert!(near(offs[k], -offs[n - 1 - k]));
        }
    }

    #[test]
    fn edge_point_lies_on_rect_boundary(
        x in -500.0f64..500.0, y in -500.0f64..500.0,
        w in 1.0f64..300.0, h in 1.0f64..300.0,
        tx in -2000.0f64..2000.0, ty in -2000.0f64..2000.0,
    ) {
        let r = geom::rect(x, y, w, h);
        let c = rect_center(&r);
        prop_assume!(tx != c.x || ty != c.y);
        let p = rect_edge_point(&r, geom::point(tx, ty));
        let eps = 1e-6;
        let on_vertical = (p.x - r.min_x()).abs() < eps || (p.x - r.max_x()).abs() < eps;
        let on_horizontal = (p.y - r.min_y()).abs() < eps || (p.y - r.max_y()).abs() < eps;
        prop_assert!(on_vertical || on_horizontal, "{p:?} not on boundary of {r:?}");
        prop_assert!(p.x >= r.min_x() - eps && p.x <= r.max_x() + eps);
        prop_assert!(p.y >= r.min_y() - eps && p.y <= r.max_y() + eps);
    }

    #[test]
    fn visibility_is_monotonic_in_active_set(
        initial in proptest::collection::vec(any::<bool>(), LAYER_IDS.len()),
        layer_idx in 0usize..3,
        wan in any::<bool>(),
        flip in 0usize..LAYER_IDS.len(),
    ) {
        let mut f = LayerFilter::new(&layers());
        for (id, on) in LAYER_IDS.iter().zip(&initial) {
            f.set_active(id, *on);
        }
        let c = conn(0, "a", "b", LAYER_IDS[layer_idx], wan);
        let before = f.is_visible(&c);
        let id = LAYER_IDS[flip];
        let was_active = f.is_active(id);
        f.toggle(id);
        let after = f.is_visible(&c);
        if was_active {
            // Removing a tag never reveals.
            prop_assert!(!(after && !before));
        } else {
            // Adding a tag never hides.
            prop_assert!(!(before && !after));
        }
    }

    #[test]
    fn scale_stays_clamped(deltas in proptest::collection::vec(-1e12f64..1e12, 1..40)) {
        let mut vp = Viewport::default();
        for d in deltas {
            vp.zoom(d, 0.001);
            prop_assert!(vp.scale() >= MIN_SCALE && vp.scale() <= MAX_SCALE);
        }
    }

    #[test]
    fn affine_round_trip(
        px in -5000.0f64..5000.0, py in -5000.0f64..5000.0,
        s in 0.2f64..3.0,
        x in -5000.0f64..5000.0, y in -5000.0f64..5000.0,
    ) {
        let vp = Viewport::new(geom::vector(px, py), s);
        let p = geom::point(x, y);
        let back = vp.local_to_screen(vp.screen_to_local(p));
        prop_assert!((back.x - p.x).abs() < 1e-6 && (back.y - p.y).abs() < 1e-6);
    }
}

#[test]
fn edge_point_returns_center_for_coincident_target() {
    let r = geom::rect(3.0, 4.0, 10.0, 20.0);
    let c = rect_center(&r);
    assert_eq!(rect_edge_point(&r, c), c);
}
