//! Pointer gesture state machine: background pan, node drag, click-vs-drag discrimination.
//!
//! The controller never touches the diagram. It turns pointer input plus a resolved
//! [`HitTarget`] into [`Effect`]s which the session applies.

use archmap_core::Viewport;
use archmap_core::geom::{self, Point, Vector};

/// What sits under the pointer at press time, topmost first.
#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    /// A node, with its local position at press time.
    Node { id: String, position: Point },
    /// A visible connector hit path.
    Connection(usize),
    Background,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace the viewport pan.
    PanTo(Vector),
    MoveNode { id: String, position: Point },
    InspectNode(String),
    InspectConnection(usize),
    CloseInspection,
}

#[derive(Debug, Clone, Default, PartialEq)]
enum Gesture {
    #[default]
    Idle,
    Panning {
        press: Point,
        start_pan: Vector,
    },
    NodePress {
        id: String,
        press: Point,
        last: Point,
        node_start: Point,
        /// Cumulative screen distance travelled since the press.
        travelled: f64,
        /// Presses during a simulation still click, but never move the node.
        locked: bool,
    },
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    gesture: Gesture,
    click_threshold: f64,
}

impl InteractionController {
    pub fn new(click_threshold: f64) -> Self {
        Self {
            gesture: Gesture::Idle,
            click_threshold,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.gesture, Gesture::Panning { .. })
    }

    pub fn pointer_down(
        &mut self,
        target: HitTarget,
        screen: Point,
        viewport: &Viewport,
        drag_locked: bool,
    ) -> Vec<Effect> {
        match target {
            HitTarget::Node { id, position } => {
                self.gesture = Gesture::NodePress {
                    id,
                    press: screen,
                    last: screen,
                    node_start: position,
                    travelled: 0.0,
                    locked: drag_locked,
                };
                vec![Effect::CloseInspection]
            }
            HitTarget::Connection(index) => {
                self.gesture = Gesture::Idle;
                vec![Effect::InspectConnection(index)]
            }
            HitTarget::Background => {
                self.gesture = Gesture::Panning {
                    press: screen,
                    start_pan: viewport.pan(),
                };
                Vec::new()
            }
        }
    }

    pub fn pointer_move(&mut self, screen: Point, viewport: &Viewport) -> Vec<Effect> {
        match &mut self.gesture {
            Gesture::Idle => Vec::new(),
            Gesture::Panning { press, start_pan } => {
                vec![Effect::PanTo(*start_pan + (screen - *press))]
            }
            Gesture::NodePress {
                id,
                press,
                last,
                node_start,
                travelled,
                locked,
            } => {
                *travelled += geom::distance(*last, screen);
                *last = screen;
                if *locked {
                    return Vec::new();
                }
                let delta = viewport.screen_delta_to_local(screen - *press);
                vec![Effect::MoveNode {
                    id: id.clone(),
                    position: *node_start + delta,
                }]
            }
        }
    }

    pub fn pointer_up(&mut self, screen: Point) -> Vec<Effect> {
        match std::mem::take(&mut self.gesture) {
            Gesture::NodePress {
                id,
                last,
                travelled,
                ..
            } => {
                let travelled = travelled + geom::distance(last, screen);
                if travelled < self.click_threshold {
                    vec![Effect::InspectNode(id)]
                } else {
                    Vec::new()
                }
            }
            Gesture::Panning { .. } | Gesture::Idle => Vec::new(),
        }
    }

    /// Drops any gesture in progress without emitting effects.
    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, x: f64, y: f64) -> HitTarget {
        HitTarget::Node {
            id: id.to_string(),
            position: geom::point(x, y),
        }
    }

    #[test]
    fn background_press_pans_one_to_one_in_screen_units() {
        let vp = Viewport::new(geom::vector(-100.0, -50.0), 0.5);
        let mut ic = InteractionController::new(5.0);
        assert!(ic
            .pointer_down(HitTarget::Background, geom::point(10.0, 10.0), &vp, false)
            .is_empty());
        assert!(ic.is_panning());
        let fx = ic.pointer_move(geom::point(40.0, 30.0), &vp);
        assert_eq!(fx, vec![Effect::PanTo(geom::vector(-70.0, -30.0))]);
        assert!(ic.pointer_up(geom::point(40.0, 30.0)).is_empty());
        assert!(ic.is_idle());
    }

    #[test]
    fn node_drag_divides_screen_delta_by_scale() {
        let vp = Viewport::new(geom::vector(0.0, 0.0), 0.5);
        let mut ic = InteractionController::new(5.0);
        let fx = ic.pointer_down(node("a", 100.0, 100.0), geom::point(0.0, 0.0), &vp, false);
        assert_eq!(fx, vec![Effect::CloseInspection]);
        let fx = ic.pointer_move(geom::point(20.0, -10.0), &vp);
        assert_eq!(
            fx,
            vec![Effect::MoveNode {
                id: "a".into(),
                position: geom::point(140.0, 80.0)
            }]
        );
        assert!(ic.pointer_up(geom::point(20.0, -10.0)).is_empty());
    }

    #[test]
    fn short_press_is_a_click() {
        let vp = Viewport::default();
        let mut ic = InteractionController::new(5.0);
        ic.pointer_down(node("a", 0.0, 0.0), geom::point(0.0, 0.0), &vp, false);
        ic.pointer_move(geom::point(2.0, 0.0), &vp);
        assert_eq!(
            ic.pointer_up(geom::point(3.0, 0.0)),
            vec![Effect::InspectNode("a".into())]
        );
    }

    #[test]
    fn travel_counts_even_when_pointer_returns() {
        let vp = Viewport::default();
        let mut ic = InteractionController::new(5.0);
        ic.pointer_down(node("a", 0.0, 0.0), geom::point(0.0, 0.0), &vp, false);
        ic.pointer_move(geom::point(10.0, 0.0), &vp);
        ic.pointer_move(geom::point(0.0, 0.0), &vp);
        assert!(ic.pointer_up(geom::point(0.0, 0.0)).is_empty());
    }

    #[test]
    fn locked_drag_never_moves_but_still_clicks() {
        let vp = Viewport::default();
        let mut ic = InteractionController::new(5.0);
        ic.pointer_down(node("a", 0.0, 0.0), geom::point(0.0, 0.0), &vp, true);
        assert!(ic.pointer_move(geom::point(50.0, 0.0), &vp).is_empty());
        assert!(ic.pointer_up(geom::point(50.0, 0.0)).is_empty());

        ic.pointer_down(node("a", 0.0, 0.0), geom::point(0.0, 0.0), &vp, true);
        assert_eq!(
            ic.pointer_up(geom::point(1.0, 1.0)),
            vec![Effect::InspectNode("a".into())]
        );
    }

    #[test]
    fn connector_press_inspects_immediately() {
        let vp = Viewport::default();
        let mut ic = InteractionController::new(5.0);
        let fx = ic.pointer_down(HitTarget::Connection(3), geom::point(0.0, 0.0), &vp, false);
        assert_eq!(fx, vec![Effect::InspectConnection(3)]);
        assert!(ic.is_idle());
    }
}
