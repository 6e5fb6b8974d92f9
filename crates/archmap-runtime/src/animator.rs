//! Route simulation: a marker travelling hop by hop along a node-id sequence.
//!
//! The run is plain data advanced by [`step`], driven by an external tick source. Progress is
//! frame-coupled (a fixed increment per tick); only the settle delay consumes wall-clock `dt`.
//!
//! Hops whose connector is missing or hidden are skipped without aborting the run. Direction is
//! inferred per hop from the current node centers, so the marker always departs from the hop's
//! first node even when the stored path runs the other way.

use crate::event::{DiagramEvent, EntityDiff, EntityRef};
use archmap_core::anchor;
use archmap_core::geom::{self, PointOut};
use archmap_core::{Diagram, LayerFilter, Scene, Simulation};
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Read-only view of the diagram state a step may consult.
#[derive(Debug, Clone, Copy)]
pub struct AnimationContext<'a> {
    pub diagram: &'a Diagram,
    pub scene: &'a Scene,
    pub filter: &'a LayerFilter,
}

/// Cancels an in-flight run at its next step. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Looking for the next playable hop.
    Playing,
    Traversing {
        connection: usize,
        progress: f64,
        reverse: bool,
    },
    Settling {
        remaining: Duration,
    },
    Done,
}

#[derive(Debug, Clone)]
pub struct AnimationRun {
    simulation: String,
    route: Vec<String>,
    hop: usize,
    phase: Phase,
    highlighted: Vec<EntityRef>,
    marker_shown: bool,
    token: CancellationToken,
}

impl AnimationRun {
    pub fn new(sim: &Simulation) -> Self {
        Self {
            simulation: sim.id.clone(),
            route: sim.route.clone(),
            hop: 0,
            phase: Phase::Playing,
            highlighted: Vec::new(),
            marker_shown: false,
            token: CancellationToken::new(),
        }
    }

    pub fn simulation(&self) -> &str {
        &self.simulation
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Entities currently marked active by this run.
    pub fn highlighted(&self) -> &[EntityRef] {
        &self.highlighted
    }

    fn highlight(&mut self, entity: EntityRef, out: &mut StepReport) {
        out.diffs.push(EntityDiff::new(entity.clone(), true, true));
        if !self.highlighted.contains(&entity) {
            self.highlighted.push(entity);
        }
    }

    fn clear(&mut self, ctx: &AnimationContext<'_>, out: &mut StepReport) {
        for entity in self.highlighted.drain(..) {
            let visible = match &entity {
                EntityRef::Connection(i) => ctx
                    .diagram
                    .connection(*i)
                    .is_some_and(|c| ctx.filter.is_visible(c)),
                EntityRef::Node(_) => true,
                EntityRef::Marker => false,
            };
            out.diffs.push(EntityDiff::new(entity, visible, false));
        }
        if self.marker_shown {
            out.diffs
                .push(EntityDiff::new(EntityRef::Marker, false, false));
            self.marker_shown = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSample {
    pub connection: usize,
    pub progress: f64,
    pub reverse: bool,
    /// Marker center on the curve.
    pub point: PointOut,
    /// Top-left of the marker box (`point - radius`).
    pub origin: PointOut,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub hop_done: bool,
    pub run_done: bool,
    pub diffs: Vec<EntityDiff>,
    pub events: Vec<DiagramEvent>,
    pub marker: Option<MarkerSample>,
}

impl StepReport {
    fn absorb(&mut self, other: StepReport) {
        self.hop_done |= other.hop_done;
        self.run_done |= other.run_done;
        self.diffs.extend(other.diffs);
        self.events.extend(other.events);
        if other.marker.is_some() {
            self.marker = other.marker;
        }
    }
}

/// Advances `run` by one tick. Returns the next run state plus what changed.
pub fn step(
    mut run: AnimationRun,
    ctx: &AnimationContext<'_>,
    dt: Duration,
) -> (AnimationRun, StepReport) {
    let mut out = StepReport::default();
    if run.phase == Phase::Done {
        out.run_done = true;
        return (run, out);
    }
    if run.token.is_cancelled() {
        cancel_now(&mut run, ctx, &mut out);
        return (run, out);
    }

    let settings = ctx.diagram.settings();
    match run.phase {
        Phase::Playing => start_next_hop(&mut run, ctx, &mut out),
        Phase::Traversing {
            connection,
            progress,
            reverse,
        } => {
            let next = (progress + settings.progress_step).min(1.0);
            out.marker = sample_marker(ctx, connection, next, reverse);
            if next >= 1.0 {
                tracing::trace!(simulation = %run.simulation, hop = run.hop, "hop resolved");
                out.hop_done = true;
                run.hop += 1;
                run.phase = Phase::Playing;
            } else {
                run.phase = Phase::Traversing {
                    connection,
                    progress: next,
                    reverse,
                };
            }
        }
        Phase::Settling { remaining } => {
            let left = remaining.saturating_sub(dt);
            if left.is_zero() {
                run.clear(ctx, &mut out);
                out.events.push(DiagramEvent::SimulationFinished {
                    id: run.simulation.clone(),
                });
                out.run_done = true;
                run.phase = Phase::Done;
            } else {
                run.phase = Phase::Settling { remaining: left };
            }
        }
        Phase::Done => {}
    }
    (run, out)
}

fn cancel_now(run: &mut AnimationRun, ctx: &AnimationContext<'_>, out: &mut StepReport) {
    run.clear(ctx, out);
    out.events.push(DiagramEvent::SimulationCancelled {
        id: run.simulation.clone(),
    });
    out.run_done = true;
    run.phase = Phase::Done;
}

fn start_next_hop(run: &mut AnimationRun, ctx: &AnimationContext<'_>, out: &mut StepReport) {
    while run.hop + 1 < run.route.len() {
        let from = run.route[run.hop].clone();
        let to = run.route[run.hop + 1].clone();

        let candidate = ctx.scene.iter().find(|r| {
            let joins = (r.from == from && r.to == to) || (r.from == to && r.to == from);
            joins
                && ctx
                    .diagram
                    .connection(r.index)
                    .is_some_and(|c| ctx.filter.is_visible(c))
        });
        let (Some(resolved), Some(from_node)) = (candidate, ctx.diagram.node(&from)) else {
            tracing::debug!(simulation = %run.simulation, %from, %to, "hop has no visible connector; skipped");
            out.events
                .push(DiagramEvent::SimulationHopSkipped { from, to });
            run.hop += 1;
            continue;
        };

        let origin = anchor::center(from_node);
        let reverse = geom::distance(resolved.path.end, origin)
            < geom::distance(resolved.path.start, origin);
        let connection = resolved.index;

        run.highlight(EntityRef::Node(from.clone()), out);
        run.highlight(EntityRef::Node(to.clone()), out);
        run.highlight(EntityRef::Connection(connection), out);
        out.diffs
            .push(EntityDiff::new(EntityRef::Marker, true, false));
        run.marker_shown = true;
        out.events
            .push(DiagramEvent::SimulationHopStarted { from, to });
        out.marker = sample_marker(ctx, connection, 0.0, reverse);
        run.phase = Phase::Traversing {
            connection,
            progress: 0.0,
            reverse,
        };
        return;
    }

    let delay = Duration::from_millis(ctx.diagram.settings().settle_delay_ms);
    run.phase = Phase::Settling { remaining: delay };
}

fn sample_marker(
    ctx: &AnimationContext<'_>,
    connection: usize,
    progress: f64,
    reverse: bool,
) -> Option<MarkerSample> {
    let r = ctx.scene.get(connection)?;
    let len = r.total_length();
    let s = if reverse {
        len * (1.0 - progress)
    } else {
        len * progress
    };
    let p = r.point_at_length(s);
    let radius = ctx.diagram.settings().marker_radius;
    Some(MarkerSample {
        connection,
        progress,
        reverse,
        point: p.into(),
        origin: geom::point(p.x - radius, p.y - radius).into(),
    })
}

/// Owns at most one run. Starting a new run cancels the one in flight first.
#[derive(Debug, Default)]
pub struct Animator {
    run: Option<AnimationRun>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.run.is_some()
    }

    pub fn current(&self) -> Option<&AnimationRun> {
        self.run.as_ref()
    }

    pub fn start(
        &mut self,
        sim: &Simulation,
        ctx: &AnimationContext<'_>,
    ) -> (CancellationToken, StepReport) {
        let mut out = self.cancel(ctx);
        out.run_done = false;
        let run = AnimationRun::new(sim);
        let token = run.token();
        tracing::debug!(simulation = %sim.id, hops = sim.route.len().saturating_sub(1), "simulation started");
        out.events.push(DiagramEvent::SimulationStarted {
            id: sim.id.clone(),
        });
        self.run = Some(run);
        (token, out)
    }

    /// Cancels the in-flight run immediately, clearing its highlights.
    pub fn cancel(&mut self, ctx: &AnimationContext<'_>) -> StepReport {
        let mut out = StepReport::default();
        if let Some(mut run) = self.run.take() {
            run.token.cancel();
            cancel_now(&mut run, ctx, &mut out);
        }
        out
    }

    pub fn tick(&mut self, ctx: &AnimationContext<'_>, dt: Duration) -> StepReport {
        let Some(run) = self.run.take() else {
            return StepReport::default();
        };
        let (run, out) = step(run, ctx, dt);
        if !out.run_done {
            self.run = Some(run);
        }
        out
    }

    /// Ticks until the current hop resolves or the run ends, merging every report.
    pub fn tick_until_hop_done(
        &mut self,
        ctx: &AnimationContext<'_>,
        dt: Duration,
        max_ticks: usize,
    ) -> StepReport {
        let mut merged = StepReport::default();
        for _ in 0..max_ticks {
            let out = self.tick(ctx, dt);
            let stop = out.hop_done || out.run_done;
            merged.absorb(out);
            if stop || !self.is_active() {
                break;
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archmap_core::{ConfigFormat, DiagramConfig};

    const ROUTE: &str = r#"{
        "nodes": [
            { "id": "A", "x": 0, "y": 0, "w": 100, "h": 60 },
            { "id": "B", "x": 300, "y": 0, "w": 100, "h": 60 },
            { "id": "C", "x": 600, "y": 0, "w": 100, "h": 60 }
        ],
        "layers": [{ "id": "sip", "active": false }, { "id": "rtp", "active": true }],
        "connections": [
            { "from": "A", "to": "B", "type": "sip" },
            { "from": "C", "to": "B", "type": "rtp" }
        ],
        "simulations": [{ "id": "call", "nodes": ["A", "B", "C"] }],
        "settings": { "progressStep": 0.25, "settleDelayMs": 100 }
    }"#;

    fn fixture() -> (Diagram, Scene, LayerFilter) {
        let d = Diagram::from_config(
            DiagramConfig::from_str_with_format(ROUTE, ConfigFormat::Json).unwrap(),
        );
        let s = Scene::build(&d);
        let f = LayerFilter::new(d.layers());
        (d, s, f)
    }

    #[test]
    fn hidden_hop_is_skipped_and_visible_hop_traversed_in_reverse() {
        let (d, s, f) = fixture();
        let ctx = AnimationContext {
            diagram: &d,
            scene: &s,
            filter: &f,
        };
        let run = AnimationRun::new(d.simulation("call").unwrap());
        let (run, out) = step(run, &ctx, Duration::from_millis(16));

        assert_eq!(
            out.events,
            vec![
                DiagramEvent::SimulationHopSkipped {
                    from: "A".into(),
                    to: "B".into()
                },
                DiagramEvent::SimulationHopStarted {
                    from: "B".into(),
                    to: "C".into()
                },
            ]
        );
        assert!(!out.diffs.iter().any(|d| d.entity == EntityRef::Connection(0)));
        assert!(out.diffs.contains(&EntityDiff::new(EntityRef::Connection(1), true, true)));
        assert!(out.diffs.contains(&EntityDiff::new(EntityRef::Node("B".into()), true, true)));
        assert!(!out.diffs.contains(&EntityDiff::new(EntityRef::Node("A".into()), true, true)));

        // Stored path runs C -> B; the hop departs from B.
        let Phase::Traversing { reverse, .. } = run.phase() else {
            panic!("expected traversal, got {:?}", run.phase());
        };
        assert!(reverse);
        let m = out.marker.unwrap();
        assert_eq!(m.point, PointOut { x: 400.0, y: 30.0 });
        assert_eq!(m.origin, PointOut { x: 394.0, y: 24.0 });
    }

    #[test]
    fn run_settles_then_clears_highlights() {
        let (d, s, f) = fixture();
        let ctx = AnimationContext {
            diagram: &d,
            scene: &s,
            filter: &f,
        };
        let mut animator = Animator::new();
        let (_token, started) = animator.start(d.simulation("call").unwrap(), &ctx);
        assert_eq!(
            started.events,
            vec![DiagramEvent::SimulationStarted { id: "call".into() }]
        );

        let dt = Duration::from_millis(40);
        let hop = animator.tick_until_hop_done(&ctx, dt, 100);
        assert!(hop.hop_done);
        let last = hop.marker.unwrap();
        assert_eq!(last.progress, 1.0);
        assert!((last.point.x - 600.0).abs() < 1e-9);

        // Enter settling, then wait it out (100ms at 40ms per tick).
        let mut finished = None;
        for _ in 0..10 {
            let out = animator.tick(&ctx, dt);
            if out.run_done {
                finished = Some(out);
                break;
            }
        }
        let out = finished.expect("run should finish");
        assert!(!animator.is_active());
        assert!(out.events.contains(&DiagramEvent::SimulationFinished { id: "call".into() }));
        assert!(out.diffs.contains(&EntityDiff::new(EntityRef::Marker, false, false)));
        assert!(out.diffs.contains(&EntityDiff::new(EntityRef::Connection(1), true, false)));
        assert!(out.diffs.contains(&EntityDiff::new(EntityRef::Node("C".into()), true, false)));
    }

    #[test]
    fn token_cancels_in_flight_run() {
        let (d, s, f) = fixture();
        let ctx = AnimationContext {
            diagram: &d,
            scene: &s,
            filter: &f,
        };
        let mut animator = Animator::new();
        let (token, _) = animator.start(d.simulation("call").unwrap(), &ctx);
        animator.tick(&ctx, Duration::ZERO);
        token.cancel();
        let out = animator.tick(&ctx, Duration::ZERO);
        assert!(out.run_done);
        assert!(!animator.is_active());
        assert_eq!(
            out.events,
            vec![DiagramEvent::SimulationCancelled { id: "call".into() }]
        );
        assert!(out.diffs.iter().all(|d| !d.highlighted));
    }

    #[test]
    fn restarting_cancels_previous_run_first() {
        let (d, s, f) = fixture();
        let ctx = AnimationContext {
            diagram: &d,
            scene: &s,
            filter: &f,
        };
        let mut animator = Animator::new();
        let sim = d.simulation("call").unwrap();
        let (first, _) = animator.start(sim, &ctx);
        animator.tick(&ctx, Duration::ZERO);
        let (second, out) = animator.start(sim, &ctx);
        assert_eq!(
            out.events,
            vec![
                DiagramEvent::SimulationCancelled { id: "call".into() },
                DiagramEvent::SimulationStarted { id: "call".into() },
            ]
        );
        assert!(!out.run_done);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(animator.is_active());
    }
}
