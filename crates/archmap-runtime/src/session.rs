//! The explicit session object: one writer for viewport, filter, drag and animation state.

use crate::animator::{AnimationContext, Animator, CancellationToken, MarkerSample, StepReport};
use crate::event::{DiagramEvent, EntityDiff, EntityRef, Inspection};
use crate::interaction::{Effect, HitTarget, InteractionController};
use archmap_core::anchor;
use archmap_core::geom::{self, Point, PointOut, RectOut, Size};
use archmap_core::{Diagram, DiagramConfig, LayerFilter, PathDescriptor, Scene, Viewport};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFrame {
    pub id: String,
    pub label: String,
    pub local: RectOut,
    pub screen: RectOut,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteFrame {
    pub id: String,
    pub label: String,
    pub local: RectOut,
    pub screen: RectOut,
}

/// Everything a renderer needs to draw the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub transform: String,
    pub scale: f64,
    pub pan: PointOut,
    pub nodes: Vec<NodeFrame>,
    pub sites: Vec<SiteFrame>,
    pub connections: Vec<PathDescriptor>,
    pub active_layers: Vec<String>,
    pub preview: Option<String>,
    pub marker: Option<MarkerSample>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStatus {
    pub hop_done: bool,
    pub run_done: bool,
}

#[derive(Debug)]
pub struct ArchitectureMap {
    diagram: Diagram,
    scene: Scene,
    filter: LayerFilter,
    viewport: Viewport,
    animator: Animator,
    interaction: InteractionController,
    visibility: Vec<bool>,
    inspection: Option<Inspection>,
    marker: Option<MarkerSample>,
    events: Vec<DiagramEvent>,
    diffs: Vec<EntityDiff>,
}

impl ArchitectureMap {
    pub fn new(diagram: Diagram) -> Self {
        let settings = diagram.settings();
        let (px, py) = settings.initial_pan;
        let viewport = Viewport::new(geom::vector(px, py), settings.initial_scale);
        let interaction = InteractionController::new(settings.click_threshold);
        let scene = Scene::build(&diagram);
        let filter = LayerFilter::new(diagram.layers());
        let visibility = filter.evaluate(diagram.connections());
        tracing::debug!(
            nodes = diagram.nodes().count(),
            connections = scene.len(),
            layers = diagram.layers().len(),
            "architecture map loaded"
        );
        Self {
            diagram,
            scene,
            filter,
            viewport,
            animator: Animator::new(),
            interaction,
            visibility,
            inspection: None,
            marker: None,
            events: Vec::new(),
            diffs: Vec::new(),
        }
    }

    pub fn from_config(cfg: DiagramConfig) -> Self {
        Self::new(Diagram::from_config(cfg))
    }

    pub fn load(path: impl AsRef<Path>) -> archmap_core::Result<Self> {
        Ok(Self::from_config(DiagramConfig::load(path)?))
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn filter(&self) -> &LayerFilter {
        &self.filter
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn inspection(&self) -> Option<&Inspection> {
        self.inspection.as_ref()
    }

    pub fn marker(&self) -> Option<&MarkerSample> {
        self.marker.as_ref()
    }

    pub fn is_simulating(&self) -> bool {
        self.animator.is_active()
    }

    /// Current visibility of connection `index` (false for unknown indices).
    pub fn is_connection_visible(&self, index: usize) -> bool {
        self.visibility.get(index).copied().unwrap_or(false)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Resolves what lies under a screen point: topmost node, then topmost visible connector.
    pub fn hit_test(&self, screen: Point) -> HitTarget {
        let local = self.viewport.screen_to_local(screen);
        let node = self
            .diagram
            .nodes()
            .rev()
            .find(|n| anchor::contains(n, local));
        if let Some(n) = node {
            return HitTarget::Node {
                id: n.id.clone(),
                position: n.position,
            };
        }
        match self.scene.hit_test(&self.diagram, &self.filter, local) {
            Some(index) => HitTarget::Connection(index),
            None => HitTarget::Background,
        }
    }

    pub fn pointer_down(&mut self, screen: Point) {
        let target = self.hit_test(screen);
        let locked = self.animator.is_active();
        let effects = self
            .interaction
            .pointer_down(target, screen, &self.viewport, locked);
        self.apply(effects);
    }

    pub fn pointer_move(&mut self, screen: Point) {
        let effects = self.interaction.pointer_move(screen, &self.viewport);
        self.apply(effects);
    }

    pub fn pointer_up(&mut self, screen: Point) {
        let effects = self.interaction.pointer_up(screen);
        self.apply(effects);
    }

    pub fn wheel(&mut self, delta: f64) {
        let k = self.diagram.settings().zoom_sensitivity;
        self.viewport.zoom(delta, k);
    }

    /// Pans so the center of `node_id` lands in the middle of a screen of `screen` size.
    pub fn center_on_node(&mut self, node_id: &str, screen: Size) -> bool {
        let Some(node) = self.diagram.node(node_id) else {
            return false;
        };
        let c = anchor::center(node);
        self.viewport.center_on(c, screen);
        true
    }

    /// Flips a layer. Undeclared ids are ignored and return `None`.
    pub fn toggle_layer(&mut self, id: &str) -> Option<bool> {
        let active = self.filter.toggle(id)?;
        self.events.push(DiagramEvent::LayerToggled {
            id: id.to_string(),
            active,
        });
        self.refresh_visibility();
        Some(active)
    }

    pub fn reset_layers(&mut self) {
        self.filter.reset_all();
        self.events.push(DiagramEvent::LayersReset);
        self.refresh_visibility();
    }

    /// Starts (`Some`) or ends (`None`) a hover preview of one tag.
    pub fn preview_layer(&mut self, tag: Option<&str>) {
        match tag {
            Some(t) => self.filter.set_preview(t),
            None => self.filter.clear_preview(),
        }
        self.events.push(DiagramEvent::LayerPreview {
            id: tag.map(str::to_string),
        });
        self.refresh_visibility();
    }

    /// Starts a simulation, cancelling any run in flight. Unknown ids are a no-op.
    pub fn run_simulation(&mut self, id: &str) -> Option<CancellationToken> {
        let Some(sim) = self.diagram.simulation(id) else {
            tracing::debug!(simulation = %id, "unknown simulation; ignored");
            return None;
        };
        self.interaction.cancel();
        let ctx = AnimationContext {
            diagram: &self.diagram,
            scene: &self.scene,
            filter: &self.filter,
        };
        let (token, report) = self.animator.start(sim, &ctx);
        self.marker = None;
        self.absorb(report);
        Some(token)
    }

    pub fn cancel_simulation(&mut self) {
        let ctx = AnimationContext {
            diagram: &self.diagram,
            scene: &self.scene,
            filter: &self.filter,
        };
        let report = self.animator.cancel(&ctx);
        self.absorb(report);
    }

    /// Advances the running simulation, if any, by one tick.
    pub fn tick(&mut self, dt: Duration) -> TickStatus {
        let ctx = AnimationContext {
            diagram: &self.diagram,
            scene: &self.scene,
            filter: &self.filter,
        };
        let report = self.animator.tick(&ctx, dt);
        let status = TickStatus {
            hop_done: report.hop_done,
            run_done: report.run_done,
        };
        self.absorb(report);
        status
    }

    pub fn drain_events(&mut self) -> Vec<DiagramEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn drain_diffs(&mut self) -> Vec<EntityDiff> {
        std::mem::take(&mut self.diffs)
    }

    pub fn frame(&self) -> Frame {
        let highlighted = self
            .animator
            .current()
            .map(|r| r.highlighted())
            .unwrap_or_default();
        let nodes = self
            .diagram
            .nodes()
            .map(|n| NodeFrame {
                id: n.id.clone(),
                label: n.label.clone(),
                local: n.rect().into(),
                screen: self.viewport.local_rect_to_screen(n.rect()).into(),
                highlighted: highlighted.contains(&EntityRef::Node(n.id.clone())),
            })
            .collect();
        let sites = self
            .diagram
            .sites()
            .iter()
            .map(|s| SiteFrame {
                id: s.id.clone(),
                label: s.label.clone(),
                local: s.rect.into(),
                screen: self.viewport.local_rect_to_screen(s.rect).into(),
            })
            .collect();
        let pan = self.viewport.pan();
        Frame {
            transform: self.viewport.css_transform(),
            scale: self.viewport.scale(),
            pan: geom::point(pan.x, pan.y).into(),
            nodes,
            sites,
            connections: self.scene.descriptors(&self.diagram, &self.filter),
            active_layers: self.filter.active_layers().map(str::to_string).collect(),
            preview: self.filter.preview().map(str::to_string),
            marker: self.marker,
        }
    }

    fn is_highlighted(&self, entity: &EntityRef) -> bool {
        self.animator
            .current()
            .is_some_and(|r| r.highlighted().contains(entity))
    }

    fn refresh_visibility(&mut self) {
        let next = self.filter.evaluate(self.diagram.connections());
        for (index, (&before, &after)) in self.visibility.iter().zip(&next).enumerate() {
            if before == after || self.scene.get(index).is_none() {
                continue;
            }
            let entity = EntityRef::Connection(index);
            let highlighted = self.is_highlighted(&entity);
            self.diffs.push(EntityDiff::new(entity, after, highlighted));
        }
        self.visibility = next;
    }

    fn absorb(&mut self, report: StepReport) {
        if report.run_done {
            self.marker = None;
        } else if report.marker.is_some() {
            self.marker = report.marker;
        }
        self.events.extend(report.events);
        self.diffs.extend(report.diffs);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::PanTo(pan) => self.viewport.set_pan(pan),
                Effect::MoveNode { id, position } => {
                    if !self.diagram.set_node_position(&id, position) {
                        continue;
                    }
                    let touched = self.scene.refresh_node(&self.diagram, &id);
                    tracing::trace!(node = %id, connections = touched.len(), "node moved");
                    self.events.push(DiagramEvent::NodeMoved {
                        id,
                        position: position.into(),
                    });
                }
                Effect::InspectNode(id) => {
                    if let Some(inspection) = self.inspect_node(&id) {
                        self.inspection = Some(inspection.clone());
                        self.events.push(DiagramEvent::Inspect(inspection));
                    }
                }
                Effect::InspectConnection(index) => {
                    if let Some(inspection) = self.inspect_connection(index) {
                        self.inspection = Some(inspection.clone());
                        self.events.push(DiagramEvent::Inspect(inspection));
                    }
                }
                Effect::CloseInspection => {
                    if self.inspection.take().is_some() {
                        self.events.push(DiagramEvent::InspectionClosed);
                    }
                }
            }
        }
    }

    fn inspect_node(&self, id: &str) -> Option<Inspection> {
        let node = self.diagram.node(id)?;
        let docs = self.diagram.documentation(&node.node_type);
        let title = if node.label.is_empty() {
            node.id.clone()
        } else {
            node.label.clone()
        };
        Some(Inspection::Node {
            id: node.id.clone(),
            title,
            role: docs
                .map(|d| d.role.clone())
                .filter(|role| !role.is_empty()),
            blocks: docs
                .map(|d| {
                    d.blocks
                        .iter()
                        .map(|b| (b.title.clone(), b.content.clone()))
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    fn inspect_connection(&self, index: usize) -> Option<Inspection> {
        let c = self.diagram.connection(index)?;
        let title = if c.label.is_empty() {
            format!("{} - {}", c.from, c.to)
        } else {
            c.label.clone()
        };
        Some(Inspection::Connection {
            index,
            title,
            detail: c.detail.clone(),
            color: self.diagram.connection_color(c).to_string(),
        })
    }
}
