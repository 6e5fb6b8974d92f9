//! In-memory diagram records built from a [`DiagramConfig`].
//!
//! The diagram owns every node, connection, layer and simulation for its lifetime. Only node
//! positions are mutable after load.

use crate::config::{
    DiagramConfig, DocumentationConfig, NodeTypeConfig, Settings, ThemeConfig,
};
use crate::geom::{self, Point, Rect, Size};
use indexmap::IndexMap;
use serde::Serialize;

/// Fallback connector color when neither the connection nor its layer names one.
pub const FALLBACK_COLOR: &str = "#fff";

/// Tag carried by connections declared with `isWan: true`.
pub const WAN_TAG: &str = "wan";

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub node_type: String,
    pub position: Point,
    pub size: Size,
    pub label: String,
    pub sub: String,
    pub tag: Option<String>,
    pub tag_class: Option<String>,
    pub icon: Option<String>,
    pub icon_color: Option<String>,
    pub icon_bg: Option<String>,
}

impl Node {
    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }
}

/// Node display metadata after merging per-node overrides over the node type defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAppearance {
    pub icon: Option<String>,
    pub icon_color: Option<String>,
    pub icon_bg: Option<String>,
    pub header_bg: Option<String>,
    pub header_color: Option<String>,
    pub style: Option<String>,
}

/// Unordered endpoint pair. `PairKey::new("a", "b") == PairKey::new("b", "a")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(String, String);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Declaration index; stable identity of the connection for the diagram lifetime.
    pub index: usize,
    pub from: String,
    pub to: String,
    pub layer: String,
    pub wan: bool,
    /// Explicit curve offset. `None` means the offset is derived from sibling spacing.
    pub curve: Option<f64>,
    pub color: Option<String>,
    pub dash: bool,
    pub label: String,
    pub detail: String,
}

impl Connection {
    /// Layer tags the connection carries: its primary type, plus `wan` when flagged.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.layer.as_str()).chain(self.wan.then_some(WAN_TAG))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().any(|t| t == tag)
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.from, &self.to)
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.from == node_id || self.to == node_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub id: String,
    pub label: String,
    pub color: String,
    pub active: bool,
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub route: Vec<String>,
}

impl Simulation {
    /// Consecutive `(from, to)` pairs of the route.
    pub fn hops(&self) -> impl Iterator<Item = (&str, &str)> {
        self.route
            .windows(2)
            .map(|w| (w[0].as_str(), w[1].as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub id: String,
    pub label: String,
    pub rect: Rect,
}

#[derive(Debug, Clone)]
pub struct Diagram {
    nodes: IndexMap<String, Node>,
    connections: Vec<Connection>,
    layers: Vec<Layer>,
    simulations: Vec<Simulation>,
    sites: Vec<Site>,
    node_types: IndexMap<String, NodeTypeConfig>,
    documentation: IndexMap<String, DocumentationConfig>,
    theme: ThemeConfig,
    settings: Settings,
}

impl Diagram {
    pub fn from_config(cfg: DiagramConfig) -> Self {
        let settings = cfg.settings;

        let mut nodes: IndexMap<String, Node> = IndexMap::with_capacity(cfg.nodes.len());
        for n in cfg.nodes {
            if nodes.contains_key(&n.id) {
                tracing::debug!(node = %n.id, "duplicate node id; keeping the first declaration");
                continue;
            }
            let w = n.w.filter(|v| v.is_finite() && *v >= 0.0);
            let h = n.h.filter(|v| v.is_finite() && *v >= 0.0);
            let node = Node {
                id: n.id.clone(),
                node_type: n.node_type,
                position: geom::point(n.x, n.y),
                size: geom::size(
                    w.unwrap_or(settings.default_node_width),
                    h.unwrap_or(settings.default_node_height),
                ),
                label: n.label,
                sub: n.sub,
                tag: n.tag,
                tag_class: n.tag_class,
                icon: n.icon,
                icon_color: n.icon_color,
                icon_bg: n.icon_bg,
            };
            nodes.insert(n.id, node);
        }

        let connections = cfg
            .connections
            .into_iter()
            .enumerate()
            .map(|(index, c)| Connection {
                index,
                from: c.from,
                to: c.to,
                layer: c.layer,
                wan: c.is_wan,
                curve: c.curve.filter(|v| v.is_finite()),
                color: c.color,
                dash: c.dash,
                label: c.label,
                detail: c.detail,
            })
            .collect();

        let layers = cfg
            .layers
            .into_iter()
            .map(|l| Layer {
                id: l.id,
                label: l.label,
                color: l.color,
                active: l.active,
                group: l.group,
            })
            .collect();

        let simulations = cfg
            .simulations
            .into_iter()
            .filter_map(|s| {
                if s.nodes.len() < 2 {
                    tracing::debug!(simulation = %s.id, "simulation route has fewer than two nodes; skipped");
                    return None;
                }
                Some(Simulation {
                    id: s.id,
                    label: s.label,
                    icon: s.icon,
                    route: s.nodes,
                })
            })
            .collect();

        let sites = cfg
            .sites
            .into_iter()
            .map(|s| Site {
                id: s.id,
                label: s.label,
                rect: geom::rect(s.x, s.y, s.w, s.h),
            })
            .collect();

        Self {
            nodes,
            connections,
            layers,
            simulations,
            sites,
            node_types: cfg.node_types,
            documentation: cfg.documentation,
            theme: cfg.theme,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn theme(&self) -> &ThemeConfig {
        &self.theme
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Nodes in declaration order. Later nodes paint above earlier ones.
    pub fn nodes(&self) -> indexmap::map::Values<'_, String, Node> {
        self.nodes.values()
    }

    /// Moves a node to a new local position. Returns `false` for unknown ids.
    pub fn set_node_position(&mut self, id: &str, position: Point) -> bool {
        match self.nodes.get_mut(id) {
            Some(n) => {
                n.position = position;
                true
            }
            None => false,
        }
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, index: usize) -> Option<&Connection> {
        self.connections.get(index)
    }

    /// True when both endpoints reference existing nodes.
    pub fn is_resolvable(&self, conn: &Connection) -> bool {
        self.nodes.contains_key(&conn.from) && self.nodes.contains_key(&conn.to)
    }

    /// First connection (declaration order) whose unordered endpoints equal `{a, b}`.
    pub fn connection_between(&self, a: &str, b: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.connects(a, b))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Layers without a group, in declaration order.
    pub fn core_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.group.is_none())
    }

    /// Grouped layers keyed by group name, groups in first-seen order.
    pub fn grouped_layers(&self) -> IndexMap<&str, Vec<&Layer>> {
        let mut out: IndexMap<&str, Vec<&Layer>> = IndexMap::new();
        for l in &self.layers {
            if let Some(g) = l.group.as_deref() {
                out.entry(g).or_default().push(l);
            }
        }
        out
    }

    /// Display color: explicit override, else the primary layer color, else [`FALLBACK_COLOR`].
    pub fn connection_color<'a>(&'a self, conn: &'a Connection) -> &'a str {
        if let Some(c) = conn.color.as_deref() {
            return c;
        }
        self.layer(&conn.layer)
            .map(|l| l.color.as_str())
            .unwrap_or(FALLBACK_COLOR)
    }

    pub fn simulations(&self) -> &[Simulation] {
        &self.simulations
    }

    pub fn simulation(&self, id: &str) -> Option<&Simulation> {
        self.simulations.iter().find(|s| s.id == id)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn node_type(&self, node_type: &str) -> Option<&NodeTypeConfig> {
        self.node_types.get(node_type)
    }

    pub fn documentation(&self, node_type: &str) -> Option<&DocumentationConfig> {
        self.documentation.get(node_type)
    }

    pub fn appearance(&self, node: &Node) -> NodeAppearance {
        let ty = self.node_type(&node.node_type);
        let pick = |own: &Option<String>, fallback: Option<&Option<String>>| {
            own.clone().or_else(|| fallback.and_then(|v| v.clone()))
        };
        NodeAppearance {
            icon: pick(&node.icon, ty.map(|t| &t.icon)),
            icon_color: pick(&node.icon_color, ty.map(|t| &t.icon_color)),
            icon_bg: pick(&node.icon_bg, ty.map(|t| &t.icon_bg)),
            header_bg: ty.and_then(|t| t.header_bg.clone()),
            header_color: ty.and_then(|t| t.header_color.clone()),
            style: ty.and_then(|t| t.style.clone()),
        }
    }
}
