//! Discrete events and declarative visual diffs emitted for a rendering layer.

use archmap_core::geom::PointOut;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum EntityRef {
    Node(String),
    Connection(usize),
    /// The single travelling simulation marker.
    Marker,
}

/// Desired visual state of one entity. Renderers apply these verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDiff {
    pub entity: EntityRef,
    pub visible: bool,
    pub highlighted: bool,
}

impl EntityDiff {
    pub fn new(entity: EntityRef, visible: bool, highlighted: bool) -> Self {
        Self {
            entity,
            visible,
            highlighted,
        }
    }
}

/// Content an inspector panel would show. The panel itself lives outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Inspection {
    #[serde(rename_all = "camelCase")]
    Node {
        id: String,
        title: String,
        role: Option<String>,
        blocks: Vec<(String, String)>,
    },
    #[serde(rename_all = "camelCase")]
    Connection {
        index: usize,
        title: String,
        detail: String,
        color: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DiagramEvent {
    #[serde(rename_all = "camelCase")]
    NodeMoved { id: String, position: PointOut },
    #[serde(rename_all = "camelCase")]
    LayerToggled { id: String, active: bool },
    LayersReset,
    #[serde(rename_all = "camelCase")]
    LayerPreview { id: Option<String> },
    #[serde(rename_all = "camelCase")]
    SimulationStarted { id: String },
    #[serde(rename_all = "camelCase")]
    SimulationHopStarted { from: String, to: String },
    #[serde(rename_all = "camelCase")]
    SimulationHopSkipped { from: String, to: String },
    #[serde(rename_all = "camelCase")]
    SimulationFinished { id: String },
    #[serde(rename_all = "camelCase")]
    SimulationCancelled { id: String },
    Inspect(Inspection),
    InspectionClosed,
}
