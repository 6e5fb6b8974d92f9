#![forbid(unsafe_code)]

//! Interaction and route-simulation runtime for `archmap-core` diagrams.
//!
//! [`ArchitectureMap`] is the single session object: it owns the diagram, the resolved scene,
//! the layer filter, the viewport, the pointer gesture state and the animator. Rendering layers
//! feed it pointer/wheel/tick input and read back [`Frame`]s, [`DiagramEvent`]s and
//! [`EntityDiff`]s.

pub mod animator;
pub mod event;
pub mod interaction;
pub mod session;

pub use animator::{AnimationRun, Animator, CancellationToken, MarkerSample, Phase, StepReport};
pub use event::{DiagramEvent, EntityDiff, EntityRef, Inspection};
pub use interaction::{Effect, HitTarget, InteractionController};
pub use session::{ArchitectureMap, Frame, NodeFrame, SiteFrame, TickStatus};
