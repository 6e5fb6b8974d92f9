#![forbid(unsafe_code)]

//! Architecture map model + connector geometry (headless).
//!
//! Design goals:
//! - node sizes are authoritative data, so every geometric result is testable without a UI
//! - connector geometry lives in local (canvas) space; pan/zoom is one shared affine transform
//! - faults are resolved by omission (dangling connections, degenerate geometry), never by
//!   aborting the whole diagram

pub mod anchor;
pub mod config;
pub mod error;
pub mod geom;
pub mod layers;
pub mod model;
pub mod path;
pub mod scene;
pub mod viewport;

pub use config::{ConfigFormat, DiagramConfig, Settings};
pub use error::{Error, Result};
pub use layers::LayerFilter;
pub use model::{Connection, Diagram, Layer, Node, PairKey, Simulation, Site};
pub use path::{ArcLengthTable, Axis, CubicPath};
pub use scene::{PathDescriptor, ResolvedConnection, Scene};
pub use viewport::Viewport;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
