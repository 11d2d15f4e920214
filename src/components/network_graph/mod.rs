//! Layout and animation engine for neural-network graphs, plus the canvas
//! component that hosts it.

pub mod animation;
mod component;
pub mod config;
pub mod engine;
pub mod layout;
mod render;
pub mod types;

pub use component::NetworkGraphCanvas;
pub use engine::{EngineEvent, FrameScheduler, GraphEngine, RenderFrame, RenderSurface};
pub use layout::{LayoutKind, LayoutOptions};
pub use types::{NetworkDescription, NetworkType, TrainingMetrics};
