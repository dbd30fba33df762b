//! Simulation core for a vertically scrolling bullet-hell stage.
//!
//! The [`stage::Stage`] owns every live gameplay object and advances them
//! one frame at a time: input, behaviour, physics sub-steps, script
//! coroutines, cleanup. Rendering, audio and asset decoding stay outside
//! and only read what the stage exposes.

pub mod assets;
pub mod boss;
pub mod catalog;
pub mod config;
pub mod entities;
pub mod error;
pub mod events;
pub mod handle;
pub mod input;
pub mod math;
pub mod physics;
pub mod player;
pub mod rng;
pub mod script;
pub mod shot;
pub mod stage;
pub mod stats;
pub mod store;
pub mod world;

pub use error::StageError;
pub use handle::{InstanceId, ObjectKind};
pub use stage::Stage;
