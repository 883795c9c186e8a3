/*
 * Flocking Engine - Module Definitions
 *
 * This file defines the module structure of the flocking engine. Flocks of
 * agents interact through separation, alignment and cohesion zones, may be
 * coupled to other flocks, wander along a noise field and avoid an external
 * silhouette. Rendering, input and image processing live outside the crate.
 */

// Re-export key components for easier access
pub use agent::Agent;
pub use boundary::BoundaryFrame;
pub use color::{ColorPolicy, CrowdColor, FixedColor};
pub use config::{BoundarySpec, ColorSpec, FlockSpec, SimulationConfig};
pub use debug::TickStats;
pub use error::{FlockError, Result};
pub use flock::{AgentView, FlockManager};
pub use params::FlockParams;
pub use physics::{FlockSnapshot, Regime};
pub use registry::{FlockId, FlockRegistry};
pub use wander::WanderField;

// Define modules
pub mod agent;
pub mod boundary;
pub mod color;
pub mod config;
pub mod debug;
pub mod error;
pub mod flock;
pub mod params;
pub mod physics;
pub mod registry;
pub mod wander;
