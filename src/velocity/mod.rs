//! Velocity channels for exported meshes.
//!
//! - [`Scene`] - Host scene boundary
//! - [`TimeGuard`] - Restores the scene time on scope exit
//! - [`estimate_velocities`] - Authored or resampled per-vertex velocity
//! - [`ScriptedScene`] - Scene defined by closures of time

mod estimate;
mod scene;
mod scripted;

pub use estimate::{
    candidate_time_steps, estimate_velocities, VelocityReport, FALLBACK_TIME_STEP, INITIAL_TIME_STEP,
};
pub use scene::{Scene, TimeGuard};
pub use scripted::{ScriptedObject, ScriptedScene};
