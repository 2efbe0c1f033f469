//! Host scene boundary used when exporting meshes.

use std::ops::{Deref, DerefMut};

use crate::geom::MeshSample;
use crate::util::{Frame, Mat4, Result, Vec3};

/// The parts of a host scene the exporter needs.
///
/// The scene has one global current time. Changing it re-evaluates every
/// object, so callers batch all work for one time before moving on.
pub trait Scene {
    /// Global current frame.
    fn current_time(&self) -> Frame;

    /// Move the global current frame.
    fn set_time(&mut self, frame: Frame) -> Result<()>;

    /// Scene frames per second.
    fn frames_per_second(&self) -> f64;

    /// First and last frame of the playback range.
    fn playback_range(&self) -> (Frame, Frame);

    /// Currently selected objects.
    fn selection(&self) -> Vec<String>;

    /// Mesh of `object` at the current time, in world or object space.
    fn sample_mesh(&self, object: &str, world_space: bool) -> Result<MeshSample>;

    /// Authored per-vertex velocities in object space, units per frame.
    fn authored_velocities(&self, object: &str) -> Result<Option<Vec<Vec3>>>;

    /// Object-to-world matrix of `object` at `frame`, without moving the current time.
    fn world_matrix(&self, object: &str, frame: Frame) -> Result<Mat4>;

    /// Check if `object` is visible at the current time.
    fn is_visible(&self, object: &str) -> Result<bool>;

    /// Material name of every face of `object`, if it has materials.
    fn face_materials(&self, object: &str) -> Result<Option<Vec<String>>>;
}

/// Restores the scene time on drop if it was moved through the guard.
///
/// Derefs to the scene so it can be used while the guard is alive.
pub struct TimeGuard<'a, S: Scene + ?Sized> {
    scene: &'a mut S,
    restore: Frame,
    moved: bool,
}

impl<'a, S: Scene + ?Sized> TimeGuard<'a, S> {
    /// Remember the current time of `scene`.
    pub fn new(scene: &'a mut S) -> Self {
        let restore = scene.current_time();
        Self { scene, restore, moved: false }
    }

    /// Time restored on drop.
    pub fn restore_time(&self) -> Frame {
        self.restore
    }

    /// Move the scene time.
    pub fn set_time(&mut self, frame: Frame) -> Result<()> {
        self.moved = true;
        self.scene.set_time(frame)
    }
}

impl<S: Scene + ?Sized> Deref for TimeGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.scene
    }
}

impl<S: Scene + ?Sized> DerefMut for TimeGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.scene
    }
}

impl<S: Scene + ?Sized> Drop for TimeGuard<'_, S> {
    fn drop(&mut self) {
        if !self.moved {
            return;
        }
        if let Err(e) = self.scene.set_time(self.restore) {
            tracing::warn!(frame = self.restore, error = %e, "failed to restore scene time");
        }
    }
}
