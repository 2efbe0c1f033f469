//! Scene driven by closures of time.

use std::collections::HashMap;

use crate::geom::MeshSample;
use crate::util::{Error, Frame, Mat4, Result, Vec3, Vec4};

use super::scene::Scene;

type MeshFn = Box<dyn Fn(Frame) -> MeshSample + Send + Sync>;
type MatrixFn = Box<dyn Fn(Frame) -> Mat4 + Send + Sync>;

/// One object of a [`ScriptedScene`].
pub struct ScriptedObject {
    mesh: MeshFn,
    transform: MatrixFn,
    motion_vectors: Option<Vec<Vec3>>,
    face_materials: Option<Vec<String>>,
    visible: bool,
}

impl ScriptedObject {
    /// Object whose object-space mesh at each frame is `mesh(frame)`.
    pub fn new(mesh: impl Fn(Frame) -> MeshSample + Send + Sync + 'static) -> Self {
        Self {
            mesh: Box::new(mesh),
            transform: Box::new(|_| Mat4::IDENTITY),
            motion_vectors: None,
            face_materials: None,
            visible: true,
        }
    }

    /// Object-to-world transform over time.
    pub fn with_transform(mut self, transform: impl Fn(Frame) -> Mat4 + Send + Sync + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    /// Authored velocities in object space, units per frame.
    pub fn with_motion_vectors(mut self, velocities: Vec<Vec3>) -> Self {
        self.motion_vectors = Some(velocities);
        self
    }

    /// Per-face material names.
    pub fn with_face_materials(mut self, names: Vec<String>) -> Self {
        self.face_materials = Some(names);
        self
    }

    /// Hide or show the object.
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// In-memory scene whose objects are functions of time.
///
/// Records every time change so callers can check how often the global
/// time was moved.
pub struct ScriptedScene {
    time: Frame,
    fps: f64,
    range: (Frame, Frame),
    objects: HashMap<String, ScriptedObject>,
    selection: Vec<String>,
    time_log: Vec<Frame>,
}

impl ScriptedScene {
    /// Empty scene at frame 0.
    pub fn new(fps: f64) -> Self {
        Self {
            time: 0.0,
            fps,
            range: (0.0, 0.0),
            objects: HashMap::new(),
            selection: Vec::new(),
            time_log: Vec::new(),
        }
    }

    /// Set the playback range.
    pub fn with_playback_range(mut self, start: Frame, end: Frame) -> Self {
        self.range = (start, end);
        self
    }

    /// Add or replace an object.
    pub fn insert(&mut self, name: impl Into<String>, object: ScriptedObject) {
        self.objects.insert(name.into(), object);
    }

    /// Replace the selection.
    pub fn select(&mut self, names: &[&str]) {
        self.selection = names.iter().map(|n| n.to_string()).collect();
    }

    /// Move the time without recording it.
    pub fn jump_to(&mut self, frame: Frame) {
        self.time = frame;
    }

    /// Every time passed to [`Scene::set_time`], in order.
    pub fn time_log(&self) -> &[Frame] {
        &self.time_log
    }

    /// Forget the recorded time changes.
    pub fn clear_time_log(&mut self) {
        self.time_log.clear();
    }

    fn object(&self, name: &str) -> Result<&ScriptedObject> {
        self.objects
            .get(name)
            .ok_or_else(|| Error::Scene(format!("no object named \"{name}\"")))
    }
}

impl Scene for ScriptedScene {
    fn current_time(&self) -> Frame {
        self.time
    }

    fn set_time(&mut self, frame: Frame) -> Result<()> {
        if !frame.is_finite() {
            return Err(Error::Scene(format!("invalid time {frame}")));
        }
        self.time_log.push(frame);
        self.time = frame;
        Ok(())
    }

    fn frames_per_second(&self) -> f64 {
        self.fps
    }

    fn playback_range(&self) -> (Frame, Frame) {
        self.range
    }

    fn selection(&self) -> Vec<String> {
        self.selection.clone()
    }

    fn sample_mesh(&self, object: &str, world_space: bool) -> Result<MeshSample> {
        let obj = self.object(object)?;
        let mut mesh = (obj.mesh)(self.time);
        if world_space {
            let m = (obj.transform)(self.time);
            for p in &mut mesh.positions {
                *p = (m * Vec4::new(p.x, p.y, p.z, 1.0)).truncate();
            }
        }
        Ok(mesh)
    }

    fn authored_velocities(&self, object: &str) -> Result<Option<Vec<Vec3>>> {
        Ok(self.object(object)?.motion_vectors.clone())
    }

    fn world_matrix(&self, object: &str, frame: Frame) -> Result<Mat4> {
        Ok((self.object(object)?.transform)(frame))
    }

    fn is_visible(&self, object: &str) -> Result<bool> {
        Ok(self.object(object)?.visible)
    }

    fn face_materials(&self, object: &str) -> Result<Option<Vec<String>>> {
        Ok(self.object(object)?.face_materials.clone())
    }
}
