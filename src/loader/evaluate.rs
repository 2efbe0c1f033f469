//! Evaluation of a mesh sequence at an output time.
//!
//! [`SequenceLoader`] ties the pieces together: it resolves the output time
//! through the timing settings, plans which frames to read, goes through the
//! one-generation cache and shapes the cached mesh for display.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::{
    CacheKey, LoadingMode, MeshCache, PlaybackGraph, RangeRegion, SampleKey, SamplePlan,
    SortedFrameSet, DEFAULT_DERIVATIVE_STEP,
};
use crate::geom::{LoadMask, MeshMetadata, MeshSample};
use crate::util::{BBox3f, Error, Frame, Result};

use super::settings::{DisplayMode, LoaderSettings};
use super::source::MeshLoader;

/// Velocity offsets below this many seconds leave positions untouched.
const MIN_TIME_OFFSET: f32 = 1e-5;

/// Host state for one evaluation.
#[derive(Clone, Copy)]
pub struct EvalContext<'g> {
    /// Output frame requested by the host.
    pub frame: Frame,
    /// Host frames per second.
    pub fps: f64,
    /// True while rendering; selects the render source and full meshes.
    pub rendering: bool,
    pub playback_graph: Option<&'g dyn PlaybackGraph>,
}

impl<'g> EvalContext<'g> {
    /// Viewport evaluation at `frame`.
    pub fn new(frame: Frame, fps: f64) -> Self {
        Self { frame, fps, rendering: false, playback_graph: None }
    }

    /// Switch to render evaluation.
    pub fn rendering(mut self, rendering: bool) -> Self {
        self.rendering = rendering;
        self
    }

    /// Attach the playback graph used when the settings enable it.
    pub fn with_playback_graph(mut self, graph: &'g dyn PlaybackGraph) -> Self {
        self.playback_graph = Some(graph);
        self
    }
}

/// Result of one evaluation.
#[derive(Clone, Debug)]
pub struct Evaluation {
    /// Output mesh; empty when nothing is shown.
    pub mesh: Arc<MeshSample>,
    /// Bounds of what is shown.
    pub bounds: BBox3f,
    /// Range region of the planned sample, `None` without planning.
    pub region: Option<RangeRegion>,
    /// Plan used, `None` for static and blank loading.
    pub plan: Option<SamplePlan>,
    /// Velocity offset in seconds applied to the positions.
    pub time_offset: f32,
    /// Source-time derivative applied to the velocities.
    pub time_derivative: f32,
    /// Metadata of the (first) loaded file.
    pub metadata: MeshMetadata,
}

impl Evaluation {
    /// Empty mesh, nothing loaded.
    pub fn empty() -> Self {
        Self {
            mesh: Arc::new(MeshSample::new()),
            bounds: BBox3f::EMPTY,
            region: None,
            plan: None,
            time_offset: 0.0,
            time_derivative: 1.0,
            metadata: MeshMetadata::new(),
        }
    }

    /// Check if nothing is shown.
    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty()
    }
}

/// Mesh sequence evaluator.
pub struct SequenceLoader<L> {
    loader: L,
    settings: LoaderSettings,
    // Frame set of the last sequence path
    frames: Option<(PathBuf, SortedFrameSet)>,
    cache: MeshCache,
    bounds: BBox3f,
}

impl<L: MeshLoader> SequenceLoader<L> {
    /// Create an evaluator after validating `settings`.
    pub fn new(loader: L, settings: LoaderSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            loader,
            settings,
            frames: None,
            cache: MeshCache::new(),
            bounds: BBox3f::EMPTY,
        })
    }

    /// Current settings.
    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Replace the settings. Rejected settings leave the old ones in place.
    pub fn set_settings(&mut self, settings: LoaderSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// The mesh loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The mesh cache.
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    /// Bounds of the last evaluation.
    pub fn bounds(&self) -> BBox3f {
        self.bounds
    }

    /// Rescan the frames of the active sequence.
    pub fn sync_frame_set(&mut self, rendering: bool) -> Result<()> {
        self.frames = None;
        let path = self.active_path(rendering)?;
        if !path.as_os_str().is_empty() {
            self.frames_for(&path)?;
        }
        Ok(())
    }

    /// Smallest available whole frame of the active sequence, 0 when empty.
    pub fn min_available_index(&mut self, rendering: bool) -> Result<i64> {
        let path = self.active_path(rendering)?;
        Ok(self.frames_for(&path)?.frames().first().map_or(0, |f| f.ceil() as i64))
    }

    /// Largest available whole frame of the active sequence, 0 when empty.
    pub fn max_available_index(&mut self, rendering: bool) -> Result<i64> {
        let path = self.active_path(rendering)?;
        Ok(self.frames_for(&path)?.frames().last().map_or(0, |f| f.floor() as i64))
    }

    fn active_path(&self, rendering: bool) -> Result<PathBuf> {
        self.settings.sequence_path(self.settings.active_source(rendering))
    }

    fn frames_for(&mut self, path: &Path) -> Result<&SortedFrameSet> {
        let stale = self.frames.as_ref().map_or(true, |(p, _)| p != path);
        if stale {
            self.frames = None;
            self.cache.invalidate_path(path);
            let frames = self.loader.discover_frames(path)?;
            self.frames = Some((path.to_path_buf(), frames));
        }
        self.frames
            .as_ref()
            .map(|(_, frames)| frames)
            .ok_or_else(|| Error::other("frame set missing after scan"))
    }

    /// Evaluate the sequence, degrading to an empty mesh on failure.
    pub fn evaluate(&mut self, ctx: &EvalContext<'_>) -> Evaluation {
        match self.try_evaluate(ctx) {
            Ok(eval) => eval,
            Err(e) => {
                tracing::error!(frame = ctx.frame, error = %e, "sequence evaluation failed");
                self.cache.clear();
                self.bounds = BBox3f::EMPTY;
                Evaluation::empty()
            }
        }
    }

    /// Evaluate the sequence, returning any failure.
    pub fn try_evaluate(&mut self, ctx: &EvalContext<'_>) -> Result<Evaluation> {
        let path = self.active_path(ctx.rendering)?;
        let display = self.settings.effective_display_mode(ctx.rendering);
        let mut mask = display.load_mask();
        let mut mode = self.settings.loading_mode;
        if path.as_os_str().is_empty() {
            mode = LoadingMode::Blank;
        }
        let display_mode = display;
        tracing::debug!(frame = ctx.frame, %mode, display = ?display_mode, "evaluating sequence");

        let timing = self.settings.timing(ctx.playback_graph)?;
        let clamp = self.settings.clamp_policy();

        let (sample, planned, time_offset, time_derivative) = match mode {
            LoadingMode::Blank => {
                self.cache.clear();
                self.bounds = BBox3f::EMPTY;
                return Ok(Evaluation::empty());
            }
            LoadingMode::Static => (SampleKey::Static, None, 0.0, 1.0),
            LoadingMode::VelocityOffset | LoadingMode::SubframeVelocityOffset => {
                let frames = self.frames_for(&path)?;
                let planned = timing.plan_offset(ctx.frame, frames, mode.frame_step(), clamp)?;
                match planned.plan {
                    SamplePlan::Frame { frame, offset } => {
                        if ctx.fps <= 0.0 {
                            return Err(Error::config(format!("invalid frames per second {}", ctx.fps)));
                        }
                        if display != DisplayMode::Box {
                            mask |= LoadMask::VELOCITY;
                        }
                        let derivative = timing.time_derivative(ctx.frame, DEFAULT_DERIVATIVE_STEP)?;
                        let seconds = (offset / ctx.fps) as f32;
                        (SampleKey::frame(frame), Some(planned), seconds, derivative as f32)
                    }
                    _ => return Ok(self.blank(planned.region, planned.plan)),
                }
            }
            LoadingMode::FrameInterpolation | LoadingMode::SubframeInterpolation => {
                let frames = self.frames_for(&path)?;
                let planned = timing.plan_bracket(ctx.frame, frames, mode.frame_step(), clamp)?;
                match planned.plan {
                    SamplePlan::Bracket { lo, hi, .. } => {
                        (SampleKey::bracket(lo, hi), Some(planned), 0.0, 1.0)
                    }
                    _ => return Ok(self.blank(planned.region, planned.plan)),
                }
            }
        };

        let key = CacheKey::new(path, mode, mask, sample);
        let entry = self.cache.get_or_load(&self.loader, key)?;
        let metadata = entry.metadata().clone();
        let mut source = Arc::clone(entry.mesh());

        if let Some(SamplePlan::Bracket { alpha, .. }) = planned.map(|p| p.plan) {
            if !mask.is_box_only() {
                source = self.cache.blend(&self.loader, alpha as f32)?;
            }
        }

        let mesh = self.shape(&source, display, time_offset, time_derivative)?;
        let bounds = match display {
            DisplayMode::Box => metadata.bounds.unwrap_or_else(|| source.compute_bounds()),
            _ => mesh.compute_bounds(),
        };
        self.bounds = bounds;

        Ok(Evaluation {
            mesh,
            bounds,
            region: planned.map(|p| p.region),
            plan: planned.map(|p| p.plan),
            time_offset,
            time_derivative,
            metadata,
        })
    }

    fn blank(&mut self, region: RangeRegion, plan: SamplePlan) -> Evaluation {
        tracing::debug!(?region, "clamped to blank");
        self.cache.clear();
        self.bounds = BBox3f::EMPTY;
        Evaluation { region: Some(region), plan: Some(plan), ..Evaluation::empty() }
    }

    /// Apply the velocity offset and the display mode to a cached mesh.
    ///
    /// Returns the cached mesh itself when nothing has to change.
    fn shape(
        &self,
        source: &Arc<MeshSample>,
        display: DisplayMode,
        time_offset: f32,
        time_derivative: f32,
    ) -> Result<Arc<MeshSample>> {
        let offset = if time_offset.abs() > MIN_TIME_OFFSET { time_offset } else { 0.0 };
        match display {
            DisplayMode::Box => Ok(Arc::new(MeshSample::new())),
            DisplayMode::Vertex => Ok(Arc::new(MeshSample {
                positions: source.positions_at_offset(offset)?,
                ..MeshSample::default()
            })),
            DisplayMode::Mesh | DisplayMode::Face => {
                let fraction = match display {
                    DisplayMode::Face => self.settings.display_fraction(),
                    _ => 1.0,
                };
                let displaced = source.has_velocities() && offset != 0.0;
                let rescaled = source.has_velocities() && time_derivative != 1.0;
                if !displaced && !rescaled && fraction >= 1.0 {
                    return Ok(Arc::clone(source));
                }

                let mut mesh = source.with_face_fraction(fraction);
                mesh.positions = source.positions_at_offset(offset)?;
                if rescaled {
                    if let Some(v) = mesh.velocities.as_mut() {
                        v.iter_mut().for_each(|v| *v *= time_derivative);
                    }
                }
                Ok(Arc::new(mesh))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClampMode;
    use crate::loader::MemoryLoader;
    use crate::util::Vec3;

    const SEQ: &str = "cache/drop_####.xmesh";

    fn tri(x: f32) -> MeshSample {
        let mut m = MeshSample::from_polygons(
            vec![Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 0.0, 0.0), Vec3::new(x, 1.0, 0.0)],
            &[&[0, 1, 2]],
        );
        m.velocities = Some(vec![Vec3::new(24.0, 0.0, 0.0); 3]);
        m
    }

    fn loader(frames: &[i32]) -> MemoryLoader {
        let mut loader = MemoryLoader::new();
        for &f in frames {
            loader.insert_frame(SEQ, f as Frame, tri(f as f32));
        }
        loader
    }

    fn settings(mode: LoadingMode) -> LoaderSettings {
        LoaderSettings { loading_mode: mode, ..LoaderSettings::for_path(SEQ) }
    }

    #[test]
    fn test_velocity_offset_applies_velocity() {
        let mut seq = SequenceLoader::new(loader(&[10, 11, 12]), settings(LoadingMode::VelocityOffset)).unwrap();
        let eval = seq.try_evaluate(&EvalContext::new(10.25, 24.0)).unwrap();
        assert_eq!(eval.plan, Some(SamplePlan::Frame { frame: 10.0, offset: 0.25 }));
        assert!((eval.time_offset - 0.25 / 24.0).abs() < 1e-7);
        // 24 units per second over a quarter frame at 24 fps
        assert!((eval.mesh.positions[0].x - 10.25).abs() < 1e-5);
    }

    #[test]
    fn test_interpolation_alpha_zero_aliases_cache() {
        let mut seq = SequenceLoader::new(loader(&[1, 2, 3, 5, 8]), settings(LoadingMode::FrameInterpolation)).unwrap();
        let eval = seq.try_evaluate(&EvalContext::new(8.0, 24.0)).unwrap();
        assert_eq!(eval.plan, Some(SamplePlan::Bracket { lo: 8.0, hi: 8.0, alpha: 0.0 }));
        let cached = seq.cache().entry().unwrap().mesh();
        assert!(Arc::ptr_eq(&eval.mesh, cached));

        let eval = seq.try_evaluate(&EvalContext::new(4.0, 24.0)).unwrap();
        assert_eq!(eval.region, Some(RangeRegion::Inside));
        assert_eq!(eval.mesh.positions[0].x, 4.0);
    }

    #[test]
    fn test_repeated_evaluation_loads_once() {
        let loader = loader(&[1, 2, 3]);
        let mut seq = SequenceLoader::new(&loader, settings(LoadingMode::VelocityOffset)).unwrap();
        seq.evaluate(&EvalContext::new(2.0, 24.0));
        seq.evaluate(&EvalContext::new(2.1, 24.0));
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn test_blank_clamp_and_empty_path() {
        let mut s = settings(LoadingMode::VelocityOffset);
        s.start_clamp = ClampMode::Blank;
        let mut seq = SequenceLoader::new(loader(&[10, 11]), s).unwrap();
        let eval = seq.try_evaluate(&EvalContext::new(5.0, 24.0)).unwrap();
        assert!(eval.is_empty());
        assert_eq!(eval.region, Some(RangeRegion::Before));

        let mut seq = SequenceLoader::new(loader(&[10]), LoaderSettings::default()).unwrap();
        let eval = seq.try_evaluate(&EvalContext::new(10.0, 24.0)).unwrap();
        assert!(eval.is_empty());
        assert!(seq.cache().is_empty());
    }

    #[test]
    fn test_failure_degrades_to_empty() {
        let mut seq = SequenceLoader::new(loader(&[]), settings(LoadingMode::FrameInterpolation)).unwrap();
        assert!(matches!(
            seq.try_evaluate(&EvalContext::new(1.0, 24.0)),
            Err(Error::EmptyFrameSet)
        ));
        let eval = seq.evaluate(&EvalContext::new(1.0, 24.0));
        assert!(eval.is_empty());
        assert!(eval.bounds.is_empty());
    }

    #[test]
    fn test_box_display_uses_metadata_bounds() {
        let mut s = settings(LoadingMode::FrameInterpolation);
        s.display_mode = DisplayMode::Box;
        let mut seq = SequenceLoader::new(loader(&[1, 3]), s).unwrap();
        let eval = seq.try_evaluate(&EvalContext::new(2.0, 24.0)).unwrap();
        assert!(eval.mesh.is_empty());
        assert_eq!(eval.bounds.min, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(seq.loader().load_count(), 1);
    }

    #[test]
    fn test_face_display_fraction() {
        let mut loader = MemoryLoader::new();
        let quad = MeshSample::from_polygons(
            vec![Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y],
            &[&[0, 1, 2], &[0, 2, 3]],
        );
        loader.insert_static("single.xmesh", quad);
        let s = LoaderSettings {
            loading_mode: LoadingMode::Static,
            display_mode: DisplayMode::Face,
            display_percent: 50.0,
            ..LoaderSettings::for_path("single.xmesh")
        };
        let mut seq = SequenceLoader::new(loader, s).unwrap();
        let eval = seq.try_evaluate(&EvalContext::new(0.0, 24.0)).unwrap();
        assert_eq!(eval.mesh.num_faces(), 1);

        // Rendering ignores the display mode
        let eval = seq.try_evaluate(&EvalContext::new(0.0, 24.0).rendering(true)).unwrap();
        assert_eq!(eval.mesh.num_faces(), 2);
    }

    #[test]
    fn test_time_derivative_scales_velocity() {
        let graph = |f: Frame| f * 0.5;
        let s = LoaderSettings { use_playback_graph: true, ..settings(LoadingMode::VelocityOffset) };
        let mut seq = SequenceLoader::new(loader(&[5, 6]), s).unwrap();
        let ctx = EvalContext::new(10.0, 24.0).with_playback_graph(&graph);
        let eval = seq.try_evaluate(&ctx).unwrap();
        assert_eq!(eval.plan, Some(SamplePlan::Frame { frame: 5.0, offset: 0.0 }));
        assert!((eval.time_derivative - 0.5).abs() < 1e-6);
        assert!((eval.mesh.velocities.as_ref().unwrap()[0].x - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_available_indices() {
        let mut seq = SequenceLoader::new(loader(&[-2, 4, 7]), settings(LoadingMode::VelocityOffset)).unwrap();
        assert_eq!(seq.min_available_index(false).unwrap(), -2);
        assert_eq!(seq.max_available_index(false).unwrap(), 7);
    }
}
