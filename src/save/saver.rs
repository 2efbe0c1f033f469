//! Mesh export from a host scene.
//!
//! A frame is exported in two phases. The scene is evaluated on the calling
//! thread: time change, mesh collection, velocity estimation and combining
//! per output. The finished meshes are then handed to a small I/O pool and
//! the next frame starts while they are written.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::geom::{MeshMetadata, MeshSample, MATERIAL_ID_CHANNEL, VELOCITY_CHANNEL};
use crate::material::MaterialIdMap;
use crate::sequence::FilenamePattern;
use crate::util::{Error, Result};
use crate::velocity::{estimate_velocities, Scene, TimeGuard};

use super::options::{sample_times, SaveOptions};
use super::writer::MeshWriter;

/// Upper bound of concurrent file writes.
const MAX_IO_THREADS: usize = 2;

/// Number of I/O threads: available parallelism clamped to `1..=2`.
pub fn io_thread_count() -> usize {
    std::thread::available_parallelism()
        .map_or(1, |n| n.get())
        .clamp(1, MAX_IO_THREADS)
}

/// Counters of one export.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveStats {
    /// Frames evaluated.
    pub frames: usize,
    /// Files written.
    pub files: usize,
    /// Vertices written, over all files.
    pub vertices: usize,
    /// Faces written, over all files.
    pub faces: usize,
    /// Meshes left without a resampled or authored velocity.
    pub unresolved_velocities: usize,
}

impl SaveStats {
    fn record_file(&mut self, mesh: &MeshSample) {
        self.files += 1;
        self.vertices += mesh.num_vertices();
        self.faces += mesh.num_faces();
    }
}

/// Exports meshes of a scene through a [`MeshWriter`].
pub struct MeshSaver<W> {
    writer: W,
    pool: rayon::ThreadPool,
    cancel: Arc<AtomicBool>,
}

impl<W: MeshWriter> MeshSaver<W> {
    /// Saver with [`io_thread_count`] I/O threads.
    pub fn new(writer: W) -> Result<Self> {
        Self::with_threads(writer, io_thread_count())
    }

    /// Saver with `threads` I/O threads.
    pub fn with_threads(writer: W, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("xmesh-io-{i}"))
            .build()
            .map_err(|e| Error::other(format!("failed to build I/O thread pool: {e}")))?;
        Ok(Self { writer, pool, cancel: Arc::new(AtomicBool::new(false)) })
    }

    /// The mesh writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Flag polled once per frame; setting it cancels a running export.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Clear a previous cancellation.
    pub fn reset_cancel(&self) {
        self.cancel.store(false, Ordering::Relaxed);
    }

    /// Export a frame range, one file per output pattern and frame.
    ///
    /// The scene time is restored when this returns. On cancellation
    /// [`Error::Cancelled`] is returned and files already written remain.
    /// Any other failure aborts the export at that frame.
    pub fn save_sequence<S: Scene + ?Sized>(&self, scene: &mut S, options: &SaveOptions) -> Result<SaveStats> {
        options.validate()?;
        let patterns = options
            .paths
            .iter()
            .map(FilenamePattern::parse)
            .collect::<Result<Vec<_>>>()?;
        let (start, end) = options.frame_range.unwrap_or_else(|| scene.playback_range());
        if end < start {
            return Err(Error::config(format!(
                "start frame ({start}) must be less than or equal to end frame ({end})"
            )));
        }
        let times = sample_times(start, end, options.step());
        let object_lists = object_lists(&*scene, options);
        let mut material_maps = material_maps(options);
        let fps = scene.frames_per_second();

        tracing::info!(
            outputs = patterns.len(),
            frames = times.len(),
            start,
            end,
            "saving mesh sequence"
        );

        let stats = Mutex::new(SaveStats::default());
        let write_error: Mutex<Option<Error>> = Mutex::new(None);
        let mut scene = TimeGuard::new(scene);

        let result = self.pool.in_place_scope(|s| -> Result<()> {
            for (index, &frame) in times.iter().enumerate() {
                if self.cancel.load(Ordering::Relaxed) {
                    tracing::info!(frame, "save cancelled");
                    return Err(Error::Cancelled);
                }
                if write_error.lock().is_some() {
                    return Ok(());
                }

                let span = tracing::info_span!("save_frame", frame);
                let _enter = span.enter();

                scene.set_time(frame)?;
                let (meshes, unresolved) = match collect_outputs(
                    &mut *scene,
                    options,
                    &object_lists,
                    &mut material_maps,
                ) {
                    Ok(collected) => collected,
                    Err(e) => {
                        tracing::error!(frame, error = %e, "failed to save frame");
                        return Err(e);
                    }
                };
                {
                    let mut stats = stats.lock();
                    stats.frames += 1;
                    stats.unresolved_velocities += unresolved;
                }

                for (mesh, pattern) in meshes.into_iter().zip(&patterns) {
                    let path = pattern.filename_for(frame);
                    let metadata = frame_metadata(&mesh, fps, options);
                    let (writer, stats, write_error) = (&self.writer, &stats, &write_error);
                    s.spawn(move |_| match writer.write(&path, &mesh, &metadata) {
                        Ok(()) => stats.lock().record_file(&mesh),
                        Err(e) => {
                            tracing::error!(path = %path.display(), error = %e, "failed to write mesh");
                            write_error.lock().get_or_insert(e);
                        }
                    });
                }
                tracing::info!(progress = index + 1, total = times.len(), "frame evaluated");
            }
            Ok(())
        });

        result?;
        if let Some(e) = write_error.into_inner() {
            return Err(e);
        }
        let stats = stats.into_inner();
        tracing::info!(files = stats.files, "mesh sequence saved");
        Ok(stats)
    }

    /// Export the current frame to the first path of `options`.
    ///
    /// The path is written as given; it is not a sequence pattern.
    pub fn save_frame<S: Scene + ?Sized>(&self, scene: &mut S, options: &SaveOptions) -> Result<SaveStats> {
        options.validate()?;
        let path: PathBuf = options.paths[0].clone();
        let object_lists = object_lists(&*scene, options);
        let mut material_maps = material_maps(options);
        let fps = scene.frames_per_second();

        let (meshes, unresolved) = collect_outputs(scene, options, &object_lists[..1], &mut material_maps)?;
        let mut stats = SaveStats { frames: 1, unresolved_velocities: unresolved, ..SaveStats::default() };
        let mesh = meshes.into_iter().next().unwrap_or_default();
        let metadata = frame_metadata(&mesh, fps, options);
        self.writer.write(&path, &mesh, &metadata)?;
        stats.record_file(&mesh);
        tracing::info!(path = %path.display(), vertices = mesh.num_vertices(), "mesh saved");
        Ok(stats)
    }
}

fn object_lists<S: Scene + ?Sized>(scene: &S, options: &SaveOptions) -> Vec<Vec<String>> {
    if options.objects.is_empty() {
        vec![scene.selection()]
    } else {
        options.objects.clone()
    }
}

fn material_maps(options: &SaveOptions) -> Vec<MaterialIdMap> {
    if options.material_maps.is_empty() {
        vec![MaterialIdMap::new(); options.paths.len()]
    } else {
        options.material_maps.clone()
    }
}

fn frame_metadata(mesh: &MeshSample, fps: f64, options: &SaveOptions) -> MeshMetadata {
    let mut metadata = MeshMetadata::new();
    if fps > 0.0 {
        metadata.set_frames_per_second(fps);
    }
    metadata.bounds = Some(mesh.compute_bounds());
    metadata.length_unit = options.length_unit;
    metadata
}

/// Sample every object at the current time and combine them per output.
///
/// Velocities are estimated for all objects of all outputs together so the
/// scene time moves once per candidate step. Returns the combined meshes
/// and the number of meshes whose velocity stayed unresolved.
fn collect_outputs<S: Scene + ?Sized>(
    scene: &mut S,
    options: &SaveOptions,
    object_lists: &[Vec<String>],
    material_maps: &mut [MaterialIdMap],
) -> Result<(Vec<MeshSample>, usize)> {
    let with_materials = options.includes_channel(MATERIAL_ID_CHANNEL) && !options.verts_only;
    let mut meshes = Vec::new();
    let mut owners = Vec::new();
    let mut names = Vec::new();

    for (output, objects) in object_lists.iter().enumerate() {
        for object in objects {
            if options.visible_only && !scene.is_visible(object)? {
                continue;
            }
            let mut mesh = scene.sample_mesh(object, options.world_space)?;
            mesh.velocities = None;
            mesh.material_ids = None;
            if with_materials {
                if let Some(face_names) = scene.face_materials(object)? {
                    mesh.material_ids = Some(material_maps[output].face_ids(&face_names)?);
                }
            }
            meshes.push(mesh);
            owners.push(output);
            names.push(object.clone());
        }
    }

    let mut unresolved = 0;
    if options.includes_channel(VELOCITY_CHANNEL) && !meshes.is_empty() {
        let report = estimate_velocities(scene, &names, &mut meshes, options.world_space)?;
        unresolved = report.unresolved;
        tracing::debug!(?report, "velocities estimated");
    }

    if options.verts_only {
        for mesh in &mut meshes {
            mesh.face_counts.clear();
            mesh.face_indices.clear();
        }
    }

    let mut grouped: Vec<Vec<MeshSample>> = vec![Vec::new(); object_lists.len()];
    for (mesh, output) in meshes.into_iter().zip(owners) {
        grouped[output].push(mesh);
    }
    let combined = grouped
        .iter()
        .map(|group| {
            let mesh = MeshSample::combine(group);
            mesh.validate()?;
            Ok(mesh)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((combined, unresolved))
}
