//! Per-vertex velocity estimation.
//!
//! Velocities come from authored motion vectors when an object has them.
//! Otherwise the scene is stepped forward by shrinking amounts and each
//! pending mesh is resampled until one step yields the same topology; the
//! position difference over that step is the velocity.

use crate::geom::MeshSample;
use crate::util::{transform_derivative, Error, Frame, Result, Vec3};

use super::scene::{Scene, TimeGuard};

/// First candidate step in frames.
pub const INITIAL_TIME_STEP: Frame = 0.25;

/// Step used after every forward step failed.
pub const FALLBACK_TIME_STEP: Frame = -0.25;

const TIME_STEP_SCALE: f64 = 0.5;
const MAX_FORWARD_STEPS: usize = 24;

/// Step in frames over which object transforms are differentiated.
const TRANSFORM_STEP: f32 = 0.25;

/// Outcome of one velocity estimation batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VelocityReport {
    /// Meshes using authored motion vectors.
    pub authored: usize,
    /// Meshes resolved by resampling.
    pub sampled: usize,
    /// Meshes without a consistent neighbour.
    pub unresolved: usize,
    /// Unresolved meshes given a zero velocity channel.
    pub zero_filled: usize,
    /// Number of scene time changes, not counting the final restore.
    pub time_changes: usize,
}

/// Candidate time steps in frames, tried in order.
///
/// Halves [`INITIAL_TIME_STEP`] up to 24 times, stopping once `start + step`
/// no longer changes. If not even the first step is representable one tick
/// of a 6000 fps clock is used. [`FALLBACK_TIME_STEP`] always comes last.
pub fn candidate_time_steps(start: Frame, fps: f64) -> Vec<Frame> {
    let mut steps = Vec::with_capacity(MAX_FORWARD_STEPS + 1);
    let mut last = start;
    for i in 0..MAX_FORWARD_STEPS {
        let step = INITIAL_TIME_STEP * TIME_STEP_SCALE.powi(i as i32);
        let sample = start + step;
        if sample == start || sample == last {
            break;
        }
        last = sample;
        steps.push(step);
    }
    if steps.is_empty() {
        steps.push(fps / 6000.0);
    }
    steps.push(FALLBACK_TIME_STEP);
    steps
}

/// Attach velocity channels (units per second) to `meshes`.
///
/// `meshes[i]` must be the current-time mesh of `objects[i]`, sampled in
/// the same space as `world_space` asks for. The scene time is moved at
/// most once per candidate step and restored before returning.
pub fn estimate_velocities<S: Scene + ?Sized>(
    scene: &mut S,
    objects: &[String],
    meshes: &mut [MeshSample],
    world_space: bool,
) -> Result<VelocityReport> {
    if objects.len() != meshes.len() {
        return Err(Error::other(format!(
            "{} objects but {} meshes for velocity estimation",
            objects.len(),
            meshes.len()
        )));
    }
    let start = scene.current_time();
    let fps = scene.frames_per_second();
    if !(fps > 0.0) {
        return Err(Error::Scene(format!("invalid frames per second {fps}")));
    }

    let mut report = VelocityReport::default();
    let mut pending = Vec::new();
    for (i, object) in objects.iter().enumerate() {
        match authored_velocities(&*scene, object, &meshes[i], start, fps, world_space)? {
            Some(v) => {
                meshes[i].set_velocities(v)?;
                report.authored += 1;
            }
            None => pending.push(i),
        }
    }

    if !pending.is_empty() {
        let mut scene = TimeGuard::new(scene);
        for step in candidate_time_steps(start, fps) {
            if pending.is_empty() {
                break;
            }
            scene.set_time(start + step)?;
            report.time_changes += 1;

            let step_seconds = (step / fps) as f32;
            let mut unresolved = Vec::with_capacity(pending.len());
            for i in pending {
                let sampled = scene.sample_mesh(&objects[i], world_space)?;
                if meshes[i].is_consistent_topology(&sampled) {
                    let velocities = meshes[i]
                        .positions
                        .iter()
                        .zip(&sampled.positions)
                        .map(|(&a, &b)| (b - a) / step_seconds)
                        .collect();
                    meshes[i].set_velocities(velocities)?;
                    report.sampled += 1;
                    tracing::trace!(object = %objects[i], step, "velocity from resampling");
                } else {
                    unresolved.push(i);
                }
            }
            pending = unresolved;
        }
    }

    report.unresolved = pending.len();
    for &i in &pending {
        tracing::warn!(object = %objects[i], "no topologically consistent sample for velocity");
    }
    if meshes.iter().any(MeshSample::has_velocities) {
        for &i in &pending {
            meshes[i].ensure_velocities();
            report.zero_filled += 1;
        }
    }
    Ok(report)
}

/// Authored motion vectors converted to units per second.
///
/// In world space the object's rotation and scale are applied and the
/// motion of its transform over [`TRANSFORM_STEP`] frames is added.
fn authored_velocities<S: Scene + ?Sized>(
    scene: &S,
    object: &str,
    mesh: &MeshSample,
    start: Frame,
    fps: f64,
    world_space: bool,
) -> Result<Option<Vec<Vec3>>> {
    let Some(local) = scene.authored_velocities(object)? else {
        return Ok(None);
    };
    if local.is_empty() {
        return Ok(None);
    }
    if local.len() != mesh.num_vertices() {
        return Err(Error::ChannelMismatch {
            channel: crate::geom::VELOCITY_CHANNEL,
            expected: mesh.num_vertices(),
            actual: local.len(),
        });
    }

    let fps = fps as f32;
    if !world_space {
        return Ok(Some(local.iter().map(|&v| v * fps).collect()));
    }

    let begin = scene.world_matrix(object, start)?;
    let end = scene.world_matrix(object, start + TRANSFORM_STEP as Frame)?;
    let derivative = transform_derivative(&begin, &end, TRANSFORM_STEP);
    Ok(Some(
        local
            .iter()
            .zip(&mesh.positions)
            .map(|(&v, &p)| (begin.transform_vector3(v) + (derivative * p.extend(1.0)).truncate()) * fps)
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Mat4;
    use crate::velocity::{ScriptedObject, ScriptedScene};

    fn tri(x: f32) -> MeshSample {
        MeshSample::from_polygons(
            vec![Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 0.0, 0.0), Vec3::new(x, 1.0, 0.0)],
            &[&[0, 1, 2]],
        )
    }

    fn grown(x: f32) -> MeshSample {
        let mut m = tri(x);
        m.positions.push(Vec3::ONE);
        m
    }

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_candidate_steps() {
        let steps = candidate_time_steps(10.0, 24.0);
        assert_eq!(steps.len(), MAX_FORWARD_STEPS + 1);
        assert_eq!(steps[0], 0.25);
        assert_eq!(steps[1], 0.125);
        assert_eq!(*steps.last().unwrap(), FALLBACK_TIME_STEP);

        // Steps that no longer move the time are dropped
        let steps = candidate_time_steps(1e17, 24.0);
        assert_eq!(steps, vec![24.0 / 6000.0, FALLBACK_TIME_STEP]);
    }

    #[test]
    fn test_constant_topology_uses_first_step() {
        let mut scene = ScriptedScene::new(24.0);
        scene.insert("a", ScriptedObject::new(|t| tri(2.0 * t as f32)));
        scene.jump_to(5.0);
        let mut meshes = vec![scene.sample_mesh("a", false).unwrap()];

        let report = estimate_velocities(&mut scene, &names(&["a"]), &mut meshes, false).unwrap();
        assert_eq!(report.sampled, 1);
        assert_eq!(report.time_changes, 1);
        assert_eq!(scene.time_log(), &[5.25, 5.0]);
        assert_eq!(scene.current_time(), 5.0);

        let v = meshes[0].velocities.as_ref().unwrap();
        assert!((v[0].x - 48.0).abs() < 1e-3, "{:?}", v[0]);
    }

    #[test]
    fn test_fallback_step_backwards() {
        let mut scene = ScriptedScene::new(24.0);
        scene.insert(
            "a",
            ScriptedObject::new(|t| if t > 5.0 { grown(2.0 * t as f32) } else { tri(2.0 * t as f32) }),
        );
        scene.jump_to(5.0);
        let mut meshes = vec![scene.sample_mesh("a", false).unwrap()];

        let report = estimate_velocities(&mut scene, &names(&["a"]), &mut meshes, false).unwrap();
        assert_eq!(report.time_changes, MAX_FORWARD_STEPS + 1);
        assert_eq!(scene.time_log()[MAX_FORWARD_STEPS], 4.75);
        let v = meshes[0].velocities.as_ref().unwrap();
        assert!((v[0].x - 48.0).abs() < 1e-2);
    }

    #[test]
    fn test_unresolved_zero_filled_with_batch() {
        let mut scene = ScriptedScene::new(24.0);
        scene.insert("still", ScriptedObject::new(|_| tri(0.0)));
        scene.insert(
            "boiling",
            ScriptedObject::new(|t| if t == 5.0 { tri(0.0) } else { grown(0.0) }),
        );
        scene.jump_to(5.0);
        let objects = names(&["still", "boiling"]);
        let mut meshes: Vec<_> = objects.iter().map(|o| scene.sample_mesh(o, false).unwrap()).collect();

        let report = estimate_velocities(&mut scene, &objects, &mut meshes, false).unwrap();
        assert_eq!(report.sampled, 1);
        assert_eq!(report.unresolved, 1);
        assert_eq!(report.zero_filled, 1);
        assert_eq!(meshes[1].velocities, Some(vec![Vec3::ZERO; 3]));
        assert_eq!(scene.current_time(), 5.0);
    }

    #[test]
    fn test_lone_unresolved_mesh_stays_without_velocity() {
        let mut scene = ScriptedScene::new(24.0);
        scene.insert("boiling", ScriptedObject::new(|t| if t == 1.0 { tri(0.0) } else { grown(0.0) }));
        scene.jump_to(1.0);
        let mut meshes = vec![scene.sample_mesh("boiling", false).unwrap()];
        let report = estimate_velocities(&mut scene, &names(&["boiling"]), &mut meshes, false).unwrap();
        assert_eq!(report.zero_filled, 0);
        assert!(meshes[0].velocities.is_none());
    }

    #[test]
    fn test_authored_velocities_skip_sampling() {
        let mut scene = ScriptedScene::new(24.0);
        scene.insert(
            "mv",
            ScriptedObject::new(|_| tri(0.0))
                .with_motion_vectors(vec![Vec3::Y; 3])
                .with_transform(|t| Mat4::from_translation(Vec3::new(t as f32, 0.0, 0.0))),
        );
        scene.jump_to(2.0);

        let mut local = vec![scene.sample_mesh("mv", false).unwrap()];
        let report = estimate_velocities(&mut scene, &names(&["mv"]), &mut local, false).unwrap();
        assert_eq!(report.authored, 1);
        assert!(scene.time_log().is_empty());
        assert_eq!(local[0].velocities.as_ref().unwrap()[0], Vec3::new(0.0, 24.0, 0.0));

        let mut world = vec![scene.sample_mesh("mv", true).unwrap()];
        estimate_velocities(&mut scene, &names(&["mv"]), &mut world, true).unwrap();
        let v = world[0].velocities.as_ref().unwrap()[0];
        assert!((v - Vec3::new(24.0, 24.0, 0.0)).length() < 1e-3, "{v:?}");
    }

    #[test]
    fn test_mismatched_inputs() {
        let mut scene = ScriptedScene::new(24.0);
        let mut meshes = vec![tri(0.0)];
        assert!(estimate_velocities(&mut scene, &[], &mut meshes, false).is_err());
    }
}
