//! Linear blending of topologically consistent meshes.

use crate::util::{Error, Result};

use super::mesh::MeshSample;

/// Blend two meshes with the same topology.
///
/// Positions and velocities are interpolated; per-face channels are taken
/// from `a`. Fails with [`Error::TopologyMismatch`] when the vertex count or
/// face structure of the two meshes differs.
pub fn linear_interpolate(a: &MeshSample, b: &MeshSample, alpha: f32) -> Result<MeshSample> {
    if let Some(reason) = a.topology_mismatch(b) {
        return Err(Error::topology(format!("cannot interpolate meshes: {reason}")));
    }

    let positions = a
        .positions
        .iter()
        .zip(&b.positions)
        .map(|(&pa, &pb)| pa.lerp(pb, alpha))
        .collect();

    let velocities = match (&a.velocities, &b.velocities) {
        (Some(va), Some(vb)) => Some(va.iter().zip(vb).map(|(&x, &y)| x.lerp(y, alpha)).collect()),
        (Some(v), None) | (None, Some(v)) => Some(v.clone()),
        (None, None) => None,
    };

    Ok(MeshSample {
        positions,
        face_counts: a.face_counts.clone(),
        face_indices: a.face_indices.clone(),
        velocities,
        material_ids: a.material_ids.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Vec3;

    fn tri(x: f32) -> MeshSample {
        MeshSample::from_polygons(
            vec![Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 0.0, 0.0), Vec3::new(x, 1.0, 0.0)],
            &[&[0, 1, 2]],
        )
    }

    #[test]
    fn test_interpolate_midpoint() {
        let m = linear_interpolate(&tri(0.0), &tri(2.0), 0.5).unwrap();
        assert_eq!(m.positions[0], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(m.face_indices, vec![0, 1, 2]);
        assert!(m.velocities.is_none());
    }

    #[test]
    fn test_interpolate_endpoints() {
        let a = tri(0.0);
        let b = tri(4.0);
        assert_eq!(linear_interpolate(&a, &b, 0.0).unwrap().positions, a.positions);
        assert_eq!(linear_interpolate(&a, &b, 1.0).unwrap().positions, b.positions);
    }

    #[test]
    fn test_interpolate_velocities() {
        let mut a = tri(0.0);
        let mut b = tri(1.0);
        a.set_velocities(vec![Vec3::ZERO; 3]).unwrap();
        b.set_velocities(vec![Vec3::Y * 2.0; 3]).unwrap();
        let m = linear_interpolate(&a, &b, 0.25).unwrap();
        assert_eq!(m.velocities.unwrap()[0], Vec3::Y * 0.5);
    }

    #[test]
    fn test_topology_mismatch() {
        let a = tri(0.0);
        let mut b = tri(0.0);
        b.positions.push(Vec3::ONE);
        assert!(matches!(linear_interpolate(&a, &b, 0.5), Err(Error::TopologyMismatch(_))));
    }
}
