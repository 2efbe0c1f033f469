//! Polygon mesh snapshot.
//!
//! One [`MeshSample`] is the geometry of one cached frame: vertex
//! positions, polygon connectivity and the optional per-vertex and
//! per-face channels the timing engine cares about.

use crate::util::{BBox3f, Error, Result, Vec3};

/// Name of the per-vertex velocity channel.
pub const VELOCITY_CHANNEL: &str = "Velocity";

/// Name of the per-face material ID channel.
pub const MATERIAL_ID_CHANNEL: &str = "MaterialID";

/// Polygon mesh sample data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshSample {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Face vertex counts - number of vertices per face.
    pub face_counts: Vec<u32>,
    /// Face vertex indices - indices into positions array.
    pub face_indices: Vec<u32>,
    /// Per-vertex velocity in units per second (optional).
    pub velocities: Option<Vec<Vec3>>,
    /// Per-face material IDs (optional).
    pub material_ids: Option<Vec<u16>>,
}

impl MeshSample {
    /// Create an empty sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sample from positions and polygons given as index lists.
    pub fn from_polygons(positions: Vec<Vec3>, polygons: &[&[u32]]) -> Self {
        let mut face_counts = Vec::with_capacity(polygons.len());
        let mut face_indices = Vec::new();
        for poly in polygons {
            face_counts.push(poly.len() as u32);
            face_indices.extend_from_slice(poly);
        }
        Self { positions, face_counts, face_indices, ..Self::default() }
    }

    /// Get number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Get number of faces.
    pub fn num_faces(&self) -> usize {
        self.face_counts.len()
    }

    /// Get total number of face-vertex indices.
    pub fn num_indices(&self) -> usize {
        self.face_indices.len()
    }

    /// Check if mesh has velocities.
    pub fn has_velocities(&self) -> bool {
        self.velocities.is_some()
    }

    /// Check if the mesh has no geometry at all.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.face_counts.is_empty()
    }

    /// Check if this is a valid mesh (has positions and face data).
    pub fn is_valid(&self) -> bool {
        !self.positions.is_empty() && !self.face_counts.is_empty() && !self.face_indices.is_empty()
    }

    /// Check that every index and channel agrees with the geometry.
    pub fn validate(&self) -> Result<()> {
        let expected: usize = self.face_counts.iter().map(|&c| c as usize).sum();
        if expected != self.face_indices.len() {
            return Err(Error::ChannelMismatch {
                channel: "faces",
                expected,
                actual: self.face_indices.len(),
            });
        }
        if let Some(&bad) = self.face_indices.iter().find(|&&i| i as usize >= self.positions.len()) {
            return Err(Error::other(format!(
                "face index {bad} out of bounds (vertex count: {})",
                self.positions.len()
            )));
        }
        if let Some(v) = &self.velocities {
            if v.len() != self.positions.len() {
                return Err(Error::ChannelMismatch {
                    channel: VELOCITY_CHANNEL,
                    expected: self.positions.len(),
                    actual: v.len(),
                });
            }
        }
        if let Some(ids) = &self.material_ids {
            if ids.len() != self.face_counts.len() {
                return Err(Error::ChannelMismatch {
                    channel: MATERIAL_ID_CHANNEL,
                    expected: self.face_counts.len(),
                    actual: ids.len(),
                });
            }
        }
        Ok(())
    }

    /// Iterate the vertex indices of each face.
    pub fn faces(&self) -> impl Iterator<Item = &[u32]> + '_ {
        let mut start = 0usize;
        self.face_counts.iter().map(move |&count| {
            let len = self.face_indices.len();
            let end = start + count as usize;
            let face = &self.face_indices[start.min(len)..end.min(len)];
            start = end;
            face
        })
    }

    /// Calculate bounding box.
    pub fn compute_bounds(&self) -> BBox3f {
        BBox3f::from_points(&self.positions)
    }

    /// Check that `other` has the same vertex count and face structure.
    pub fn is_consistent_topology(&self, other: &Self) -> bool {
        self.topology_mismatch(other).is_none()
    }

    /// Describe the first topological difference to `other`, if any.
    pub fn topology_mismatch(&self, other: &Self) -> Option<String> {
        if self.positions.len() != other.positions.len() {
            return Some(format!(
                "vertex count {} vs {}",
                self.positions.len(),
                other.positions.len()
            ));
        }
        if self.face_counts != other.face_counts {
            return Some(format!(
                "face layout differs ({} vs {} faces)",
                self.face_counts.len(),
                other.face_counts.len()
            ));
        }
        if self.face_indices != other.face_indices {
            return Some("face vertex indices differ".to_string());
        }
        None
    }

    /// Copy of the geometry without any optional channel.
    pub fn geometry_only(&self) -> Self {
        Self {
            positions: self.positions.clone(),
            face_counts: self.face_counts.clone(),
            face_indices: self.face_indices.clone(),
            ..Self::default()
        }
    }

    /// Attach a velocity channel, checking its length.
    pub fn set_velocities(&mut self, velocities: Vec<Vec3>) -> Result<()> {
        if velocities.len() != self.positions.len() {
            return Err(Error::ChannelMismatch {
                channel: VELOCITY_CHANNEL,
                expected: self.positions.len(),
                actual: velocities.len(),
            });
        }
        self.velocities = Some(velocities);
        Ok(())
    }

    /// Attach an all-zero velocity channel if none exists.
    pub fn ensure_velocities(&mut self) {
        if self.velocities.is_none() {
            self.velocities = Some(vec![Vec3::ZERO; self.positions.len()]);
        }
    }

    /// Positions displaced along the velocity channel by `seconds`.
    ///
    /// Without velocities, or for a negligible offset, the positions are
    /// returned unchanged.
    pub fn positions_at_offset(&self, seconds: f32) -> Result<Vec<Vec3>> {
        match &self.velocities {
            Some(v) if seconds.abs() > 1e-5 => {
                if v.len() != self.positions.len() {
                    return Err(Error::ChannelMismatch {
                        channel: VELOCITY_CHANNEL,
                        expected: self.positions.len(),
                        actual: v.len(),
                    });
                }
                Ok(self.positions.iter().zip(v).map(|(&p, &v)| p + v * seconds).collect())
            }
            _ => Ok(self.positions.clone()),
        }
    }

    /// Keep an evenly spread `fraction` of the faces.
    ///
    /// Vertices are kept as they are so vertex channels stay valid.
    pub fn with_face_fraction(&self, fraction: f32) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction >= 1.0 {
            return self.clone();
        }
        let keep = fractional_indices(self.num_faces(), fraction);
        let faces: Vec<&[u32]> = self.faces().collect();

        let mut out = Self {
            positions: self.positions.clone(),
            velocities: self.velocities.clone(),
            ..Self::default()
        };
        let mut ids = self.material_ids.as_ref().map(|_| Vec::with_capacity(keep.len()));
        for i in keep {
            out.face_counts.push(faces[i].len() as u32);
            out.face_indices.extend_from_slice(faces[i]);
            if let (Some(ids), Some(src)) = (ids.as_mut(), self.material_ids.as_ref()) {
                ids.push(src[i]);
            }
        }
        out.material_ids = ids;
        out
    }

    /// Concatenate several meshes into one.
    ///
    /// A channel is kept only when every input has it, which is why the
    /// velocity estimator fills zero velocities before meshes are combined.
    pub fn combine(meshes: &[Self]) -> Self {
        let mut out = Self::new();
        let all_velocities = !meshes.is_empty() && meshes.iter().all(|m| m.velocities.is_some());
        let all_materials = !meshes.is_empty() && meshes.iter().all(|m| m.material_ids.is_some());
        let mut velocities = Vec::new();
        let mut material_ids = Vec::new();

        for mesh in meshes {
            let base = out.positions.len() as u32;
            out.positions.extend_from_slice(&mesh.positions);
            out.face_counts.extend_from_slice(&mesh.face_counts);
            out.face_indices.extend(mesh.face_indices.iter().map(|&i| i + base));
            if let (true, Some(v)) = (all_velocities, &mesh.velocities) {
                velocities.extend_from_slice(v);
            }
            if let (true, Some(ids)) = (all_materials, &mesh.material_ids) {
                material_ids.extend_from_slice(ids);
            }
        }

        out.velocities = all_velocities.then_some(velocities);
        out.material_ids = all_materials.then_some(material_ids);
        out
    }
}

/// Indices `0..count` thinned to roughly `fraction * count` evenly spaced entries.
pub fn fractional_indices(count: usize, fraction: f32) -> Vec<usize> {
    let fraction = fraction.clamp(0.0, 1.0) as f64;
    let wanted = (count as f64 * fraction).round() as usize;
    if wanted == 0 {
        return Vec::new();
    }
    let stride = count as f64 / wanted as f64;
    (0..wanted)
        .map(|i| ((i as f64 * stride) as usize).min(count - 1))
        .collect()
}
