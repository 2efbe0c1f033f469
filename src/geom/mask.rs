//! Load masks select which parts of a mesh file are read.

use bitflags::bitflags;

bitflags! {
    /// Parts of a mesh snapshot to load.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct LoadMask: u32 {
        /// Vertex positions.
        const VERTS = 1;
        /// Polygon connectivity.
        const FACES = 1 << 1;
        /// Per-vertex velocity channel.
        const VELOCITY = 1 << 2;
        /// Remaining vertex and face channels (UVs, material IDs, ...).
        const MAPS = 1 << 3;
        /// Bounding box from metadata only.
        const BOX = 1 << 4;
        /// Everything needed to display a static mesh.
        const STATIC_MESH = Self::VERTS.bits() | Self::FACES.bits() | Self::MAPS.bits();
    }
}

impl LoadMask {
    /// Check if only the bounding box is requested.
    #[inline]
    pub fn is_box_only(self) -> bool {
        self == Self::BOX
    }

    /// Check if geometry has to be read at all.
    #[inline]
    pub fn needs_geometry(self) -> bool {
        self.intersects(Self::VERTS | Self::FACES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_mesh_bits() {
        assert!(LoadMask::STATIC_MESH.contains(LoadMask::VERTS | LoadMask::FACES));
        assert!(!LoadMask::STATIC_MESH.contains(LoadMask::VELOCITY));
        assert!(LoadMask::BOX.is_box_only());
        assert!(!(LoadMask::BOX | LoadMask::VERTS).is_box_only());
        assert!(!LoadMask::BOX.needs_geometry());
        assert!(LoadMask::VERTS.needs_geometry());
    }
}
