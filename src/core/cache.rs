//! Single-generation mesh cache.
//!
//! Keeps the result of the most recent load so that repeated evaluations
//! of the same frame (or the same interpolation bracket) do not touch the
//! loader again. Any key change replaces the entry; there is no history.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::geom::{LoadMask, MeshMetadata, MeshSample};
use crate::loader::MeshLoader;
use crate::util::{Error, Frame, Result};

use super::mode::LoadingMode;

/// Frames an entry was loaded for. Frames compare by their bit pattern.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub enum SampleKey {
    /// Time-independent file.
    Static,
    /// One frame.
    Frame(u64),
    /// Both ends of an interpolation bracket.
    Bracket(u64, u64),
}

impl SampleKey {
    /// Key for a single frame.
    #[inline]
    pub fn frame(frame: Frame) -> Self {
        Self::Frame(frame.to_bits())
    }

    /// Key for a bracket.
    #[inline]
    pub fn bracket(lo: Frame, hi: Frame) -> Self {
        Self::Bracket(lo.to_bits(), hi.to_bits())
    }
}

/// Key for the cached entry.
#[derive(Clone, Hash, Eq, PartialEq, Debug)]
pub struct CacheKey {
    /// Sequence path.
    pub path: PathBuf,
    pub mode: LoadingMode,
    pub mask: LoadMask,
    pub sample: SampleKey,
}

impl CacheKey {
    /// Create a new cache key.
    pub fn new(path: impl Into<PathBuf>, mode: LoadingMode, mask: LoadMask, sample: SampleKey) -> Self {
        Self { path: path.into(), mode, mask, sample }
    }
}

/// Meshes and metadata retained for one key.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    key: CacheKey,
    first: Arc<MeshSample>,
    second: Option<Arc<MeshSample>>,
    metadata: MeshMetadata,
    // Last blend result, keyed by alpha bits
    blended: Option<(u32, Arc<MeshSample>)>,
}

impl CacheEntry {
    /// Key this entry was loaded for.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Mesh of the single frame, or of the bracket's first endpoint.
    pub fn mesh(&self) -> &Arc<MeshSample> {
        &self.first
    }

    /// Mesh of the bracket's second endpoint.
    pub fn second(&self) -> Option<&Arc<MeshSample>> {
        self.second.as_ref()
    }

    /// Metadata of the first loaded file.
    pub fn metadata(&self) -> &MeshMetadata {
        &self.metadata
    }
}

/// Cache holding exactly one generation of loaded meshes.
#[derive(Debug, Default)]
pub struct MeshCache {
    entry: Option<CacheEntry>,
    loads: usize,
}

impl MeshCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if nothing is cached.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    /// The cached entry, if any.
    pub fn entry(&self) -> Option<&CacheEntry> {
        self.entry.as_ref()
    }

    /// Number of loader calls made through this cache.
    #[inline]
    pub fn load_count(&self) -> usize {
        self.loads
    }

    /// Drop the cached entry.
    pub fn clear(&mut self) {
        if self.entry.take().is_some() {
            tracing::debug!("mesh cache cleared");
        }
    }

    /// Drop the cached entry if it belongs to a different sequence path.
    pub fn invalidate_path(&mut self, path: &Path) {
        if self.entry.as_ref().is_some_and(|e| e.key.path != path) {
            self.clear();
        }
    }

    /// Return the entry for `key`, loading it on a miss.
    ///
    /// A bracket loads both endpoints; the metadata of the first one is kept.
    /// Any loader failure leaves the cache empty.
    pub fn get_or_load(&mut self, loader: &dyn MeshLoader, key: CacheKey) -> Result<&CacheEntry> {
        let hit = self.entry.as_ref().is_some_and(|e| e.key == key);
        if hit {
            tracing::debug!(path = %key.path.display(), sample = ?key.sample, "mesh cache hit");
        } else {
            tracing::debug!(path = %key.path.display(), sample = ?key.sample, "mesh cache miss");
            self.entry = None;
            match self.load(loader, key) {
                Ok(entry) => self.entry = Some(entry),
                Err(e) => {
                    self.clear();
                    return Err(e);
                }
            }
        }
        self.entry.as_ref().ok_or_else(|| Error::other("mesh cache entry missing after load"))
    }

    fn load(&mut self, loader: &dyn MeshLoader, key: CacheKey) -> Result<CacheEntry> {
        let (first, second, metadata) = match key.sample {
            SampleKey::Static => {
                let loaded = self.load_one(loader, &key, None)?;
                (loaded.mesh, None, loaded.metadata)
            }
            SampleKey::Frame(bits) => {
                let loaded = self.load_one(loader, &key, Some(Frame::from_bits(bits)))?;
                (loaded.mesh, None, loaded.metadata)
            }
            SampleKey::Bracket(lo, hi) => {
                let a = self.load_one(loader, &key, Some(Frame::from_bits(lo)))?;
                let b = if hi == lo {
                    Arc::new(a.mesh.clone())
                } else if key.mask.is_box_only() {
                    // Box display only ever shows the first endpoint
                    return Ok(CacheEntry {
                        key,
                        first: Arc::new(a.mesh),
                        second: None,
                        metadata: a.metadata,
                        blended: None,
                    });
                } else {
                    Arc::new(self.load_one(loader, &key, Some(Frame::from_bits(hi)))?.mesh)
                };
                (a.mesh, Some(b), a.metadata)
            }
        };
        Ok(CacheEntry { key, first: Arc::new(first), second, metadata, blended: None })
    }

    fn load_one(
        &mut self,
        loader: &dyn MeshLoader,
        key: &CacheKey,
        frame: Option<Frame>,
    ) -> Result<crate::loader::LoadedMesh> {
        self.loads += 1;
        loader.load(&key.path, frame, key.mask)
    }

    /// Blend of the cached bracket at `alpha`.
    ///
    /// `alpha == 0` returns the first endpoint and `alpha == 1` the second
    /// without interpolating. Other values are interpolated once and reused
    /// while the bracket and alpha stay the same. A topology mismatch
    /// between the endpoints clears the cache.
    pub fn blend(&mut self, loader: &dyn MeshLoader, alpha: f32) -> Result<Arc<MeshSample>> {
        let Some(entry) = self.entry.as_mut() else {
            return Err(Error::other("no cached bracket to blend"));
        };
        let Some(second) = entry.second.clone() else {
            return Ok(Arc::clone(&entry.first));
        };
        if alpha <= 0.0 {
            return Ok(Arc::clone(&entry.first));
        }
        if alpha >= 1.0 {
            return Ok(second);
        }
        if let Some((bits, mesh)) = &entry.blended {
            if *bits == alpha.to_bits() {
                return Ok(Arc::clone(mesh));
            }
        }
        match loader.interpolate(&entry.first, &second, alpha) {
            Ok(mesh) => {
                let mesh = Arc::new(mesh);
                entry.blended = Some((alpha.to_bits(), Arc::clone(&mesh)));
                Ok(mesh)
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use crate::util::Vec3;

    const SEQ: &str = "shots/box_####.xmesh";

    fn tri(x: f32) -> MeshSample {
        MeshSample::from_polygons(
            vec![Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 0.0, 0.0), Vec3::new(x, 1.0, 0.0)],
            &[&[0, 1, 2]],
        )
    }

    fn loader() -> MemoryLoader {
        let mut loader = MemoryLoader::new();
        for f in [1, 2, 3, 5, 8] {
            loader.insert_frame(SEQ, f as Frame, tri(f as f32));
        }
        loader
    }

    fn key(sample: SampleKey) -> CacheKey {
        CacheKey::new(SEQ, LoadingMode::FrameInterpolation, LoadMask::STATIC_MESH, sample)
    }

    #[test]
    fn test_identical_keys_load_once() {
        let loader = loader();
        let mut cache = MeshCache::new();
        cache.get_or_load(&loader, key(SampleKey::frame(3.0))).unwrap();
        cache.get_or_load(&loader, key(SampleKey::frame(3.0))).unwrap();
        assert_eq!(cache.load_count(), 1);
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn test_key_change_replaces_entry() {
        let loader = loader();
        let mut cache = MeshCache::new();
        cache.get_or_load(&loader, key(SampleKey::frame(3.0))).unwrap();
        cache.get_or_load(&loader, key(SampleKey::frame(5.0))).unwrap();
        cache.get_or_load(&loader, key(SampleKey::frame(3.0))).unwrap();
        assert_eq!(cache.load_count(), 3);

        let mut other_mask = key(SampleKey::frame(3.0));
        other_mask.mask = LoadMask::BOX;
        cache.get_or_load(&loader, other_mask).unwrap();
        assert_eq!(cache.load_count(), 4);
    }

    #[test]
    fn test_bracket_loads_twice() {
        let loader = loader();
        let mut cache = MeshCache::new();
        let entry = cache.get_or_load(&loader, key(SampleKey::bracket(3.0, 5.0))).unwrap();
        assert_eq!(entry.mesh().positions[0].x, 3.0);
        assert_eq!(entry.second().unwrap().positions[0].x, 5.0);
        assert_eq!(cache.load_count(), 2);

        // Collapsed bracket loads only once
        cache.get_or_load(&loader, key(SampleKey::bracket(8.0, 8.0))).unwrap();
        assert_eq!(cache.load_count(), 3);
    }

    #[test]
    fn test_loader_error_clears() {
        let loader = loader();
        let mut cache = MeshCache::new();
        cache.get_or_load(&loader, key(SampleKey::frame(3.0))).unwrap();
        assert!(cache.get_or_load(&loader, key(SampleKey::frame(4.0))).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_blend_shortcuts_and_memo() {
        let loader = loader();
        let mut cache = MeshCache::new();
        cache.get_or_load(&loader, key(SampleKey::bracket(3.0, 5.0))).unwrap();

        let zero = cache.blend(&loader, 0.0).unwrap();
        assert!(Arc::ptr_eq(&zero, cache.entry().unwrap().mesh()));
        let one = cache.blend(&loader, 1.0).unwrap();
        assert_eq!(one.positions[0].x, 5.0);

        let half = cache.blend(&loader, 0.5).unwrap();
        assert_eq!(half.positions[0].x, 4.0);
        let again = cache.blend(&loader, 0.5).unwrap();
        assert!(Arc::ptr_eq(&half, &again));
    }

    #[test]
    fn test_blend_topology_mismatch_clears() {
        let mut loader = loader();
        let mut odd = tri(4.0);
        odd.positions.push(Vec3::ONE);
        loader.insert_frame(SEQ, 4.0, odd);

        let mut cache = MeshCache::new();
        cache.get_or_load(&loader, key(SampleKey::bracket(3.0, 4.0))).unwrap();
        assert!(matches!(cache.blend(&loader, 0.5), Err(Error::TopologyMismatch(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_path() {
        let loader = loader();
        let mut cache = MeshCache::new();
        cache.get_or_load(&loader, key(SampleKey::frame(1.0))).unwrap();
        cache.invalidate_path(Path::new(SEQ));
        assert!(!cache.is_empty());
        cache.invalidate_path(Path::new("other_####.xmesh"));
        assert!(cache.is_empty());
    }
}
