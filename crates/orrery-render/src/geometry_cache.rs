//! Content-addressed cache of drawable geometry.
//!
//! Entries are keyed by what was used to build them (shape, tessellation and
//! texture). A key either hits and returns the stored drawable or misses and
//! builds it exactly once; nothing is rebuilt per frame. Changing the render
//! configuration produces different keys, and [`GeometryCache::invalidate`]
//! drops the stale ones.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::texture::TextureHandle;

/// Kind of precomputed shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Sphere,
    /// Sphere seen from inside (backdrop).
    InvertedSphere,
    /// Flat ring; inner radius as a fraction of the outer, in thousandths.
    Annulus { inner_permille: u16 },
    /// Closed unit circle drawn as lines.
    OrbitLoop,
}

impl ShapeKind {
    /// Annulus key for an inner/outer radius pair.
    pub fn annulus(inner: f32, outer: f32) -> Self {
        let ratio = if outer > 0.0 { inner / outer } else { 0.0 };
        ShapeKind::Annulus {
            inner_permille: (ratio.clamp(0.0, 1.0) * 1000.0).round() as u16,
        }
    }

    pub fn inner_ratio(&self) -> Option<f32> {
        match self {
            ShapeKind::Annulus { inner_permille } => Some(*inner_permille as f32 / 1000.0),
            _ => None,
        }
    }
}

/// Tessellation of a shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub segments: u32,
    pub rings: u32,
}

impl Resolution {
    pub fn new(segments: u32, rings: u32) -> Self {
        Self { segments, rings }
    }
}

/// Everything a cached drawable depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryKey {
    pub shape: ShapeKind,
    pub resolution: Resolution,
    pub texture: Option<TextureHandle>,
}

impl GeometryKey {
    pub fn new(shape: ShapeKind, resolution: Resolution, texture: Option<TextureHandle>) -> Self {
        Self {
            shape,
            resolution,
            texture,
        }
    }

    /// The same key without its texture, for sharing the bare mesh.
    pub fn untextured(&self) -> Self {
        Self {
            texture: None,
            ..*self
        }
    }
}

/// Build-once cache mapping [`GeometryKey`]s to drawables.
#[derive(Debug)]
pub struct GeometryCache<T> {
    entries: HashMap<GeometryKey, T>,
    builds: u64,
}

impl<T> Default for GeometryCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            builds: 0,
        }
    }
}

impl<T> GeometryCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `key`, building it on first request.
    pub fn get_or_build(&mut self, key: GeometryKey, build: impl FnOnce() -> T) -> &T {
        let builds = &mut self.builds;
        self.entries.entry(key).or_insert_with(|| {
            *builds += 1;
            build()
        })
    }

    /// Fallible variant of [`get_or_build`](Self::get_or_build). A failed build
    /// leaves the cache unchanged.
    pub fn get_or_try_build<E>(
        &mut self,
        key: GeometryKey,
        build: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let value = build()?;
                self.builds += 1;
                Ok(&*entry.insert(value))
            }
        }
    }

    pub fn get(&self, key: &GeometryKey) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &GeometryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every entry whose key matches `stale`. Returns how many were removed.
    pub fn invalidate(&mut self, mut stale: impl FnMut(&GeometryKey) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !stale(key));
        let removed = before - self.entries.len();
        if removed > 0 {
            log::info!("Invalidated {removed} cached geometry entries");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of builds performed over the cache's lifetime.
    pub fn builds(&self) -> u64 {
        self.builds
    }
}
