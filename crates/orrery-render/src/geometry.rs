//! CPU-side mesh generation for spheres, ring annuli and orbit trails.
//!
//! Every generator produces unit-sized geometry; the model matrix of each
//! draw supplies the radius.

use std::f32::consts::{PI, TAU};

use crate::buffer::{BufferAllocator, IndexData, MeshBuffer, VertexPositionNormalUv};

/// Indexed mesh ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<VertexPositionNormalUv>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Flip the mesh so it is seen from the inside.
    ///
    /// Normals point inward, triangle winding is reversed and `u` is mirrored
    /// so an equirectangular panorama reads left-to-right from the centre.
    pub fn inverted(mut self) -> Self {
        for v in &mut self.vertices {
            v.normal = [-v.normal[0], -v.normal[1], -v.normal[2]];
            v.uv[0] = 1.0 - v.uv[0];
        }
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
        self
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn upload(&self, allocator: &BufferAllocator<'_>, label: &str) -> MeshBuffer {
        allocator.create_mesh(label, self.vertex_bytes(), IndexData::U32(&self.indices))
    }
}

/// Latitude/longitude sphere of radius 1 with equirectangular UVs.
///
/// `u` runs with longitude, `v` from the north pole (0) to the south pole (1).
/// Front faces wind counter-clockwise seen from outside.
pub fn uv_sphere(slices: u32, stacks: u32) -> MeshData {
    let slices = slices.max(3);
    let stacks = stacks.max(2);
    let row = slices + 1;

    let mut vertices = Vec::with_capacity((row * (stacks + 1)) as usize);
    for i in 0..=stacks {
        let v = i as f32 / stacks as f32;
        let theta = v * PI;
        for j in 0..=slices {
            let u = j as f32 / slices as f32;
            let phi = u * TAU;
            let p = [
                theta.sin() * phi.cos(),
                theta.cos(),
                -theta.sin() * phi.sin(),
            ];
            vertices.push(VertexPositionNormalUv {
                position: p,
                normal: p,
                uv: [u, v],
            });
        }
    }

    let mut indices = Vec::with_capacity((slices * stacks * 6) as usize);
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * row + j;
            let b = a + row;
            let c = a + 1;
            let d = b + 1;
            indices.extend_from_slice(&[a, b, c, c, b, d]);
        }
    }

    MeshData { vertices, indices }
}

/// Flat ring in the XZ plane between `inner_ratio` and 1, facing +Y.
///
/// `u` runs around the ring, `v` from the inner edge (0) to the outer edge (1).
pub fn annulus(inner_ratio: f32, segments: u32) -> MeshData {
    let segments = segments.max(3);
    let inner_ratio = inner_ratio.clamp(0.0, 1.0);

    let mut vertices = Vec::with_capacity(2 * (segments as usize + 1));
    for i in 0..=segments {
        let u = i as f32 / segments as f32;
        let (s, c) = (u * TAU).sin_cos();
        for (radius, v) in [(inner_ratio, 0.0), (1.0, 1.0)] {
            vertices.push(VertexPositionNormalUv {
                position: [radius * c, 0.0, radius * s],
                normal: [0.0, 1.0, 0.0],
                uv: [u, v],
            });
        }
    }

    let mut indices = Vec::with_capacity(segments as usize * 6);
    for i in 0..segments {
        let inner = 2 * i;
        let outer = inner + 1;
        let inner_next = inner + 2;
        let outer_next = inner + 3;
        indices.extend_from_slice(&[inner, inner_next, outer, outer, inner_next, outer_next]);
    }

    MeshData { vertices, indices }
}

/// Closed unit circle in the XZ plane as a line list.
pub fn orbit_loop(segments: u32) -> MeshData {
    let segments = segments.max(3);
    let vertices = (0..segments)
        .map(|i| {
            let (s, c) = (i as f32 / segments as f32 * TAU).sin_cos();
            VertexPositionNormalUv {
                position: [c, 0.0, s],
                normal: [0.0; 3],
                uv: [0.0; 2],
            }
        })
        .collect();
    let indices = (0..segments)
        .flat_map(|i| [i, (i + 1) % segments])
        .collect();
    MeshData { vertices, indices }
}
