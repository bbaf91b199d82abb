//! Height-field terrain meshes, built off the main thread

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Vec3;
use crate::spatial::AABB;

/// Shape of a terrain patch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainParams {
    /// Cells along each side
    pub resolution: u32,
    /// World-space side length
    pub size: f32,
    /// Peak height
    pub height_scale: f32,
    /// Varies the surface
    pub seed: u32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            resolution: 32,
            size: 64.0,
            height_scale: 4.0,
            seed: 1,
        }
    }
}

/// Vertex layout of terrain meshes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct TerrainVertex {
    /// Position
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
}

/// Finished vertex and index buffers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TerrainMesh {
    /// Grid vertices, row by row
    pub vertices: Vec<TerrainVertex>,
    /// Triangle list
    pub indices: Vec<u32>,
    /// Local-space bounds
    pub bounds: AABB,
}

impl TerrainMesh {
    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex data as bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Builds terrain meshes; pure, so safe to run on any thread
pub struct TerrainMeshBuilder;

impl TerrainMeshBuilder {
    /// Surface height at `(x, z)`
    pub fn height(params: &TerrainParams, x: f32, z: f32) -> f32 {
        let s = params.seed as f32 * 0.618_034;
        let broad = (x * 0.15 + s).sin() * (z * 0.12 + s * 1.7).cos();
        let detail = 0.5 * (x * 0.31 - s * 2.3).sin() * (z * 0.27 + s).sin();
        (broad + detail) * params.height_scale / 1.5
    }

    /// Build the grid mesh for `params`
    pub fn build(params: &TerrainParams) -> TerrainMesh {
        let resolution = params.resolution.max(1);
        let side = resolution + 1;
        let step = params.size / resolution as f32;
        let origin = -params.size * 0.5;

        let mut vertices = Vec::with_capacity((side * side) as usize);
        let mut min = Vec3::repeat(f32::MAX);
        let mut max = Vec3::repeat(f32::MIN);

        for row in 0..side {
            for col in 0..side {
                let x = origin + col as f32 * step;
                let z = origin + row as f32 * step;
                let y = Self::height(params, x, z);

                let left = Self::height(params, x - step, z);
                let right = Self::height(params, x + step, z);
                let down = Self::height(params, x, z - step);
                let up = Self::height(params, x, z + step);
                let normal = Vec3::new(left - right, 2.0 * step, down - up).normalize();

                let position = Vec3::new(x, y, z);
                min = min.inf(&position);
                max = max.sup(&position);
                vertices.push(TerrainVertex {
                    position: position.into(),
                    normal: normal.into(),
                });
            }
        }

        let mut indices = Vec::with_capacity((resolution * resolution * 6) as usize);
        for row in 0..resolution {
            for col in 0..resolution {
                let i0 = row * side + col;
                let i1 = i0 + 1;
                let i2 = i0 + side;
                let i3 = i2 + 1;
                indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
            }
        }

        TerrainMesh {
            vertices,
            indices,
            bounds: AABB::new(min, max),
        }
    }
}
