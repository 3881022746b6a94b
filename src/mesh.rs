//! Triangle mesh built from an eroded heightmap.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::erosion::HeightSample;
use crate::tilemap::Tilemap;

/// GPU-ready vertex layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub resolution: usize,
    pub vertices: Vec<MeshVertex>,
    /// Counter-clockwise when seen from above, three indices per triangle
    pub triangles: Vec<u32>,
}

impl MeshData {
    /// Triangulate a square grid, two triangles per quad, and compute
    /// area-weighted vertex normals.
    pub fn from_grid<T: HeightSample>(heightmap: &Tilemap<T>, cell_size: f32) -> Self {
        let resolution = heightmap.resolution();
        let positions: Vec<Vec3> = heightmap
            .iter()
            .map(|(x, y, sample)| sample.surface_point(x, y, cell_size))
            .collect();
        let triangles = grid_triangles(resolution);
        let normals = vertex_normals(&positions, &triangles);

        let vertices = positions
            .iter()
            .zip(normals)
            .map(|(position, normal)| MeshVertex {
                position: position.to_array(),
                normal: normal.to_array(),
            })
            .collect();

        Self {
            resolution,
            vertices,
            triangles,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Raw vertex bytes for upload to a vertex buffer.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Write the mesh as a Wavefront OBJ file.
    pub fn write_obj(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "# {}x{} eroded terrain", self.resolution, self.resolution)?;
        for vertex in &self.vertices {
            let [x, y, z] = vertex.position;
            writeln!(out, "v {x} {y} {z}")?;
        }
        for vertex in &self.vertices {
            let [x, y, z] = vertex.normal;
            writeln!(out, "vn {x} {y} {z}")?;
        }
        for face in self.triangles.chunks_exact(3) {
            let (a, b, c) = (face[0] + 1, face[1] + 1, face[2] + 1);
            writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}")?;
        }
        out.flush()
    }
}

fn grid_triangles(resolution: usize) -> Vec<u32> {
    if resolution < 2 {
        return Vec::new();
    }
    let n = resolution as u32;
    let mut triangles = Vec::with_capacity((resolution - 1) * (resolution - 1) * 6);
    for z in 0..n - 1 {
        for x in 0..n - 1 {
            let i = z * n + x;
            triangles.extend_from_slice(&[i, i + n, i + 1]);
            triangles.extend_from_slice(&[i + n + 1, i + 1, i + n]);
        }
    }
    triangles
}

fn vertex_normals(positions: &[Vec3], triangles: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for face in triangles.chunks_exact(3) {
        let [a, b, c] = [face[0] as usize, face[1] as usize, face[2] as usize];
        // Unnormalized cross product weights by triangle area.
        let face_normal = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face_normal;
        normals[b] += face_normal;
        normals[c] += face_normal;
    }
    normals.into_iter().map(|n| n.try_normalize().unwrap_or(Vec3::Y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_count_and_winding() {
        let heightmap = Tilemap::new_with(4, 4, 0.0f32);
        let mesh = MeshData::from_grid(&heightmap, 1.0);
        assert_eq!(mesh.vertices.len(), 16);
        assert_eq!(mesh.triangle_count(), 18);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_slope_normals() {
        let heightmap = Tilemap::from_fn(5, |x, _| -(x as f32));
        let mesh = MeshData::from_grid(&heightmap, 1.0);
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();
        for v in &mesh.vertices {
            assert!((Vec3::from_array(v.normal) - expected).length() < 1e-5);
        }
    }

    #[test]
    fn test_vertex_bytes() {
        let mesh = MeshData::from_grid(&Tilemap::new_with(3, 3, 1.0f32), 0.5);
        assert_eq!(mesh.vertex_bytes().len(), 9 * std::mem::size_of::<MeshVertex>());
        assert_eq!(mesh.vertices[4].position, [0.5, 1.0, 0.5]);
    }

    #[test]
    fn test_write_obj() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.obj");
        let mesh = MeshData::from_grid(&Tilemap::new_with(3, 3, 0.0f32), 1.0);
        mesh.write_obj(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 9);
        assert_eq!(text.lines().filter(|l| l.starts_with("vn ")).count(), 9);
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 8);
        assert!(text.contains("f 1//1 4//4 2//2"));
    }

    #[test]
    fn test_single_sample_has_no_triangles() {
        let mesh = MeshData::from_grid(&Tilemap::new_with(1, 1, 0.0f32), 1.0);
        assert!(mesh.triangles.is_empty());
        assert_eq!(mesh.vertices.len(), 1);
    }
}
