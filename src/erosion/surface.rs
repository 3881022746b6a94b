//! Terrain samples and surface normal estimation.
//!
//! A heightmap cell is either a bare elevation (`f32`) or a full vertex
//! position (`Vec3`) whose x/z are fixed and whose y is the elevation.
//! Both expose the same interface to the simulators through [`HeightSample`].

use glam::{Vec2, Vec3};

use crate::tilemap::Tilemap;

/// Distances closer than this are treated as lying on the quad's diagonal.
const DIAGONAL_EPSILON: f32 = 1e-6;

/// A grid cell that carries an elevation.
pub trait HeightSample: Clone {
    fn height(&self) -> f32;

    fn set_height(&mut self, height: f32);

    /// Position of this sample in 3D (y up) for a cell at grid `(x, y)`.
    fn surface_point(&self, x: usize, y: usize, cell_size: f32) -> Vec3;

    fn add_height(&mut self, delta: f32) {
        let h = self.height();
        self.set_height(h + delta);
    }
}

impl HeightSample for f32 {
    fn height(&self) -> f32 {
        *self
    }

    fn set_height(&mut self, height: f32) {
        *self = height;
    }

    fn surface_point(&self, x: usize, y: usize, cell_size: f32) -> Vec3 {
        Vec3::new(x as f32 * cell_size, *self, y as f32 * cell_size)
    }
}

impl HeightSample for Vec3 {
    fn height(&self) -> f32 {
        self.y
    }

    fn set_height(&mut self, height: f32) {
        self.y = height;
    }

    fn surface_point(&self, _x: usize, _y: usize, _cell_size: f32) -> Vec3 {
        *self
    }
}

/// Estimate the unit surface normal at `position` from the quad whose lower
/// corner is `cell`.
///
/// The quad is split along the diagonal from `(x+1, y)` to `(x, y+1)`. The
/// triangle containing the position is chosen by comparing its distance to the
/// near corner `(x, y)` and the far corner `(x+1, y+1)`; on the diagonal the
/// two triangle normals are averaged. The result always points up (y >= 0).
///
/// `cell` must satisfy `x + 1 < width` and `y + 1 < height`.
pub fn estimate_normal<T: HeightSample>(
    heightmap: &Tilemap<T>,
    cell: (usize, usize),
    position: Vec2,
    cell_size: f32,
) -> Vec3 {
    let (x, y) = cell;
    let point = |px: usize, py: usize| heightmap.get(px, py).surface_point(px, py, cell_size);

    let p00 = point(x, y);
    let p10 = point(x + 1, y);
    let p01 = point(x, y + 1);
    let p11 = point(x + 1, y + 1);

    let near_normal = (p01 - p00).cross(p10 - p00).normalize_or_zero();
    let far_normal = (p10 - p11).cross(p01 - p11).normalize_or_zero();

    let near_distance = position.distance(Vec2::new(x as f32, y as f32));
    let far_distance = position.distance(Vec2::new(x as f32 + 1.0, y as f32 + 1.0));

    let normal = if (near_distance - far_distance).abs() <= DIAGONAL_EPSILON {
        ((near_normal + far_normal) * 0.5).normalize_or_zero()
    } else if near_distance < far_distance {
        near_normal
    } else {
        far_normal
    };

    if normal == Vec3::ZERO {
        return Vec3::Y;
    }
    if normal.y < 0.0 {
        -normal
    } else {
        normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn test_flat_normal_points_up() {
        let heightmap = Tilemap::new_with(4, 4, 3.0f32);
        for position in [Vec2::new(1.2, 1.1), Vec2::new(1.9, 1.8), Vec2::new(1.5, 1.5)] {
            assert_vec_close(estimate_normal(&heightmap, (1, 1), position, 1.0), Vec3::Y);
        }
    }

    #[test]
    fn test_slope_normal_leans_downhill() {
        // h = -x: downhill is +x
        let heightmap = Tilemap::from_fn(4, |x, _| -(x as f32));
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert_vec_close(estimate_normal(&heightmap, (1, 1), Vec2::new(1.2, 1.2), 1.0), expected);
        assert_vec_close(estimate_normal(&heightmap, (1, 1), Vec2::new(1.9, 1.9), 1.0), expected);
    }

    #[test]
    fn test_triangle_selection() {
        // Only the far corner is raised, so the near triangle stays flat.
        let mut heightmap = Tilemap::new_with(3, 3, 0.0f32);
        heightmap.set(1, 1, 1.0);

        let near = estimate_normal(&heightmap, (0, 0), Vec2::new(0.1, 0.2), 1.0);
        assert_vec_close(near, Vec3::Y);

        let far = estimate_normal(&heightmap, (0, 0), Vec2::new(0.9, 0.8), 1.0);
        assert_vec_close(far, Vec3::new(-1.0, 1.0, -1.0).normalize());
    }

    #[test]
    fn test_diagonal_averages_triangles() {
        let mut heightmap = Tilemap::new_with(3, 3, 0.0f32);
        heightmap.set(1, 1, 1.0);

        let on_diagonal = estimate_normal(&heightmap, (0, 0), Vec2::new(0.5, 0.5), 1.0);
        let expected = (Vec3::Y + Vec3::new(-1.0, 1.0, -1.0).normalize()).normalize();
        assert_vec_close(on_diagonal, expected);
        assert!((on_diagonal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_normal_is_never_downward() {
        // Mirrored x axis flips the cross product; the estimator must flip it back.
        let heightmap =
            Tilemap::from_fn(3, |x, y| Vec3::new(-(x as f32), 0.5 * y as f32, y as f32));
        let normal = estimate_normal(&heightmap, (0, 0), Vec2::new(0.2, 0.3), 1.0);
        assert!(normal.y >= 0.0);
        assert!((normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_vector_samples_match_scalar() {
        let scalar = Tilemap::from_fn(4, |x, y| (x * y) as f32 * 0.3);
        let vector = scalar.map(|x, y, &h| h.surface_point(x, y, 0.5));
        let position = Vec2::new(1.3, 1.6);
        assert_vec_close(
            estimate_normal(&scalar, (1, 1), position, 0.5),
            estimate_normal(&vector, (1, 1), position, 0.5),
        );
    }

    #[test]
    fn test_degenerate_quad_defaults_up() {
        let heightmap = Tilemap::new_with(2, 2, Vec3::ZERO);
        assert_eq!(estimate_normal(&heightmap, (0, 0), Vec2::new(0.3, 0.1), 1.0), Vec3::Y);
    }
}
