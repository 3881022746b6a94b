//! Cellular water redistribution.
//!
//! One call advances the whole grid by a single tick. Every interior cell
//! looks at its four orthogonal neighbours: water held by lower neighbours
//! counts as outflow, water held by higher neighbours as inflow. All cells
//! read the previous tick's state; results land in fresh grids that replace
//! the old ones only after the pass.

use crate::erosion::params::FlowCoupling;
use crate::erosion::surface::HeightSample;
use crate::tilemap::Tilemap;

const NEIGHBOURS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Totals for one flow tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlowStats {
    /// Water leaving cells toward lower neighbours, summed over the grid
    pub outflow: f64,
    /// Water arriving from higher neighbours, summed over the grid
    pub inflow: f64,
    /// Height removed in height-coupled mode
    pub height_removed: f64,
    /// Total water after the tick
    pub total_water: f64,
}

/// Advance `water` (and `heightmap` when height-coupled) by one tick.
///
/// `cell_size` is the distance between neighbouring samples. The one-cell
/// border is carried over unchanged.
///
/// # Panics
///
/// If `heightmap` and `water` differ in shape.
pub fn step<T: HeightSample>(
    heightmap: &mut Tilemap<T>,
    water: &mut Tilemap<f32>,
    cell_size: f32,
    coupling: FlowCoupling,
) -> FlowStats {
    assert_eq!(
        heightmap.shape(),
        water.shape(),
        "water grid must match the heightmap"
    );

    let mut stats = FlowStats::default();
    let mut new_water = water.clone();
    let mut new_heightmap = match coupling {
        FlowCoupling::HeightCoupled => Some(heightmap.clone()),
        FlowCoupling::WaterOnly => None,
    };

    let (width, height) = heightmap.shape();
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let cell_height = heightmap.get(x, y).height();
            let mut outflow = 0.0f32;
            let mut inflow = 0.0f32;

            for (dx, dy) in NEIGHBOURS {
                let nx = x.wrapping_add_signed(dx);
                let ny = y.wrapping_add_signed(dy);
                let slope = (heightmap.get(nx, ny).height() - cell_height) / cell_size;
                let neighbour_water = *water.get(nx, ny);
                if slope < 0.0 {
                    outflow += neighbour_water;
                } else if slope > 0.0 {
                    inflow += neighbour_water;
                }
            }

            let level = (*water.get(x, y) - outflow + inflow).max(0.0);
            new_water.set(x, y, level);

            if let Some(new_heightmap) = new_heightmap.as_mut() {
                let removed = outflow.abs() + inflow.abs();
                new_heightmap.get_mut(x, y).add_height(-removed);
                stats.height_removed += removed as f64;
            }

            stats.outflow += outflow as f64;
            stats.inflow += inflow as f64;
        }
    }

    *water = new_water;
    if let Some(new_heightmap) = new_heightmap {
        *heightmap = new_heightmap;
    }

    stats.total_water = water.iter().map(|(_, _, &w)| w as f64).sum();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_flat_grid_is_stable() {
        let mut heightmap = Tilemap::new_with(6, 6, 1.0f32);
        let mut water = Tilemap::new_with(6, 6, 10.0f32);
        let stats = step(&mut heightmap, &mut water, 0.5, FlowCoupling::WaterOnly);

        assert!(water.iter().all(|(_, _, &w)| w == 10.0));
        assert_eq!(stats.outflow, 0.0);
        assert_eq!(stats.inflow, 0.0);
    }

    #[test]
    fn test_pit_gathers_water() {
        let mut heightmap = Tilemap::new_with(5, 5, 1.0f32);
        heightmap.set(2, 2, 0.0);
        let mut water = Tilemap::new_with(5, 5, 1.0f32);

        step(&mut heightmap, &mut water, 1.0, FlowCoupling::WaterOnly);

        // Four higher neighbours flow in.
        assert_eq!(*water.get(2, 2), 5.0);
        // Each neighbour of the pit loses the pit's water.
        assert_eq!(*water.get(1, 2), 0.0);
        assert_eq!(*water.get(2, 1), 0.0);
        // Unaffected interior cell
        assert_eq!(*water.get(1, 1), 1.0);
    }

    #[test]
    fn test_border_untouched() {
        let mut heightmap = Tilemap::from_fn(5, |x, y| (x + y) as f32);
        let mut water = Tilemap::from_fn(5, |x, y| (x * 5 + y) as f32);
        let before = water.clone();

        step(&mut heightmap, &mut water, 1.0, FlowCoupling::HeightCoupled);

        for (x, y, &w) in water.iter() {
            if !water.is_interior(x, y) {
                assert_eq!(w, *before.get(x, y));
                assert_eq!(*heightmap.get(x, y), (x + y) as f32);
            }
        }
    }

    #[test]
    fn test_never_negative() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut heightmap = Tilemap::from_fn(16, |_, _| rng.gen_range(-5.0f32..5.0));
        let mut water = Tilemap::from_fn(16, |_, _| rng.gen_range(0.0f32..3.0));

        for _ in 0..10 {
            let stats = step(&mut heightmap, &mut water, 0.5, FlowCoupling::WaterOnly);
            assert!(water.iter().all(|(_, _, &w)| w >= 0.0));
            assert!(stats.total_water >= 0.0);
        }
    }

    #[test]
    fn test_synchronous_update() {
        // A staircase: every interior cell sees the same previous-tick water,
        // so the result does not depend on scan order.
        let mut heightmap = Tilemap::from_fn(5, |x, _| x as f32);
        let mut water = Tilemap::new_with(5, 5, 2.0f32);

        step(&mut heightmap, &mut water, 1.0, FlowCoupling::WaterOnly);

        for y in 1..4 {
            for x in 1..4 {
                // One lower neighbour (left) and one higher (right) cancel.
                assert_eq!(*water.get(x, y), 2.0, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_height_coupling() {
        let mut heightmap = Tilemap::new_with(5, 5, 1.0f32);
        heightmap.set(2, 2, 0.0);
        let mut water = Tilemap::new_with(5, 5, 1.0f32);
        let stats = step(&mut heightmap, &mut water, 1.0, FlowCoupling::HeightCoupled);

        assert_eq!(*heightmap.get(2, 2), -4.0);
        assert_eq!(*heightmap.get(1, 2), 0.0);
        assert_eq!(*heightmap.get(1, 1), 1.0);
        assert!(stats.height_removed > 0.0);

        let mut untouched = Tilemap::new_with(5, 5, 1.0f32);
        untouched.set(2, 2, 0.0);
        let mut water = Tilemap::new_with(5, 5, 1.0f32);
        step(&mut untouched, &mut water, 1.0, FlowCoupling::WaterOnly);
        assert_eq!(*untouched.get(2, 2), 0.0);
        assert_eq!(*untouched.get(1, 2), 1.0);
    }

    #[test]
    #[should_panic(expected = "water grid must match the heightmap")]
    fn test_mismatched_water_grid_panics() {
        let mut heightmap = Tilemap::new_with(6, 6, 1.0f32);
        let mut water = Tilemap::new_with(5, 5, 1.0f32);
        step(&mut heightmap, &mut water, 1.0, FlowCoupling::WaterOnly);
    }

    #[test]
    fn test_tiny_grid_unchanged() {
        let mut heightmap = Tilemap::from_fn(2, |x, _| x as f32);
        let mut water = Tilemap::new_with(2, 2, 4.0f32);
        step(&mut heightmap, &mut water, 1.0, FlowCoupling::HeightCoupled);
        assert!(water.iter().all(|(_, _, &w)| w == 4.0));
    }
}
