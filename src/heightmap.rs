use glam::Vec3;
use noise::{NoiseFn, OpenSimplex};
use serde::{Deserialize, Serialize};

use crate::erosion::HeightSample;
use crate::tilemap::Tilemap;

/// Layered noise used to seed a heightmap before erosion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    pub seed: u32,
    /// Base frequency in cycles per world unit
    pub frequency: f64,
    pub octaves: u32,
    /// Amplitude falloff between octaves
    pub persistence: f64,
    /// Frequency growth between octaves
    pub lacunarity: f64,
    /// Peak height of the result
    pub amplitude: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: 3248,
            frequency: 0.03,
            octaves: 5,
            persistence: 0.5,
            lacunarity: 2.0,
            amplitude: 12.0,
        }
    }
}

/// Flat vertex grid spanning `size x size` world units.
pub fn generate_plane(resolution: usize, size: f32) -> Tilemap<Vec3> {
    let step = if resolution > 1 { size / (resolution - 1) as f32 } else { 0.0 };
    Tilemap::from_fn(resolution, |x, z| Vec3::new(x as f32 * step, 0.0, z as f32 * step))
}

/// Scalar heightmap with unit cell spacing, filled with fractal noise.
pub fn generate_heightmap(resolution: usize, params: &NoiseParams) -> Tilemap<f32> {
    let mut heightmap = Tilemap::new_with(resolution, resolution, 0.0f32);
    apply_noise(&mut heightmap, params, 1.0);
    heightmap
}

/// Overwrite every sample's height with noise evaluated at its horizontal position.
pub fn apply_noise<T: HeightSample>(
    heightmap: &mut Tilemap<T>,
    params: &NoiseParams,
    cell_size: f32,
) {
    let noise = OpenSimplex::new(params.seed);
    for (x, y, sample) in heightmap.iter_mut() {
        let point = sample.surface_point(x, y, cell_size);
        let value = fbm(
            &noise,
            point.x as f64 * params.frequency,
            point.z as f64 * params.frequency,
            params.octaves,
            params.persistence,
            params.lacunarity,
        );
        sample.set_height(value as f32 * params.amplitude);
    }
}

// =============================================================================
// NOISE FUNCTIONS
// =============================================================================

/// Fractional Brownian Motion - multi-octave noise, roughly in [-1, 1]
fn fbm(
    noise: &OpenSimplex,
    x: f64,
    y: f64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves.max(1) {
        total += amplitude * noise.get([x * frequency, y * frequency]);
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    total / max_value
}

// =============================================================================
// POST-PROCESSING
// =============================================================================

const BLUR_CENTER: f32 = 0.6;
const BLUR_EDGE: f32 = 0.075;
const BLUR_CORNER: f32 = 0.025;

/// 3x3 Gaussian smoothing of heights. Border samples are copied unchanged.
pub fn gaussian_blur<T: HeightSample>(heightmap: &Tilemap<T>) -> Tilemap<T> {
    let mut result = heightmap.clone();
    let (width, height) = heightmap.shape();
    let h = |x: usize, y: usize| heightmap.get(x, y).height();

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let blurred = h(x, y) * BLUR_CENTER
                + (h(x + 1, y) + h(x - 1, y) + h(x, y + 1) + h(x, y - 1)) * BLUR_EDGE
                + (h(x + 1, y + 1) + h(x - 1, y + 1) + h(x + 1, y - 1) + h(x - 1, y - 1))
                    * BLUR_CORNER;
            result.get_mut(x, y).set_height(blurred);
        }
    }

    result
}

/// Lowest and highest height in the map.
pub fn height_range<T: HeightSample>(heightmap: &Tilemap<T>) -> (f32, f32) {
    let mut min_val = f32::MAX;
    let mut max_val = f32::MIN;
    for (_, _, sample) in heightmap.iter() {
        let h = sample.height();
        min_val = min_val.min(h);
        max_val = max_val.max(h);
    }
    (min_val, max_val)
}

/// Normalize heights to the 0.0-1.0 range. A flat map becomes all zeros.
pub fn normalize_heightmap<T: HeightSample>(heightmap: &Tilemap<T>) -> Tilemap<f32> {
    let (min_val, max_val) = height_range(heightmap);
    let range = max_val - min_val;
    if range < 0.0001 {
        return heightmap.map(|_, _, _| 0.0);
    }
    heightmap.map(|_, _, sample| (sample.height() - min_val) / range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_spacing() {
        let plane = generate_plane(5, 2.0);
        assert_eq!(*plane.get(0, 0), Vec3::ZERO);
        assert_eq!(*plane.get(4, 0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(*plane.get(2, 4), Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_noise_is_seeded() {
        let params = NoiseParams::default();
        let a = generate_heightmap(32, &params);
        let b = generate_heightmap(32, &params);
        assert_eq!(a, b);

        let other = generate_heightmap(32, &NoiseParams { seed: 1, ..params.clone() });
        assert_ne!(a, other);

        let (min_h, max_h) = height_range(&a);
        assert!(min_h < max_h);
        assert!(min_h >= -params.amplitude && max_h <= params.amplitude);
    }

    #[test]
    fn test_noise_keeps_plane_layout() {
        let mut plane = generate_plane(8, 7.0);
        apply_noise(&mut plane, &NoiseParams::default(), 1.0);
        for (x, z, v) in plane.iter() {
            assert_eq!((v.x, v.z), (x as f32, z as f32));
        }
    }

    #[test]
    fn test_blur_kernel_sums_to_one() {
        let flat = Tilemap::new_with(6, 6, 2.0f32);
        let blurred = gaussian_blur(&flat);
        for (_, _, &h) in blurred.iter() {
            assert!((h - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_blur_spreads_peak() {
        let mut map = Tilemap::new_with(5, 5, 0.0f32);
        map.set(2, 2, 1.0);
        let blurred = gaussian_blur(&map);
        assert!((blurred.get(2, 2) - BLUR_CENTER).abs() < 1e-6);
        assert!((blurred.get(1, 2) - BLUR_EDGE).abs() < 1e-6);
        assert!((blurred.get(1, 1) - BLUR_CORNER).abs() < 1e-6);
        // Border copied
        assert_eq!(*blurred.get(0, 0), 0.0);
    }

    #[test]
    fn test_normalize() {
        let map = Tilemap::from_fn(3, |x, y| (x + y) as f32 - 2.0);
        let normalized = normalize_heightmap(&map);
        assert_eq!(*normalized.get(0, 0), 0.0);
        assert_eq!(*normalized.get(2, 2), 1.0);
        assert!((normalized.get(1, 1) - 0.5).abs() < 1e-6);

        let flat = normalize_heightmap(&Tilemap::new_with(3, 3, 5.0f32));
        assert!(flat.iter().all(|(_, _, &v)| v == 0.0));
    }
}
