use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};
use thiserror::Error;

use crate::erosion::HeightSample;
use crate::heightmap::normalize_heightmap;
use crate::tilemap::Tilemap;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot export an empty grid")]
    Empty,
}

/// Mapping from a normalized height (0.0-1.0) to a pixel color.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ColorRamp {
    #[default]
    Grayscale,
    /// Linear blend from `low` to `high`
    Gradient { low: [u8; 3], high: [u8; 3] },
    /// Matplotlib-style spectral map, dark blue through red
    Spectral,
}

impl ColorRamp {
    /// Brown lowlands to snowy peaks.
    pub const TERRAIN: ColorRamp = ColorRamp::Gradient {
        low: [74, 56, 38],
        high: [240, 240, 235],
    };

    pub fn color(&self, t: f32) -> [u8; 3] {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        match self {
            ColorRamp::Grayscale => {
                let v = (t * 255.0) as u8;
                [v, v, v]
            }
            ColorRamp::Gradient { low, high } => [
                lerp_channel(low[0], high[0], t),
                lerp_channel(low[1], high[1], t),
                lerp_channel(low[2], high[2], t),
            ],
            ColorRamp::Spectral => spectral_colormap(t),
        }
    }
}

impl std::str::FromStr for ColorRamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grayscale" | "gray" | "grey" => Ok(ColorRamp::Grayscale),
            "terrain" => Ok(ColorRamp::TERRAIN),
            "spectral" => Ok(ColorRamp::Spectral),
            _ => Err(format!("unknown color ramp '{s}', expected grayscale, terrain or spectral")),
        }
    }
}

fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

/// Spectral colormap (matplotlib style): dark blue -> cyan -> green -> yellow -> orange -> red
fn spectral_colormap(t: f32) -> [u8; 3] {
    const COLORS: [[f32; 3]; 11] = [
        [0.37, 0.31, 0.64],
        [0.20, 0.53, 0.74],
        [0.40, 0.76, 0.65],
        [0.67, 0.87, 0.64],
        [0.90, 0.96, 0.60],
        [1.00, 1.00, 0.75],
        [1.00, 0.88, 0.55],
        [0.99, 0.68, 0.38],
        [0.96, 0.43, 0.26],
        [0.84, 0.24, 0.31],
        [0.62, 0.00, 0.26],
    ];

    let scaled = t * 10.0;
    let idx = (scaled as usize).min(9);
    let frac = scaled - idx as f32;
    let (c1, c2) = (COLORS[idx], COLORS[idx + 1]);

    std::array::from_fn(|i| ((c1[i] + (c2[i] - c1[i]) * frac) * 255.0) as u8)
}

/// Render any grid of normalized values to an image.
fn render(values: &Tilemap<f32>, ramp: ColorRamp) -> RgbImage {
    ImageBuffer::from_fn(values.width as u32, values.height as u32, |x, y| {
        Rgb(ramp.color(*values.get(x as usize, y as usize)))
    })
}

/// Export a heightmap as a PNG, one pixel per sample, lowest point mapped
/// to the start of `ramp` and highest to its end.
pub fn export_heightmap<T: HeightSample>(
    heightmap: &Tilemap<T>,
    path: impl AsRef<Path>,
    ramp: ColorRamp,
) -> Result<(), ExportError> {
    if heightmap.width == 0 || heightmap.height == 0 {
        return Err(ExportError::Empty);
    }
    let normalized = normalize_heightmap(heightmap);
    render(&normalized, ramp).save(path.as_ref())?;
    log::debug!("wrote heightmap image {}", path.as_ref().display());
    Ok(())
}

/// Export a water grid, scaled so the deepest cell is fully saturated.
/// A dry grid renders entirely as the low end of the ramp.
pub fn export_water_level(water: &Tilemap<f32>, path: impl AsRef<Path>) -> Result<(), ExportError> {
    if water.width == 0 || water.height == 0 {
        return Err(ExportError::Empty);
    }
    let deepest = water.iter().map(|(_, _, &w)| w).fold(0.0f32, f32::max);
    let scale = if deepest > 0.0 { 1.0 / deepest } else { 0.0 };
    let depth = water.map(|_, _, &w| w * scale);
    let ramp = ColorRamp::Gradient {
        low: [12, 18, 32],
        high: [90, 170, 255],
    };
    render(&depth, ramp).save(path.as_ref())?;
    log::debug!("wrote water image {}", path.as_ref().display());
    Ok(())
}
