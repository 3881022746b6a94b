//! Debug tool for comparing erosion parameters visually
//! Erodes one base terrain under several configurations and tiles shaded
//! renders of the results into a single image.

use glam::{Vec2, Vec3};
use image::{imageops, ImageBuffer, Rgb, RgbImage};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use terrain_erosion::erosion::{
    estimate_normal, CellRule, ErosionConfig, ErosionPreset, ErosionSession, ErosionStats,
    SessionError,
};
use terrain_erosion::heightmap::{self, NoiseParams};
use terrain_erosion::tilemap::Tilemap;

const RESOLUTION: usize = 256;
const SEED: u64 = 42;
const COLUMNS: u32 = 3;
const LABEL_HEIGHT: u32 = 6;

#[derive(Serialize)]
struct VariantSummary {
    cell: usize,
    name: String,
    droplets: usize,
    total_eroded: f64,
    total_deposited: f64,
    steps_taken: u64,
}

fn variants() -> Vec<(String, ErosionConfig)> {
    let mut variants: Vec<(String, ErosionConfig)> = ErosionPreset::all()
        .iter()
        .map(|preset| (format!("preset {preset}"), ErosionConfig::from_preset(*preset)))
        .collect();

    variants.push((
        "nearest corner".to_string(),
        ErosionConfig {
            cell_rule: CellRule::NearestCorner,
            ..Default::default()
        },
    ));
    variants.push((
        "high friction".to_string(),
        ErosionConfig {
            friction: 0.2,
            ..Default::default()
        },
    ));
    variants.push((
        "fast evaporation".to_string(),
        ErosionConfig {
            evaporation_rate: 0.08,
            ..Default::default()
        },
    ));
    variants.push((
        "min slope 0.05".to_string(),
        ErosionConfig {
            min_slope: 0.05,
            ..Default::default()
        },
    ));
    variants.push((
        "strong carving".to_string(),
        ErosionConfig {
            erosion_speed: Some(0.3),
            sediment_capacity: 4.0,
            ..Default::default()
        },
    ));
    variants
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::SimpleLogger::new().with_level(log::LevelFilter::Info).init()?;
    log::info!("Generating erosion comparison grid...");

    let noise = NoiseParams {
        seed: SEED as u32,
        ..Default::default()
    };
    let base = heightmap::gaussian_blur(&heightmap::generate_heightmap(RESOLUTION, &noise));
    let (min_h, max_h) = heightmap::height_range(&base);

    let results = variants()
        .into_par_iter()
        .map(|(name, config)| -> Result<(String, ErosionStats, RgbImage), SessionError> {
            log::info!("  Processing: {name}");
            let mut session = ErosionSession::new(base.clone(), config)?;
            let stats = session.erode(&mut ChaCha8Rng::seed_from_u64(SEED));
            let image = render_shaded_heightmap(session.heightmap(), min_h, max_h);
            Ok((name, stats, image))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let summaries: Vec<VariantSummary> = results
        .iter()
        .enumerate()
        .map(|(cell, (name, stats, _))| VariantSummary {
            cell: cell + 1,
            name: name.clone(),
            droplets: stats.droplets,
            total_eroded: stats.total_eroded,
            total_deposited: stats.total_deposited,
            steps_taken: stats.steps_taken,
        })
        .collect();
    for summary in &summaries {
        log::info!(
            "  {}. {}: eroded {:.2}, deposited {:.2}",
            summary.cell,
            summary.name,
            summary.total_eroded,
            summary.total_deposited
        );
    }

    let images: Vec<RgbImage> = results.into_iter().map(|(_, _, image)| image).collect();
    create_grid(&images, COLUMNS).save("erosion_comparison.png")?;
    std::fs::write("erosion_comparison.json", serde_json::to_string_pretty(&summaries)?)?;

    log::info!("Saved erosion_comparison.png and erosion_comparison.json");
    Ok(())
}

/// Hillshade with elevation tint. `min_h`/`max_h` come from the base terrain
/// so every variant shares one color scale.
fn render_shaded_heightmap(heightmap: &Tilemap<f32>, min_h: f32, max_h: f32) -> RgbImage {
    let range = (max_h - min_h).max(1e-3);
    let light = Vec3::new(-0.7, 0.5, -0.7).normalize();

    ImageBuffer::from_fn(heightmap.width as u32, heightmap.height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let cell = (x.min(heightmap.width - 2), y.min(heightmap.height - 2));
        let position = Vec2::new(x as f32 + 0.25, y as f32 + 0.25);
        let normal = estimate_normal(heightmap, cell, position, 1.0);

        let ambient = 0.3;
        let lighting = (ambient + (1.0 - ambient) * normal.dot(light).max(0.0)).min(1.0);

        let t = ((*heightmap.get(x, y) - min_h) / range).clamp(0.0, 1.0);
        let base = if t < 0.3 {
            [80.0, 140.0, 60.0]
        } else if t < 0.6 {
            let s = (t - 0.3) / 0.3;
            [80.0 + s * 80.0, 140.0 - s * 60.0, 60.0 - s * 20.0]
        } else if t < 0.85 {
            let v = 160.0 - (t - 0.6) / 0.25 * 40.0;
            [v, v - 10.0, v - 20.0]
        } else {
            [240.0, 240.0, 245.0]
        };

        Rgb(base.map(|c: f32| (c * lighting) as u8))
    })
}

/// Tile images row-major. Each cell gets a header band with one tick per
/// cell number, so cells can be matched to the JSON summary.
fn create_grid(images: &[RgbImage], cols: u32) -> RgbImage {
    let Some(first) = images.first() else {
        return ImageBuffer::new(1, 1);
    };

    let (cell_width, cell_height) = first.dimensions();
    let total_cell_height = cell_height + LABEL_HEIGHT;
    let rows = (images.len() as u32).div_ceil(cols);

    let mut grid: RgbImage =
        ImageBuffer::from_pixel(cell_width * cols, total_cell_height * rows, Rgb([40, 40, 40]));

    for (idx, img) in images.iter().enumerate() {
        let col = idx as u32 % cols;
        let row = idx as u32 / cols;
        let x_offset = col * cell_width;
        let y_offset = row * total_cell_height;

        for tick in 0..=idx as u32 {
            let tick_x = x_offset + 2 + tick * 4;
            for dy in 1..LABEL_HEIGHT - 1 {
                for dx in 0..2 {
                    if tick_x + dx < x_offset + cell_width {
                        grid.put_pixel(tick_x + dx, y_offset + dy, Rgb([230, 230, 230]));
                    }
                }
            }
        }

        imageops::replace(&mut grid, img, x_offset as i64, (y_offset + LABEL_HEIGHT) as i64);
    }

    grid
}
