use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;
use log::LevelFilter;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use terrain_erosion::erosion::{
    CellRule, ErosionConfig, ErosionPreset, ErosionSession, FlowCoupling,
};
use terrain_erosion::export::{self, ColorRamp};
use terrain_erosion::heightmap::{self, NoiseParams};
use terrain_erosion::mesh::MeshData;

#[derive(Parser, Debug)]
#[command(name = "terrain_erosion")]
#[command(about = "Generate noise terrain and weather it with droplet erosion")]
struct Args {
    /// Samples along each side of the square heightmap
    #[arg(short, long, default_value = "256")]
    resolution: usize,

    /// World-space side length of the terrain
    #[arg(long, default_value = "255.0")]
    size: f32,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of droplets (overrides preset and config file)
    #[arg(short, long)]
    droplets: Option<usize>,

    /// Erosion preset: none, gentle, normal, dramatic
    #[arg(short, long, default_value = "normal")]
    preset: ErosionPreset,

    /// Load erosion parameters from a JSON file instead of a preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cell selection rule: floored or nearest-corner
    #[arg(long)]
    cell_rule: Option<CellRule>,

    /// Smooth the noise with a Gaussian pass before eroding
    #[arg(long)]
    blur: bool,

    /// Number of cellular flow ticks after erosion
    #[arg(long, default_value = "0")]
    flow_steps: usize,

    /// Initial water level for the flow ticks
    #[arg(long, default_value = "10.0")]
    water_level: f32,

    /// Flow coupling: water-only or height-coupled
    #[arg(long)]
    coupling: Option<FlowCoupling>,

    /// Output PNG (defaults to a timestamped name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the eroded terrain as a Wavefront OBJ
    #[arg(long)]
    mesh: Option<PathBuf>,

    /// Color ramp for the PNG: grayscale, terrain, spectral
    #[arg(long, default_value = "grayscale")]
    ramp: ColorRamp,

    /// Write the effective erosion parameters to a JSON file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Log per-run details
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(args: &Args, cell_size: f32) -> Result<ErosionConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading erosion parameters from {}", path.display());
            ErosionConfig::load(path)?
        }
        None => ErosionConfig::from_preset(args.preset),
    };
    if let Some(droplets) = args.droplets {
        config.droplets = droplets;
    }
    if let Some(rule) = args.cell_rule {
        config.cell_rule = rule;
    }
    if let Some(coupling) = args.coupling {
        config.flow_coupling = coupling;
    }
    config.cell_size = cell_size;
    config.validate()?;
    Ok(config)
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("terrain");
    path.with_file_name(format!("{stem}_{suffix}.png"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    simple_logger::SimpleLogger::new()
        .with_level(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .init()?;

    if args.resolution < 2 {
        return Err(format!("resolution must be at least 2, got {}", args.resolution).into());
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let cell_size = args.size / (args.resolution - 1) as f32;

    log::info!("Generating terrain with seed: {seed}");
    log::info!("Grid: {0}x{0} samples over {1} units", args.resolution, args.size);

    let config = build_config(&args, cell_size)?;
    if let Some(path) = &args.save_config {
        config.save(path)?;
        log::info!("Saved erosion parameters to {}", path.display());
    }

    // Noise seeds are 32 bits; fold the run seed down.
    let noise = NoiseParams {
        seed: (seed ^ (seed >> 32)) as u32,
        ..Default::default()
    };
    let mut terrain = heightmap::generate_plane(args.resolution, args.size);
    heightmap::apply_noise(&mut terrain, &noise, cell_size);
    if args.blur {
        log::info!("Smoothing terrain...");
        terrain = heightmap::gaussian_blur(&terrain);
    }
    let (min_h, max_h) = heightmap::height_range(&terrain);
    log::info!("Initial height range: {min_h:.2} to {max_h:.2}");

    let mut session = ErosionSession::new(terrain, config)?;

    log::info!("Simulating {} droplets...", session.config().droplets);
    let stats = session.erode(&mut rng);
    log::info!("Erosion complete:");
    log::info!("  Total eroded: {:.2} units", stats.total_eroded);
    log::info!("  Total deposited: {:.2} units", stats.total_deposited);
    log::info!("  Max erosion: {:.3} units", stats.max_erosion);
    log::info!("  Max deposition: {:.3} units", stats.max_deposition);
    log::info!(
        "  Steps: {}, left grid: {}, evaporated: {}",
        stats.steps_taken,
        stats.left_grid,
        stats.evaporated
    );

    let output = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!("erosion_{}.png", Local::now().format("%Y%m%d_%H%M%S")))
    });

    if args.flow_steps > 0 {
        session.seed_water_level(args.water_level)?;
        log::info!(
            "Running {} flow ticks from water level {}...",
            args.flow_steps,
            args.water_level
        );
        for tick in 0..args.flow_steps {
            let flow = session.step_flow();
            log::debug!(
                "tick {tick}: outflow {:.2}, inflow {:.2}, water {:.2}",
                flow.outflow,
                flow.inflow,
                flow.total_water
            );
        }
        let water_path = sibling_path(&output, "water");
        export::export_water_level(session.water_level(), &water_path)?;
        log::info!("Saved water level to {}", water_path.display());
    }

    let (min_h, max_h) = heightmap::height_range(session.heightmap());
    log::info!("Final height range: {min_h:.2} to {max_h:.2}");

    export::export_heightmap(session.heightmap(), &output, args.ramp)?;
    log::info!("Saved heightmap to {}", output.display());

    if let Some(path) = &args.mesh {
        let mesh = MeshData::from_grid(session.heightmap(), cell_size);
        mesh.write_obj(path)?;
        log::info!(
            "Saved mesh to {} ({} vertices, {} triangles)",
            path.display(),
            mesh.vertices.len(),
            mesh.triangle_count()
        );
    }

    Ok(())
}
