//! Ownership of the grids an erosion run works on.

use glam::Vec2;
use rand::Rng;
use thiserror::Error;

use crate::erosion::cellular::{self, FlowStats};
use crate::erosion::hydraulic::{self, DropletReport, DropletStep};
use crate::erosion::params::{ConfigError, ErosionConfig, FlowCoupling};
use crate::erosion::surface::HeightSample;
use crate::erosion::ErosionStats;
use crate::tilemap::{GridError, Tilemap};

/// Reasons a session cannot be built or rebound.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid grid: {0}")]
    Grid(#[from] GridError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("water level {0} must be finite and non-negative")]
    WaterLevel(f32),
}

/// A heightmap, its parallel water grid and the configuration that drives
/// them. All mutation goes through `&mut self`, so one session has exactly
/// one writer.
#[derive(Clone, Debug)]
pub struct ErosionSession<T: HeightSample = f32> {
    config: ErosionConfig,
    heightmap: Tilemap<T>,
    water: Tilemap<f32>,
}

impl<T: HeightSample> ErosionSession<T> {
    /// Bind `heightmap` and allocate a dry water grid of the same shape.
    pub fn new(heightmap: Tilemap<T>, config: ErosionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        heightmap.ensure_square()?;
        let water = Tilemap::new_with(heightmap.width, heightmap.height, 0.0);
        Ok(Self {
            config,
            heightmap,
            water,
        })
    }

    /// Bind a heightmap given as nested rows (`rows[y][x]`).
    pub fn from_rows(rows: Vec<Vec<T>>, config: ErosionConfig) -> Result<Self, SessionError> {
        Self::new(Tilemap::from_rows(rows)?, config)
    }

    /// Bind a heightmap together with an existing water grid.
    pub fn with_water_level(
        heightmap: Tilemap<T>,
        water: Tilemap<f32>,
        config: ErosionConfig,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(heightmap, config)?;
        if water.shape() != session.heightmap.shape() {
            return Err(GridError::ShapeMismatch {
                expected: session.heightmap.shape(),
                found: water.shape(),
            }
            .into());
        }
        if let Some((_, _, &level)) = water.iter().find(|(_, _, w)| !w.is_finite() || **w < 0.0) {
            return Err(SessionError::WaterLevel(level));
        }
        session.water = water;
        Ok(session)
    }

    /// Swap in a new heightmap, reallocating the water grid to match.
    ///
    /// On error the session is left as it was.
    pub fn rebind(&mut self, heightmap: Tilemap<T>) -> Result<(), SessionError> {
        heightmap.ensure_square()?;
        log::debug!(
            "rebinding session from {}x{} to {}x{}",
            self.heightmap.width,
            self.heightmap.height,
            heightmap.width,
            heightmap.height
        );
        self.water = Tilemap::new_with(heightmap.width, heightmap.height, 0.0);
        self.heightmap = heightmap;
        Ok(())
    }

    pub fn rebind_rows(&mut self, rows: Vec<Vec<T>>) -> Result<(), SessionError> {
        self.rebind(Tilemap::from_rows(rows)?)
    }

    /// Fill the water grid with a constant level.
    pub fn seed_water_level(&mut self, level: f32) -> Result<(), SessionError> {
        if !level.is_finite() || level < 0.0 {
            return Err(SessionError::WaterLevel(level));
        }
        self.water.fill(level);
        Ok(())
    }

    pub fn config(&self) -> &ErosionConfig {
        &self.config
    }

    pub fn heightmap(&self) -> &Tilemap<T> {
        &self.heightmap
    }

    pub fn water_level(&self) -> &Tilemap<f32> {
        &self.water
    }

    pub fn resolution(&self) -> usize {
        self.heightmap.resolution()
    }

    /// Release the heightmap to downstream consumers.
    pub fn into_heightmap(self) -> Tilemap<T> {
        self.heightmap
    }

    /// Simulate one droplet starting at `start` (grid units).
    pub fn simulate_droplet(&mut self, start: Vec2) -> DropletReport {
        hydraulic::simulate_droplet(&mut self.heightmap, &self.config, start)
    }

    /// Simulate one droplet, reporting each step to `observer`.
    pub fn simulate_droplet_with(
        &mut self,
        start: Vec2,
        observer: impl FnMut(&DropletStep),
    ) -> DropletReport {
        hydraulic::simulate_droplet_with(&mut self.heightmap, &self.config, start, observer)
    }

    /// Run `config.droplets` droplets from random interior positions.
    pub fn erode<R: Rng>(&mut self, rng: &mut R) -> ErosionStats {
        let resolution = self.resolution();
        let mut stats = ErosionStats::default();
        if resolution < 3 {
            log::warn!("{resolution}x{resolution} grid has no interior, skipping erosion");
            return stats;
        }

        for _ in 0..self.config.droplets {
            let Some(start) = random_interior_position(rng, resolution) else {
                break;
            };
            let report = self.simulate_droplet(start);
            stats.record(&report);
        }

        log::info!(
            "{} droplets: eroded {:.3}, deposited {:.3}, {} steps",
            stats.droplets,
            stats.total_eroded,
            stats.total_deposited,
            stats.steps_taken
        );
        stats
    }

    /// Advance the water grid by one tick using the configured coupling.
    pub fn step_flow(&mut self) -> FlowStats {
        self.step_flow_with(self.config.flow_coupling)
    }

    pub fn step_flow_with(&mut self, coupling: FlowCoupling) -> FlowStats {
        cellular::step(&mut self.heightmap, &mut self.water, self.config.cell_size, coupling)
    }
}

/// Draw a uniform position strictly inside the one-cell margin of a
/// `resolution x resolution` grid. Grids below 3x3 have no interior and
/// yield `None`.
pub fn random_interior_position<R: Rng>(rng: &mut R, resolution: usize) -> Option<Vec2> {
    if resolution < 3 {
        return None;
    }
    let upper = (resolution - 1) as f32;
    Some(Vec2::new(rng.gen_range(1.0..upper), rng.gen_range(1.0..upper)))
}
