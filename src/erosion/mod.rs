//! Erosion simulation module
//!
//! Two complementary techniques share one heightmap:
//! - **Hydraulic erosion**: particle-based droplets that carve and deposit along their path
//! - **Cellular flow**: a synchronous whole-grid water redistribution tick
//!
//! [`ErosionSession`] owns the grids and is the usual entry point.

pub mod cellular;
pub mod hydraulic;
pub mod params;
pub mod session;
pub mod surface;

pub use cellular::FlowStats;
pub use hydraulic::{DropletReport, DropletStep, Termination};
pub use params::{CellRule, ConfigError, ErosionConfig, ErosionPreset, FlowCoupling};
pub use session::{random_interior_position, ErosionSession, SessionError};
pub use surface::{estimate_normal, HeightSample};

/// Statistics from an erosion run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErosionStats {
    /// Total material eroded (in height units)
    pub total_eroded: f64,
    /// Total material deposited
    pub total_deposited: f64,
    /// Total number of droplet steps taken
    pub steps_taken: u64,
    /// Number of droplets processed
    pub droplets: usize,
    /// Largest erosion by a single droplet
    pub max_erosion: f32,
    /// Largest deposition by a single droplet
    pub max_deposition: f32,
    /// Droplets that ran out of grid before their budget
    pub left_grid: usize,
    /// Droplets whose water evaporated completely
    pub evaporated: usize,
}

impl ErosionStats {
    /// Fold one droplet's report into the totals.
    pub fn record(&mut self, report: &DropletReport) {
        self.droplets += 1;
        self.steps_taken += report.steps as u64;
        self.total_eroded += report.eroded as f64;
        self.total_deposited += report.deposited as f64;
        self.max_erosion = self.max_erosion.max(report.eroded);
        self.max_deposition = self.max_deposition.max(report.deposited);
        match report.termination {
            Termination::LeftGrid => self.left_grid += 1,
            Termination::Evaporated => self.evaporated += 1,
            Termination::IterationBudget | Termination::NonFinite => {}
        }
    }

    /// Net height change over the run (deposited minus eroded).
    pub fn net_change(&self) -> f64 {
        self.total_deposited - self.total_eroded
    }
}
