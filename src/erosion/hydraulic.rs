//! Hydraulic erosion simulation using particle-based water droplets.
//!
//! A droplet slides over the surface, accelerated along the local surface
//! normal and slowed by friction. Each step it compares the sediment it
//! carries with what it could carry (proportional to its water, speed and
//! the height it just dropped) and trades the difference with the cell it
//! departed from: under capacity it erodes, over capacity it deposits.
//!
//! Capacity never exceeds `sediment_capacity x water_volume`. Water
//! evaporates every step, so that ceiling sinks and a droplet carrying a
//! full load drops part of it on every later step.

use glam::Vec2;

use crate::erosion::params::{CellRule, ErosionConfig};
use crate::erosion::surface::{estimate_normal, HeightSample};
use crate::tilemap::Tilemap;

/// Why a droplet stopped. None of these is a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// `max_iterations` steps were taken.
    IterationBudget,
    /// Water volume reached zero.
    Evaporated,
    /// The droplet came within one cell of the grid edge.
    LeftGrid,
    /// An intermediate value stopped being finite. Nothing was written for that step.
    NonFinite,
}

/// Summary of one droplet's lifetime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropletReport {
    /// Steps that modified the grid.
    pub steps: usize,
    pub termination: Termination,
    /// Height removed from the grid
    pub eroded: f32,
    /// Height added to the grid
    pub deposited: f32,
    /// Sediment concentration carried when the droplet stopped
    pub sediment: f32,
}

/// State of a droplet after one completed step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropletStep {
    pub iteration: usize,
    /// Cell whose height was changed this step
    pub departure: (usize, usize),
    pub arrival: (usize, usize),
    pub position: Vec2,
    pub velocity: Vec2,
    pub capacity: f32,
    /// Change in carried sediment concentration
    pub sediment_delta: f32,
    /// Change applied to the departure cell's height
    pub height_delta: f32,
    /// Water volume the step was computed with (before evaporation)
    pub volume: f32,
}

struct Droplet {
    position: Vec2,
    velocity: Vec2,
    volume: f32,
    sediment: f32,
}

/// Reduce a continuous position to a grid cell with the given rule.
///
/// Returns `None` for non-finite positions. Cells may be negative.
pub fn current_cell(position: Vec2, rule: CellRule) -> Option<(i64, i64)> {
    if !position.is_finite() {
        return None;
    }
    let floored = position.floor();
    let cell = match rule {
        CellRule::Floored => floored,
        CellRule::NearestCorner => {
            // Ties keep the floored corner.
            let frac = position - floored;
            let step = |f: f32| if f > 0.5 { 1.0 } else { 0.0 };
            floored + Vec2::new(step(frac.x), step(frac.y))
        }
    };
    Some((cell.x as i64, cell.y as i64))
}

/// Whether `cell` keeps at least one cell of margin from every edge of an
/// `resolution x resolution` grid.
pub fn is_inside_margin(cell: (i64, i64), resolution: usize) -> bool {
    let last = resolution as i64 - 1;
    cell.0 > 0 && cell.0 < last && cell.1 > 0 && cell.1 < last
}

fn interior_cell(position: Vec2, rule: CellRule, resolution: usize) -> Option<(usize, usize)> {
    current_cell(position, rule)
        .filter(|&cell| is_inside_margin(cell, resolution))
        .map(|(x, y)| (x as usize, y as usize))
}

fn non_finite(position: Vec2) -> Termination {
    debug_assert!(false, "non-finite droplet state at {position:?}");
    log::warn!("droplet stopped on non-finite state at {position:?}");
    Termination::NonFinite
}

/// Simulate one droplet from `start`, mutating `heightmap` in place.
pub fn simulate_droplet<T: HeightSample>(
    heightmap: &mut Tilemap<T>,
    config: &ErosionConfig,
    start: Vec2,
) -> DropletReport {
    simulate_droplet_with(heightmap, config, start, |_| {})
}

/// Like [`simulate_droplet`], calling `observer` after every step that wrote to the grid.
pub fn simulate_droplet_with<T: HeightSample>(
    heightmap: &mut Tilemap<T>,
    config: &ErosionConfig,
    start: Vec2,
    mut observer: impl FnMut(&DropletStep),
) -> DropletReport {
    let resolution = heightmap.resolution();
    let mut droplet = Droplet {
        position: start,
        velocity: Vec2::ZERO,
        volume: config.droplet_volume,
        sediment: 0.0,
    };

    let mut report = DropletReport {
        steps: 0,
        termination: Termination::IterationBudget,
        eroded: 0.0,
        deposited: 0.0,
        sediment: 0.0,
    };

    let mut iterations = config.max_iterations;
    while iterations > 0 {
        if droplet.volume <= 0.0 {
            report.termination = Termination::Evaporated;
            break;
        }

        if !droplet.position.is_finite() {
            report.termination = non_finite(droplet.position);
            break;
        }
        let Some(departure) = interior_cell(droplet.position, config.cell_rule, resolution) else {
            report.termination = Termination::LeftGrid;
            break;
        };

        // The normal always comes from the quad containing the droplet,
        // clamped so the quad stays on the grid.
        let quad = droplet.position.floor();
        let quad = (
            (quad.x.max(0.0) as usize).min(resolution - 2),
            (quad.y.max(0.0) as usize).min(resolution - 2),
        );
        let normal = estimate_normal(heightmap, quad, droplet.position, config.cell_size);

        droplet.velocity += Vec2::new(normal.x, normal.z) * config.gravity;
        droplet.position += droplet.velocity;
        droplet.velocity *= 1.0 - config.friction;

        if !droplet.position.is_finite() {
            report.termination = non_finite(droplet.position);
            break;
        }
        let Some(arrival) = interior_cell(droplet.position, config.cell_rule, resolution) else {
            report.termination = Termination::LeftGrid;
            break;
        };

        let height_departure = heightmap.get(departure.0, departure.1).height();
        let height_arrival = heightmap.get(arrival.0, arrival.1).height();
        let drop = (height_departure - height_arrival).max(config.min_slope).max(0.0);
        let raw_capacity = droplet.volume * droplet.velocity.length() * drop;
        if !height_departure.is_finite()
            || !height_arrival.is_finite()
            || !raw_capacity.is_finite()
        {
            report.termination = non_finite(droplet.position);
            break;
        }
        let capacity = raw_capacity
            .min(config.sediment_capacity * droplet.volume)
            .max(0.0);

        let capacity_delta = capacity - droplet.sediment;
        let rate = config.transfer_rate(capacity_delta);
        let sediment = (droplet.sediment + rate * capacity_delta).clamp(0.0, capacity);
        let sediment_delta = sediment - droplet.sediment;
        let height_delta = -droplet.volume * sediment_delta;

        let new_height = height_departure + height_delta;
        if !new_height.is_finite() {
            report.termination = non_finite(droplet.position);
            break;
        }

        heightmap.get_mut(departure.0, departure.1).set_height(new_height);
        droplet.sediment = sediment;
        if height_delta < 0.0 {
            report.eroded -= height_delta;
        } else {
            report.deposited += height_delta;
        }

        report.steps += 1;
        observer(&DropletStep {
            iteration: report.steps,
            departure,
            arrival,
            position: droplet.position,
            velocity: droplet.velocity,
            capacity,
            sediment_delta,
            height_delta,
            volume: droplet.volume,
        });

        droplet.volume *= 1.0 - config.evaporation_rate;
        iterations -= 1;
    }

    report.sediment = droplet.sediment;
    report
}
