//! Erosion simulation parameters and configuration

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} = {value} is outside {range}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        range: &'static str,
    },
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },
    #[error("max_iterations must be at least 1")]
    ZeroIterations,
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How a droplet's continuous position is reduced to the grid cell it acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellRule {
    /// Truncate toward negative infinity.
    #[default]
    Floored,
    /// Nearest of the four corners of the floored quad.
    NearestCorner,
}

/// Whether a cellular flow step also lowers terrain where water moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowCoupling {
    #[default]
    WaterOnly,
    HeightCoupled,
}

/// Erosion intensity preset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ErosionPreset {
    /// No droplets - raw terrain
    None,
    /// Few droplets, slow transfer
    Gentle,
    /// Balanced erosion
    #[default]
    Normal,
    /// Many long-lived droplets carving deep channels
    Dramatic,
}

impl ErosionPreset {
    pub fn all() -> &'static [Self] {
        &[Self::None, Self::Gentle, Self::Normal, Self::Dramatic]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "No erosion (raw terrain)",
            Self::Gentle => "Subtle smoothing",
            Self::Normal => "Balanced erosion",
            Self::Dramatic => "Deep gullies and fans",
        }
    }
}

impl std::fmt::Display for ErosionPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Gentle => write!(f, "gentle"),
            Self::Normal => write!(f, "normal"),
            Self::Dramatic => write!(f, "dramatic"),
        }
    }
}

impl FromStr for ErosionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|preset| preset.to_string() == s.to_ascii_lowercase())
            .ok_or_else(|| {
                format!("unknown preset '{s}' (expected none, gentle, normal or dramatic)")
            })
    }
}

impl FromStr for CellRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "floored" | "floor" => Ok(Self::Floored),
            "nearest" | "nearest-corner" | "nearest_corner" => Ok(Self::NearestCorner),
            _ => Err(format!("unknown cell rule '{s}' (expected floored or nearest-corner)")),
        }
    }
}

impl FromStr for FlowCoupling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "water" | "water-only" | "water_only" => Ok(Self::WaterOnly),
            "height" | "height-coupled" | "height_coupled" => Ok(Self::HeightCoupled),
            _ => Err(format!("unknown coupling '{s}' (expected water-only or height-coupled)")),
        }
    }
}

/// Parameters fixed for the lifetime of an erosion session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionConfig {
    // =========================================================================
    // Droplet physics
    // =========================================================================

    /// Fraction of water volume lost per step (0.0-1.0)
    pub evaporation_rate: f32,

    /// Scale on the surface-normal acceleration (1.0 = unit mass)
    pub gravity: f32,

    /// Fraction of velocity lost per step (0.0-1.0)
    pub friction: f32,

    /// Floor on the height drop used for capacity. 0.0 keeps flat ground inert.
    pub min_slope: f32,

    /// Transfer rate while under capacity. `None` uses `deposition_speed` for both directions.
    pub erosion_speed: Option<f32>,

    /// Rate at which carried sediment approaches capacity (0.0-1.0)
    pub deposition_speed: f32,

    /// Carried sediment ceiling per unit of water
    pub sediment_capacity: f32,

    /// Maximum steps per droplet
    pub max_iterations: usize,

    /// Initial water volume of every droplet
    pub droplet_volume: f32,

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Droplets simulated by one erosion run
    pub droplets: usize,

    /// Horizontal distance between adjacent samples
    pub cell_size: f32,

    pub cell_rule: CellRule,

    pub flow_coupling: FlowCoupling,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            evaporation_rate: 0.01,
            gravity: 1.0,
            friction: 0.01,
            min_slope: 0.0,
            erosion_speed: None,
            deposition_speed: 0.02,
            sediment_capacity: 1.0,
            max_iterations: 50,
            droplet_volume: 1.0,

            droplets: 10_000,
            cell_size: 1.0,
            cell_rule: CellRule::Floored,
            flow_coupling: FlowCoupling::WaterOnly,
        }
    }
}

impl ErosionConfig {
    /// Create parameters from a preset
    pub fn from_preset(preset: ErosionPreset) -> Self {
        match preset {
            ErosionPreset::None => Self {
                droplets: 0,
                ..Default::default()
            },
            ErosionPreset::Gentle => Self {
                droplets: 2_000,
                deposition_speed: 0.01,
                ..Default::default()
            },
            ErosionPreset::Normal => Self::default(),
            ErosionPreset::Dramatic => Self {
                droplets: 50_000,
                max_iterations: 120,
                evaporation_rate: 0.005,
                erosion_speed: Some(0.1),
                sediment_capacity: 2.0,
                ..Default::default()
            },
        }
    }

    /// Rate applied to a capacity difference of the given sign.
    pub fn transfer_rate(&self, capacity_delta: f32) -> f32 {
        match self.erosion_speed {
            Some(rate) if capacity_delta > 0.0 => rate,
            _ => self.deposition_speed,
        }
    }

    /// Reject values that would make the simulation meaningless or non-finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_interval("evaporation_rate", self.evaporation_rate)?;
        unit_interval("friction", self.friction)?;
        unit_interval("deposition_speed", self.deposition_speed)?;
        if let Some(rate) = self.erosion_speed {
            unit_interval("erosion_speed", rate)?;
        }
        non_negative("gravity", self.gravity)?;
        non_negative("sediment_capacity", self.sediment_capacity)?;
        positive("droplet_volume", self.droplet_volume)?;
        positive("cell_size", self.cell_size)?;
        finite("min_slope", self.min_slope)?;
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }

    /// Load and validate a JSON configuration. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, range: "[0, 1]" })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, range: "[0, inf)" })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, range: "(0, inf)" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ErosionConfig::default().validate().is_ok());
        for preset in ErosionPreset::all() {
            assert!(ErosionConfig::from_preset(*preset).validate().is_ok(), "{preset}");
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        let config = ErosionConfig {
            evaporation_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "evaporation_rate", .. })
        ));

        let config = ErosionConfig {
            cell_size: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "cell_size", .. })
        ));

        let config = ErosionConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroIterations)));
    }

    #[test]
    fn test_rejects_nan() {
        let config = ErosionConfig {
            gravity: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NonFinite { field: "gravity" })));
    }

    #[test]
    fn test_transfer_rate() {
        let single = ErosionConfig::default();
        assert_eq!(single.transfer_rate(1.0), single.deposition_speed);
        assert_eq!(single.transfer_rate(-1.0), single.deposition_speed);

        let split = ErosionConfig {
            erosion_speed: Some(0.5),
            ..Default::default()
        };
        assert_eq!(split.transfer_rate(1.0), 0.5);
        assert_eq!(split.transfer_rate(-1.0), split.deposition_speed);
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("dramatic".parse::<ErosionPreset>(), Ok(ErosionPreset::Dramatic));
        assert_eq!("nearest-corner".parse::<CellRule>(), Ok(CellRule::NearestCorner));
        assert_eq!("height".parse::<FlowCoupling>(), Ok(FlowCoupling::HeightCoupled));
        assert!("sideways".parse::<CellRule>().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("erosion.json");
        let config = ErosionConfig {
            droplets: 123,
            cell_rule: CellRule::NearestCorner,
            erosion_speed: Some(0.3),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ErosionConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_fills_defaults_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "droplets": 7, "cell_rule": "nearest_corner" }"#).unwrap();
        let config = ErosionConfig::load(&path).unwrap();
        assert_eq!(config.droplets, 7);
        assert_eq!(config.cell_rule, CellRule::NearestCorner);
        assert_eq!(config.max_iterations, ErosionConfig::default().max_iterations);

        std::fs::write(&path, r#"{ "friction": -0.5 }"#).unwrap();
        assert!(matches!(ErosionConfig::load(&path), Err(ConfigError::OutOfRange { .. })));
    }
}
