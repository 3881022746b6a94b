//! Terrain erosion library
//!
//! Droplet and cellular-flow erosion over square heightmaps, plus the noise
//! seeding, mesh building and image export used by the binaries.

pub mod erosion;
pub mod export;
pub mod heightmap;
pub mod mesh;
pub mod tilemap;
