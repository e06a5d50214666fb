//! feko-import: Extract simulation results from FEKO `.out` files
//!
//! This crate provides:
//! - Scanning of wire currents, triangle (RWG) currents and far fields from
//!   FEKO text output, one record per frequency block
//! - Solid-angle weighting of theta/phi sampling grids
//! - Staircase integration of far-field power over the sampled hemisphere
//! - Text reports of extracted datasets
//!
//! Angles are stored in radians, lengths in metres and frequencies in Hz.

pub mod dataset;
pub mod farfield;
pub mod outfile;
pub mod report;
pub mod sphere;

pub use dataset::{
    at_frequency, CurrentSample, Dataset, FarField, FrequencyData, Record, RecordKind, Triangle,
    TriangleCurrents, WireCurrents,
};
pub use farfield::{FarFieldError, FarFieldGrids, FREE_SPACE_IMPEDANCE};
pub use outfile::{
    load_farfield, load_triangle_currents, load_wire_currents, parse_farfield,
    parse_triangle_currents, parse_wire_currents, ParseError,
};
pub use report::{render_report, BlockSummary, Report};
pub use sphere::{calc_coord_area, integrate, meshgrid, try_integrate, validate_grid, GridError};

use anyhow::{Context, Result};

/// Main entry point: scan far fields from `.out` text and integrate the
/// radiated power of every block
pub fn farfield_power(text: &str, config: &PowerConfig) -> Result<Vec<FrequencyData<f64>>> {
    let dataset = parse_farfield(text)?;

    let mut powers = Vec::with_capacity(dataset.len());
    for entry in &dataset {
        let power = entry
            .data
            .to_grids()
            .and_then(|grids| grids.radiated_power(config))
            .with_context(|| format!("Far field at {} Hz", entry.frequency))?;
        powers.push(FrequencyData {
            frequency: entry.frequency,
            data: power,
        });
    }

    Ok(powers)
}

/// Configuration for radiated power integration
#[derive(Debug, Clone)]
pub struct PowerConfig {
    /// Wave impedance of the medium the far field is computed in (Ohm)
    pub wave_impedance: f64,
    /// Validate the theta/phi grid before integrating
    pub checked: bool,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            wave_impedance: FREE_SPACE_IMPEDANCE,
            checked: false,
        }
    }
}
