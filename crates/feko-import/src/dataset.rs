//! Per-frequency records extracted from FEKO `.out` files

use nalgebra::Vector3;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Relative tolerance when matching a requested frequency against a block
const FREQUENCY_TOLERANCE: f64 = 1e-9;

/// Decode a FEKO magnitude / phase-in-degrees pair into a phasor
pub fn polar_deg(magnitude: f64, phase_deg: f64) -> Complex64 {
    Complex64::from_polar(magnitude, phase_deg.to_radians())
}

/// One record extracted for a single frequency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyData<T> {
    /// Frequency in Hz
    pub frequency: f64,
    pub data: T,
}

/// Records in the order their blocks appear in the file
pub type Dataset<T> = Vec<FrequencyData<T>>;

/// Blocks recorded at `frequency_hz` (a file may hold several per frequency)
pub fn at_frequency<T>(
    dataset: &[FrequencyData<T>],
    frequency_hz: f64,
) -> impl Iterator<Item = &FrequencyData<T>> {
    dataset.iter().filter(move |entry| {
        (entry.frequency - frequency_hz).abs() <= FREQUENCY_TOLERANCE * frequency_hz.abs().max(1.0)
    })
}

/// Kinds of record the scanner can extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    FarField,
    WireCurrents,
    TriangleCurrents,
}

impl RecordKind {
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::FarField => "far field",
            RecordKind::WireCurrents => "wire currents",
            RecordKind::TriangleCurrents => "triangle currents",
        }
    }
}

/// Common view over extracted records, used for reporting
pub trait Record {
    const KIND: RecordKind;

    /// Number of samples (rows) in the block
    fn sample_count(&self) -> usize;
}

/// One row of a current table: a wire segment or a triangle basis function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSample {
    /// Segment or triangle number
    pub number: u32,
    /// Centre position (m)
    pub position: Vector3<f64>,
    /// Complex current components along x, y, z (A)
    pub current: Vector3<Complex64>,
}

/// Currents on wire segments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireCurrents {
    pub samples: Vec<CurrentSample>,
    /// Segment lengths (m) from the most recent segment geometry table
    pub segment_lengths: Vec<f64>,
}

impl Record for WireCurrents {
    const KIND: RecordKind = RecordKind::WireCurrents;

    fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// A metallic triangle from the mesh geometry table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Corner coordinates (m)
    pub vertices: [Vector3<f64>; 3],
    /// Area (m^2)
    pub area: f64,
}

/// Currents on triangle basis functions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleCurrents {
    pub samples: Vec<CurrentSample>,
    /// Mesh triangles from the most recent triangle geometry table
    pub triangles: Vec<Triangle>,
}

impl Record for TriangleCurrents {
    const KIND: RecordKind = RecordKind::TriangleCurrents;

    fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// Far-field pattern samples, in file order (theta varies fastest)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarField {
    /// Polar angle (rad)
    pub theta: Vec<f64>,
    /// Azimuth (rad)
    pub phi: Vec<f64>,
    /// Far-field E_theta (V/m)
    pub e_theta: Vec<Complex64>,
    /// Far-field E_phi (V/m)
    pub e_phi: Vec<Complex64>,
}

impl FarField {
    pub fn push(&mut self, theta: f64, phi: f64, e_theta: Complex64, e_phi: Complex64) {
        self.theta.push(theta);
        self.phi.push(phi);
        self.e_theta.push(e_theta);
        self.e_phi.push(e_phi);
    }

    pub fn len(&self) -> usize {
        self.theta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.theta.is_empty()
    }
}

impl Record for FarField {
    const KIND: RecordKind = RecordKind::FarField;

    fn sample_count(&self) -> usize {
        self.len()
    }
}
