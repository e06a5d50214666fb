//! Radiated power from far-field patterns

use nalgebra::{DMatrix, Scalar};
use num_complex::Complex64;
use thiserror::Error;
use tracing::debug;

use crate::dataset::FarField;
use crate::sphere::{integrate, try_integrate, GridError};
use crate::PowerConfig;

/// Wave impedance of free space (Ohm)
pub const FREE_SPACE_IMPEDANCE: f64 = 376.730313;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FarFieldError {
    #[error("far field has no samples at theta = 0 or at phi = 0")]
    NoGridOrigin,

    #[error("{samples} far-field samples cannot form a {phi_pts} x {theta_pts} (phi x theta) grid")]
    Reshape {
        samples: usize,
        phi_pts: usize,
        theta_pts: usize,
    },

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Far-field samples laid out as `[Np, Nt]` grids (phi rows, theta columns)
#[derive(Debug, Clone, PartialEq)]
pub struct FarFieldGrids {
    pub theta: DMatrix<f64>,
    pub phi: DMatrix<f64>,
    pub e_theta: DMatrix<Complex64>,
    pub e_phi: DMatrix<Complex64>,
}

impl FarField {
    /// Reshape the flat sample lists into grids.
    ///
    /// The theta count is the number of samples at phi = 0, the phi count the
    /// number of samples at theta = 0 (the pole is repeated for every phi).
    pub fn to_grids(&self) -> Result<FarFieldGrids, FarFieldError> {
        let theta_pts = self.phi.iter().filter(|&&p| p == 0.0).count();
        let phi_pts = self.theta.iter().filter(|&&t| t == 0.0).count();
        if theta_pts == 0 || phi_pts == 0 {
            return Err(FarFieldError::NoGridOrigin);
        }

        let samples = self.len();
        let consistent = [self.phi.len(), self.e_theta.len(), self.e_phi.len()]
            .iter()
            .all(|&n| n == samples);
        if !consistent || phi_pts * theta_pts != samples {
            return Err(FarFieldError::Reshape {
                samples,
                phi_pts,
                theta_pts,
            });
        }
        if theta_pts < 2 {
            return Err(GridError::TooFewSamples {
                rows: phi_pts,
                columns: theta_pts,
            }
            .into());
        }

        debug!(phi_pts, theta_pts, "far field grid");

        Ok(FarFieldGrids {
            theta: reshape(&self.theta, phi_pts, theta_pts),
            phi: reshape(&self.phi, phi_pts, theta_pts),
            e_theta: reshape(&self.e_theta, phi_pts, theta_pts),
            e_phi: reshape(&self.e_phi, phi_pts, theta_pts),
        })
    }
}

/// Row-major reshape: consecutive samples fill one row (theta varies fastest)
fn reshape<T: Scalar>(values: &[T], rows: usize, columns: usize) -> DMatrix<T> {
    DMatrix::from_row_slice(rows, columns, values)
}

impl FarFieldGrids {
    /// Poynting power density `(|E_theta|^2 + |E_phi|^2) / eta` (W/m^2 at the
    /// normalised far-field distance)
    pub fn power_density(&self, wave_impedance: f64) -> DMatrix<f64> {
        self.e_theta
            .zip_map(&self.e_phi, |e_theta, e_phi| {
                (e_theta.norm_sqr() + e_phi.norm_sqr()) / wave_impedance
            })
    }

    /// Total power radiated through the sampled hemisphere (W)
    pub fn radiated_power(&self, config: &PowerConfig) -> Result<f64, FarFieldError> {
        let density = self.power_density(config.wave_impedance);
        let total = if config.checked {
            try_integrate(&self.theta, &self.phi, &density)?
        } else {
            integrate(&self.theta, &self.phi, &density)
        };
        // Peak phasors: time-averaged power carries a factor 1/2
        Ok(total / 2.0)
    }
}
