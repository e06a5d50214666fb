//! Solid-angle weighting and staircase integration on theta/phi grids
//!
//! Constant theta/phi steps sample the region around the theta = 0 pole far
//! more densely than the region near the equator. [`calc_coord_area`] builds
//! a grid holding the solid angle each sample stands for, which turns a
//! surface integral over the sampled hemisphere into a weighted sum
//! ([`integrate`]).
//!
//! Grids follow the `[Np, Nt]` layout: one row per phi sample, one column per
//! theta sample, with column 0 at the pole.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::DMatrix;
use thiserror::Error;
use tracing::trace;

/// Absolute tolerance (radians) used by [`validate_grid`]
pub const GRID_TOLERANCE: f64 = 1e-6;

/// Reasons a grid is rejected by [`validate_grid`] and [`try_integrate`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("{name} grid is {found:?} but theta grid is {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("grid needs at least one phi row and two theta columns, got {rows} x {columns}")]
    TooFewSamples { rows: usize, columns: usize },

    #[error("first theta sample must be the pole (0 rad), got {0} rad")]
    PoleNotAtOrigin(f64),

    #[error("theta step must be positive, got {0} rad")]
    NonIncreasingTheta(f64),

    #[error("theta is not uniformly spaced: sample ({row}, {column}) is {found} rad, expected {expected} rad")]
    NonUniformStep {
        row: usize,
        column: usize,
        expected: f64,
        found: f64,
    },

    #[error("theta reaches {0} rad; only half-sphere grids (theta <= pi/2) are supported")]
    BeyondHemisphere(f64),
}

/// Build `[Np, Nt]` theta/phi grids from 1D sample vectors (theta along
/// columns, phi along rows).
pub fn meshgrid(theta: &[f64], phi: &[f64]) -> (DMatrix<f64>, DMatrix<f64>) {
    let theta_grid = DMatrix::from_fn(phi.len(), theta.len(), |_, c| theta[c]);
    let phi_grid = DMatrix::from_fn(phi.len(), theta.len(), |r, _| phi[r]);
    (theta_grid, phi_grid)
}

/// Calculate the solid angle (unit sphere, steradians) attributed to every
/// grid sample.
///
/// The sample at `[0, 0]` takes the spherical cap of half-angle `dt/2`
/// around the pole. Every other pole sample is a duplicate of the same
/// physical point and gets zero. Each remaining theta column owns the band
/// between the midpoints to its neighbours, split evenly across the phi
/// rows; the last column stops at the equator instead of extending past it.
///
/// Limitations, not checked here (see [`validate_grid`]):
/// - `theta_grid[(0, 0)]` must be the theta = 0 pole
/// - theta must be uniformly spaced
/// - only half spheres (theta up to pi/2) are handled
///
/// The phi step is measured but not used, so non-uniform phi spacing goes
/// unnoticed.
///
/// # Panics
///
/// Panics if the grid has no rows or fewer than two theta columns.
pub fn calc_coord_area(theta_grid: &DMatrix<f64>, phi_grid: &DMatrix<f64>) -> DMatrix<f64> {
    let (np, nt) = theta_grid.shape();

    let dt = theta_grid[(0, 1)] - theta_grid[(0, 0)];
    if np > 1 {
        let dp = phi_grid[(1, 0)] - phi_grid[(0, 0)];
        trace!(dt, dp, "grid steps");
    }

    let mut area_grid = DMatrix::zeros(np, nt);

    // Pole cap, counted once
    area_grid[(0, 0)] = 2.0 * PI * (1.0 - (dt / 2.0).cos());

    for i in 1..nt {
        let top_height = (dt / 2.0 + (i - 1) as f64 * dt).cos();
        let bot_height = if i < nt - 1 {
            (dt / 2.0 + i as f64 * dt).cos()
        } else {
            // Stop the band at the equator
            (i as f64 * dt).cos()
        };

        let band_area = 2.0 * PI * (top_height - bot_height);
        let band_sector_area = band_area / np as f64;

        area_grid.column_mut(i).fill(band_sector_area);
    }

    area_grid
}

/// Staircase integration of `value_grid` over the sampled hemisphere: the
/// sum of every sample times the solid angle it represents.
///
/// Accuracy is bounded by the grid resolution; no error estimate is made.
///
/// # Panics
///
/// Panics under the same conditions as [`calc_coord_area`], or if
/// `value_grid` does not have the shape of `theta_grid`.
pub fn integrate(
    theta_grid: &DMatrix<f64>,
    phi_grid: &DMatrix<f64>,
    value_grid: &DMatrix<f64>,
) -> f64 {
    let area_grid = calc_coord_area(theta_grid, phi_grid);
    area_grid.component_mul(value_grid).sum()
}

/// Check the preconditions [`calc_coord_area`] relies on.
pub fn validate_grid(theta_grid: &DMatrix<f64>, phi_grid: &DMatrix<f64>) -> Result<(), GridError> {
    let shape = theta_grid.shape();
    check_shape("phi", shape, phi_grid.shape())?;

    let (rows, columns) = shape;
    if rows < 1 || columns < 2 {
        return Err(GridError::TooFewSamples { rows, columns });
    }

    let pole = theta_grid[(0, 0)];
    if pole.abs() > GRID_TOLERANCE {
        return Err(GridError::PoleNotAtOrigin(pole));
    }

    let dt = theta_grid[(0, 1)] - pole;
    if dt <= 0.0 {
        return Err(GridError::NonIncreasingTheta(dt));
    }

    for row in 0..rows {
        for column in 0..columns {
            let expected = column as f64 * dt;
            let found = theta_grid[(row, column)];
            if (found - expected).abs() > GRID_TOLERANCE {
                return Err(GridError::NonUniformStep {
                    row,
                    column,
                    expected,
                    found,
                });
            }
        }
    }

    let theta_max = theta_grid[(0, columns - 1)];
    if theta_max > FRAC_PI_2 + GRID_TOLERANCE {
        return Err(GridError::BeyondHemisphere(theta_max));
    }

    Ok(())
}

/// [`integrate`] after validating the grid and the value-grid shape.
pub fn try_integrate(
    theta_grid: &DMatrix<f64>,
    phi_grid: &DMatrix<f64>,
    value_grid: &DMatrix<f64>,
) -> Result<f64, GridError> {
    validate_grid(theta_grid, phi_grid)?;
    check_shape("value", theta_grid.shape(), value_grid.shape())?;
    Ok(integrate(theta_grid, phi_grid, value_grid))
}

fn check_shape(
    name: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<(), GridError> {
    if expected == found {
        Ok(())
    } else {
        Err(GridError::ShapeMismatch {
            name,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
        if n == 1 {
            return vec![start];
        }
        let step = (stop - start) / (n - 1) as f64;
        (0..n).map(|i| start + i as f64 * step).collect()
    }

    fn hemisphere(nt: usize, np: usize) -> (DMatrix<f64>, DMatrix<f64>) {
        meshgrid(&linspace(0.0, FRAC_PI_2, nt), &linspace(0.0, 2.0 * PI, np))
    }

    #[test]
    fn test_meshgrid_layout() {
        let (theta, phi) = meshgrid(&[0.0, 0.5, 1.0], &[0.0, 2.0]);
        assert_eq!(theta.shape(), (2, 3));
        assert_eq!(theta[(1, 2)], 1.0);
        assert_eq!(phi[(1, 2)], 2.0);
        assert_eq!(phi[(0, 2)], 0.0);
    }

    #[test]
    fn test_small_grid_cells() {
        let (theta, phi) = hemisphere(3, 4);
        let area = calc_coord_area(&theta, &phi);
        assert_eq!(area.shape(), theta.shape());

        let dt = PI / 4.0;
        assert_relative_eq!(area[(0, 0)], 2.0 * PI * (1.0 - (dt / 2.0).cos()), max_relative = 1e-12);
        assert_eq!(area.view((1, 0), (3, 1)).sum(), 0.0);

        let first_band = 2.0 * PI * ((dt / 2.0).cos() - (dt / 2.0 + dt).cos()) / 4.0;
        assert_relative_eq!(area[(0, 1)], first_band, max_relative = 1e-12);

        // Equator band is truncated at pi/2
        let last_band = 2.0 * PI * ((dt / 2.0 + dt).cos() - (2.0 * dt).cos()) / 4.0;
        assert_relative_eq!(area[(0, 2)], last_band, max_relative = 1e-12);

        assert_relative_eq!(area.sum(), 2.0 * PI, max_relative = 1e-9);
    }

    #[test]
    fn test_area_sums_to_hemisphere() {
        for &(nt, np) in &[(2, 1), (3, 4), (10, 37), (91, 73), (181, 5)] {
            let (theta, phi) = hemisphere(nt, np);
            let area = calc_coord_area(&theta, &phi);
            assert_relative_eq!(area.sum(), 2.0 * PI, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_pole_counted_once() {
        let (theta, phi) = hemisphere(19, 25);
        let area = calc_coord_area(&theta, &phi);
        let dt = theta[(0, 1)];

        assert_eq!(area[(0, 0)], 2.0 * PI * (1.0 - (dt / 2.0).cos()));
        for r in 1..area.nrows() {
            assert_eq!(area[(r, 0)], 0.0, "pole duplicate at row {} carries area", r);
        }
    }

    #[test]
    fn test_band_independent_of_phi() {
        let (theta, phi) = hemisphere(10, 13);
        let area = calc_coord_area(&theta, &phi);
        for c in 1..area.ncols() {
            let first = area[(0, c)];
            assert!(area.column(c).iter().all(|&v| v == first));
        }
    }

    #[test]
    fn test_integrate_constant_is_area() {
        let (theta, phi) = hemisphere(46, 73);
        let ones = DMatrix::from_element(73, 46, 1.0);
        assert_relative_eq!(integrate(&theta, &phi, &ones), 2.0 * PI, max_relative = 1e-9);
    }

    #[test]
    fn test_integrate_is_linear() {
        let (theta, phi) = hemisphere(10, 9);
        let v1 = DMatrix::from_fn(9, 10, |r, c| (r as f64 + 1.0) * theta[(r, c)].cos());
        let v2 = DMatrix::from_fn(9, 10, |r, c| phi[(r, c)].sin() - c as f64);
        let (a, b) = (2.5, -0.75);

        let combined = &v1 * a + &v2 * b;
        let lhs = integrate(&theta, &phi, &combined);
        let rhs = a * integrate(&theta, &phi, &v1) + b * integrate(&theta, &phi, &v2);
        assert_relative_eq!(lhs, rhs, epsilon = 1e-12, max_relative = 1e-12);
    }

    #[test]
    fn test_integrate_cos_theta() {
        // Integral of cos(theta) over the hemisphere is pi
        let (theta, phi) = hemisphere(91, 37);
        let values = theta.map(f64::cos);
        let result = integrate(&theta, &phi, &values);
        assert!((result - PI).abs() / PI < 0.01, "got {}", result);
    }

    #[test]
    fn test_validate_accepts_hemisphere() {
        let (theta, phi) = hemisphere(10, 37);
        assert_eq!(validate_grid(&theta, &phi), Ok(()));
        let ones = DMatrix::from_element(37, 10, 1.0);
        assert_relative_eq!(try_integrate(&theta, &phi, &ones).unwrap(), 2.0 * PI, max_relative = 1e-9);
    }

    #[test]
    fn test_validate_rejects_malformed_grids() {
        let (theta, phi) = hemisphere(10, 5);

        let (_, short_phi) = hemisphere(10, 4);
        assert!(matches!(
            validate_grid(&theta, &short_phi),
            Err(GridError::ShapeMismatch { name: "phi", .. })
        ));

        let (single_t, single_p) = meshgrid(&[0.0], &[0.0, 1.0]);
        assert_eq!(
            validate_grid(&single_t, &single_p),
            Err(GridError::TooFewSamples { rows: 2, columns: 1 })
        );

        let shifted = theta.add_scalar(0.1);
        assert!(matches!(validate_grid(&shifted, &phi), Err(GridError::PoleNotAtOrigin(_))));

        let (flat_t, flat_p) = meshgrid(&[0.0, 0.0, 0.0], &[0.0]);
        assert!(matches!(validate_grid(&flat_t, &flat_p), Err(GridError::NonIncreasingTheta(_))));

        let mut uneven = theta.clone();
        uneven[(3, 4)] += 0.01;
        assert!(matches!(
            validate_grid(&uneven, &phi),
            Err(GridError::NonUniformStep { row: 3, column: 4, .. })
        ));

        let (full_t, full_p) = meshgrid(&linspace(0.0, PI, 19), &linspace(0.0, 2.0 * PI, 5));
        assert!(matches!(validate_grid(&full_t, &full_p), Err(GridError::BeyondHemisphere(_))));

        let values = DMatrix::from_element(5, 9, 1.0);
        assert!(matches!(
            try_integrate(&theta, &phi, &values),
            Err(GridError::ShapeMismatch { name: "value", .. })
        ));
    }
}
