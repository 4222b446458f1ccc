//! Zodiacal light
//!
//! Sunlight scattered by interplanetary dust. Its brightness depends on
//! where the target sits relative to the Sun: the Leinert et al. (1998)
//! Table 16 gives it on a grid of solar elongation and ecliptic latitude,
//! which is interpolated bilinearly here. The spectrum is the solar spectrum
//! scaled to that V brightness and extincted at the target airmass.
//!
//! Original paper: https://doi.org/10.1051/aas:1998105

use ndarray::Array2;
use thiserror::Error;

use crate::algo::grid::Grid;
use crate::conditions::SolarProperties;
use crate::units::{Angle, AngleExt};

use super::atmosphere::Atmosphere;
use super::magnitude::{surface_brightness_flux, SKY_REFERENCE_NM};
use super::solar::solar_irradiance;
use super::spectrum::SpectrumError;

/// Errors that can occur looking up zodiacal light brightness
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZodiacalError {
    #[error("Coordinates out of range: elongation {0}°, ecliptic latitude {1}°")]
    OutOfRange(f64, f64),

    #[error("No measured brightness near elongation {0}°, ecliptic latitude {1}°")]
    TooCloseToSun(f64, f64),
}

/// Ecliptic latitudes of the table columns, degrees
const LATITUDES: [f64; 11] = [
    0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 45.0, 60.0, 75.0, 90.0,
];

/// Solar elongations of the table rows, degrees; the 180° row extends the
/// published table to the anti-solar point
const ELONGATIONS: [f64; 19] = [
    0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 60.0, 75.0, 90.0, 105.0, 120.0,
    135.0, 150.0, 165.0, 180.0,
];

// Brightness in S10 units (10th magnitude stars per square degree), one row
// per elongation, one column per latitude. Infinite entries were not
// measured, being too close to the Sun.
#[rustfmt::skip]
fn leinert_table() -> [[f64; 11]; 19] {
    let inf = f64::INFINITY;

    [
        [inf,    inf,    inf,    2450.0, 1260.0, 770.0, 500.0, 215.0, 117.0, 78.0, 60.0],
        [inf,    inf,    inf,    2300.0, 1200.0, 740.0, 490.0, 212.0, 117.0, 78.0, 60.0],
        [inf,    inf,    3700.0, 1930.0, 1070.0, 675.0, 460.0, 206.0, 116.0, 78.0, 60.0],
        [9000.0, 5300.0, 2690.0, 1450.0, 870.0,  590.0, 410.0, 196.0, 114.0, 78.0, 60.0],
        [5000.0, 3500.0, 1880.0, 1100.0, 710.0,  495.0, 355.0, 185.0, 110.0, 77.0, 60.0],
        [3000.0, 2210.0, 1350.0, 860.0,  585.0,  425.0, 320.0, 174.0, 106.0, 76.0, 60.0],
        [1940.0, 1460.0, 955.0,  660.0,  480.0,  365.0, 285.0, 162.0, 102.0, 74.0, 60.0],
        [1290.0, 990.0,  710.0,  530.0,  400.0,  310.0, 250.0, 151.0,  98.0, 73.0, 60.0],
        [925.0,  735.0,  545.0,  415.0,  325.0,  264.0, 220.0, 140.0,  94.0, 72.0, 60.0],
        [710.0,  570.0,  435.0,  345.0,  278.0,  228.0, 195.0, 130.0,  91.0, 70.0, 60.0],
        [395.0,  345.0,  275.0,  228.0,  190.0,  163.0, 143.0, 105.0,  81.0, 67.0, 60.0],
        [264.0,  248.0,  210.0,  177.0,  153.0,  134.0, 118.0,  91.0,  73.0, 64.0, 60.0],
        [202.0,  196.0,  176.0,  151.0,  130.0,  115.0, 103.0,  81.0,  67.0, 62.0, 60.0],
        [166.0,  164.0,  154.0,  133.0,  117.0,  104.0,  93.0,  75.0,  64.0, 60.0, 60.0],
        [147.0,  145.0,  138.0,  120.0,  108.0,   98.0,  88.0,  70.0,  60.0, 58.0, 60.0],
        [140.0,  139.0,  130.0,  115.0,  105.0,   95.0,  86.0,  70.0,  60.0, 57.0, 60.0],
        [140.0,  139.0,  129.0,  116.0,  107.0,   99.0,  91.0,  75.0,  62.0, 56.0, 60.0],
        [153.0,  150.0,  140.0,  129.0,  118.0,  110.0, 102.0,  81.0,  64.0, 56.0, 60.0],
        [180.0,  166.0,  152.0,  139.0,  127.0,  116.0, 105.0,  82.0,  65.0, 56.0, 60.0],
    ]
}

/// Absorb degree/radian round-off at the table edges
fn snap_to_bounds(value: f64, min: f64, max: f64) -> f64 {
    const SLACK: f64 = 1e-9;
    if value < min && value > min - SLACK {
        min
    } else if value > max && value < max + SLACK {
        max
    } else {
        value
    }
}

/// Leinert zodiacal brightness table
pub struct ZodiacalLight {
    /// S10 brightness indexed `[elongation, latitude]`
    data: Array2<f64>,
}

impl Default for ZodiacalLight {
    fn default() -> Self {
        Self::new()
    }
}

impl ZodiacalLight {
    pub fn new() -> Self {
        let raw = leinert_table();
        let data = Array2::from_shape_fn((ELONGATIONS.len(), LATITUDES.len()), |(e, l)| raw[e][l]);
        Self { data }
    }

    /// Lower index, upper index and weight of the lower sample
    fn find_indices_and_weights(array: &[f64], value: f64) -> Option<(usize, usize, f64)> {
        if value < array[0] || value > array[array.len() - 1] {
            return None;
        }

        let upper = array.partition_point(|&v| v <= value);
        if upper == 0 || array[upper - 1] == value {
            let exact = upper.saturating_sub(1);
            return Some((exact, exact, 1.0));
        }
        let lower = upper - 1;
        let weight = (value - array[lower]) / (array[upper] - array[lower]);
        Some((lower, upper, 1.0 - weight))
    }

    /// Brightness in S10 units by bilinear interpolation.
    ///
    /// Corners without a measurement are dropped and the remaining weights
    /// renormalized; the lookup fails only if all four are missing.
    pub fn brightness_s10(&self, elongation: Angle, latitude: Angle) -> Result<f64, ZodiacalError> {
        let elong_deg = snap_to_bounds(elongation.as_degrees(), 0.0, 180.0);
        let lat_deg = snap_to_bounds(latitude.as_degrees(), -90.0, 90.0);
        let out_of_range = || ZodiacalError::OutOfRange(elong_deg, lat_deg);

        let (e1, e2, we) =
            Self::find_indices_and_weights(&ELONGATIONS, elong_deg).ok_or_else(out_of_range)?;
        let (l1, l2, wl) =
            Self::find_indices_and_weights(&LATITUDES, lat_deg.abs()).ok_or_else(out_of_range)?;

        let corners = [
            (self.data[[e1, l1]], we * wl),
            (self.data[[e1, l2]], we * (1.0 - wl)),
            (self.data[[e2, l1]], (1.0 - we) * wl),
            (self.data[[e2, l2]], (1.0 - we) * (1.0 - wl)),
        ];

        let (sum, weight) = corners
            .iter()
            .filter(|(value, weight)| value.is_finite() && *weight > 0.0)
            .fold((0.0, 0.0), |(sum, total), (value, weight)| {
                (sum + value * weight, total + weight)
            });

        if weight == 0.0 {
            return Err(ZodiacalError::TooCloseToSun(elong_deg, lat_deg));
        }
        Ok(sum / weight)
    }

    /// V surface brightness in mag/arcsec².
    ///
    /// mag/arcsec² = 10 − 2.5·log₁₀(S10 / 3600²)
    pub fn surface_brightness_v(
        &self,
        elongation: Angle,
        latitude: Angle,
    ) -> Result<f64, ZodiacalError> {
        let s10 = self.brightness_s10(elongation, latitude)?;
        Ok(10.0 - 2.5 * (s10 / (3600.0 * 3600.0)).log10())
    }

    /// Zodiacal light F_λ per arcsec² as seen from the ground at `airmass`
    pub fn spectrum(
        &self,
        solar: &SolarProperties,
        airmass: f64,
        atmosphere: &Atmosphere,
    ) -> Result<Grid, SpectrumError> {
        let v = self.surface_brightness_v(solar.elongation(), solar.ecliptic_latitude())?;
        let mut grid = solar_irradiance();
        grid.scale_at(SKY_REFERENCE_NM, surface_brightness_flux(v));
        atmosphere.apply(&mut grid, airmass)?;
        Ok(grid)
    }
}
