//! CCD detector noise and sampling characteristics

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::conditions::{require_positive, require_range, ParameterError};

/// Configuration for a CCD detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Name/model of the detector
    pub name: String,
    /// Read noise in electrons per (binned) pixel read
    pub read_noise_e: f64,
    /// Dark current in electrons per unbinned pixel per second
    pub dark_current_e_per_s: f64,
    /// Sky angle subtended by one unbinned pixel, arcsec
    pub plate_scale_arcsec: f64,
    /// Full well capacity in electrons
    pub full_well_e: f64,
}

impl DetectorConfig {
    /// Create a validated detector configuration
    pub fn new(
        name: impl Into<String>,
        read_noise_e: f64,
        dark_current_e_per_s: f64,
        plate_scale_arcsec: f64,
        full_well_e: f64,
    ) -> Result<Self, ParameterError> {
        let detector = Self {
            name: name.into(),
            read_noise_e,
            dark_current_e_per_s,
            plate_scale_arcsec,
            full_well_e,
        };
        detector.validate()?;
        Ok(detector)
    }

    /// Check every field, e.g. after deserializing
    pub fn validate(&self) -> Result<(), ParameterError> {
        require_range("read noise", self.read_noise_e, 0.0, f64::MAX)?;
        require_range("dark current", self.dark_current_e_per_s, 0.0, f64::MAX)?;
        require_positive("plate scale", self.plate_scale_arcsec)?;
        require_positive("full well", self.full_well_e)?;
        Ok(())
    }

    /// Solid angle of a `binning`×`binning` pixel block in arcsec²
    pub fn binned_pixel_solid_angle(&self, binning: u32) -> f64 {
        let side = self.plate_scale_arcsec * binning as f64;
        side * side
    }

    /// Dark electrons collected by a binned pixel in `exposure_s` seconds
    pub fn binned_dark_counts(&self, exposure_s: f64, binning: u32) -> f64 {
        self.dark_current_e_per_s * exposure_s * (binning as f64).powi(2)
    }
}

/// Standard detector models
pub mod models {
    use super::*;

    /// ODI orthogonal transfer array CCD as mounted on WIYN
    pub static ODI_OTA: Lazy<DetectorConfig> = Lazy::new(|| DetectorConfig {
        name: "ODI OTA".to_string(),
        read_noise_e: 7.0,
        dark_current_e_per_s: 0.0015,
        plate_scale_arcsec: 0.11,
        full_well_e: 150_000.0,
    });
}
