//! Gaussian emission lines

use std::cell::Cell;
use std::f64::consts::PI;

use crate::conditions::{require_positive, require_range, ParameterError};
use crate::notify::Change;

use super::spectrum::{SpectralGrid, Spectrum, SpectrumError};

/// FWHM of a Gaussian in units of its sigma, 2·sqrt(2·ln 2)
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045;

/// Derived profile constants, valid for one (fwhm, total) pair
#[derive(Debug, Clone, Copy)]
struct ProfileCache {
    fwhm_nm: f64,
    total_flux: f64,
    two_sigma_sq: f64,
    peak: f64,
}

impl ProfileCache {
    fn evaluate(&self, offset_nm: f64) -> f64 {
        self.peak * (-offset_nm * offset_nm / self.two_sigma_sq).exp()
    }
}

/// Normalized Gaussian line profile
///
/// Integrates to `total_flux` over wavelength. The sigma and peak height
/// are cached and recomputed only when the FWHM or total flux seen at the
/// previous evaluation differ, since the profile is evaluated once per grid
/// bin.
#[derive(Debug)]
pub struct GaussianLine {
    storage: SpectralGrid,
    center_nm: f64,
    fwhm_nm: f64,
    total_flux: f64,
    cache: Cell<Option<ProfileCache>>,
}

impl GaussianLine {
    /// Create a point-source emission line
    ///
    /// # Arguments
    ///
    /// * `center_nm` - Line centre wavelength in nanometers
    /// * `fwhm_nm` - Full width at half maximum in nanometers
    /// * `total_flux` - Integrated line flux in erg s⁻¹ cm⁻²
    pub fn new(center_nm: f64, fwhm_nm: f64, total_flux: f64) -> Result<Self, ParameterError> {
        Ok(Self {
            storage: SpectralGrid::new(false),
            center_nm: require_positive("line centre", center_nm)?,
            fwhm_nm: require_positive("line FWHM", fwhm_nm)?,
            total_flux: require_range("line flux", total_flux, f64::MIN, f64::MAX)?,
            cache: Cell::new(None),
        })
    }

    /// Emission line per arcsec², e.g. for sky lines or extended nebulae
    pub fn diffuse(center_nm: f64, fwhm_nm: f64, total_flux: f64) -> Result<Self, ParameterError> {
        let mut line = Self::new(center_nm, fwhm_nm, total_flux)?;
        line.storage.set_diffuse(true);
        Ok(line)
    }

    pub fn center_nm(&self) -> f64 {
        self.center_nm
    }

    pub fn fwhm_nm(&self) -> f64 {
        self.fwhm_nm
    }

    pub fn total_flux(&self) -> f64 {
        self.total_flux
    }

    pub fn set_center(&mut self, center_nm: f64) -> Result<(), ParameterError> {
        self.center_nm = require_positive("line centre", center_nm)?;
        self.storage.tracker().invalidate(Change::Parameter);
        Ok(())
    }

    pub fn set_fwhm(&mut self, fwhm_nm: f64) -> Result<(), ParameterError> {
        self.fwhm_nm = require_positive("line FWHM", fwhm_nm)?;
        self.storage.tracker().invalidate(Change::Parameter);
        Ok(())
    }

    pub fn set_total_flux(&mut self, total_flux: f64) -> Result<(), ParameterError> {
        self.total_flux = require_range("line flux", total_flux, f64::MIN, f64::MAX)?;
        self.storage.tracker().invalidate(Change::Parameter);
        Ok(())
    }

    fn profile_constants(&self) -> ProfileCache {
        match self.cache.get() {
            Some(cache) if cache.fwhm_nm == self.fwhm_nm && cache.total_flux == self.total_flux => {
                cache
            }
            _ => {
                let sigma = self.fwhm_nm / FWHM_PER_SIGMA;
                let fresh = ProfileCache {
                    fwhm_nm: self.fwhm_nm,
                    total_flux: self.total_flux,
                    two_sigma_sq: 2.0 * sigma * sigma,
                    peak: self.total_flux / (sigma * (2.0 * PI).sqrt()),
                };
                self.cache.set(Some(fresh));
                fresh
            }
        }
    }

    /// Closed-form line flux density at a wavelength
    pub fn flux_at(&self, wavelength_nm: f64) -> f64 {
        self.profile_constants()
            .evaluate(wavelength_nm - self.center_nm)
    }
}

impl Spectrum for GaussianLine {
    fn name(&self) -> String {
        format!("line {:.1} nm", self.center_nm)
    }

    fn spectral_grid(&self) -> &SpectralGrid {
        &self.storage
    }

    fn spectral_grid_mut(&mut self) -> &mut SpectralGrid {
        &mut self.storage
    }

    fn update(&mut self) -> Result<(), SpectrumError> {
        let constants = self.profile_constants();
        let center = self.center_nm;
        self.storage
            .grid_mut()
            .fill_with(|x| constants.evaluate(x - center));
        Ok(())
    }

    fn flux(&mut self, wavelength_nm: f64) -> Result<f64, SpectrumError> {
        Ok(self.flux_at(wavelength_nm))
    }
}
