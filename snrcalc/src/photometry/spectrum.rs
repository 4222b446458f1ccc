//! Spectral energy distributions on the shared wavelength grid.
//!
//! Every spectrum in the calculator samples F_λ on a [`Grid`] and recomputes
//! those samples lazily. This module provides the physical constants, the
//! wavelength [`Band`] type, and the [`Spectrum`] trait that ties a grid to
//! its recompute state.
//!
//! # Physical Framework
//!
//! All spectral quantities use CGS units with wavelengths in nanometres:
//! - **Spectral flux density**: F_λ in erg s⁻¹ cm⁻² nm⁻¹
//! - **Diffuse spectra**: the same, per arcsec² of sky
//! - **Photon rates**: photons s⁻¹ cm⁻² nm⁻¹ after quantization
//!
//! # Lazy Recompute
//!
//! A spectrum's grid is only valid while its [`Tracker`] is fresh. Parameter
//! setters invalidate the tracker (which also marks every subscribed
//! composite stale); readers go through [`Spectrum::ensure_fresh`], usually
//! via [`Spectrum::flux`] or [`Spectrum::snapshot`], which recomputes at most
//! once per change.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::algo::grid::{Grid, GridError, GridGeometry};
use crate::conditions::ParameterError;
use crate::io::table::TableError;
use crate::notify::{Change, Tracker};

use super::zodiacal::ZodiacalError;

/// Physical constants in CGS units.
///
/// Lengths in nanometres where noted; everything else is centimetre-gram-second.
pub struct CGS {}

impl CGS {
    /// AB magnitude system zero-point flux density
    /// Units: 3631e-23 erg s⁻¹ cm⁻² Hz⁻¹
    pub const AB_ZERO_POINT_FLUX_DENSITY: f64 = 3631e-23;

    /// Planck's constant
    /// Units: erg⋅s
    pub const PLANCK_CONSTANT: f64 = 6.62607015e-27;

    /// Speed of light in vacuum
    /// Units: cm/s
    pub const SPEED_OF_LIGHT: f64 = 2.99792458e10;

    /// Speed of light in vacuum
    /// Units: nm/s
    pub const SPEED_OF_LIGHT_NM: f64 = 2.99792458e17;

    /// Boltzmann constant
    /// Units: erg/K
    pub const BOLTZMANN_CONSTANT: f64 = 1.380649e-16;

    /// Photon energy-wavelength product h·c
    /// Units: erg⋅nm
    pub const HC_ERG_NM: f64 = Self::PLANCK_CONSTANT * Self::SPEED_OF_LIGHT_NM;
}

/// Errors that can occur computing a spectrum
#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Data format error: {0}")]
    Table(#[from] TableError),

    #[error("Invalid parameter: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Zodiacal light: {0}")]
    Zodiacal(#[from] ZodiacalError),
}

/// Photon energy at a wavelength
///
/// # Arguments
/// * `wavelength_nm` - Wavelength in nanometres (must be positive)
///
/// # Returns
/// Energy in erg, or 0.0 for non-positive wavelengths
pub fn wavelength_to_ergs(wavelength_nm: f64) -> f64 {
    if wavelength_nm <= 0.0 {
        return 0.0;
    }
    CGS::HC_ERG_NM / wavelength_nm
}

/// Convert F_ν (erg s⁻¹ cm⁻² Hz⁻¹) to F_λ (erg s⁻¹ cm⁻² nm⁻¹)
pub fn f_nu_to_f_lambda(f_nu: f64, wavelength_nm: f64) -> f64 {
    f_nu * CGS::SPEED_OF_LIGHT_NM / (wavelength_nm * wavelength_nm)
}

/// Contiguous wavelength interval.
///
/// Used for box throughput curves and normalization windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Lower wavelength bound in nanometers
    pub lower_nm: f64,

    /// Upper wavelength bound in nanometers
    pub upper_nm: f64,
}

impl Band {
    /// Create a new Band from lower and upper bounds
    ///
    /// # Arguments
    ///
    /// * `lower_nm` - Lower wavelength bound in nanometers
    /// * `upper_nm` - Upper wavelength bound in nanometers
    ///
    /// # Returns
    ///
    /// The band, or an error if the bounds are non-finite, negative or reversed
    pub fn from_nm_bounds(lower_nm: f64, upper_nm: f64) -> Result<Self, ParameterError> {
        if !lower_nm.is_finite() {
            return Err(ParameterError::NotFinite {
                name: "lower wavelength",
                value: lower_nm,
            });
        }
        if !upper_nm.is_finite() {
            return Err(ParameterError::NotFinite {
                name: "upper wavelength",
                value: upper_nm,
            });
        }
        if lower_nm < 0.0 {
            return Err(ParameterError::NotPositive {
                name: "lower wavelength",
                value: lower_nm,
            });
        }
        if lower_nm > upper_nm {
            return Err(ParameterError::OutOfRange {
                name: "upper wavelength",
                value: upper_nm,
                min: lower_nm,
                max: f64::INFINITY,
            });
        }

        Ok(Self { lower_nm, upper_nm })
    }

    /// Band of the given full width centred on a wavelength
    pub fn centered_on(wavelength_nm: f64, width_nm: f64) -> Result<Self, ParameterError> {
        Self::from_nm_bounds(wavelength_nm - width_nm / 2.0, wavelength_nm + width_nm / 2.0)
    }

    /// Get the width of the band in nanometers
    pub fn width(&self) -> f64 {
        self.upper_nm - self.lower_nm
    }

    /// Return the center of a band in nanometers
    pub fn center(&self) -> f64 {
        (self.lower_nm + self.upper_nm) / 2.0
    }

    /// Whether a wavelength lies inside the band (bounds inclusive)
    pub fn contains(&self, wavelength_nm: f64) -> bool {
        (self.lower_nm..=self.upper_nm).contains(&wavelength_nm)
    }
}

/// Grid storage shared by every spectrum implementation.
///
/// Holds the sampled F_λ, the recompute [`Tracker`] and the diffuse flag.
#[derive(Debug)]
pub struct SpectralGrid {
    grid: Grid,
    tracker: Rc<Tracker>,
    diffuse: bool,
}

impl SpectralGrid {
    /// Zero-filled storage on the default wavelength geometry
    pub fn new(diffuse: bool) -> Self {
        Self::with_geometry(GridGeometry::WAVELENGTH_DEFAULT, diffuse)
    }

    pub fn with_geometry(geometry: GridGeometry, diffuse: bool) -> Self {
        Self {
            grid: Grid::new(geometry),
            tracker: Rc::new(Tracker::new()),
            diffuse,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn tracker(&self) -> &Rc<Tracker> {
        &self.tracker
    }

    pub fn is_diffuse(&self) -> bool {
        self.diffuse
    }

    /// Mark the ordinates as per arcsec² (or not) and notify dependents
    pub fn set_diffuse(&mut self, diffuse: bool) {
        if self.diffuse != diffuse {
            self.diffuse = diffuse;
            self.tracker.invalidate(Change::Parameter);
        }
    }
}

/// Lazily computed spectral energy distribution.
///
/// Implementors supply their storage and an [`update`](Spectrum::update)
/// that repopulates it from current parameters; everything else has a
/// default built on the recompute tracker.
///
/// # Physical Units
/// - **Wavelengths**: nanometers (nm)
/// - **Flux**: F_λ in erg s⁻¹ cm⁻² nm⁻¹, per arcsec² when diffuse
pub trait Spectrum {
    /// Human readable description, informational only
    fn name(&self) -> String;

    fn spectral_grid(&self) -> &SpectralGrid;

    fn spectral_grid_mut(&mut self) -> &mut SpectralGrid;

    /// Repopulate the grid from the current parameters.
    ///
    /// Called by [`Spectrum::ensure_fresh`] only while stale; implementations
    /// do not touch the tracker state themselves.
    fn update(&mut self) -> Result<(), SpectrumError>;

    fn tracker(&self) -> &Rc<Tracker> {
        self.spectral_grid().tracker()
    }

    fn is_diffuse(&self) -> bool {
        self.spectral_grid().is_diffuse()
    }

    /// Recompute if stale; the single entry point for every reader
    fn ensure_fresh(&mut self) -> Result<(), SpectrumError> {
        if self.tracker().is_stale() {
            log::debug!("Recomputing spectrum {}", self.name());
            self.update()?;
            self.tracker().mark_fresh();
        }
        Ok(())
    }

    /// F_λ at a wavelength by spline interpolation of the grid
    ///
    /// # Returns
    /// Flux in erg s⁻¹ cm⁻² nm⁻¹ (per arcsec² if diffuse), 0.0 off the grid
    fn flux(&mut self, wavelength_nm: f64) -> Result<f64, SpectrumError> {
        self.ensure_fresh()?;
        Ok(self.spectral_grid().grid().interp(wavelength_nm))
    }

    /// Private copy of the up-to-date grid, for pipelines that mutate it
    fn snapshot(&mut self) -> Result<Grid, SpectrumError> {
        self.ensure_fresh()?;
        Ok(self.spectral_grid().grid().clone())
    }

    /// Free the grid buffers; the next read recomputes them
    fn release(&mut self) {
        let storage = self.spectral_grid_mut();
        storage.grid_mut().release();
        storage.tracker().expire();
    }
}

/// Spectrum shared between composites and whoever edits its parameters
pub type SharedSpectrum = Rc<RefCell<dyn Spectrum>>;

/// Wrap a spectrum for shared use
pub fn shared<S: Spectrum + 'static>(spectrum: S) -> Rc<RefCell<S>> {
    Rc::new(RefCell::new(spectrum))
}
