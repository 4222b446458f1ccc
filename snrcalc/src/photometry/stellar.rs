//! Analytic continuum models: flat, blackbody and power law
//!
//! All three fill the shared wavelength grid with F_λ in
//! erg s⁻¹ cm⁻² nm⁻¹. They are usually wrapped in a magnitude
//! normalization, so only their shape matters.

use crate::conditions::{require_positive, require_range, ParameterError};
use crate::notify::Change;
use crate::units::{Temperature, TemperatureExt};

use super::spectrum::{SpectralGrid, Spectrum, SpectrumError, CGS};

/// Spectrum with the same F_λ at every wavelength
#[derive(Debug)]
pub struct FlatSpectrum {
    storage: SpectralGrid,
    level: f64,
}

impl FlatSpectrum {
    /// Create a point-source flat spectrum
    ///
    /// # Arguments
    ///
    /// * `level` - F_λ in erg s⁻¹ cm⁻² nm⁻¹
    pub fn new(level: f64) -> Result<Self, ParameterError> {
        require_range("flat spectrum level", level, f64::MIN, f64::MAX)?;
        Ok(Self {
            storage: SpectralGrid::new(false),
            level,
        })
    }

    /// Flat spectrum per arcsec², for uniform sky or surface brightness targets
    pub fn diffuse(level: f64) -> Result<Self, ParameterError> {
        let mut spectrum = Self::new(level)?;
        spectrum.storage.set_diffuse(true);
        Ok(spectrum)
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn set_level(&mut self, level: f64) -> Result<(), ParameterError> {
        require_range("flat spectrum level", level, f64::MIN, f64::MAX)?;
        self.level = level;
        self.storage.tracker().invalidate(Change::Parameter);
        Ok(())
    }
}

impl Spectrum for FlatSpectrum {
    fn name(&self) -> String {
        format!("flat {:.3e}", self.level)
    }

    fn spectral_grid(&self) -> &SpectralGrid {
        &self.storage
    }

    fn spectral_grid_mut(&mut self) -> &mut SpectralGrid {
        &mut self.storage
    }

    fn update(&mut self) -> Result<(), SpectrumError> {
        let level = self.level;
        self.storage.grid_mut().fill_with(|_| level);
        Ok(())
    }
}

/// Convert B-V color index to effective temperature in Kelvin
///
/// Uses the empirical relation from Ballesteros (2012)
/// https://arxiv.org/pdf/1201.1809
/// Valid for B-V values from approximately -0.4 to 2.0
pub fn temperature_from_bv(b_v: f64) -> f64 {
    // equation 14 in the source above
    4600.0 * (1.0 / (0.92 * b_v + 1.7) + (1.0 / (0.92 * b_v + 0.62)))
}

/// Calculate spectral radiance using Planck's law in CGS units
///
/// # Arguments
///
/// * `wavelength_cm` - Wavelength in centimeters
/// * `kelvin` - Temperature in Kelvin
///
/// # Returns
///
/// Spectral radiance in erg⋅s^-1⋅cm^-2⋅sr^-1⋅cm^-1
fn planck_spectral_radiance(wavelength_cm: f64, kelvin: f64) -> f64 {
    let numerator = 2.0 * CGS::PLANCK_CONSTANT * CGS::SPEED_OF_LIGHT * CGS::SPEED_OF_LIGHT;
    let exponent = (CGS::PLANCK_CONSTANT * CGS::SPEED_OF_LIGHT)
        / (wavelength_cm * CGS::BOLTZMANN_CONSTANT * kelvin);
    let denominator = wavelength_cm.powi(5) * exponent.exp_m1();

    numerator / denominator
}

/// Emergent flux π·B_λ in erg s⁻¹ cm⁻² nm⁻¹, 0.0 for non-positive wavelengths
pub fn planck_surface_flux(wavelength_nm: f64, kelvin: f64) -> f64 {
    if wavelength_nm <= 0.0 {
        return 0.0;
    }
    // per cm → per nm
    std::f64::consts::PI * planck_spectral_radiance(wavelength_nm * 1e-7, kelvin) * 1e-7
}

/// Planck-law thermal continuum
///
/// Flux is π·B_λ(T) per nm times a dilution factor (R/d)², evaluated in
/// closed form on every call rather than through the grid.
#[derive(Debug)]
pub struct BlackbodySpectrum {
    storage: SpectralGrid,
    temperature: Temperature,
    dilution: f64,
}

impl BlackbodySpectrum {
    /// Create a blackbody with unit dilution
    ///
    /// # Arguments
    ///
    /// * `temperature` - Effective temperature (must be positive)
    pub fn new(temperature: Temperature) -> Result<Self, ParameterError> {
        require_positive("blackbody temperature", temperature.as_kelvin())?;
        Ok(Self {
            storage: SpectralGrid::new(false),
            temperature,
            dilution: 1.0,
        })
    }

    /// Blackbody at the temperature implied by a B-V color
    pub fn from_bv(b_v: f64) -> Result<Self, ParameterError> {
        Self::new(Temperature::from_kelvin(temperature_from_bv(b_v)))
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }

    pub fn dilution(&self) -> f64 {
        self.dilution
    }

    pub fn set_temperature(&mut self, temperature: Temperature) -> Result<(), ParameterError> {
        require_positive("blackbody temperature", temperature.as_kelvin())?;
        self.temperature = temperature;
        self.storage.tracker().invalidate(Change::Parameter);
        Ok(())
    }

    pub fn set_dilution(&mut self, dilution: f64) -> Result<(), ParameterError> {
        require_positive("blackbody dilution", dilution)?;
        self.dilution = dilution;
        self.storage.tracker().invalidate(Change::Parameter);
        Ok(())
    }

    /// Closed-form F_λ in erg s⁻¹ cm⁻² nm⁻¹, 0.0 for non-positive wavelengths
    pub fn flux_at(&self, wavelength_nm: f64) -> f64 {
        planck_surface_flux(wavelength_nm, self.temperature.as_kelvin()) * self.dilution
    }
}

impl Spectrum for BlackbodySpectrum {
    fn name(&self) -> String {
        format!("blackbody {:.0} K", self.temperature.as_kelvin())
    }

    fn spectral_grid(&self) -> &SpectralGrid {
        &self.storage
    }

    fn spectral_grid_mut(&mut self) -> &mut SpectralGrid {
        &mut self.storage
    }

    fn update(&mut self) -> Result<(), SpectrumError> {
        let (kelvin, dilution) = (self.temperature.as_kelvin(), self.dilution);
        self.storage
            .grid_mut()
            .fill_with(|x| planck_surface_flux(x, kelvin) * dilution);
        Ok(())
    }

    fn flux(&mut self, wavelength_nm: f64) -> Result<f64, SpectrumError> {
        Ok(self.flux_at(wavelength_nm))
    }
}

/// F_λ = amplitude · (λ / pivot)^index
#[derive(Debug)]
pub struct PowerLawSpectrum {
    storage: SpectralGrid,
    index: f64,
    amplitude: f64,
    pivot_nm: f64,
}

impl PowerLawSpectrum {
    /// Unit amplitude power law in λ/nm, i.e. F_λ = λ^index
    pub fn new(index: f64) -> Result<Self, ParameterError> {
        require_range("power law index", index, -100.0, 100.0)?;
        Ok(Self {
            storage: SpectralGrid::new(false),
            index,
            amplitude: 1.0,
            pivot_nm: 1.0,
        })
    }

    /// Power law with the given amplitude at a pivot wavelength
    pub fn with_pivot(index: f64, amplitude: f64, pivot_nm: f64) -> Result<Self, ParameterError> {
        let mut spectrum = Self::new(index)?;
        spectrum.amplitude = require_range("power law amplitude", amplitude, f64::MIN, f64::MAX)?;
        spectrum.pivot_nm = require_positive("power law pivot", pivot_nm)?;
        Ok(spectrum)
    }

    pub fn index(&self) -> f64 {
        self.index
    }

    pub fn set_index(&mut self, index: f64) -> Result<(), ParameterError> {
        require_range("power law index", index, -100.0, 100.0)?;
        self.index = index;
        self.storage.tracker().invalidate(Change::Parameter);
        Ok(())
    }
}

impl Spectrum for PowerLawSpectrum {
    fn name(&self) -> String {
        format!("power law λ^{}", self.index)
    }

    fn spectral_grid(&self) -> &SpectralGrid {
        &self.storage
    }

    fn spectral_grid_mut(&mut self) -> &mut SpectralGrid {
        &mut self.storage
    }

    fn update(&mut self) -> Result<(), SpectrumError> {
        let (index, amplitude, pivot) = (self.index, self.amplitude, self.pivot_nm);
        self.storage
            .grid_mut()
            .fill_with(|x| amplitude * (x / pivot).powf(index));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_spectrum() {
        let mut flat = FlatSpectrum::new(2.5).unwrap();
        assert!(!flat.is_diffuse());
        assert_relative_eq!(flat.flux(300.0).unwrap(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(flat.flux(1000.0).unwrap(), 2.5, epsilon = 1e-12);

        flat.set_level(4.0).unwrap();
        assert_relative_eq!(flat.flux(700.0).unwrap(), 4.0, epsilon = 1e-12);

        assert!(FlatSpectrum::diffuse(1.0).unwrap().is_diffuse());
        assert!(flat.set_level(f64::INFINITY).is_err());
        assert_eq!(flat.level(), 4.0);
    }

    #[test]
    fn test_blackbody_spectral_shape() {
        let sun_like = BlackbodySpectrum::new(Temperature::from_kelvin(5778.0)).unwrap();
        assert!(sun_like.flux_at(500.0) > sun_like.flux_at(300.0));
        assert!(sun_like.flux_at(500.0) > sun_like.flux_at(1000.0));

        let cool = BlackbodySpectrum::new(Temperature::from_kelvin(3500.0)).unwrap();
        assert!(cool.flux_at(700.0) > cool.flux_at(400.0));

        let hot = BlackbodySpectrum::new(Temperature::from_kelvin(30000.0)).unwrap();
        assert!(hot.flux_at(400.0) > hot.flux_at(700.0));
    }

    #[test]
    fn test_blackbody_wien_peak_on_grid() {
        // Wien: λ_max = 2.8978e6 nm·K / T
        let mut bb = BlackbodySpectrum::new(Temperature::from_kelvin(5000.0)).unwrap();
        let grid = bb.snapshot().unwrap();

        let peak_bin = (0..grid.len())
            .max_by(|&a, &b| grid.y(a).total_cmp(&grid.y(b)))
            .unwrap();
        assert_relative_eq!(grid.x(peak_bin), 2.8978e6 / 5000.0, epsilon = 1.0);
    }

    #[test]
    fn test_blackbody_surface_flux() {
        // Stefan-Boltzmann check on a hot-enough body is out of grid range,
        // so compare π·B_λ directly: 5778 K at 500 nm ≈ 8.3e7 erg/s/cm²/nm
        let sun = BlackbodySpectrum::new(Temperature::from_kelvin(5778.0)).unwrap();
        assert_relative_eq!(sun.flux_at(500.0), 8.3e7, max_relative = 0.02);
    }

    #[test]
    fn test_blackbody_validation_and_dilution() {
        assert!(BlackbodySpectrum::new(Temperature::from_kelvin(0.0)).is_err());

        let mut bb = BlackbodySpectrum::new(Temperature::from_kelvin(6000.0)).unwrap();
        let base = bb.flux(600.0).unwrap();
        bb.set_dilution(1e-20).unwrap();
        assert_relative_eq!(bb.flux(600.0).unwrap(), base * 1e-20, max_relative = 1e-12);
        assert!(bb.set_temperature(Temperature::from_kelvin(-5.0)).is_err());
        assert_relative_eq!(bb.temperature().as_kelvin(), 6000.0);
    }

    #[test]
    fn test_bv_to_temperature() {
        // Solar B-V ~0.65 gives ~5800 K
        assert_relative_eq!(temperature_from_bv(0.65), 5800.0, epsilon = 150.0);
        let vega_like = BlackbodySpectrum::from_bv(0.0).unwrap();
        assert!(vega_like.temperature().as_kelvin() > 9000.0);
    }

    #[test]
    fn test_power_law() {
        let mut rayleigh = PowerLawSpectrum::new(-4.0).unwrap();
        let ratio = rayleigh.flux(400.0).unwrap() / rayleigh.flux(800.0).unwrap();
        assert_relative_eq!(ratio, 16.0, max_relative = 1e-6);

        let mut pivoted = PowerLawSpectrum::with_pivot(-2.0, 3.0, 500.0).unwrap();
        assert_relative_eq!(pivoted.flux(500.0).unwrap(), 3.0, max_relative = 1e-9);

        pivoted.set_index(0.0).unwrap();
        assert_relative_eq!(pivoted.flux(900.0).unwrap(), 3.0, max_relative = 1e-9);
        assert!(PowerLawSpectrum::with_pivot(1.0, 1.0, 0.0).is_err());
    }
}
