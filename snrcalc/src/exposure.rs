//! Signal-to-noise prediction for a single instrument setup.
//!
//! Given a target spectrum and a sky spectrum, both in energy flux, the
//! [`ExposureCalculator`] folds in the telescope, the atmosphere and the
//! instrument throughput, converts to detected photons and predicts what an
//! exposure sequence yields.
//!
//! # Noise Model
//!
//! Per binned pixel the background noise is
//! `Noise_b = sqrt(NSky_b + RON² + DC·t·bin²)`. A point source is a circular
//! Gaussian of `σ = FWHM / 2.354` binned pixels; an aperture of radius r
//! encloses `N·(1 − exp(−r²/2σ²))` of its counts and `πr²` pixels, so
//!
//! ```text
//! S/N = N_enc / sqrt(N_enc + πr²·Noise_b²)
//! ```
//!
//! Co-adding n exposures multiplies S/N by √n. Surface-brightness S/N is
//! the per-pixel signal `N·Ω_b` over `Noise_b`.
//!
//! Zero or negative exposure time, seeing or aperture give degenerate
//! (zero or non-finite) numbers; range checks belong to whoever builds
//! [`ExposureParameters`].

use std::f64::consts::PI;

use crate::hardware::instrument::InstrumentConfig;
use crate::hardware::telescope::TelescopeProperties;
use crate::photometry::atmosphere::Atmosphere;
use crate::photometry::emission_line::FWHM_PER_SIGMA;
use crate::photometry::spectrum::{Spectrum, SpectrumError, CGS};

/// Noise per binned pixel from sky, read noise and dark current
pub fn binned_pixel_noise(sky_counts: f64, read_noise_e: f64, dark_counts: f64) -> f64 {
    (sky_counts + read_noise_e * read_noise_e + dark_counts).sqrt()
}

/// Gaussian sigma for a FWHM, in the same units
pub fn gaussian_sigma(fwhm: f64) -> f64 {
    fwhm / FWHM_PER_SIGMA
}

/// Fraction of a circular Gaussian's flux within `radius`
pub fn enclosed_fraction(radius: f64, sigma: f64) -> f64 {
    1.0 - (-radius * radius / (2.0 * sigma * sigma)).exp()
}

/// S/N of an aperture holding `signal` counts over `pixels` pixels.
///
/// Returns 0 when there is nothing to measure.
pub fn aperture_snr(signal: f64, pixels: f64, pixel_noise: f64) -> f64 {
    let variance = signal + pixels * pixel_noise * pixel_noise;
    if variance > 0.0 {
        signal / variance.sqrt()
    } else {
        0.0
    }
}

/// S/N after co-adding `exposures` independent frames
pub fn combined_snr(single: f64, exposures: u32) -> f64 {
    single * (exposures as f64).sqrt()
}

/// What to observe and how
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureParameters {
    /// Single exposure time, seconds
    pub exposure_s: f64,
    /// Number of exposures co-added
    pub exposures: u32,
    /// On-chip binning factor per axis
    pub binning: u32,
    /// Seeing FWHM, arcsec
    pub seeing_fwhm_arcsec: f64,
    /// Aperture radii as multiples of the FWHM
    pub aperture_multipliers: Vec<f64>,
}

impl Default for ExposureParameters {
    fn default() -> Self {
        Self {
            exposure_s: 300.0,
            exposures: 1,
            binning: 1,
            seeing_fwhm_arcsec: 1.0,
            aperture_multipliers: vec![0.5, 1.0, 1.5, 2.0],
        }
    }
}

/// Photometry predicted for one aperture size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureResult {
    /// Aperture radius in FWHM
    pub aperture_multiplier: f64,
    /// Aperture radius in binned pixels
    pub aperture_radius_px: f64,
    /// Binned pixels inside the aperture, πr²
    pub pixels_in_aperture: f64,
    /// Sky electrons per binned pixel
    pub sky_level: f64,
    /// Dark electrons per binned pixel
    pub dark_counts: f64,
    /// Background noise per binned pixel
    pub sky_noise: f64,
    /// Target electrons in the brightest binned pixel
    pub peak_level: f64,
    /// All target electrons
    pub total_flux: f64,
    /// Target electrons inside the aperture
    pub aperture_flux: f64,
    pub snr: f64,
    pub combined_snr: f64,
    /// Target electrons per binned pixel treating the target as per arcsec²
    pub surface_brightness_flux: f64,
    pub surface_brightness_snr: f64,
    pub surface_brightness_combined_snr: f64,
    /// Peak + sky + dark reaches full well
    pub saturated: bool,
}

/// Detected photon rates after all propagation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotonRates {
    /// Target photons s⁻¹ (per arcsec² if the target is diffuse)
    pub target: f64,
    /// Sky photons s⁻¹ arcsec⁻²
    pub sky: f64,
}

/// Exposure engine for one telescope, atmosphere and instrument
pub struct ExposureCalculator<'a> {
    instrument: &'a InstrumentConfig,
    telescope: &'a TelescopeProperties,
    atmosphere: &'a Atmosphere,
}

impl<'a> ExposureCalculator<'a> {
    pub fn new(
        instrument: &'a InstrumentConfig,
        telescope: &'a TelescopeProperties,
        atmosphere: &'a Atmosphere,
    ) -> Self {
        Self {
            instrument,
            telescope,
            atmosphere,
        }
    }

    /// Detected target photons per second, extincted at the target airmass
    pub fn target_photon_rate(&self, target: &mut dyn Spectrum) -> Result<f64, SpectrumError> {
        let mut grid = target.snapshot()?;
        grid.scale(self.telescope.effective_area_cm2());
        self.atmosphere.apply(&mut grid, self.telescope.airmass())?;
        self.instrument.throughput.apply(&mut grid)?;
        Ok(grid.quantize(CGS::HC_ERG_NM))
    }

    /// Detected sky photons per second per arcsec²; the sky is already extincted
    pub fn sky_photon_rate(&self, sky: &mut dyn Spectrum) -> Result<f64, SpectrumError> {
        let mut grid = sky.snapshot()?;
        grid.scale(self.telescope.effective_area_cm2());
        self.instrument.throughput.apply(&mut grid)?;
        Ok(grid.quantize(CGS::HC_ERG_NM))
    }

    pub fn photon_rates(
        &self,
        target: &mut dyn Spectrum,
        sky: &mut dyn Spectrum,
    ) -> Result<PhotonRates, SpectrumError> {
        Ok(PhotonRates {
            target: self.target_photon_rate(target)?,
            sky: self.sky_photon_rate(sky)?,
        })
    }

    /// Predict photometry for every requested aperture
    pub fn compute(
        &self,
        target: &mut dyn Spectrum,
        sky: &mut dyn Spectrum,
        parameters: &ExposureParameters,
    ) -> Result<Vec<ExposureResult>, SpectrumError> {
        let rates = self.photon_rates(target, sky)?;
        let results = self.photometry(rates, parameters);
        if let Some(best) = results
            .iter()
            .max_by(|a, b| a.combined_snr.total_cmp(&b.combined_snr))
        {
            log::debug!(
                "{} with {}: {:.3e} target e-, {:.1} sky e-/px, best S/N {:.1} at {}×FWHM",
                target.name(),
                self.instrument.name,
                best.total_flux,
                best.sky_level,
                best.combined_snr,
                best.aperture_multiplier
            );
        }
        Ok(results)
    }

    /// Photometry from already propagated photon rates
    pub fn photometry(&self, rates: PhotonRates, parameters: &ExposureParameters) -> Vec<ExposureResult> {
        let detector = &self.instrument.detector;
        let t = parameters.exposure_s;
        let binning = parameters.binning;

        let pixel_solid_angle = detector.binned_pixel_solid_angle(binning);
        let total_flux = rates.target * t;
        let sky_level = rates.sky * t * pixel_solid_angle;
        let dark_counts = detector.binned_dark_counts(t, binning);
        let sky_noise = binned_pixel_noise(sky_level, detector.read_noise_e, dark_counts);

        let fwhm_px = parameters.seeing_fwhm_arcsec / (detector.plate_scale_arcsec * binning as f64);
        let sigma = gaussian_sigma(fwhm_px);
        let peak_level = total_flux / (2.0 * PI * sigma * sigma);
        let saturated = peak_level + sky_level + dark_counts >= detector.full_well_e;

        let surface_brightness_flux = total_flux * pixel_solid_angle;
        let surface_brightness_snr = if sky_noise > 0.0 {
            surface_brightness_flux / sky_noise
        } else {
            0.0
        };

        parameters
            .aperture_multipliers
            .iter()
            .map(|&multiplier| {
                let radius = multiplier * fwhm_px;
                let pixels = PI * radius * radius;
                let aperture_flux = total_flux * enclosed_fraction(radius, sigma);
                let snr = aperture_snr(aperture_flux, pixels, sky_noise);
                ExposureResult {
                    aperture_multiplier: multiplier,
                    aperture_radius_px: radius,
                    pixels_in_aperture: pixels,
                    sky_level,
                    dark_counts,
                    sky_noise,
                    peak_level,
                    total_flux,
                    aperture_flux,
                    snr,
                    combined_snr: combined_snr(snr, parameters.exposures),
                    surface_brightness_flux,
                    surface_brightness_snr,
                    surface_brightness_combined_snr: combined_snr(
                        surface_brightness_snr,
                        parameters.exposures,
                    ),
                    saturated,
                }
            })
            .collect()
    }
}
