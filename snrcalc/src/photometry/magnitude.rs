//! Magnitude systems and magnitude-normalized spectra.
//!
//! A [`MagnitudeSystem`] turns a magnitude into F_λ at a reference
//! wavelength, either against Vega zero points (Johnson-Cousins, Bessell
//! 1998 calibration) or the AB convention (3631 Jy, SDSS ugriz effective
//! wavelengths). A [`NormalizedSpectrum`] rescales any other spectrum so it
//! has the requested magnitude.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::conditions::{require_positive, require_range, ParameterError};
use crate::notify::{observer_handle, Change, ChangeObserver};

use super::spectrum::{f_nu_to_f_lambda, SpectralGrid, SharedSpectrum, Spectrum, SpectrumError, CGS};

/// Half width of the window averaged about the reference wavelength, nm
pub const NORMALIZATION_HALF_WIDTH_NM: f64 = 5.0;

/// Wavelength at which V-band sky surface brightness is pinned, nm
pub const SKY_REFERENCE_NM: f64 = 550.0;

/// F_λ of a V = 0 source at 550 nm, erg s⁻¹ cm⁻² nm⁻¹
pub const V_ZERO_POINT_550: f64 = 3.63e-8;

/// F_λ per arcsec² at 550 nm for a V surface brightness in mag/arcsec²
pub fn surface_brightness_flux(v_mag_per_arcsec2: f64) -> f64 {
    V_ZERO_POINT_550 * 10f64.powf(-0.4 * v_mag_per_arcsec2)
}

/// Zero-point convention of a magnitude system
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MagnitudeConvention {
    /// Magnitude 0 has this F_λ (erg s⁻¹ cm⁻² nm⁻¹) at the reference wavelength
    Vega { zero_point_flux: f64 },
    /// Magnitude 0 is 3631 Jy in F_ν
    AB,
}

/// Reference wavelength plus zero-point convention
#[derive(Debug, Clone, PartialEq)]
pub struct MagnitudeSystem {
    name: String,
    reference_nm: f64,
    convention: MagnitudeConvention,
}

impl MagnitudeSystem {
    /// Vega-relative system with an explicit zero-point F_λ
    pub fn vega(
        name: impl Into<String>,
        reference_nm: f64,
        zero_point_flux: f64,
    ) -> Result<Self, ParameterError> {
        Ok(Self {
            name: name.into(),
            reference_nm: require_positive("reference wavelength", reference_nm)?,
            convention: MagnitudeConvention::Vega {
                zero_point_flux: require_positive("zero-point flux", zero_point_flux)?,
            },
        })
    }

    /// AB system at a reference wavelength
    pub fn ab(name: impl Into<String>, reference_nm: f64) -> Result<Self, ParameterError> {
        Ok(Self {
            name: name.into(),
            reference_nm: require_positive("reference wavelength", reference_nm)?,
            convention: MagnitudeConvention::AB,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference_nm(&self) -> f64 {
        self.reference_nm
    }

    pub fn convention(&self) -> MagnitudeConvention {
        self.convention
    }

    /// F_λ at the reference wavelength implied by a magnitude
    pub fn reference_flux(&self, magnitude: f64) -> f64 {
        let zero_point = match self.convention {
            MagnitudeConvention::Vega { zero_point_flux } => zero_point_flux,
            MagnitudeConvention::AB => {
                f_nu_to_f_lambda(CGS::AB_ZERO_POINT_FLUX_DENSITY, self.reference_nm)
            }
        };
        zero_point * 10f64.powf(-0.4 * magnitude)
    }
}

impl fmt::Display for MagnitudeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let convention = match self.convention {
            MagnitudeConvention::Vega { .. } => "Vega",
            MagnitudeConvention::AB => "AB",
        };
        write!(f, "{} ({convention})", self.name)
    }
}

/// Standard photometric bands with built-in magnitude systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardBand {
    U,
    B,
    V,
    R,
    I,
    SdssU,
    SdssG,
    SdssR,
    SdssI,
    SdssZ,
}

impl StandardBand {
    /// (name, reference wavelength nm, Vega F_λ zero point if Vega-based)
    fn definition(self) -> (&'static str, f64, Option<f64>) {
        match self {
            StandardBand::U => ("U", 366.0, Some(4.175e-8)),
            StandardBand::B => ("B", 438.0, Some(6.32e-8)),
            StandardBand::V => ("V", 545.0, Some(3.631e-8)),
            StandardBand::R => ("R", 641.0, Some(2.177e-8)),
            StandardBand::I => ("I", 798.0, Some(1.126e-8)),
            StandardBand::SdssU => ("u'", 355.1, None),
            StandardBand::SdssG => ("g'", 468.6, None),
            StandardBand::SdssR => ("r'", 616.5, None),
            StandardBand::SdssI => ("i'", 748.1, None),
            StandardBand::SdssZ => ("z'", 893.1, None),
        }
    }

    pub fn system(self) -> MagnitudeSystem {
        let (name, reference_nm, zero_point) = self.definition();
        let convention = match zero_point {
            Some(zero_point_flux) => MagnitudeConvention::Vega { zero_point_flux },
            None => MagnitudeConvention::AB,
        };
        MagnitudeSystem {
            name: name.to_string(),
            reference_nm,
            convention,
        }
    }
}

/// Cached normalization factor, cleared whenever the wrapped spectrum changes
#[derive(Debug, Default)]
struct FactorCache {
    factor: Cell<Option<f64>>,
}

impl ChangeObserver for FactorCache {
    fn notify(&self, _change: Change) {
        self.factor.set(None);
    }
}

/// Decorator that rescales another spectrum to a given magnitude.
///
/// The factor is (flux implied by the magnitude at the reference wavelength)
/// / (wrapped flux averaged over ±5 nm about it). It is computed once and
/// kept until the wrapped spectrum, the magnitude or the system changes.
pub struct NormalizedSpectrum {
    storage: SpectralGrid,
    inner: SharedSpectrum,
    magnitude: f64,
    system: Option<MagnitudeSystem>,
    cache: Rc<FactorCache>,
    subscriptions: [Weak<dyn ChangeObserver>; 2],
}

impl NormalizedSpectrum {
    /// Wrap `inner` so it has `magnitude` in `system`
    pub fn new(
        inner: SharedSpectrum,
        magnitude: f64,
        system: MagnitudeSystem,
    ) -> Result<Self, ParameterError> {
        let mut spectrum = Self::unnormalized(inner)?;
        spectrum.magnitude = require_range("magnitude", magnitude, -50.0, 100.0)?;
        spectrum.system = Some(system);
        Ok(spectrum)
    }

    /// Wrap `inner` without a magnitude system; reads fail until one is set
    pub fn unnormalized(inner: SharedSpectrum) -> Result<Self, ParameterError> {
        let diffuse = inner.borrow().is_diffuse();
        let storage = SpectralGrid::new(diffuse);
        let cache = Rc::new(FactorCache::default());
        let subscriptions = [
            observer_handle(storage.tracker()),
            observer_handle(&cache),
        ];
        {
            let inner_ref = inner.borrow();
            for handle in &subscriptions {
                inner_ref.tracker().subscribe(handle.clone());
            }
        }
        Ok(Self {
            storage,
            inner,
            magnitude: 0.0,
            system: None,
            cache,
            subscriptions,
        })
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn system(&self) -> Option<&MagnitudeSystem> {
        self.system.as_ref()
    }

    pub fn inner(&self) -> &SharedSpectrum {
        &self.inner
    }

    pub fn set_magnitude(&mut self, magnitude: f64) -> Result<(), ParameterError> {
        self.magnitude = require_range("magnitude", magnitude, -50.0, 100.0)?;
        self.parameters_changed();
        Ok(())
    }

    pub fn set_system(&mut self, system: MagnitudeSystem) {
        self.system = Some(system);
        self.parameters_changed();
    }

    fn parameters_changed(&self) {
        self.cache.factor.set(None);
        self.storage.tracker().invalidate(Change::Parameter);
    }

    /// The multiplier applied to the wrapped spectrum
    pub fn normalization_factor(&mut self) -> Result<f64, SpectrumError> {
        if let Some(factor) = self.cache.factor.get() {
            return Ok(factor);
        }

        let system = self
            .system
            .as_ref()
            .ok_or(ParameterError::UndefinedMagnitudeSystem)?;
        let reference_nm = system.reference_nm();
        let target = system.reference_flux(self.magnitude);

        let measured = {
            let mut inner = self.inner.borrow_mut();
            window_average(&mut *inner, reference_nm)?
        };
        if measured == 0.0 || !measured.is_finite() {
            return Err(ParameterError::ZeroReferenceFlux {
                wavelength_nm: reference_nm,
            }
            .into());
        }

        let factor = target / measured;
        self.cache.factor.set(Some(factor));
        Ok(factor)
    }
}

/// Mean flux sampled every 0.25 nm across ±5 nm about `center_nm`
fn window_average(spectrum: &mut dyn Spectrum, center_nm: f64) -> Result<f64, SpectrumError> {
    const SAMPLES: usize = 41;
    let step = 2.0 * NORMALIZATION_HALF_WIDTH_NM / (SAMPLES - 1) as f64;
    let mut total = 0.0;
    for i in 0..SAMPLES {
        let wavelength = center_nm - NORMALIZATION_HALF_WIDTH_NM + i as f64 * step;
        total += spectrum.flux(wavelength)?;
    }
    Ok(total / SAMPLES as f64)
}

impl Drop for NormalizedSpectrum {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.try_borrow() {
            for handle in &self.subscriptions {
                inner.tracker().unsubscribe(handle);
            }
        }
    }
}

impl Spectrum for NormalizedSpectrum {
    fn name(&self) -> String {
        let inner = self
            .inner
            .try_borrow()
            .map(|s| s.name())
            .unwrap_or_else(|_| "spectrum".to_string());
        match &self.system {
            Some(system) => format!("{inner} at {} mag {system}", self.magnitude),
            None => format!("{inner} (unnormalized)"),
        }
    }

    fn spectral_grid(&self) -> &SpectralGrid {
        &self.storage
    }

    fn spectral_grid_mut(&mut self) -> &mut SpectralGrid {
        &mut self.storage
    }

    fn update(&mut self) -> Result<(), SpectrumError> {
        let factor = self.normalization_factor()?;
        let mut grid = self.inner.borrow_mut().snapshot()?;
        grid.scale(factor);
        self.storage.grid_mut().assign(&grid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::spectrum::shared;
    use crate::photometry::stellar::{FlatSpectrum, PowerLawSpectrum};
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_systems() {
        let v = StandardBand::V.system();
        assert_eq!(v.reference_nm(), 545.0);
        assert_relative_eq!(v.reference_flux(0.0), 3.631e-8);
        assert_relative_eq!(v.reference_flux(5.0), 3.631e-10, max_relative = 1e-12);

        let r = StandardBand::SdssR.system();
        assert_eq!(r.convention(), MagnitudeConvention::AB);
        assert_relative_eq!(r.reference_flux(0.0), 2.864e-8, max_relative = 1e-3);
        assert_eq!(format!("{r}"), "r' (AB)");
    }

    #[test]
    fn test_surface_brightness_flux() {
        assert_relative_eq!(surface_brightness_flux(0.0), V_ZERO_POINT_550);
        assert_relative_eq!(surface_brightness_flux(22.5), 3.63e-17, max_relative = 1e-12);
    }

    #[test]
    fn test_custom_system_validation() {
        assert!(MagnitudeSystem::vega("bad", 0.0, 1e-8).is_err());
        assert!(MagnitudeSystem::vega("bad", 500.0, 0.0).is_err());
        assert!(MagnitudeSystem::ab("Hα", 656.3).is_ok());
    }

    #[test]
    fn test_normalizes_flat_spectrum() {
        let flat = shared(FlatSpectrum::new(1.0).unwrap());
        let mut normalized =
            NormalizedSpectrum::new(flat.clone(), 0.0, StandardBand::V.system()).unwrap();

        assert_relative_eq!(normalized.flux(545.0).unwrap(), 3.631e-8, max_relative = 1e-9);
        assert_relative_eq!(normalized.flux(800.0).unwrap(), 3.631e-8, max_relative = 1e-9);

        normalized.set_magnitude(2.5).unwrap();
        assert_relative_eq!(normalized.flux(545.0).unwrap(), 3.631e-9, max_relative = 1e-9);
    }

    #[test]
    fn test_wrapped_change_invalidates_factor() {
        let flat = shared(FlatSpectrum::new(1.0).unwrap());
        let mut normalized =
            NormalizedSpectrum::new(flat.clone(), 0.0, StandardBand::V.system()).unwrap();
        let first = normalized.normalization_factor().unwrap();
        normalized.ensure_fresh().unwrap();

        flat.borrow_mut().set_level(4.0).unwrap();
        assert!(normalized.tracker().is_stale());

        // Shape unchanged, so the normalized flux is too; the factor moved
        assert_relative_eq!(normalized.flux(545.0).unwrap(), 3.631e-8, max_relative = 1e-9);
        assert_relative_eq!(normalized.normalization_factor().unwrap(), first / 4.0, max_relative = 1e-12);
    }

    #[test]
    fn test_shape_preserved() {
        let slope = shared(PowerLawSpectrum::with_pivot(-2.0, 1.0, 545.0).unwrap());
        let mut normalized =
            NormalizedSpectrum::new(slope, 10.0, StandardBand::V.system()).unwrap();
        let ratio = normalized.flux(400.0).unwrap() / normalized.flux(800.0).unwrap();
        assert_relative_eq!(ratio, 4.0, max_relative = 1e-6);
    }

    #[test]
    fn test_undefined_system_fails() {
        let flat = shared(FlatSpectrum::new(1.0).unwrap());
        let mut normalized = NormalizedSpectrum::unnormalized(flat).unwrap();
        assert!(matches!(
            normalized.flux(545.0),
            Err(SpectrumError::Parameter(ParameterError::UndefinedMagnitudeSystem))
        ));

        normalized.set_system(StandardBand::B.system());
        assert!(normalized.flux(438.0).is_ok());
    }

    #[test]
    fn test_zero_reference_flux_fails() {
        let dark = shared(FlatSpectrum::new(0.0).unwrap());
        let mut normalized = NormalizedSpectrum::new(dark, 0.0, StandardBand::V.system()).unwrap();
        assert!(matches!(
            normalized.flux(545.0),
            Err(SpectrumError::Parameter(ParameterError::ZeroReferenceFlux { .. }))
        ));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let flat = shared(FlatSpectrum::new(1.0).unwrap());
        {
            let _normalized =
                NormalizedSpectrum::new(flat.clone(), 0.0, StandardBand::V.system()).unwrap();
            assert_eq!(flat.borrow().tracker().observer_count(), 2);
        }
        assert_eq!(flat.borrow().tracker().observer_count(), 0);
    }
}
