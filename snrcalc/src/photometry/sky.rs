//! Night-sky background spectrum
//!
//! The sky is rebuilt on every recompute from the current solar, lunar and
//! telescope parameters as airglow + zodiacal light + moonlight, each a short
//! chain of grid operations. The result is a diffuse spectrum (per arcsec²)
//! as seen from the ground, already extincted.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::algo::grid::Grid;
use crate::conditions::{LunarProperties, SolarProperties};
use crate::hardware::telescope::TelescopeProperties;
use crate::notify::{observer_handle, Change, ChangeNotifier, ChangeObserver};

use super::airglow::airglow_spectrum;
use super::atmosphere::Atmosphere;
use super::moonlight::moonlight_spectrum;
use super::spectrum::{SpectralGrid, Spectrum, SpectrumError};
use super::zodiacal::ZodiacalLight;

/// The three physically distinct parts of the sky background
#[derive(Debug, Clone)]
pub struct SkyComponents {
    pub airglow: Grid,
    pub zodiacal: Grid,
    pub moonlight: Grid,
}

impl SkyComponents {
    /// Sum of the three terms
    pub fn total(&self) -> Result<Grid, SpectrumError> {
        let mut total = self.airglow.clone();
        total.add_grid(&self.zodiacal)?;
        total.add_grid(&self.moonlight)?;
        Ok(total)
    }
}

/// Sky background for the current observing conditions.
///
/// Subscribes to the solar, lunar and telescope parameter objects; any
/// change to them marks the sky stale.
pub struct SkySpectrum {
    storage: SpectralGrid,
    solar: Rc<RefCell<SolarProperties>>,
    lunar: Rc<RefCell<LunarProperties>>,
    telescope: Rc<RefCell<TelescopeProperties>>,
    atmosphere: Atmosphere,
    zodiacal: ZodiacalLight,
}

impl SkySpectrum {
    /// Sky under the Kitt Peak extinction curve
    pub fn new(
        solar: Rc<RefCell<SolarProperties>>,
        lunar: Rc<RefCell<LunarProperties>>,
        telescope: Rc<RefCell<TelescopeProperties>>,
    ) -> Self {
        Self::with_atmosphere(solar, lunar, telescope, Atmosphere::kitt_peak())
    }

    pub fn with_atmosphere(
        solar: Rc<RefCell<SolarProperties>>,
        lunar: Rc<RefCell<LunarProperties>>,
        telescope: Rc<RefCell<TelescopeProperties>>,
        atmosphere: Atmosphere,
    ) -> Self {
        let sky = Self {
            storage: SpectralGrid::new(true),
            solar,
            lunar,
            telescope,
            atmosphere,
            zodiacal: ZodiacalLight::new(),
        };
        let handle = sky.handle();
        sky.for_each_notifier(|notifier| notifier.subscribe(handle.clone()));
        sky
    }

    fn handle(&self) -> Weak<dyn ChangeObserver> {
        observer_handle(self.storage.tracker())
    }

    fn for_each_notifier(&self, mut f: impl FnMut(&ChangeNotifier)) {
        if let Ok(solar) = self.solar.try_borrow() {
            f(solar.notifier());
        }
        if let Ok(lunar) = self.lunar.try_borrow() {
            f(lunar.notifier());
        }
        if let Ok(telescope) = self.telescope.try_borrow() {
            f(telescope.notifier());
        }
    }

    pub fn atmosphere(&self) -> &Atmosphere {
        &self.atmosphere
    }

    pub fn set_atmosphere(&mut self, atmosphere: Atmosphere) {
        self.atmosphere = atmosphere;
        self.storage.tracker().invalidate(Change::Parameter);
    }

    pub fn solar(&self) -> &Rc<RefCell<SolarProperties>> {
        &self.solar
    }

    pub fn lunar(&self) -> &Rc<RefCell<LunarProperties>> {
        &self.lunar
    }

    pub fn telescope(&self) -> &Rc<RefCell<TelescopeProperties>> {
        &self.telescope
    }

    /// Compute airglow, zodiacal light and moonlight separately
    pub fn components(&self) -> Result<SkyComponents, SpectrumError> {
        let airmass = self.telescope.borrow().airmass();
        let solar = self.solar.borrow();
        let lunar = self.lunar.borrow();

        Ok(SkyComponents {
            airglow: airglow_spectrum(&solar, airmass, &self.atmosphere)?,
            zodiacal: self.zodiacal.spectrum(&solar, airmass, &self.atmosphere)?,
            moonlight: moonlight_spectrum(&lunar, airmass, &self.atmosphere)?,
        })
    }
}

impl Drop for SkySpectrum {
    fn drop(&mut self) {
        let handle = self.handle();
        self.for_each_notifier(|notifier| notifier.unsubscribe(&handle));
    }
}

impl Spectrum for SkySpectrum {
    fn name(&self) -> String {
        "night sky".to_string()
    }

    fn spectral_grid(&self) -> &SpectralGrid {
        &self.storage
    }

    fn spectral_grid_mut(&mut self) -> &mut SpectralGrid {
        &mut self.storage
    }

    fn update(&mut self) -> Result<(), SpectrumError> {
        let total = self.components()?.total()?;
        self.storage.grid_mut().assign(&total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::telescope::models::WIYN_3_5M;
    use crate::photometry::magnitude::surface_brightness_flux;
    use crate::units::{Angle, AngleExt};
    use approx::assert_relative_eq;

    fn conditions() -> (
        Rc<RefCell<SolarProperties>>,
        Rc<RefCell<LunarProperties>>,
        Rc<RefCell<TelescopeProperties>>,
    ) {
        (
            Rc::new(RefCell::new(SolarProperties::default())),
            Rc::new(RefCell::new(LunarProperties::default())),
            Rc::new(RefCell::new(TelescopeProperties::new(WIYN_3_5M.clone()))),
        )
    }

    #[test]
    fn test_dark_sky_is_sum_without_moon() {
        let (solar, lunar, telescope) = conditions();
        let mut sky = SkySpectrum::new(solar, lunar, telescope);
        assert!(sky.is_diffuse());

        let parts = sky.components().unwrap();
        assert!(parts.moonlight.values().iter().all(|&v| v == 0.0));

        let expected = parts.airglow.value_at(600.0) + parts.zodiacal.value_at(600.0);
        assert_relative_eq!(sky.flux(600.0).unwrap(), expected, max_relative = 1e-9);
    }

    #[test]
    fn test_dark_sky_brightness_is_plausible() {
        let (solar, lunar, telescope) = conditions();
        let mut sky = SkySpectrum::new(solar, lunar, telescope);
        // Dark sites reach V ≈ 21 to 22.5 mag/arcsec²
        let flux = sky.flux(550.0).unwrap();
        assert!(flux > surface_brightness_flux(22.5), "{flux}");
        assert!(flux < surface_brightness_flux(20.5), "{flux}");
    }

    #[test]
    fn test_moonrise_marks_stale_and_brightens() {
        let (solar, lunar, telescope) = conditions();
        let mut sky = SkySpectrum::new(solar, lunar.clone(), telescope);
        let dark = sky.flux(450.0).unwrap();
        assert!(!sky.tracker().is_stale());

        lunar
            .borrow_mut()
            .set_geometry(
                Angle::from_degrees(30.0),
                Angle::from_degrees(0.0),
                Angle::from_degrees(45.0),
            )
            .unwrap();
        assert!(sky.tracker().is_stale());
        assert!(sky.flux(450.0).unwrap() > 10.0 * dark);
    }

    #[test]
    fn test_airmass_change_propagates() {
        let (solar, lunar, telescope) = conditions();
        let mut sky = SkySpectrum::new(solar.clone(), lunar, telescope.clone());
        sky.ensure_fresh().unwrap();

        telescope.borrow_mut().set_airmass(1.5).unwrap();
        assert!(sky.tracker().is_stale());
        sky.ensure_fresh().unwrap();

        solar.borrow_mut().set_epoch(2014.0).unwrap();
        assert!(sky.tracker().is_stale());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let (solar, lunar, telescope) = conditions();
        {
            let _sky = SkySpectrum::new(solar.clone(), lunar.clone(), telescope.clone());
            assert_eq!(solar.borrow().notifier().observer_count(), 1);
        }
        assert_eq!(solar.borrow().notifier().observer_count(), 0);
        assert_eq!(telescope.borrow().notifier().observer_count(), 0);
    }
}
