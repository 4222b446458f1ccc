//! Telescope light collection and pointing parameters.
//!
//! A [`TelescopeConfig`] is the fixed description of the optics (aperture and
//! central obscuration). [`TelescopeProperties`] pairs it with the one
//! parameter that changes between calculations, the target airmass, and
//! notifies subscribers whenever either changes.
//!
//! # Light Collection
//! - **Collecting area**: A = π(D/2)²
//! - **Effective area**: A·(1 - ε²), with ε the linear obscuration ratio

use std::f64::consts::PI;

use once_cell::sync::Lazy;

use crate::conditions::{airmass_from_zenith_distance, require_degrees, require_range, ParameterError};
use crate::notify::{Change, ChangeNotifier};
use crate::units::{Angle, Length, LengthExt};

/// Largest target airmass accepted
pub const MAX_AIRMASS: f64 = 10.0;

/// Fixed optical description of a telescope
#[derive(Debug, Clone, PartialEq)]
pub struct TelescopeConfig {
    /// Telescope model name or identifier
    pub name: String,
    /// Primary mirror diameter (clear aperture)
    pub aperture: Length,
    /// Secondary obstruction diameter as a fraction of the aperture (0.0-1.0)
    pub obscuration: f64,
}

impl TelescopeConfig {
    /// Create a validated telescope configuration
    pub fn new(
        name: impl Into<String>,
        aperture: Length,
        obscuration: f64,
    ) -> Result<Self, ParameterError> {
        require_range("telescope aperture", aperture.as_meters(), f64::MIN_POSITIVE, 100.0)?;
        require_range("central obscuration", obscuration, 0.0, 0.99)?;
        Ok(Self {
            name: name.into(),
            aperture,
            obscuration,
        })
    }

    /// Calculate the unobstructed collecting area in square centimetres
    pub fn collecting_area_cm2(&self) -> f64 {
        PI * (self.aperture.as_centimeters() / 2.0).powi(2)
    }

    /// Collecting area less the central obstruction, in square centimetres
    pub fn effective_area_cm2(&self) -> f64 {
        self.collecting_area_cm2() * (1.0 - self.obscuration * self.obscuration)
    }
}

/// Telescope optics plus the current target airmass
#[derive(Debug)]
pub struct TelescopeProperties {
    config: TelescopeConfig,
    airmass: f64,
    notifier: ChangeNotifier,
}

impl TelescopeProperties {
    /// Point at the zenith with the given optics
    pub fn new(config: TelescopeConfig) -> Self {
        Self {
            config,
            airmass: 1.0,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn config(&self) -> &TelescopeConfig {
        &self.config
    }

    pub fn airmass(&self) -> f64 {
        self.airmass
    }

    pub fn effective_area_cm2(&self) -> f64 {
        self.config.effective_area_cm2()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Set the target airmass, 1 (zenith) to [`MAX_AIRMASS`]
    pub fn set_airmass(&mut self, airmass: f64) -> Result<(), ParameterError> {
        require_range("airmass", airmass, 1.0, MAX_AIRMASS)?;
        self.airmass = airmass;
        self.notifier.notify(Change::Parameter);
        Ok(())
    }

    /// Set the airmass from a target zenith distance below 90°
    pub fn set_zenith_distance(&mut self, zenith_distance: Angle) -> Result<(), ParameterError> {
        require_degrees("target zenith distance", zenith_distance, 0.0, 89.999)?;
        self.set_airmass(airmass_from_zenith_distance(zenith_distance))
    }

    pub fn set_config(&mut self, config: TelescopeConfig) {
        self.config = config;
        self.notifier.notify(Change::Parameter);
    }
}

/// Standard telescope models
pub mod models {
    use super::*;

    /// WIYN 3.5m at Kitt Peak
    pub static WIYN_3_5M: Lazy<TelescopeConfig> = Lazy::new(|| TelescopeConfig {
        name: "WIYN 3.5m".to_string(),
        aperture: Length::from_meters(3.5),
        obscuration: 0.33,
    });

    /// KPNO 2.1m
    pub static KPNO_2_1M: Lazy<TelescopeConfig> = Lazy::new(|| TelescopeConfig {
        name: "KPNO 2.1m".to_string(),
        aperture: Length::from_meters(2.1),
        obscuration: 0.37,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{observer_handle, Tracker};
    use crate::units::AngleExt;
    use approx::assert_relative_eq;
    use std::rc::Rc;

    #[test]
    fn test_collecting_area() {
        let telescope = TelescopeConfig::new("1m", Length::from_meters(1.0), 0.0).unwrap();
        assert_relative_eq!(telescope.collecting_area_cm2(), PI * 50.0 * 50.0, epsilon = 1e-6);
        assert_relative_eq!(telescope.effective_area_cm2(), telescope.collecting_area_cm2());

        let obstructed = TelescopeConfig::new("1m", Length::from_meters(1.0), 0.5).unwrap();
        assert_relative_eq!(
            obstructed.effective_area_cm2(),
            0.75 * telescope.collecting_area_cm2(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(TelescopeConfig::new("bad", Length::from_meters(0.0), 0.1).is_err());
        assert!(TelescopeConfig::new("bad", Length::from_meters(1.0), 1.0).is_err());
        assert!(TelescopeConfig::new("bad", Length::from_meters(1.0), -0.1).is_err());
    }

    #[test]
    fn test_airmass_validation_and_notification() {
        let mut telescope = TelescopeProperties::new(models::WIYN_3_5M.clone());
        let tracker = Rc::new(Tracker::new());
        telescope.notifier().subscribe(observer_handle(&tracker));
        tracker.mark_fresh();

        assert!(telescope.set_airmass(0.9).is_err());
        assert!(!tracker.is_stale());
        assert_eq!(telescope.airmass(), 1.0);

        telescope.set_airmass(1.5).unwrap();
        assert!(tracker.is_stale());
        assert_eq!(telescope.airmass(), 1.5);

        telescope
            .set_zenith_distance(Angle::from_degrees(0.0))
            .unwrap();
        assert_relative_eq!(telescope.airmass(), 1.0);
        assert!(telescope
            .set_zenith_distance(Angle::from_degrees(95.0))
            .is_err());
    }

    #[test]
    fn test_predefined_telescopes() {
        assert_eq!(models::WIYN_3_5M.name, "WIYN 3.5m");
        assert_relative_eq!(models::WIYN_3_5M.aperture.as_meters(), 3.5, epsilon = 1e-12);
        // ~8.7 m² after the secondary
        assert_relative_eq!(
            models::WIYN_3_5M.effective_area_cm2(),
            PI * 175.0 * 175.0 * (1.0 - 0.33 * 0.33),
            max_relative = 1e-9
        );
        assert!(models::KPNO_2_1M.effective_area_cm2() < models::WIYN_3_5M.effective_area_cm2());
    }
}
