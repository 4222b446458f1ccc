//! Observing-condition parameter objects.
//!
//! The sky model reads the Sun-relative position of the target, the
//! observation epoch and the Moon's geometry from these objects and
//! subscribes to their change notifications. Every setter validates before
//! assigning; a rejected value leaves the object exactly as it was.

use std::f64::consts::PI;

use thiserror::Error;

use crate::notify::{Change, ChangeNotifier};
use crate::units::{Angle, AngleExt};

/// Invalid-parameter errors, raised at the point of assignment or use
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("{name} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("Magnitude system is undefined")]
    UndefinedMagnitudeSystem,

    #[error("Reference flux at {wavelength_nm} nm is zero, cannot normalize")]
    ZeroReferenceFlux { wavelength_nm: f64 },

    #[error("Redshift must be greater than -1, got {0}")]
    InvalidRedshift(f64),
}

/// Check that `value` lies in the closed interval `[min, max]`
pub fn require_range(
    name: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ParameterError> {
    if !value.is_finite() {
        return Err(ParameterError::NotFinite { name, value });
    }
    if value < min || value > max {
        return Err(ParameterError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

/// Check that `value` is finite and strictly positive
pub fn require_positive(name: &'static str, value: f64) -> Result<f64, ParameterError> {
    if !value.is_finite() {
        return Err(ParameterError::NotFinite { name, value });
    }
    if value <= 0.0 {
        return Err(ParameterError::NotPositive { name, value });
    }
    Ok(value)
}

/// Check an angle against a closed interval in degrees.
///
/// Allows for round-off from the degree/radian conversion at the bounds.
pub fn require_degrees(
    name: &'static str,
    angle: Angle,
    min: f64,
    max: f64,
) -> Result<(), ParameterError> {
    const SLACK: f64 = 1e-9;
    let value = angle.as_degrees();
    if !value.is_finite() {
        return Err(ParameterError::NotFinite { name, value });
    }
    if value < min - SLACK || value > max + SLACK {
        return Err(ParameterError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Airmass for a zenith distance, X = (1 - 0.96 sin²Z)^-½ (Krisciunas & Schaefer 1991).
///
/// Stays finite at the horizon (X = 5 at Z = 90°).
pub fn airmass_from_zenith_distance(zenith_distance: Angle) -> f64 {
    let s = zenith_distance.as_radians().sin();
    1.0 / (1.0 - 0.96 * s * s).sqrt()
}

/// Target position relative to the Sun, and the observation epoch
#[derive(Debug)]
pub struct SolarProperties {
    elongation: Angle,
    ecliptic_latitude: Angle,
    epoch: f64,
    notifier: ChangeNotifier,
}

impl Default for SolarProperties {
    fn default() -> Self {
        Self {
            elongation: Angle::from_degrees(180.0),
            ecliptic_latitude: Angle::from_degrees(60.0),
            epoch: 2010.5,
            notifier: ChangeNotifier::new(),
        }
    }
}

impl SolarProperties {
    /// Create validated solar properties
    ///
    /// # Arguments
    /// * `elongation` - Sun-target angular separation, 0° to 180°
    /// * `ecliptic_latitude` - Target ecliptic latitude, -90° to 90°
    /// * `epoch` - Observation date as a decimal year
    pub fn new(
        elongation: Angle,
        ecliptic_latitude: Angle,
        epoch: f64,
    ) -> Result<Self, ParameterError> {
        let mut properties = Self::default();
        properties.set_position(elongation, ecliptic_latitude)?;
        properties.set_epoch(epoch)?;
        Ok(properties)
    }

    pub fn elongation(&self) -> Angle {
        self.elongation
    }

    pub fn ecliptic_latitude(&self) -> Angle {
        self.ecliptic_latitude
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn set_elongation(&mut self, elongation: Angle) -> Result<(), ParameterError> {
        require_degrees("solar elongation", elongation, 0.0, 180.0)?;
        self.elongation = elongation;
        self.notifier.notify(Change::Parameter);
        Ok(())
    }

    pub fn set_ecliptic_latitude(&mut self, latitude: Angle) -> Result<(), ParameterError> {
        require_degrees("ecliptic latitude", latitude, -90.0, 90.0)?;
        self.ecliptic_latitude = latitude;
        self.notifier.notify(Change::Parameter);
        Ok(())
    }

    /// Set elongation and latitude together; neither changes if either is invalid
    pub fn set_position(&mut self, elongation: Angle, latitude: Angle) -> Result<(), ParameterError> {
        require_degrees("solar elongation", elongation, 0.0, 180.0)?;
        require_degrees("ecliptic latitude", latitude, -90.0, 90.0)?;
        self.elongation = elongation;
        self.ecliptic_latitude = latitude;
        self.notifier.notify(Change::Parameter);
        Ok(())
    }

    pub fn set_epoch(&mut self, epoch: f64) -> Result<(), ParameterError> {
        require_range("epoch", epoch, 1900.0, 2200.0)?;
        self.epoch = epoch;
        self.notifier.notify(Change::Parameter);
        Ok(())
    }

    /// Predicted 10.7 cm solar radio flux in solar flux units.
    ///
    /// Sinusoidal 11.1 year cycle with maximum at 2001.8, ranging 70 to 220 sfu.
    pub fn solar_flux_10cm(&self) -> f64 {
        145.0 + 75.0 * (2.0 * PI * (self.epoch - 2001.8) / 11.1).cos()
    }
}

/// Moon geometry relative to the observer and target
#[derive(Debug)]
pub struct LunarProperties {
    zenith_distance: Angle,
    phase: Angle,
    elongation: Angle,
    notifier: ChangeNotifier,
}

impl Default for LunarProperties {
    /// New moon, well below the horizon
    fn default() -> Self {
        Self {
            zenith_distance: Angle::from_degrees(120.0),
            phase: Angle::from_degrees(180.0),
            elongation: Angle::from_degrees(90.0),
            notifier: ChangeNotifier::new(),
        }
    }
}

impl LunarProperties {
    /// Create validated lunar properties
    ///
    /// # Arguments
    /// * `zenith_distance` - Moon zenith distance, 0° to 180° (≥ 90° is below the horizon)
    /// * `phase` - Lunar phase angle, 0° (full) to 180° (new)
    /// * `elongation` - Moon-target angular separation, 0° to 180°
    pub fn new(zenith_distance: Angle, phase: Angle, elongation: Angle) -> Result<Self, ParameterError> {
        let mut properties = Self::default();
        properties.set_geometry(zenith_distance, phase, elongation)?;
        Ok(properties)
    }

    pub fn zenith_distance(&self) -> Angle {
        self.zenith_distance
    }

    pub fn phase(&self) -> Angle {
        self.phase
    }

    pub fn elongation(&self) -> Angle {
        self.elongation
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn is_above_horizon(&self) -> bool {
        self.zenith_distance.as_degrees() < 90.0
    }

    /// Airmass toward the Moon, `None` when it has set
    pub fn airmass(&self) -> Option<f64> {
        self.is_above_horizon()
            .then(|| airmass_from_zenith_distance(self.zenith_distance))
    }

    pub fn set_zenith_distance(&mut self, zenith_distance: Angle) -> Result<(), ParameterError> {
        require_degrees("moon zenith distance", zenith_distance, 0.0, 180.0)?;
        self.zenith_distance = zenith_distance;
        self.notifier.notify(Change::Parameter);
        Ok(())
    }

    pub fn set_phase(&mut self, phase: Angle) -> Result<(), ParameterError> {
        require_degrees("lunar phase", phase, 0.0, 180.0)?;
        self.phase = phase;
        self.notifier.notify(Change::Parameter);
        Ok(())
    }

    pub fn set_elongation(&mut self, elongation: Angle) -> Result<(), ParameterError> {
        require_degrees("lunar elongation", elongation, 0.0, 180.0)?;
        self.elongation = elongation;
        self.notifier.notify(Change::Parameter);
        Ok(())
    }

    /// Set all three angles; nothing changes if any is invalid
    pub fn set_geometry(
        &mut self,
        zenith_distance: Angle,
        phase: Angle,
        elongation: Angle,
    ) -> Result<(), ParameterError> {
        require_degrees("moon zenith distance", zenith_distance, 0.0, 180.0)?;
        require_degrees("lunar phase", phase, 0.0, 180.0)?;
        require_degrees("lunar elongation", elongation, 0.0, 180.0)?;
        self.zenith_distance = zenith_distance;
        self.phase = phase;
        self.elongation = elongation;
        self.notifier.notify(Change::Parameter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{observer_handle, Tracker};
    use approx::assert_relative_eq;
    use std::rc::Rc;

    #[test]
    fn test_airmass_relation() {
        assert_relative_eq!(airmass_from_zenith_distance(Angle::from_degrees(0.0)), 1.0);
        // sec(60°) = 2; the K&S form is slightly lower
        let x60 = airmass_from_zenith_distance(Angle::from_degrees(60.0));
        assert_relative_eq!(x60, 1.0 / (1.0 - 0.72f64).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(airmass_from_zenith_distance(Angle::from_degrees(90.0)), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_solar_cycle_flux() {
        let mut solar = SolarProperties::default();
        solar.set_epoch(2001.8).unwrap();
        assert_relative_eq!(solar.solar_flux_10cm(), 220.0, epsilon = 1e-9);
        solar.set_epoch(2001.8 + 5.55).unwrap();
        assert_relative_eq!(solar.solar_flux_10cm(), 70.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejected_value_leaves_state_untouched() {
        let mut lunar = LunarProperties::new(
            Angle::from_degrees(40.0),
            Angle::from_degrees(60.0),
            Angle::from_degrees(30.0),
        )
        .unwrap();

        let err = lunar
            .set_geometry(
                Angle::from_degrees(50.0),
                Angle::from_degrees(70.0),
                Angle::from_degrees(200.0),
            )
            .unwrap_err();
        assert!(matches!(err, ParameterError::OutOfRange { name: "lunar elongation", .. }));

        assert_relative_eq!(lunar.zenith_distance().as_degrees(), 40.0, epsilon = 1e-9);
        assert_relative_eq!(lunar.phase().as_degrees(), 60.0, epsilon = 1e-9);
        assert_relative_eq!(lunar.elongation().as_degrees(), 30.0, epsilon = 1e-9);

        assert!(lunar.set_zenith_distance(Angle::from_degrees(-1.0)).is_err());
        assert!(lunar.set_phase(Angle::from_degrees(f64::NAN)).is_err());
        assert_relative_eq!(lunar.zenith_distance().as_degrees(), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_solar_validation() {
        assert!(SolarProperties::new(
            Angle::from_degrees(190.0),
            Angle::from_degrees(0.0),
            2010.0
        )
        .is_err());
        assert!(SolarProperties::new(
            Angle::from_degrees(90.0),
            Angle::from_degrees(-91.0),
            2010.0
        )
        .is_err());

        let mut solar = SolarProperties::default();
        assert!(solar
            .set_position(Angle::from_degrees(100.0), Angle::from_degrees(95.0))
            .is_err());
        assert_relative_eq!(solar.elongation().as_degrees(), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_moon_horizon() {
        let mut lunar = LunarProperties::default();
        assert!(!lunar.is_above_horizon());
        assert_eq!(lunar.airmass(), None);

        lunar.set_zenith_distance(Angle::from_degrees(0.0)).unwrap();
        assert!(lunar.is_above_horizon());
        assert_relative_eq!(lunar.airmass().unwrap(), 1.0);
    }

    #[test]
    fn test_setters_notify_subscribers() {
        let mut lunar = LunarProperties::default();
        let tracker = Rc::new(Tracker::new());
        lunar.notifier().subscribe(observer_handle(&tracker));

        tracker.mark_fresh();
        lunar.set_phase(Angle::from_degrees(90.0)).unwrap();
        assert!(tracker.is_stale());

        tracker.mark_fresh();
        assert!(lunar.set_phase(Angle::from_degrees(-5.0)).is_err());
        assert!(!tracker.is_stale());
    }
}
