//! Type-safe physical units for exposure calculations
//!
//! Quantities that cross module boundaries (sky geometry angles, telescope
//! apertures, blackbody temperatures, exposure times) are carried as `uom`
//! quantities so degrees never meet radians by accident. Spectral arrays stay
//! plain `f64` in nanometres and CGS flux units.

use uom::si::angle::{degree, radian, second as arcsecond};
use uom::si::length::{centimeter, meter, nanometer};
use uom::si::thermodynamic_temperature::kelvin;
use uom::si::time::second;

/// Angle quantity (stored in radians)
pub type Angle = uom::si::f64::Angle;

/// Length quantity (stored in metres)
pub type Length = uom::si::f64::Length;

/// Absolute temperature
pub type Temperature = uom::si::f64::ThermodynamicTemperature;

/// Time quantity (stored in seconds)
pub type Time = uom::si::f64::Time;

/// Extension trait for sky and detector angles
pub trait AngleExt {
    fn from_degrees(deg: f64) -> Self;

    fn as_degrees(&self) -> f64;

    fn from_radians(rad: f64) -> Self;

    fn as_radians(&self) -> f64;

    /// Create angle from arcseconds (plate scales, seeing)
    fn from_arcseconds(arcsec: f64) -> Self;

    fn as_arcseconds(&self) -> f64;
}

/// Extension trait for the length scales used here
pub trait LengthExt {
    /// Create length from nanometers (wavelengths)
    fn from_nanometers(nm: f64) -> Self;

    fn as_nanometers(&self) -> f64;

    /// Create length from centimeters (CGS areas)
    fn from_centimeters(cm: f64) -> Self;

    fn as_centimeters(&self) -> f64;

    /// Create length from meters (telescope apertures)
    fn from_meters(m: f64) -> Self;

    fn as_meters(&self) -> f64;
}

/// Extension trait for blackbody temperatures
pub trait TemperatureExt {
    fn from_kelvin(kelvin: f64) -> Self;

    fn as_kelvin(&self) -> f64;
}

/// Extension trait for exposure durations
pub trait TimeExt {
    fn from_seconds(s: f64) -> Self;

    fn as_seconds(&self) -> f64;
}

impl AngleExt for Angle {
    fn from_degrees(deg: f64) -> Self {
        Angle::new::<degree>(deg)
    }

    fn as_degrees(&self) -> f64 {
        self.get::<degree>()
    }

    fn from_radians(rad: f64) -> Self {
        Angle::new::<radian>(rad)
    }

    fn as_radians(&self) -> f64 {
        self.get::<radian>()
    }

    fn from_arcseconds(arcsec: f64) -> Self {
        Angle::new::<arcsecond>(arcsec)
    }

    fn as_arcseconds(&self) -> f64 {
        self.get::<arcsecond>()
    }
}

impl LengthExt for Length {
    fn from_nanometers(nm: f64) -> Self {
        Length::new::<nanometer>(nm)
    }

    fn as_nanometers(&self) -> f64 {
        self.get::<nanometer>()
    }

    fn from_centimeters(cm: f64) -> Self {
        Length::new::<centimeter>(cm)
    }

    fn as_centimeters(&self) -> f64 {
        self.get::<centimeter>()
    }

    fn from_meters(m: f64) -> Self {
        Length::new::<meter>(m)
    }

    fn as_meters(&self) -> f64 {
        self.get::<meter>()
    }
}

impl TemperatureExt for Temperature {
    fn from_kelvin(k: f64) -> Self {
        Temperature::new::<kelvin>(k)
    }

    fn as_kelvin(&self) -> f64 {
        self.get::<kelvin>()
    }
}

impl TimeExt for Time {
    fn from_seconds(s: f64) -> Self {
        Time::new::<second>(s)
    }

    fn as_seconds(&self) -> f64 {
        self.get::<second>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_angle_conversions() {
        let right = Angle::from_degrees(90.0);
        assert_relative_eq!(right.as_radians(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);

        let arcsec = Angle::from_arcseconds(3600.0);
        assert_relative_eq!(arcsec.as_degrees(), 1.0, epsilon = 1e-12);

        let rad = Angle::from_radians(std::f64::consts::PI);
        assert_relative_eq!(rad.as_degrees(), 180.0, epsilon = 1e-10);
    }

    #[test]
    fn test_length_conversions() {
        let aperture = Length::from_meters(3.5);
        assert_relative_eq!(aperture.as_centimeters(), 350.0, epsilon = 1e-10);

        let wavelength = Length::from_nanometers(550.0);
        assert_relative_eq!(wavelength.as_centimeters(), 5.5e-5, epsilon = 1e-15);
        assert_relative_eq!(wavelength.as_nanometers(), 550.0, epsilon = 1e-9);
    }

    #[test]
    fn test_temperature_and_time() {
        assert_relative_eq!(Temperature::from_kelvin(5778.0).as_kelvin(), 5778.0);
        assert_relative_eq!(Time::from_seconds(300.0).as_seconds(), 300.0);
    }
}
