//! Night-sky airglow
//!
//! Emission from the upper atmosphere: a continuum plus a handful of strong
//! atomic lines. The embedded data describe the zenith sky at average solar
//! activity. The model scales them with the solar cycle, takes them back
//! above the atmosphere, brightens them by the van Rhijn factor (≈ X for
//! the thin emitting layer) and extincts them again at the target airmass.

use crate::algo::grid::{Grid, GridGeometry};
use crate::conditions::SolarProperties;
use crate::io::table::Table;

use super::atmosphere::Atmosphere;
use super::emission_line::GaussianLine;
use super::spectrum::{wavelength_to_ergs, SpectrumError};

/// Zenith continuum, (nm, 10⁻¹⁷ erg s⁻¹ cm⁻² nm⁻¹ arcsec⁻²)
const CONTINUUM: [(f64, f64); 17] = [
    (300.0, 1.0),
    (350.0, 2.0),
    (400.0, 3.0),
    (450.0, 4.0),
    (500.0, 4.5),
    (550.0, 5.0),
    (600.0, 6.0),
    (650.0, 8.0),
    (700.0, 12.0),
    (750.0, 20.0),
    (800.0, 30.0),
    (850.0, 40.0),
    (900.0, 55.0),
    (950.0, 60.0),
    (1000.0, 70.0),
    (1050.0, 80.0),
    (1100.0, 90.0),
];

const CONTINUUM_UNIT: f64 = 1e-17;

/// Photon rate of one Rayleigh, photons s⁻¹ cm⁻² arcsec⁻²
pub const RAYLEIGH_PHOTON_RATE: f64 = 1.8704e-6;

/// 10.7 cm solar flux the zenith data correspond to, solar flux units
pub const REFERENCE_SOLAR_FLUX: f64 = 145.0;

/// Width given to the unresolved sky lines, nm
const LINE_FWHM_NM: f64 = 0.5;

/// An airglow emission line and its zenith intensity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirglowLine {
    pub center_nm: f64,
    pub rayleighs: f64,
}

impl AirglowLine {
    /// Integrated line flux, erg s⁻¹ cm⁻² arcsec⁻²
    pub fn energy_flux(&self) -> f64 {
        self.rayleighs * RAYLEIGH_PHOTON_RATE * wavelength_to_ergs(self.center_nm)
    }
}

/// Strongest night-sky lines: [O I] 557.7, Na D, [O I] 630.0 and 636.4
pub const AIRGLOW_LINES: [AirglowLine; 4] = [
    AirglowLine {
        center_nm: 557.7,
        rayleighs: 250.0,
    },
    AirglowLine {
        center_nm: 589.3,
        rayleighs: 50.0,
    },
    AirglowLine {
        center_nm: 630.0,
        rayleighs: 100.0,
    },
    AirglowLine {
        center_nm: 636.4,
        rayleighs: 33.0,
    },
];

/// Brightness relative to average solar activity.
///
/// Airglow follows the 10.7 cm flux roughly linearly, about a factor of two
/// between solar minimum and maximum.
pub fn solar_cycle_factor(solar_flux_10cm: f64) -> f64 {
    (0.4 + 0.6 * solar_flux_10cm / REFERENCE_SOLAR_FLUX).max(0.0)
}

/// Zenith airglow, continuum plus lines, at average solar activity
pub fn zenith_airglow() -> Result<Grid, SpectrumError> {
    let table = Table::from_static(&CONTINUUM);
    let mut grid = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
    grid.fill_with(|x| table.clamped_at(x) * CONTINUUM_UNIT);

    let mut line_grid = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
    for line in AIRGLOW_LINES.iter() {
        let profile = GaussianLine::diffuse(line.center_nm, LINE_FWHM_NM, line.energy_flux())?;
        line_grid.fill_with(|x| profile.flux_at(x));
        grid.add_grid(&line_grid)?;
    }
    Ok(grid)
}

/// Airglow F_λ per arcsec² at `airmass` for the given solar conditions
pub fn airglow_spectrum(
    solar: &SolarProperties,
    airmass: f64,
    atmosphere: &Atmosphere,
) -> Result<Grid, SpectrumError> {
    let mut grid = zenith_airglow()?;
    grid.scale(solar_cycle_factor(solar.solar_flux_10cm()));
    atmosphere.remove(&mut grid, 1.0)?;
    grid.scale(airmass);
    atmosphere.apply(&mut grid, airmass)?;
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_line_energy() {
        let green = AIRGLOW_LINES[0];
        // 250 R at 557.7 nm
        assert_relative_eq!(green.energy_flux(), 1.665e-15, max_relative = 1e-3);
    }

    #[test]
    fn test_solar_cycle_factor() {
        assert_relative_eq!(solar_cycle_factor(REFERENCE_SOLAR_FLUX), 1.0);
        assert!(solar_cycle_factor(220.0) > 1.2);
        assert!(solar_cycle_factor(70.0) < 0.8);
    }

    #[test]
    fn test_zenith_airglow_lines() {
        let grid = zenith_airglow().unwrap();
        assert_relative_eq!(grid.value_at(520.0), 4.7e-17, max_relative = 1e-9);
        // The green line dominates its neighbourhood
        assert!(grid.value_at(557.75) > 10.0 * grid.value_at(545.0));

        // Line area is recovered by integrating around it
        let continuum = 5.0e-17 * 0.25;
        let area: f64 = (0..grid.len())
            .filter(|&i| (grid.x(i) - 557.7).abs() < 3.0)
            .map(|i| grid.y(i) * grid.step() - continuum)
            .sum();
        assert_relative_eq!(area, AIRGLOW_LINES[0].energy_flux(), max_relative = 0.02);
    }

    #[test]
    fn test_zenith_average_sky_unchanged() {
        let solar = SolarProperties::default();
        let atmosphere = Atmosphere::kitt_peak();
        let sky = airglow_spectrum(&solar, 1.0, &atmosphere).unwrap();
        let zenith = zenith_airglow().unwrap();
        let factor = solar_cycle_factor(solar.solar_flux_10cm());
        assert_relative_eq!(sky.value_at(700.0), zenith.value_at(700.0) * factor, max_relative = 1e-12);
    }

    #[test]
    fn test_brighter_at_higher_airmass() {
        let solar = SolarProperties::default();
        let atmosphere = Atmosphere::kitt_peak();
        let zenith = airglow_spectrum(&solar, 1.0, &atmosphere).unwrap();
        let low = airglow_spectrum(&solar, 2.0, &atmosphere).unwrap();
        // Red continuum suffers little extinction, so X wins
        assert!(low.value_at(900.0) > 1.8 * zenith.value_at(900.0));
    }
}
