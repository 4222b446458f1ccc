//! Solar irradiance above the atmosphere
//!
//! Both zodiacal light and moonlight are scattered sunlight, so their
//! spectral shape starts from this curve.

use crate::algo::grid::{Grid, GridGeometry};
use crate::io::table::Table;

use super::spectrum::{SpectralGrid, Spectrum, SpectrumError};

/// Solar spectral irradiance at 1 AU, (nm, W m⁻² nm⁻¹)
const SOLAR_IRRADIANCE: [(f64, f64); 17] = [
    (300.0, 0.5),
    (350.0, 1.0),
    (400.0, 1.5),
    (450.0, 2.0),
    (500.0, 1.9),
    (550.0, 1.85),
    (600.0, 1.75),
    (650.0, 1.55),
    (700.0, 1.42),
    (750.0, 1.27),
    (800.0, 1.12),
    (850.0, 0.99),
    (900.0, 0.89),
    (950.0, 0.83),
    (1000.0, 0.75),
    (1050.0, 0.67),
    (1100.0, 0.60),
];

/// W m⁻² nm⁻¹ to erg s⁻¹ cm⁻² nm⁻¹
const WATTS_PER_M2_TO_CGS: f64 = 1000.0;

/// Solar F_λ at 1 AU on the default grid, erg s⁻¹ cm⁻² nm⁻¹
pub fn solar_irradiance() -> Grid {
    let table = Table::from_static(&SOLAR_IRRADIANCE);
    let mut grid = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
    grid.fill_with(|x| table.clamped_at(x) * WATTS_PER_M2_TO_CGS);
    grid
}

/// The Sun as a point source at 1 AU
#[derive(Debug)]
pub struct SolarSpectrum {
    storage: SpectralGrid,
}

impl Default for SolarSpectrum {
    fn default() -> Self {
        Self::new()
    }
}

impl SolarSpectrum {
    pub fn new() -> Self {
        Self {
            storage: SpectralGrid::new(false),
        }
    }
}

impl Spectrum for SolarSpectrum {
    fn name(&self) -> String {
        "Sun".to_string()
    }

    fn spectral_grid(&self) -> &SpectralGrid {
        &self.storage
    }

    fn spectral_grid_mut(&mut self) -> &mut SpectralGrid {
        &mut self.storage
    }

    fn update(&mut self) -> Result<(), SpectrumError> {
        self.storage.grid_mut().assign(&solar_irradiance());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_irradiance_units() {
        let grid = solar_irradiance();
        assert_relative_eq!(grid.value_at(550.0), 1850.0, epsilon = 1e-9);
        assert_relative_eq!(grid.value_at(475.0), 1950.0, epsilon = 1e-9);
        assert_relative_eq!(grid.value_at(1250.0), 600.0, epsilon = 1e-9);
    }

    #[test]
    fn test_solar_spectrum_peaks_in_blue_green() {
        let mut sun = SolarSpectrum::new();
        let grid = sun.snapshot().unwrap();
        let peak = (0..grid.len())
            .max_by(|&a, &b| grid.y(a).total_cmp(&grid.y(b)))
            .unwrap();
        assert_relative_eq!(grid.x(peak), 450.0, epsilon = 0.5);
        assert!(sun.flux(700.0).unwrap() > 0.0);
    }
}
