//! Atmospheric extinction
//!
//! Extinction is tabulated in magnitudes per airmass. Light crossing X
//! airmasses is attenuated by 10^(−0.4·k(λ)·X). The sky model also needs
//! the inverse operation, to take a dataset measured at one airmass back to
//! the top of the atmosphere before re-extincting it.

use crate::algo::grid::{Grid, GridError, GridGeometry};
use crate::io::loader::ResourceLoader;
use crate::io::table::Table;

use super::filter::{Filter, FilterError};

/// Mountain-site extinction curve approximating Kitt Peak, (nm, mag/airmass)
const KITT_PEAK_EXTINCTION: [(f64, f64); 19] = [
    (300.0, 1.40),
    (320.0, 0.90),
    (340.0, 0.60),
    (360.0, 0.46),
    (380.0, 0.38),
    (400.0, 0.32),
    (450.0, 0.22),
    (500.0, 0.17),
    (550.0, 0.14),
    (600.0, 0.12),
    (650.0, 0.09),
    (700.0, 0.07),
    (750.0, 0.05),
    (800.0, 0.045),
    (850.0, 0.04),
    (900.0, 0.035),
    (950.0, 0.04),
    (1000.0, 0.03),
    (1100.0, 0.02),
];

/// Extinction curve k(λ) in magnitudes per airmass
#[derive(Debug, Clone)]
pub struct Atmosphere {
    name: String,
    extinction: Grid,
}

impl Atmosphere {
    /// Extinction curve from `(wavelength nm, mag/airmass)` rows.
    ///
    /// Interpolated linearly and held at the edge values beyond the table.
    pub fn from_table(name: impl Into<String>, table: &Table) -> Self {
        let mut extinction = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
        extinction.fill_with(|x| table.clamped_at(x));
        Self {
            name: name.into(),
            extinction,
        }
    }

    pub fn from_resource(loader: &dyn ResourceLoader, path: &str) -> Result<Self, FilterError> {
        let table = loader.load_table(path)?;
        Ok(Self::from_table(path, &table))
    }

    /// Built-in curve for a dark mountain site
    pub fn kitt_peak() -> Self {
        Self::from_table("Kitt Peak", &Table::from_static(&KITT_PEAK_EXTINCTION))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extinction(&self) -> &Grid {
        &self.extinction
    }

    /// Extinction coefficient of the bin containing a wavelength
    pub fn extinction_at(&self, wavelength_nm: f64) -> f64 {
        self.extinction.value_at(wavelength_nm)
    }

    /// Transmitted fraction 10^(−0.4·k·X) on the grid
    pub fn transmission(&self, airmass: f64) -> Grid {
        let mut factor = self.extinction.clone();
        factor.scale(-0.4 * airmass);
        factor.raise(10.0);
        factor
    }

    /// Transmitted fraction for a per-wavelength airmass
    pub fn transmission_varying(&self, airmass: &Grid) -> Result<Grid, GridError> {
        let mut factor = self.extinction.clone();
        factor.scale_grid(airmass)?;
        factor.scale(-0.4);
        factor.raise(10.0);
        Ok(factor)
    }

    /// The transmission at an airmass as a throughput curve
    pub fn as_filter(&self, airmass: f64) -> Filter {
        Filter::from_grid(
            format!("{} at X={airmass:.2}", self.name),
            self.transmission(airmass),
        )
    }

    /// Extinct a spectrum grid through `airmass`
    pub fn apply(&self, grid: &mut Grid, airmass: f64) -> Result<(), GridError> {
        grid.scale_grid(&self.transmission(airmass))
    }

    /// Extinct with a wavelength-dependent airmass.
    ///
    /// The built-in sky terms all see one airmass per line of sight and use
    /// [`Atmosphere::apply`]; this is for callers modelling their own
    /// scattering geometry.
    pub fn apply_varying(&self, grid: &mut Grid, airmass: &Grid) -> Result<(), GridError> {
        grid.scale_grid(&self.transmission_varying(airmass)?)
    }

    /// Undo [`Atmosphere::apply`] at the same airmass
    pub fn remove(&self, grid: &mut Grid, airmass: f64) -> Result<(), GridError> {
        grid.div_grid(&self.transmission(airmass))
    }

    /// Undo [`Atmosphere::apply_varying`] with the same airmass grid
    pub fn remove_varying(&self, grid: &mut Grid, airmass: &Grid) -> Result<(), GridError> {
        grid.div_grid(&self.transmission_varying(airmass)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_grid() -> Grid {
        let mut grid = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
        grid.fill_with(|_| 1.0);
        grid
    }

    #[test]
    fn test_kitt_peak_curve() {
        let atmosphere = Atmosphere::kitt_peak();
        assert_relative_eq!(atmosphere.extinction_at(550.0), 0.14, epsilon = 1e-12);
        assert_relative_eq!(atmosphere.extinction_at(525.0), 0.155, epsilon = 1e-12);
        // Held at the edges
        assert_relative_eq!(atmosphere.extinction_at(260.0), 1.40, epsilon = 1e-12);
        assert_relative_eq!(atmosphere.extinction_at(1200.0), 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_attenuates() {
        let atmosphere = Atmosphere::kitt_peak();
        let mut grid = unit_grid();
        atmosphere.apply(&mut grid, 2.0).unwrap();
        assert_relative_eq!(grid.value_at(550.0), 10f64.powf(-0.4 * 0.14 * 2.0), epsilon = 1e-12);

        let filter = atmosphere.as_filter(2.0);
        assert_relative_eq!(filter.at(550.0), grid.value_at(550.0), epsilon = 1e-12);
    }

    #[test]
    fn test_remove_inverts_apply() {
        let atmosphere = Atmosphere::kitt_peak();
        let mut grid = unit_grid();
        grid.fill_with(|x| x / 500.0);
        let original = grid.clone();

        atmosphere.apply(&mut grid, 1.7).unwrap();
        atmosphere.remove(&mut grid, 1.7).unwrap();
        for i in (0..grid.len()).step_by(97) {
            assert_relative_eq!(grid.y(i), original.y(i), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_varying_airmass_matches_constant() {
        let atmosphere = Atmosphere::kitt_peak();
        let mut airmass = unit_grid();
        airmass.scale(1.5);

        let mut varying = unit_grid();
        atmosphere.apply_varying(&mut varying, &airmass).unwrap();
        let mut constant = unit_grid();
        atmosphere.apply(&mut constant, 1.5).unwrap();
        assert_relative_eq!(varying.value_at(400.0), constant.value_at(400.0), epsilon = 1e-12);

        atmosphere.remove_varying(&mut varying, &airmass).unwrap();
        assert_relative_eq!(varying.value_at(400.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_airmass_varying_with_wavelength() {
        let atmosphere = Atmosphere::kitt_peak();
        let mut airmass = unit_grid();
        airmass.fill_with(|x| if x < 600.0 { 1.0 } else { 2.0 });

        let mut grid = unit_grid();
        atmosphere.apply_varying(&mut grid, &airmass).unwrap();
        assert_relative_eq!(grid.value_at(550.0), atmosphere.transmission(1.0).value_at(550.0));
        assert_relative_eq!(grid.value_at(700.0), atmosphere.transmission(2.0).value_at(700.0));

        atmosphere.remove_varying(&mut grid, &airmass).unwrap();
        assert_relative_eq!(grid.value_at(700.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_resource() {
        let loader = crate::io::loader::MemoryLoader::new().with("ext.dat", "300 0.5\n1200 0.1\n");
        let atmosphere = Atmosphere::from_resource(&loader, "ext.dat").unwrap();
        assert_eq!(atmosphere.name(), "ext.dat");
        assert_relative_eq!(atmosphere.extinction_at(750.0), 0.3, epsilon = 1e-12);
    }
}
