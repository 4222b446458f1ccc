//! Multiplicative throughput curves.
//!
//! A [`Filter`] is a dimensionless curve on the wavelength grid: optics
//! reflectivity, coating transmission, detector quantum efficiency or a
//! bandpass filter. Applying it multiplies a spectrum bin for bin. Several
//! curves compose into one by [`Filter::combine`].
//!
//! Tabulated curves are sampled by linear interpolation between their rows
//! and are zero outside the tabulated range.

use thiserror::Error;

use crate::algo::grid::{Grid, GridError, GridGeometry};
use crate::conditions::{require_range, ParameterError};
use crate::io::loader::ResourceLoader;
use crate::io::table::{Table, TableError};

use super::spectrum::Band;

/// Errors that can occur building a throughput curve
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Throughput at {wavelength_nm} nm is negative ({value})")]
    NegativeThroughput { wavelength_nm: f64, value: f64 },

    #[error("Data format error: {0}")]
    Table(#[from] TableError),

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Invalid parameter: {0}")]
    Parameter(#[from] ParameterError),
}

/// Throughput curve sampled on the wavelength grid
#[derive(Debug, Clone)]
pub struct Filter {
    name: String,
    throughput: Grid,
}

impl Filter {
    /// Wrap an already sampled curve
    pub fn from_grid(name: impl Into<String>, throughput: Grid) -> Self {
        Self {
            name: name.into(),
            throughput,
        }
    }

    /// Curve interpolated linearly from `(wavelength nm, throughput)` rows
    pub fn from_table(name: impl Into<String>, table: &Table) -> Result<Self, FilterError> {
        if let Some((&wavelength_nm, &value)) =
            table.x().iter().zip(table.y()).find(|(_, &y)| y < 0.0)
        {
            return Err(FilterError::NegativeThroughput {
                wavelength_nm,
                value,
            });
        }
        Ok(Self::from_grid(
            name,
            table.to_grid_linear(GridGeometry::WAVELENGTH_DEFAULT, 0.0),
        ))
    }

    /// Curve loaded through a resource loader
    pub fn from_resource(loader: &dyn ResourceLoader, path: &str) -> Result<Self, FilterError> {
        let table = loader.load_table(path)?;
        Self::from_table(path, &table)
    }

    /// Box passband: `efficiency` inside the band, 0 elsewhere
    pub fn from_notch(band: &Band, efficiency: f64) -> Result<Self, FilterError> {
        require_range("throughput", efficiency, 0.0, f64::MAX)?;
        let mut throughput = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
        throughput.fill_with(|x| if band.contains(x) { efficiency } else { 0.0 });
        Ok(Self::from_grid(
            format!("box {:.0}-{:.0} nm", band.lower_nm, band.upper_nm),
            throughput,
        ))
    }

    /// Same throughput at every wavelength
    pub fn constant(efficiency: f64) -> Result<Self, FilterError> {
        require_range("throughput", efficiency, 0.0, f64::MAX)?;
        let mut throughput = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
        throughput.fill_with(|_| efficiency);
        Ok(Self::from_grid(format!("constant {efficiency}"), throughput))
    }

    /// Unit throughput, the identity for [`Filter::combine`]
    pub fn transparent() -> Self {
        let mut throughput = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
        throughput.fill_with(|_| 1.0);
        Self::from_grid("transparent", throughput)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn throughput(&self) -> &Grid {
        &self.throughput
    }

    /// Throughput of the bin containing a wavelength, 0 off the grid
    pub fn at(&self, wavelength_nm: f64) -> f64 {
        self.throughput.value_at(wavelength_nm)
    }

    /// Smallest band containing every non-zero bin, `None` if opaque
    pub fn band(&self) -> Option<Band> {
        let values = self.throughput.values();
        let first = values.iter().position(|&v| v != 0.0)?;
        let last = values.iter().rposition(|&v| v != 0.0)?;
        Some(Band {
            lower_nm: self.throughput.x(first),
            upper_nm: self.throughput.x(last) + self.throughput.step(),
        })
    }

    /// ∫ T(λ) dλ in nm
    pub fn equivalent_width(&self) -> f64 {
        self.throughput.integrate()
    }

    /// Multiply a spectrum's grid by this throughput
    pub fn apply(&self, grid: &mut Grid) -> Result<(), GridError> {
        grid.scale_grid(&self.throughput)
    }

    /// Fold another curve into this one
    pub fn combine(&mut self, other: &Filter) -> Result<(), GridError> {
        self.throughput.scale_grid(&other.throughput)?;
        self.name = format!("{} × {}", self.name, other.name);
        Ok(())
    }

    /// Product of several curves; an empty list is transparent
    pub fn product<'a, I>(name: impl Into<String>, filters: I) -> Result<Self, GridError>
    where
        I: IntoIterator<Item = &'a Filter>,
    {
        let mut result = Self::transparent();
        for filter in filters {
            result.throughput.scale_grid(&filter.throughput)?;
        }
        result.name = name.into();
        Ok(result)
    }
}
