//! Spectra defined by tabulated data: galaxy and stellar templates or user files
//!
//! The table is (re)read on every recompute and rebinned onto the grid with
//! the area-preserving resampler, so a template sampled more finely or more
//! coarsely than the grid keeps its integrated flux.

use std::rc::Rc;

use crate::conditions::ParameterError;
use crate::io::loader::ResourceLoader;
use crate::io::table::Table;
use crate::notify::Change;

use super::spectrum::{SpectralGrid, Spectrum, SpectrumError};

/// Where a tabulated spectrum gets its samples
#[derive(Clone)]
pub enum TableSource {
    /// Loaded through a resource loader on each recompute
    Resource {
        loader: Rc<dyn ResourceLoader>,
        path: String,
    },
    /// Held in memory
    Inline(Table),
}

/// Spectrum resampled from a rest-frame `(wavelength nm, F_λ)` table
pub struct TabulatedSpectrum {
    storage: SpectralGrid,
    source: TableSource,
    label: String,
    redshift: f64,
}

impl TabulatedSpectrum {
    /// Spectrum read from a resource, e.g. a template file
    pub fn from_resource(
        loader: Rc<dyn ResourceLoader>,
        path: impl Into<String>,
        diffuse: bool,
    ) -> Self {
        let path = path.into();
        Self {
            storage: SpectralGrid::new(diffuse),
            label: path.clone(),
            source: TableSource::Resource { loader, path },
            redshift: 0.0,
        }
    }

    /// Spectrum from an in-memory table
    pub fn from_table(label: impl Into<String>, table: Table, diffuse: bool) -> Self {
        Self {
            storage: SpectralGrid::new(diffuse),
            label: label.into(),
            source: TableSource::Inline(table),
            redshift: 0.0,
        }
    }

    pub fn redshift(&self) -> f64 {
        self.redshift
    }

    /// Set z; observed wavelengths are λ_rest·(1 + z)
    pub fn set_redshift(&mut self, redshift: f64) -> Result<(), ParameterError> {
        if !redshift.is_finite() || redshift <= -1.0 {
            return Err(ParameterError::InvalidRedshift(redshift));
        }
        self.redshift = redshift;
        self.storage.tracker().invalidate(Change::Parameter);
        Ok(())
    }

    /// Builder form of [`TabulatedSpectrum::set_redshift`]
    pub fn with_redshift(mut self, redshift: f64) -> Result<Self, ParameterError> {
        self.set_redshift(redshift)?;
        Ok(self)
    }

    fn load(&self) -> Result<Table, SpectrumError> {
        match &self.source {
            TableSource::Resource { loader, path } => Ok(loader.load_table(path)?),
            TableSource::Inline(table) => Ok(table.clone()),
        }
    }
}

impl Spectrum for TabulatedSpectrum {
    fn name(&self) -> String {
        if self.redshift != 0.0 {
            format!("{} (z={})", self.label, self.redshift)
        } else {
            self.label.clone()
        }
    }

    fn spectral_grid(&self) -> &SpectralGrid {
        &self.storage
    }

    fn spectral_grid_mut(&mut self) -> &mut SpectralGrid {
        &mut self.storage
    }

    fn update(&mut self) -> Result<(), SpectrumError> {
        let mut table = self.load()?;
        if self.redshift != 0.0 {
            table.scale_x(1.0 + self.redshift);
        }

        let grid = self.storage.grid_mut();
        grid.clear();
        grid.resample_from(table.x(), table.y())?;
        Ok(())
    }
}
