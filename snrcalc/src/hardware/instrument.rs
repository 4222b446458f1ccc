//! Instrument configuration: detector plus end-to-end throughput
//!
//! An [`InstrumentConfig`] is built once per run and handed to the exposure
//! engine by reference. It comes from a predefined model, from code, or
//! from a JSON description whose throughput list is multiplied into one
//! curve:
//!
//! ```json
//! {
//!   "name": "ODI r'",
//!   "detector": { "name": "OTA", "read_noise_e": 7.0, "dark_current_e_per_s": 0.0015,
//!                 "plate_scale_arcsec": 0.11, "full_well_e": 150000.0 },
//!   "throughput": [
//!     { "type": "constant", "value": 0.65 },
//!     { "type": "box", "lower_nm": 550.0, "upper_nm": 690.0, "value": 0.9 },
//!     { "type": "table", "path": "qe/ota.dat" }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algo::grid::{Grid, GridError, GridGeometry};
use crate::conditions::ParameterError;
use crate::io::loader::ResourceLoader;
use crate::io::table::Table;
use crate::photometry::filter::{Filter, FilterError};
use crate::photometry::spectrum::Band;

use super::detector::{models::ODI_OTA, DetectorConfig};

/// Errors that can occur loading an instrument configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Throughput curve: {0}")]
    Filter(#[from] FilterError),

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Invalid parameter: {0}")]
    Parameter(#[from] ParameterError),
}

/// One factor of the throughput product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThroughputSpec {
    /// Wavelength independent efficiency
    Constant { value: f64 },
    /// Passband with sharp edges
    Box {
        lower_nm: f64,
        upper_nm: f64,
        value: f64,
    },
    /// Tabulated curve read through the resource loader
    Table { path: String },
}

impl ThroughputSpec {
    fn to_filter(&self, loader: &dyn ResourceLoader) -> Result<Filter, FilterError> {
        match self {
            ThroughputSpec::Constant { value } => Filter::constant(*value),
            ThroughputSpec::Box {
                lower_nm,
                upper_nm,
                value,
            } => Filter::from_notch(&Band::from_nm_bounds(*lower_nm, *upper_nm)?, *value),
            ThroughputSpec::Table { path } => Filter::from_resource(loader, path),
        }
    }
}

/// Serialized form of an instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub name: String,
    pub detector: DetectorConfig,
    #[serde(default)]
    pub throughput: Vec<ThroughputSpec>,
}

/// Mirrors, corrector and window of WIYN + ODI
const WIYN_ODI_OPTICS: f64 = 0.65;

/// ODI OTA quantum efficiency, (nm, QE)
const ODI_QE: [(f64, f64); 10] = [
    (300.0, 0.05),
    (350.0, 0.35),
    (400.0, 0.70),
    (500.0, 0.85),
    (600.0, 0.90),
    (700.0, 0.88),
    (800.0, 0.75),
    (900.0, 0.45),
    (1000.0, 0.12),
    (1100.0, 0.0),
];

/// Detector plus the product of every throughput factor in the beam
#[derive(Debug, Clone)]
pub struct InstrumentConfig {
    pub name: String,
    pub detector: DetectorConfig,
    pub throughput: Filter,
}

impl InstrumentConfig {
    pub fn new(name: impl Into<String>, detector: DetectorConfig, throughput: Filter) -> Self {
        Self {
            name: name.into(),
            detector,
            throughput,
        }
    }

    /// ODI on WIYN without a bandpass filter
    pub fn wiyn_odi() -> Self {
        let qe = Table::from_static(&ODI_QE);
        let mut throughput = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
        throughput.fill_with(|x| WIYN_ODI_OPTICS * qe.linear_at(x).unwrap_or(0.0));
        Self::new(
            "WIYN ODI",
            ODI_OTA.clone(),
            Filter::from_grid("WIYN ODI optics × OTA QE", throughput),
        )
    }

    /// Add a bandpass or any further factor to the throughput
    pub fn with_filter(mut self, filter: &Filter) -> Result<Self, GridError> {
        self.throughput.combine(filter)?;
        Ok(self)
    }

    /// Build from the serialized form, loading tabulated curves through `loader`
    pub fn from_spec(spec: &InstrumentSpec, loader: &dyn ResourceLoader) -> Result<Self, ConfigError> {
        spec.detector.validate()?;
        let factors = spec
            .throughput
            .iter()
            .map(|factor| factor.to_filter(loader))
            .collect::<Result<Vec<_>, _>>()?;
        let throughput = Filter::product(format!("{} throughput", spec.name), &factors)?;
        Ok(Self::new(spec.name.clone(), spec.detector.clone(), throughput))
    }

    pub fn from_json(text: &str, loader: &dyn ResourceLoader) -> Result<Self, ConfigError> {
        let spec: InstrumentSpec = serde_json::from_str(text)?;
        Self::from_spec(&spec, loader)
    }

    /// Read a JSON instrument description from disk
    pub fn load_from_file(path: &Path, loader: &dyn ResourceLoader) -> Result<Self, ConfigError> {
        log::debug!("Loading instrument from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_json(&text, loader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::loader::{DirectoryLoader, MemoryLoader};
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::TempDir;

    const SPEC: &str = r#"{
        "name": "test camera",
        "detector": { "name": "ccd", "read_noise_e": 4.0, "dark_current_e_per_s": 0.01,
                      "plate_scale_arcsec": 0.2, "full_well_e": 100000.0 },
        "throughput": [
            { "type": "constant", "value": 0.5 },
            { "type": "box", "lower_nm": 500.0, "upper_nm": 600.0, "value": 0.8 },
            { "type": "table", "path": "qe.dat" }
        ]
    }"#;

    #[test]
    fn test_wiyn_odi_model() {
        let odi = InstrumentConfig::wiyn_odi();
        assert_eq!(odi.detector, *ODI_OTA);
        assert_relative_eq!(odi.throughput.at(600.0), 0.65 * 0.9, epsilon = 1e-12);
        assert_eq!(odi.throughput.at(1200.0), 0.0);

        let band = Band::from_nm_bounds(550.0, 690.0).unwrap();
        let filtered = odi.with_filter(&Filter::from_notch(&band, 0.9).unwrap()).unwrap();
        assert_eq!(filtered.throughput.at(500.0), 0.0);
        assert_relative_eq!(filtered.throughput.at(600.0), 0.65 * 0.9 * 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_from_json() {
        let loader = MemoryLoader::new().with("qe.dat", "400 0.5\n700 0.5\n");
        let instrument = InstrumentConfig::from_json(SPEC, &loader).unwrap();
        assert_eq!(instrument.name, "test camera");
        assert_eq!(instrument.detector.read_noise_e, 4.0);
        assert_relative_eq!(instrument.throughput.at(550.0), 0.5 * 0.8 * 0.5, epsilon = 1e-12);
        assert_eq!(instrument.throughput.at(450.0), 0.0);
    }

    #[test]
    fn test_missing_table_surfaces() {
        let loader = MemoryLoader::new();
        assert!(matches!(
            InstrumentConfig::from_json(SPEC, &loader),
            Err(ConfigError::Filter(FilterError::Table(_)))
        ));
    }

    #[test]
    fn test_invalid_detector_rejected() {
        let loader = MemoryLoader::new().with("qe.dat", "400 0.5\n700 0.5\n");
        let bad = SPEC.replace("\"plate_scale_arcsec\": 0.2", "\"plate_scale_arcsec\": 0.0");
        assert!(matches!(
            InstrumentConfig::from_json(&bad, &loader),
            Err(ConfigError::Parameter(_))
        ));
        assert!(matches!(
            InstrumentConfig::from_json("{ not json", &loader),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("qe.dat"), "# flat QE\n300 0.9\n1100 0.9\n").unwrap();
        let config_path = dir.path().join("camera.json");
        let mut file = fs::File::create(&config_path).unwrap();
        file.write_all(SPEC.as_bytes()).unwrap();

        let loader = DirectoryLoader::new(dir.path());
        let instrument = InstrumentConfig::load_from_file(&config_path, &loader).unwrap();
        assert_relative_eq!(instrument.throughput.at(550.0), 0.5 * 0.8 * 0.9, epsilon = 1e-12);

        assert!(matches!(
            InstrumentConfig::load_from_file(&dir.path().join("none.json"), &loader),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_spec_round_trip() {
        let spec: InstrumentSpec = serde_json::from_str(SPEC).unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        let back: InstrumentSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
