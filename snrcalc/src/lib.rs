//! Signal-to-noise prediction for ground-based CCD imaging
//!
//! This crate models the spectral energy distribution of a target and of the
//! night sky on a shared wavelength grid, propagates both through the
//! atmosphere, telescope and instrument, and predicts the counts, noise and
//! signal-to-noise ratio of an exposure sequence.

pub mod algo;
pub mod conditions;
pub mod exposure;
pub mod hardware;
pub mod io;
pub mod notify;
pub mod photometry;
pub mod shared_args;
pub mod units;

// Re-exports for easier access
pub use algo::grid::{Grid, GridError, GridGeometry};
pub use conditions::{LunarProperties, ParameterError, SolarProperties};
pub use exposure::{ExposureCalculator, ExposureParameters, ExposureResult};
pub use hardware::instrument::InstrumentConfig;
pub use hardware::telescope::{TelescopeConfig, TelescopeProperties};
pub use photometry::spectrum::{Spectrum, SpectrumError, CGS};
