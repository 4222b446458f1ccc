//! Spectral models and the optical operators applied to them

pub mod airglow;
pub mod atmosphere;
pub mod composite;
pub mod emission_line;
pub mod filter;
pub mod magnitude;
pub mod moonlight;
pub mod sky;
pub mod solar;
pub mod spectrum;
pub mod stellar;
pub mod tabulated;
pub mod zodiacal;

pub use atmosphere::Atmosphere;
pub use composite::TargetSpectrum;
pub use emission_line::GaussianLine;
pub use filter::{Filter, FilterError};
pub use magnitude::{MagnitudeConvention, MagnitudeSystem, NormalizedSpectrum, StandardBand};
pub use sky::{SkyComponents, SkySpectrum};
pub use solar::SolarSpectrum;
pub use spectrum::{shared, Band, SharedSpectrum, SpectralGrid, Spectrum, SpectrumError, CGS};
pub use stellar::{BlackbodySpectrum, FlatSpectrum, PowerLawSpectrum};
pub use tabulated::TabulatedSpectrum;
pub use zodiacal::{ZodiacalError, ZodiacalLight};
