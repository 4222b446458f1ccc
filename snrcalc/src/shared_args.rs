use clap::{Parser, ValueEnum};

use crate::conditions::{LunarProperties, ParameterError, SolarProperties};
use crate::exposure::ExposureParameters;
use crate::hardware::telescope::{models, TelescopeConfig, TelescopeProperties};
use crate::photometry::magnitude::StandardBand;
use crate::units::{Angle, AngleExt};

fn parse_numbers<const N: usize>(s: &str, names: [&str; N]) -> Result<[f64; N], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != N {
        return Err(format!("Expected format '{}'", names.join(",")));
    }

    let mut values = [0.0; N];
    for ((value, part), name) in values.iter_mut().zip(&parts).zip(names) {
        *value = part
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Invalid {name} value"))?;
    }
    Ok(values)
}

/// Parse coordinates string in format "elongation,latitude"
fn parse_coordinates(s: &str) -> Result<(f64, f64), String> {
    let [elongation, latitude] = parse_numbers(s, ["elongation", "latitude"])?;
    Ok((elongation, latitude))
}

/// Parse moon geometry in format "zenith,phase,separation" (degrees)
fn parse_moon(s: &str) -> Result<(f64, f64, f64), String> {
    let [zenith, phase, separation] = parse_numbers(s, ["zenith", "phase", "separation"])?;
    Ok((zenith, phase, separation))
}

/// Largest on-chip binning accepted on the command line
const MAX_BINNING: i64 = 64;

/// Photometric band a target magnitude is given in
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BandArg {
    U,
    B,
    V,
    R,
    I,
    SdssU,
    SdssG,
    SdssR,
    SdssI,
    SdssZ,
}

impl std::fmt::Display for BandArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_possible_value() {
            Some(value) => write!(f, "{}", value.get_name()),
            None => write!(f, "{self:?}"),
        }
    }
}

impl From<BandArg> for StandardBand {
    fn from(band: BandArg) -> Self {
        match band {
            BandArg::U => StandardBand::U,
            BandArg::B => StandardBand::B,
            BandArg::V => StandardBand::V,
            BandArg::R => StandardBand::R,
            BandArg::I => StandardBand::I,
            BandArg::SdssU => StandardBand::SdssU,
            BandArg::SdssG => StandardBand::SdssG,
            BandArg::SdssR => StandardBand::SdssR,
            BandArg::SdssI => StandardBand::SdssI,
            BandArg::SdssZ => StandardBand::SdssZ,
        }
    }
}

/// Available telescope models
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TelescopeModel {
    /// WIYN 3.5m
    Wiyn,
    /// KPNO 2.1m
    Kpno21m,
}

impl std::fmt::Display for TelescopeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelescopeModel::Wiyn => write!(f, "wiyn"),
            TelescopeModel::Kpno21m => write!(f, "kpno21m"),
        }
    }
}

impl TelescopeModel {
    pub fn to_config(&self) -> &'static TelescopeConfig {
        match self {
            TelescopeModel::Wiyn => &models::WIYN_3_5M,
            TelescopeModel::Kpno21m => &models::KPNO_2_1M,
        }
    }
}

/// Observing conditions shared across calculator binaries
#[derive(Parser, Debug, Clone)]
pub struct SharedConditionsArgs {
    /// Telescope to observe with
    #[arg(long, default_value_t = TelescopeModel::Wiyn)]
    pub telescope: TelescopeModel,

    /// Target airmass
    #[arg(long, default_value_t = 1.0)]
    pub airmass: f64,

    /// Moon geometry in degrees (format: "zenith,phase,separation"); zenith > 90 means set
    #[arg(long, default_value = "120.0,180.0,90.0", value_parser = parse_moon)]
    pub moon: (f64, f64, f64),

    /// Solar elongation and ecliptic latitude of the target (format: "elongation,latitude")
    #[arg(long, default_value = "180.0,60.0", value_parser = parse_coordinates)]
    pub coordinates: (f64, f64),

    /// Observation epoch as a decimal year, sets the solar cycle phase
    #[arg(long, default_value_t = 2010.5)]
    pub epoch: f64,
}

impl SharedConditionsArgs {
    pub fn solar_properties(&self) -> Result<SolarProperties, ParameterError> {
        let (elongation, latitude) = self.coordinates;
        SolarProperties::new(
            Angle::from_degrees(elongation),
            Angle::from_degrees(latitude),
            self.epoch,
        )
    }

    pub fn lunar_properties(&self) -> Result<LunarProperties, ParameterError> {
        let (zenith, phase, separation) = self.moon;
        LunarProperties::new(
            Angle::from_degrees(zenith),
            Angle::from_degrees(phase),
            Angle::from_degrees(separation),
        )
    }

    pub fn telescope_properties(&self) -> Result<TelescopeProperties, ParameterError> {
        let mut telescope = TelescopeProperties::new(self.telescope.to_config().clone());
        telescope.set_airmass(self.airmass)?;
        Ok(telescope)
    }
}

/// Exposure sequence arguments
#[derive(Parser, Debug, Clone)]
pub struct SharedExposureArgs {
    /// Exposure time in seconds
    #[arg(long, default_value_t = 300.0)]
    pub exposure: f64,

    /// Number of exposures to co-add
    #[arg(long, default_value_t = 1)]
    pub count: u32,

    /// On-chip binning factor
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_BINNING))]
    pub binning: u32,

    /// Seeing FWHM in arcseconds
    #[arg(long, default_value_t = 1.0)]
    pub seeing: f64,

    /// Aperture radii as multiples of the seeing FWHM
    #[arg(long, value_delimiter = ',', default_value = "0.5,1.0,1.5,2.0")]
    pub apertures: Vec<f64>,
}

impl SharedExposureArgs {
    pub fn parameters(&self) -> ExposureParameters {
        ExposureParameters {
            exposure_s: self.exposure,
            exposures: self.count,
            binning: self.binning,
            seeing_fwhm_arcsec: self.seeing,
            aperture_multipliers: self.apertures.clone(),
        }
    }
}
