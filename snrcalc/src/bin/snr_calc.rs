//! Exposure signal-to-noise calculator
//!
//! Builds a target from a continuum normalized to a magnitude (plus an
//! optional emission line), models the night sky for the given conditions
//! and prints the predicted photometry for each aperture size.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use snrcalc::io::loader::{DirectoryLoader, ResourceLoader};
use snrcalc::photometry::magnitude::{SKY_REFERENCE_NM, V_ZERO_POINT_550};
use snrcalc::photometry::{
    shared, BlackbodySpectrum, FlatSpectrum, GaussianLine, NormalizedSpectrum, PowerLawSpectrum,
    SharedSpectrum, SkySpectrum, Spectrum, StandardBand, TabulatedSpectrum, TargetSpectrum,
};
use snrcalc::shared_args::{BandArg, SharedConditionsArgs, SharedExposureArgs};
use snrcalc::units::{Temperature, TemperatureExt};
use snrcalc::{ExposureCalculator, InstrumentConfig};

/// Continuum shape of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ContinuumKind {
    /// Planck spectrum at --temperature
    Blackbody,
    /// Constant F_λ
    Flat,
    /// F_λ ∝ λ^index
    PowerLaw,
    /// Two-column (nm, F_λ) template read from --file
    File,
}

impl std::fmt::Display for ContinuumKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContinuumKind::Blackbody => write!(f, "blackbody"),
            ContinuumKind::Flat => write!(f, "flat"),
            ContinuumKind::PowerLaw => write!(f, "power-law"),
            ContinuumKind::File => write!(f, "file"),
        }
    }
}

/// Parse an emission line in format "center,fwhm,flux"
fn parse_line(s: &str) -> Result<(f64, f64, f64), String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err("Emission line must be in format 'center,fwhm,flux'".to_string());
    }
    let number = |i: usize| {
        parts[i]
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Invalid number '{}'", parts[i].trim()))
    };
    Ok((number(0)?, number(1)?, number(2)?))
}

#[derive(Parser, Debug)]
#[command(
    name = "S/N Calculator",
    about = "Predicts counts, noise and signal-to-noise for CCD imaging of a target",
    long_about = None
)]
struct Args {
    /// Continuum shape of the target
    #[arg(long, default_value_t = ContinuumKind::Blackbody)]
    continuum: ContinuumKind,

    /// Blackbody temperature in kelvin
    #[arg(long, default_value_t = 5800.0)]
    temperature: f64,

    /// Power-law index
    #[arg(long, default_value_t = 0.0)]
    index: f64,

    /// Template file, relative to --data-dir
    #[arg(long)]
    file: Option<String>,

    /// Redshift applied to the template
    #[arg(long, default_value_t = 0.0)]
    redshift: f64,

    /// Emission line added after normalization (format: "center_nm,fwhm_nm,flux_erg_s_cm2")
    #[arg(long, value_parser = parse_line)]
    line: Option<(f64, f64, f64)>,

    /// Target magnitude
    #[arg(long, default_value_t = 20.0)]
    magnitude: f64,

    /// Band the magnitude is given in
    #[arg(long, default_value_t = BandArg::V)]
    band: BandArg,

    /// Instrument description in JSON; WIYN ODI if omitted
    #[arg(long)]
    instrument: Option<PathBuf>,

    /// Directory templates and throughput tables are read from
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    #[command(flatten)]
    conditions: SharedConditionsArgs,

    #[command(flatten)]
    exposure: SharedExposureArgs,
}

fn build_continuum(args: &Args, loader: &Rc<dyn ResourceLoader>) -> Result<SharedSpectrum> {
    if args.redshift != 0.0 && args.continuum != ContinuumKind::File {
        bail!("--redshift only applies to --continuum file");
    }
    let continuum: SharedSpectrum = match args.continuum {
        ContinuumKind::Blackbody => shared(BlackbodySpectrum::new(Temperature::from_kelvin(
            args.temperature,
        ))?),
        ContinuumKind::Flat => shared(FlatSpectrum::new(1.0)?),
        ContinuumKind::PowerLaw => shared(PowerLawSpectrum::new(args.index)?),
        ContinuumKind::File => {
            let path = args
                .file
                .as_deref()
                .context("--continuum file needs --file")?;
            shared(
                TabulatedSpectrum::from_resource(loader.clone(), path, false)
                    .with_redshift(args.redshift)?,
            )
        }
    };
    Ok(continuum)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let loader: Rc<dyn ResourceLoader> = Rc::new(DirectoryLoader::new(&args.data_dir));

    let instrument = match &args.instrument {
        Some(path) => InstrumentConfig::load_from_file(path, &*loader)
            .with_context(|| format!("loading instrument {}", path.display()))?,
        None => InstrumentConfig::wiyn_odi(),
    };

    let solar = Rc::new(RefCell::new(args.conditions.solar_properties()?));
    let lunar = Rc::new(RefCell::new(args.conditions.lunar_properties()?));
    let telescope = Rc::new(RefCell::new(args.conditions.telescope_properties()?));
    let mut sky = SkySpectrum::new(solar, lunar, telescope.clone());
    let atmosphere = sky.atmosphere().clone();

    let system = StandardBand::from(args.band).system();
    let continuum = build_continuum(&args, &loader)?;
    let mut target = TargetSpectrum::new();
    target.add_constituent(shared(NormalizedSpectrum::new(
        continuum,
        args.magnitude,
        system.clone(),
    )?));
    if let Some((center, fwhm, flux)) = args.line {
        target.add_constituent(shared(GaussianLine::new(center, fwhm, flux)?));
    }

    let parameters = args.exposure.parameters();
    let telescope = telescope.borrow();
    let calculator = ExposureCalculator::new(&instrument, &telescope, &atmosphere);
    let results = calculator.compute(&mut target, &mut sky, &parameters)?;

    let sky_flux = sky.flux(SKY_REFERENCE_NM)?;
    let sky_v = -2.5 * (sky_flux / V_ZERO_POINT_550).log10();

    println!("Target:     {} at {} = {:.2}", target.name(), system, args.magnitude);
    println!(
        "Telescope:  {} at airmass {:.2}",
        telescope.config().name,
        telescope.airmass()
    );
    println!("Instrument: {}", instrument.name);
    println!("Sky:        V = {sky_v:.2} mag/arcsec²");
    println!(
        "Exposure:   {} × {:.1} s, binning {}×{}, seeing {:.2}\"",
        parameters.exposures,
        parameters.exposure_s,
        parameters.binning,
        parameters.binning,
        parameters.seeing_fwhm_arcsec
    );
    println!();
    println!(
        "{:>7} {:>7} {:>8} {:>11} {:>11} {:>10} {:>8} {:>8} {:>9} {:>8}",
        "r/FWHM", "r [px]", "npix", "total e-", "aperture e-", "sky e-/px", "noise", "S/N",
        "S/N comb", "SB S/N"
    );
    for r in &results {
        println!(
            "{:>7.2} {:>7.2} {:>8.1} {:>11.4e} {:>11.4e} {:>10.1} {:>8.2} {:>8.2} {:>9.2} {:>8.3}",
            r.aperture_multiplier,
            r.aperture_radius_px,
            r.pixels_in_aperture,
            r.total_flux,
            r.aperture_flux,
            r.sky_level,
            r.sky_noise,
            r.snr,
            r.combined_snr,
            r.surface_brightness_combined_snr
        );
    }

    if results.iter().any(|r| r.saturated) {
        eprintln!(
            "WARNING: peak pixel reaches full well ({:.0} e-)",
            instrument.detector.full_well_e
        );
    }

    Ok(())
}
