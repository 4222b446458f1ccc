//! End-to-end exposure predictions: target and sky spectra through the
//! atmosphere, telescope and instrument into photometry

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use approx::assert_relative_eq;
use snrcalc::conditions::{LunarProperties, SolarProperties};
use snrcalc::exposure::{ExposureCalculator, ExposureParameters, ExposureResult};
use snrcalc::hardware::instrument::InstrumentConfig;
use snrcalc::hardware::telescope::{models, TelescopeProperties};
use snrcalc::io::loader::DirectoryLoader;
use snrcalc::photometry::{
    shared, Band, BlackbodySpectrum, Filter, GaussianLine, NormalizedSpectrum, SharedSpectrum,
    SkySpectrum, StandardBand, TargetSpectrum,
};
use snrcalc::units::{Angle, AngleExt, Temperature, TemperatureExt};
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Observation {
    lunar: Rc<RefCell<LunarProperties>>,
    telescope: Rc<RefCell<TelescopeProperties>>,
    sky: SkySpectrum,
    star: Rc<RefCell<NormalizedSpectrum>>,
    target: TargetSpectrum,
}

/// A solar-type star of V = 20 under a dark sky at the zenith with WIYN
fn observation() -> Observation {
    let solar = Rc::new(RefCell::new(SolarProperties::default()));
    let lunar = Rc::new(RefCell::new(LunarProperties::default()));
    let telescope = Rc::new(RefCell::new(TelescopeProperties::new(
        models::WIYN_3_5M.clone(),
    )));
    let sky = SkySpectrum::new(solar, lunar.clone(), telescope.clone());

    let continuum: SharedSpectrum =
        shared(BlackbodySpectrum::new(Temperature::from_kelvin(5800.0)).unwrap());
    let star = shared(NormalizedSpectrum::new(continuum, 20.0, StandardBand::V.system()).unwrap());
    let mut target = TargetSpectrum::new();
    assert!(target.add_constituent(star.clone()));

    Observation {
        lunar,
        telescope,
        sky,
        star,
        target,
    }
}

fn v_band_odi() -> InstrumentConfig {
    let band = Band::from_nm_bounds(500.0, 600.0).unwrap();
    InstrumentConfig::wiyn_odi()
        .with_filter(&Filter::from_notch(&band, 0.9).unwrap())
        .unwrap()
}

fn run(
    obs: &mut Observation,
    instrument: &InstrumentConfig,
    parameters: &ExposureParameters,
) -> Vec<ExposureResult> {
    let atmosphere = obs.sky.atmosphere().clone();
    let telescope = obs.telescope.borrow();
    let calculator = ExposureCalculator::new(instrument, &telescope, &atmosphere);
    calculator
        .compute(&mut obs.target, &mut obs.sky, parameters)
        .unwrap()
}

#[test]
fn test_dark_sky_point_source() {
    init_logging();
    let mut obs = observation();
    let instrument = v_band_odi();
    let parameters = ExposureParameters::default();

    let results = run(&mut obs, &instrument, &parameters);
    assert_eq!(results.len(), parameters.aperture_multipliers.len());

    for pair in results.windows(2) {
        assert!(pair[1].aperture_flux > pair[0].aperture_flux);
        assert!(pair[1].pixels_in_aperture > pair[0].pixels_in_aperture);
    }
    for r in &results {
        assert!(r.snr.is_finite() && r.snr > 0.0);
        assert!(r.sky_level > 0.0);
        assert!(!r.saturated);
        assert_relative_eq!(r.combined_snr, r.snr);
    }

    // V = 20 in five minutes on a 3.5 m is a solid detection, not a bright star
    let one_fwhm = results[1];
    assert!(one_fwhm.snr > 50.0 && one_fwhm.snr < 1000.0, "S/N {}", one_fwhm.snr);
}

#[test]
fn test_exposure_sequence_scaling() {
    init_logging();
    let mut obs = observation();
    let instrument = v_band_odi();
    let single = run(&mut obs, &instrument, &ExposureParameters::default())[1];

    let stacked = run(
        &mut obs,
        &instrument,
        &ExposureParameters {
            exposures: 4,
            ..Default::default()
        },
    )[1];
    assert_relative_eq!(stacked.snr, single.snr);
    assert_relative_eq!(stacked.combined_snr, 2.0 * single.snr, max_relative = 1e-12);

    let longer = run(
        &mut obs,
        &instrument,
        &ExposureParameters {
            exposure_s: 1200.0,
            ..Default::default()
        },
    )[1];
    // Between the background limit (√t) and the read-noise limit (t)
    let gain = longer.snr / single.snr;
    assert!(gain > 2.0 - 1e-9 && gain < 4.0, "gain {gain}");
}

#[test]
fn test_moonrise_costs_signal_to_noise() {
    init_logging();
    let mut obs = observation();
    let instrument = v_band_odi();
    let parameters = ExposureParameters::default();
    let dark = run(&mut obs, &instrument, &parameters)[1];

    obs.lunar
        .borrow_mut()
        .set_geometry(
            Angle::from_degrees(30.0),
            Angle::from_degrees(20.0),
            Angle::from_degrees(40.0),
        )
        .unwrap();
    let bright = run(&mut obs, &instrument, &parameters)[1];

    assert!(bright.sky_level > 5.0 * dark.sky_level);
    assert!(bright.snr < dark.snr);
    assert_relative_eq!(bright.total_flux, dark.total_flux, max_relative = 1e-12);
}

#[test]
fn test_target_edits_propagate() {
    init_logging();
    let mut obs = observation();
    let instrument = v_band_odi();
    let parameters = ExposureParameters::default();
    let faint = run(&mut obs, &instrument, &parameters)[0];

    obs.star.borrow_mut().set_magnitude(19.0).unwrap();
    let brighter = run(&mut obs, &instrument, &parameters)[0];
    assert_relative_eq!(
        brighter.total_flux / faint.total_flux,
        10f64.powf(0.4),
        max_relative = 1e-9
    );

    // An emission line inside the passband adds its flux on top
    let line = shared(GaussianLine::new(550.0, 1.0, 1e-14).unwrap());
    assert!(obs.target.add_constituent(line));
    let with_line = run(&mut obs, &instrument, &parameters)[0];
    assert!(with_line.total_flux > brighter.total_flux);
}

#[test]
fn test_higher_airmass_dims_target_and_brightens_sky() {
    init_logging();
    let mut obs = observation();
    let instrument = v_band_odi();
    let parameters = ExposureParameters::default();
    let zenith = run(&mut obs, &instrument, &parameters)[1];

    obs.telescope.borrow_mut().set_airmass(2.0).unwrap();
    let low = run(&mut obs, &instrument, &parameters)[1];

    assert!(low.total_flux < zenith.total_flux);
    assert!(low.sky_level > zenith.sky_level);
    assert!(low.snr < zenith.snr);
}

#[test]
fn test_instrument_from_json_file() {
    init_logging();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("flat_qe.dat"), "! flat QE\n300 0.8\n1100 0.8\n").unwrap();
    let config_path = dir.path().join("camera.json");
    fs::write(
        &config_path,
        r#"{
            "name": "boxed camera",
            "detector": { "name": "ccd", "read_noise_e": 5.0, "dark_current_e_per_s": 0.001,
                          "plate_scale_arcsec": 0.25, "full_well_e": 200000.0 },
            "throughput": [
                { "type": "box", "lower_nm": 500.0, "upper_nm": 600.0, "value": 1.0 },
                { "type": "table", "path": "flat_qe.dat" }
            ]
        }"#,
    )
    .unwrap();

    let loader = DirectoryLoader::new(dir.path());
    let from_file = InstrumentConfig::load_from_file(&config_path, &loader).unwrap();
    let band = Band::from_nm_bounds(500.0, 600.0).unwrap();
    let in_code = InstrumentConfig::new(
        "same camera",
        from_file.detector.clone(),
        Filter::from_notch(&band, 0.8).unwrap(),
    );

    let mut obs = observation();
    let parameters = ExposureParameters::default();
    let a = run(&mut obs, &from_file, &parameters)[1];
    let b = run(&mut obs, &in_code, &parameters)[1];
    assert_relative_eq!(a.total_flux, b.total_flux, max_relative = 1e-9);
    assert_relative_eq!(a.sky_level, b.sky_level, max_relative = 1e-9);
    assert_relative_eq!(a.snr, b.snr, max_relative = 1e-9);
}
