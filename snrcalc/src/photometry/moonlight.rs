//! Scattered moonlight
//!
//! Brightness follows Krisciunas & Schaefer (1991, PASP 103, 1033): a
//! scattering function of the Moon-target separation ρ with a Rayleigh and a
//! Mie part, the lunar illuminance as a function of phase angle α, and
//! extinction along both the Moon's and the target's line of sight. The
//! spectrum is sunlight reflected by the lunar surface, reddened by the
//! lunar albedo, and blued by the same Rayleigh and Mie weights.

use crate::algo::grid::{Grid, GridGeometry};
use crate::conditions::LunarProperties;
use crate::units::AngleExt;

use super::atmosphere::Atmosphere;
use super::magnitude::{surface_brightness_flux, SKY_REFERENCE_NM};
use super::solar::solar_irradiance;
use super::spectrum::SpectrumError;

/// Rayleigh part of the scattering function f(ρ)
pub fn rayleigh_scattering(separation_deg: f64) -> f64 {
    let cos_rho = separation_deg.to_radians().cos();
    10f64.powf(5.36) * (1.06 + cos_rho * cos_rho)
}

/// Mie (aerosol) part of the scattering function f(ρ)
pub fn mie_scattering(separation_deg: f64) -> f64 {
    10f64.powf(6.15 - separation_deg / 40.0)
}

/// Full scattering function f(ρ) = 10^5.36(1.06 + cos²ρ) + 10^(6.15 − ρ/40)
pub fn scattering_function(separation_deg: f64) -> f64 {
    rayleigh_scattering(separation_deg) + mie_scattering(separation_deg)
}

/// Lunar illuminance I* = 10^(−0.4(3.84 + 0.026|α| + 4×10⁻⁹α⁴)), α in degrees
pub fn lunar_illuminance(phase_deg: f64) -> f64 {
    let alpha = phase_deg.abs();
    10f64.powf(-0.4 * (3.84 + 0.026 * alpha + 4e-9 * alpha.powi(4)))
}

/// Sky brightness from moonlight in nanolamberts.
///
/// # Arguments
/// * `separation_deg` - Moon-target separation ρ
/// * `phase_deg` - Lunar phase angle α, 0° full
/// * `k_v` - V-band extinction coefficient, mag/airmass
/// * `moon_airmass` - Airmass toward the Moon
/// * `target_airmass` - Airmass toward the target
pub fn moon_brightness_nanolamberts(
    separation_deg: f64,
    phase_deg: f64,
    k_v: f64,
    moon_airmass: f64,
    target_airmass: f64,
) -> f64 {
    scattering_function(separation_deg)
        * lunar_illuminance(phase_deg)
        * 10f64.powf(-0.4 * k_v * moon_airmass)
        * (1.0 - 10f64.powf(-0.4 * k_v * target_airmass))
}

/// Convert a surface brightness in nanolamberts to V mag/arcsec²
pub fn nanolamberts_to_v(brightness_nl: f64) -> f64 {
    (20.7233 - (brightness_nl / 34.08).ln()) / 0.92104
}

/// Normal albedo of the lunar surface, rising slowly toward the red
pub fn lunar_albedo(wavelength_nm: f64) -> f64 {
    (0.07 + 0.10 * (wavelength_nm - 300.0) / 800.0).max(0.05)
}

/// V surface brightness of moonlit sky, `None` when the Moon has set
pub fn moon_v_brightness(
    lunar: &LunarProperties,
    target_airmass: f64,
    atmosphere: &Atmosphere,
) -> Option<f64> {
    let moon_airmass = lunar.airmass()?;
    let k_v = atmosphere.extinction_at(SKY_REFERENCE_NM);
    let brightness = moon_brightness_nanolamberts(
        lunar.elongation().as_degrees(),
        lunar.phase().as_degrees(),
        k_v,
        moon_airmass,
        target_airmass,
    );
    (brightness > 0.0).then(|| nanolamberts_to_v(brightness))
}

/// Moonlight F_λ per arcsec² toward a target at `target_airmass`.
///
/// All zero when the Moon is below the horizon.
pub fn moonlight_spectrum(
    lunar: &LunarProperties,
    target_airmass: f64,
    atmosphere: &Atmosphere,
) -> Result<Grid, SpectrumError> {
    let (Some(moon_airmass), Some(v)) = (
        lunar.airmass(),
        moon_v_brightness(lunar, target_airmass, atmosphere),
    ) else {
        log::debug!(
            "Moon below the horizon (zenith distance {:.1}°), no moonlight",
            lunar.zenith_distance().as_degrees()
        );
        let mut dark = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
        dark.clear();
        return Ok(dark);
    };

    let separation = lunar.elongation().as_degrees();
    let rayleigh = rayleigh_scattering(separation);
    let mie = mie_scattering(separation);

    let mut grid = solar_irradiance();
    let mut reflectance = Grid::new(GridGeometry::WAVELENGTH_DEFAULT);
    reflectance.fill_with(|x| {
        let ratio = SKY_REFERENCE_NM / x;
        lunar_albedo(x) * (rayleigh * ratio.powi(4) + mie * ratio.powf(1.3))
    });
    grid.scale_grid(&reflectance)?;

    // Light reaching the scattering layer, then the scattered fraction
    atmosphere.apply(&mut grid, moon_airmass)?;
    let mut scattered = atmosphere.transmission(target_airmass);
    scattered.scale(-1.0);
    scattered.add(1.0);
    grid.scale_grid(&scattered)?;

    grid.scale_at(SKY_REFERENCE_NM, surface_brightness_flux(v));
    Ok(grid)
}
