//! Target spectra built as the sum of independent constituents

use std::rc::{Rc, Weak};

use crate::notify::{observer_handle, Change, ChangeObserver};

use super::spectrum::{SharedSpectrum, SpectralGrid, Spectrum, SpectrumError};

/// Sum of constituent spectra, e.g. a stellar continuum plus emission lines.
///
/// Constituents are shared, not owned: whoever built them may keep editing
/// their parameters, and every such edit marks this composite stale through
/// the constituent's tracker. After an update each bin holds the sum of the
/// constituents' flux at that bin's wavelength.
pub struct TargetSpectrum {
    storage: SpectralGrid,
    constituents: Vec<SharedSpectrum>,
}

impl Default for TargetSpectrum {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetSpectrum {
    pub fn new() -> Self {
        Self {
            storage: SpectralGrid::new(false),
            constituents: Vec::new(),
        }
    }

    /// Handle through which constituents mark this composite stale
    fn handle(&self) -> Weak<dyn ChangeObserver> {
        observer_handle(self.storage.tracker())
    }

    /// Add a constituent; returns false if this exact instance is already present
    pub fn add_constituent(&mut self, spectrum: SharedSpectrum) -> bool {
        if self.contains(&spectrum) {
            log::warn!(
                "Constituent {} already part of the target, ignoring",
                describe(&spectrum)
            );
            return false;
        }

        spectrum.borrow().tracker().subscribe(self.handle());
        self.constituents.push(spectrum);
        self.storage.tracker().invalidate(Change::Membership);
        true
    }

    /// Remove a constituent by identity; returns false if it was not present
    pub fn remove_constituent(&mut self, spectrum: &SharedSpectrum) -> bool {
        let Some(index) = self
            .constituents
            .iter()
            .position(|c| Rc::ptr_eq(c, spectrum))
        else {
            return false;
        };

        let removed = self.constituents.remove(index);
        if let Ok(removed) = removed.try_borrow() {
            removed.tracker().unsubscribe(&self.handle());
        }
        log::debug!("Removed constituent {}", describe(spectrum));
        self.storage.tracker().invalidate(Change::Membership);
        true
    }

    pub fn contains(&self, spectrum: &SharedSpectrum) -> bool {
        self.constituents.iter().any(|c| Rc::ptr_eq(c, spectrum))
    }

    pub fn constituents(&self) -> &[SharedSpectrum] {
        &self.constituents
    }

    pub fn len(&self) -> usize {
        self.constituents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }
}

fn describe(spectrum: &SharedSpectrum) -> String {
    spectrum
        .try_borrow()
        .map(|s| s.name())
        .unwrap_or_else(|_| "<in use>".to_string())
}

impl Drop for TargetSpectrum {
    fn drop(&mut self) {
        let handle = self.handle();
        for constituent in &self.constituents {
            if let Ok(constituent) = constituent.try_borrow() {
                constituent.tracker().unsubscribe(&handle);
            }
        }
    }
}

impl Spectrum for TargetSpectrum {
    fn name(&self) -> String {
        if self.constituents.is_empty() {
            return "empty target".to_string();
        }
        self.constituents
            .iter()
            .map(describe)
            .collect::<Vec<_>>()
            .join(" + ")
    }

    fn spectral_grid(&self) -> &SpectralGrid {
        &self.storage
    }

    fn spectral_grid_mut(&mut self) -> &mut SpectralGrid {
        &mut self.storage
    }

    fn update(&mut self) -> Result<(), SpectrumError> {
        let grid = self.storage.grid_mut();
        grid.clear();
        for constituent in &self.constituents {
            let mut constituent = constituent.borrow_mut();
            grid.accumulate_with(|x| constituent.flux(x))?;
            // Templates can be large; rebuild them on the next read instead
            constituent.release();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::emission_line::GaussianLine;
    use crate::photometry::spectrum::shared;
    use crate::photometry::stellar::FlatSpectrum;
    use approx::assert_relative_eq;

    #[test]
    fn test_sum_and_removal() {
        let one: SharedSpectrum = shared(FlatSpectrum::new(1.0).unwrap());
        let two: SharedSpectrum = shared(FlatSpectrum::new(2.0).unwrap());

        let mut target = TargetSpectrum::new();
        assert!(target.add_constituent(one.clone()));
        assert!(target.add_constituent(two.clone()));
        assert_relative_eq!(target.flux(450.0).unwrap(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(target.flux(1000.0).unwrap(), 3.0, epsilon = 1e-12);

        assert!(target.remove_constituent(&two));
        assert!(target.tracker().is_stale());
        assert_relative_eq!(target.flux(450.0).unwrap(), 1.0, epsilon = 1e-12);
        assert!(!target.remove_constituent(&two));
        assert_eq!(two.borrow().tracker().observer_count(), 0);
    }

    #[test]
    fn test_duplicate_rejected() {
        let one: SharedSpectrum = shared(FlatSpectrum::new(1.0).unwrap());
        let mut target = TargetSpectrum::new();
        assert!(target.add_constituent(one.clone()));
        assert!(!target.add_constituent(one.clone()));
        assert_eq!(target.len(), 1);
        assert_relative_eq!(target.flux(500.0).unwrap(), 1.0, epsilon = 1e-12);

        // An equal but distinct instance is a separate constituent
        let other: SharedSpectrum = shared(FlatSpectrum::new(1.0).unwrap());
        assert!(target.add_constituent(other));
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn test_constituent_edit_propagates() {
        let flat = shared(FlatSpectrum::new(1.0).unwrap());
        let mut target = TargetSpectrum::new();
        target.add_constituent(flat.clone());
        target.ensure_fresh().unwrap();
        assert!(!target.tracker().is_stale());

        flat.borrow_mut().set_level(5.0).unwrap();
        assert!(target.tracker().is_stale());
        assert_relative_eq!(target.flux(700.0).unwrap(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constituents_released_after_update() {
        let flat = shared(FlatSpectrum::new(1.0).unwrap());
        let line = shared(GaussianLine::new(600.0, 2.0, 1.0).unwrap());
        let mut target = TargetSpectrum::new();
        target.add_constituent(flat.clone());
        target.add_constituent(line.clone());

        let grid = target.snapshot().unwrap();
        assert!(flat.borrow().spectral_grid().grid().is_released());
        // Flat continuum over the whole grid plus the unit-area line
        assert_relative_eq!(
            grid.integrate(),
            grid.len() as f64 * grid.step() + 1.0,
            max_relative = 1e-6
        );
        assert_eq!(target.name(), "flat 1.000e0 + line 600.0 nm");
    }

    #[test]
    fn test_empty_target_is_zero() {
        let mut target = TargetSpectrum::new();
        assert!(target.is_empty());
        assert_eq!(target.flux(500.0).unwrap(), 0.0);
    }
}
