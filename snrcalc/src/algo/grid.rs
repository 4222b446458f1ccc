//! Power-of-two sampled functions.
//!
//! A [`Grid`] samples a one dimensional function on bins whose geometry is
//! fixed by three integer exponents:
//!
//! - **start** `j`: the first abscissa is 2^j
//! - **step** `k`: every bin is 2^k wide (k may be negative)
//! - **span** `m`: the grid covers 2^m, so it holds n = 2^(m-k) bins
//!
//! Every abscissa is therefore exactly representable in binary, and
//! changing resolution by a power of two is an exact merge or split of
//! neighbouring bins. Bin `i` starts at `x(i) = 2^j + i·2^k` and covers
//! `[x(i), x(i) + 2^k)`, so bins `2i` and `2i + 1` tile exactly the interval
//! of bin `i` one resolution coarser.
//!
//! # Operations
//!
//! - **Interpolation**: natural cubic spline through the bin ordinates, with
//!   the second derivatives cached until the next mutation
//! - **Resolution changes**: pairwise merge/split via [`Grid::resample`]
//! - **Rebinning**: area-preserving transfer of irregular samples onto the
//!   fixed bins via [`Grid::resample_from`]
//! - **Algebra**: scalar and grid-wise add, scale, divide, plus invert,
//!   power, raise, integrate and photon quantization

use std::borrow::Cow;

use once_cell::unsync::OnceCell;
use thiserror::Error;

use super::spline::{natural_second_derivatives, Bracket};

/// Largest supported value of `m - k` (about 16 million bins)
pub const MAX_BIN_EXPONENT: i32 = 24;

/// Errors that can occur building or combining grids
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("Invalid grid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Grid of 2^{0} bins exceeds the supported maximum of 2^24")]
    TooManyBins(i32),

    #[error("Operand starts {offset} bins from this grid's origin; offsets must be whole bins")]
    Misaligned { offset: f64 },

    #[error("Operand spanning 2^{span} cannot be resampled to bins of 2^{wanted}")]
    IncompatibleResolution { wanted: i32, span: i32 },

    #[error("Data length mismatch: {x} abscissae but {y} ordinates")]
    LengthMismatch { x: usize, y: usize },

    #[error("Abscissae must be strictly ascending (index {0})")]
    NotAscending(usize),
}

fn pow2(exp: i32) -> f64 {
    2f64.powi(exp)
}

/// Largest exponent e with 2^e <= value (value > 0)
fn floor_exponent(value: f64) -> i32 {
    let mut exp = value.log2().floor() as i32;
    while pow2(exp) > value {
        exp -= 1;
    }
    while pow2(exp + 1) <= value {
        exp += 1;
    }
    exp
}

/// Smallest exponent e with 2^e >= value (value > 0)
fn ceil_exponent(value: f64) -> i32 {
    let mut exp = value.log2().ceil() as i32;
    while pow2(exp) < value {
        exp += 1;
    }
    while pow2(exp - 1) >= value {
        exp -= 1;
    }
    exp
}

/// The (start, step, span) exponents describing a grid's bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridGeometry {
    start_exp: i32,
    step_exp: i32,
    span_exp: i32,
}

impl GridGeometry {
    /// Default wavelength grid: 256 nm start, 0.25 nm bins, 1024 nm span (4096 bins)
    pub const WAVELENGTH_DEFAULT: GridGeometry = GridGeometry {
        start_exp: 8,
        step_exp: -2,
        span_exp: 10,
    };

    /// Create a geometry from explicit exponents
    ///
    /// # Arguments
    /// * `start_exp` - j, first abscissa is 2^j
    /// * `step_exp` - k, bin width is 2^k
    /// * `span_exp` - m, total span is 2^m (must be >= k)
    pub fn new(start_exp: i32, step_exp: i32, span_exp: i32) -> Result<Self, GridError> {
        if span_exp < step_exp {
            return Err(GridError::InvalidGeometry(format!(
                "span 2^{span_exp} is narrower than one bin of 2^{step_exp}"
            )));
        }
        if span_exp - step_exp > MAX_BIN_EXPONENT {
            return Err(GridError::TooManyBins(span_exp - step_exp));
        }
        Ok(Self {
            start_exp,
            step_exp,
            span_exp,
        })
    }

    /// Snap a physical (start, bin width, range) request onto powers of two.
    ///
    /// The start and bin width round down to the nearest power of two. The
    /// range rounds up, after first being widened by however much the start
    /// moved down, so the requested interval stays covered.
    pub fn from_range(x0: f64, dx: f64, range: f64) -> Result<Self, GridError> {
        for (name, value) in [("start", x0), ("bin width", dx), ("range", range)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GridError::InvalidGeometry(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }

        let start_exp = floor_exponent(x0);
        let step_exp = floor_exponent(dx);
        let widened = range + (x0 - pow2(start_exp));
        let span_exp = ceil_exponent(widened).max(step_exp);

        Self::new(start_exp, step_exp, span_exp)
    }

    pub fn start_exp(&self) -> i32 {
        self.start_exp
    }

    pub fn step_exp(&self) -> i32 {
        self.step_exp
    }

    pub fn span_exp(&self) -> i32 {
        self.span_exp
    }

    /// Number of bins, 2^(m-k)
    pub fn len(&self) -> usize {
        1usize << (self.span_exp - self.step_exp)
    }

    /// First abscissa, 2^j
    pub fn start(&self) -> f64 {
        pow2(self.start_exp)
    }

    /// Bin width, 2^k
    pub fn step(&self) -> f64 {
        pow2(self.step_exp)
    }

    /// Total span, 2^m
    pub fn span(&self) -> f64 {
        pow2(self.span_exp)
    }
}

/// A sampled function on power-of-two bins.
///
/// Ordinates are owned exclusively by the grid. The spline second
/// derivatives are computed on first interpolation and discarded by any
/// mutation.
#[derive(Debug, Clone)]
pub struct Grid {
    geometry: GridGeometry,
    y: Vec<f64>,
    ypp: OnceCell<Vec<f64>>,
}

impl Grid {
    /// Create a zero-filled grid with the given geometry
    pub fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            y: vec![0.0; geometry.len()],
            ypp: OnceCell::new(),
        }
    }

    /// Create a zero-filled grid from explicit exponents
    pub fn with_exponents(start_exp: i32, step_exp: i32, span_exp: i32) -> Result<Self, GridError> {
        Ok(Self::new(GridGeometry::new(start_exp, step_exp, span_exp)?))
    }

    /// Create a zero-filled grid covering a physical range, see [`GridGeometry::from_range`]
    pub fn from_range(x0: f64, dx: f64, range: f64) -> Result<Self, GridError> {
        Ok(Self::new(GridGeometry::from_range(x0, dx, range)?))
    }

    /// Reallocate with a new geometry, zero-filled
    pub fn reset(&mut self, geometry: GridGeometry) {
        self.geometry = geometry;
        self.clear();
    }

    /// Reallocate from explicit exponents, zero-filled
    pub fn reset_exponents(
        &mut self,
        start_exp: i32,
        step_exp: i32,
        span_exp: i32,
    ) -> Result<(), GridError> {
        self.reset(GridGeometry::new(start_exp, step_exp, span_exp)?);
        Ok(())
    }

    /// Reallocate to cover a physical range, zero-filled
    pub fn reset_range(&mut self, x0: f64, dx: f64, range: f64) -> Result<(), GridError> {
        self.reset(GridGeometry::from_range(x0, dx, range)?);
        Ok(())
    }

    /// Zero every ordinate, reallocating buffers dropped by [`Grid::release`]
    pub fn clear(&mut self) {
        self.y = vec![0.0; self.geometry.len()];
        self.invalidate();
    }

    /// Free the ordinate buffers while keeping the geometry.
    ///
    /// Reads return 0 until the next [`Grid::clear`] or [`Grid::reset`].
    pub fn release(&mut self) {
        self.y = Vec::new();
        self.invalidate();
    }

    /// Replace geometry and ordinates with a copy of `other`
    pub fn assign(&mut self, other: &Grid) {
        self.geometry = other.geometry;
        self.y.clone_from(&other.y);
        self.invalidate();
    }

    pub fn is_released(&self) -> bool {
        self.y.is_empty()
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn start(&self) -> f64 {
        self.geometry.start()
    }

    pub fn step(&self) -> f64 {
        self.geometry.step()
    }

    /// Abscissa of bin `i`
    pub fn x(&self, i: usize) -> f64 {
        self.geometry.start() + i as f64 * self.geometry.step()
    }

    /// Ordinate of bin `i`, or 0 outside the grid
    pub fn y(&self, i: usize) -> f64 {
        self.y.get(i).copied().unwrap_or(0.0)
    }

    /// Spline second derivative at bin `i`, or 0 outside the grid
    pub fn ypp(&self, i: usize) -> f64 {
        self.spline().get(i).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.y
    }

    /// Set a single ordinate; indices outside the grid are ignored
    pub fn set_value(&mut self, i: usize, value: f64) {
        if let Some(slot) = self.y.get_mut(i) {
            *slot = value;
            self.invalidate();
        }
    }

    /// Overwrite every ordinate with `f(x(i))`
    pub fn fill_with<F>(&mut self, mut f: F)
    where
        F: FnMut(f64) -> f64,
    {
        if self.is_released() {
            self.clear();
        }
        for i in 0..self.y.len() {
            self.y[i] = f(self.x(i));
        }
        self.invalidate();
    }

    /// Add `f(x(i))` to every ordinate, stopping at the first error
    pub fn accumulate_with<F, E>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(f64) -> Result<f64, E>,
    {
        if self.is_released() {
            self.clear();
        }
        self.invalidate();
        for i in 0..self.y.len() {
            let x = self.x(i);
            self.y[i] += f(x)?;
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.ypp = OnceCell::new();
    }

    fn map_in_place<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64,
    {
        for v in self.y.iter_mut() {
            *v = f(*v);
        }
        self.invalidate();
    }

    fn spline(&self) -> &[f64] {
        self.ypp.get_or_init(|| {
            let x: Vec<f64> = (0..self.y.len()).map(|i| self.x(i)).collect();
            natural_second_derivatives(&x, &self.y)
        })
    }

    /// Index of the bin whose interval contains `x`
    pub fn bin_at(&self, x: f64) -> Option<usize> {
        let position = ((x - self.start()) / self.step()).floor();
        if position >= 0.0 && position < self.len() as f64 {
            Some(position as usize)
        } else {
            None
        }
    }

    /// Piecewise-constant lookup of the bin containing `x`, 0 outside the grid
    pub fn value_at(&self, x: f64) -> f64 {
        self.bin_at(x).map(|i| self.y(i)).unwrap_or(0.0)
    }

    /// Natural cubic spline interpolation through the bin ordinates.
    ///
    /// Returns 0.0 outside `[x(0), x(n-1)]` and for a zero-width bracket
    /// (single-bin grids).
    pub fn interp(&self, x: f64) -> f64 {
        let n = self.y.len();
        if n == 0 || x < self.x(0) || x > self.x(n - 1) {
            return 0.0;
        }

        let ypp = self.spline();

        // Bisection for the bracketing bins
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.x(mid) > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        Bracket {
            x_lo: self.x(lo),
            x_hi: self.x(hi),
            y_lo: self.y[lo],
            y_hi: self.y[hi],
            ypp_lo: ypp[lo],
            ypp_hi: ypp[hi],
        }
        .evaluate(x)
    }

    /// Change the bin width to 2^`step_exp` by pairwise merging or splitting.
    ///
    /// Merging averages neighbours and splitting duplicates them. Both keep
    /// every bin's interval in place, so features stay at their wavelength
    /// and the integral is preserved exactly. The target is clamped to the
    /// range the span supports.
    pub fn resample(&mut self, step_exp: i32) {
        let span = self.geometry.span_exp;
        let target = step_exp.clamp(span - MAX_BIN_EXPONENT, span);
        if target != step_exp {
            log::debug!("Clamping resample from 2^{step_exp} to 2^{target} for span 2^{span}");
        }

        while self.geometry.step_exp < target {
            self.y = self
                .y
                .chunks(2)
                .map(|pair| pair.iter().sum::<f64>() / 2.0)
                .collect();
            self.geometry.step_exp += 1;
        }
        while self.geometry.step_exp > target {
            self.y = self.y.iter().flat_map(|&v| [v, v]).collect();
            self.geometry.step_exp -= 1;
        }
        self.invalidate();
    }

    /// Area-preserving rebinning of irregular samples onto this grid.
    ///
    /// Sample `i` is taken to cover the interval between the midpoints to its
    /// neighbours; the end samples reach one full neighbour gap outwards. Each
    /// overlapping (sample zone, bin) pair adds
    /// `value × overlap / bin_width` to the bin, so the integral of the
    /// input is preserved wherever it falls inside the grid. Contributions
    /// are added to the current ordinates; callers start from a cleared grid.
    ///
    /// # Arguments
    /// * `xs` - Sample abscissae, strictly ascending
    /// * `ys` - Sample values, same length as `xs`
    pub fn resample_from(&mut self, xs: &[f64], ys: &[f64]) -> Result<(), GridError> {
        if xs.len() != ys.len() {
            return Err(GridError::LengthMismatch {
                x: xs.len(),
                y: ys.len(),
            });
        }
        if let Some(i) = (1..xs.len()).find(|&i| xs[i] <= xs[i - 1]) {
            return Err(GridError::NotAscending(i));
        }
        if xs.is_empty() {
            return Ok(());
        }
        if self.is_released() {
            self.clear();
        }

        let n = self.y.len();
        let count = xs.len();
        let dx = self.step();
        let origin = self.start();
        let edge = |b: usize| origin + b as f64 * dx;

        let zone = |i: usize| -> (f64, f64) {
            let lo = if i > 0 {
                0.5 * (xs[i - 1] + xs[i])
            } else if count > 1 {
                xs[0] - (xs[1] - xs[0])
            } else {
                xs[0] - 0.5 * dx
            };
            let hi = if i + 1 < count {
                0.5 * (xs[i] + xs[i + 1])
            } else if count > 1 {
                xs[i] + (xs[i] - xs[i - 1])
            } else {
                xs[0] + 0.5 * dx
            };
            (lo, hi)
        };

        // Two monotone cursors: `i` over input zones, `bin` over output bins
        let mut bin = 0;
        for (i, &value) in ys.iter().enumerate() {
            let (lo, hi) = zone(i);
            while bin < n && edge(bin + 1) <= lo {
                bin += 1;
            }

            let mut b = bin;
            while b < n && edge(b) < hi {
                let overlap = hi.min(edge(b + 1)) - lo.max(edge(b));
                if overlap > 0.0 {
                    self.y[b] += value * overlap / dx;
                }
                b += 1;
            }
        }

        self.invalidate();
        Ok(())
    }

    /// Resample `other` to this grid's bin width and find its bin offset.
    ///
    /// Operand bin `i - offset` lines up with bin `i` of this grid.
    fn aligned<'a>(&self, other: &'a Grid) -> Result<(Cow<'a, Grid>, isize), GridError> {
        let step_exp = self.geometry.step_exp;
        let operand = if other.geometry.step_exp == step_exp {
            Cow::Borrowed(other)
        } else {
            let span = other.geometry.span_exp;
            if step_exp > span || step_exp < span - MAX_BIN_EXPONENT {
                return Err(GridError::IncompatibleResolution {
                    wanted: step_exp,
                    span,
                });
            }
            let mut resampled = other.clone();
            resampled.resample(step_exp);
            Cow::Owned(resampled)
        };

        let offset = (operand.start() - self.start()) / self.step();
        if !offset.is_finite() || offset.fract() != 0.0 {
            return Err(GridError::Misaligned { offset });
        }

        Ok((operand, offset as isize))
    }

    fn combine<F>(&mut self, other: &Grid, op: F) -> Result<(), GridError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let (operand, offset) = self.aligned(other)?;
        for (i, v) in self.y.iter_mut().enumerate() {
            let j = i as isize - offset;
            let rhs = if j >= 0 { operand.y(j as usize) } else { 0.0 };
            *v = op(*v, rhs);
        }
        self.invalidate();
        Ok(())
    }

    /// Add a constant to every bin
    pub fn add(&mut self, value: f64) {
        self.map_in_place(|v| v + value);
    }

    /// Add another grid bin for bin, after matching its resolution and offset
    pub fn add_grid(&mut self, other: &Grid) -> Result<(), GridError> {
        self.combine(other, |a, b| a + b)
    }

    /// Multiply every bin by a constant
    pub fn scale(&mut self, factor: f64) {
        self.map_in_place(|v| v * factor);
    }

    /// Multiply by another grid bin for bin; bins it does not cover become 0
    pub fn scale_grid(&mut self, other: &Grid) -> Result<(), GridError> {
        self.combine(other, |a, b| a * b)
    }

    /// Renormalize the whole grid so that `interp(x) == value`.
    ///
    /// No-op when the grid interpolates to zero at `x`.
    pub fn scale_at(&mut self, x: f64, value: f64) {
        let current = self.interp(x);
        if current != 0.0 {
            self.scale(value / current);
        }
    }

    /// Divide by another grid bin for bin; zero divisors leave the bin unchanged
    pub fn div_grid(&mut self, other: &Grid) -> Result<(), GridError> {
        self.combine(other, |a, b| if b != 0.0 { a / b } else { a })
    }

    /// Replace each bin by its reciprocal; zero bins stay zero
    pub fn invert(&mut self) {
        self.map_in_place(|v| if v != 0.0 { 1.0 / v } else { 0.0 });
    }

    /// Raise each bin to the power `exponent`
    pub fn power(&mut self, exponent: f64) {
        self.map_in_place(|v| v.powf(exponent));
    }

    /// Replace each bin `v` by `base^v`
    pub fn raise(&mut self, base: f64) {
        self.map_in_place(|v| base.powf(v));
    }

    /// Sum of y·dx over all bins
    pub fn integrate(&self) -> f64 {
        self.y.iter().sum::<f64>() * self.step()
    }

    /// Convert energy flux to photon flux in place and return the integral.
    ///
    /// Each bin is multiplied by `x(i) / hc`, so `hc` must use the same
    /// length unit as the abscissa.
    pub fn quantize(&mut self, hc: f64) -> f64 {
        for i in 0..self.y.len() {
            let x = self.x(i);
            self.y[i] *= x / hc;
        }
        self.invalidate();
        self.integrate()
    }
}
