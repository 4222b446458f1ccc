//! Natural cubic spline support for sampled functions.
//!
//! The spline passes through every knot and has zero second derivative at
//! both ends. Construction solves the tridiagonal system for the knot second
//! derivatives once; evaluation blends the two bracketing knots.
//!
//! # Mathematical Background
//!
//! Between knots x_lo and x_hi with h = x_hi - x_lo the interpolant is
//!
//! S(x) = a·y_lo + b·y_hi + ((a³ - a)·y''_lo + (b³ - b)·y''_hi)·h²/6
//!
//! where a = (x_hi - x)/h and b = 1 - a.

/// Compute knot second derivatives for a natural cubic spline.
///
/// Uses tridiagonal elimination with the natural boundary condition
/// (y'' = 0 at both ends). Fewer than three knots yield all zeros, which
/// reduces the blend to linear interpolation.
///
/// # Arguments
/// * `x` - Knot abscissae, strictly ascending
/// * `y` - Knot ordinates, same length as `x`
///
/// # Returns
/// Second derivative at each knot
pub fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len().min(y.len());
    let mut ypp = vec![0.0; n];
    if n < 3 {
        return ypp;
    }

    let mut u = vec![0.0; n];

    // Forward elimination
    for i in 1..n - 1 {
        let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
        let p = sig * ypp[i - 1] + 2.0;
        ypp[i] = (sig - 1.0) / p;
        let slope_diff =
            (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
        u[i] = (6.0 * slope_diff / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
    }

    // Back substitution, natural end condition leaves ypp[n - 1] = 0
    ypp[n - 1] = 0.0;
    for i in (0..n - 1).rev() {
        ypp[i] = ypp[i] * ypp[i + 1] + u[i];
    }

    ypp
}

/// A bracketing knot pair for spline evaluation
#[derive(Debug, Clone, Copy)]
pub struct Bracket {
    pub x_lo: f64,
    pub x_hi: f64,
    pub y_lo: f64,
    pub y_hi: f64,
    pub ypp_lo: f64,
    pub ypp_hi: f64,
}

impl Bracket {
    /// Evaluate the cubic blend at `x`.
    ///
    /// Returns 0.0 for a zero-width bracket.
    pub fn evaluate(&self, x: f64) -> f64 {
        let h = self.x_hi - self.x_lo;
        if h == 0.0 {
            return 0.0;
        }

        let a = (self.x_hi - x) / h;
        let b = (x - self.x_lo) / h;

        a * self.y_lo
            + b * self.y_hi
            + ((a * a * a - a) * self.ypp_lo + (b * b * b - b) * self.ypp_hi) * (h * h) / 6.0
    }
}
