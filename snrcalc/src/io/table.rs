//! Two-column `(x, y)` tables for tabulated physical datasets.
//!
//! Throughput curves, extinction curves, template spectra and sky datasets
//! are all stored as whitespace separated wavelength/value pairs, one pair
//! per line. Everything after a `#` or `!` is a comment and blank lines are
//! skipped. Any other malformed line is a data-format error; nothing is
//! silently dropped.

use std::io::BufRead;

use thiserror::Error;

use crate::algo::grid::{Grid, GridError, GridGeometry};

/// Data-format errors raised while reading tabulated data
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Line {line}: expected 2 columns, found {found}")]
    ColumnCount { line: usize, found: usize },

    #[error("Line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    #[error("Line {line}: abscissa {x} is not greater than the previous value")]
    NotAscending { line: usize, x: f64 },

    #[error("Abscissa and ordinate columns differ in length ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },

    #[error("Table contains no data")]
    Empty,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validated table of strictly ascending `(x, y)` samples
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Table {
    /// Build a table from columns, checking length, ordering and emptiness
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, TableError> {
        if x.len() != y.len() {
            return Err(TableError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.is_empty() {
            return Err(TableError::Empty);
        }
        if let Some(i) = (1..x.len()).find(|&i| x[i] <= x[i - 1]) {
            return Err(TableError::NotAscending {
                line: i + 1,
                x: x[i],
            });
        }
        Ok(Self { x, y })
    }

    /// Build a table from `(x, y)` pairs
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, TableError> {
        let (x, y) = pairs.iter().copied().unzip();
        Self::new(x, y)
    }

    /// Table from compiled-in data known to be ascending and non-empty
    pub(crate) fn from_static(pairs: &[(f64, f64)]) -> Self {
        debug_assert!(!pairs.is_empty());
        debug_assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
        let (x, y) = pairs.iter().copied().unzip();
        Self { x, y }
    }

    /// Parse a whitespace separated two-column stream
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, TableError> {
        let mut x = Vec::new();
        let mut y = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            let content = match line.find(|c: char| c == '#' || c == '!') {
                Some(start) => &line[..start],
                None => line.as_str(),
            };

            let tokens: Vec<&str> = content.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() != 2 {
                return Err(TableError::ColumnCount {
                    line: line_number,
                    found: tokens.len(),
                });
            }

            let xv = parse_number(tokens[0], line_number)?;
            let yv = parse_number(tokens[1], line_number)?;
            if let Some(&last) = x.last() {
                if xv <= last {
                    return Err(TableError::NotAscending {
                        line: line_number,
                        x: xv,
                    });
                }
            }
            x.push(xv);
            y.push(yv);
        }

        if x.is_empty() {
            return Err(TableError::Empty);
        }
        Ok(Self { x, y })
    }

    pub fn parse_str(text: &str) -> Result<Self, TableError> {
        Self::parse(text.as_bytes())
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// First and last abscissa
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Multiply every abscissa by a positive factor (e.g. 1 + z for redshift)
    pub fn scale_x(&mut self, factor: f64) {
        for v in self.x.iter_mut() {
            *v *= factor;
        }
    }

    /// Multiply every ordinate by a factor
    pub fn scale_y(&mut self, factor: f64) {
        for v in self.y.iter_mut() {
            *v *= factor;
        }
    }

    /// Area-preserving rebin onto a fresh grid of the given geometry
    pub fn to_grid(&self, geometry: GridGeometry) -> Result<Grid, GridError> {
        let mut grid = Grid::new(geometry);
        grid.resample_from(&self.x, &self.y)?;
        Ok(grid)
    }

    /// Sample onto a grid by linear interpolation between rows.
    ///
    /// Meant for dimensionless curves (throughput, extinction) where the
    /// value at a wavelength matters rather than the area. Bins outside the
    /// table's domain take `outside`.
    pub fn to_grid_linear(&self, geometry: GridGeometry, outside: f64) -> Grid {
        let mut grid = Grid::new(geometry);
        grid.fill_with(|x| self.linear_at(x).unwrap_or(outside));
        grid
    }

    /// Linear interpolation, holding the first and last rows beyond the domain
    pub fn clamped_at(&self, x: f64) -> f64 {
        let (lo, _) = self.domain();
        self.linear_at(x).unwrap_or(if x < lo {
            self.y[0]
        } else {
            self.y[self.y.len() - 1]
        })
    }

    /// Linear interpolation between rows, `None` outside the domain
    pub fn linear_at(&self, x: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if !(lo..=hi).contains(&x) {
            return None;
        }
        let upper = self.x.partition_point(|&v| v < x);
        if upper == 0 {
            return Some(self.y[0]);
        }
        let (x0, x1) = (self.x[upper - 1], self.x[upper]);
        let (y0, y1) = (self.y[upper - 1], self.y[upper]);
        Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
    }
}

fn parse_number(token: &str, line: usize) -> Result<f64, TableError> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(TableError::InvalidNumber {
            line,
            token: token.to_string(),
        }),
    }
}
