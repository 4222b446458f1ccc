//! Numerical building blocks for spectral modelling
//!
//! This module provides the power-of-two sampled function ([`Grid`]) every
//! spectrum is built on, and the natural cubic spline it interpolates with.

pub mod grid;
pub mod spline;

pub use grid::{Grid, GridError, GridGeometry};
