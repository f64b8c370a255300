//! Delay and weight parameter generators.
//!
//! Values are produced in a fixed-point format: the generator scales by
//! `2^fixed_point` and rounds. Delays use `fixed_point = 0` (whole
//! ticks), weights use the weight fixed-point position of the build
//! configuration.

use crate::error::{MatGenError, Result};
use rand::{Rng, RngCore};
use rand_distr::Distribution;

/// Produces `n` fixed-point parameter values.
pub trait ParamGenerator {
    /// Generate `n` values scaled by `2^fixed_point`.
    fn generate(&self, n: usize, fixed_point: u32, rng: &mut dyn RngCore) -> Vec<i32>;
}

fn to_fixed(value: f64, fixed_point: u32) -> i32 {
    (value * (1u64 << fixed_point) as f64).round() as i32
}

/// Every value is the same constant.
#[derive(Debug, Clone, Copy)]
pub struct Constant {
    /// The value, before fixed-point scaling.
    pub value: f64,
}

impl Constant {
    /// Create a constant generator.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl ParamGenerator for Constant {
    fn generate(&self, n: usize, fixed_point: u32, _rng: &mut dyn RngCore) -> Vec<i32> {
        vec![to_fixed(self.value, fixed_point); n]
    }
}

/// Values drawn uniformly from `[low, high)`.
#[derive(Debug, Clone, Copy)]
pub struct Uniform {
    low: f64,
    high: f64,
}

impl Uniform {
    /// Create a uniform generator over `[low, high)`.
    ///
    /// # Errors
    ///
    /// Fails if `low >= high`.
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if low >= high {
            return Err(MatGenError::invalid_parameter(format!(
                "uniform range [{low}, {high}) is empty"
            )));
        }
        Ok(Self { low, high })
    }
}

impl ParamGenerator for Uniform {
    fn generate(&self, n: usize, fixed_point: u32, rng: &mut dyn RngCore) -> Vec<i32> {
        (0..n)
            .map(|_| to_fixed(rng.gen_range(self.low..self.high), fixed_point))
            .collect()
    }
}

/// Values drawn from a clipped normal distribution.
#[derive(Debug, Clone, Copy)]
pub struct Normal {
    mean: f64,
    sd: f64,
    low: f64,
    high: f64,
}

impl Normal {
    /// Create a normal generator clipped to `[low, high]`.
    ///
    /// # Errors
    ///
    /// Fails on a non-positive standard deviation or an empty clip range.
    pub fn new(mean: f64, sd: f64, low: f64, high: f64) -> Result<Self> {
        if sd <= 0.0 || !sd.is_finite() {
            return Err(MatGenError::invalid_parameter(format!(
                "standard deviation {sd} must be positive"
            )));
        }
        if low > high {
            return Err(MatGenError::invalid_parameter(format!(
                "clip range [{low}, {high}] is empty"
            )));
        }
        Ok(Self {
            mean,
            sd,
            low,
            high,
        })
    }
}

impl ParamGenerator for Normal {
    fn generate(&self, n: usize, fixed_point: u32, rng: &mut dyn RngCore) -> Vec<i32> {
        let normal = rand_distr::Normal::new(self.mean, self.sd).expect("sd validated positive");
        (0..n)
            .map(|_| to_fixed(normal.sample(rng).clamp(self.low, self.high), fixed_point))
            .collect()
    }
}
