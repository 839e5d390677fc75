use serde::{Deserialize, Serialize};

use crate::{AreaId, Error};

/// Options of the coefficient fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Slowest plausible speed, gives the upper coefficient bound
    pub min_speed_kmh: f64,
    /// Fastest plausible speed, gives the lower coefficient bound
    pub max_speed_kmh: f64,
    /// Stop once the projected gradient falls below `tolerance * (1 + |D^T t|_inf)`
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Starting coefficient in s/m, midpoint of the bounds when absent
    pub initial_coefficient: Option<f64>,
    /// Areas left out of the fit entirely
    pub excluded_areas: Vec<AreaId>,
    /// With `s > 1`, every s-th trip is held out for a test error
    pub holdout_stride: usize,
    /// Value reported for areas no trip passes through
    pub unconstrained_fallback: Option<f64>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            min_speed_kmh: 5.0,
            max_speed_kmh: 120.0,
            tolerance: 1e-9,
            max_iterations: 20_000,
            initial_coefficient: None,
            excluded_areas: Vec::new(),
            holdout_stride: 0,
            unconstrained_fallback: None,
        }
    }
}

impl FitConfig {
    /// Coefficient bounds in seconds per meter, `(lower, upper)`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] for non-positive or inverted speed bounds
    pub fn bounds(&self) -> Result<(f64, f64), Error> {
        let valid = self.min_speed_kmh.is_finite()
            && self.max_speed_kmh.is_finite()
            && self.min_speed_kmh > 0.0
            && self.max_speed_kmh >= self.min_speed_kmh;
        if !valid {
            return Err(Error::InvalidData(format!(
                "speed bounds must satisfy 0 < min <= max, got {} and {}",
                self.min_speed_kmh, self.max_speed_kmh
            )));
        }
        Ok((3.6 / self.max_speed_kmh, 3.6 / self.min_speed_kmh))
    }

    pub(crate) fn initial(&self, (lower, upper): (f64, f64)) -> f64 {
        self.initial_coefficient
            .unwrap_or((lower + upper) / 2.0)
            .clamp(lower, upper)
    }
}
