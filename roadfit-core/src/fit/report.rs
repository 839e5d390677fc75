use serde::Serialize;

use super::design::DesignReport;
use crate::AreaId;

/// Fitted value of one area
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimate {
    /// Seconds per meter, within the configured bounds
    Fitted(f64),
    /// No used trip crosses the area, so the data says nothing about it.
    /// `fallback` is the configured substitute value, if any.
    Unconstrained { fallback: Option<f64> },
}

impl Estimate {
    /// Fitted value, or the fallback for unconstrained areas
    pub fn value(&self) -> Option<f64> {
        match *self {
            Estimate::Fitted(value) => Some(value),
            Estimate::Unconstrained { fallback } => fallback,
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Estimate::Unconstrained { .. })
    }
}

/// How well the trips crossing one area are explained
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AreaDiagnostics {
    /// Training trips whose path crosses the area
    pub samples: usize,
    /// Mean of predicted minus observed seconds over those trips
    pub mean_residual: f64,
    pub rmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaCoefficient {
    pub area: AreaId,
    pub estimate: Estimate,
    pub diagnostics: AreaDiagnostics,
}

impl AreaCoefficient {
    /// Speed in km/h equivalent to the coefficient
    pub fn speed_kmh(&self) -> Option<f64> {
        self.estimate
            .value()
            .filter(|&c| c > 0.0)
            .map(|c| 3.6 / c)
    }
}

/// Coefficient vector of one time slice with fit diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientReport {
    pub slice: String,
    /// Coefficient bounds in seconds per meter
    pub bounds: (f64, f64),
    /// Ascending by area
    pub coefficients: Vec<AreaCoefficient>,
    pub design: DesignReport,
    pub train_rmse: f64,
    /// `None` without holdout or when every held-out row was skipped
    pub test_rmse: Option<f64>,
    /// Held-out rows crossing an area that has no value
    pub test_skipped: usize,
    pub iterations: usize,
    pub projected_gradient: f64,
}

impl CoefficientReport {
    pub fn get(&self, area: AreaId) -> Option<&AreaCoefficient> {
        self.coefficients
            .binary_search_by_key(&area, |c| c.area)
            .ok()
            .map(|idx| &self.coefficients[idx])
    }

    /// Fitted coefficient of an area, `None` when unknown or unconstrained
    pub fn fitted(&self, area: AreaId) -> Option<f64> {
        match self.get(area)?.estimate {
            Estimate::Fitted(value) => Some(value),
            Estimate::Unconstrained { .. } => None,
        }
    }

    pub fn unconstrained_areas(&self) -> Vec<AreaId> {
        self.coefficients
            .iter()
            .filter(|c| c.estimate.is_unconstrained())
            .map(|c| c.area)
            .collect()
    }
}
