//! Bounded least-squares fit of per-area coefficients
//!
//! Each observed trip becomes one row of a sparse design matrix holding the
//! meters its routed path spends in every area; the fitted coefficient of an
//! area is in seconds per meter and bounded by plausible speeds.

mod config;
mod design;
mod report;
mod slices;
mod solver;

pub use config::FitConfig;
pub use design::{DesignMatrix, DesignReport, build_design_matrix};
pub use report::{AreaCoefficient, AreaDiagnostics, CoefficientReport, Estimate};
pub use slices::{SliceFit, fit_coefficients, fit_slice, fit_slices};
pub use solver::{Solution, solve_bounded_least_squares};
