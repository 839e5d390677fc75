use log::{info, warn};
use rayon::prelude::*;

use super::{
    config::FitConfig,
    design::{DesignMatrix, build_design_matrix},
    report::{AreaCoefficient, AreaDiagnostics, CoefficientReport, Estimate},
    solver::solve_bounded_least_squares,
};
use crate::{
    AreaId, Error,
    aggregate::PairSummaryTable,
    model::{ObservedTrip, TimeSlice},
};

/// Outcome of fitting one time slice
#[derive(Debug, Clone, PartialEq)]
pub struct SliceFit {
    pub slice: String,
    pub result: Result<CoefficientReport, Error>,
}

fn rmse(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt()
}

fn area_diagnostics(design: &DesignMatrix, residuals: &[f64]) -> Vec<AreaDiagnostics> {
    let mut sums = vec![(0usize, 0.0, 0.0); design.cols()];
    for (row, &residual) in residuals.iter().enumerate() {
        for (col, _) in design.row(row) {
            let entry = &mut sums[col];
            entry.0 += 1;
            entry.1 += residual;
            entry.2 += residual * residual;
        }
    }
    sums.into_iter()
        .map(|(samples, sum, sum_sq)| {
            if samples == 0 {
                AreaDiagnostics::default()
            } else {
                let n = samples as f64;
                AreaDiagnostics {
                    samples,
                    mean_residual: sum / n,
                    rmse: (sum_sq / n).sqrt(),
                }
            }
        })
        .collect()
}

/// RMSE of the held-out rows predicted from the reported estimates. Rows
/// crossing an area without a value are skipped and counted.
fn holdout_error(test: &DesignMatrix, coefficients: &[AreaCoefficient]) -> (Option<f64>, usize) {
    let values: Vec<Option<f64>> = coefficients.iter().map(|c| c.estimate.value()).collect();
    let mut residuals = Vec::with_capacity(test.rows());
    let mut skipped = 0;
    for (row, &observed) in test.observed().iter().enumerate() {
        let predicted = test
            .row(row)
            .map(|(col, length)| values[col].map(|value| value * length))
            .sum::<Option<f64>>();
        match predicted {
            Some(predicted) => residuals.push(predicted - observed),
            None => skipped += 1,
        }
    }
    let test_rmse = (!residuals.is_empty()).then(|| rmse(&residuals));
    (test_rmse, skipped)
}

/// Fits one coefficient per area from the trips matching `slice`.
///
/// Columns are `areas` plus every area crossed by a used path, minus the
/// configured exclusions. Areas without any training trip are reported as
/// [`Estimate::Unconstrained`].
///
/// # Errors
///
/// [`Error::InvalidData`] for invalid bounds, [`Error::EmptyDesign`] when no trip
/// of the slice has a routed path, [`Error::SolverDivergence`] when the solver
/// does not converge
pub fn fit_slice(
    trips: &[ObservedTrip],
    slice: &TimeSlice,
    table: &PairSummaryTable,
    areas: &[AreaId],
    config: &FitConfig,
) -> Result<CoefficientReport, Error> {
    let bounds = config.bounds()?;
    let (design, design_report) = build_design_matrix(
        trips.iter().filter(|trip| slice.matches(trip)),
        table,
        areas,
        &config.excluded_areas,
    )?;
    if design.rows() == 0 {
        return Err(Error::EmptyDesign);
    }

    let (train, test) = design.split_holdout(config.holdout_stride);
    let solution = solve_bounded_least_squares(
        &train,
        bounds,
        config.initial(bounds),
        config.tolerance,
        config.max_iterations,
    )?;

    let support = train.column_support();
    let diagnostics = area_diagnostics(&train, &solution.residuals);
    let coefficients = train
        .areas()
        .iter()
        .enumerate()
        .map(|(col, &area)| AreaCoefficient {
            area,
            estimate: if support[col] == 0 {
                Estimate::Unconstrained {
                    fallback: config.unconstrained_fallback,
                }
            } else {
                Estimate::Fitted(solution.coefficients[col])
            },
            diagnostics: diagnostics[col],
        })
        .collect::<Vec<_>>();

    let train_rmse = rmse(&solution.residuals);
    let (test_rmse, test_skipped) = match &test {
        Some(test) => holdout_error(test, &coefficients),
        None => (None, 0),
    };

    let unconstrained = coefficients
        .iter()
        .filter(|c| c.estimate.is_unconstrained())
        .count();
    info!(
        "Slice '{}': {} rows, {} areas ({} unconstrained), train RMSE {:.2}s{}",
        slice.name,
        train.rows(),
        coefficients.len(),
        unconstrained,
        train_rmse,
        test_rmse.map_or_else(String::new, |t| format!(", test RMSE {t:.2}s")),
    );

    Ok(CoefficientReport {
        slice: slice.name.clone(),
        bounds,
        coefficients,
        design: design_report,
        train_rmse,
        test_rmse,
        test_skipped,
        iterations: solution.iterations,
        projected_gradient: solution.projected_gradient,
    })
}

/// Fits all trips as a single slice
pub fn fit_coefficients(
    trips: &[ObservedTrip],
    table: &PairSummaryTable,
    areas: &[AreaId],
    config: &FitConfig,
) -> Result<CoefficientReport, Error> {
    fit_slice(trips, &TimeSlice::all(), table, areas, config)
}

/// Fits every slice independently on the rayon pool. A failing slice does not
/// affect the others.
pub fn fit_slices(
    trips: &[ObservedTrip],
    slices: &[TimeSlice],
    table: &PairSummaryTable,
    areas: &[AreaId],
    config: &FitConfig,
) -> Vec<SliceFit> {
    slices
        .par_iter()
        .map(|slice| {
            let result = fit_slice(trips, slice, table, areas, config);
            if let Err(err) = &result {
                warn!("Fitting slice '{}' failed: {err}", slice.name);
            }
            SliceFit {
                slice: slice.name.clone(),
                result,
            }
        })
        .collect()
}
