use log::{debug, trace};

use super::design::DesignMatrix;
use crate::Error;

/// Sufficient-decrease constant of the line search
const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;
const STEP_MIN: f64 = 1e-12;
const STEP_MAX: f64 = 1e12;

/// Result of a bounded least-squares solve
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub coefficients: Vec<f64>,
    pub iterations: usize,
    /// Infinity norm of the projected gradient at termination
    pub projected_gradient: f64,
    /// `0.5 * |D c - t|^2`
    pub objective: f64,
    pub residuals: Vec<f64>,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn residuals(design: &DesignMatrix, x: &[f64]) -> Vec<f64> {
    design
        .mul(x)
        .into_iter()
        .zip(design.observed())
        .map(|(predicted, observed)| predicted - observed)
        .collect()
}

fn project(x: &[f64], lower: f64, upper: f64) -> Vec<f64> {
    x.iter().map(|v| v.clamp(lower, upper)).collect()
}

fn projected_gradient_norm(x: &[f64], g: &[f64], lower: f64, upper: f64) -> f64 {
    x.iter()
        .zip(g)
        .map(|(xi, gi)| ((xi - gi).clamp(lower, upper) - xi).abs())
        .fold(0.0, f64::max)
}

/// Minimises `|D c - t|^2` subject to `lower <= c_j <= upper` for every column.
///
/// Projected gradient descent with Barzilai-Borwein step lengths and a monotone
/// Armijo backtracking search along the projection arc. Every operation runs in
/// a fixed order, so identical inputs give bit-identical output. Columns without
/// entries keep the starting value `initial`.
///
/// # Errors
///
/// [`Error::SolverDivergence`] when the projected gradient does not fall below
/// `tolerance * (1 + |D^T t|_inf)` within `max_iterations`, or the objective
/// becomes non-finite
pub fn solve_bounded_least_squares(
    design: &DesignMatrix,
    (lower, upper): (f64, f64),
    initial: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<Solution, Error> {
    if lower.is_nan() || upper.is_nan() || lower > upper {
        return Err(Error::InvalidData(format!(
            "lower bound {lower} exceeds upper bound {upper}"
        )));
    }
    if design.rows() == 0 {
        return Err(Error::EmptyDesign);
    }

    let scale = 1.0
        + design
            .mul_transpose(design.observed())
            .into_iter()
            .fold(0.0, |acc: f64, v| acc.max(v.abs()));
    let threshold = tolerance * scale;

    let max_norm = design
        .column_norms_squared()
        .into_iter()
        .fold(0.0, f64::max);
    let mut step = if max_norm > 0.0 { 1.0 / max_norm } else { 1.0 };

    let mut x = vec![initial.clamp(lower, upper); design.cols()];
    let mut r = residuals(design, &x);
    let mut f = 0.5 * dot(&r, &r);
    let mut g = design.mul_transpose(&r);
    let mut pg = projected_gradient_norm(&x, &g, lower, upper);

    for iteration in 0..=max_iterations {
        if pg <= threshold {
            debug!("Bounded least squares converged after {iteration} iterations");
            return Ok(Solution {
                coefficients: x,
                iterations: iteration,
                projected_gradient: pg,
                objective: f,
                residuals: r,
            });
        }
        if iteration == max_iterations {
            break;
        }

        let mut trial_step = step;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let x_new: Vec<f64> = project(
                &x.iter()
                    .zip(&g)
                    .map(|(xi, gi)| xi - trial_step * gi)
                    .collect::<Vec<_>>(),
                lower,
                upper,
            );
            let descent: f64 = x_new
                .iter()
                .zip(&x)
                .zip(&g)
                .map(|((xn, xo), gi)| (xn - xo) * gi)
                .sum();
            let r_new = residuals(design, &x_new);
            let f_new = 0.5 * dot(&r_new, &r_new);
            if !f_new.is_finite() {
                return Err(Error::SolverDivergence {
                    iterations: iteration,
                    projected_gradient: pg,
                });
            }
            if f_new <= f + ARMIJO * descent {
                accepted = Some((x_new, r_new, f_new));
                break;
            }
            trial_step *= 0.5;
        }

        let Some((x_new, r_new, f_new)) = accepted else {
            trace!("Line search stalled at iteration {iteration}");
            return Err(Error::SolverDivergence {
                iterations: iteration,
                projected_gradient: pg,
            });
        };

        let g_new = design.mul_transpose(&r_new);
        let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
        let sy = dot(&s, &y);
        step = if sy > 0.0 {
            (dot(&s, &s) / sy).clamp(STEP_MIN, STEP_MAX)
        } else {
            STEP_MAX.min(trial_step * 2.0)
        };

        x = x_new;
        r = r_new;
        f = f_new;
        g = g_new;
        pg = projected_gradient_norm(&x, &g, lower, upper);
    }

    Err(Error::SolverDivergence {
        iterations: max_iterations,
        projected_gradient: pg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design(rows: &[Vec<f64>], observed: Vec<f64>) -> DesignMatrix {
        let areas = (0..rows[0].len() as u32).collect();
        DesignMatrix::from_dense_rows(areas, rows, observed).unwrap()
    }

    #[test]
    fn exact_identity_solve() {
        let d = design(&[vec![1.0, 0.0], vec![0.0, 1.0]], vec![10.0, 20.0]);
        let solution = solve_bounded_least_squares(&d, (0.0, 100.0), 50.0, 1e-12, 100).unwrap();
        assert!((solution.coefficients[0] - 10.0).abs() < 1e-9);
        assert!((solution.coefficients[1] - 20.0).abs() < 1e-9);
        assert!(solution.objective < 1e-12);
    }

    #[test]
    fn active_bounds_are_respected() {
        // unconstrained optimum is [10, 20]
        let d = design(&[vec![1.0, 0.0], vec![0.0, 1.0]], vec![10.0, 20.0]);
        let solution = solve_bounded_least_squares(&d, (0.0, 15.0), 0.0, 1e-12, 100).unwrap();
        assert!((solution.coefficients[0] - 10.0).abs() < 1e-9);
        assert_eq!(solution.coefficients[1], 15.0);
    }

    #[test]
    fn overdetermined_system_matches_normal_equations() {
        // least squares of [[1,1],[1,2],[2,1]] c = [3,5,4] is c = [1, 2]
        let d = design(
            &[vec![1.0, 1.0], vec![1.0, 2.0], vec![2.0, 1.0]],
            vec![3.0, 5.0, 4.0],
        );
        let solution = solve_bounded_least_squares(&d, (-10.0, 10.0), 0.0, 1e-12, 10_000).unwrap();
        assert!((solution.coefficients[0] - 1.0).abs() < 1e-6);
        assert!((solution.coefficients[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn noisy_fit_stays_in_bounds_and_is_deterministic() {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                (0..6)
                    .map(|j| if (i + j) % 3 == 0 { 100.0 + (i * j) as f64 } else { 0.0 })
                    .collect()
            })
            .collect();
        let observed: Vec<f64> = (0..40).map(|i| 30.0 + (i % 7) as f64 * 11.0).collect();
        let d = design(&rows, observed);

        let a = solve_bounded_least_squares(&d, (0.03, 0.72), 0.3, 1e-8, 100_000).unwrap();
        let b = solve_bounded_least_squares(&d, (0.03, 0.72), 0.3, 1e-8, 100_000).unwrap();
        assert_eq!(a, b);
        assert!(a.coefficients.iter().all(|&c| (0.03..=0.72).contains(&c)));
    }

    #[test]
    fn iteration_budget_exhaustion_is_divergence() {
        let d = design(
            &[vec![1.0, 1.0], vec![1.0, 2.0], vec![2.0, 1.0]],
            vec![3.0, 5.0, 4.0],
        );
        let result = solve_bounded_least_squares(&d, (-10.0, 10.0), 0.0, 1e-12, 0);
        assert!(matches!(
            result,
            Err(Error::SolverDivergence { iterations: 0, .. })
        ));
    }

    #[test]
    fn empty_design_is_an_error() {
        let d = DesignMatrix::from_dense_rows(vec![1], &[], vec![]).unwrap();
        assert_eq!(
            solve_bounded_least_squares(&d, (0.0, 1.0), 0.5, 1e-9, 10),
            Err(Error::EmptyDesign)
        );
    }
}
